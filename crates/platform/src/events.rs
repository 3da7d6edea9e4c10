use palaver_common::{LauncherType, MessageChain};

/// An inbound message as received from a platform adapter, normalized to the
/// internal message model.
#[derive(Debug, Clone)]
pub enum MessageEvent {
    /// Direct (one-on-one) message.
    Person {
        sender_id: String,
        message_chain: MessageChain,
    },
    /// Message in a group conversation.
    Group {
        group_id: String,
        sender_id: String,
        message_chain: MessageChain,
    },
}

impl MessageEvent {
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }

    pub fn launcher_type(&self) -> LauncherType {
        match self {
            Self::Person { .. } => LauncherType::Person,
            Self::Group { .. } => LauncherType::Group,
        }
    }

    /// The conversation id: the sender for direct messages, the group
    /// otherwise.
    pub fn launcher_id(&self) -> &str {
        match self {
            Self::Person { sender_id, .. } => sender_id,
            Self::Group { group_id, .. } => group_id,
        }
    }

    pub fn sender_id(&self) -> &str {
        match self {
            Self::Person { sender_id, .. } | Self::Group { sender_id, .. } => sender_id,
        }
    }

    pub fn message_chain(&self) -> &MessageChain {
        match self {
            Self::Person { message_chain, .. } | Self::Group { message_chain, .. } => message_chain,
        }
    }
}
