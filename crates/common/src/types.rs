use std::fmt;

use serde::{Deserialize, Serialize};

// ── LauncherType ────────────────────────────────────────────────────────────

/// Who started a conversation: a direct chat or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LauncherType {
    Person,
    Group,
}

impl fmt::Display for LauncherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person => write!(f, "person"),
            Self::Group => write!(f, "group"),
        }
    }
}

// ── Message chain ───────────────────────────────────────────────────────────

/// One component of a platform message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageElement {
    Plain { text: String },
    At { target: String },
    Image { url: String },
}

/// Ordered sequence of message components, the internal wire-neutral form of
/// a platform message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageChain(pub Vec<MessageElement>);

impl MessageChain {
    pub fn new(elements: Vec<MessageElement>) -> Self {
        Self(elements)
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self(vec![MessageElement::Plain { text: text.into() }])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn prepend(&mut self, element: MessageElement) {
        self.0.insert(0, element);
    }

    pub fn push(&mut self, element: MessageElement) {
        self.0.push(element);
    }

    /// Concatenated text of all plain components.
    pub fn text(&self) -> String {
        self.0
            .iter()
            .filter_map(|e| match e {
                MessageElement::Plain { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True if any component mentions the given target.
    pub fn mentions(&self, target: &str) -> bool {
        self.0
            .iter()
            .any(|e| matches!(e, MessageElement::At { target: t } if t == target))
    }

    /// Copy of this chain with all `At` components removed.
    pub fn without_mentions(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|e| !matches!(e, MessageElement::At { .. }))
                .cloned()
                .collect(),
        )
    }
}

impl fmt::Display for MessageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}
