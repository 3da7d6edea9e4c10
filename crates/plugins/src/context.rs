use palaver_common::MessageChain;

use crate::events::PluginEvent;

/// Mutable context handed to each handler during one emission and returned
/// to the emitter afterwards.
///
/// `prevent_default` tells the emitter to skip whatever it was about to do
/// (enter the stage chain, execute a command); it does not stop later
/// handlers from observing the event.
#[derive(Debug)]
pub struct EventContext {
    pub event: PluginEvent,
    prevented_default: bool,
    /// Reply content a handler wants sent instead of the default action.
    pub reply: Option<MessageChain>,
    /// Replacement message text a handler substitutes for the inbound one.
    pub alter: Option<String>,
}

impl EventContext {
    pub fn new(event: PluginEvent) -> Self {
        Self {
            event,
            prevented_default: false,
            reply: None,
            alter: None,
        }
    }

    pub fn prevent_default(&mut self) {
        self.prevented_default = true;
    }

    pub fn is_prevented_default(&self) -> bool {
        self.prevented_default
    }
}

#[cfg(test)]
mod tests {
    use {super::*, palaver_common::MessageChain};

    #[test]
    fn prevent_default_is_sticky() {
        let event = PluginEvent::NormalMessageResponded {
            launcher_id: "u1".into(),
            sender_id: "u1".into(),
            response_text: "ok".into(),
        };
        let mut ctx = EventContext::new(event);
        assert!(!ctx.is_prevented_default());
        ctx.prevent_default();
        ctx.prevent_default();
        assert!(ctx.is_prevented_default());
        assert!(ctx.reply.is_none());

        ctx.reply = Some(MessageChain::plain("handled"));
        assert_eq!(ctx.reply.as_ref().map(|r| r.text()).as_deref(), Some("handled"));
    }
}
