/// Position in the guided "compose SMS" interaction.
///
/// The pending recipient only exists while waiting for the message body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationPhase {
    #[default]
    Idle,
    AwaitingPhoneNumber,
    AwaitingMessageBody { phone: String },
}

impl ConversationPhase {
    pub fn pending_phone(&self) -> Option<&str> {
        match self {
            ConversationPhase::AwaitingMessageBody { phone } => Some(phone),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationPhase::Idle)
    }

    /// Returns to `Idle`, handing back whatever phase was active.
    pub fn reset(&mut self) -> ConversationPhase {
        std::mem::take(self)
    }
}
