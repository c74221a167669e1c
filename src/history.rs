use tracing::debug;

use crate::message::{Message, Role};

/// Counts by role plus the configured cap, for the `history` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    pub system: usize,
    pub user: usize,
    pub assistant: usize,
    pub total: usize,
    pub max_history: usize,
}

/// Ordered, size-bounded conversation memory. The cap applies to
/// non-system messages; system messages are never evicted. The system
/// prompt itself lives in the prompt store and is prepended at request
/// assembly time, so in practice this holds user/assistant turns only.
#[derive(Debug)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    max_history: usize,
}

impl ConversationHistory {
    pub fn new(max_history: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_history,
        }
    }

    /// Adds a message, then evicts the oldest non-system messages until
    /// the non-system count is back within the cap.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.trim();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn stats(&self) -> HistoryStats {
        let count = |role: Role| {
            self.messages
                .iter()
                .filter(|msg| msg.role == role)
                .count()
        };
        HistoryStats {
            system: count(Role::System),
            user: count(Role::User),
            assistant: count(Role::Assistant),
            total: self.messages.len(),
            max_history: self.max_history,
        }
    }

    fn trim(&mut self) {
        let mut excess = self
            .non_system_count()
            .saturating_sub(self.max_history);
        if excess == 0 {
            return;
        }

        debug!(evicted = excess, cap = self.max_history, "trimming history");
        self.messages.retain(|msg| {
            if excess > 0 && msg.role != Role::System {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    fn non_system_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|msg| msg.role != Role::System)
            .count()
    }
}
