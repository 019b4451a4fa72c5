use rbp_core::UserId;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub user_id: UserId,
    pub nickname: String,
    pub body: String,
}

/// A bounded per-channel ring buffer (§11), replayed in full to a client
/// that just subscribed so they can see recent context without the server
/// persisting chat history anywhere durable.
#[derive(Debug, Clone)]
pub struct ChatLog {
    capacity: usize,
    messages: VecDeque<ChatMessage>,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, messages: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, message: ChatMessage) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn recent(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_past_capacity() {
        let mut log = ChatLog::new(2);
        let msg = |body: &str| ChatMessage { user_id: UserId::default(), nickname: "a".into(), body: body.into() };
        log.push(msg("one"));
        log.push(msg("two"));
        log.push(msg("three"));
        let bodies: Vec<_> = log.recent().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["two", "three"]);
    }
}
