//! Rolling message window attached to a session.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::Message;

/// Maximum number of messages a session keeps.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// Bounded FIFO of chat messages. The oldest message is evicted first.
#[derive(Debug, Clone)]
pub struct MessageWindow {
    max_messages: usize,
    messages: VecDeque<Message>,
}

impl MessageWindow {
    /// Creates an empty window holding at most `max_messages` entries.
    pub fn with_max_messages(max_messages: usize) -> Self {
        let max_messages = max_messages.max(1);
        Self {
            max_messages,
            messages: VecDeque::with_capacity(max_messages),
        }
    }

    /// Appends a message, evicting the oldest ones past capacity.
    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// Returns the retained messages, oldest first.
    pub fn messages(&self) -> impl ExactSizeIterator<Item = &Message> {
        self.messages.iter()
    }

    /// Returns the number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if no message is retained.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the capacity of the window.
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for MessageWindow {
    fn default() -> Self {
        Self::with_max_messages(DEFAULT_MAX_MESSAGES)
    }
}

/// Shared handle to the memory of one session.
///
/// Cloning the handle does not copy the messages.
#[derive(Debug, Clone, Default)]
pub struct ChatMemory {
    window: Arc<Mutex<MessageWindow>>,
}

impl ChatMemory {
    /// Creates a memory with the given capacity.
    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            window: Arc::new(Mutex::new(MessageWindow::with_max_messages(max_messages))),
        }
    }

    /// Appends a message.
    pub async fn add(&self, message: Message) {
        self.window.lock().await.push(message);
    }

    /// Returns a snapshot of the retained messages, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.window.lock().await.messages().cloned().collect()
    }

    /// Returns the number of retained messages.
    pub async fn len(&self) -> usize {
        self.window.lock().await.len()
    }

    /// Returns true if no message is retained.
    pub async fn is_empty(&self) -> bool {
        self.window.lock().await.is_empty()
    }

    /// Removes every message.
    pub async fn clear(&self) {
        self.window.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_evicts_oldest_first() {
        let mut window = MessageWindow::default();
        for i in 0..12 {
            window.push(Message::user(format!("m{i}")));
        }

        assert_eq!(window.len(), DEFAULT_MAX_MESSAGES);
        let first = window.messages().next().map(|m| m.content().to_string());
        assert_eq!(first.as_deref(), Some("m2"));
        let last = window.messages().last().map(|m| m.content().to_string());
        assert_eq!(last.as_deref(), Some("m11"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut window = MessageWindow::with_max_messages(0);
        window.push(Message::user("a"));
        window.push(Message::user("b"));
        assert_eq!(window.len(), 1);
        assert_eq!(window.max_messages(), 1);
    }

    #[tokio::test]
    async fn clones_share_messages() {
        let memory = ChatMemory::default();
        let other = memory.clone();

        memory.add(Message::user("hello")).await;
        other.add(Message::assistant("hi")).await;

        assert_eq!(memory.len().await, 2);
        other.clear().await;
        assert!(memory.is_empty().await);
    }
}
