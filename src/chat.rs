//! Chat transport seam between the quiz engine and the IRC client

use tokio::sync::mpsc;

/// Opaque user identifier (lowercased chat display name)
pub type UserId = String;

/// An inbound chat line
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub channel: String,
    pub sender: UserId,
    pub text: String,
}

/// Outbound side of the chat transport.
///
/// Implementations must not block: the engine calls this from its event loop and
/// never waits for delivery.
pub trait ChatSink: Send + Sync {
    fn say(&self, channel: &str, text: &str);
}

/// Queues outbound messages as raw IRC lines for the connection writer task
#[derive(Debug, Clone)]
pub struct OutboundChat {
    lines: mpsc::UnboundedSender<String>,
}

impl OutboundChat {
    pub fn new(lines: mpsc::UnboundedSender<String>) -> Self {
        Self { lines }
    }
}

impl ChatSink for OutboundChat {
    fn say(&self, channel: &str, text: &str) {
        let channel = if channel.starts_with('#') {
            channel.to_string()
        } else {
            format!("#{}", channel)
        };

        // A stray line break would let chat text inject raw IRC commands
        let text: String = text
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();

        if self
            .lines
            .send(format!("PRIVMSG {} :{}", channel, text))
            .is_err()
        {
            tracing::error!("Chat connection is gone, dropping message: {}", text);
        }
    }
}
