//! Minimal Twitch-flavoured IRC client
//!
//! Joins a single channel, answers server pings and forwards `PRIVMSG` lines to the
//! quiz engine. Outbound lines are written by a dedicated task fed from an unbounded
//! queue, so the engine never waits on the socket.

use std::borrow::Cow;
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chat::{ChatMessage, OutboundChat};
use crate::engine::QuizHandle;
use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct IrcConfig {
    /// `host:port` of the IRC server
    pub addr: String,
    pub nick: String,
    /// Password sent with `PASS`; `oauth:` is prepended if missing
    pub token: String,
    pub channel: String,
}

/// A parsed IRC line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrcLine {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcLine {
    /// Nick part of a `nick!user@host` prefix
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }

    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }
}

/// Parse one IRC line (`@tags :prefix COMMAND params :trailing`)
pub fn parse_line(line: &str) -> Option<IrcLine> {
    let mut rest = line.trim_end_matches(['\r', '\n']);
    let mut parsed = IrcLine::default();

    if let Some(tagged) = rest.strip_prefix('@') {
        let (tags, remainder) = tagged.split_once(' ')?;
        parsed.tags = tags
            .split(';')
            .filter(|tag| !tag.is_empty())
            .map(|tag| match tag.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (tag.to_string(), String::new()),
            })
            .collect();
        rest = remainder.trim_start();
    }

    if let Some(prefixed) = rest.strip_prefix(':') {
        let (prefix, remainder) = prefixed.split_once(' ')?;
        parsed.prefix = Some(prefix.to_string());
        rest = remainder.trim_start();
    }

    let (head, trailing) = match rest.split_once(" :") {
        Some((head, trailing)) => (head, Some(trailing)),
        None => (rest, None),
    };

    let mut words = head.split_whitespace();
    parsed.command = words.next()?.to_uppercase();
    parsed.params = words.map(str::to_string).collect();
    if let Some(trailing) = trailing {
        parsed.params.push(trailing.to_string());
    }

    Some(parsed)
}

/// Convert a `PRIVMSG` into a chat message. The sender prefers the
/// `display-name` tag and falls back to the prefix nick.
pub fn to_chat_message(line: &IrcLine) -> Option<ChatMessage> {
    if line.command != "PRIVMSG" || line.params.len() < 2 {
        return None;
    }

    let sender = line
        .tags
        .get("display-name")
        .filter(|name| !name.is_empty())
        .map(String::as_str)
        .or_else(|| line.nick())?;

    Some(ChatMessage {
        channel: line.params[0].clone(),
        sender: sender.to_lowercase(),
        text: line.trailing()?.to_string(),
    })
}

pub struct IrcConnection {
    reader: BufReader<OwnedReadHalf>,
    outbound: mpsc::UnboundedSender<String>,
    writer: JoinHandle<()>,
    nick: String,
}

impl IrcConnection {
    pub async fn connect(config: &IrcConfig) -> Result<Self, TransportError> {
        tracing::info!("Connecting to {} as {}", config.addr, config.nick);
        let stream = TcpStream::connect(&config.addr).await?;
        let (read_half, write_half) = stream.into_split();

        let (outbound, lines) = mpsc::unbounded_channel();
        let writer = spawn_writer(write_half, lines);

        let password = if config.token.starts_with("oauth:") {
            config.token.clone()
        } else {
            format!("oauth:{}", config.token)
        };
        let channel = config.channel.trim_start_matches('#').to_lowercase();
        let nick = config.nick.to_lowercase();

        for line in [
            "CAP REQ :twitch.tv/tags".to_string(),
            format!("PASS {}", password),
            format!("NICK {}", nick),
            format!("JOIN #{}", channel),
        ] {
            outbound.send(line).map_err(|_| TransportError::Closed)?;
        }

        Ok(Self {
            reader: BufReader::new(read_half),
            outbound,
            writer,
            nick,
        })
    }

    /// Outbound side for the quiz engine
    pub fn chat(&self) -> OutboundChat {
        OutboundChat::new(self.outbound.clone())
    }

    /// Read lines until the server disconnects, forwarding chat to the engine
    pub async fn run(mut self, quiz: QuizHandle) -> Result<(), TransportError> {
        let mut raw = Vec::new();
        let result = loop {
            raw.clear();
            match self.reader.read_until(b'\n', &mut raw).await {
                Ok(0) => break Err(TransportError::Closed),
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            }

            // Chat text is not guaranteed to be valid UTF-8
            let line = String::from_utf8_lossy(&raw);
            if matches!(line, Cow::Owned(_)) {
                tracing::warn!("Received line with invalid UTF-8: {}", line.trim_end());
            }

            let Some(parsed) = parse_line(&line) else {
                continue;
            };
            tracing::trace!("< {}", line.trim_end());

            match parsed.command.as_str() {
                "PING" => {
                    let token = parsed.trailing().unwrap_or("tmi.twitch.tv");
                    let _ = self.outbound.send(format!("PONG :{}", token));
                }
                "001" => {
                    tracing::info!("Connected to chat as {}", self.nick);
                }
                "PRIVMSG" => {
                    let Some(message) = to_chat_message(&parsed) else {
                        continue;
                    };
                    if message.sender == self.nick {
                        tracing::debug!("Ignoring own message: {}", message.text);
                        continue;
                    }
                    if !quiz.deliver(message) {
                        tracing::warn!("Quiz engine is gone, closing chat connection");
                        break Ok(());
                    }
                }
                "NOTICE" => {
                    tracing::warn!("Server notice: {}", parsed.trailing().unwrap_or_default());
                }
                _ => {}
            }
        };

        self.writer.abort();
        result
    }
}

fn spawn_writer(
    mut write_half: OwnedWriteHalf,
    mut lines: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            if line.starts_with("PASS ") {
                tracing::trace!("> PASS ***");
            } else {
                tracing::trace!("> {}", line);
            }
            let framed = format!("{}\r\n", line);
            if let Err(e) = write_half.write_all(framed.as_bytes()).await {
                tracing::error!("Failed to write to chat connection: {}", e);
                break;
            }
        }
    })
}
