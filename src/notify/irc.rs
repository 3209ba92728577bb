//! Minimal IRC delivery
//!
//! Opens a plain-text connection per announcement, registers, joins the
//! channel, sends one PRIVMSG and quits. Announcements are rare enough that
//! holding a connection open is not worth the reconnect logic.

use super::AnnouncementSink;
use crate::config::AnnounceConfig;
use crate::error::{BugmonitorError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Registration plus delivery must finish within this
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(60);

pub struct IrcSink {
    host: String,
    port: u16,
    nick: String,
    channel: String,
}

impl IrcSink {
    pub fn new(config: &AnnounceConfig) -> Self {
        Self {
            host: config.irc_host.clone(),
            port: config.irc_port,
            nick: config.nick.clone(),
            channel: config.channel.clone(),
        }
    }

    async fn send_once(&self, message: &str) -> Result<()> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer
            .write_all(format!("NICK {}\r\nUSER {} 0 * :{}\r\n", self.nick, self.nick, self.nick).as_bytes())
            .await?;

        // Wait for the welcome numeric before joining
        loop {
            let line = lines
                .next_line()
                .await?
                .ok_or_else(|| BugmonitorError::Other("IRC server closed the connection".to_string()))?;
            debug!("irc <- {}", line);

            if let Some(token) = line.strip_prefix("PING ") {
                writer.write_all(format!("PONG {}\r\n", token).as_bytes()).await?;
                continue;
            }
            let numeric = line.split_whitespace().nth(1).unwrap_or("");
            match numeric {
                "001" => break,
                "433" => {
                    return Err(BugmonitorError::Other(format!(
                        "IRC nick {} is already in use",
                        self.nick
                    )))
                }
                _ => {}
            }
        }

        writer
            .write_all(format!("JOIN {}\r\n", self.channel).as_bytes())
            .await?;
        for text in message.lines().filter(|l| !l.trim().is_empty()) {
            writer
                .write_all(format!("PRIVMSG {} :{}\r\n", self.channel, text).as_bytes())
                .await?;
        }
        writer.write_all(b"QUIT :announced\r\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AnnouncementSink for IrcSink {
    async fn deliver(&self, message: &str) -> Result<()> {
        tokio::time::timeout(DELIVERY_TIMEOUT, self.send_once(message))
            .await
            .map_err(|_| BugmonitorError::Other("IRC delivery timed out".to_string()))?
    }
}
