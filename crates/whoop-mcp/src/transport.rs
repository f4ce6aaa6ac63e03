//! Stdio transport for the MCP server.
//!
//! Messages are newline-delimited JSON. Clients that still send
//! `Content-Length` framed messages are detected from the header line and
//! answered with the same framing.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{McpError, Result};

/// Wire framing of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    #[default]
    NewlineDelimited,
    ContentLength,
}

/// One raw incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub body: String,
    pub framing: Framing,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reader
// ─────────────────────────────────────────────────────────────────────────────

/// Reads framed messages from a byte stream.
pub struct MessageReader<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next message. `None` at end of stream.
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(len_str) = header_value(trimmed, "content-length") {
                let content_length: usize = len_str.parse().map_err(|e| {
                    McpError::protocol(format!("invalid Content-Length: {}", e))
                })?;
                self.skip_headers().await?;
                let body = self.read_body(content_length).await?;
                return Ok(Some(Message {
                    body,
                    framing: Framing::ContentLength,
                }));
            }

            tracing::trace!(json = %trimmed, "received MCP message");
            return Ok(Some(Message {
                body: trimmed.to_string(),
                framing: Framing::NewlineDelimited,
            }));
        }
    }

    /// Consume remaining header lines up to the blank separator.
    async fn skip_headers(&mut self) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(McpError::ConnectionClosed);
            }
            if line.trim().is_empty() {
                return Ok(());
            }
        }
    }

    async fn read_body(&mut self, content_length: usize) -> Result<String> {
        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await?;
        let json = String::from_utf8(body)
            .map_err(|e| McpError::protocol(format!("invalid UTF-8 in message: {}", e)))?;
        tracing::trace!(content_length, json = %json, "received MCP message");
        Ok(json)
    }
}

fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
}

// ─────────────────────────────────────────────────────────────────────────────
// Writer
// ─────────────────────────────────────────────────────────────────────────────

/// Writes messages using the framing the peer last used.
pub struct MessageWriter<W> {
    writer: W,
    framing: Framing,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            framing: Framing::default(),
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn set_framing(&mut self, framing: Framing) {
        self.framing = framing;
    }

    /// Serialize, write and flush one message.
    pub async fn write_message<T: serde::Serialize>(&mut self, message: &T) -> Result<()> {
        let json = serde_json::to_string(message)?;
        match self.framing {
            Framing::NewlineDelimited => {
                self.writer.write_all(json.as_bytes()).await?;
                self.writer.write_all(b"\n").await?;
            }
            Framing::ContentLength => {
                let header = format!("Content-Length: {}\r\n\r\n", json.len());
                self.writer.write_all(header.as_bytes()).await?;
                self.writer.write_all(json.as_bytes()).await?;
            }
        }
        self.writer.flush().await?;
        tracing::trace!(json = %json, "sent MCP message");
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
