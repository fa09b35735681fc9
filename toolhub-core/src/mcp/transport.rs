//! MCP Transport Implementations
//!
//! Transports handle the I/O for MCP communication. `receive` must be
//! cancel-safe: the server polls it alongside in-flight tool calls.

use super::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::error::ToolhubError;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;

const INBOUND_BUFFER: usize = 64;

/// One inbound line
#[derive(Debug, Clone)]
pub enum Incoming {
    Request(JsonRpcRequest),
    /// The line was not a JSON-RPC request
    Malformed(String),
}

impl Incoming {
    /// Parse a single line of input
    pub fn parse(line: &str) -> Self {
        match serde_json::from_str(line) {
            Ok(request) => Incoming::Request(request),
            Err(e) => Incoming::Malformed(e.to_string()),
        }
    }
}

/// Transport trait for MCP communication
#[async_trait]
pub trait Transport: Send {
    /// Next inbound message, or `None` once the peer has closed
    async fn receive(&mut self) -> crate::error::Result<Option<Incoming>>;

    /// Send a response through the transport
    async fn send(&mut self, response: JsonRpcResponse) -> crate::error::Result<()>;
}

/// Newline-delimited JSON over a byte stream.
///
/// Lines are read by a background task into a channel, which keeps
/// [`Transport::receive`] cancel-safe.
pub struct LineTransport<W> {
    inbound: mpsc::Receiver<Incoming>,
    writer: W,
}

/// Stdio transport, as launched by MCP clients
pub type StdioTransport = LineTransport<Stdout>;

impl StdioTransport {
    /// Create a transport over this process's stdin and stdout
    pub fn stdio() -> Self {
        LineTransport::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<W> LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Start reading lines from `reader`; responses go to `writer`
    pub fn new<R>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, inbound) = mpsc::channel(INBOUND_BUFFER);
        tokio::spawn(read_lines(reader, tx));
        Self { inbound, writer }
    }
}

async fn read_lines<R>(reader: R, tx: mpsc::Sender<Incoming>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if tx.send(Incoming::parse(trimmed)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read from transport: {}", e);
                break;
            }
        }
    }
}

#[async_trait]
impl<W> Transport for LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn receive(&mut self) -> crate::error::Result<Option<Incoming>> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&mut self, response: JsonRpcResponse) -> crate::error::Result<()> {
        let mut json = serde_json::to_string(&response)?;
        json.push('\n');

        self.writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| ToolhubError::Transport(format!("Failed to write response: {}", e)))?;

        self.writer
            .flush()
            .await
            .map_err(|e| ToolhubError::Transport(format!("Failed to flush response: {}", e)))?;

        Ok(())
    }
}

/// In-memory transport for testing
#[derive(Debug, Default)]
pub struct MemoryTransport {
    requests: std::collections::VecDeque<Incoming>,
    responses: Vec<JsonRpcResponse>,
}

impl MemoryTransport {
    /// Create a new memory transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request to be received
    pub fn push_request(&mut self, request: JsonRpcRequest) {
        self.requests.push_back(Incoming::Request(request));
    }

    /// Add a raw line to be received
    pub fn push_line(&mut self, line: &str) {
        self.requests.push_back(Incoming::parse(line));
    }

    /// Get all sent responses
    pub fn responses(&self) -> &[JsonRpcResponse] {
        &self.responses
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn receive(&mut self) -> crate::error::Result<Option<Incoming>> {
        Ok(self.requests.pop_front())
    }

    async fn send(&mut self, response: JsonRpcResponse) -> crate::error::Result<()> {
        self.responses.push(response);
        Ok(())
    }
}
