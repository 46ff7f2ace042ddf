use anyhow::Context as _;
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(20);

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.start_kill();
    }
}

/// Line-delimited JSON-RPC client for an MCP server spawned as a child process.
pub struct StdioMcpClient {
    _child: KillOnDrop,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl StdioMcpClient {
    /// Spawn `command` with piped stdin/stdout. Stderr (server logs) is inherited.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or its pipes are unavailable.
    pub fn spawn(mut command: Command) -> anyhow::Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .context("spawn MCP server")?;
        let stdin = child.stdin.take().context("child stdin")?;
        let stdout = child.stdout.take().context("child stdout")?;
        Ok(Self {
            _child: KillOnDrop(child),
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        })
    }

    /// Run the `initialize` handshake and send `notifications/initialized`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer or answers with an error.
    pub async fn initialize(&mut self) -> anyhow::Result<Value> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "clientInfo": { "name": "swagger-mcp-tests", "version": "0" }
                }),
            )
            .await?;
        self.notify("notifications/initialized", json!({})).await?;
        Ok(result)
    }

    /// Send a notification (no `id`, no response).
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the child fails.
    pub async fn notify(&mut self, method: &str, params: Value) -> anyhow::Result<()> {
        self.write(&json!({ "jsonrpc": "2.0", "method": method, "params": params }))
            .await
    }

    /// Send a request and wait for its `result`.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, EOF, or a JSON-RPC error response.
    pub async fn request(&mut self, method: &str, params: Value) -> anyhow::Result<Value> {
        let response = self.raw_request(method, params).await?;
        if let Some(error) = response.get("error") {
            anyhow::bail!("{method} failed: {error}");
        }
        response
            .get("result")
            .cloned()
            .with_context(|| format!("{method}: response without result: {response}"))
    }

    /// Send a request and return the whole JSON-RPC response (`result` or `error`).
    ///
    /// # Errors
    ///
    /// Returns an error on timeout or EOF.
    pub async fn raw_request(&mut self, method: &str, params: Value) -> anyhow::Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.write(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .await?;

        loop {
            let line = tokio::time::timeout(RESPONSE_TIMEOUT, self.stdout.next_line())
                .await
                .with_context(|| format!("timed out waiting for {method} response"))?
                .context("read server stdout")?
                .with_context(|| format!("server closed stdout before answering {method}"))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let msg: Value = serde_json::from_str(line)
                .with_context(|| format!("server wrote non-JSON line: {line}"))?;
            // Skip notifications and server-initiated requests.
            if msg.get("id").and_then(Value::as_u64) == Some(id) && msg.get("method").is_none() {
                return Ok(msg);
            }
        }
    }

    /// `tools/call`, returning the `CallToolResult` object.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails at the protocol level.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<Value> {
        self.request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    async fn write(&mut self, msg: &Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(msg)?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .context("write to server stdin")?;
        self.stdin.flush().await.context("flush server stdin")
    }
}

/// Text of the first content block of a `CallToolResult`.
#[must_use]
pub fn tool_text(result: &Value) -> &str {
    result
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// `isError` flag of a `CallToolResult` (absent means false).
#[must_use]
pub fn tool_is_error(result: &Value) -> bool {
    result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Parse the JSON payload of a successful tool call.
///
/// # Errors
///
/// Returns an error if the first content block is not JSON.
pub fn tool_json(result: &Value) -> anyhow::Result<Value> {
    serde_json::from_str(tool_text(result))
        .with_context(|| format!("tool result is not JSON: {result}"))
}
