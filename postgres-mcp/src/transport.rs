//! Newline-delimited JSON-RPC over a byte stream pair.

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST, PARSE_ERROR};
use crate::server::McpServer;

/// decode one line into a request, or the error response owed for it
fn decode(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        JsonRpcResponse::failure(
            Value::Null,
            JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
        )
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::failure(
            id,
            JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
        )
    })
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    debug!("sent: {}", json);
    Ok(())
}

/// serve requests until the reader reaches eof
pub async fn run<R, W>(server: &McpServer, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("mcp server listening on stdio");
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!("received: {}", trimmed);

        let response = match decode(trimmed) {
            Ok(request) => server.handle(request).await,
            Err(response) => {
                error!("rejected message: {:?}", response.error);
                Some(response)
            }
        };

        if let Some(response) = response {
            write_response(&mut writer, &response).await?;
        }
    }

    info!("stdin closed, mcp server shutting down");
    Ok(())
}
