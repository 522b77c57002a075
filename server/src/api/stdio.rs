//! stdio transport (§6): newline-delimited JSON frames on stdin/stdout.
//!
//! One request, one response, in order — the stdio transport is explicitly
//! single-request-at-a-time (§5 "scheduling model"), so requests are read and
//! dispatched on the same loop rather than fanned out to a task per line.

use anyhow::Result;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::dispatch::{Dispatcher, ToolRequest, wrap_response};

pub async fn serve(dispatcher: Dispatcher) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(line) {
            Ok(request) => {
                tracing::debug!(tool = %request.tool_name, "stdio tool call");
                let outcome = dispatcher.dispatch(&request.tool_name, request.arguments).await;
                wrap_response(outcome)
            }
            Err(e) => serde_json::json!({
                "success": false,
                "error": { "code": "INVALID_ARGUMENT", "message": format!("malformed request frame: {e}") },
            }),
        };

        let mut serialized = serde_json::to_string_pretty(&response)?;
        serialized.push('\n');
        stdout.write_all(serialized.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_line_deserializes_to_none() {
        let err = serde_json::from_str::<ToolRequest>("not json").unwrap_err();
        assert!(err.is_syntax() || err.is_data());
    }
}
