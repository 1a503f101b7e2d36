//! JSON-lines session over stdin/stdout.
//!
//! Each input line is a submission or a reset command; each produces
//! exactly one output line. Malformed lines produce an `{"error": ...}`
//! line and the session continues.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use sentinel::{ContentMonitor, ContentSubmission};

/// One input line.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StreamRequest {
    /// Return a user to normal
    Reset { reset: String },
    /// Check content
    Submit(ContentSubmission),
}

/// Handle one input line and build the response line.
pub async fn handle_line(monitor: &ContentMonitor, line: &str) -> Value {
    let request: StreamRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Unparseable stream line");
            return json!({ "error": format!("invalid request: {}", e) });
        }
    };

    match request {
        StreamRequest::Reset { reset } => {
            let session = monitor.reset(&reset).await;
            json!({ "reset": reset, "session": session })
        }
        StreamRequest::Submit(submission) => match monitor.check_content(submission).await {
            Ok(outcome) => serde_json::to_value(&outcome)
                .unwrap_or_else(|e| json!({ "error": format!("serialization failed: {}", e) })),
            Err(e) => json!({ "error": e.to_string() }),
        },
    }
}

/// Run the session until `input` is exhausted.
pub async fn run<R, W>(monitor: &ContentMonitor, input: R, mut output: W) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0u64;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = handle_line(monitor, line).await;
        let mut encoded = response.to_string();
        encoded.push('\n');
        output.write_all(encoded.as_bytes()).await?;
        output.flush().await?;
        handled += 1;
    }

    debug!(lines = handled, "Stream input exhausted");
    Ok(handled)
}
