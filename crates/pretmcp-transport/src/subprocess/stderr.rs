//! Diagnostic stream drain

use super::process::StderrCallback;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Log every line the server writes to stderr until the stream closes
///
/// Lines are decoded lossily; non-UTF-8 bytes never stop the drain.
pub(crate) fn spawn_drain<R>(
    stream: R,
    command: String,
    callback: Option<StderrCallback>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!(command = %command, "Server stderr closed");
                    break;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    info!(target: "pretmcp::server", command = %command, "{}", line);
                    if let Some(callback) = &callback {
                        callback(line);
                    }
                }
                Err(e) => {
                    warn!(command = %command, error = %e, "Error reading server stderr");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncWriteExt, duplex};

    #[tokio::test]
    async fn test_drain_forwards_lines_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        let callback: StderrCallback = Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
        });

        let (mut server, client) = duplex(256);
        let task = spawn_drain(client, "stub".to_string(), Some(callback));

        server
            .write_all(b"PRET MCP Server running on stdio\n\n  \nwarn: slow\n")
            .await
            .unwrap();
        drop(server);
        task.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                "PRET MCP Server running on stdio".to_string(),
                "warn: slow".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_drain_ends_without_callback() {
        let (server, client) = duplex(64);
        let task = spawn_drain(client, "stub".to_string(), None);
        drop(server);
        task.await.unwrap();
    }
}
