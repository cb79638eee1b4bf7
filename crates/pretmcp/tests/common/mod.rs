//! Scripted in-memory server for session tests

#![allow(dead_code)]

use pretmcp::{JsonRpcRequest, LineSink, LineSource, Session, SessionConfig};
use pretmcp_transport::{LineReader, LineWriter};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::io::{DuplexStream, duplex};

/// How long a test waits for the client to send something
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Server side of an in-memory line channel
pub struct FakeServer {
    reader: LineReader<DuplexStream>,
    writer: Option<LineWriter<DuplexStream>>,
}

impl FakeServer {
    /// Next request the client wrote, parsed
    pub async fn recv(&mut self) -> JsonRpcRequest {
        let line = self.recv_line().await.expect("client closed the channel");
        JsonRpcRequest::from_line(&line).expect("client sent an invalid request")
    }

    /// Next raw line from the client, `None` once the client closed stdin
    pub async fn recv_line(&mut self) -> Option<String> {
        tokio::time::timeout(RECV_TIMEOUT, self.reader.read_line())
            .await
            .expect("timed out waiting for the client")
            .expect("read failed")
    }

    /// Write a raw line to the client
    pub async fn send_line(&mut self, line: &str) {
        self.writer
            .as_mut()
            .expect("server output already closed")
            .write_line(line.as_bytes())
            .await
            .expect("write to client failed");
    }

    /// Answer `id` with a result
    pub async fn respond(&mut self, id: u64, result: Value) {
        let line = json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string();
        self.send_line(&line).await;
    }

    /// Answer `id` with a JSON-RPC error
    pub async fn respond_error(&mut self, id: u64, code: i64, message: &str) {
        let line = json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        })
        .to_string();
        self.send_line(&line).await;
    }

    /// Answer the next `initialize` request
    pub async fn accept_handshake(&mut self) -> JsonRpcRequest {
        let request = self.recv().await;
        assert_eq!(request.method, "initialize");
        self.respond(request.id, initialize_result()).await;
        request
    }

    /// Close the server's output stream (EOF for the client)
    pub fn close_output(&mut self) {
        self.writer = None;
    }
}

/// A typical `initialize` result from the PRET server
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {"tools": {}},
        "serverInfo": {"name": "pret-mcp-server", "version": "1.0.0"}
    })
}

/// A session wired to a fake server, still in `Starting`
pub fn fake_session(config: SessionConfig) -> (Session, FakeServer) {
    fake_session_with_capacity(config, 64 * 1024)
}

/// Like [`fake_session`], buffering at most `capacity` bytes of client output
pub fn fake_session_with_capacity(config: SessionConfig, capacity: usize) -> (Session, FakeServer) {
    let (client_out, server_in) = duplex(capacity);
    let (server_out, client_in) = duplex(64 * 1024);

    let session = Session::with_transport(config, LineWriter::new(client_out), LineReader::new(client_in));
    let server = FakeServer {
        reader: LineReader::new(server_in),
        writer: Some(LineWriter::new(server_out)),
    };
    (session, server)
}

/// A session wired to a fake server, already `Ready`
pub async fn ready_session(config: SessionConfig) -> (Session, FakeServer) {
    let (session, mut server) = fake_session(config);
    let (initialized, _) = tokio::join!(session.initialize(), server.accept_handshake());
    initialized.expect("handshake failed");
    (session, server)
}
