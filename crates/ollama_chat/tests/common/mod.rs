//! Minimal in-process HTTP/1.1 server for integration tests. Serves canned
//! replies over raw TCP (one per connection, in order) and records every
//! request. No mocks: the client under test talks real HTTP.

#![allow(dead_code)]

use std::net::TcpListener as StdTcpListener;
use std::sync::mpsc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Pick a free port by binding to :0 and extracting the assigned port.
pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// One canned HTTP response.
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Body is written in slices of this many bytes with a short pause between
    /// them, so the client sees several chunks that split lines.
    pub chunk_size: Option<usize>,
}

impl Reply {
    pub fn ndjson(lines: &[String]) -> Self {
        let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
        Self {
            status: 200,
            content_type: "application/x-ndjson",
            body,
            chunk_size: Some(13),
        }
    }

    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.to_string(),
            chunk_size: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: "boom".into(),
            chunk_size: None,
        }
    }
}

/// Streamed chat lines for `deltas`, followed by the final `done` line.
pub fn chat_lines(deltas: &[&str]) -> Vec<String> {
    let mut lines: Vec<String> = deltas
        .iter()
        .map(|d| {
            serde_json::json!({
                "model": "test-model",
                "created_at": "2024-01-01T00:00:00Z",
                "message": {"role": "assistant", "content": d},
                "done": false
            })
            .to_string()
        })
        .collect();
    lines.push(
        serde_json::json!({
            "model": "test-model",
            "message": {"role": "assistant", "content": ""},
            "done": true,
            "eval_count": 7
        })
        .to_string(),
    );
    lines
}

/// A request seen by the server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub struct TestServer {
    pub port: u16,
    requests: mpsc::Receiver<Recorded>,
}

impl TestServer {
    /// Start a server on its own thread and runtime; it answers one connection
    /// per reply and then stops.
    pub fn start(replies: Vec<Reply>) -> Self {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        listener.set_nonblocking(true).unwrap();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                for reply in replies {
                    let (mut tcp, _) = listener.accept().await.unwrap();
                    let recorded = match read_request(&mut tcp).await {
                        Some(r) => r,
                        None => continue,
                    };
                    let _ = tx.send(recorded);
                    write_reply(&mut tcp, &reply).await;
                }
            });
        });

        Self { port, requests: rx }
    }

    /// Next recorded request, waiting up to a second.
    pub fn next_request(&self) -> Option<Recorded> {
        self.requests.recv_timeout(Duration::from_secs(1)).ok()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(tcp: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    let header_end = loop {
        let n = tcp.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = tcp.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    let end = buf.len().min(header_end + content_length);
    Some(Recorded {
        method,
        path,
        body: String::from_utf8_lossy(&buf[header_end..end]).into_owned(),
    })
}

async fn write_reply(tcp: &mut TcpStream, reply: &Reply) {
    let reason = if reply.status < 400 { "OK" } else { "Error" };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        reason,
        reply.content_type,
        reply.body.len()
    );
    let _ = tcp.write_all(head.as_bytes()).await;
    match reply.chunk_size {
        Some(size) => {
            for piece in reply.body.as_bytes().chunks(size) {
                let _ = tcp.write_all(piece).await;
                let _ = tcp.flush().await;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
        None => {
            let _ = tcp.write_all(reply.body.as_bytes()).await;
        }
    }
    let _ = tcp.shutdown().await;
}
