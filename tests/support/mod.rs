#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One scripted response from the fake Ollama server.
pub enum Reply {
    Json { status: u16, body: String },
    /// NDJSON lines sent as separate HTTP chunks. When `complete` is false the
    /// connection is dropped before the terminating chunk.
    Stream { lines: Vec<String>, complete: bool },
    /// Sends `lines`, then keeps the connection open and silent for `hold`.
    Stall { lines: Vec<String>, hold: Duration },
}

impl Reply {
    pub fn ok_json(body: &str) -> Self {
        Self::Json {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self::Json {
            status,
            body: body.to_string(),
        }
    }

    pub fn stream(lines: Vec<String>) -> Self {
        Self::Stream {
            lines,
            complete: true,
        }
    }

    pub fn broken_stream(lines: Vec<String>) -> Self {
        Self::Stream {
            lines,
            complete: false,
        }
    }

    pub fn stalled_stream(lines: Vec<String>, hold: Duration) -> Self {
        Self::Stall { lines, hold }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Serves `replies` in order, one connection each, then returns what it saw.
pub struct FakeOllama {
    pub base_url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl FakeOllama {
    pub fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        let handle = thread::spawn(move || {
            let mut recorded = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().expect("accept should succeed");
                recorded.push(read_request(&mut stream));
                write_reply(&mut stream, reply);
            }
            recorded
        });

        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    pub fn requests(self) -> Vec<RecordedRequest> {
        self.handle.join().expect("fake server thread should join")
    }
}

pub fn free_local_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("address should be available");
    drop(listener);
    addr
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn read_request(stream: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        let read = stream.read(&mut chunk).expect("request should be readable");
        assert!(read > 0, "client closed connection before sending headers");
        buf.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let read = stream.read(&mut chunk).expect("body should be readable");
        assert!(read > 0, "client closed connection before sending body");
        buf.extend_from_slice(&chunk[..read]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    RecordedRequest {
        method: request_line.next().unwrap_or_default().to_string(),
        path: request_line.next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string(),
    }
}

fn write_reply(stream: &mut TcpStream, reply: Reply) {
    match reply {
        Reply::Json { status, body } => {
            let response = format!(
                "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("response should be written");
        }
        Reply::Stream { lines, complete } => {
            write_chunked(stream, &lines);
            if complete {
                stream
                    .write_all(b"0\r\n\r\n")
                    .expect("final chunk should be written");
            }
        }
        Reply::Stall { lines, hold } => {
            write_chunked(stream, &lines);
            thread::sleep(hold);
            // The client may already have given up on this connection.
            let _ = stream.write_all(b"0\r\n\r\n");
            let _ = stream.flush();
            return;
        }
    }
    stream.flush().expect("response should be flushed");
}

fn write_chunked(stream: &mut TcpStream, lines: &[String]) {
    stream
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        )
        .expect("headers should be written");
    for line in lines {
        let data = format!("{line}\n");
        let frame = format!("{:x}\r\n{data}\r\n", data.len());
        stream
            .write_all(frame.as_bytes())
            .expect("chunk should be written");
        stream.flush().expect("chunk should be flushed");
        thread::sleep(Duration::from_millis(20));
    }
}
