//! Minimal scripted HTTP/1.1 server for integration tests.
//!
//! Serves a fixed sequence of responses, one per connection, and records
//! every request it receives (method, target, headers, body). Once the
//! script runs out the last response repeats, so retry loops see a stable
//! failure. Connections are closed after each response.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u32,
    pub body: Vec<u8>,
    /// Wait before writing the response, to keep a transfer in flight.
    pub delay: Option<Duration>,
}

impl ScriptedResponse {
    pub fn new(status: u32, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
            delay: None,
        }
    }

    pub fn delayed(status: u32, body: &[u8], delay: Duration) -> Self {
        Self {
            status,
            body: body.to_vec(),
            delay: Some(delay),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query string, as sent on the request line.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct TestServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/".
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts the server in a background thread. It runs until the process
/// exits.
pub fn start(script: Vec<ScriptedResponse>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let script = Arc::new(Mutex::new(script));

    let recorded = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let response = {
                let mut script = script.lock().unwrap();
                match script.len() {
                    0 => ScriptedResponse::new(200, b""),
                    1 => script[0].clone(),
                    _ => script.remove(0),
                }
            };
            let recorded = Arc::clone(&recorded);
            thread::spawn(move || handle(stream, response, &recorded));
        }
    });

    TestServer {
        url: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

fn handle(
    mut stream: TcpStream,
    response: ScriptedResponse,
    recorded: &Mutex<Vec<RecordedRequest>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));

    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    recorded.lock().unwrap().push(request);

    if let Some(delay) = response.delay {
        thread::sleep(delay);
    }
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
}

fn reason(status: u32) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Scripted",
    }
}

/// Read the head plus `Content-Length` bytes of body.
fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 8192];
    let head_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = find_head_end(&raw) {
            break pos;
        }
        if raw.len() > 1 << 20 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| {
            line.split_once(':')
                .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        })
        .collect();

    let content_length: usize = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);
    let mut body: Vec<u8> = raw[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

fn find_head_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}
