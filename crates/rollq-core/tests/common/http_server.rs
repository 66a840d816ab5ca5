//! Minimal threaded HTTP/1.1 server for integration tests.
//!
//! Routes:
//! - `/delay/<ms>`: sleeps, then answers `delay:<ms>`
//! - `/echo`: JSON with the method, headers and body it received
//! - `/status/<code>`: empty body with the given status
//! - `/redirect`: 302 to `/echo`
//! - `/bytes/<n>`: `n` bytes of filler
//!
//! Tracks how many requests are being served at once.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ServerStats {
    pub hits: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

pub struct TestServer {
    pub base: String,
    pub stats: Arc<ServerStats>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    pub fn hits(&self) -> usize {
        self.stats.hits.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.stats.max_active.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(ServerStats::default());
    let server_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let stats = Arc::clone(&server_stats);
            thread::spawn(move || {
                let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
                stats.max_active.fetch_max(now, Ordering::SeqCst);
                handle(stream, &stats);
                stats.active.fetch_sub(1, Ordering::SeqCst);
            });
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}/", port),
        stats,
    }
}

struct Incoming {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

fn handle(mut stream: TcpStream, stats: &ServerStats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    stats.hits.fetch_add(1, Ordering::SeqCst);
    let path = req.path.split('?').next().unwrap_or("").to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["delay", ms] => {
            let ms: u64 = ms.parse().unwrap_or(0);
            thread::sleep(Duration::from_millis(ms));
            respond(&mut stream, "200 OK", &[], format!("delay:{}", ms).as_bytes());
        }
        ["echo"] => {
            let headers: Vec<String> = req
                .headers
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            let json = serde_json::json!({
                "method": req.method,
                "path": req.path,
                "headers": headers,
                "body": String::from_utf8_lossy(&req.body),
            });
            respond(
                &mut stream,
                "200 OK",
                &["Content-Type: application/json"],
                json.to_string().as_bytes(),
            );
        }
        ["status", code] => {
            let status = match *code {
                "404" => "404 Not Found",
                "500" => "500 Internal Server Error",
                _ => "200 OK",
            };
            respond(&mut stream, status, &[], b"");
        }
        ["redirect"] => {
            respond(&mut stream, "302 Found", &["Location: /echo"], b"");
        }
        ["bytes", n] => {
            let n: usize = n.parse().unwrap_or(0);
            let body: Vec<u8> = (b'a'..=b'z').cycle().take(n).collect();
            respond(&mut stream, "200 OK", &[], &body);
        }
        _ => respond(&mut stream, "404 Not Found", &[], b""),
    }
}

fn respond(stream: &mut TcpStream, status: &str, extra: &[&str], body: &[u8]) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for line in extra {
        head.push_str(line);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

/// Reads the request head, then exactly `Content-Length` body bytes.
fn read_request(stream: &mut TcpStream) -> Option<Incoming> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };
    let head = std::str::from_utf8(&buf[..head_end]).ok()?.to_string();
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(length);
    Some(Incoming {
        method,
        path,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
