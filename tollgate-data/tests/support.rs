//! A canned HTTP endpoint standing in for an ORS instance.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Directions body with a three-point route, 45.2 km and 2710.5 s.
pub const ROUTE_BODY: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "geometry": {"type": "LineString", "coordinates": [[7.44, 48.26], [7.6, 48.4], [7.75, 48.58]]},
        "properties": {"summary": {"distance": 45210.3, "duration": 2710.5}}
    }]
}"#;

/// ORS "route could not be found" error body.
pub const NO_ROUTE_BODY: &str =
    r#"{"error": {"code": 2009, "message": "Route could not be found"}}"#;

/// Server answering every request with the same status and body.
#[derive(Debug)]
pub struct MockOrs {
    base_url: String,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl MockOrs {
    /// Start serving `body` with `status` after `delay`.
    pub fn start(status: u16, body: &'static str, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let address = listener.local_addr().expect("mock server address");
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&bodies);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let request = read_body(&stream);
                seen.lock().expect("request log").push(request);
                thread::sleep(delay);
                respond(stream, status, body);
            }
        });
        Self {
            base_url: format!("http://{address}/ors"),
            bodies,
        }
    }

    /// Base URL to configure the provider with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// JSON bodies received so far.
    pub fn received(&self) -> Vec<serde_json::Value> {
        self.bodies
            .lock()
            .expect("request log")
            .iter()
            .map(|body| serde_json::from_str(body).expect("request body is JSON"))
            .collect()
    }
}

/// Address nothing listens on.
pub fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let address = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{address}/ors")
}

fn read_body(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut length = 0_usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).expect("request header") == 0 {
            break;
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                length = value.trim().parse().expect("content length");
            }
        }
    }
    let mut body = vec![0_u8; length];
    reader.read_exact(&mut body).expect("request body");
    String::from_utf8(body).expect("utf-8 body")
}

fn respond(mut stream: TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    // The client may have given up already.
    stream.write_all(response.as_bytes()).ok();
}
