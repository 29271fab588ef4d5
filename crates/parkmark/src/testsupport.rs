//! Shared helpers for tests that talk HTTP.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread;

/// A loopback HTTP server that answers exactly one request.
///
/// Records the raw request so tests can assert on the method, path, and
/// body the client actually sent.
#[derive(Debug)]
pub struct OneShotServer {
    addr: SocketAddr,
    handle: thread::JoinHandle<String>,
}

impl OneShotServer {
    /// Start a server that answers with the given status and body.
    pub fn respond(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has no address");
        let body = body.to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");

            // Read the request head byte by byte until the blank line.
            let mut request = Vec::new();
            let mut byte = [0u8; 1];
            while !request.ends_with(b"\r\n\r\n") {
                match stream.read(&mut byte) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => request.push(byte[0]),
                }
            }

            // Then the body, if the client declared one.
            let head = String::from_utf8_lossy(&request).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if content_length > 0 {
                let mut body_buf = vec![0u8; content_length];
                if stream.read_exact(&mut body_buf).is_ok() {
                    request.extend_from_slice(&body_buf);
                }
            }

            let response = format!(
                "HTTP/1.1 {status} Test\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();

            String::from_utf8_lossy(&request).into_owned()
        });

        Self { addr, handle }
    }

    /// Base URL of the server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the request and return it verbatim (head plus body).
    pub fn into_request(self) -> String {
        self.handle.join().expect("test server thread panicked")
    }
}
