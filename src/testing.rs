// Copyright 2021 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Minimal in-process HTTP server for unit tests.
//!
//! Serves a fixed queue of canned responses in order, recording every
//! request (including chunked bodies) for later assertions.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CannedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl CannedResponse {
    pub fn new(status: u16) -> CannedResponse {
        CannedResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn json(body: &str) -> CannedResponse {
        CannedResponse::new(200)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> CannedResponse {
        self.headers.push((String::from(name), String::from(value)));
        self
    }

    pub fn with_body<B: Into<Vec<u8>>>(mut self, body: B) -> CannedResponse {
        self.body = body.into();
        self
    }

    fn render(&self, head_only: bool) -> Vec<u8> {
        let reason = match self.status {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            206 => "Partial Content",
            401 => "Unauthorized",
            404 => "Not Found",
            409 => "Conflict",
            _ => "Response",
        };
        let mut result = format!("HTTP/1.1 {} {}\r\n", self.status, reason).into_bytes();
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        // 204 responses carry neither a body nor a content-length. An
        // explicitly canned content-length header (HEAD tests) wins.
        let has_length = self
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-length"));
        if self.status != 204 && !has_length {
            result
                .extend_from_slice(format!("content-length: {}\r\n", self.body.len()).as_bytes());
        }
        result.extend_from_slice(b"\r\n");
        if !head_only && self.status != 204 {
            result.extend_from_slice(&self.body);
        }
        result
    }
}

pub(crate) struct TestServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub async fn start(responses: Vec<CannedResponse>) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let recorded = Arc::clone(&requests);
        let _ = tokio::spawn(async move {
            loop {
                let stream = match listener.accept().await {
                    Ok((stream, _)) => stream,
                    Err(_) => return,
                };
                let recorded = Arc::clone(&recorded);
                let queue = Arc::clone(&queue);
                let _ = tokio::spawn(async move {
                    serve_connection(stream, recorded, queue).await;
                });
            }
        });

        TestServer {
            url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Read more data into the buffer; false on EOF or error.
async fn fill(stream: &mut TcpStream, buffer: &mut Vec<u8>) -> bool {
    let mut chunk = [0u8; 4096];
    match stream.read(&mut chunk).await {
        Ok(0) | Err(_) => false,
        Ok(n) => {
            buffer.extend_from_slice(&chunk[..n]);
            true
        }
    }
}

/// Read a chunked transfer-encoded body from the buffer and the stream.
async fn read_chunked(stream: &mut TcpStream, buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line_end = loop {
            if let Some(pos) = find_subsequence(buffer, b"\r\n") {
                break pos;
            }
            if !fill(stream, buffer).await {
                return None;
            }
        };
        let size_line = String::from_utf8_lossy(&buffer[..line_end]).into_owned();
        let size = usize::from_str_radix(size_line.split(';').next().unwrap_or("").trim(), 16)
            .ok()?;
        let _ = buffer.drain(..line_end + 2);

        if size == 0 {
            // Trailer section: consume up to the final CRLF.
            while find_subsequence(buffer, b"\r\n").is_none() {
                if !fill(stream, buffer).await {
                    return Some(body);
                }
            }
            let pos = find_subsequence(buffer, b"\r\n").unwrap_or(0);
            let _ = buffer.drain(..pos + 2);
            return Some(body);
        }

        while buffer.len() < size + 2 {
            if !fill(stream, buffer).await {
                return None;
            }
        }
        body.extend_from_slice(&buffer[..size]);
        let _ = buffer.drain(..size + 2);
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    queue: Arc<Mutex<VecDeque<CannedResponse>>>,
) {
    let mut buffer: Vec<u8> = Vec::new();
    loop {
        let head_end = loop {
            if let Some(pos) = find_subsequence(&buffer, b"\r\n\r\n") {
                break pos;
            }
            if !fill(&mut stream, &mut buffer).await {
                return;
            }
        };

        let head = String::from_utf8_lossy(&buffer[..head_end]).into_owned();
        let _ = buffer.drain(..head_end + 4);

        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split(' ');
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (target.to_string(), String::new()),
        };
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| {
                line.split_once(':')
                    .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
            })
            .collect();

        let content_length = headers
            .iter()
            .find(|(key, _)| key == "content-length")
            .and_then(|(_, value)| value.parse::<usize>().ok());
        let chunked = headers
            .iter()
            .any(|(key, value)| key == "transfer-encoding" && value.contains("chunked"));

        let body = if let Some(length) = content_length {
            while buffer.len() < length {
                if !fill(&mut stream, &mut buffer).await {
                    return;
                }
            }
            buffer.drain(..length).collect()
        } else if chunked {
            match read_chunked(&mut stream, &mut buffer).await {
                Some(body) => body,
                None => return,
            }
        } else {
            Vec::new()
        };

        recorded.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path,
            query,
            headers,
            body,
        });

        let response = queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CannedResponse::new(404));
        let bytes = response.render(method == "HEAD");
        if stream.write_all(&bytes).await.is_err() {
            return;
        }
        if stream.flush().await.is_err() {
            return;
        }
    }
}
