use mqtt::packet::VariablePacket;
use mqtt::{Decodable, Encodable};
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// An in-memory socket: reads replay scripted server bytes, writes are captured
#[derive(Debug)]
pub struct MockStream {
    incoming: VecDeque<u8>,
    written: Arc<Mutex<Vec<u8>>>,
    write_error: Option<ErrorKind>,
}

/// Inspects what was written to a MockStream after it was moved away
#[derive(Debug, Clone)]
pub struct MockStreamHandle {
    written: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    pub fn new() -> (MockStream, MockStreamHandle) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let stream = MockStream {
            incoming: VecDeque::new(),
            written: written.clone(),
            write_error: None,
        };
        (stream, MockStreamHandle { written })
    }

    /// Queues a packet the "server" will send
    pub fn push_packet<P: Into<VariablePacket>>(&mut self, packet: P) {
        let packet: VariablePacket = packet.into();
        let mut bytes = Vec::new();
        packet.encode(&mut bytes).unwrap();
        self.push_bytes(&bytes);
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    /// Makes every subsequent write fail
    pub fn fail_writes_with(&mut self, kind: ErrorKind) {
        self.write_error = Some(kind);
    }
}

impl MockStreamHandle {
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    /// Decodes everything written so far into MQTT packets
    pub fn written_packets(&self) -> Vec<VariablePacket> {
        let bytes = self.written();
        let mut reader = &bytes[..];
        let mut packets = Vec::new();
        while !reader.is_empty() {
            packets.push(VariablePacket::decode(&mut reader).unwrap());
        }
        packets
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        // an exhausted script reads as a closed connection
        let size = std::cmp::min(buf.len(), self.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..size)) {
            *slot = byte;
        }
        Ok(size)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(kind) = self.write_error {
            return Err(kind.into());
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A request received by a `CannedHttpServer`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, as sent
    pub path: String,
    pub body: Vec<u8>,
}

/// A local HTTP server answering each connection with the next canned response
#[derive(Debug)]
pub struct CannedHttpServer {
    address: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl CannedHttpServer {
    /// Starts serving `(status, body)` pairs in order, one per connection
    pub fn start<B: Into<String>>(responses: Vec<(u16, B)>) -> CannedHttpServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses: Vec<(u16, String)> = responses
            .into_iter()
            .map(|(status, body)| (status, body.into()))
            .collect();

        let recorded = requests.clone();
        thread::spawn(move || {
            for (status, body) in responses {
                let stream = match listener.accept() {
                    Ok((stream, _)) => stream,
                    Err(_) => return,
                };
                if serve(stream, status, &body, &recorded).is_err() {
                    return;
                }
            }
        });

        CannedHttpServer { address, requests }
    }

    /// `http://127.0.0.1:<port>`
    pub fn uri(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn serve(
    stream: TcpStream,
    status: u16,
    body: &str,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut request_body = vec![0; content_length];
    reader.read_exact(&mut request_body)?;

    // record before the client can see the response
    recorded.lock().unwrap().push(RecordedRequest {
        method,
        path,
        body: request_body,
    });

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqtt::packet::PubackPacket;

    #[test]
    fn test_scripted_reads_then_eof() {
        let (mut stream, _handle) = MockStream::new();
        stream.push_bytes(&[1, 2, 3]);
        let mut buf = [0u8; 2];
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(stream.read(&mut buf).unwrap(), 1);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_canned_http_server() {
        let server = CannedHttpServer::start(vec![(201, "{}")]);
        let mut stream = TcpStream::connect(server.address).unwrap();
        stream
            .write_all(b"POST /x?y=1 HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.1 201"));
        assert!(response.ends_with("\r\n\r\n{}"));
        assert_eq!(
            server.requests(),
            vec![RecordedRequest {
                method: "POST".to_owned(),
                path: "/x?y=1".to_owned(),
                body: b"hi".to_vec(),
            }]
        );
    }

    #[test]
    fn test_written_packets_round_trip() {
        let (mut stream, handle) = MockStream::new();
        let mut bytes = Vec::new();
        PubackPacket::new(3).encode(&mut bytes).unwrap();
        stream.write_all(&bytes).unwrap();
        assert_eq!(handle.written_packets().len(), 1);
    }
}
