//! Blocking TCP and TLS streams for hub connections

use log::{debug, trace};
use std::io::{Error, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

#[cfg(feature = "use-native-tls")]
use native_tls::{Certificate, HandshakeError, TlsConnector, TlsStream};

/// Everything needed to open a TLS stream to a host
#[derive(Clone, Debug)]
pub struct StreamSettings {
    pub host_name: String,
    pub port: u16,
    pub timeout: Duration,
    /// PEM certificates trusted in addition to the system roots
    pub trusted_roots: Vec<Vec<u8>>,
}

#[cfg(feature = "use-native-tls")]
pub type IoStream = TlsStream<TcpStream>;

/// Opens a blocking TLS stream. Reads time out after `settings.timeout`.
#[cfg(feature = "use-native-tls")]
pub fn open_stream(settings: &StreamSettings) -> Result<IoStream, Error> {
    if settings.timeout == Duration::from_millis(0) {
        return Err(Error::new(ErrorKind::InvalidInput, "connect timeout must be positive"));
    }
    let now = Instant::now();
    let stream = open_tcp_stream(&settings.host_name, settings.port, settings.timeout)?;
    let connector = tls_connector(settings)?;

    debug!("Connecting TLS...");
    let mut handshake = connector.connect(&settings.host_name, stream);
    loop {
        match handshake {
            Ok(tls_stream) => {
                debug!("TLS connection established!");
                return Ok(tls_stream);
            }
            Err(HandshakeError::WouldBlock(mid)) => {
                // read timeouts surface as WouldBlock on some platforms
                if now.elapsed() >= settings.timeout {
                    return Err(ErrorKind::TimedOut.into());
                }
                trace!("Handshake interrupted, resuming");
                handshake = mid.handshake();
            }
            Err(HandshakeError::Failure(e)) => return Err(Error::new(ErrorKind::Other, e)),
        }
    }
}

#[cfg(feature = "use-native-tls")]
fn tls_connector(settings: &StreamSettings) -> Result<TlsConnector, Error> {
    let mut builder = TlsConnector::builder();
    for pem in &settings.trusted_roots {
        let certificate =
            Certificate::from_pem(pem).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        builder.add_root_certificate(certificate);
    }
    builder
        .build()
        .map_err(|e| Error::new(ErrorKind::Other, e))
}

pub fn open_tcp_stream(
    server_addr: &str,
    server_port: u16,
    timeout: Duration,
) -> Result<TcpStream, Error> {
    let server_socket = format!("{}:{}", server_addr, server_port);

    let addr = server_socket
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("cannot resolve {}", server_socket)))?;

    debug!("Connecting TCP stream to {:?} ... ", server_socket);
    let stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    debug!("TCP Connected!");

    Ok(stream)
}

/// Splits a PEM bundle into individual certificates
pub fn split_pem_bundle(bundle: &str) -> Vec<Vec<u8>> {
    const END: &str = "-----END CERTIFICATE-----";
    bundle
        .split_inclusive(END)
        .map(str::trim)
        .filter(|pem| pem.ends_with(END))
        .map(|pem| pem.as_bytes().to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pem_bundle() {
        let bundle = "-----BEGIN CERTIFICATE-----\nAAA\n-----END CERTIFICATE-----\n\
                      -----BEGIN CERTIFICATE-----\nBBB\n-----END CERTIFICATE-----\n";
        let certs = split_pem_bundle(bundle);
        assert_eq!(certs.len(), 2);
        assert!(String::from_utf8_lossy(&certs[1]).contains("BBB"));
    }

    #[test]
    fn test_split_pem_bundle_ignores_trailing_garbage() {
        assert!(split_pem_bundle("not a certificate").is_empty());
    }
}
