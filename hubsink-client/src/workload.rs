//! Client for the edge runtime's workload API.
//!
//! Modules never see their key: tokens are signed by the runtime, and the
//! gateway's server certificate chains to a bundle the runtime serves.
//! The runtime listens on a unix socket in production and on plain HTTP in
//! development setups.

use hubsink_protocol::auth::{TokenError, TokenSigner};
use log::debug;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[cfg(unix)]
use std::path::{Path, PathBuf};

/// Workload API version used when the runtime does not say otherwise
pub const DEFAULT_WORKLOAD_API_VERSION: &str = "2019-01-30";

const WORKLOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("invalid workload URI {0:?}")]
    InvalidUri(String),

    #[error("workload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("workload socket request failed: {0}")]
    Socket(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("workload runtime error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workload API did not answer within {0:?}")]
    Timeout(Duration),

    #[error("workload API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("workload JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Endpoint {
    #[cfg(unix)]
    Unix(PathBuf),
    /// `http://host:port`, without a trailing slash
    Http(String),
}

#[derive(Clone, Copy, Debug)]
enum Verb {
    Get,
    Post,
}

/// Talks to the workload API on behalf of a single module
#[derive(Clone, Debug)]
pub struct WorkloadClient {
    endpoint: Endpoint,
    module_id: String,
    generation_id: String,
    api_version: String,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    #[serde(rename = "keyId")]
    key_id: &'a str,
    algo: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct SignResponse {
    digest: String,
}

#[derive(Deserialize)]
struct TrustBundleResponse {
    certificate: String,
}

impl WorkloadClient {
    pub fn new(
        uri: &str,
        module_id: &str,
        generation_id: &str,
        api_version: &str,
    ) -> Result<WorkloadClient, WorkloadError> {
        Ok(WorkloadClient {
            endpoint: parse_endpoint(uri)?,
            module_id: module_id.to_owned(),
            generation_id: generation_id.to_owned(),
            api_version: api_version.to_owned(),
        })
    }

    /// Asks the runtime to HMAC-sign the data with the module's primary key
    pub fn sign_digest(&self, data: &[u8]) -> Result<String, WorkloadError> {
        let path = format!(
            "/modules/{}/genid/{}/sign?api-version={}",
            utf8_percent_encode(&self.module_id, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.generation_id, NON_ALPHANUMERIC),
            self.api_version
        );
        let body = serde_json::to_vec(&SignRequest {
            key_id: "primary",
            algo: "HMACSHA256",
            data: base64::encode(data),
        })?;
        let response: SignResponse = self.call(Verb::Post, &path, Some(body))?;
        Ok(response.digest)
    }

    /// Fetches the PEM bundle the edge gateway's certificate chains to
    pub fn trust_bundle(&self) -> Result<String, WorkloadError> {
        let path = format!("/trust-bundle?api-version={}", self.api_version);
        let response: TrustBundleResponse = self.call(Verb::Get, &path, None)?;
        Ok(response.certificate)
    }

    fn call<T: DeserializeOwned>(
        &self,
        verb: Verb,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, WorkloadError> {
        debug!("Workload API {:?} {}", verb, path);
        let (status, body) = match &self.endpoint {
            #[cfg(unix)]
            Endpoint::Unix(socket) => unix_request(socket, verb, path, body)?,
            Endpoint::Http(base) => http_request(base, verb, path, body)?,
        };
        if !(200..300).contains(&status) {
            return Err(WorkloadError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

impl TokenSigner for WorkloadClient {
    fn sign(&self, data: &[u8]) -> Result<String, TokenError> {
        self.sign_digest(data).map_err(|e| TokenError::Signer(Box::new(e)))
    }
}

fn parse_endpoint(uri: &str) -> Result<Endpoint, WorkloadError> {
    let invalid = || WorkloadError::InvalidUri(uri.to_owned());
    let url = Url::parse(uri).map_err(|_| invalid())?;
    match url.scheme() {
        #[cfg(unix)]
        "unix" => Ok(Endpoint::Unix(PathBuf::from(url.path()))),
        "http" => {
            let host = url.host_str().ok_or_else(invalid)?;
            let port = url.port().unwrap_or(80);
            Ok(Endpoint::Http(format!("http://{}:{}", host, port)))
        }
        _ => Err(invalid()),
    }
}

fn http_request(
    base: &str,
    verb: Verb,
    path: &str,
    body: Option<Vec<u8>>,
) -> Result<(u16, Vec<u8>), WorkloadError> {
    // the workload API is always local
    let client = reqwest::blocking::Client::builder()
        .timeout(WORKLOAD_TIMEOUT)
        .no_proxy()
        .build()?;
    let url = format!("{}{}", base, path);
    let mut request = match verb {
        Verb::Get => client.get(&url),
        Verb::Post => client.post(&url),
    };
    if let Some(body) = body {
        request = request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
    }
    let response = request.send()?;
    let status = response.status().as_u16();
    Ok((status, response.bytes()?.to_vec()))
}

#[cfg(unix)]
fn socket_error<E>(e: E) -> WorkloadError
where
    E: std::error::Error + Send + Sync + 'static,
{
    WorkloadError::Socket(Box::new(e))
}

#[cfg(unix)]
fn unix_request(
    socket: &Path,
    verb: Verb,
    path: &str,
    body: Option<Vec<u8>>,
) -> Result<(u16, Vec<u8>), WorkloadError> {
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper_util::client::legacy::Client;
    use hyperlocal::{UnixClientExt, UnixConnector};

    let method = match verb {
        Verb::Get => hyper::Method::GET,
        Verb::Post => hyper::Method::POST,
    };
    let mut builder = hyper::Request::builder()
        .method(method)
        .uri(hyper::Uri::from(hyperlocal::Uri::new(socket, path)));
    if body.is_some() {
        builder = builder.header(hyper::header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(Full::new(Bytes::from(body.unwrap_or_default())))
        .map_err(socket_error)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let client: Client<UnixConnector, Full<Bytes>> = Client::unix();
        let exchange = async {
            let response = client.request(request).await.map_err(socket_error)?;
            let status = response.status().as_u16();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(socket_error)?
                .to_bytes();
            Ok::<_, WorkloadError>((status, body.to_vec()))
        };
        tokio::time::timeout(WORKLOAD_TIMEOUT, exchange)
            .await
            .map_err(|_| WorkloadError::Timeout(WORKLOAD_TIMEOUT))?
    })
}
