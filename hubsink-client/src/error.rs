use crate::workload::WorkloadError;
use hubsink_protocol::auth::TokenError;
use hubsink_protocol::connect::ConnectRes;
use hubsink_protocol::{CodecError, ConnectionStringError};
use thiserror::Error;

/// Everything that can go wrong constructing or using a hub client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid connection string: {0}")]
    ConnectionString(#[from] ConnectionStringError),

    #[error("cannot generate SAS token: {0}")]
    Token(#[from] TokenError),

    #[error("environment variable {0} is not set")]
    MissingEnvironment(&'static str),

    #[error("unsupported edge auth scheme {0:?}")]
    UnsupportedAuthScheme(String),

    #[error("workload API failure: {0}")]
    Workload(#[from] WorkloadError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("connection refused by hub: {0}")]
    ConnectionRefused(ConnectRes),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("client is not connected")]
    NotConnected,
}
