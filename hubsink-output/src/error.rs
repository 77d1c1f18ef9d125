use crate::serializer::SerializeError;
use hubsink_client::ClientError;
use thiserror::Error;

/// Failures surfaced to the host. Delegate errors are carried unchanged as the source.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("invalid output configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("unknown output plugin {0:?}")]
    UnknownOutput(String),

    #[error("output used before init")]
    NotInitialized,

    #[error("hub client error: {0}")]
    Client(#[from] ClientError),

    #[error("cannot serialize metrics: {0}")]
    Serialize(#[from] SerializeError),
}
