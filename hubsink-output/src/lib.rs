//! An output that forwards metrics to Azure IoT Hub, as a device, a module, or an
//! IoT Edge module authenticated by its runtime.

#[macro_use]
extern crate log;

pub mod client;
pub mod config;
pub mod error;
pub mod iothub;
pub mod metric;
pub mod registry;
pub mod resolver;
pub mod serializer;
pub mod status;

pub use config::IotHubConfig;
pub use error::OutputError;
pub use iothub::IotHubOutput;
pub use metric::{FieldValue, Metric};
pub use registry::Registry;
pub use resolver::CredentialSource;
pub use serializer::{JsonSerializer, Serializer};
pub use status::ConnectionStatus;

/// A metrics sink driven by the host: `init` once, `connect`, then `write`
/// batches until `close`.
pub trait Output: Send + Sync {
    fn description(&self) -> &'static str;

    fn sample_config(&self) -> &'static str;

    fn init(&mut self) -> Result<(), OutputError>;

    fn connect(&self) -> Result<(), OutputError>;

    fn close(&self) -> Result<(), OutputError>;

    fn write(&self, metrics: &[Metric]) -> Result<(), OutputError>;
}
