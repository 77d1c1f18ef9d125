//! The `azure_iothub` output.

use crate::client::{ClientFactory, HubClient, MqttClientFactory};
use crate::config::IotHubConfig;
use crate::error::OutputError;
use crate::metric::Metric;
use crate::resolver::{resolve, CredentialSource};
use crate::serializer::{JsonSerializer, Serializer};
use crate::status::{ConnectGuard, ConnectionStatus};
use crate::Output;
use hubsink_client::EdgeEnvironment;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const DESCRIPTION: &str = "Output plugin for Azure IoT Hub Edge Module";

pub const SAMPLE_CONFIG: &str = r#"
  ## One of the following sets is required:
  #
  ## For use on IoT Edge, credentials come from the module's environment:
  #
  # use_gateway = true
  #
  ## A device or module connection string:
  #
  # connection_string = ""
  # use_gateway = true
  #
  ## A connection string assembled from its parts:
  #
  # hub_name = ""
  # device_id = ""
  # module_id = ""
  # shared_access_key = ""
  # shared_access_key_name = ""
  # use_gateway = true
"#;

struct Hub {
    client: Mutex<Box<dyn HubClient>>,
    serializer: Box<dyn Serializer>,
    status: ConnectGuard,
}

impl Hub {
    fn client(&self) -> MutexGuard<'_, Box<dyn HubClient>> {
        self.client.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forwards each metrics batch to the hub as a single JSON event
pub struct IotHubOutput {
    config: IotHubConfig,
    edge: EdgeEnvironment,
    factory: Box<dyn ClientFactory>,
    hub: Option<Hub>,
}

impl fmt::Debug for IotHubOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IotHubOutput")
            .field("config", &self.config)
            .field("initialized", &self.hub.is_some())
            .finish()
    }
}

impl IotHubOutput {
    pub fn new(config: IotHubConfig) -> IotHubOutput {
        Self::with_factory(config, Box::new(MqttClientFactory), EdgeEnvironment::from_env())
    }

    pub fn with_factory(
        config: IotHubConfig,
        factory: Box<dyn ClientFactory>,
        edge: EdgeEnvironment,
    ) -> IotHubOutput {
        IotHubOutput {
            config,
            edge,
            factory,
            hub: None,
        }
    }

    pub fn config(&self) -> &IotHubConfig {
        &self.config
    }

    pub fn status(&self) -> ConnectionStatus {
        self.hub
            .as_ref()
            .map_or(ConnectionStatus::Disconnected, |hub| hub.status.status())
    }

    fn hub(&self) -> Result<&Hub, OutputError> {
        self.hub.as_ref().ok_or(OutputError::NotInitialized)
    }
}

impl Output for IotHubOutput {
    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn sample_config(&self) -> &'static str {
        SAMPLE_CONFIG
    }

    fn init(&mut self) -> Result<(), OutputError> {
        let source = resolve(&self.config);
        debug!("Hub credentials: {:?}", source);

        let client = match source {
            CredentialSource::ExplicitConnectionString(connection_string) => self
                .factory
                .from_connection_string(&connection_string, &self.edge, self.config.use_gateway)?,
            CredentialSource::DerivedFromParts(connection_string) => {
                let client = self.factory.from_connection_string(
                    &connection_string,
                    &self.edge,
                    self.config.use_gateway,
                )?;
                self.config.connection_string = Some(connection_string);
                client
            }
            CredentialSource::FromEnvironment => {
                info!("No static hub credentials, using the edge module environment");
                self.factory
                    .from_environment(&self.edge, self.config.use_gateway)?
            }
        };

        self.hub = Some(Hub {
            client: Mutex::new(client),
            serializer: Box::new(JsonSerializer::new(Duration::from_secs(1))),
            status: ConnectGuard::new(),
        });
        Ok(())
    }

    fn connect(&self) -> Result<(), OutputError> {
        let hub = self.hub()?;
        hub.status.connect_once(|| hub.client().connect())?;
        Ok(())
    }

    fn close(&self) -> Result<(), OutputError> {
        let hub = match &self.hub {
            Some(hub) => hub,
            None => return Ok(()),
        };
        let result = hub.client().close();
        hub.status.reset();
        result.map_err(OutputError::from)
    }

    fn write(&self, metrics: &[Metric]) -> Result<(), OutputError> {
        let hub = self.hub()?;
        let payload = hub.serializer.serialize_batch(metrics)?;
        trace!("Writing {} metrics", metrics.len());
        hub.client().send_event(&payload)?;
        Ok(())
    }
}
