//! The seam between the output and the hub client library.

use hubsink_client::{ClientError, EdgeEnvironment, ModuleClient, MqttTransport};

/// What the output needs from a hub client
pub trait HubClient: Send {
    fn connect(&mut self) -> Result<(), ClientError>;

    fn send_event(&mut self, payload: &[u8]) -> Result<(), ClientError>;

    fn close(&mut self) -> Result<(), ClientError>;
}

impl HubClient for ModuleClient {
    fn connect(&mut self) -> Result<(), ClientError> {
        ModuleClient::connect(self)
    }

    fn send_event(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        ModuleClient::send_event(self, payload)
    }

    fn close(&mut self) -> Result<(), ClientError> {
        ModuleClient::close(self)
    }
}

/// Builds hub clients for the two credential paths
pub trait ClientFactory: Send + Sync {
    fn from_connection_string(
        &self,
        connection_string: &str,
        edge: &EdgeEnvironment,
        use_gateway: bool,
    ) -> Result<Box<dyn HubClient>, ClientError>;

    fn from_environment(
        &self,
        edge: &EdgeEnvironment,
        use_gateway: bool,
    ) -> Result<Box<dyn HubClient>, ClientError>;
}

/// Module clients speaking MQTT over TLS
#[derive(Debug, Default)]
pub struct MqttClientFactory;

impl ClientFactory for MqttClientFactory {
    fn from_connection_string(
        &self,
        connection_string: &str,
        edge: &EdgeEnvironment,
        use_gateway: bool,
    ) -> Result<Box<dyn HubClient>, ClientError> {
        let client = ModuleClient::from_connection_string(
            Box::new(MqttTransport::new()),
            connection_string,
            edge,
            use_gateway,
        )?;
        Ok(Box::new(client))
    }

    fn from_environment(
        &self,
        edge: &EdgeEnvironment,
        use_gateway: bool,
    ) -> Result<Box<dyn HubClient>, ClientError> {
        let client =
            ModuleClient::from_edge_environment(Box::new(MqttTransport::new()), edge, use_gateway)?;
        Ok(Box::new(client))
    }
}
