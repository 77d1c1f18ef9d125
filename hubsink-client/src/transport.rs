use crate::connection::MqttConnection;
use crate::error::ClientError;
use crate::settings::ConnectionSettings;
use hubsink_protocol::connect::ConnectMsg;
use hubsink_protocol::telemetry::TelemetryMsg;
use hubsink_streams::{open_stream, IoStream};
use std::fmt;

/// Carries IoT Hub messages over some wire protocol
pub trait Transport: fmt::Debug + Send {
    /// Opens the connection and authenticates
    fn connect(&mut self, settings: &ConnectionSettings, msg: ConnectMsg) -> Result<(), ClientError>;

    /// Delivers a telemetry message
    fn send(&mut self, msg: TelemetryMsg) -> Result<(), ClientError>;

    /// Closes the connection. Closing a closed transport does nothing.
    fn close(&mut self) -> Result<(), ClientError>;
}

/// MQTT over TLS on port 8883
#[derive(Default)]
pub struct MqttTransport {
    connection: Option<MqttConnection<IoStream>>,
}

impl MqttTransport {
    pub fn new() -> MqttTransport {
        MqttTransport { connection: None }
    }
}

impl fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttTransport")
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl Transport for MqttTransport {
    fn connect(&mut self, settings: &ConnectionSettings, msg: ConnectMsg) -> Result<(), ClientError> {
        if let Some(stale) = self.connection.take() {
            // the hub drops the older session anyway
            let _ = stale.disconnect();
        }
        let stream = open_stream(&settings.stream_settings())?;
        self.connection = Some(MqttConnection::connect(stream, msg)?);
        Ok(())
    }

    fn send(&mut self, msg: TelemetryMsg) -> Result<(), ClientError> {
        self.connection
            .as_mut()
            .ok_or(ClientError::NotConnected)?
            .publish(msg)
    }

    fn close(&mut self) -> Result<(), ClientError> {
        match self.connection.take() {
            Some(connection) => connection.disconnect(),
            None => Ok(()),
        }
    }
}
