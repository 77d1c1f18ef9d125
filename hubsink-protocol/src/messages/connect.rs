use crate::{identity::ClientIdentity, qos::SessionMode};
use core::fmt::{self, Display};

/// A request to connect to the IoT Hub
#[derive(Clone)]
pub struct ConnectMsg {
    /// The identity of the client (device or module)
    pub client_id: ClientIdentity,

    /// The IoT Hub host name, even when connecting through a gateway
    pub hub_host_name: String,

    /// A SAS token used for auth
    pub sas_token: Option<String>,

    /// The session mode of the new connection
    pub session_mode: SessionMode,

    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl fmt::Debug for ConnectMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectMsg")
            .field("client_id", &self.client_id)
            .field("hub_host_name", &self.hub_host_name)
            .field("sas_token", &self.sas_token.as_ref().map(|_| "<redacted>"))
            .field("session_mode", &self.session_mode)
            .field("keep_alive_secs", &self.keep_alive_secs)
            .finish()
    }
}

/// Represents the IoT Hub's response to the connection request
#[derive(Clone, Debug, Copy, Eq, PartialEq)]
pub enum ConnectRes {
    /// The connection succeeded
    Accepted,

    /// Authentication failure (i.e. incorrect credentials, or device is not defined in this hub, etc.)
    AuthenticationFailed,

    /// The device is not authorized to connect to the hub
    Unauthorized,

    /// The IoT Hub service is unavailable
    ServiceUnavailable,

    /// MQTT protocol version is unacceptable
    UnacceptableProtocolVersion,

    /// MQTT reserved error code
    MqttReservedErrorCode(u8),
}

impl Display for ConnectRes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
