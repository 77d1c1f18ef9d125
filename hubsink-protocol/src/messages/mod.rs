/// Connection flow messages
pub mod connect;

/// Device-to-cloud telemetry messages
pub mod telemetry;

use crate::qos::PacketId;
use connect::{ConnectMsg, ConnectRes};
use std::fmt::Display;
use telemetry::TelemetryMsg;

/// Represents a single message from the IoT Hub to the client
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MsgFromHub {
    /// The codec did not recognize the decoded message.
    UnknownMessage,

    /// The response to a connection attempt
    ConnectResponseMessage(ConnectRes),

    /// Publication acknowledgement
    PublicationSucceeded(PacketId),
}

impl Display for MsgFromHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            MsgFromHub::ConnectResponseMessage(res) => write!(f, "Connect response: {}", res),
            MsgFromHub::PublicationSucceeded(packet_id) => {
                write!(f, "Publication succeeded: {}", packet_id)
            }
            MsgFromHub::UnknownMessage => write!(f, "Unknown msg"),
        }
    }
}

impl From<ConnectRes> for MsgFromHub {
    fn from(response: ConnectRes) -> Self {
        MsgFromHub::ConnectResponseMessage(response)
    }
}

/// Represents a single message from the client to the IoT Hub
#[derive(Clone, Debug)]
pub enum MsgToHub {
    /// Connection request
    Connect(ConnectMsg),

    /// Device-to-cloud telemetry
    Telemetry(TelemetryMsg),

    /// Graceful disconnect
    Disconnect,
}

impl MsgToHub {
    /// The packet identifier the hub will acknowledge, if any
    pub fn packet_id(&self) -> Option<PacketId> {
        match self {
            MsgToHub::Telemetry(msg) => msg.packet_id,
            MsgToHub::Connect(_) | MsgToHub::Disconnect => None,
        }
    }
}

impl From<ConnectMsg> for MsgToHub {
    fn from(msg: ConnectMsg) -> Self {
        MsgToHub::Connect(msg)
    }
}

impl From<TelemetryMsg> for MsgToHub {
    fn from(msg: TelemetryMsg) -> Self {
        MsgToHub::Telemetry(msg)
    }
}
