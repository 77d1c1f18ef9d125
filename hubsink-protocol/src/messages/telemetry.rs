use crate::{qos::PacketId, ClientIdentity};

/// A device-to-cloud message
#[derive(Clone, Debug)]
pub struct TelemetryMsg {
    /// The sender's identity
    pub client_id: ClientIdentity,

    /// The message body, already serialized
    pub payload: Vec<u8>,

    /// Packet ID, absent for QoS 0 publications
    pub packet_id: Option<PacketId>,
}
