use crate::error::ClientError;
use hubsink_protocol::connect::{ConnectMsg, ConnectRes};
use hubsink_protocol::telemetry::TelemetryMsg;
use hubsink_protocol::{IotCodec, MsgFromHub, MsgToHub};
use log::{debug, trace};
use mqtt::control::{fixed_header::FixedHeaderError, FixedHeader};
use mqtt::packet::{VariablePacket, VariablePacketError};
use mqtt::Decodable;
use std::io::{Read, Write};

/// A blocking MQTT session with the hub over any byte stream
#[derive(Debug)]
pub struct MqttConnection<S: Read + Write> {
    stream: S,
}

impl<S: Read + Write> MqttConnection<S> {
    /// Sends CONNECT and waits for the hub's CONNACK
    pub fn connect(stream: S, msg: ConnectMsg) -> Result<MqttConnection<S>, ClientError> {
        let mut connection = MqttConnection { stream };
        debug!("Sending CONNECT as {}", msg.client_id);
        connection.write_msg(&msg.into())?;

        match connection.read_msg()? {
            MsgFromHub::ConnectResponseMessage(ConnectRes::Accepted) => {
                debug!("Connection accepted");
                Ok(connection)
            }
            MsgFromHub::ConnectResponseMessage(refused) => {
                Err(ClientError::ConnectionRefused(refused))
            }
            other => Err(ClientError::ProtocolViolation(format!(
                "expected CONNACK, got {}",
                other
            ))),
        }
    }

    /// Publishes a telemetry message, waiting for the PUBACK when it carries a packet id
    pub fn publish(&mut self, msg: TelemetryMsg) -> Result<(), ClientError> {
        let packet_id = msg.packet_id;
        self.write_msg(&msg.into())?;

        let packet_id = match packet_id {
            Some(packet_id) => packet_id,
            None => return Ok(()),
        };

        loop {
            match self.read_msg()? {
                MsgFromHub::PublicationSucceeded(acked) if acked == packet_id => {
                    trace!("Publication {} acknowledged", acked);
                    return Ok(());
                }
                MsgFromHub::PublicationSucceeded(stale) => {
                    debug!("Ignoring PUBACK for {}", stale);
                }
                MsgFromHub::UnknownMessage => {}
                other => {
                    return Err(ClientError::ProtocolViolation(format!(
                        "expected PUBACK, got {}",
                        other
                    )))
                }
            }
        }
    }

    /// Sends DISCONNECT and drops the stream
    pub fn disconnect(mut self) -> Result<(), ClientError> {
        debug!("Sending DISCONNECT");
        self.write_msg(&MsgToHub::Disconnect)
    }

    fn write_msg(&mut self, msg: &MsgToHub) -> Result<(), ClientError> {
        let mut buf = Vec::new();
        IotCodec::encode(msg, &mut buf)?;
        self.stream.write_all(&buf)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_msg(&mut self) -> Result<MsgFromHub, ClientError> {
        let header = match FixedHeader::decode(&mut self.stream) {
            Ok(header) => header,
            Err(FixedHeaderError::IoError(ioe)) => return Err(ioe.into()),
            Err(_other) => return Err(malformed()),
        };
        let packet = match VariablePacket::decode_with(&mut self.stream, Some(header)) {
            Ok(packet) => packet,
            Err(VariablePacketError::IoError(ioe)) => return Err(ioe.into()),
            Err(_other) => return Err(malformed()),
        };
        Ok(IotCodec::decode_packet(packet)?)
    }
}

fn malformed() -> ClientError {
    ClientError::ProtocolViolation("undecodable MQTT packet".to_owned())
}
