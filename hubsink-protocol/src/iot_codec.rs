use crate::messages::connect::{ConnectMsg, ConnectRes};
use crate::messages::telemetry::TelemetryMsg;
use crate::messages::{MsgFromHub, MsgToHub};
use crate::qos::{PacketId, SessionMode};
use crate::API_VERSION;
use log::{debug, trace};
use mqtt::control::variable_header::ConnectReturnCode;
use mqtt::packet::*;
use mqtt::{Decodable, Encodable, TopicName};
use thiserror::Error;

/// A Codec that encodes and decodes between IoT messages and MQTT packets
#[derive(Debug, Copy, Clone)]
pub struct IotCodec;

/// The result of an encoding process
pub type EncodingResult = Result<usize, CodecError>;

/// The result of a decoding process
pub type DecodingResult = Result<MsgFromHub, CodecError>;

/// Represents an error in encoding or decoding a packet
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CodecError {
    /// The MQTT packet type is unknown or unexpected
    #[error("Unexpected MQTT Packet Type")]
    UnexpectedMqttPacketType,

    /// The MQTT packet is invalid, according to the MQTT spec
    #[error("Invalid MQTT Packet")]
    InvalidMqttPacket,

    /// The topic name is invalid, according to the MQTT spec
    #[error("Invalid Topic: {0}")]
    InvalidTopic(String),
}

impl IotCodec {
    /// Encodes a MsgToHub and appends it to the provided buffer. Returns the encoded message size, or an error.
    pub fn encode(message: &MsgToHub, buf: &mut Vec<u8>) -> EncodingResult {
        let packet = Self::encode_message(message)?;
        let start = buf.len();
        packet
            .encode(buf)
            .map_err(|_e| CodecError::InvalidMqttPacket)?;
        Ok(buf.len() - start)
    }

    /// Decodes a single message from hub from the provided buffer
    ///
    /// # Errors
    /// Returns an error if the buffer contains an invalid MQTT packet
    pub fn decode(bytes: &[u8]) -> DecodingResult {
        let mut buf = bytes;
        let packet = VariablePacket::decode(&mut buf).map_err(|_e| CodecError::InvalidMqttPacket)?;
        Self::decode_packet(packet)
    }

    /// Encodes an IoT message to an MQTT packet
    pub fn encode_message(message: &MsgToHub) -> Result<VariablePacket, CodecError> {
        let encoded: VariablePacket = match message {
            MsgToHub::Connect(ref msg) => Self::encode_connect_message(msg).into(),
            MsgToHub::Telemetry(ref msg) => Self::encode_telemetry_message(msg)?.into(),
            MsgToHub::Disconnect => DisconnectPacket::new().into(),
        };

        Ok(encoded)
    }

    /// Decodes an MQTT packet into an IoT packet. Returns the IoT message, or an error.
    pub fn decode_packet(packet: VariablePacket) -> DecodingResult {
        match packet {
            VariablePacket::ConnackPacket(ref connack) => Ok(Self::decode_connack_packet(connack)),
            VariablePacket::PubackPacket(ref puback) => Ok(MsgFromHub::PublicationSucceeded(
                puback.packet_identifier().into(),
            )),
            VariablePacket::PublishPacket(ref publ) => {
                trace!("Ignoring publication on {}", publ.topic_name());
                Ok(MsgFromHub::UnknownMessage)
            }
            VariablePacket::PingrespPacket(_) => Ok(MsgFromHub::UnknownMessage),
            _other_packet => Err(CodecError::UnexpectedMqttPacketType),
        }
    }

    fn decode_connack_packet(packet: &ConnackPacket) -> MsgFromHub {
        let resp = match packet.connect_return_code() {
            ConnectReturnCode::ConnectionAccepted => ConnectRes::Accepted,
            ConnectReturnCode::BadUserNameOrPassword => ConnectRes::AuthenticationFailed,
            ConnectReturnCode::ServiceUnavailable => ConnectRes::ServiceUnavailable,
            ConnectReturnCode::UnacceptableProtocolVersion => {
                ConnectRes::UnacceptableProtocolVersion
            }
            ConnectReturnCode::IdentifierRejected => ConnectRes::AuthenticationFailed,
            ConnectReturnCode::NotAuthorized => ConnectRes::Unauthorized,
            ConnectReturnCode::Reserved(code) => ConnectRes::MqttReservedErrorCode(code),
        };

        resp.into()
    }

    fn encode_connect_message(msg: &ConnectMsg) -> ConnectPacket {
        let client_identifier = msg.client_id.client_identifier();

        let mut packet = ConnectPacket::new(client_identifier.clone());
        match msg.session_mode {
            SessionMode::Clean => packet.set_clean_session(true),
            SessionMode::Dirty => packet.set_clean_session(false),
        };
        packet.set_keep_alive(msg.keep_alive_secs);

        let username = format!(
            "{}/{}/?api-version={}",
            msg.hub_host_name, client_identifier, API_VERSION
        );
        debug!("Encoding CONNECT for {}", username);
        packet.set_user_name(Some(username));
        if let Some(ref token) = msg.sas_token {
            packet.set_password(Some(token.to_owned()));
        }
        packet
    }

    fn encode_telemetry_message(message: &TelemetryMsg) -> Result<PublishPacket, CodecError> {
        let qos_and_id = packet_id_to_qos(message.packet_id);

        let channel = message.client_id.events_topic();
        let channel = TopicName::new(channel.clone()).map_err(|_e| CodecError::InvalidTopic(channel))?;
        Ok(PublishPacket::new(
            channel,
            qos_and_id,
            message.payload.clone(),
        ))
    }
}

fn packet_id_to_qos(packet_id: Option<PacketId>) -> QoSWithPacketIdentifier {
    match packet_id {
        Some(id) => QoSWithPacketIdentifier::Level1(id.into()),
        None => QoSWithPacketIdentifier::Level0,
    }
}
