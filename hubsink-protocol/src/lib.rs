//! The Hubsink-Protocol Crate
//!
//! Data types shared by IoT Hub telemetry clients: device and module identities,
//! connection strings, SAS tokens, and the MQTT codec for the messages a
//! telemetry-only client exchanges with the hub.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unused_qualifications,
    unreachable_pub,
    unsafe_code,
    trivial_casts,
    trivial_numeric_casts
)]

/// Device and module identities
pub mod identity;

/// Connection string parsing
pub mod connection_string;

/// IoT protocol encoder/decoder
pub mod iot_codec;

/// The IoT Hub protocol messages
pub mod messages;

/// QoS and session modes
pub mod qos;

/// Authentication methods
pub mod auth;

pub use crate::connection_string::*;
pub use crate::identity::*;
pub use crate::iot_codec::*;
pub use crate::messages::*;

/// The IoT Hub MQTT API version used in connect user names
pub const API_VERSION: &str = "2018-06-30";

/// The IoT Hub MQTT over TLS port
pub const MQTT_TLS_PORT: u16 = 8883;
