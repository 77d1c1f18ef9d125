use crate::identity::ClientIdentity;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Connection string key for the hub host name
pub const HOST_NAME: &str = "HostName";
/// Connection string key for the device id
pub const DEVICE_ID: &str = "DeviceId";
/// Connection string key for the module id
pub const MODULE_ID: &str = "ModuleId";
/// Connection string key for the shared access policy name
pub const SHARED_ACCESS_KEY_NAME: &str = "SharedAccessKeyName";
/// Connection string key for the shared access key
pub const SHARED_ACCESS_KEY: &str = "SharedAccessKey";
/// Connection string key for the edge gateway host name
pub const GATEWAY_HOST_NAME: &str = "GatewayHostName";

/// Represents an error parsing a connection string
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConnectionStringError {
    /// A segment is not a `Key=Value` pair
    #[error("malformed connection string segment: {0:?}")]
    MalformedSegment(String),

    /// A required key is absent or empty
    #[error("connection string is missing {0}")]
    MissingKey(&'static str),
}

/// A parsed device or module connection string
#[derive(Clone, Eq, PartialEq)]
pub struct ConnectionString {
    /// The IoT Hub host name
    pub host_name: String,

    /// The device ID
    pub device_id: String,

    /// The module ID, for module connection strings
    pub module_id: Option<String>,

    /// The shared access policy name, when authenticating with a hub-level policy
    pub shared_access_key_name: Option<String>,

    /// The base64 shared access key
    pub shared_access_key: String,

    /// The edge gateway to connect through, if any
    pub gateway_host_name: Option<String>,
}

impl ConnectionString {
    /// The identity the connection string authenticates as
    pub fn identity(&self) -> ClientIdentity {
        match &self.module_id {
            Some(module_id) => ClientIdentity::from_module_id(&self.device_id, module_id),
            None => ClientIdentity::from_device_id(&self.device_id),
        }
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut host_name = None;
        let mut device_id = None;
        let mut module_id = None;
        let mut shared_access_key_name = None;
        let mut shared_access_key = None;
        let mut gateway_host_name = None;

        for segment in s.split(';').filter(|segment| !segment.is_empty()) {
            // keys are base64, so only the first '=' separates key from value
            let mut pair = segment.splitn(2, '=');
            let key = pair.next().unwrap_or_default();
            let value = match pair.next() {
                Some(value) => value,
                None => return Err(ConnectionStringError::MalformedSegment(segment.to_owned())),
            };
            if value.is_empty() {
                continue;
            }

            let slot = match key {
                HOST_NAME => &mut host_name,
                DEVICE_ID => &mut device_id,
                MODULE_ID => &mut module_id,
                SHARED_ACCESS_KEY_NAME => &mut shared_access_key_name,
                SHARED_ACCESS_KEY => &mut shared_access_key,
                GATEWAY_HOST_NAME => &mut gateway_host_name,
                _ => continue,
            };
            *slot = Some(value.to_owned());
        }

        Ok(ConnectionString {
            host_name: host_name.ok_or(ConnectionStringError::MissingKey(HOST_NAME))?,
            device_id: device_id.ok_or(ConnectionStringError::MissingKey(DEVICE_ID))?,
            module_id,
            shared_access_key_name,
            shared_access_key: shared_access_key
                .ok_or(ConnectionStringError::MissingKey(SHARED_ACCESS_KEY))?,
            gateway_host_name,
        })
    }
}

// The key never shows up in logs
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host_name", &self.host_name)
            .field("device_id", &self.device_id)
            .field("module_id", &self.module_id)
            .field("shared_access_key_name", &self.shared_access_key_name)
            .field("shared_access_key", &"<redacted>")
            .field("gateway_host_name", &self.gateway_host_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_connection_string() {
        let cs: ConnectionString =
            "HostName=myhub.azure-devices.net;DeviceId=dev1;ModuleId=m1;SharedAccessKey=a2V5PT0="
                .parse()
                .unwrap();
        assert_eq!(cs.host_name, "myhub.azure-devices.net");
        assert_eq!(cs.device_id, "dev1");
        assert_eq!(cs.module_id.as_deref(), Some("m1"));
        assert_eq!(cs.shared_access_key, "a2V5PT0=");
        assert_eq!(cs.identity(), ClientIdentity::from_module_id("dev1", "m1"));
    }

    #[test]
    fn test_parse_keeps_padding_in_key() {
        let cs: ConnectionString = "HostName=h;DeviceId=d;SharedAccessKey=YWJj==;"
            .parse()
            .unwrap();
        assert_eq!(cs.shared_access_key, "YWJj==");
        assert_eq!(cs.identity(), ClientIdentity::from_device_id("d"));
    }

    #[test]
    fn test_parse_gateway_and_policy() {
        let cs: ConnectionString = "HostName=h;DeviceId=d;SharedAccessKeyName=owner;SharedAccessKey=k;GatewayHostName=edge;Other=x"
            .parse()
            .unwrap();
        assert_eq!(cs.shared_access_key_name.as_deref(), Some("owner"));
        assert_eq!(cs.gateway_host_name.as_deref(), Some("edge"));
    }

    #[test]
    fn test_parse_missing_device_id() {
        let result = "HostName=h;SharedAccessKeyName=owner;SharedAccessKey=k"
            .parse::<ConnectionString>();
        assert_eq!(result, Err(ConnectionStringError::MissingKey(DEVICE_ID)));
    }

    #[test]
    fn test_parse_malformed_segment() {
        let result = "HostName=h;DeviceId".parse::<ConnectionString>();
        assert_eq!(
            result,
            Err(ConnectionStringError::MalformedSegment("DeviceId".to_owned()))
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let cs: ConnectionString = "HostName=h;DeviceId=d;SharedAccessKey=secret"
            .parse()
            .unwrap();
        assert!(!format!("{:?}", cs).contains("secret"));
    }
}
