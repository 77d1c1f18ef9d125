use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

// Unreserved URI characters stay as they are
const ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A device identity
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceIdentity {
    /// The Device ID
    pub device_id: String,
}

impl From<String> for DeviceIdentity {
    fn from(device_id: String) -> Self {
        DeviceIdentity { device_id }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device_id)
    }
}

/// A device module identity
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModuleIdentity {
    /// The device ID
    pub device_id: String,

    /// The module ID
    pub module_id: String,
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.module_id)
    }
}

/// A client identity (device or module)
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClientIdentity {
    /// A device identity
    Device(DeviceIdentity),

    /// A module identity
    Module(ModuleIdentity),
}

impl ClientIdentity {
    /// Creates a Device Identity from the specified device_id
    pub fn from_device_id(device_id: &str) -> ClientIdentity {
        ClientIdentity::Device(DeviceIdentity {
            device_id: device_id.to_owned(),
        })
    }

    /// Creates a Module Identity from the specified device_id and module_id
    pub fn from_module_id(device_id: &str, module_id: &str) -> ClientIdentity {
        ClientIdentity::Module(ModuleIdentity {
            device_id: device_id.to_owned(),
            module_id: module_id.to_owned(),
        })
    }

    /// The device this identity belongs to
    pub fn device_id(&self) -> &str {
        match self {
            ClientIdentity::Device(device) => &device.device_id,
            ClientIdentity::Module(module) => &module.device_id,
        }
    }

    /// The MQTT client identifier: `device` or `device/module`
    pub fn client_identifier(&self) -> String {
        self.to_string()
    }

    /// The resource URI a SAS token for this identity is scoped to
    pub fn resource_uri(&self, host_name: &str) -> String {
        match self {
            ClientIdentity::Device(device) => format!(
                "{}/devices/{}",
                host_name,
                utf8_percent_encode(&device.device_id, ID_ENCODE_SET)
            ),
            ClientIdentity::Module(module) => format!(
                "{}/devices/{}/modules/{}",
                host_name,
                utf8_percent_encode(&module.device_id, ID_ENCODE_SET),
                utf8_percent_encode(&module.module_id, ID_ENCODE_SET)
            ),
        }
    }

    /// The topic device-to-cloud events are published on
    pub fn events_topic(&self) -> String {
        match self {
            ClientIdentity::Device(device) => {
                format!("devices/{}/messages/events/", device.device_id)
            }
            ClientIdentity::Module(module) => format!(
                "devices/{}/modules/{}/messages/events/",
                module.device_id, module.module_id
            ),
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::Device(device_id) => write!(f, "{}", device_id),
            ClientIdentity::Module(module_id) => write!(f, "{}", module_id),
        }
    }
}
