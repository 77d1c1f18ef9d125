use serde::Deserialize;
use std::fmt;

/// The `[[outputs.azure_iothub]]` table
#[derive(Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct IotHubConfig {
    /// Route through the edge gateway when one is known
    pub use_gateway: bool,
    pub connection_string: Option<String>,
    pub hub_name: Option<String>,
    pub device_id: Option<String>,
    pub module_id: Option<String>,
    pub shared_access_key: Option<String>,
    pub shared_access_key_name: Option<String>,
}

/// Whitespace-only values count as unset
pub fn is_present(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map_or(false, |value| !value.trim().is_empty())
}

impl IotHubConfig {
    pub fn has_connection_string(&self) -> bool {
        is_present(&self.connection_string)
    }

    pub fn has_hub_name(&self) -> bool {
        is_present(&self.hub_name)
    }

    pub fn has_device_id(&self) -> bool {
        is_present(&self.device_id)
    }

    pub fn has_module_id(&self) -> bool {
        is_present(&self.module_id)
    }

    pub fn has_shared_access_key(&self) -> bool {
        is_present(&self.shared_access_key)
    }

    pub fn has_shared_access_key_name(&self) -> bool {
        is_present(&self.shared_access_key_name)
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for IotHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IotHubConfig")
            .field("use_gateway", &self.use_gateway)
            .field("connection_string", &redacted(&self.connection_string))
            .field("hub_name", &self.hub_name)
            .field("device_id", &self.device_id)
            .field("module_id", &self.module_id)
            .field("shared_access_key", &redacted(&self.shared_access_key))
            .field("shared_access_key_name", &self.shared_access_key_name)
            .finish()
    }
}
