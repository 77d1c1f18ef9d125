/// Gateway host name the edge runtime routes module traffic through
pub const IOTEDGE_GATEWAYHOSTNAME: &str = "IOTEDGE_GATEWAYHOSTNAME";
/// Generation id of the running module instance
pub const IOTEDGE_MODULEGENERATIONID: &str = "IOTEDGE_MODULEGENERATIONID";
/// URI of the edge workload API
pub const IOTEDGE_WORKLOADURI: &str = "IOTEDGE_WORKLOADURI";
/// Host name of the IoT Hub the edge device belongs to
pub const IOTEDGE_IOTHUBHOSTNAME: &str = "IOTEDGE_IOTHUBHOSTNAME";
/// Edge device id
pub const IOTEDGE_DEVICEID: &str = "IOTEDGE_DEVICEID";
/// Module id
pub const IOTEDGE_MODULEID: &str = "IOTEDGE_MODULEID";
/// Authentication scheme, only `sasToken` is supported
pub const IOTEDGE_AUTHSCHEME: &str = "IOTEDGE_AUTHSCHEME";
/// Workload API version
pub const IOTEDGE_APIVERSION: &str = "IOTEDGE_APIVERSION";

/// The only auth scheme the edge runtime hands to modules
pub const SAS_TOKEN_AUTH_SCHEME: &str = "sasToken";

/// Ambient settings the edge runtime injects into module processes.
/// Unset and empty variables are both `None`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EdgeEnvironment {
    pub gateway_host_name: Option<String>,
    pub module_generation_id: Option<String>,
    pub workload_uri: Option<String>,
    pub iothub_host_name: Option<String>,
    pub device_id: Option<String>,
    pub module_id: Option<String>,
    pub auth_scheme: Option<String>,
    pub api_version: Option<String>,
}

impl EdgeEnvironment {
    /// Reads the process environment
    pub fn from_env() -> EdgeEnvironment {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the environment from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> EdgeEnvironment
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        EdgeEnvironment {
            gateway_host_name: get(IOTEDGE_GATEWAYHOSTNAME),
            module_generation_id: get(IOTEDGE_MODULEGENERATIONID),
            workload_uri: get(IOTEDGE_WORKLOADURI),
            iothub_host_name: get(IOTEDGE_IOTHUBHOSTNAME),
            device_id: get(IOTEDGE_DEVICEID),
            module_id: get(IOTEDGE_MODULEID),
            auth_scheme: get(IOTEDGE_AUTHSCHEME),
            api_version: get(IOTEDGE_APIVERSION),
        }
    }
}
