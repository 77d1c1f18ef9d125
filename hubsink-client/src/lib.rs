//! A blocking IoT Hub client for devices and edge modules that only send telemetry.

#[macro_use]
extern crate log;

pub mod connection;
pub mod edge;
pub mod error;
pub mod settings;
pub mod transport;
pub mod workload;

pub use edge::EdgeEnvironment;
pub use error::ClientError;
pub use settings::{ConnectionSettings, Credentials};
pub use transport::{MqttTransport, Transport};
pub use workload::WorkloadClient;

use edge::*;
use hubsink_protocol::connect::ConnectMsg;
use hubsink_protocol::qos::PacketsNumerator;
use hubsink_protocol::telemetry::TelemetryMsg;
use hubsink_protocol::{ClientIdentity, ConnectionString};
use hubsink_streams::split_pem_bundle;
use workload::DEFAULT_WORKLOAD_API_VERSION;

/// A hub client sending device-to-cloud events for a device or module identity
#[derive(Debug)]
pub struct ModuleClient {
    transport: Box<dyn Transport>,
    settings: ConnectionSettings,
    credentials: Credentials,
    workload: Option<WorkloadClient>,
    packets: PacketsNumerator,
}

impl ModuleClient {
    /// Creates a client from a device or module connection string.
    ///
    /// With `use_gateway`, the socket goes to the gateway named in the connection
    /// string, or else to the edge runtime's gateway; the edge environment also
    /// supplies the workload API that serves the gateway's trust bundle.
    pub fn from_connection_string(
        transport: Box<dyn Transport>,
        connection_string: &str,
        edge: &EdgeEnvironment,
        use_gateway: bool,
    ) -> Result<ModuleClient, ClientError> {
        let cs: ConnectionString = connection_string.parse()?;
        let credentials =
            Credentials::shared_access_key(&cs.shared_access_key, cs.shared_access_key_name.clone())?;
        let mut settings = ConnectionSettings::new(&cs.host_name, cs.identity());
        let mut workload = None;

        if use_gateway {
            let gateway = cs
                .gateway_host_name
                .as_ref()
                .or_else(|| edge.gateway_host_name.as_ref());
            match gateway {
                Some(gateway) => {
                    settings.endpoint_host_name = gateway.clone();
                    workload = edge_workload(edge, &settings.client_id)?;
                }
                None => debug!("No gateway host name known, connecting to the hub directly"),
            }
        }

        debug!("Client for {} via {}", settings.client_id, settings.endpoint_host_name);
        Ok(ModuleClient::new(transport, settings, credentials, workload))
    }

    /// Creates a module client whose tokens are signed by the edge workload API.
    ///
    /// Everything comes from the runtime's environment, see `EdgeEnvironment::from_env`.
    pub fn from_edge_environment(
        transport: Box<dyn Transport>,
        edge: &EdgeEnvironment,
        use_gateway: bool,
    ) -> Result<ModuleClient, ClientError> {
        if let Some(scheme) = &edge.auth_scheme {
            if scheme != SAS_TOKEN_AUTH_SCHEME {
                return Err(ClientError::UnsupportedAuthScheme(scheme.clone()));
            }
        }

        let hub_host_name = require(&edge.iothub_host_name, IOTEDGE_IOTHUBHOSTNAME)?;
        let device_id = require(&edge.device_id, IOTEDGE_DEVICEID)?;
        let module_id = require(&edge.module_id, IOTEDGE_MODULEID)?;
        let generation_id = require(&edge.module_generation_id, IOTEDGE_MODULEGENERATIONID)?;
        let workload_uri = require(&edge.workload_uri, IOTEDGE_WORKLOADURI)?;
        let api_version = edge
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_WORKLOAD_API_VERSION);

        let workload = WorkloadClient::new(workload_uri, module_id, generation_id, api_version)?;
        let mut settings =
            ConnectionSettings::new(hub_host_name, ClientIdentity::from_module_id(device_id, module_id));
        if use_gateway {
            settings.endpoint_host_name =
                require(&edge.gateway_host_name, IOTEDGE_GATEWAYHOSTNAME)?.to_owned();
        }

        let credentials = Credentials::signed_by(workload.clone());
        let workload = if use_gateway { Some(workload) } else { None };
        debug!("Edge client for {} via {}", settings.client_id, settings.endpoint_host_name);
        Ok(ModuleClient::new(transport, settings, credentials, workload))
    }

    fn new(
        transport: Box<dyn Transport>,
        settings: ConnectionSettings,
        credentials: Credentials,
        workload: Option<WorkloadClient>,
    ) -> ModuleClient {
        ModuleClient {
            transport,
            settings,
            credentials,
            workload,
            packets: PacketsNumerator::new(),
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.settings.client_id
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Authenticates with a freshly signed token and opens the connection
    pub fn connect(&mut self) -> Result<(), ClientError> {
        let mut settings = self.settings.clone();
        if let Some(workload) = &self.workload {
            let bundle = workload.trust_bundle()?;
            settings.trusted_roots.extend(split_pem_bundle(&bundle));
        }

        let msg = ConnectMsg {
            client_id: settings.client_id.clone(),
            hub_host_name: settings.hub_host_name.clone(),
            sas_token: Some(self.credentials.token(&settings)?),
            session_mode: settings.session_mode,
            keep_alive_secs: settings.keep_alive_secs,
        };

        info!(
            "Connecting to {}:{} as {}",
            settings.endpoint_host_name, settings.port, settings.client_id
        );
        self.transport.connect(&settings, msg)
    }

    /// Sends one device-to-cloud event and waits for the hub to acknowledge it
    pub fn send_event(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        let msg = TelemetryMsg {
            client_id: self.settings.client_id.clone(),
            payload: payload.to_vec(),
            packet_id: Some(self.packets.next()),
        };
        trace!("Sending {} byte event", payload.len());
        self.transport.send(msg)
    }

    pub fn close(&mut self) -> Result<(), ClientError> {
        info!("Closing connection to {}", self.settings.endpoint_host_name);
        self.transport.close()
    }
}

fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ClientError> {
    value.as_deref().ok_or(ClientError::MissingEnvironment(name))
}

/// The workload API is only usable when the runtime told us where it is and who we are
fn edge_workload(
    edge: &EdgeEnvironment,
    client_id: &ClientIdentity,
) -> Result<Option<WorkloadClient>, ClientError> {
    let module_id = match client_id {
        ClientIdentity::Module(module) => Some(module.module_id.as_str()),
        ClientIdentity::Device(_) => edge.module_id.as_deref(),
    };
    match (&edge.workload_uri, &edge.module_generation_id, module_id) {
        (Some(uri), Some(generation_id), Some(module_id)) => {
            let api_version = edge
                .api_version
                .as_deref()
                .unwrap_or(DEFAULT_WORKLOAD_API_VERSION);
            Ok(Some(WorkloadClient::new(uri, module_id, generation_id, api_version)?))
        }
        _ => Ok(None),
    }
}
