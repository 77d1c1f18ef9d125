use crate::error::ClientError;
use hubsink_protocol::auth::sas::{SasToken, SharedAccessKey};
use hubsink_protocol::auth::TokenSigner;
use hubsink_protocol::qos::SessionMode;
use hubsink_protocol::{ClientIdentity, MQTT_TLS_PORT};
use hubsink_streams::StreamSettings;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
/// No PINGREQs are sent, so the hub applies its own idle timeout
pub const DEFAULT_KEEP_ALIVE_SECS: u16 = 0;

#[derive(Clone, Debug)]
pub struct ConnectionSettings {
    /// The hub the identity is registered in
    pub hub_host_name: String,
    /// Where the socket actually goes: the hub, or an edge gateway in front of it
    pub endpoint_host_name: String,
    pub port: u16,
    pub client_id: ClientIdentity,
    pub session_mode: SessionMode,
    pub timeout: Duration,
    pub keep_alive_secs: u16,
    pub token_ttl: Duration,
    pub trusted_roots: Vec<Vec<u8>>,
}

impl ConnectionSettings {
    pub fn new(hub_host_name: &str, client_id: ClientIdentity) -> ConnectionSettings {
        ConnectionSettings {
            hub_host_name: hub_host_name.to_owned(),
            endpoint_host_name: hub_host_name.to_owned(),
            port: MQTT_TLS_PORT,
            client_id,
            session_mode: SessionMode::Clean,
            timeout: DEFAULT_CONNECT_TIMEOUT,
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            token_ttl: DEFAULT_TOKEN_TTL,
            trusted_roots: Vec::new(),
        }
    }

    pub fn via_gateway(&self) -> bool {
        self.endpoint_host_name != self.hub_host_name
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            host_name: self.endpoint_host_name.clone(),
            port: self.port,
            timeout: self.timeout,
            trusted_roots: self.trusted_roots.clone(),
        }
    }
}

/// Signs SAS tokens for an identity, either with a local key or through a remote signer
#[derive(Clone, Debug)]
pub struct Credentials {
    signer: Arc<dyn TokenSigner>,
    key_name: Option<String>,
}

impl Credentials {
    pub fn shared_access_key(key: &str, key_name: Option<String>) -> Result<Credentials, ClientError> {
        Ok(Credentials {
            signer: Arc::new(SharedAccessKey::from_base64(key)?),
            key_name,
        })
    }

    pub fn signed_by<S: TokenSigner + 'static>(signer: S) -> Credentials {
        Credentials {
            signer: Arc::new(signer),
            key_name: None,
        }
    }

    /// Generates a fresh token for the settings' identity
    pub fn token(&self, settings: &ConnectionSettings) -> Result<String, ClientError> {
        // policy tokens are scoped to the whole hub
        let resource_uri = match self.key_name {
            Some(_) => settings.hub_host_name.clone(),
            None => settings.client_id.resource_uri(&settings.hub_host_name),
        };
        let token = SasToken::with_ttl(
            &resource_uri,
            self.key_name.as_deref(),
            self.signer.as_ref(),
            settings.token_ttl,
        )?;
        Ok(token.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_token_is_scoped_to_device() {
        let settings =
            ConnectionSettings::new("myhub.azure-devices.net", ClientIdentity::from_device_id("dev1"));
        let credentials = Credentials::shared_access_key("c2VjcmV0", None).unwrap();
        let token = credentials.token(&settings).unwrap();
        assert!(token.starts_with(
            "SharedAccessSignature sr=myhub.azure-devices.net%2Fdevices%2Fdev1&sig="
        ));
        assert!(!token.contains("skn="));
    }

    #[test]
    fn test_policy_token_is_scoped_to_hub() {
        let settings =
            ConnectionSettings::new("myhub.azure-devices.net", ClientIdentity::from_device_id("dev1"));
        let credentials =
            Credentials::shared_access_key("c2VjcmV0", Some("device".to_owned())).unwrap();
        let token = credentials.token(&settings).unwrap();
        assert!(token.starts_with("SharedAccessSignature sr=myhub.azure-devices.net&sig="));
        assert!(token.ends_with("&skn=device"));
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        assert!(matches!(
            Credentials::shared_access_key("***", None),
            Err(ClientError::Token(_))
        ));
    }

    #[test]
    fn test_stream_settings_target_endpoint() {
        let mut settings =
            ConnectionSettings::new("myhub.azure-devices.net", ClientIdentity::from_device_id("dev1"));
        assert!(!settings.via_gateway());
        settings.endpoint_host_name = "edgehub".to_owned();
        assert!(settings.via_gateway());
        assert_eq!(settings.stream_settings().host_name, "edgehub");
        assert_eq!(settings.stream_settings().port, 8883);
    }
}
