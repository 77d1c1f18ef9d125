//! Decides where the hub credentials come from.

use crate::config::{is_present, IotHubConfig};
use std::fmt;

/// The credential source picked for a configuration, in order of precedence
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// `connection_string` was configured and is used as is
    ExplicitConnectionString(String),

    /// A connection string assembled from the hub name, ids and key
    DerivedFromParts(String),

    /// No usable static credentials: the edge runtime's environment decides
    FromEnvironment,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::ExplicitConnectionString(_) => {
                f.write_str("ExplicitConnectionString(<redacted>)")
            }
            CredentialSource::DerivedFromParts(_) => f.write_str("DerivedFromParts(<redacted>)"),
            CredentialSource::FromEnvironment => f.write_str("FromEnvironment"),
        }
    }
}

/// A configuration is valid with a connection string, or with a hub name and
/// key plus either a key name or a device id.
pub fn validate(config: &IotHubConfig) -> bool {
    if config.has_connection_string() {
        return true;
    }

    config.has_hub_name()
        && config.has_shared_access_key()
        && (config.has_shared_access_key_name() || config.has_device_id())
}

/// Assembles `HostName=..;DeviceId=..;ModuleId=..;SharedAccessKeyName=..;SharedAccessKey=..`,
/// skipping absent fields. Values are copied verbatim.
pub fn build_connection_string(config: &IotHubConfig) -> String {
    let mut conn = format!("HostName={}", config.hub_name.as_deref().unwrap_or_default());

    let parts = [
        ("DeviceId", &config.device_id),
        ("ModuleId", &config.module_id),
        ("SharedAccessKeyName", &config.shared_access_key_name),
        ("SharedAccessKey", &config.shared_access_key),
    ];
    for &(key, value) in parts.iter() {
        if let Some(value) = value.as_deref().filter(|_| is_present(value)) {
            conn.push(';');
            conn.push_str(key);
            conn.push('=');
            conn.push_str(value);
        }
    }

    conn
}

pub fn resolve(config: &IotHubConfig) -> CredentialSource {
    if !validate(config) {
        return CredentialSource::FromEnvironment;
    }

    match &config.connection_string {
        Some(connection_string) if config.has_connection_string() => {
            CredentialSource::ExplicitConnectionString(connection_string.clone())
        }
        _ => CredentialSource::DerivedFromParts(build_connection_string(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(
        hub: Option<&str>,
        device: Option<&str>,
        module: Option<&str>,
        key_name: Option<&str>,
        key: Option<&str>,
    ) -> IotHubConfig {
        IotHubConfig {
            hub_name: hub.map(str::to_owned),
            device_id: device.map(str::to_owned),
            module_id: module.map(str::to_owned),
            shared_access_key_name: key_name.map(str::to_owned),
            shared_access_key: key.map(str::to_owned),
            ..IotHubConfig::default()
        }
    }

    #[test]
    fn test_connection_string_alone_is_valid_and_kept() {
        let config = IotHubConfig {
            connection_string: Some("HostName=h;DeviceId=d;SharedAccessKey=k".to_owned()),
            ..IotHubConfig::default()
        };
        assert!(validate(&config));
        assert_eq!(
            resolve(&config),
            CredentialSource::ExplicitConnectionString(
                "HostName=h;DeviceId=d;SharedAccessKey=k".to_owned()
            )
        );
    }

    #[test]
    fn test_connection_string_wins_over_parts() {
        let mut config = parts(Some("myhub"), Some("dev1"), None, None, Some("abc"));
        config.connection_string = Some("HostName=other;DeviceId=x;SharedAccessKey=y".to_owned());
        assert_eq!(
            resolve(&config),
            CredentialSource::ExplicitConnectionString(
                "HostName=other;DeviceId=x;SharedAccessKey=y".to_owned()
            )
        );
    }

    #[test]
    fn test_hub_key_and_device_id() {
        let config = parts(Some("myhub"), Some("dev1"), None, None, Some("abc"));
        assert!(validate(&config));
        assert_eq!(
            resolve(&config),
            CredentialSource::DerivedFromParts(
                "HostName=myhub;DeviceId=dev1;SharedAccessKey=abc".to_owned()
            )
        );
    }

    #[test]
    fn test_hub_key_and_key_name() {
        let config = parts(Some("myhub"), None, None, Some("iothubowner"), Some("abc"));
        assert!(validate(&config));
        assert_eq!(
            build_connection_string(&config),
            "HostName=myhub;SharedAccessKeyName=iothubowner;SharedAccessKey=abc"
        );
    }

    #[test]
    fn test_all_fields_in_order() {
        let config = parts(Some("h"), Some("d"), Some("m"), Some("n"), Some("k"));
        assert_eq!(
            build_connection_string(&config),
            "HostName=h;DeviceId=d;ModuleId=m;SharedAccessKeyName=n;SharedAccessKey=k"
        );
    }

    #[test]
    fn test_module_without_device_keeps_order() {
        let config = parts(Some("h"), None, Some("m"), Some("n"), Some("k"));
        assert_eq!(
            build_connection_string(&config),
            "HostName=h;ModuleId=m;SharedAccessKeyName=n;SharedAccessKey=k"
        );
    }

    #[test]
    fn test_values_are_not_trimmed_or_escaped() {
        let config = parts(Some("h"), Some(" d;x=y "), None, None, Some("k=="));
        assert_eq!(
            build_connection_string(&config),
            "HostName=h;DeviceId= d;x=y ;SharedAccessKey=k=="
        );
    }

    #[test]
    fn test_incomplete_parts_fall_back_to_environment() {
        let cases = vec![
            IotHubConfig::default(),
            parts(Some("myhub"), Some("dev1"), None, None, None),
            parts(None, Some("dev1"), None, Some("n"), Some("abc")),
            parts(Some("myhub"), None, Some("m1"), None, Some("abc")),
        ];
        for config in cases {
            assert!(!validate(&config), "{:?}", config);
            assert_eq!(resolve(&config), CredentialSource::FromEnvironment);
        }
    }

    #[test]
    fn test_whitespace_only_values_are_absent() {
        let mut config = parts(Some("myhub"), Some("   "), None, None, Some("abc"));
        config.connection_string = Some(" \t ".to_owned());
        config.use_gateway = true;
        assert!(!validate(&config));
        assert_eq!(resolve(&config), CredentialSource::FromEnvironment);

        let config = parts(Some("myhub"), Some("dev1"), Some(" "), Some(""), Some("abc"));
        assert_eq!(
            build_connection_string(&config),
            "HostName=myhub;DeviceId=dev1;SharedAccessKey=abc"
        );
    }
}
