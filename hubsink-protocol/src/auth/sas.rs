use super::{TokenError, TokenSigner};
use chrono::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use url::form_urlencoded::byte_serialize;

type TokenResult = Result<SasToken, TokenError>;

/// A decoded shared access key that signs tokens locally
#[derive(Clone)]
pub struct SharedAccessKey {
    key: Vec<u8>,
}

impl SharedAccessKey {
    /// Decodes a base64 shared access key
    pub fn from_base64(key: &str) -> Result<SharedAccessKey, TokenError> {
        let key = base64::decode(key).map_err(|_| TokenError::InvalidKey)?;
        Ok(SharedAccessKey { key })
    }
}

impl fmt::Debug for SharedAccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedAccessKey(<redacted>)")
    }
}

impl TokenSigner for SharedAccessKey {
    fn sign(&self, data: &[u8]) -> Result<String, TokenError> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_varkey(&self.key).map_err(|_| TokenError::InvalidKey)?;
        mac.input(data);
        Ok(base64::encode(&mac.result().code()))
    }
}

/// Represents a single SAS token of a device or module
#[derive(Clone, Debug)]
pub struct SasToken {
    value: String,
}

impl SasToken {
    /// Generates a token for the resource URI, valid for `ttl` from now
    pub fn with_ttl(
        resource_uri: &str,
        key_name: Option<&str>,
        signer: &dyn TokenSigner,
        ttl: Duration,
    ) -> TokenResult {
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| TokenError::InvalidTtl)?;
        if ttl <= chrono::Duration::zero() {
            return Err(TokenError::InvalidTtl);
        }
        Self::generate(resource_uri, key_name, signer, Utc::now() + ttl)
    }

    /// Generates a token for the resource URI expiring at `expiry`
    ///
    /// When a key name is given the token is signed with a hub-level shared access policy.
    pub fn generate(
        resource_uri: &str,
        key_name: Option<&str>,
        signer: &dyn TokenSigner,
        expiry: DateTime<Utc>,
    ) -> TokenResult {
        let encoded_uri: String = byte_serialize(resource_uri.as_bytes()).collect();
        let string_to_sign = format!("{}\n{}", encoded_uri, expiry.timestamp());
        let signature = signer.sign(string_to_sign.as_bytes())?;
        let encoded_signature: String = byte_serialize(signature.as_bytes()).collect();
        let mut value = format!(
            "SharedAccessSignature sr={}&sig={}&se={}",
            encoded_uri,
            encoded_signature,
            expiry.timestamp()
        );
        if let Some(name) = key_name {
            value.push_str("&skn=");
            value.extend(byte_serialize(name.as_bytes()));
        }
        Ok(SasToken { value })
    }
}

impl From<SasToken> for String {
    fn from(token: SasToken) -> Self {
        token.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedSigner;

    impl TokenSigner for FixedSigner {
        fn sign(&self, data: &[u8]) -> Result<String, TokenError> {
            assert_eq!(
                data,
                &b"myhub.azure-devices.net%2Fdevices%2Fdev1\n1600000000"[..]
            );
            Ok("ab+c/d=".to_owned())
        }
    }

    fn expiry() -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000, 0).unwrap()
    }

    #[test]
    fn test_token_layout() {
        let token: String =
            SasToken::generate("myhub.azure-devices.net/devices/dev1", None, &FixedSigner, expiry())
                .unwrap()
                .into();
        assert_eq!(
            token,
            "SharedAccessSignature sr=myhub.azure-devices.net%2Fdevices%2Fdev1&sig=ab%2Bc%2Fd%3D&se=1600000000"
        );
    }

    #[test]
    fn test_token_with_policy_name() {
        let token: String = SasToken::generate(
            "myhub.azure-devices.net/devices/dev1",
            Some("device"),
            &FixedSigner,
            expiry(),
        )
        .unwrap()
        .into();
        assert!(token.ends_with("&se=1600000000&skn=device"));
    }

    #[test]
    fn test_shared_access_key_rejects_bad_base64() {
        assert!(matches!(
            SharedAccessKey::from_base64("not base64!"),
            Err(TokenError::InvalidKey)
        ));
    }

    #[test]
    fn test_shared_access_key_signs_deterministically() {
        let key = SharedAccessKey::from_base64("c2VjcmV0").unwrap();
        let first = key.sign(b"payload").unwrap();
        assert_eq!(first, key.sign(b"payload").unwrap());
        assert_ne!(first, key.sign(b"other").unwrap());
        // HMAC-SHA256 digests are 32 bytes
        assert_eq!(base64::decode(&first).unwrap().len(), 32);
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let key = SharedAccessKey::from_base64("c2VjcmV0").unwrap();
        assert!(matches!(
            SasToken::with_ttl("h/devices/d", None, &key, Duration::from_secs(0)),
            Err(TokenError::InvalidTtl)
        ));
    }
}
