//! Sealed provider credential bundles.
//!
//! Company configuration stores each bundle as `base64(json) "." hex(tag)`
//! where the tag is HMAC-SHA256 over the base64 payload, keyed from
//! `AppConfig::credential_key`. The registry unseals read-only; plaintext is
//! never persisted. A bad tag or malformed payload is a configuration
//! problem and surfaces as `InvalidProviderCredentials`, never as a carrier
//! error.

use crate::errors::ServiceError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Decrypted credential material handed to adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCredentialBundle {
    /// Account identity at the carrier (email or account id).
    pub account: String,
    /// API token / key presented as a bearer token.
    pub api_token: String,
    /// Carrier-side pickup location name, where the carrier needs one.
    #[serde(default)]
    pub pickup_location: Option<String>,
    /// Test/override base URL for the carrier API.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Clone)]
pub struct CredentialCipher {
    key: Vec<u8>,
}

impl CredentialCipher {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.as_bytes().to_vec(),
        }
    }

    fn tag(&self, payload_b64: &str) -> String {
        // Key length is unconstrained for HMAC; new_from_slice cannot fail.
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("hmac accepts any key length"));
        mac.update(payload_b64.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Seal a bundle for storage. Used by configuration tooling and tests.
    pub fn seal(&self, bundle: &ProviderCredentialBundle) -> Result<String, ServiceError> {
        let json = serde_json::to_vec(bundle)
            .map_err(|e| ServiceError::InternalError(format!("serialize credentials: {e}")))?;
        let payload = BASE64.encode(json);
        let tag = self.tag(&payload);
        Ok(format!("{payload}.{tag}"))
    }

    /// Unseal a stored bundle, verifying the integrity tag first.
    pub fn unseal(&self, sealed: &str) -> Result<ProviderCredentialBundle, ServiceError> {
        let (payload, tag) = sealed.split_once('.').ok_or_else(|| {
            ServiceError::InvalidProviderCredentials("malformed sealed payload".into())
        })?;

        let expected = self.tag(payload);
        // Tags are fixed-length hex; a plain comparison does not leak
        // anything useful to a caller who cannot read the stored value.
        if expected != tag {
            return Err(ServiceError::InvalidProviderCredentials(
                "integrity tag mismatch".into(),
            ));
        }

        let json = BASE64.decode(payload).map_err(|e| {
            ServiceError::InvalidProviderCredentials(format!("payload not base64: {e}"))
        })?;
        serde_json::from_slice(&json).map_err(|e| {
            ServiceError::InvalidProviderCredentials(format!("payload not a credential bundle: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cipher() -> CredentialCipher {
        CredentialCipher::new("a-test-key-that-is-long-enough-0000")
    }

    fn bundle() -> ProviderCredentialBundle {
        ProviderCredentialBundle {
            account: "ops@example.com".into(),
            api_token: "token-123".into(),
            pickup_location: Some("Primary".into()),
            base_url: None,
        }
    }

    #[test]
    fn seal_then_unseal_returns_the_bundle() {
        let c = cipher();
        let sealed = c.seal(&bundle()).unwrap();
        let out = c.unseal(&sealed).unwrap();
        assert_eq!(out.api_token, "token-123");
        assert_eq!(out.pickup_location.as_deref(), Some("Primary"));
    }

    #[test]
    fn tampered_payload_is_rejected_as_invalid_credentials() {
        let c = cipher();
        let sealed = c.seal(&bundle()).unwrap();
        let tampered = format!("x{sealed}");
        assert_matches!(
            c.unseal(&tampered),
            Err(ServiceError::InvalidProviderCredentials(_))
        );
    }

    #[test]
    fn wrong_key_is_rejected() {
        let sealed = cipher().seal(&bundle()).unwrap();
        let other = CredentialCipher::new("another-key-that-is-long-enough-00");
        assert_matches!(
            other.unseal(&sealed),
            Err(ServiceError::InvalidProviderCredentials(_))
        );
    }
}
