//! Signed deployment licenses.
//!
//! # Purpose
//! Creates, signs and verifies the license document that gates service
//! startup. Verification is a detached Ed25519 signature over the SHA-256
//! digest of the canonical JSON form of the license with an empty signature.
//!
//! # Key invariants
//! - The digest covers every field except `signature`, serialized in the
//!   declared field order.
//! - A license whose `expiresAt` lies in the past never verifies, whatever
//!   its signature.
//! - Keys travel as base64 of their raw 32-byte encodings.
//!
//! # Examples
//! ```rust
//! use warden_license::{License, generate_keypair, sign, verify};
//!
//! let (signing, verifying) = generate_keypair();
//! let license = License::new("acme", "enterprise", vec!["oidc".to_string()]);
//! let signed = sign(&license, &signing).expect("sign");
//! assert!(verify(&signed, &verifying).is_ok());
//! ```
mod error;

pub use error::{LicenseError, LicenseResult};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Months, SecondsFormat, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// License document as exchanged with operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<String>,
    #[serde(rename = "expiresAt")]
    pub expires_at: String,
    pub signature: String,
}

impl License {
    pub fn new(to: impl Into<String>, kind: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            to: to.into(),
            kind: kind.into(),
            features,
            ..Self::default()
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        self
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|candidate| candidate == feature)
    }

    /// Parsed `expiresAt`.
    ///
    /// # Errors
    /// - [`LicenseError::InvalidExpiry`] if the field is not RFC 3339.
    pub fn expiry(&self) -> LicenseResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|err| LicenseError::InvalidExpiry {
                value: self.expires_at.clone(),
                reason: err.to_string(),
            })
    }

    fn digest(&self) -> LicenseResult<[u8; 32]> {
        let unsigned = License {
            signature: String::new(),
            ..self.clone()
        };
        let bytes =
            serde_json::to_vec(&unsigned).map_err(|err| LicenseError::InvalidJson(err.to_string()))?;
        Ok(Sha256::digest(bytes).into())
    }
}

/// Sign a license, defaulting an empty expiry to one year from now.
///
/// # Errors
/// - [`LicenseError::InvalidExpiry`] if a provided expiry is not RFC 3339.
pub fn sign(license: &License, key: &SigningKey) -> LicenseResult<License> {
    let mut license = license.clone();
    if license.expires_at.is_empty() {
        let next_year = Utc::now()
            .checked_add_months(Months::new(12))
            .unwrap_or_else(Utc::now);
        license = license.with_expiry(next_year);
    }
    license.expiry()?;
    license.signature = String::new();

    let digest = license.digest()?;
    let signature = key.sign(&digest);
    license.signature = STANDARD.encode(signature.to_bytes());
    Ok(license)
}

/// Verify expiry first, then the signature.
///
/// # Errors
/// - [`LicenseError::InvalidExpiry`], [`LicenseError::Expired`] or
///   [`LicenseError::InvalidSignature`].
pub fn verify(license: &License, key: &VerifyingKey) -> LicenseResult<()> {
    let expires_at = license.expiry()?;
    if Utc::now() > expires_at {
        return Err(LicenseError::Expired(license.expires_at.clone()));
    }

    let raw = STANDARD
        .decode(&license.signature)
        .map_err(|err| LicenseError::InvalidSignature(err.to_string()))?;
    let signature = Signature::from_slice(&raw)
        .map_err(|err| LicenseError::InvalidSignature(err.to_string()))?;
    let digest = license.digest()?;
    key.verify(&digest, &signature)
        .map_err(|err| LicenseError::InvalidSignature(err.to_string()))
}

/// Verify a JSON license document against a base64 public key.
///
/// # Errors
/// - [`LicenseError::InvalidJson`] or [`LicenseError::InvalidKey`] before any
///   of the [`verify`] errors.
pub fn verify_json(document: &str, public_key: &str) -> LicenseResult<License> {
    let license: License =
        serde_json::from_str(document).map_err(|err| LicenseError::InvalidJson(err.to_string()))?;
    let key = decode_verifying_key(public_key)?;
    verify(&license, &key)?;
    Ok(license)
}

/// Fresh signing key from a random 32-byte seed, with its public half.
pub fn generate_keypair() -> (SigningKey, VerifyingKey) {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    let signing = SigningKey::from_bytes(&seed);
    let verifying = signing.verifying_key();
    (signing, verifying)
}

pub fn encode_signing_key(key: &SigningKey) -> String {
    STANDARD.encode(key.to_bytes())
}

pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.to_bytes())
}

/// # Errors
/// - [`LicenseError::InvalidKey`] unless the input is base64 of 32 bytes.
pub fn decode_signing_key(encoded: &str) -> LicenseResult<SigningKey> {
    let seed = decode_key_bytes(encoded)?;
    Ok(SigningKey::from_bytes(&seed))
}

/// # Errors
/// - [`LicenseError::InvalidKey`] unless the input is base64 of a valid
///   Ed25519 point.
pub fn decode_verifying_key(encoded: &str) -> LicenseResult<VerifyingKey> {
    let bytes = decode_key_bytes(encoded)?;
    VerifyingKey::from_bytes(&bytes).map_err(|err| LicenseError::InvalidKey(err.to_string()))
}

fn decode_key_bytes(encoded: &str) -> LicenseResult<[u8; 32]> {
    let raw = STANDARD
        .decode(encoded.trim())
        .map_err(|err| LicenseError::InvalidKey(err.to_string()))?;
    raw.try_into()
        .map_err(|raw: Vec<u8>| LicenseError::InvalidKey(format!("expected 32 bytes, got {}", raw.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> License {
        License::new("acme", "enterprise", vec!["oidc".to_string(), "tokens".to_string()])
            .with_expiry(Utc::now() + Duration::days(30))
    }

    #[test]
    fn signed_license_verifies() {
        let (signing, verifying) = generate_keypair();
        let signed = sign(&sample(), &signing).expect("sign");
        assert!(!signed.signature.is_empty());
        verify(&signed, &verifying).expect("verify");
    }

    #[test]
    fn tampered_fields_fail_signature() {
        let (signing, verifying) = generate_keypair();
        let signed = sign(&sample(), &signing).expect("sign");
        let later = Utc::now() + Duration::days(3650);
        let tampers: [(&str, fn(&mut License, DateTime<Utc>)); 4] = [
            ("to", |license, _| license.to = "someone-else".to_string()),
            ("type", |license, _| license.kind = "trial".to_string()),
            ("features", |license, _| {
                license.features.push("unlimited".to_string())
            }),
            ("expiresAt", |license, later| {
                license.expires_at = later.to_rfc3339_opts(SecondsFormat::Secs, true)
            }),
        ];

        for (field, tamper) in tampers {
            let mut forged = signed.clone();
            tamper(&mut forged, later);
            assert_ne!(forged, signed, "{field}");
            assert!(
                matches!(
                    verify(&forged, &verifying),
                    Err(LicenseError::InvalidSignature(_))
                ),
                "{field}"
            );
        }
    }

    #[test]
    fn other_key_fails_signature() {
        let (signing, _) = generate_keypair();
        let (_, other) = generate_keypair();
        let signed = sign(&sample(), &signing).expect("sign");
        assert!(matches!(
            verify(&signed, &other),
            Err(LicenseError::InvalidSignature(_))
        ));
    }

    #[test]
    fn expired_license_is_rejected_before_signature() {
        let (signing, verifying) = generate_keypair();
        let expired = sample().with_expiry(Utc::now() - Duration::days(1));
        let signed = sign(&expired, &signing).expect("sign");
        let err = verify(&signed, &verifying).expect_err("expired");
        assert!(matches!(err, LicenseError::Expired(_)));
        assert!(err.to_string().starts_with("license expired since"));
    }

    #[test]
    fn empty_expiry_defaults_to_future() {
        let (signing, verifying) = generate_keypair();
        let signed = sign(&License::new("acme", "trial", Vec::new()), &signing).expect("sign");
        assert!(signed.expiry().expect("expiry") > Utc::now() + Duration::days(300));
        verify(&signed, &verifying).expect("verify");
    }

    #[test]
    fn malformed_expiry_is_rejected() {
        let (signing, _) = generate_keypair();
        let mut license = sample();
        license.expires_at = "next tuesday".to_string();
        assert!(matches!(
            sign(&license, &signing),
            Err(LicenseError::InvalidExpiry { .. })
        ));
    }

    #[test]
    fn json_document_roundtrip_through_encoded_keys() {
        let (signing, verifying) = generate_keypair();
        let signed = sign(&sample(), &signing).expect("sign");
        let document = serde_json::to_string(&signed).expect("json");
        assert!(document.contains("\"expiresAt\""));
        assert!(document.contains("\"type\":\"enterprise\""));

        let public = encode_verifying_key(&verifying);
        let verified = verify_json(&document, &public).expect("verify json");
        assert_eq!(verified.to, "acme");
        assert!(verified.has_feature("oidc"));

        let restored = decode_signing_key(&encode_signing_key(&signing)).expect("decode");
        assert_eq!(restored.verifying_key(), verifying);
    }

    #[test]
    fn bad_inputs_map_to_distinct_errors() {
        let (_, verifying) = generate_keypair();
        let public = encode_verifying_key(&verifying);
        assert!(matches!(
            verify_json("{not json", &public),
            Err(LicenseError::InvalidJson(_))
        ));
        let document = serde_json::to_string(&sample()).expect("json");
        assert!(matches!(
            verify_json(&document, "c2hvcnQ="),
            Err(LicenseError::InvalidKey(_))
        ));
    }
}
