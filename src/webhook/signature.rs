//! HMAC signatures over raw webhook bodies.

use std::{fmt::Display, str::FromStr};

use hmac::{Hmac, Mac, digest::KeyInit};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::errors::WebhookError;

/// Digest used for webhook HMAC signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Sha256,
    Sha1,
    Sha512,
}

impl SignatureAlgorithm {
    /// Name used as the signature prefix, e.g. `sha256`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha256 => "sha256",
            SignatureAlgorithm::Sha1 => "sha1",
            SignatureAlgorithm::Sha512 => "sha512",
        }
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            "sha1" => Ok(SignatureAlgorithm::Sha1),
            "sha512" => Ok(SignatureAlgorithm::Sha512),
            other => Err(WebhookError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Signs `payload`, producing `"{algorithm}={hex digest}"`.
///
/// ```
/// use licensechain::webhook::{SignatureAlgorithm, generate_signature, verify_signature};
///
/// let body = br#"{"type":"license.created","id":"lic_123"}"#;
/// let signature = generate_signature(body, "whsec", SignatureAlgorithm::Sha256);
///
/// assert!(signature.starts_with("sha256="));
/// assert!(verify_signature(body, &signature, "whsec", SignatureAlgorithm::Sha256));
/// assert!(!verify_signature(body, &signature, "other", SignatureAlgorithm::Sha256));
/// ```
pub fn generate_signature(payload: &[u8], secret: &str, algorithm: SignatureAlgorithm) -> String {
    let digest = match algorithm {
        SignatureAlgorithm::Sha256 => compute::<Hmac<Sha256>>(secret, payload),
        SignatureAlgorithm::Sha1 => compute::<Hmac<Sha1>>(secret, payload),
        SignatureAlgorithm::Sha512 => compute::<Hmac<Sha512>>(secret, payload),
    };
    format!("{algorithm}={}", hex::encode(digest))
}

/// Checks `signature` against the HMAC of `payload`.
///
/// Accepts the prefixed form produced by [`generate_signature`] or a bare hex digest.
/// A prefix naming a different algorithm, malformed hex, or a digest of the wrong
/// length all yield `false`. The digest comparison is constant-time.
pub fn verify_signature(
    payload: &[u8],
    signature: &str,
    secret: &str,
    algorithm: SignatureAlgorithm,
) -> bool {
    let signature = signature.trim();
    let encoded = match signature.split_once('=') {
        Some((prefix, digest)) => {
            if !prefix.eq_ignore_ascii_case(algorithm.as_str()) {
                return false;
            }
            digest
        }
        None => signature,
    };

    let Ok(expected) = hex::decode(encoded) else {
        return false;
    };

    match algorithm {
        SignatureAlgorithm::Sha256 => verify::<Hmac<Sha256>>(secret, payload, &expected),
        SignatureAlgorithm::Sha1 => verify::<Hmac<Sha1>>(secret, payload, &expected),
        SignatureAlgorithm::Sha512 => verify::<Hmac<Sha512>>(secret, payload, &expected),
    }
}

fn compute<M: Mac + KeyInit>(secret: &str, payload: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so this never takes the error branch.
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(secret.as_bytes()) else {
        return Vec::new();
    };
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

fn verify<M: Mac + KeyInit>(secret: &str, payload: &[u8], expected: &[u8]) -> bool {
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(expected).is_ok()
}

/// A shared secret bound to an algorithm.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    algorithm: SignatureAlgorithm,
}

impl SignatureVerifier {
    /// Fails with [`WebhookError::MissingSecret`] for an empty secret.
    pub fn new(secret: impl Into<String>) -> Result<Self, WebhookError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(WebhookError::MissingSecret);
        }
        Ok(SignatureVerifier {
            secret,
            algorithm: SignatureAlgorithm::default(),
        })
    }

    pub fn with_algorithm(self, algorithm: SignatureAlgorithm) -> Self {
        SignatureVerifier { algorithm, ..self }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn sign(&self, payload: &[u8]) -> String {
        generate_signature(payload, &self.secret, self.algorithm)
    }

    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        self.verify_with(payload, signature, self.algorithm)
    }

    /// Verifies with an explicit algorithm instead of the configured one.
    pub fn verify_with(
        &self,
        payload: &[u8],
        signature: &str,
        algorithm: SignatureAlgorithm,
    ) -> bool {
        verify_signature(payload, signature, &self.secret, algorithm)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
