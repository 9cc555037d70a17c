//! Signature suites, looked up by proof type.
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::jws::{self, Algorithm, DetachedJws};
use crate::key::{KeyError, VerificationKey};

/// Verification procedure of a linked-data proof type.
pub trait ProofSuite: Send + Sync {
    /// Proof type this suite verifies.
    fn name(&self) -> &str;

    /// Reject keys the suite cannot be used with.
    fn check_key(&self, _key: &VerificationKey) -> Result<(), KeyError> {
        Ok(())
    }

    /// Verify `signature_value` over the canonical document.
    ///
    /// A signature that does not match is `Ok(false)`.
    fn verify(
        &self,
        canonical: &[u8],
        key: &VerificationKey,
        signature_value: &str,
    ) -> Result<bool, Error>;
}

/// Suite whose signature value is a detached JWS with unencoded payload
/// (`b64: false`), signed over `header || '.' || canonical`.
#[derive(Debug, Clone, Copy)]
pub struct DetachedJwsSuite {
    pub name: &'static str,
    pub algorithms: &'static [Algorithm],
    pub key_kinds: &'static [&'static str],
}

pub const RSA_SIGNATURE_2018: DetachedJwsSuite = DetachedJwsSuite {
    name: "RsaSignature2018",
    algorithms: &[Algorithm::PS256, Algorithm::RS256],
    key_kinds: &["RSA"],
};

#[cfg(feature = "ed25519")]
pub const ED25519_SIGNATURE_2018: DetachedJwsSuite = DetachedJwsSuite {
    name: "Ed25519Signature2018",
    algorithms: &[Algorithm::EdDSA],
    key_kinds: &["Ed25519"],
};

pub const JSON_WEB_SIGNATURE_2020: DetachedJwsSuite = DetachedJwsSuite {
    name: "JsonWebSignature2020",
    algorithms: &[Algorithm::PS256, Algorithm::RS256, Algorithm::EdDSA],
    key_kinds: &["RSA", "Ed25519"],
};

fn jws_error(e: jws::Error) -> Error {
    Error::malformed("jws", e.to_string())
}

impl ProofSuite for DetachedJwsSuite {
    fn name(&self) -> &str {
        self.name
    }

    fn check_key(&self, key: &VerificationKey) -> Result<(), KeyError> {
        let found = key.kind();
        if self.key_kinds.contains(&found) {
            Ok(())
        } else {
            Err(KeyError::KeyTypeMismatch {
                expected: self.key_kinds.first().copied().unwrap_or("none"),
                found,
            })
        }
    }

    fn verify(
        &self,
        canonical: &[u8],
        key: &VerificationKey,
        signature_value: &str,
    ) -> Result<bool, Error> {
        let jws = DetachedJws::decode(signature_value).map_err(jws_error)?;
        let algorithm = jws.header.algorithm().map_err(jws_error)?;
        if !self.algorithms.contains(&algorithm) {
            return Err(Error::malformed(
                "jws",
                format!("algorithm {algorithm} not allowed for {}", self.name),
            ));
        }
        let Some(signature) = jws.signature() else {
            log::debug!("Undecodable signature segment");
            return Ok(false);
        };
        let signing_input = jws.signing_input(canonical);
        jws::verify_bytes(algorithm, &signing_input, key, &signature).map_err(jws_error)
    }
}

/// Proof types and their suites.
#[derive(Clone)]
pub struct SuiteRegistry {
    suites: HashMap<String, Arc<dyn ProofSuite>>,
}

impl SuiteRegistry {
    /// Registry with no suite.
    pub fn empty() -> Self {
        Self {
            suites: HashMap::new(),
        }
    }

    /// Registry with the built-in suites.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(RSA_SIGNATURE_2018);
        #[cfg(feature = "ed25519")]
        registry.register(ED25519_SIGNATURE_2018);
        registry.register(JSON_WEB_SIGNATURE_2020);
        registry
    }

    /// Add a suite under its name, replacing any suite of the same name.
    pub fn register(&mut self, suite: impl ProofSuite + 'static) -> Option<Arc<dyn ProofSuite>> {
        self.suites.insert(suite.name().to_string(), Arc::new(suite))
    }

    pub fn suite_for(&self, type_: &str) -> Result<&dyn ProofSuite, Error> {
        self.suites
            .get(type_)
            .map(|suite| suite.as_ref())
            .ok_or_else(|| Error::UnsupportedSuiteType(type_.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.suites.keys().map(String::as_str)
    }
}

impl Default for SuiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SuiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.suites.keys()).finish()
    }
}
