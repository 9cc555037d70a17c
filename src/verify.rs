//! Verification of the proof embedded in a credential.
use serde::{Deserialize, Serialize};

use crate::canonicalize::{CanonicalizationOptions, Canonicalizer, JcsCanonicalizer};
use crate::document::{Document, TrustDocument};
use crate::error::Error;
use crate::key::PublicKeyDescription;
use crate::proof::{self, ProofPurpose};
use crate::resolver::{DocumentResolver, ResolutionError, StaticResolver};
use crate::suites::SuiteRegistry;
use crate::vc::Credential;

/// Run-time verification settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct VerificationOptions {
    /// Purpose the proof must declare.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_purpose: Option<ProofPurpose>,
    /// Require the key's controller to list the key under the
    /// verification relationship of the proof purpose.
    pub check_controller: bool,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            proof_purpose: None,
            check_controller: true,
        }
    }
}

/// Proof verification engine.
///
/// The verifier holds no per-call state: every call to
/// [`verify`](Verifier::verify) is independent, and all documents come from
/// the resolver passed to it.
#[derive(Debug, Clone, Default)]
pub struct Verifier<C = JcsCanonicalizer> {
    suites: SuiteRegistry,
    canonicalizer: C,
    options: VerificationOptions,
}

impl Verifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Canonicalizer> Verifier<C> {
    pub fn with_canonicalizer<D: Canonicalizer>(self, canonicalizer: D) -> Verifier<D> {
        Verifier {
            suites: self.suites,
            canonicalizer,
            options: self.options,
        }
    }

    pub fn with_suites(mut self, suites: SuiteRegistry) -> Self {
        self.suites = suites;
        self
    }

    pub fn with_options(mut self, options: VerificationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &VerificationOptions {
        &self.options
    }

    /// Verify the proof of `credential` with keys from `resolver`.
    ///
    /// Returns `Ok(false)` if the signature does not match, and an error if
    /// the proof could not be checked at all.
    pub async fn verify(
        &self,
        credential: &Credential,
        resolver: &dyn DocumentResolver,
    ) -> Result<bool, Error> {
        let (stripped, proof) = proof::extract(credential)?;
        let vm_id = proof.verification_method.as_str();
        log::debug!("Verifying {} proof with {vm_id}", proof.type_);

        let purpose = proof
            .proof_purpose
            .clone()
            .unwrap_or(ProofPurpose::AssertionMethod);
        if let Some(expected) = &self.options.proof_purpose {
            if *expected != purpose {
                return Err(Error::InvalidProofPurpose {
                    purpose: purpose.to_string(),
                    verification_method: vm_id.to_string(),
                    reason: format!("expected {expected}"),
                });
            }
        }

        let unknown = |source: ResolutionError| Error::UnknownVerificationMethod {
            verification_method: vm_id.to_string(),
            credential: Some(credential.describe()),
            source,
        };
        let document = resolve_verification_method(resolver, vm_id)
            .await
            .map_err(unknown)?;
        let description = document
            .key_description(vm_id)
            .ok_or_else(|| unknown(ResolutionError::DocumentNotFound(vm_id.to_string())))?;
        let invalid_key = |source| Error::InvalidKeyMaterial {
            key_id: vm_id.to_string(),
            source,
        };
        let key = description.decode().map_err(invalid_key)?;
        log::debug!("Resolved {} key {vm_id}", key.kind());

        if self.options.check_controller {
            check_controller(resolver, description, vm_id, &purpose).await?;
        }

        let canonical = self
            .canonicalizer
            .canonicalize(
                &stripped,
                &CanonicalizationOptions {
                    document_loader: resolver,
                },
            )
            .await?;
        log::debug!("Canonical document: {} bytes", canonical.len());

        let suite = self.suites.suite_for(&proof.type_)?;
        suite.check_key(&key).map_err(invalid_key)?;
        let verified = suite.verify(&canonical, &key, &proof.signature_value)?;
        if !verified {
            log::warn!(
                "{} proof by {vm_id} does not verify for {}",
                proof.type_,
                credential.describe()
            );
        }
        Ok(verified)
    }
}

/// Resolve a verification method id, falling back to the document of the
/// DID it is a fragment of.
async fn resolve_verification_method(
    resolver: &dyn DocumentResolver,
    vm_id: &str,
) -> Result<Document, ResolutionError> {
    match resolver.resolve(vm_id).await {
        Ok(document) => Ok(document),
        Err(err) => match vm_id.split_once('#') {
            Some((did, _)) if !did.is_empty() => resolver.resolve(did).await.map_err(|_| err),
            _ => Err(err),
        },
    }
}

async fn check_controller(
    resolver: &dyn DocumentResolver,
    key: &PublicKeyDescription,
    vm_id: &str,
    purpose: &ProofPurpose,
) -> Result<(), Error> {
    let invalid = |reason: String| Error::InvalidProofPurpose {
        purpose: purpose.to_string(),
        verification_method: vm_id.to_string(),
        reason,
    };
    let controller = match resolver.resolve(&key.controller).await {
        Ok(Document::Did(doc)) => doc,
        Ok(_) => {
            return Err(invalid(format!(
                "controller {} is not a DID document",
                key.controller
            )))
        }
        Err(e) => return Err(invalid(format!("unable to resolve controller: {e}"))),
    };
    if controller.authorizes(purpose, vm_id) {
        Ok(())
    } else {
        Err(invalid(format!(
            "not listed by controller {}",
            key.controller
        )))
    }
}

/// Verify a self-contained credential whose signing key is embedded in a
/// credential subject's `publicKey` list.
///
/// The key is trusted as an assertion method of its controller for this
/// call only: a fresh resolver holding the default contexts and the
/// synthesized trust documents is built and discarded.
pub async fn verify_with_embedded_key<C: Canonicalizer>(
    credential: &Credential,
    verifier: &Verifier<C>,
) -> Result<bool, Error> {
    let (_, proof) = proof::extract(credential)?;
    let vm_id = proof.verification_method;
    let (subject, key) =
        credential
            .embedded_key(&vm_id)
            .ok_or_else(|| Error::UnknownVerificationMethod {
                verification_method: vm_id.clone(),
                credential: Some(credential.describe()),
                source: ResolutionError::DocumentNotFound(vm_id.clone()),
            })?;
    let mut resolver = StaticResolver::with_default_contexts();
    TrustDocument::new(key).register(&mut resolver, &subject.id);
    log::debug!("Trusting embedded key {vm_id} of {}", subject.id);
    verifier.verify(credential, &resolver).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_defaults() {
        let options: VerificationOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options, VerificationOptions::default());
        assert!(options.check_controller);
        let options: VerificationOptions = serde_json::from_value(json!({
            "proofPurpose": "authentication",
            "checkController": false
        }))
        .unwrap();
        assert_eq!(options.proof_purpose, Some(ProofPurpose::Authentication));
        assert!(!options.check_controller);
    }

    #[async_std::test]
    async fn verification_method_fallback() {
        let mut resolver = StaticResolver::new();
        resolver.register(
            "did:example:abc",
            Document::from_json(json!({ "id": "did:example:abc" })).unwrap(),
        );
        let doc = resolve_verification_method(&resolver, "did:example:abc#keys-1")
            .await
            .unwrap();
        assert_eq!(doc.id(), Some("did:example:abc"));
        let err = resolve_verification_method(&resolver, "did:example:xyz#keys-1")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::DocumentNotFound("did:example:xyz#keys-1".to_string())
        );
    }
}
