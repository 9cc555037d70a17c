use crate::canonicalize::CanonicalizationError;
use crate::key::KeyError;
use crate::resolver::ResolutionError;

/// Reasons a proof could not be checked.
///
/// A proof that was checked and found invalid is not an error: the
/// verifier returns `Ok(false)` for it.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The credential has no `proof` member.
    #[error("Missing proof property")]
    MissingProof,

    /// The proof is missing a required member or one of its members has
    /// an unexpected shape.
    #[error("Malformed proof: {field}: {reason}")]
    MalformedProof { field: &'static str, reason: String },

    /// The verification method referenced by the proof could not be
    /// resolved.
    #[error(
        "Unknown verification method '{verification_method}' (credential: {})",
        .credential.as_deref().unwrap_or("<anonymous>")
    )]
    UnknownVerificationMethod {
        verification_method: String,
        credential: Option<String>,
        #[source]
        source: ResolutionError,
    },

    /// The resolved public key could not be decoded, or is unusable with
    /// the proof's suite.
    #[error("Invalid key material for '{key_id}'")]
    InvalidKeyMaterial {
        key_id: String,
        #[source]
        source: KeyError,
    },

    /// No signature suite is registered for the proof type.
    #[error("Linked Data Proof type not supported: '{0}'")]
    UnsupportedSuiteType(String),

    /// The canonicalizer rejected the document.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// The key is not authorized by its controller for the proof purpose.
    #[error("Verification method '{verification_method}' not valid for proof purpose {purpose}: {reason}")]
    InvalidProofPurpose {
        purpose: String,
        verification_method: String,
        reason: String,
    },

    /// The credential is not a JSON object of the expected shape.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedProof {
            field,
            reason: reason.into(),
        }
    }
}
