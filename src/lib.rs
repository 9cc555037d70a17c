//! Verification of [Linked-Data proofs][ld-proofs] embedded in
//! [W3C Verifiable Credentials][vc-data-model].
//!
//! Given a credential carrying an embedded proof and a source of trusted
//! documents, the [`Verifier`] decides whether the proof was produced by the
//! holder of the referenced key over the exact content of the credential:
//! - the proof is isolated from the credential ([`proof::extract`]);
//! - its verification method is resolved to a key description through a
//!   [`DocumentResolver`] and decoded ([`key::decode`]);
//! - the credential, without the signature value, is canonicalized by a
//!   [`Canonicalizer`];
//! - the signature suite registered for the proof type checks the
//!   signature ([`SuiteRegistry`]).
//!
//! A signature that does not match is reported as `Ok(false)`. Every
//! [`Error`] means that the proof could not be checked.
//!
//! [ld-proofs]: <https://w3c-ccg.github.io/ld-proofs/>
//! [vc-data-model]: <https://www.w3.org/TR/vc-data-model/>
//!
//! # Basic Usage
//!
//! Verify a credential whose signing key is published in its own credential
//! subject:
//!
//! ```
//! use ldp_verify::{verify_with_embedded_key, Credential, Verifier};
//!
//! # async fn example(json: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let credential = Credential::from_json_str(json)?;
//! let verified = verify_with_embedded_key(&credential, &Verifier::new()).await?;
//! println!("proof verified: {verified}");
//! # Ok(())
//! # }
//! ```
//!
//! Keys from other sources are registered into a [`StaticResolver`] (or any
//! other [`DocumentResolver`]) and passed to [`Verifier::verify`].
pub mod canonicalize;
pub mod document;
pub mod error;
pub mod jwk;
pub mod jws;
pub mod key;
pub mod one_or_many;
pub mod proof;
pub mod resolver;
pub mod suites;
pub mod vc;
pub mod verify;

pub use canonicalize::{Canonicalizer, JcsCanonicalizer};
pub use document::{Document, TrustDocument};
pub use error::Error;
pub use jwk::JWK;
pub use key::{PublicKeyDescription, VerificationKey};
pub use one_or_many::OneOrMany;
pub use proof::{Proof, ProofMetadata, ProofPurpose};
pub use resolver::{DocumentResolver, SeriesResolver, StaticResolver};
pub use suites::{ProofSuite, SuiteRegistry};
pub use vc::Credential;
pub use verify::{verify_with_embedded_key, VerificationOptions, Verifier};
