//! Linked-data proofs and their extraction from a credential.
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::vc::Credential;

/// Prefix of the security vocabulary terms.
pub const SECURITY_VOCAB: &str = "https://w3id.org/security#";

const DC_CREATED: &str = "http://purl.org/dc/terms/created";

/// Terms that may carry the signature value, in order of preference.
const SIGNATURE_TERMS: [SignatureTerm; 3] = [
    SignatureTerm::Jws,
    SignatureTerm::ProofValue,
    SignatureTerm::SignatureValue,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignatureTerm {
    Jws,
    ProofValue,
    SignatureValue,
}

impl SignatureTerm {
    fn name(&self) -> &'static str {
        match self {
            Self::Jws => "jws",
            Self::ProofValue => "proofValue",
            Self::SignatureValue => "signatureValue",
        }
    }
}

/// Embedded proof, as found in the credential.
///
/// Members may use compact terms (`verificationMethod`) or full
/// security-vocabulary IRIs (`https://w3id.org/security#verificationMethod`);
/// the latter land in `property_set` and keep their spelling when
/// serialized back.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "@context")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(rename = "type")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_purpose: Option<Value>,
    // Note: ld-proofs specifies verificationMethod as a "set of parameters",
    // but all examples use a single identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jws: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_value: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub property_set: BTreeMap<String, Value>,
}

/// Proof purpose, i.e. the verification relationship the key must have
/// with its controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProofPurpose {
    AssertionMethod,
    Authentication,
    CapabilityInvocation,
    CapabilityDelegation,
    Other(String),
}

impl From<&str> for ProofPurpose {
    fn from(purpose: &str) -> Self {
        match purpose.strip_prefix(SECURITY_VOCAB).unwrap_or(purpose) {
            "assertionMethod" => Self::AssertionMethod,
            "authentication" => Self::Authentication,
            "capabilityInvocation" => Self::CapabilityInvocation,
            "capabilityDelegation" => Self::CapabilityDelegation,
            _ => Self::Other(purpose.to_string()),
        }
    }
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssertionMethod => f.write_str("assertionMethod"),
            Self::Authentication => f.write_str("authentication"),
            Self::CapabilityInvocation => f.write_str("capabilityInvocation"),
            Self::CapabilityDelegation => f.write_str("capabilityDelegation"),
            Self::Other(purpose) => f.write_str(purpose),
        }
    }
}

impl Serialize for ProofPurpose {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProofPurpose {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let purpose = String::deserialize(deserializer)?;
        Ok(Self::from(purpose.as_str()))
    }
}

/// Typed view of a proof's metadata and detached signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofMetadata {
    pub type_: String,
    pub created: Option<DateTime<Utc>>,
    pub verification_method: String,
    pub proof_purpose: Option<ProofPurpose>,
    pub signature_value: String,
}

impl Proof {
    /// Look up a member by compact term, falling back to its full IRI.
    fn term<'a>(&'a self, compact: &'a Option<Value>, iri: &str) -> Option<&'a Value> {
        compact.as_ref().or_else(|| self.property_set.get(iri))
    }

    fn security_term<'a>(&'a self, compact: &'a Option<Value>, name: &str) -> Option<&'a Value> {
        self.term(compact, &format!("{SECURITY_VOCAB}{name}"))
    }

    fn signature_term(&self, term: SignatureTerm) -> Option<&Value> {
        let compact = match term {
            SignatureTerm::Jws => &self.jws,
            SignatureTerm::ProofValue => &self.proof_value,
            SignatureTerm::SignatureValue => &self.signature_value,
        };
        self.security_term(compact, term.name())
    }

    /// Validate the proof members and collect them.
    pub fn metadata(&self) -> Result<ProofMetadata, Error> {
        let type_ = match &self.type_ {
            Some(Value::String(type_)) if !type_.is_empty() => type_.clone(),
            Some(_) => return Err(Error::malformed("type", "expected a single type name")),
            None => return Err(Error::malformed("type", "missing proof type")),
        };
        let verification_method = self
            .security_term(&self.verification_method, "verificationMethod")
            .ok_or_else(|| Error::malformed("verificationMethod", "missing verification method"))
            .and_then(|value| identifier("verificationMethod", value))?;
        let proof_purpose = self
            .security_term(&self.proof_purpose, "proofPurpose")
            .map(|value| identifier("proofPurpose", value))
            .transpose()?
            .map(|purpose| ProofPurpose::from(purpose.as_str()));
        let created = self
            .term(&self.created, DC_CREATED)
            .map(parse_created)
            .transpose()?;
        let signature_value = SIGNATURE_TERMS
            .iter()
            .find_map(|term| self.signature_term(*term).map(|value| (term, value)))
            .ok_or_else(|| Error::malformed("jws", "missing signature value"))
            .and_then(|(term, value)| match value {
                Value::String(signature) => Ok(signature.clone()),
                _ => Err(Error::malformed(term.name(), "expected a string")),
            })?;
        Ok(ProofMetadata {
            type_,
            created,
            verification_method,
            proof_purpose,
            signature_value,
        })
    }
}

/// Accept an identifier given as a string or as a node reference
/// `{ "id": ... }` with no other members.
fn identifier(field: &'static str, value: &Value) -> Result<String, Error> {
    let id = match value {
        Value::String(id) => id,
        Value::Object(object) if object.len() == 1 => match object.get("id") {
            Some(Value::String(id)) => id,
            _ => return Err(Error::malformed(field, "expected a plain identifier")),
        },
        _ => return Err(Error::malformed(field, "expected a plain identifier")),
    };
    if id.is_empty() {
        return Err(Error::malformed(field, "empty identifier"));
    }
    Ok(id.clone())
}

fn parse_created(value: &Value) -> Result<DateTime<Utc>, Error> {
    let created = value
        .as_str()
        .ok_or_else(|| Error::malformed("created", "expected a date-time string"))?;
    DateTime::parse_from_rfc3339(created)
        .map(|date_time| date_time.with_timezone(&Utc))
        .map_err(|e| Error::malformed("created", e.to_string()))
}

/// Remove every signature value term, compact or expanded.
fn strip_signature(proof: &mut Map<String, Value>) {
    for term in SIGNATURE_TERMS {
        proof.remove(term.name());
        proof.remove(&format!("{SECURITY_VOCAB}{}", term.name()));
    }
}

/// The single proof object of a `proof` member, if it has one.
fn single_proof_mut(proof: &mut Value) -> Option<&mut Map<String, Value>> {
    match proof {
        Value::Array(proofs) if proofs.len() == 1 => proofs[0].as_object_mut(),
        Value::Object(proof) => Some(proof),
        _ => None,
    }
}

/// Isolate the proof of a credential.
///
/// Returns the JSON of the credential, exactly as received, with only the
/// signature value removed from its proof, together with the proof
/// metadata. The credential itself is left untouched.
pub fn extract(credential: &Credential) -> Result<(Value, ProofMetadata), Error> {
    let mut document = credential.to_json()?;
    let proof = match document.get("proof") {
        None | Some(Value::Null) => return Err(Error::MissingProof),
        Some(Value::Array(proofs)) => match proofs.as_slice() {
            [] => return Err(Error::MissingProof),
            [proof] => proof,
            _ => {
                return Err(Error::malformed(
                    "proof",
                    format!("expected exactly one proof, found {}", proofs.len()),
                ))
            }
        },
        Some(proof) => proof,
    };
    if !proof.is_object() {
        return Err(Error::malformed("proof", "expected an object"));
    }
    let proof: Proof = serde_json::from_value(proof.clone())
        .map_err(|e| Error::malformed("proof", e.to_string()))?;
    let metadata = proof.metadata()?;
    if let Some(proof) = document.get_mut("proof").and_then(single_proof_mut) {
        strip_signature(proof);
    }
    Ok((document, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn credential(proof: Value) -> Credential {
        let mut value = json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "issuanceDate": "2019-08-01T00:00:00.000Z",
            "credentialSubject": { "id": "did:example:abc" }
        });
        if !proof.is_null() {
            value["proof"] = proof;
        }
        Credential::from_json(value).unwrap()
    }

    #[test]
    fn extract_compact_terms() {
        let credential = credential(json!({
            "type": "RsaSignature2018",
            "created": "2019-09-03T14:12:56Z",
            "proofPurpose": "assertionMethod",
            "verificationMethod": "did:example:abc#keys-1",
            "jws": "header..signature"
        }));
        let (stripped, metadata) = extract(&credential).unwrap();
        assert_eq!(metadata.type_, "RsaSignature2018");
        assert_eq!(metadata.verification_method, "did:example:abc#keys-1");
        assert_eq!(metadata.proof_purpose, Some(ProofPurpose::AssertionMethod));
        assert_eq!(metadata.signature_value, "header..signature");
        assert_eq!(
            metadata.created.map(|created| created.timestamp()),
            Some(1567519976)
        );

        assert_eq!(
            stripped["proof"],
            json!({
                "type": "RsaSignature2018",
                "created": "2019-09-03T14:12:56Z",
                "proofPurpose": "assertionMethod",
                "verificationMethod": "did:example:abc#keys-1"
            })
        );
        // The caller's credential still carries its signature.
        assert!(credential.proof.unwrap().to_single().unwrap().jws.is_some());
    }

    #[test]
    fn extract_expanded_terms() {
        let credential = credential(json!({
            "type": "RsaSignature2018",
            "https://w3id.org/security#jws": "header..signature",
            "https://w3id.org/security#proofPurpose": {
                "id": "https://w3id.org/security#assertionMethod"
            },
            "https://w3id.org/security#verificationMethod": {
                "id": "did:example:abc#keys-1"
            }
        }));
        let (stripped, metadata) = extract(&credential).unwrap();
        assert_eq!(metadata.verification_method, "did:example:abc#keys-1");
        assert_eq!(metadata.proof_purpose, Some(ProofPurpose::AssertionMethod));
        assert_eq!(metadata.created, None);
        assert_eq!(
            stripped["proof"],
            json!({
                "type": "RsaSignature2018",
                "https://w3id.org/security#proofPurpose": {
                    "id": "https://w3id.org/security#assertionMethod"
                },
                "https://w3id.org/security#verificationMethod": {
                    "id": "did:example:abc#keys-1"
                }
            })
        );
    }

    #[test]
    fn missing_proof() {
        let err = extract(&credential(Value::Null)).unwrap_err();
        assert!(matches!(err, Error::MissingProof));
        let err = extract(&credential(json!([]))).unwrap_err();
        assert!(matches!(err, Error::MissingProof));
    }

    #[test]
    fn stripped_document_keeps_received_members() {
        let mut value = json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "id": null,
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "issuanceDate": "2019-08-01T00:00:00.000Z",
            "credentialSubject": { "id": "did:example:abc", "publicKey": [] },
            "proof": [{
                "type": "RsaSignature2018",
                "created": null,
                "verificationMethod": "did:example:abc#keys-1",
                "jws": "header..signature"
            }]
        });
        let credential = Credential::from_json(value.clone()).unwrap();
        let (stripped, metadata) = extract(&credential).unwrap();
        assert_eq!(metadata.created, None);
        value["proof"][0].as_object_mut().unwrap().remove("jws");
        assert_eq!(stripped, value);
    }

    #[test]
    fn malformed_proofs() {
        let cases = [
            (
                json!({ "verificationMethod": "did:example:abc#keys-1", "jws": "a..b" }),
                "type",
            ),
            (json!({ "type": "RsaSignature2018", "jws": "a..b" }), "verificationMethod"),
            (
                json!({ "type": "RsaSignature2018", "verificationMethod": "did:example:abc#keys-1" }),
                "jws",
            ),
            (
                json!({
                    "type": "RsaSignature2018",
                    "verificationMethod": { "id": "did:example:abc#keys-1", "type": "RsaVerificationKey2018" },
                    "jws": "a..b"
                }),
                "verificationMethod",
            ),
            (
                json!({
                    "type": "RsaSignature2018",
                    "verificationMethod": ["did:example:abc#keys-1"],
                    "jws": "a..b"
                }),
                "verificationMethod",
            ),
            (
                json!({
                    "type": "RsaSignature2018",
                    "verificationMethod": "did:example:abc#keys-1",
                    "created": "last tuesday",
                    "jws": "a..b"
                }),
                "created",
            ),
            (
                json!({
                    "type": "RsaSignature2018",
                    "verificationMethod": "did:example:abc#keys-1",
                    "proofValue": 42
                }),
                "proofValue",
            ),
        ];
        for (proof, expected_field) in cases {
            match extract(&credential(proof)) {
                Err(Error::MalformedProof { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected malformed {expected_field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn multiple_proofs() {
        let proof = json!({
            "type": "RsaSignature2018",
            "verificationMethod": "did:example:abc#keys-1",
            "jws": "a..b"
        });
        let err = extract(&credential(json!([proof.clone(), proof.clone()]))).unwrap_err();
        assert!(matches!(err, Error::MalformedProof { field: "proof", .. }));
        assert!(extract(&credential(json!([proof]))).is_ok());
    }

    #[test]
    fn proof_purpose_names() {
        assert_eq!(
            ProofPurpose::from("https://w3id.org/security#authentication"),
            ProofPurpose::Authentication
        );
        assert_eq!(
            ProofPurpose::from("https://example.org/vocab#custom"),
            ProofPurpose::Other("https://example.org/vocab#custom".to_string())
        );
        assert_eq!(ProofPurpose::AssertionMethod.to_string(), "assertionMethod");
    }
}
