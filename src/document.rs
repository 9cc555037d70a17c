//! Linked-data documents served by a [`DocumentResolver`](crate::resolver::DocumentResolver).
use std::collections::BTreeMap;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::key::PublicKeyDescription;
use crate::one_or_many::OneOrMany;
use crate::proof::ProofPurpose;
use crate::resolver::StaticResolver;

/// <https://w3id.org/security/v2>
pub const SECURITY_V2_CONTEXT: &str = "https://w3id.org/security/v2";

/// Reference to a verification method from a verification relationship:
/// either its identifier or the embedded method itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum VerificationMethodRef {
    Id(String),
    Embedded(PublicKeyDescription),
}

impl VerificationMethodRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Embedded(key) => &key.id,
        }
    }
}

/// DID document, restricted to the members used to discover keys.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_key: Vec<PublicKeyDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<PublicKeyDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<VerificationMethodRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<VerificationMethodRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<VerificationMethodRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<VerificationMethodRef>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub property_set: BTreeMap<String, Value>,
}

impl DidDocument {
    /// Minimal security-vocabulary document exposing a single key as an
    /// assertion method of its controller.
    pub fn for_key(key: &PublicKeyDescription) -> Self {
        Self {
            context: Value::String(SECURITY_V2_CONTEXT.to_string()),
            id: key.controller.clone(),
            controller: None,
            public_key: vec![key.clone()],
            verification_method: Vec::new(),
            authentication: Vec::new(),
            assertion_method: vec![VerificationMethodRef::Id(key.id.clone())],
            capability_invocation: Vec::new(),
            capability_delegation: Vec::new(),
            property_set: BTreeMap::new(),
        }
    }

    /// Expand a relative (`#fragment`) identifier against the document id.
    fn absolute_id(&self, id: &str) -> String {
        if id.starts_with('#') {
            format!("{}{}", self.id, id)
        } else {
            id.to_string()
        }
    }

    fn relationship(&self, purpose: &ProofPurpose) -> Option<&[VerificationMethodRef]> {
        match purpose {
            ProofPurpose::AssertionMethod => Some(&self.assertion_method),
            ProofPurpose::Authentication => Some(&self.authentication),
            ProofPurpose::CapabilityInvocation => Some(&self.capability_invocation),
            ProofPurpose::CapabilityDelegation => Some(&self.capability_delegation),
            ProofPurpose::Other(_) => None,
        }
    }

    /// Find a key described anywhere in this document.
    pub fn find_key(&self, id: &str) -> Option<&PublicKeyDescription> {
        let relationships = self
            .authentication
            .iter()
            .chain(&self.assertion_method)
            .chain(&self.capability_invocation)
            .chain(&self.capability_delegation)
            .filter_map(|vm| match vm {
                VerificationMethodRef::Embedded(key) => Some(key),
                VerificationMethodRef::Id(_) => None,
            });
        self.public_key
            .iter()
            .chain(&self.verification_method)
            .chain(relationships)
            .find(|key| self.absolute_id(&key.id) == id)
    }

    /// Whether the document lists `key_id` under the verification
    /// relationship of `purpose`.
    pub fn authorizes(&self, purpose: &ProofPurpose, key_id: &str) -> bool {
        self.relationship(purpose)
            .unwrap_or_default()
            .iter()
            .any(|vm| self.absolute_id(vm.id()) == key_id)
    }
}

/// Key description published as a document of its own.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KeyDocument {
    #[serde(rename = "@context")]
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
    #[serde(flatten)]
    pub key: PublicKeyDescription,
}

impl KeyDocument {
    pub fn new(key: PublicKeyDescription) -> Self {
        Self {
            context: Value::String(SECURITY_V2_CONTEXT.to_string()),
            key,
        }
    }
}

/// JSON-LD context document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContextDocument {
    #[serde(rename = "@context")]
    pub context: Value,
}

/// Resolved document.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Document {
    Did(DidDocument),
    Key(KeyDocument),
    Context(ContextDocument),
}

const KEY_MATERIAL_TERMS: [&str; 3] = ["publicKeyPem", "publicKeyBase58", "publicKeyJwk"];

impl Document {
    /// Interpret a JSON document as a key description, a DID document or a
    /// context, in that order.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let object = value
            .as_object()
            .ok_or_else(|| serde_json::Error::custom("Expected a JSON object"))?;
        if object.contains_key("type")
            && KEY_MATERIAL_TERMS.iter().any(|term| object.contains_key(*term))
        {
            Ok(Self::Key(serde_json::from_value(value)?))
        } else if object.contains_key("id") {
            Ok(Self::Did(serde_json::from_value(value)?))
        } else if object.contains_key("@context") {
            Ok(Self::Context(serde_json::from_value(value)?))
        } else {
            Err(serde_json::Error::custom("Unrecognized document"))
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Did(doc) => Some(&doc.id),
            Self::Key(doc) => Some(&doc.key.id),
            Self::Context(_) => None,
        }
    }

    /// The description of key `id`, if this document is it or embeds it.
    pub fn key_description(&self, id: &str) -> Option<&PublicKeyDescription> {
        match self {
            Self::Key(doc) if doc.key.id == id => Some(&doc.key),
            Self::Did(doc) => doc.find_key(id),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Document::from_json(value).map_err(D::Error::custom)
    }
}

/// Documents asserting that a key is an assertion method of its
/// controller, synthesized for a key found inline in a credential.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustDocument {
    pub controller: DidDocument,
    pub key: KeyDocument,
}

impl TrustDocument {
    pub fn new(key: &PublicKeyDescription) -> Self {
        Self {
            controller: DidDocument::for_key(key),
            key: KeyDocument::new(key.clone()),
        }
    }

    /// Register under the subject's identifier and the key's identifier,
    /// and under the key's controller when that differs from the subject.
    pub fn register(self, resolver: &mut StaticResolver, subject_id: &str) {
        if self.controller.id != subject_id {
            resolver.register(&self.controller.id, Document::Did(self.controller.clone()));
        }
        resolver.register(subject_id, Document::Did(self.controller));
        resolver.register(&self.key.key.id.clone(), Document::Key(self.key));
    }
}
