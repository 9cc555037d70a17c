use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::PublicKeyDescription;
use crate::one_or_many::OneOrMany;
use crate::proof::Proof;

/// Verifiable Credential.
///
/// See: <https://www.w3.org/TR/vc-data-model/>
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "@context")]
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_: Option<OneOrMany<String>>,
    pub issuer: Issuer,
    pub issuance_date: VCDateTime,
    pub credential_subject: OneOrMany<CredentialSubject>,
    // Populated only when using embedded proofs such as LD-PROOF
    //   https://w3c-ccg.github.io/ld-proofs/
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<OneOrMany<Proof>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub property_set: BTreeMap<String, Value>,
    #[serde(skip)]
    received: Received,
}

/// JSON a credential was parsed from. Not part of credential equality.
#[derive(Debug, Clone, Default)]
struct Received(Option<Value>);

impl PartialEq for Received {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Issuer {
    URI(String),
    Object(ObjectWithId),
}

impl Issuer {
    pub fn id(&self) -> &str {
        match self {
            Self::URI(uri) => uri,
            Self::Object(object) => &object.id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ObjectWithId {
    pub id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub property_set: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    pub id: String,
    /// Keys the subject publishes inline.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_key: Vec<PublicKeyDescription>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub property_set: BTreeMap<String, Value>,
}

/// RFC 3339 date-time, serialized exactly as it was read.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct VCDateTime {
    date_time: DateTime<FixedOffset>,
    repr: String,
}

impl VCDateTime {
    pub fn date_time(&self) -> DateTime<FixedOffset> {
        self.date_time
    }
}

impl TryFrom<String> for VCDateTime {
    type Error = chrono::ParseError;
    fn try_from(repr: String) -> Result<Self, Self::Error> {
        let date_time = DateTime::parse_from_rfc3339(&repr)?;
        Ok(Self { date_time, repr })
    }
}

impl From<VCDateTime> for String {
    fn from(vc_date_time: VCDateTime) -> String {
        vc_date_time.repr
    }
}

impl fmt::Display for VCDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl Credential {
    /// Parse a credential, keeping the received JSON for verification.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let mut credential: Self = serde_json::from_value(value.clone())?;
        credential.received = Received(Some(value));
        Ok(credential)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        Self::from_json(serde_json::from_str(json)?)
    }

    /// JSON form of the credential.
    ///
    /// This is the JSON the credential was parsed from, member for member,
    /// unless the credential has been modified since. Otherwise the typed
    /// fields are serialized.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        if let Some(received) = &self.received.0 {
            let parsed: Self = serde_json::from_value(received.clone())?;
            if parsed == *self {
                return Ok(received.clone());
            }
        }
        serde_json::to_value(self)
    }

    /// Short description used in error reports: the credential id, or else
    /// its issuer.
    pub fn describe(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("issued by {}", self.issuer.id()),
        }
    }

    /// Find a key embedded in a credential subject's `publicKey` list.
    pub fn embedded_key(&self, id: &str) -> Option<(&CredentialSubject, &PublicKeyDescription)> {
        self.credential_subject.iter().find_map(|subject| {
            subject
                .public_key
                .iter()
                .find(|key| key.id == id)
                .map(|key| (subject, key))
        })
    }
}
