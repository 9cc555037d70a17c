//! Public key descriptions and their decoding into verification keys.
//!
//! A [`PublicKeyDescription`] is the linked-data form of a key, as found in
//! a DID document's `publicKey` list or embedded in a credential subject.
//! [`decode`] turns its type tag and encoded material into a
//! [`VerificationKey`].
use std::collections::BTreeMap;

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::jwk::{Params, JWK};

pub const RSA_VERIFICATION_KEY_2018: &str = "RsaVerificationKey2018";
pub const ED25519_VERIFICATION_KEY_2018: &str = "Ed25519VerificationKey2018";
pub const JSON_WEB_KEY_2020: &str = "JsonWebKey2020";

/// Smallest accepted RSA modulus, in bytes.
pub const MIN_RSA_MODULUS_LEN: usize = 256;

#[derive(thiserror::Error, Debug)]
pub enum KeyError {
    #[error("Unsupported key type: '{0}'")]
    UnsupportedKeyType(String),
    #[error("Missing key material")]
    MissingKeyMaterial,
    #[error("A verification method MUST NOT contain multiple verification material properties")]
    MultipleKeyMaterial,
    #[error("Key type {key_type} cannot be encoded as {encoding}")]
    UnexpectedEncoding {
        key_type: String,
        encoding: &'static str,
    },
    #[error("Invalid PEM public key: {0}")]
    Pem(String),
    #[error("Invalid RSA key: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("Invalid key length: {0} bytes")]
    InvalidKeyLength(usize),
    #[error(transparent)]
    Base58(#[from] bs58::decode::Error),
    #[error("Invalid JWK: {0}")]
    Jwk(#[from] serde_json::Error),
    #[error("Curve not implemented: '{0}'")]
    CurveNotImplemented(String),
    #[error("Key is {found} but the suite requires {expected}")]
    KeyTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[cfg(feature = "ed25519")]
    #[error(transparent)]
    Ed25519(#[from] ed25519_dalek::SignatureError),
}

/// Linked-data description of a public key.
///
/// Exactly one of the material properties is expected to be set.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyDescription {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub controller: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_pem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub property_set: BTreeMap<String, Value>,
}

/// Encoded key bytes, borrowed from a [`PublicKeyDescription`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyMaterial<'a> {
    Pem(&'a str),
    Base58(&'a str),
    Jwk(&'a Value),
}

impl KeyMaterial<'_> {
    fn encoding(&self) -> &'static str {
        match self {
            Self::Pem(_) => "publicKeyPem",
            Self::Base58(_) => "publicKeyBase58",
            Self::Jwk(_) => "publicKeyJwk",
        }
    }
}

impl PublicKeyDescription {
    pub fn material(&self) -> Result<KeyMaterial<'_>, KeyError> {
        let mut found = self
            .public_key_pem
            .as_deref()
            .map(KeyMaterial::Pem)
            .into_iter()
            .chain(self.public_key_base58.as_deref().map(KeyMaterial::Base58))
            .chain(self.public_key_jwk.as_ref().map(KeyMaterial::Jwk));
        let material = found.next().ok_or(KeyError::MissingKeyMaterial)?;
        if found.next().is_some() {
            return Err(KeyError::MultipleKeyMaterial);
        }
        Ok(material)
    }

    /// Decode the described key.
    pub fn decode(&self) -> Result<VerificationKey, KeyError> {
        decode(&self.type_, self.material()?)
    }
}

/// Public key usable for signature verification.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationKey {
    Rsa(RsaPublicKey),
    #[cfg(feature = "ed25519")]
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl VerificationKey {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            #[cfg(feature = "ed25519")]
            Self::Ed25519(_) => "Ed25519",
        }
    }
}

/// Decode encoded key material according to its key type tag.
pub fn decode(key_type: &str, material: KeyMaterial<'_>) -> Result<VerificationKey, KeyError> {
    let unexpected = || KeyError::UnexpectedEncoding {
        key_type: key_type.to_string(),
        encoding: material.encoding(),
    };
    let key = match (key_type, material) {
        (RSA_VERIFICATION_KEY_2018, KeyMaterial::Pem(pem)) => rsa_from_pem(pem)?,
        (RSA_VERIFICATION_KEY_2018, KeyMaterial::Jwk(jwk)) => match decode_jwk(jwk)? {
            key @ VerificationKey::Rsa(_) => key,
            #[cfg(feature = "ed25519")]
            _ => return Err(unexpected()),
        },
        #[cfg(feature = "ed25519")]
        (ED25519_VERIFICATION_KEY_2018, KeyMaterial::Base58(encoded)) => {
            let bytes = bs58::decode(encoded).into_vec()?;
            VerificationKey::Ed25519(ed25519_dalek::VerifyingKey::try_from(bytes.as_slice())?)
        }
        #[cfg(feature = "ed25519")]
        (ED25519_VERIFICATION_KEY_2018, KeyMaterial::Jwk(jwk)) => match decode_jwk(jwk)? {
            key @ VerificationKey::Ed25519(_) => key,
            _ => return Err(unexpected()),
        },
        (JSON_WEB_KEY_2020, KeyMaterial::Jwk(jwk)) => decode_jwk(jwk)?,
        (RSA_VERIFICATION_KEY_2018 | JSON_WEB_KEY_2020, _) => return Err(unexpected()),
        #[cfg(feature = "ed25519")]
        (ED25519_VERIFICATION_KEY_2018, _) => return Err(unexpected()),
        (other, _) => return Err(KeyError::UnsupportedKeyType(other.to_string())),
    };
    Ok(key)
}

fn rsa_from_pem(pem: &str) -> Result<VerificationKey, KeyError> {
    let pem = pem.trim();
    let key = if pem.starts_with("-----BEGIN RSA PUBLIC KEY-----") {
        RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| KeyError::Pem(e.to_string()))?
    } else {
        RsaPublicKey::from_public_key_pem(pem).map_err(|e| KeyError::Pem(e.to_string()))?
    };
    validate_rsa_key_size(&key)?;
    Ok(VerificationKey::Rsa(key))
}

fn decode_jwk(value: &Value) -> Result<VerificationKey, KeyError> {
    let jwk: JWK = serde_json::from_value(value.clone())?;
    match jwk.params {
        Params::RSA(rsa_params) => {
            let key = RsaPublicKey::new(
                BigUint::from_bytes_be(&rsa_params.modulus.0),
                BigUint::from_bytes_be(&rsa_params.exponent.0),
            )?;
            validate_rsa_key_size(&key)?;
            Ok(VerificationKey::Rsa(key))
        }
        #[cfg(feature = "ed25519")]
        Params::OKP(okp) if okp.curve == "Ed25519" => Ok(VerificationKey::Ed25519(
            ed25519_dalek::VerifyingKey::try_from(okp.public_key.0.as_slice())?,
        )),
        Params::OKP(okp) => Err(KeyError::CurveNotImplemented(okp.curve)),
    }
}

fn validate_rsa_key_size(key: &RsaPublicKey) -> Result<(), KeyError> {
    let len = key.size();
    if len < MIN_RSA_MODULUS_LEN {
        return Err(KeyError::InvalidKeyLength(len));
    }
    Ok(())
}
