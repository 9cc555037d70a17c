//! Detached JSON Web Signatures with unencoded payload.
//!
//! See [RFC 7515] and [RFC 7797].
//!
//! [RFC 7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC 7797]: https://www.rfc-editor.org/rfc/rfc7797
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::signature::Verifier;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::key::VerificationKey;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The compact serialization does not have three segments.
    #[error("Invalid JWS")]
    InvalidJWS,
    /// The payload segment of a detached JWS is not empty.
    #[error("Expected detached payload")]
    ExpectedDetachedPayload,
    #[error("Invalid JWS header: {0}")]
    InvalidHeader(String),
    /// Invalid `crit` property in JWS header
    #[error("Invalid crit property in JWS header")]
    InvalidCriticalHeader,
    /// Unknown `crit` header name in JWS header
    #[error("Unknown critical header name in JWS header")]
    UnknownCriticalHeader,
    #[error("Expected unencoded payload (b64: false)")]
    ExpectedUnencodedPayload,
    #[error("Unsupported algorithm: '{0}'")]
    UnsupportedAlgorithm(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// JWS signature algorithms understood by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256
    PS256,
    /// Edwards-curve Digital Signature Algorithm
    EdDSA,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::PS256 => "PS256",
            Self::EdDSA => "EdDSA",
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(Self::RS256),
            "PS256" => Ok(Self::PS256),
            "EdDSA" => Ok(Self::EdDSA),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWS Protected Header.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Header {
    #[serde(rename = "alg")]
    pub algorithm: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "kid")]
    pub key_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "crit")]
    pub critical: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "b64")]
    pub base64urlencode_payload: Option<bool>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub additional_parameters: BTreeMap<String, serde_json::Value>,
}

impl Header {
    /// Header for a detached JWS over an unencoded payload.
    pub fn new_unencoded(algorithm: Algorithm) -> Self {
        Self {
            algorithm: algorithm.as_str().to_string(),
            key_id: None,
            critical: Some(vec!["b64".to_string()]),
            base64urlencode_payload: Some(false),
            additional_parameters: BTreeMap::new(),
        }
    }

    /// Decode a base64url-encoded JWS Protected Header.
    pub fn decode(base_64: &str) -> Result<Self, Error> {
        let header_json = URL_SAFE_NO_PAD
            .decode(base_64)
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;
        serde_json::from_slice(&header_json).map_err(|e| Error::InvalidHeader(e.to_string()))
    }

    pub fn encode(&self) -> Result<String, Error> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn algorithm(&self) -> Result<Algorithm, Error> {
        self.algorithm.parse()
    }

    /// Reject `crit` names this implementation does not understand.
    fn check_critical(&self) -> Result<(), Error> {
        for name in self.critical.iter().flatten() {
            match name.as_str() {
                "alg" | "jku" | "jwk" | "kid" | "x5u" | "x5c" | "x5t" | "x5t#S256" | "typ"
                | "cty" | "crit" => return Err(Error::InvalidCriticalHeader),
                "b64" => {}
                _ => return Err(Error::UnknownCriticalHeader),
            }
        }
        Ok(())
    }
}

/// A JWS in compact serialization whose payload segment is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedJws<'a> {
    pub header: Header,
    header_b64: &'a str,
    signature_b64: &'a str,
}

impl<'a> DetachedJws<'a> {
    /// Split and decode the header of a detached, unencoded-payload JWS.
    pub fn decode(jws: &'a str) -> Result<Self, Error> {
        let (header_b64, signature_b64) = split_detached_jws(jws)?;
        let header = Header::decode(header_b64)?;
        header.check_critical()?;
        if header.base64urlencode_payload != Some(false) {
            return Err(Error::ExpectedUnencodedPayload);
        }
        Ok(Self {
            header,
            header_b64,
            signature_b64,
        })
    }

    /// Header segment exactly as it appears in the JWS.
    pub fn header_b64(&self) -> &str {
        self.header_b64
    }

    /// `header_b64 || '.' || payload`, with the payload appended unencoded.
    pub fn signing_input(&self, payload: &[u8]) -> Vec<u8> {
        [self.header_b64.as_bytes(), b".", payload].concat()
    }

    /// Decoded signature bytes, or `None` if the segment is not valid
    /// base64url.
    pub fn signature(&self) -> Option<Vec<u8>> {
        URL_SAFE_NO_PAD.decode(self.signature_b64).ok()
    }
}

pub fn split_jws(jws: &str) -> Result<(&str, &str, &str), Error> {
    let mut parts = jws.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c), None) => Ok((a, b, c)),
        _ => Err(Error::InvalidJWS),
    }
}

pub fn split_detached_jws(jws: &str) -> Result<(&str, &str), Error> {
    let (header_b64, omitted_payload, signature_b64) = split_jws(jws)?;
    if !omitted_payload.is_empty() {
        return Err(Error::ExpectedDetachedPayload);
    }
    Ok((header_b64, signature_b64))
}

/// Check `signature` over `data`.
///
/// Returns `Ok(false)` when the signature does not match, including when
/// the signature bytes are not even well-formed for the key. Returns an
/// error only when the algorithm cannot be used with the key.
pub fn verify_bytes(
    algorithm: Algorithm,
    data: &[u8],
    key: &VerificationKey,
    signature: &[u8],
) -> Result<bool, Error> {
    match (algorithm, key) {
        (Algorithm::PS256, VerificationKey::Rsa(public_key)) => {
            let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(public_key.clone());
            let Ok(signature) = rsa::pss::Signature::try_from(signature) else {
                return Ok(false);
            };
            Ok(verifying_key.verify(data, &signature).is_ok())
        }
        (Algorithm::RS256, VerificationKey::Rsa(public_key)) => {
            let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public_key.clone());
            let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature) else {
                return Ok(false);
            };
            Ok(verifying_key.verify(data, &signature).is_ok())
        }
        #[cfg(feature = "ed25519")]
        (Algorithm::EdDSA, VerificationKey::Ed25519(public_key)) => {
            let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
                return Ok(false);
            };
            Ok(public_key.verify_strict(data, &signature).is_ok())
        }
        (algorithm, _) => Err(Error::UnsupportedAlgorithm(format!(
            "{algorithm} with {} key",
            key.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Header of the RsaSignature2018 proofs produced by jsonld-signatures.
    const PS256_HEADER: &str = "eyJhbGciOiJQUzI1NiIsImI2NCI6ZmFsc2UsImNyaXQiOlsiYjY0Il19";

    #[test]
    fn decode_detached_header() {
        let jws = format!("{PS256_HEADER}..c2lnbmF0dXJl");
        let decoded = DetachedJws::decode(&jws).unwrap();
        assert_eq!(decoded.header.algorithm().unwrap(), Algorithm::PS256);
        assert_eq!(decoded.header.critical, Some(vec!["b64".to_string()]));
        assert_eq!(decoded.header_b64(), PS256_HEADER);
        assert_eq!(decoded.signature().unwrap(), b"signature");
        assert_eq!(
            decoded.signing_input(b"{\"a\":1}"),
            format!("{PS256_HEADER}.{{\"a\":1}}").into_bytes()
        );
    }

    #[test]
    fn encode_unencoded_header() {
        let encoded = Header::new_unencoded(Algorithm::EdDSA).encode().unwrap();
        let jws = format!("{encoded}..c2ln");
        let decoded = DetachedJws::decode(&jws).unwrap();
        assert_eq!(decoded.header.algorithm().unwrap(), Algorithm::EdDSA);
        assert_eq!(decoded.header.base64urlencode_payload, Some(false));
    }

    #[test]
    fn reject_attached_payload() {
        let jws = format!("{PS256_HEADER}.cGF5bG9hZA.c2lnbmF0dXJl");
        assert!(matches!(
            DetachedJws::decode(&jws),
            Err(Error::ExpectedDetachedPayload)
        ));
        assert!(matches!(
            DetachedJws::decode("abc..def..ghi"),
            Err(Error::InvalidJWS)
        ));
    }

    #[test]
    fn reject_encoded_payload() {
        let header = Header {
            base64urlencode_payload: None,
            critical: None,
            ..Header::new_unencoded(Algorithm::PS256)
        };
        let jws = format!("{}..c2ln", header.encode().unwrap());
        assert!(matches!(
            DetachedJws::decode(&jws),
            Err(Error::ExpectedUnencodedPayload)
        ));
    }

    #[test]
    fn reject_unknown_critical_header() {
        let mut header = Header::new_unencoded(Algorithm::PS256);
        header.critical = Some(vec!["b64".to_string(), "exp".to_string()]);
        let jws = format!("{}..c2ln", header.encode().unwrap());
        assert!(matches!(
            DetachedJws::decode(&jws),
            Err(Error::UnknownCriticalHeader)
        ));
        header.critical = Some(vec!["alg".to_string()]);
        let jws = format!("{}..c2ln", header.encode().unwrap());
        assert!(matches!(
            DetachedJws::decode(&jws),
            Err(Error::InvalidCriticalHeader)
        ));
    }

    #[test]
    fn undecodable_signature_is_none() {
        let jws = format!("{PS256_HEADER}..not*base64");
        let decoded = DetachedJws::decode(&jws).unwrap();
        assert!(decoded.signature().is_none());
    }

    #[test]
    fn algorithm_names() {
        assert_eq!("EdDSA".parse::<Algorithm>().unwrap(), Algorithm::EdDSA);
        assert!(matches!(
            "HS256".parse::<Algorithm>(),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
