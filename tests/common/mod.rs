#![allow(dead_code)]
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ldp_verify::canonicalize::{CanonicalizationOptions, Canonicalizer};
use ldp_verify::jws::{Algorithm, Header};
use ldp_verify::{Credential, JcsCanonicalizer, StaticResolver, TrustDocument};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use sha2::Sha256;

pub const RSA_PRIVATE_PEM: &str = include_str!("../fixtures/rsa2048-private.pem");
pub const RSA_PUBLIC_PEM: &str = include_str!("../fixtures/rsa2048-public.pem");
pub const RSA_1024_PUBLIC_PEM: &str = include_str!("../fixtures/rsa1024-public.pem");
pub const TANGLE_CREDENTIAL: &str = include_str!("../fixtures/tangle-credential.json");

pub const SUBJECT: &str = "did:example:abc";
pub const KEY_ID: &str = "did:example:abc#keys-1";

pub fn rsa_private_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(RSA_PRIVATE_PEM).unwrap()
}

pub fn rsa_key_description(id: &str, controller: &str) -> Value {
    json!({
        "id": id,
        "type": "RsaVerificationKey2018",
        "controller": controller,
        "publicKeyPem": RSA_PUBLIC_PEM
    })
}

/// RSA public key as a JWK.
pub fn rsa_public_jwk() -> Value {
    let key = rsa_private_key().to_public_key();
    json!({
        "kty": "RSA",
        "n": URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
        "e": URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
    })
}

/// Unsigned credential whose subject publishes `key`, with a proof of type
/// `proof_type` referencing it.
pub fn unsigned_credential(key: Value, proof_type: &str) -> Value {
    let key_id = key["id"].clone();
    json!({
        "@context": [
            "https://www.w3.org/2018/credentials/v1",
            { "name": "http://schema.org/name" }
        ],
        "id": "urn:uuid:3978344f-8596-4c3a-a978-8fcaba3903c5",
        "type": ["VerifiableCredential"],
        "issuer": SUBJECT,
        "issuanceDate": "2019-08-01T00:00:00.000Z",
        "credentialSubject": {
            "id": SUBJECT,
            "name": "Alice",
            "publicKey": [key]
        },
        "proof": {
            "type": proof_type,
            "created": "2019-09-03T14:12:56Z",
            "proofPurpose": "assertionMethod",
            "verificationMethod": key_id
        }
    })
}

/// Attach a detached JWS over the canonical JSON of `credential` with its
/// `jws` removed, signed by `sign`.
pub async fn sign_json(
    mut credential: Value,
    algorithm: Algorithm,
    sign: impl Fn(&[u8]) -> Vec<u8>,
) -> Value {
    let loader = StaticResolver::new();
    let canonical = JcsCanonicalizer::new()
        .canonicalize(
            &credential,
            &CanonicalizationOptions {
                document_loader: &loader,
            },
        )
        .await
        .unwrap();
    let header = Header::new_unencoded(algorithm).encode().unwrap();
    let signing_input = [header.as_bytes(), b".", &canonical].concat();
    let signature = URL_SAFE_NO_PAD.encode(sign(&signing_input));
    let proof = match &mut credential["proof"] {
        Value::Array(proofs) => &mut proofs[0],
        proof => proof,
    };
    proof["jws"] = Value::String(format!("{header}..{signature}"));
    credential
}

pub async fn sign_with(
    credential: Value,
    algorithm: Algorithm,
    sign: impl Fn(&[u8]) -> Vec<u8>,
) -> Credential {
    Credential::from_json(sign_json(credential, algorithm, sign).await).unwrap()
}

pub fn ps256(data: &[u8]) -> Vec<u8> {
    let signing_key = rsa::pss::BlindedSigningKey::<Sha256>::new(rsa_private_key());
    signing_key
        .sign_with_rng(&mut rand::rngs::OsRng, data)
        .to_vec()
}

pub fn rs256(data: &[u8]) -> Vec<u8> {
    let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(rsa_private_key());
    signing_key
        .sign_with_rng(&mut rand::rngs::OsRng, data)
        .to_vec()
}

/// The scenario credential: key `did:example:abc#keys-1` embedded in the
/// subject, RsaSignature2018 proof with PS256.
pub async fn signed_credential() -> Credential {
    sign_with(
        unsigned_credential(rsa_key_description(KEY_ID, SUBJECT), "RsaSignature2018"),
        Algorithm::PS256,
        ps256,
    )
    .await
}

/// Resolver trusting the first key embedded in the credential subject.
pub fn trust_resolver(credential: &Credential) -> StaticResolver {
    let subject = credential.credential_subject.to_single().unwrap();
    let mut resolver = StaticResolver::new();
    TrustDocument::new(&subject.public_key[0]).register(&mut resolver, &subject.id);
    resolver
}

/// Replace the last character of the proof's JWS.
pub fn alter_signature(credential: &mut Credential) {
    let proof = credential
        .proof
        .as_mut()
        .and_then(|proof| proof.to_single_mut())
        .unwrap();
    let mut jws = proof.jws.as_ref().unwrap().as_str().unwrap().to_string();
    let last = jws.pop().unwrap();
    jws.push(if last == 'A' { 'w' } else { 'A' });
    proof.jws = Some(Value::String(jws));
}
