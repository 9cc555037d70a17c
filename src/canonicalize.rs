//! Canonicalization of the document covered by a proof.
//!
//! The verifier treats canonicalization as a black box behind the
//! [`Canonicalizer`] trait. [`JcsCanonicalizer`] is the bundled
//! implementation, producing the JSON Canonicalization Scheme ([RFC 8785])
//! serialization of the document.
//!
//! [RFC 8785]: https://www.rfc-editor.org/rfc/rfc8785
use async_trait::async_trait;
use serde_json::Value;

use crate::resolver::{DocumentResolver, ResolutionError};

#[derive(thiserror::Error, Debug)]
pub enum CanonicalizationError {
    #[error("Unable to serialize document: {0}")]
    Json(#[from] serde_json::Error),
    /// A context referenced by the document could not be loaded.
    #[error("Unresolvable context: '{0}'")]
    UnresolvableContext(String),
    #[error("Invalid context: {0}")]
    InvalidContext(String),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

pub struct CanonicalizationOptions<'a> {
    /// Loader for remote contexts, following the resolver contract.
    pub document_loader: &'a dyn DocumentResolver,
}

#[async_trait]
pub trait Canonicalizer: Sync {
    async fn canonicalize(
        &self,
        document: &Value,
        options: &CanonicalizationOptions<'_>,
    ) -> Result<Vec<u8>, CanonicalizationError>;
}

/// JSON Canonicalization Scheme.
///
/// In strict mode every context referenced by URL must be resolvable
/// through the document loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct JcsCanonicalizer {
    strict: bool,
}

impl JcsCanonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Collect the context URLs referenced anywhere in `value`.
fn context_urls<'a>(value: &'a Value, urls: &mut Vec<&'a str>) -> Result<(), CanonicalizationError> {
    match value {
        Value::Object(object) => {
            for (key, member) in object {
                if key == "@context" {
                    match member {
                        Value::String(url) => urls.push(url),
                        Value::Array(contexts) => {
                            for context in contexts {
                                match context {
                                    Value::String(url) => urls.push(url),
                                    Value::Object(_) | Value::Null => {}
                                    other => {
                                        return Err(CanonicalizationError::InvalidContext(
                                            other.to_string(),
                                        ))
                                    }
                                }
                            }
                        }
                        Value::Object(_) | Value::Null => {}
                        other => {
                            return Err(CanonicalizationError::InvalidContext(other.to_string()))
                        }
                    }
                } else {
                    context_urls(member, urls)?;
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                context_urls(item, urls)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[async_trait]
impl Canonicalizer for JcsCanonicalizer {
    async fn canonicalize(
        &self,
        document: &Value,
        options: &CanonicalizationOptions<'_>,
    ) -> Result<Vec<u8>, CanonicalizationError> {
        if self.strict {
            let mut urls = Vec::new();
            context_urls(document, &mut urls)?;
            for url in urls {
                match options.document_loader.resolve(url).await {
                    Ok(_) => {}
                    Err(ResolutionError::DocumentNotFound(url)) => {
                        return Err(CanonicalizationError::UnresolvableContext(url))
                    }
                }
            }
        }
        Ok(serde_jcs::to_vec(document)?)
    }
}
