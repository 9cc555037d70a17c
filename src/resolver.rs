//! Resolution of identifiers to linked-data documents.
use std::collections::HashMap;

use async_trait::async_trait;

use crate::document::{ContextDocument, Document};

pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const SECURITY_V1_CONTEXT: &str = "https://w3id.org/security/v1";
pub const SECURITY_V2_CONTEXT: &str = crate::document::SECURITY_V2_CONTEXT;
pub const DID_V1_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
const DID_V1_CONTEXT_W3ID: &str = "https://w3id.org/did/v1";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// No document is known under this identifier.
    #[error("Document not found: '{0}'")]
    DocumentNotFound(String),
}

/// Maps an identifier (a DID, a key id, or a context URL) to its document.
///
/// Identifiers are matched exactly. Implementations backed by network I/O
/// must report timeouts as [`ResolutionError::DocumentNotFound`].
#[async_trait]
pub trait DocumentResolver: Sync {
    async fn resolve(&self, id: &str) -> Result<Document, ResolutionError>;
}

/// In-memory resolver populated before verification.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    map: HashMap<String, Document>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver preloaded with the credentials, security and DID contexts.
    pub fn with_default_contexts() -> Self {
        let mut resolver = Self::new();
        for (url, json) in [
            (CREDENTIALS_V1_CONTEXT, ssi_contexts::CREDENTIALS_V1),
            (SECURITY_V1_CONTEXT, ssi_contexts::SECURITY_V1),
            (SECURITY_V2_CONTEXT, ssi_contexts::SECURITY_V2),
            (DID_V1_CONTEXT, ssi_contexts::DID_V1),
            (DID_V1_CONTEXT_W3ID, ssi_contexts::DID_V1),
        ] {
            match serde_json::from_str::<ContextDocument>(json) {
                Ok(doc) => {
                    resolver.register(url, Document::Context(doc));
                }
                Err(e) => log::warn!("Unable to load context {url}: {e}"),
            }
        }
        resolver
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Insert a document, replacing and returning any previous one.
    pub fn register(&mut self, id: impl Into<String>, document: Document) -> Option<Document> {
        self.map.insert(id.into(), document)
    }
}

#[async_trait]
impl DocumentResolver for StaticResolver {
    async fn resolve(&self, id: &str) -> Result<Document, ResolutionError> {
        match self.map.get(id) {
            Some(doc) => Ok(doc.clone()),
            None => Err(ResolutionError::DocumentNotFound(id.to_string())),
        }
    }
}

/// Try a list of resolvers in order, returning the first document found.
pub struct SeriesResolver<'a> {
    pub resolvers: Vec<&'a dyn DocumentResolver>,
}

impl<'a> SeriesResolver<'a> {
    pub fn new(resolvers: Vec<&'a dyn DocumentResolver>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl DocumentResolver for SeriesResolver<'_> {
    async fn resolve(&self, id: &str) -> Result<Document, ResolutionError> {
        for resolver in &self.resolvers {
            match resolver.resolve(id).await {
                Ok(doc) => return Ok(doc),
                Err(ResolutionError::DocumentNotFound(_)) => continue,
            }
        }
        Err(ResolutionError::DocumentNotFound(id.to_string()))
    }
}
