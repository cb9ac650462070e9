use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote attribute-oriented store that log items are written to
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Make sure the destination domain exists and is reachable
    async fn ensure_domain(&self) -> Result<(), StoreError>;

    /// Write one batch of items in a single call
    async fn batch_put(&self, items: Vec<StoreItem>) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned error status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("store error: {0}")]
    Generic(String),
}

/// One item to put: a unique name plus its attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreItem {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl StoreItem {
    /// First value of the named attribute
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
