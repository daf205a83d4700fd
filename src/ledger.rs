//! Contracts of the collaborators the feed reads from and writes to.
//!
//! The renderer and dispatcher only see these traits; transport (RPC, wallet
//! signing, indexers) lives behind them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type PostId = u64;

/// Snapshot of a post as stored by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub author: String,
    pub body: String,
    /// Fixed-point, 18 decimals.
    pub upvotes: u128,
    pub downvotes: u128,
    pub reply_ids: Vec<PostId>,
    /// Chain time, seconds.
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventFilter {
    PostCreated { post_id: PostId },
    /// `tagger` / `tag` of `None` match anything.
    PostTagged {
        post_id: PostId,
        tagger: Option<String>,
        tag: Option<String>,
    },
}

impl EventFilter {
    pub fn post_created(post_id: PostId) -> Self {
        EventFilter::PostCreated { post_id }
    }

    pub fn post_tagged(post_id: PostId) -> Self {
        EventFilter::PostTagged { post_id, tagger: None, tag: None }
    }

    pub fn matches(&self, event: &LedgerEvent) -> bool {
        match (self, event) {
            (EventFilter::PostCreated { post_id }, LedgerEvent::PostCreated { post_id: id, .. }) => post_id == id,
            (
                EventFilter::PostTagged { post_id, tagger, tag },
                LedgerEvent::PostTagged { post_id: id, tagger: who, tag_name, .. },
            ) => {
                post_id == id
                    && tagger.as_deref().map_or(true, |t| t == who)
                    && tag.as_deref().map_or(true, |t| t == tag_name)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    PostCreated {
        post_id: PostId,
        author: String,
        parent_id: Option<PostId>,
        block_number: u64,
    },
    PostTagged {
        post_id: PostId,
        tagger: String,
        tag_name: String,
        /// Older deployments carry the display payload inline; newer ones
        /// leave it to [`TagDirectory`].
        payload: Option<String>,
        block_number: u64,
    },
}

impl LedgerEvent {
    pub fn block_number(&self) -> u64 {
        match self {
            LedgerEvent::PostCreated { block_number, .. } | LedgerEvent::PostTagged { block_number, .. } => *block_number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: u64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Contract rejection; the reason string is the contract's own wording.
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("post {0} not found")]
    NotFound(PostId),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("lookup failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn get_post(&self, id: PostId) -> Result<PostRecord, LedgerError>;
    /// Events in chain order.
    async fn query_filter(&self, filter: &EventFilter) -> Result<Vec<LedgerEvent>, LedgerError>;
    async fn upvote_post(&self, id: PostId) -> Result<TxHandle, LedgerError>;
    async fn downvote_post(&self, id: PostId) -> Result<TxHandle, LedgerError>;
    async fn tag_post(&self, id: PostId, name: &str) -> Result<TxHandle, LedgerError>;
    async fn create_post(&self, body: &str, parent: Option<PostId>) -> Result<TxHandle, LedgerError>;
    async fn wait_for_confirmation(&self, tx: &TxHandle) -> Result<Receipt, LedgerError>;
}

#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn get_block(&self, number: u64) -> Result<Block, LookupError>;
}

/// Reverse name resolution for author addresses.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn lookup_address(&self, address: &str) -> Result<Option<String>, LookupError>;
}

/// Tag detail lookup used by deployments whose tag events omit the payload.
#[async_trait]
pub trait TagDirectory: Send + Sync {
    async fn tag_payload(&self, tag_name: &str) -> Result<Option<String>, LookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_filter_wildcards() {
        let ev = LedgerEvent::PostTagged {
            post_id: 7,
            tagger: "0xabc".into(),
            tag_name: "rust".into(),
            payload: None,
            block_number: 3,
        };
        assert!(EventFilter::post_tagged(7).matches(&ev));
        assert!(!EventFilter::post_tagged(8).matches(&ev));
        assert!(!EventFilter::post_created(7).matches(&ev));
        let narrow = EventFilter::PostTagged { post_id: 7, tagger: Some("0xdef".into()), tag: None };
        assert!(!narrow.matches(&ev));
    }
}
