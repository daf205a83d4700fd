//! In-process ledger.
//!
//! Mirrors the forum contract closely enough to drive the renderer and the
//! dispatcher end to end: stake-weighted votes, one vote per account, no
//! self-votes, tag validation, reply linkage, one block per transaction.
//! Reverts use the contract's wording so feedback classification sees the
//! same strings it would in production.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::format::SCORE_SCALE;
use crate::ledger::*;

const SNAPSHOT_FILE: &str = "ledger.json";
pub const MAX_TAG_CHARS: usize = 32;

#[derive(Default, Serialize, Deserialize)]
struct State {
    posts: BTreeMap<PostId, PostRecord>,
    events: Vec<LedgerEvent>,
    blocks: BTreeMap<u64, i64>,
    voted: HashSet<(PostId, String)>,
    stake: HashMap<String, u128>,
    names: HashMap<String, String>,
    tag_payloads: HashMap<String, String>,
    receipts: HashMap<String, Receipt>,
    next_post_id: PostId,
    next_tx: u64,
}

impl State {
    fn mine(&mut self) -> u64 {
        let number = self.blocks.keys().next_back().map_or(1, |n| n + 1);
        self.blocks.insert(number, Utc::now().timestamp());
        number
    }

    fn receipt(&mut self, block_number: u64) -> TxHandle {
        self.next_tx += 1;
        let hash = format!("0x{:064x}", self.next_tx);
        self.receipts.insert(hash.clone(), Receipt { tx_hash: hash.clone(), block_number });
        TxHandle { hash }
    }
}

/// Cheap to clone; clones share state. Each handle acts as one account.
#[derive(Clone)]
pub struct InMemLedger {
    state: Arc<RwLock<State>>,
    caller: String,
    inline_tag_payloads: bool,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl InMemLedger {
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(State { next_post_id: 1, ..State::default() })),
            caller: caller.into(),
            inline_tag_payloads: false,
            snapshot_path: None,
        }
    }

    /// Load `<dir>/ledger.json` if present and write back after every mutation.
    pub fn with_snapshot_dir(caller: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(SNAPSHOT_FILE);
        let state = Self::load_state_from(&path);
        Self {
            state: Arc::new(RwLock::new(state)),
            caller: caller.into(),
            inline_tag_payloads: false,
            snapshot_path: Some(Arc::new(path)),
        }
    }

    fn load_state_from(path: &Path) -> State {
        let fresh = || State { next_post_id: 1, ..State::default() };
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    info!("loaded ledger snapshot '{}'", path.display());
                    s
                }
                Err(e) => {
                    warn!("failed to parse ledger snapshot '{}': {e}; starting empty", path.display());
                    fresh()
                }
            },
            Err(e) => {
                info!("no ledger snapshot at '{}' ({e}); starting empty", path.display());
                fresh()
            }
        }
    }

    fn persist(&self) {
        let Some(path) = self.snapshot_path.as_deref() else { return };
        let bytes = match self.state.read() {
            Ok(s) => serde_json::to_vec_pretty(&*s),
            Err(_) => return,
        };
        match bytes {
            Ok(bytes) => {
                if let Some(dir) = path.parent() {
                    if let Err(e) = std::fs::create_dir_all(dir) {
                        warn!("failed to create ledger snapshot dir '{}': {e}", dir.display());
                    }
                }
                if let Err(e) = std::fs::write(path, bytes) {
                    warn!("failed to write ledger snapshot '{}': {e}", path.display());
                }
            }
            Err(e) => warn!("failed to serialise ledger snapshot: {e}"),
        }
    }

    /// Same ledger, acting as `caller`.
    pub fn as_caller(&self, caller: impl Into<String>) -> Self {
        Self { caller: caller.into(), ..self.clone() }
    }

    /// Older deployments emit the tag payload inside the tag event.
    pub fn with_inline_tag_payloads(mut self, inline: bool) -> Self {
        self.inline_tag_payloads = inline;
        self
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, LedgerError> {
        self.state.read().map_err(|_| LedgerError::Transport("ledger state poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, LedgerError> {
        self.state.write().map_err(|_| LedgerError::Transport("ledger state poisoned".into()))
    }

    /// Credit `tokens` whole stake tokens; vote weight equals stake.
    pub fn mint_stake(&self, account: &str, tokens: u128) -> Result<(), LedgerError> {
        let mut s = self.write()?;
        let balance = s.stake.entry(account.to_string()).or_default();
        *balance = balance.saturating_add(tokens.saturating_mul(SCORE_SCALE as u128));
        drop(s);
        self.persist();
        Ok(())
    }

    pub fn register_name(&self, account: &str, name: &str) -> Result<(), LedgerError> {
        self.write()?.names.insert(account.to_string(), name.to_string());
        self.persist();
        Ok(())
    }

    pub fn register_tag_payload(&self, tag: &str, payload: &str) -> Result<(), LedgerError> {
        self.write()?.tag_payloads.insert(tag.to_string(), payload.to_string());
        self.persist();
        Ok(())
    }

    /// A handful of posts covering text, links and replies.
    pub fn seed_demo(&self) -> Result<(), LedgerError> {
        if !self.read()?.posts.is_empty() {
            return Ok(());
        }
        let first = self.insert_post("Welcome to the board. Be kind, vote honestly.", None)?;
        self.insert_post("https://www.youtube.com/watch?v=dQw4w9WgXcQ", None)?;
        self.insert_post("https://upload.wikimedia.org/wikipedia/commons/4/47/PNG_transparency_demonstration_1.png", None)?;
        self.insert_post("First reply!", Some(first))?;
        self.persist();
        Ok(())
    }

    fn insert_post(&self, body: &str, parent: Option<PostId>) -> Result<PostId, LedgerError> {
        let mut s = self.write()?;
        if body.trim().is_empty() {
            return Err(LedgerError::Reverted("Empty post".into()));
        }
        if let Some(p) = parent {
            if !s.posts.contains_key(&p) {
                return Err(LedgerError::Reverted("Parent post does not exist".into()));
            }
        }
        let id = s.next_post_id.max(1);
        s.next_post_id = id + 1;
        let block_number = s.mine();
        s.posts.insert(
            id,
            PostRecord {
                author: self.caller.clone(),
                body: body.to_string(),
                upvotes: 0,
                downvotes: 0,
                reply_ids: Vec::new(),
                created_at: Utc::now().timestamp().max(0) as u64,
            },
        );
        if let Some(p) = parent {
            if let Some(parent_post) = s.posts.get_mut(&p) {
                parent_post.reply_ids.push(id);
            }
        }
        s.events.push(LedgerEvent::PostCreated { post_id: id, author: self.caller.clone(), parent_id: parent, block_number });
        Ok(id)
    }

    fn vote(&self, id: PostId, up: bool) -> Result<TxHandle, LedgerError> {
        let mut s = self.write()?;
        let author = s.posts.get(&id).map(|p| p.author.clone()).ok_or(LedgerError::NotFound(id))?;
        if author == self.caller {
            return Err(LedgerError::Reverted("Author restricted from voting on own post".into()));
        }
        if s.voted.contains(&(id, self.caller.clone())) {
            return Err(LedgerError::Reverted("Already voted on this post".into()));
        }
        let weight = s.stake.get(&self.caller).copied().unwrap_or(0);
        if weight == 0 {
            return Err(LedgerError::Reverted("Insufficient stake token balance".into()));
        }
        s.voted.insert((id, self.caller.clone()));
        if let Some(post) = s.posts.get_mut(&id) {
            if up {
                post.upvotes = post.upvotes.saturating_add(weight);
            } else {
                post.downvotes = post.downvotes.saturating_add(weight);
            }
        }
        let block = s.mine();
        let tx = s.receipt(block);
        drop(s);
        self.persist();
        Ok(tx)
    }
}

fn valid_tag(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= MAX_TAG_CHARS && !name.chars().any(char::is_whitespace)
}

#[async_trait]
impl Ledger for InMemLedger {
    async fn get_post(&self, id: PostId) -> Result<PostRecord, LedgerError> {
        self.read()?.posts.get(&id).cloned().ok_or(LedgerError::NotFound(id))
    }

    async fn query_filter(&self, filter: &EventFilter) -> Result<Vec<LedgerEvent>, LedgerError> {
        let s = self.read()?;
        Ok(s.events.iter().filter(|e| filter.matches(e)).cloned().collect())
    }

    async fn upvote_post(&self, id: PostId) -> Result<TxHandle, LedgerError> {
        self.vote(id, true)
    }

    async fn downvote_post(&self, id: PostId) -> Result<TxHandle, LedgerError> {
        self.vote(id, false)
    }

    async fn tag_post(&self, id: PostId, name: &str) -> Result<TxHandle, LedgerError> {
        if !valid_tag(name) {
            return Err(LedgerError::Reverted("Invalid tag".into()));
        }
        let mut s = self.write()?;
        if !s.posts.contains_key(&id) {
            return Err(LedgerError::NotFound(id));
        }
        let payload = if self.inline_tag_payloads {
            Some(s.tag_payloads.get(name).cloned().unwrap_or_else(|| name.to_string()))
        } else {
            None
        };
        let block_number = s.mine();
        s.events.push(LedgerEvent::PostTagged {
            post_id: id,
            tagger: self.caller.clone(),
            tag_name: name.to_string(),
            payload,
            block_number,
        });
        let tx = s.receipt(block_number);
        drop(s);
        self.persist();
        Ok(tx)
    }

    async fn create_post(&self, body: &str, parent: Option<PostId>) -> Result<TxHandle, LedgerError> {
        let id = self.insert_post(body, parent)?;
        let mut s = self.write()?;
        let block = s
            .events
            .iter()
            .rev()
            .find(|e| matches!(e, LedgerEvent::PostCreated { post_id, .. } if *post_id == id))
            .map(LedgerEvent::block_number)
            .unwrap_or_default();
        let tx = s.receipt(block);
        drop(s);
        self.persist();
        Ok(tx)
    }

    async fn wait_for_confirmation(&self, tx: &TxHandle) -> Result<Receipt, LedgerError> {
        self.read()?
            .receipts
            .get(&tx.hash)
            .cloned()
            .ok_or_else(|| LedgerError::Transport(format!("unknown transaction {}", tx.hash)))
    }
}

#[async_trait]
impl BlockSource for InMemLedger {
    async fn get_block(&self, number: u64) -> Result<Block, LookupError> {
        let s = self.state.read().map_err(|_| LookupError::Failed("ledger state poisoned".into()))?;
        s.blocks
            .get(&number)
            .map(|ts| Block { number, timestamp: *ts })
            .ok_or_else(|| LookupError::Failed(format!("block {number} not found")))
    }
}

#[async_trait]
impl NameResolver for InMemLedger {
    async fn lookup_address(&self, address: &str) -> Result<Option<String>, LookupError> {
        let s = self.state.read().map_err(|_| LookupError::Failed("ledger state poisoned".into()))?;
        Ok(s.names.get(address).cloned())
    }
}

#[async_trait]
impl TagDirectory for InMemLedger {
    async fn tag_payload(&self, tag_name: &str) -> Result<Option<String>, LookupError> {
        let s = self.state.read().map_err(|_| LookupError::Failed("ledger state poisoned".into()))?;
        Ok(s.tag_payloads.get(tag_name).cloned())
    }
}
