//! Persistence backends for the progress ledger.
//!
//! The ledger is stored as one JSON array under a fixed key, matching the
//! single-slot storage model of the browser client it mirrors. Writes are
//! last-write-wins; concurrent writers are expected to be rare and benign.

use crate::ledger::LedgerEntry;
use anyhow::Context;
use std::sync::{
    Arc,
    Mutex,
};

/// Storage key the ledger lives under.
pub const LEDGER_STORAGE_KEY: &str = "swapQuestHistory";

pub trait LedgerStore {
    fn load(&self) -> anyhow::Result<Vec<LedgerEntry>>;

    fn persist(&self, entries: &[LedgerEntry]) -> anyhow::Result<()>;
}

/// Sled-backed store. Clones share the same tree, so a background poller can
/// watch the ledger another handle writes to.
#[derive(Clone)]
pub struct SledLedgerStore {
    tree: sled::Tree,
}

impl SledLedgerStore {
    pub fn open(db: &sled::Db) -> anyhow::Result<Self> {
        let tree = db
            .open_tree("progress")
            .context("failed to open progress tree")?;
        Ok(Self { tree })
    }
}

impl LedgerStore for SledLedgerStore {
    fn load(&self) -> anyhow::Result<Vec<LedgerEntry>> {
        let raw = self
            .tree
            .get(LEDGER_STORAGE_KEY)
            .context("failed to read ledger")?;
        match raw {
            Some(bytes) => {
                serde_json::from_slice(&bytes).context("failed to deserialize ledger")
            }
            None => Ok(Vec::new()),
        }
    }

    fn persist(&self, entries: &[LedgerEntry]) -> anyhow::Result<()> {
        let bytes =
            serde_json::to_vec(entries).context("failed to serialize ledger")?;
        self.tree
            .insert(LEDGER_STORAGE_KEY, bytes)
            .context("failed to write ledger")?;
        self.tree.flush().context("failed to flush ledger")?;
        Ok(())
    }
}

/// Map-backed store for tests and the wallet-less demo path.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> anyhow::Result<Vec<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .expect("ledger store poisoned")
            .clone())
    }

    fn persist(&self, entries: &[LedgerEntry]) -> anyhow::Result<()> {
        *self.entries.lock().expect("ledger store poisoned") = entries.to_vec();
        Ok(())
    }
}
