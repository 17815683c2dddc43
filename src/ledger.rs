//! Local progress ledger: the append-only activity history behind the quest
//! and achievement UI.
//!
//! The ledger is gamification only. It never gates a transaction, and a
//! persistence failure after settlement is logged and swallowed so the action
//! itself still succeeds. Achievement unlocks are monotonic: once unlocked,
//! an achievement stays unlocked even if a reload sees fewer entries.

pub mod store;

use crate::{
    ledger::store::LedgerStore,
    units::pow10,
};
use alloy_primitives::{
    Address,
    B256,
    U256,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};
use tokio::sync::watch;
use tracing::{
    info,
    warn,
};

/// One recorded action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
    /// Wager-token base units moved by the action.
    pub amount: U256,
    pub tx_hash: B256,
    pub counterparty: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntryKind {
    /// `won` is `None` when the outcome could not be observed in time.
    Bet { won: Option<bool> },
    Swap,
}

/// Aggregates derived from the full entry history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub bets: u64,
    pub wins: u64,
    pub losses: u64,
    pub swaps: u64,
    pub wagered: U256,
    pub swapped: U256,
    pub best_streak: u64,
}

impl Totals {
    fn from_entries(entries: &[LedgerEntry]) -> Self {
        let mut totals = Totals::default();
        let mut streak = 0u64;
        for entry in entries {
            match entry.kind {
                EntryKind::Bet { won } => {
                    totals.bets += 1;
                    totals.wagered = totals.wagered.saturating_add(entry.amount);
                    // An unresolved outcome breaks the streak: it cannot be
                    // counted as a win.
                    if won == Some(true) {
                        streak += 1;
                        totals.wins += 1;
                        totals.best_streak = totals.best_streak.max(streak);
                    } else {
                        if won == Some(false) {
                            totals.losses += 1;
                        }
                        streak = 0;
                    }
                }
                EntryKind::Swap => {
                    totals.swaps += 1;
                    totals.swapped = totals.swapped.saturating_add(entry.amount);
                }
            }
        }
        totals
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Criterion {
    BetsAtLeast(u64),
    WinsAtLeast(u64),
    StreakAtLeast(u64),
    SwapsAtLeast(u64),
    SwapVolumeAtLeast(U256),
    WageredAtLeast(U256),
}

impl Criterion {
    fn met(&self, totals: &Totals) -> bool {
        match self {
            Criterion::BetsAtLeast(n) => totals.bets >= *n,
            Criterion::WinsAtLeast(n) => totals.wins >= *n,
            Criterion::StreakAtLeast(n) => totals.best_streak >= *n,
            Criterion::SwapsAtLeast(n) => totals.swaps >= *n,
            Criterion::SwapVolumeAtLeast(v) => totals.swapped >= *v,
            Criterion::WageredAtLeast(v) => totals.wagered >= *v,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    criterion: Criterion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AchievementStatus {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
}

fn tokens(amount: u64) -> U256 {
    U256::from(amount) * pow10(18)
}

/// The fixed achievement catalog, in display order.
pub fn catalog() -> Vec<Achievement> {
    let a = |id, title, description, criterion| Achievement {
        id,
        title,
        description,
        criterion,
    };
    vec![
        a(
            "first-bet",
            "Baptism by Coin",
            "Place your first bet",
            Criterion::BetsAtLeast(1),
        ),
        a(
            "ten-bets",
            "Regular",
            "Place 10 bets",
            Criterion::BetsAtLeast(10),
        ),
        a(
            "fifty-bets",
            "Fixture",
            "Place 50 bets",
            Criterion::BetsAtLeast(50),
        ),
        a(
            "first-win",
            "Beginner's Luck",
            "Win a flip",
            Criterion::WinsAtLeast(1),
        ),
        a(
            "ten-wins",
            "On a Roll",
            "Win 10 flips",
            Criterion::WinsAtLeast(10),
        ),
        a(
            "streak-three",
            "Hat Trick",
            "Win 3 flips in a row",
            Criterion::StreakAtLeast(3),
        ),
        a(
            "streak-five",
            "Hot Hand",
            "Win 5 flips in a row",
            Criterion::StreakAtLeast(5),
        ),
        a(
            "first-swap",
            "Fresh Chips",
            "Complete your first swap",
            Criterion::SwapsAtLeast(1),
        ),
        a(
            "ten-swaps",
            "Market Maker",
            "Complete 10 swaps",
            Criterion::SwapsAtLeast(10),
        ),
        a(
            "wagered-ten-k",
            "Serious Money",
            "Bet 10,000 FLIP in total",
            Criterion::WageredAtLeast(tokens(10_000)),
        ),
        a(
            "wagered-hundred-k",
            "High Roller",
            "Bet 100,000 FLIP in total",
            Criterion::WageredAtLeast(tokens(100_000)),
        ),
        a(
            "wagered-one-m",
            "Whale Watch",
            "Bet 1,000,000 FLIP in total",
            Criterion::WageredAtLeast(tokens(1_000_000)),
        ),
        a(
            "volume-ten-k",
            "Ten Grand Club",
            "Swap 10,000 FLIP in total",
            Criterion::SwapVolumeAtLeast(tokens(10_000)),
        ),
        a(
            "volume-hundred-k",
            "Deep Pockets",
            "Swap 100,000 FLIP in total",
            Criterion::SwapVolumeAtLeast(tokens(100_000)),
        ),
        a(
            "volume-one-m",
            "Liquidity Event",
            "Swap 1,000,000 FLIP in total",
            Criterion::SwapVolumeAtLeast(tokens(1_000_000)),
        ),
    ]
}

/// One step of the swapping quest shown in the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestStep {
    pub title: &'static str,
    pub done: bool,
}

struct LedgerInner {
    entries: Vec<LedgerEntry>,
    unlocked: BTreeSet<&'static str>,
}

/// Shared handle over the ledger; clones see the same entries and unlocks.
pub struct ProgressLedger<S> {
    store: S,
    catalog: Vec<Achievement>,
    inner: Arc<Mutex<LedgerInner>>,
}

impl<S> Clone for ProgressLedger<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            catalog: self.catalog.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: LedgerStore> ProgressLedger<S> {
    /// Loads existing history from the store and evaluates unlocks for it.
    pub fn load(store: S) -> anyhow::Result<Self> {
        let entries = store.load()?;
        let catalog = catalog();
        let totals = Totals::from_entries(&entries);
        let unlocked = catalog
            .iter()
            .filter(|a| a.criterion.met(&totals))
            .map(|a| a.id)
            .collect();
        Ok(Self {
            store,
            catalog,
            inner: Arc::new(Mutex::new(LedgerInner { entries, unlocked })),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        self.inner.lock().expect("ledger poisoned")
    }

    /// Appends one entry, persists, and returns achievements newly unlocked
    /// by it. The entry is kept in memory even when persistence fails.
    pub fn record(&self, entry: LedgerEntry) -> anyhow::Result<Vec<AchievementStatus>> {
        let mut inner = self.lock();
        inner.entries.push(entry);
        let newly = self.evaluate(&mut inner);
        let persist = self.store.persist(&inner.entries);
        drop(inner);
        persist?;
        Ok(newly)
    }

    /// Re-reads the store, picking up entries another handle wrote. Unlocks
    /// never regress: a shorter stored history is ignored.
    pub fn reload(&self) -> anyhow::Result<Vec<AchievementStatus>> {
        let stored = self.store.load()?;
        let mut inner = self.lock();
        if stored.len() > inner.entries.len() {
            inner.entries = stored;
        }
        Ok(self.evaluate(&mut inner))
    }

    fn evaluate(&self, inner: &mut LedgerInner) -> Vec<AchievementStatus> {
        let totals = Totals::from_entries(&inner.entries);
        let mut newly = Vec::new();
        for achievement in &self.catalog {
            if !inner.unlocked.contains(achievement.id)
                && achievement.criterion.met(&totals)
            {
                inner.unlocked.insert(achievement.id);
                newly.push(AchievementStatus {
                    id: achievement.id,
                    title: achievement.title,
                    description: achievement.description,
                    unlocked: true,
                });
            }
        }
        newly
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.lock().entries.clone()
    }

    pub fn totals(&self) -> Totals {
        Totals::from_entries(&self.lock().entries)
    }

    pub fn achievements(&self) -> Vec<AchievementStatus> {
        let inner = self.lock();
        self.catalog
            .iter()
            .map(|a| AchievementStatus {
                id: a.id,
                title: a.title,
                description: a.description,
                unlocked: inner.unlocked.contains(a.id),
            })
            .collect()
    }

    /// Length of the win streak the latest bets are currently on. An
    /// unresolved outcome counts as a break, same as a loss.
    pub fn current_streak(&self) -> u64 {
        let inner = self.lock();
        let mut streak = 0;
        for entry in inner.entries.iter().rev() {
            match entry.kind {
                EntryKind::Bet { won: Some(true) } => streak += 1,
                EntryKind::Bet { .. } => break,
                EntryKind::Swap => continue,
            }
        }
        streak
    }

    /// Quest checklist derived from live wallet state plus swap history.
    pub fn quest_steps(&self, connected: bool, flip_balance: U256) -> Vec<QuestStep> {
        let swapped = self.totals().swapped;
        let step = |title, done| QuestStep { title, done };
        vec![
            step("Connect your wallet", connected),
            step("Hold 10,000 FLIP", flip_balance >= tokens(10_000)),
            step("Swap 10,000 FLIP total", swapped >= tokens(10_000)),
            step("Swap 100,000 FLIP total", swapped >= tokens(100_000)),
            step("Swap 1,000,000 FLIP total", swapped >= tokens(1_000_000)),
        ]
    }

    /// Index of the first incomplete quest step, or `None` once all are done.
    pub fn current_quest_step(&self, connected: bool, flip_balance: U256) -> Option<usize> {
        self.quest_steps(connected, flip_balance)
            .iter()
            .position(|step| !step.done)
    }
}

/// Default cadence for [`LedgerPoller`].
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Background task that re-reads the ledger on a fixed cadence so unlocks
/// triggered by another handle (or process) surface without user action.
pub struct LedgerPoller {
    handle: tokio::task::JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl LedgerPoller {
    pub fn spawn<S>(ledger: ProgressLedger<S>, interval: Duration) -> Self
    where
        S: LedgerStore + Clone + Send + Sync + 'static,
    {
        let (shutdown, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => match ledger.reload() {
                        Ok(newly) => {
                            for unlock in newly {
                                info!(id = unlock.id, title = unlock.title, "achievement unlocked");
                            }
                        }
                        Err(error) => warn!(%error, "ledger reload failed"),
                    },
                    _ = rx.changed() => break,
                }
            }
        });
        Self { handle, shutdown }
    }

    /// Stops the poller and waits for the task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
