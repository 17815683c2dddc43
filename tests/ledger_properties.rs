#![allow(non_snake_case)]
use alloy_primitives::{
    Address,
    B256,
    U256,
};
use chrono::Utc;
use flipquest::{
    ledger::{
        EntryKind,
        LedgerEntry,
        ProgressLedger,
    },
    ledger::store::InMemoryLedgerStore,
    units::pow10,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn tokens(amount: u64) -> U256 {
    U256::from(amount) * pow10(18)
}

prop_compose! {
    fn arb_entry()(
        is_bet in any::<bool>(),
        won in proptest::option::of(any::<bool>()),
        amount in 1u64..=20_000u64,
    ) -> LedgerEntry {
        LedgerEntry {
            timestamp: Utc::now(),
            kind: if is_bet { EntryKind::Bet { won } } else { EntryKind::Swap },
            amount: tokens(amount),
            tx_hash: B256::ZERO,
            counterparty: Address::ZERO,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn totals__always_match_a_manual_fold(entries in proptest::collection::vec(arb_entry(), 0..40)) {
        let ledger = ProgressLedger::load(InMemoryLedgerStore::new()).unwrap();
        let mut expected_bets = 0u64;
        let mut expected_swaps = 0u64;
        let mut expected_wagered = U256::ZERO;
        let mut expected_swapped = U256::ZERO;
        for entry in &entries {
            match entry.kind {
                EntryKind::Bet { .. } => {
                    expected_bets += 1;
                    expected_wagered += entry.amount;
                }
                EntryKind::Swap => {
                    expected_swaps += 1;
                    expected_swapped += entry.amount;
                }
            }
            ledger.record(entry.clone()).unwrap();
        }

        let totals = ledger.totals();
        prop_assert_eq!(totals.bets, expected_bets);
        prop_assert_eq!(totals.swaps, expected_swaps);
        prop_assert_eq!(totals.wagered, expected_wagered);
        prop_assert_eq!(totals.swapped, expected_swapped);
        prop_assert!(totals.wins + totals.losses <= totals.bets);
    }

    #[test]
    fn unlocks__are_monotonic_and_fire_once(entries in proptest::collection::vec(arb_entry(), 0..40)) {
        let ledger = ProgressLedger::load(InMemoryLedgerStore::new()).unwrap();
        let mut seen: HashSet<&'static str> = HashSet::new();
        let mut unlocked_so_far = 0usize;
        for entry in entries {
            let newly = ledger.record(entry).unwrap();
            for unlock in &newly {
                // an achievement never unlocks twice
                prop_assert!(seen.insert(unlock.id));
            }
            let now_unlocked = ledger
                .achievements()
                .iter()
                .filter(|a| a.unlocked)
                .count();
            // the unlocked set never shrinks
            prop_assert!(now_unlocked >= unlocked_so_far);
            unlocked_so_far = now_unlocked;
        }
    }

    #[test]
    fn reopening__preserves_totals_and_unlocks(entries in proptest::collection::vec(arb_entry(), 0..40)) {
        let store = InMemoryLedgerStore::new();
        let ledger = ProgressLedger::load(store.clone()).unwrap();
        for entry in entries {
            ledger.record(entry).unwrap();
        }
        let unlocked_before: Vec<_> = ledger
            .achievements()
            .into_iter()
            .filter(|a| a.unlocked)
            .map(|a| a.id)
            .collect();

        let reopened = ProgressLedger::load(store).unwrap();

        prop_assert_eq!(reopened.totals(), ledger.totals());
        let unlocked_after: Vec<_> = reopened
            .achievements()
            .into_iter()
            .filter(|a| a.unlocked)
            .map(|a| a.id)
            .collect();
        prop_assert_eq!(unlocked_after, unlocked_before);
    }
}
