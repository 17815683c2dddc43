#![allow(non_snake_case)]
use flipquest::{
    FlipError,
    chain::methods,
    ledger::EntryKind,
    orchestrator::{
        BetResolution,
        Phase,
    },
    test_helpers::{
        TestContext,
        tokens,
    },
    types::CoinSide,
};

#[tokio::test]
async fn place_bet__happy_path_runs_every_phase() {
    // given
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(10_000));
    ctx.chain.rig_next_flip(true);

    // when
    let outcome = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await
        .unwrap();

    // then
    assert_eq!(outcome.resolution, BetResolution::Won);
    assert_eq!(
        ctx.orchestrator.last_phases(),
        vec![
            Phase::Validating,
            Phase::Approving,
            Phase::Submitting,
            Phase::AwaitingConfirmation,
            Phase::Settled,
        ],
    );
}

#[tokio::test]
async fn place_bet__won_bet_pays_out_and_is_recorded() {
    // given
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(2_000));
    ctx.chain.rig_next_flip(true);

    // when
    let outcome = ctx
        .orchestrator
        .place_bet(CoinSide::Tails, tokens(2_000))
        .await
        .unwrap();

    // then: stake doubled, no fee configured
    assert_eq!(ctx.flip_balance(), tokens(4_000));
    let entries = ctx.ledger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Bet { won: Some(true) });
    assert_eq!(entries[0].amount, tokens(2_000));
    assert_eq!(entries[0].tx_hash, outcome.tx_hash);
}

#[tokio::test]
async fn place_bet__settlement_refreshes_the_cached_balance() {
    // given
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(2_000));
    ctx.chain.rig_next_flip(true);

    // when
    ctx.orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await
        .unwrap();

    // then: the cache holds the post-payout balance, not the pre-bet one
    assert_eq!(
        ctx.orchestrator.facade().cached().flip_balance,
        Some(tokens(4_000)),
    );
}

#[tokio::test]
async fn place_bet__lost_bet_records_loss() {
    // given
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(2_000));
    ctx.chain.rig_next_flip(false);

    // when
    let outcome = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await
        .unwrap();

    // then
    assert_eq!(outcome.resolution, BetResolution::Lost);
    assert_eq!(ctx.flip_balance(), tokens(0));
    assert_eq!(
        ctx.ledger.entries()[0].kind,
        EntryKind::Bet { won: Some(false) },
    );
}

#[tokio::test]
async fn place_bet__below_minimum_short_circuits() {
    // given
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(10_000));

    // when
    let result = ctx.orchestrator.place_bet(CoinSide::Heads, tokens(1)).await;

    // then: nothing was sent, nothing recorded
    assert!(matches!(result, Err(FlipError::BelowMinimum { .. })));
    assert_eq!(
        ctx.orchestrator.last_phases(),
        vec![Phase::Validating, Phase::Failed],
    );
    assert!(ctx.ledger.entries().is_empty());
    assert_eq!(ctx.flip_balance(), tokens(10_000));
}

#[tokio::test]
async fn place_bet__insufficient_balance_short_circuits() {
    // given
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(1_500));

    // when
    let result = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await;

    // then
    assert!(matches!(
        result,
        Err(FlipError::InsufficientBalance { .. })
    ));
}

#[tokio::test]
async fn place_bet__not_connected_is_rejected_first() {
    // given: no balance either, but connection is checked before balance
    let ctx = TestContext::new();
    ctx.chain.disconnect();

    // when
    let result = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await;

    // then
    assert_eq!(result.unwrap_err(), FlipError::NotConnected);
}

#[tokio::test]
async fn place_bet__daily_limit_blocks_second_bet() {
    // given
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(10_000));
    ctx.chain.enable_daily_limit(0);
    ctx.chain
        .set_now_secs(flipquest::units::SECONDS_PER_DAY * 3);
    ctx.orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await
        .unwrap();

    // when
    let second = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await;

    // then
    assert_eq!(second.unwrap_err(), FlipError::DailyLimitReached);
}

#[tokio::test]
async fn place_bet__daily_limit_allows_first_ever_bet_on_day_zero() {
    // given: limit enabled, clock still at the epoch, account has never bet
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(10_000));
    ctx.chain.enable_daily_limit(0);

    // when
    let result = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await;

    // then
    assert!(result.is_ok());
}

#[tokio::test]
async fn place_bet__unobservable_outcome_settles_as_unknown() {
    // given: the stats read fails, so the outcome cannot be inferred
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(2_000));
    ctx.chain.fail_reads_for(methods::PLAYER_STATS);

    // when
    let outcome = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await
        .unwrap();

    // then: the bet still settled and was recorded without an outcome
    assert_eq!(outcome.resolution, BetResolution::Unknown);
    assert_eq!(ctx.ledger.entries()[0].kind, EntryKind::Bet { won: None });
    assert!(
        ctx.orchestrator
            .last_phases()
            .contains(&Phase::Settled)
    );
}

#[tokio::test]
async fn place_bet__rejected_approval_starts_cooldown() {
    // given
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(10_000));
    ctx.chain.fail_next_send(FlipError::UserRejected);

    // when
    let first = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await;
    let second = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await;

    // then: the immediate retry is throttled instead of re-prompting
    assert_eq!(first.unwrap_err(), FlipError::UserRejected);
    assert!(matches!(
        second.unwrap_err(),
        FlipError::ApprovalThrottled { .. },
    ));
    assert!(ctx.ledger.entries().is_empty());
}

#[tokio::test]
async fn place_bet__submit_failure_ends_in_failed_phase() {
    // given: approval succeeds, the bet itself reverts
    let ctx = TestContext::new();
    ctx.fund_flip(tokens(10_000));

    // when
    ctx.chain
        .fail_next_send(FlipError::NetworkError("boom".to_string()));
    let result = ctx
        .orchestrator
        .place_bet(CoinSide::Heads, tokens(2_000))
        .await;

    // then: the injected failure hits the approval send, trace ends Failed
    assert!(matches!(result, Err(FlipError::NetworkError(_))));
    assert_eq!(
        ctx.orchestrator.last_phases().last(),
        Some(&Phase::Failed),
    );
    assert!(ctx.ledger.entries().is_empty());
}
