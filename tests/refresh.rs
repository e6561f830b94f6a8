#![allow(non_snake_case)]
use alloy::primitives::U256;
use friendship_faucet::{
    FaucetError,
    sync::Field,
    test_helpers::{
        ONE_ETHER,
        TestContext,
    },
};

#[tokio::test]
async fn refresh__failed_read_keeps_prior_value_while_others_update() {
    let ctx = TestContext::new();
    // given
    let mut controller = ctx.connected(ctx.alice()).await;
    {
        let mut contract = ctx.chain().contract();
        contract.attempts.insert(ctx.alice(), 2);
        contract.balance = U256::from(4 * ONE_ETHER);
    }
    ctx.chain()
        .fail_read(Field::AttemptCount, FaucetError::Network("timed out".into()));

    // when
    let report = controller.refresh().await.unwrap();

    // then
    assert_eq!(
        report.failures,
        vec![(Field::AttemptCount, FaucetError::Network("timed out".into()))]
    );
    assert_eq!(controller.observed().attempt_count, 0);
    assert_eq!(
        controller.observed().contract_balance_wei,
        U256::from(4 * ONE_ETHER)
    );
    assert_eq!(controller.snapshot().stale_fields, vec![Field::AttemptCount]);
}

#[tokio::test]
async fn refresh__stale_marker_clears_once_read_succeeds() {
    let ctx = TestContext::new();
    // given
    let mut controller = ctx.connected(ctx.alice()).await;
    ctx.chain().contract().attempts.insert(ctx.alice(), 1);
    ctx.chain()
        .fail_read(Field::AttemptCount, FaucetError::Network("timed out".into()));
    controller.refresh().await.unwrap();

    // when
    ctx.chain().heal_reads();
    let report = controller.refresh().await.unwrap();

    // then
    assert!(report.is_complete());
    assert_eq!(controller.observed().attempt_count, 1);
    assert!(controller.snapshot().stale_fields.is_empty());
}

#[tokio::test]
async fn refresh__revert_during_read_is_reported_as_call_failure() {
    let ctx = TestContext::new();
    let mut controller = ctx.connected(ctx.alice()).await;
    ctx.chain().fail_read(
        Field::IsFriend,
        FaucetError::TransactionReverted("bad selector".into()),
    );

    let report = controller.refresh().await.unwrap();

    assert_eq!(
        report.failures,
        vec![(
            Field::IsFriend,
            FaucetError::ContractCallFailed("bad selector".into())
        )]
    );
}

#[tokio::test]
async fn refresh__flags_attempt_count_above_configured_maximum() {
    let ctx = TestContext::new();
    // given
    ctx.chain().contract().attempts.insert(ctx.alice(), 5);

    // when
    let controller = ctx.connected(ctx.alice()).await;

    // then
    let snapshot = controller.snapshot();
    assert!(snapshot.attempt_limit_exceeded);
    assert_eq!(snapshot.remaining_attempts, 0);
    assert!(
        controller
            .errors()
            .iter()
            .any(|e| e.contains("configured maximum is 3"))
    );
}

#[tokio::test]
async fn status_report__serializes_amounts_as_strings() {
    let ctx = TestContext::new();
    let controller = ctx.connected(ctx.alice()).await;

    let json = serde_json::to_value(controller.status_report()).unwrap();

    assert_eq!(json["contract_balance_eth"], "10");
    assert_eq!(json["reward_amount_wei"], ONE_ETHER.to_string());
    assert_eq!(json["remaining_attempts"], 3);
    assert_eq!(json["is_friend"], false);
}
