#![allow(non_snake_case)]
use alloy::primitives::U256;
use friendship_faucet::{
    FaucetError,
    binding::WriteCall,
    config::DEPOSIT_AMOUNT_WEI,
    controller::FaucetController,
    submit::{
        self,
        TransactionOutcome,
        TxPhase,
    },
    sync::Field,
    test_helpers::{
        ONE_ETHER,
        SECRET_AGE,
        TestContext,
    },
};
use tokio::sync::mpsc;

#[tokio::test]
async fn guess__correct_age_confirms_and_refreshes_once() {
    let ctx = TestContext::new();
    // given
    let mut controller = ctx.connected(ctx.alice()).await;
    let refreshes = controller.refresh_count();
    let friend_reads = ctx.chain().reads_of(Field::IsFriend);
    let mut phases = Vec::new();

    // when
    let call = controller.guess_call(SECRET_AGE);
    let outcome = controller
        .submit(call, |outcome| phases.push(outcome.phase()))
        .await
        .unwrap();

    // then
    assert_eq!(
        phases,
        vec![
            TxPhase::Submitting,
            TxPhase::PendingConfirmation,
            TxPhase::Confirmed
        ]
    );
    assert_eq!(outcome.phase(), TxPhase::Confirmed);
    assert_eq!(controller.refresh_count(), refreshes + 1);
    assert_eq!(ctx.chain().reads_of(Field::IsFriend), friend_reads + 1);
    let observed = controller.observed();
    assert!(observed.is_friend);
    assert!(observed.has_received_reward);
    assert_eq!(observed.attempt_count, 1);
    assert_eq!(observed.contract_balance_wei, U256::from(9 * ONE_ETHER));
    assert_eq!(
        controller.status(),
        "Success! You've received your reward and are now a friend!"
    );
}

#[tokio::test]
async fn guess__wrong_age_spends_an_attempt() {
    let ctx = TestContext::new();
    let mut controller = ctx.connected(ctx.alice()).await;

    let call = controller.guess_call(SECRET_AGE + 1);
    controller.submit(call, |_| {}).await.unwrap();

    let snapshot = controller.snapshot();
    assert!(!snapshot.observed.is_friend);
    assert_eq!(snapshot.observed.attempt_count, 1);
    assert_eq!(snapshot.remaining_attempts, 2);
}

#[tokio::test]
async fn guess__after_reward_fails_with_contract_reason() {
    let ctx = TestContext::new();
    // given
    let mut controller = ctx.connected(ctx.alice()).await;
    let call = controller.guess_call(SECRET_AGE);
    controller.submit(call, |_| {}).await.unwrap();

    // when
    let outcome = controller.submit(call, |_| {}).await.unwrap();

    // then
    assert_eq!(
        outcome.failure_reason().as_deref(),
        Some("You have already received your reward")
    );
    assert!(!controller.is_in_flight());
}

#[tokio::test]
async fn guess__out_of_attempts_fails_with_contract_reason() {
    let ctx = TestContext::new();
    ctx.chain().contract().attempts.insert(ctx.alice(), 3);
    let mut controller = ctx.connected(ctx.alice()).await;

    let call = controller.guess_call(SECRET_AGE);
    let outcome = controller.submit(call, |_| {}).await.unwrap();

    assert_eq!(outcome.failure_reason().as_deref(), Some("No attempts left"));
    assert_eq!(controller.snapshot().remaining_attempts, 0);
}

#[tokio::test]
async fn withdraw__non_owner_fails_verbatim_and_state_is_unchanged() {
    let ctx = TestContext::new();
    // given
    let mut controller = ctx.connected(ctx.alice()).await;
    let before = controller.observed().clone();
    let refreshes = controller.refresh_count();

    // when
    let call = controller.withdraw_call();
    let outcome = controller.submit(call, |_| {}).await.unwrap();

    // then
    assert_eq!(
        outcome,
        TransactionOutcome::Failed {
            call: WriteCall::Withdraw,
            error: FaucetError::TransactionReverted("Only owner can withdraw".into()),
        }
    );
    assert_eq!(
        outcome.failure_reason().as_deref(),
        Some("Only owner can withdraw")
    );
    assert_eq!(controller.observed(), &before);
    assert_eq!(controller.refresh_count(), refreshes);
    assert!(ctx.chain().sent().is_empty());
}

#[tokio::test]
async fn withdraw__owner_empties_the_faucet() {
    let ctx = TestContext::new();
    let mut controller = ctx.connected(ctx.owner()).await;

    let call = controller.withdraw_call();
    let outcome = controller.submit(call, |_| {}).await.unwrap();

    assert_eq!(outcome.phase(), TxPhase::Confirmed);
    assert_eq!(controller.observed().contract_balance_wei, U256::ZERO);
    assert_eq!(controller.status(), "Withdraw successful!");
}

#[tokio::test]
async fn deposit__adds_fixed_amount_to_balance() {
    let ctx = TestContext::new();
    let mut controller = ctx.connected(ctx.alice()).await;

    let call = controller.deposit_call();
    controller.submit(call, |_| {}).await.unwrap();

    assert_eq!(call, WriteCall::Deposit(DEPOSIT_AMOUNT_WEI));
    assert_eq!(
        controller.observed().contract_balance_wei,
        U256::from(10 * ONE_ETHER) + DEPOSIT_AMOUNT_WEI
    );
    assert_eq!(ctx.chain().sent(), vec![(ctx.alice(), call)]);
}

#[tokio::test]
async fn submit__second_write_while_pending_is_rejected() {
    let ctx = TestContext::new();
    // given
    let mut controller = ctx.connected(ctx.alice()).await;
    let gate = ctx.chain().hold_confirmations();
    let call = controller.guess_call(SECRET_AGE);
    let (chain, handle) = controller.spawn_parts(call).unwrap();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(async move {
        submit::drive(chain.as_ref(), &handle, call, |progress| {
            let _ = progress_tx.send(progress);
        })
        .await;
    });
    let pending = progress_rx.recv().await.unwrap();
    controller.apply_progress(pending).await;
    assert_eq!(controller.outcome().phase(), TxPhase::PendingConfirmation);
    let before = controller.outcome().clone();

    // when
    let deposit = controller.deposit_call();
    let result = controller.begin(deposit);

    // then
    assert_eq!(result, Err(FaucetError::SubmissionInFlight));
    assert_eq!(controller.outcome(), &before);

    gate.notify_one();
    let confirmed = progress_rx.recv().await.unwrap();
    controller.apply_progress(confirmed).await;
    driver.await.unwrap();
    assert_eq!(controller.outcome().phase(), TxPhase::Confirmed);
    assert_eq!(ctx.chain().sent(), vec![(ctx.alice(), call)]);
}

#[tokio::test]
async fn submit__wallet_rejection_fails_and_frees_the_slot() {
    let ctx = TestContext::new();
    // given
    let mut controller = ctx.connected(ctx.alice()).await;
    ctx.chain().fail_send(FaucetError::UserRejected);

    // when
    let call = controller.deposit_call();
    let outcome = controller.submit(call, |_| {}).await.unwrap();

    // then
    assert_eq!(outcome.phase(), TxPhase::Failed);
    assert_eq!(
        outcome.failure_reason().as_deref(),
        Some("Request rejected in wallet")
    );
    assert!(!controller.is_in_flight());
    assert!(controller.begin(call).is_ok());
}

#[tokio::test]
async fn submit__failed_confirmation_skips_refresh() {
    let ctx = TestContext::new();
    let mut controller = ctx.connected(ctx.alice()).await;
    let refreshes = controller.refresh_count();
    ctx.chain()
        .fail_confirm(FaucetError::Network("no receipt".into()));

    let call = controller.deposit_call();
    let outcome = controller.submit(call, |_| {}).await.unwrap();

    assert_eq!(outcome.phase(), TxPhase::Failed);
    assert_eq!(controller.refresh_count(), refreshes);
    assert!(
        controller
            .errors()
            .iter()
            .any(|e| e.contains("Network error: no receipt"))
    );
}

#[tokio::test]
async fn submit__requires_a_session() {
    let ctx = TestContext::new();
    let mut controller = FaucetController::<friendship_faucet::test_helpers::MockChain>::new(
        ctx.config(),
    );

    let result = controller.submit(WriteCall::Withdraw, |_| {}).await;

    assert_eq!(result, Err(FaucetError::NotConnected));
    assert_eq!(controller.outcome(), &TransactionOutcome::Idle);
}
