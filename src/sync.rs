use crate::{
    binding::ContractHandle,
    chain::FaucetChain,
    error::{
        FaucetError,
        FaucetResult,
    },
};
use alloy::primitives::{
    Address,
    U256,
};
use tracing::{
    debug,
    warn,
};

/// Contract state as last read for the connected account.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ObservedState {
    pub is_friend: bool,
    pub has_received_reward: bool,
    pub attempt_count: u64,
    pub reward_amount_wei: U256,
    pub contract_balance_wei: U256,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Field {
    IsFriend,
    HasReceivedReward,
    AttemptCount,
    RewardAmount,
    ContractBalance,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyncReport {
    pub state: ObservedState,
    pub failures: Vec<(Field, FaucetError)>,
    /// Set when the contract reports more attempts than the configured maximum.
    pub attempt_limit_exceeded: bool,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reads every observed field. A field whose read fails keeps its value from `prior`.
pub async fn refresh<C: FaucetChain>(
    chain: &C,
    handle: &ContractHandle,
    account: Address,
    prior: &ObservedState,
    max_attempts: u64,
) -> SyncReport {
    let (is_friend, has_received_reward, attempt_count, reward_amount, balance) = tokio::join!(
        chain.is_friend(handle, account),
        chain.has_received_reward(handle, account),
        chain.attempt_count(handle, account),
        chain.reward_amount(handle),
        chain.balance(handle.address()),
    );
    let attempt_count = attempt_count.and_then(|count| {
        u64::try_from(count).map_err(|_| {
            FaucetError::ContractCallFailed(format!("attempt count {count} out of range"))
        })
    });

    let mut failures = Vec::new();
    let state = ObservedState {
        is_friend: keep_or_update(
            Field::IsFriend,
            is_friend,
            prior.is_friend,
            &mut failures,
        ),
        has_received_reward: keep_or_update(
            Field::HasReceivedReward,
            has_received_reward,
            prior.has_received_reward,
            &mut failures,
        ),
        attempt_count: keep_or_update(
            Field::AttemptCount,
            attempt_count,
            prior.attempt_count,
            &mut failures,
        ),
        reward_amount_wei: keep_or_update(
            Field::RewardAmount,
            reward_amount,
            prior.reward_amount_wei,
            &mut failures,
        ),
        contract_balance_wei: keep_or_update(
            Field::ContractBalance,
            balance,
            prior.contract_balance_wei,
            &mut failures,
        ),
    };

    let attempt_limit_exceeded = state.attempt_count > max_attempts;
    if attempt_limit_exceeded {
        warn!(
            attempt_count = state.attempt_count,
            max_attempts, "contract reports more attempts than the configured maximum"
        );
    }
    debug!(?state, failed = failures.len(), "refresh finished");

    SyncReport {
        state,
        failures,
        attempt_limit_exceeded,
    }
}

fn keep_or_update<T>(
    field: Field,
    read: FaucetResult<T>,
    prior: T,
    failures: &mut Vec<(Field, FaucetError)>,
) -> T {
    match read {
        Ok(value) => value,
        Err(err) => {
            let err = err.into_read_failure();
            warn!(?field, error = %err, "read failed; keeping last known value");
            failures.push((field, err));
            prior
        }
    }
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::IsFriend => "friend status",
            Field::HasReceivedReward => "reward status",
            Field::AttemptCount => "attempt count",
            Field::RewardAmount => "reward amount",
            Field::ContractBalance => "contract balance",
        }
    }
}
