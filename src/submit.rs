use crate::{
    binding::{
        ContractHandle,
        WriteCall,
    },
    chain::FaucetChain,
    error::{
        FaucetError,
        FaucetResult,
    },
};
use alloy::primitives::TxHash;
use tracing::{
    error,
    info,
    warn,
};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum TransactionOutcome {
    #[default]
    Idle,
    Submitting {
        call: WriteCall,
    },
    PendingConfirmation {
        call: WriteCall,
        tx_hash: TxHash,
    },
    Confirmed {
        call: WriteCall,
        tx_hash: TxHash,
    },
    Failed {
        call: WriteCall,
        error: FaucetError,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TxPhase {
    Idle,
    Submitting,
    PendingConfirmation,
    Confirmed,
    Failed,
}

impl TransactionOutcome {
    pub fn phase(&self) -> TxPhase {
        match self {
            TransactionOutcome::Idle => TxPhase::Idle,
            TransactionOutcome::Submitting { .. } => TxPhase::Submitting,
            TransactionOutcome::PendingConfirmation { .. } => TxPhase::PendingConfirmation,
            TransactionOutcome::Confirmed { .. } => TxPhase::Confirmed,
            TransactionOutcome::Failed { .. } => TxPhase::Failed,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TransactionOutcome::Submitting { .. }
                | TransactionOutcome::PendingConfirmation { .. }
        )
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TransactionOutcome::PendingConfirmation { tx_hash, .. }
            | TransactionOutcome::Confirmed { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Human-readable failure reason; contract reverts come through verbatim.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            TransactionOutcome::Failed { error, .. } => Some(error.to_string()),
            _ => None,
        }
    }

    pub fn status_line(&self) -> String {
        match self {
            TransactionOutcome::Idle => String::new(),
            TransactionOutcome::Submitting { call } => match call {
                WriteCall::GuessAge(_) => "Submitting your guess...".into(),
                WriteCall::Deposit(_) => "Depositing funds...".into(),
                WriteCall::Withdraw => "Withdrawing funds...".into(),
            },
            TransactionOutcome::PendingConfirmation { call, .. } => match call {
                WriteCall::GuessAge(_) => {
                    "Transaction submitted! Waiting for confirmation...".into()
                }
                WriteCall::Deposit(_) => {
                    "Deposit transaction submitted! Waiting for confirmation...".into()
                }
                WriteCall::Withdraw => {
                    "Withdraw transaction submitted! Waiting for confirmation...".into()
                }
            },
            TransactionOutcome::Confirmed { call, .. } => match call {
                WriteCall::GuessAge(_) => {
                    "Success! You've received your reward and are now a friend!".into()
                }
                WriteCall::Deposit(_) => "Deposit successful!".into(),
                WriteCall::Withdraw => "Withdraw successful!".into(),
            },
            TransactionOutcome::Failed { call, error } => {
                format!("{} failed: {}", call.operation(), error)
            }
        }
    }
}

/// Progress reported while a submission is driven to completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxProgress {
    Pending(TxHash),
    Confirmed,
    Failed(FaucetError),
}

/// Single-slot submission state machine.
#[derive(Clone, Debug, Default)]
pub struct Submitter {
    outcome: TransactionOutcome,
}

impl Submitter {
    pub fn outcome(&self) -> &TransactionOutcome {
        &self.outcome
    }

    pub fn is_in_flight(&self) -> bool {
        self.outcome.is_in_flight()
    }

    /// Idle (or finished) -> Submitting. Rejected while another call is in flight.
    pub fn try_begin(&mut self, call: WriteCall) -> FaucetResult<()> {
        if self.outcome.is_in_flight() {
            warn!(
                rejected = %call.operation(),
                "submission rejected; another transaction is in flight"
            );
            return Err(FaucetError::SubmissionInFlight);
        }
        info!(operation = %call.operation(), "submitting transaction");
        self.outcome = TransactionOutcome::Submitting { call };
        Ok(())
    }

    /// Applies one progress step. Returns false if the step does not fit the current phase.
    pub fn apply(&mut self, progress: TxProgress) -> bool {
        let next = match (&self.outcome, progress) {
            (TransactionOutcome::Submitting { call }, TxProgress::Pending(tx_hash)) => {
                info!(%tx_hash, operation = %call.operation(), "awaiting confirmation");
                TransactionOutcome::PendingConfirmation {
                    call: *call,
                    tx_hash,
                }
            }
            (
                TransactionOutcome::PendingConfirmation { call, tx_hash },
                TxProgress::Confirmed,
            ) => {
                info!(%tx_hash, operation = %call.operation(), "transaction confirmed");
                TransactionOutcome::Confirmed {
                    call: *call,
                    tx_hash: *tx_hash,
                }
            }
            (
                TransactionOutcome::Submitting { call }
                | TransactionOutcome::PendingConfirmation { call, .. },
                TxProgress::Failed(err),
            ) => {
                error!(operation = %call.operation(), error = %err, "transaction failed");
                TransactionOutcome::Failed {
                    call: *call,
                    error: err,
                }
            }
            (current, progress) => {
                warn!(phase = ?current.phase(), ?progress, "ignoring out-of-order progress");
                return false;
            }
        };
        self.outcome = next;
        true
    }
}

/// Sends `call` and waits for its receipt, reporting each step through `emit`.
pub async fn drive<C: FaucetChain>(
    chain: &C,
    handle: &ContractHandle,
    call: WriteCall,
    mut emit: impl FnMut(TxProgress),
) {
    let tx_hash = match chain.send(handle, call).await {
        Ok(tx_hash) => tx_hash,
        Err(err) => {
            emit(TxProgress::Failed(err));
            return;
        }
    };
    emit(TxProgress::Pending(tx_hash));
    match chain.confirm(tx_hash).await {
        Ok(()) => emit(TxProgress::Confirmed),
        Err(err) => emit(TxProgress::Failed(err)),
    }
}
