use alloy::{
    rpc::json_rpc::ErrorPayload,
    sol_types::{
        Revert,
        SolError,
    },
    transports::{
        RpcError,
        TransportErrorKind,
    },
};

pub type FaucetResult<T> = Result<T, FaucetError>;

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FaucetError {
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),
    #[error("Wallet locked: {0}")]
    WalletLocked(String),
    #[error("Request rejected in wallet")]
    UserRejected,
    #[error("Contract call failed: {0}")]
    ContractCallFailed(String),
    #[error("{0}")]
    TransactionReverted(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("A transaction is already pending")]
    SubmissionInFlight,
    #[error("Wallet not connected")]
    NotConnected,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FaucetError {
    /// Reads never revert a transaction; a revert on a read is a failed call.
    pub fn into_read_failure(self) -> Self {
        match self {
            FaucetError::TransactionReverted(reason) => {
                FaucetError::ContractCallFailed(reason)
            }
            other => other,
        }
    }
}

impl From<RpcError<TransportErrorKind>> for FaucetError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match err {
            RpcError::ErrorResp(payload) => classify_payload(&payload),
            RpcError::Transport(kind) => FaucetError::Network(kind.to_string()),
            RpcError::NullResp => {
                FaucetError::Network(String::from("node returned an empty response"))
            }
            other => FaucetError::ContractCallFailed(other.to_string()),
        }
    }
}

impl From<alloy::contract::Error> for FaucetError {
    fn from(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(rpc) => rpc.into(),
            other => FaucetError::ContractCallFailed(other.to_string()),
        }
    }
}

fn classify_payload(payload: &ErrorPayload) -> FaucetError {
    let message = payload.message.to_string();
    let lowered = message.to_ascii_lowercase();
    if payload.code == USER_REJECTED_CODE
        || lowered.contains("user rejected")
        || lowered.contains("user denied")
    {
        return FaucetError::UserRejected;
    }
    if let Some(data) = payload.as_revert_data()
        && let Ok(revert) = Revert::abi_decode(&data)
    {
        return FaucetError::TransactionReverted(revert.reason);
    }
    if lowered.starts_with("execution reverted") {
        return FaucetError::TransactionReverted(strip_revert_prefix(&message));
    }
    FaucetError::ContractCallFailed(message)
}

pub(crate) fn strip_revert_prefix(message: &str) -> String {
    let rest = message
        .get("execution reverted".len()..)
        .unwrap_or_default()
        .trim_start_matches(':')
        .trim();
    if rest.is_empty() {
        String::from("execution reverted")
    } else {
        rest.to_string()
    }
}
