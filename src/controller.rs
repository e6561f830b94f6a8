use crate::{
    binding::{
        ContractHandle,
        INTERFACE,
        WriteCall,
    },
    chain::FaucetChain,
    config::FaucetConfig,
    error::{
        FaucetError,
        FaucetResult,
    },
    format::{
        format_ether,
        remaining_attempts,
    },
    submit::{
        self,
        Submitter,
        TransactionOutcome,
        TxProgress,
    },
    sync::{
        self,
        Field,
        ObservedState,
        SyncReport,
    },
    wallet::{
        Session,
        SigningIdentity,
    },
};
use alloy::primitives::Address;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{
    error,
    info,
    warn,
};

const MAX_ERRORS: usize = 50;

/// Owns the session, the observed contract state and the submission slot.
pub struct FaucetController<C> {
    config: FaucetConfig,
    session: Option<Session<C>>,
    handle: Option<ContractHandle>,
    observed: ObservedState,
    stale_fields: Vec<Field>,
    attempt_limit_exceeded: bool,
    onchain_owner: Option<Address>,
    submitter: Submitter,
    status: String,
    errors: Vec<String>,
    refresh_count: u64,
}

/// Everything the presentation layer renders.
#[derive(Clone, Debug)]
pub struct FaucetSnapshot {
    pub contract_address: Address,
    pub connected: Option<(Address, SigningIdentity)>,
    pub observed: ObservedState,
    pub max_attempts: u64,
    pub remaining_attempts: u64,
    pub attempt_limit_exceeded: bool,
    pub stale_fields: Vec<Field>,
    pub is_owner: Option<bool>,
    pub outcome: TransactionOutcome,
    pub status: String,
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    pub contract: String,
    pub account: Option<String>,
    pub is_friend: bool,
    pub has_received_reward: bool,
    pub attempt_count: u64,
    pub remaining_attempts: u64,
    pub reward_amount_wei: String,
    pub contract_balance_wei: String,
    pub contract_balance_eth: String,
    pub stale_fields: Vec<String>,
}

impl<C: FaucetChain> FaucetController<C> {
    pub fn new(config: FaucetConfig) -> Self {
        Self {
            config,
            session: None,
            handle: None,
            observed: ObservedState::default(),
            stale_fields: Vec::new(),
            attempt_limit_exceeded: false,
            onchain_owner: None,
            submitter: Submitter::default(),
            status: String::from("Not connected"),
            errors: Vec::new(),
            refresh_count: 0,
        }
    }

    pub fn config(&self) -> &FaucetConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session<C>> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn observed(&self) -> &ObservedState {
        &self.observed
    }

    pub fn outcome(&self) -> &TransactionOutcome {
        self.submitter.outcome()
    }

    pub fn is_in_flight(&self) -> bool {
        self.submitter.is_in_flight()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Number of refresh cycles run since construction.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Adopts the wallet's first account, binds the contract and reads its state.
    /// On failure no session is kept. Rejected while a transaction is in flight.
    pub async fn connect(&mut self, chain: C, keystore: Option<&str>) -> FaucetResult<()> {
        self.ensure_idle("reconnect")?;
        self.set_status("Connecting...");
        let session = match Session::establish(Arc::new(chain), keystore).await {
            Ok(session) => session,
            Err(err) => {
                self.connect_failed(&err);
                return Err(err);
            }
        };
        let handle = ContractHandle::bind(
            self.config.contract_address,
            INTERFACE,
            session.connected_address(),
        );
        info!(contract = %handle.address(), account = %handle.signer(), "contract bound");
        self.session = Some(session);
        self.handle = Some(handle);
        self.observed = ObservedState::default();
        self.submitter = Submitter::default();
        self.clear_errors();
        self.set_status("Connected");
        self.check_owner().await;
        self.refresh().await?;
        Ok(())
    }

    /// Records a connection attempt that failed before reaching the chain,
    /// such as a keystore that would not unlock.
    pub fn connect_failed(&mut self, err: &FaucetError) {
        if !self.is_in_flight() {
            self.clear_session();
        }
        self.push_error(format!("Failed to connect wallet: {err}"));
    }

    pub fn disconnect(&mut self) -> FaucetResult<()> {
        self.ensure_idle("disconnect")?;
        self.clear_session();
        Ok(())
    }

    fn ensure_idle(&mut self, action: &str) -> FaucetResult<()> {
        if self.is_in_flight() {
            warn!(action, "rejected while a transaction is in flight");
            self.push_error(format!("Cannot {action}: {}", FaucetError::SubmissionInFlight));
            return Err(FaucetError::SubmissionInFlight);
        }
        Ok(())
    }

    fn clear_session(&mut self) {
        self.session = None;
        self.handle = None;
        self.observed = ObservedState::default();
        self.stale_fields.clear();
        self.attempt_limit_exceeded = false;
        self.onchain_owner = None;
        self.submitter = Submitter::default();
        self.set_status("Not connected");
    }

    async fn check_owner(&mut self) {
        let Some((chain, handle)) = self.bound() else {
            return;
        };
        match chain.owner(&handle).await {
            Ok(owner) => {
                self.onchain_owner = Some(owner);
                if let Some(expected) = self.config.owner_address
                    && expected != owner
                {
                    warn!(%expected, actual = %owner, "configured owner does not match contract");
                    self.push_error(format!(
                        "Configured owner {expected} does not match on-chain owner {owner}"
                    ));
                }
            }
            Err(err) => warn!(error = %err, "could not read contract owner"),
        }
    }

    fn bound(&self) -> Option<(Arc<C>, ContractHandle)> {
        let session = self.session.as_ref()?;
        let handle = self.handle.clone()?;
        Some((Arc::clone(session.chain()), handle))
    }

    /// Re-reads the observed fields. Fields whose read failed keep their last value.
    pub async fn refresh(&mut self) -> FaucetResult<SyncReport> {
        let (chain, handle) = self.bound().ok_or(FaucetError::NotConnected)?;
        let report = sync::refresh(
            chain.as_ref(),
            &handle,
            handle.signer(),
            &self.observed,
            self.config.max_attempts,
        )
        .await;
        self.refresh_count += 1;
        self.observed = report.state.clone();
        self.attempt_limit_exceeded = report.attempt_limit_exceeded;
        self.stale_fields = report.failures.iter().map(|(field, _)| *field).collect();
        for (field, err) in &report.failures {
            self.push_error(format!("Could not read {}: {err}", field.label()));
        }
        if report.attempt_limit_exceeded {
            self.push_error(format!(
                "Contract reports {} attempts but the configured maximum is {}",
                report.state.attempt_count, self.config.max_attempts
            ));
        }
        Ok(report)
    }

    pub fn guess_call(&self, age: u64) -> WriteCall {
        WriteCall::GuessAge(age)
    }

    pub fn deposit_call(&self) -> WriteCall {
        WriteCall::Deposit(self.config.deposit_amount_wei)
    }

    pub fn withdraw_call(&self) -> WriteCall {
        WriteCall::Withdraw
    }

    /// Claims the submission slot for `call`.
    pub fn begin(&mut self, call: WriteCall) -> FaucetResult<()> {
        if self.session.is_none() {
            return Err(FaucetError::NotConnected);
        }
        self.submitter.try_begin(call)?;
        self.clear_errors();
        self.status = self.submitter.outcome().status_line();
        Ok(())
    }

    /// Applies one step of an in-flight submission; a confirmation triggers a refresh.
    pub async fn apply_progress(&mut self, progress: TxProgress) {
        if !self.submitter.apply(progress) {
            return;
        }
        self.status = self.submitter.outcome().status_line();
        match self.submitter.outcome().clone() {
            TransactionOutcome::Confirmed { .. } => {
                if let Err(err) = self.refresh().await {
                    self.push_error(format!("Refresh after confirmation failed: {err}"));
                }
            }
            TransactionOutcome::Failed { call, error } => {
                self.push_error(format!("Failed to {}: {error}", call.operation()));
            }
            _ => {}
        }
    }

    /// Starts a submission and hands back what a background task needs to drive it.
    pub fn spawn_parts(&mut self, call: WriteCall) -> FaucetResult<(Arc<C>, ContractHandle)> {
        let parts = self.bound().ok_or(FaucetError::NotConnected)?;
        self.begin(call)?;
        Ok(parts)
    }

    /// Submits `call` and waits for it to finish, reporting every outcome change.
    pub async fn submit(
        &mut self,
        call: WriteCall,
        mut observe: impl FnMut(&TransactionOutcome),
    ) -> FaucetResult<TransactionOutcome> {
        let (chain, handle) = self.spawn_parts(call)?;
        observe(self.submitter.outcome());

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let driver = async move {
            submit::drive(chain.as_ref(), &handle, call, |progress| {
                let _ = progress_tx.send(progress);
            })
            .await;
        };
        let consumer = async {
            while let Some(progress) = progress_rx.recv().await {
                self.apply_progress(progress).await;
                observe(self.submitter.outcome());
            }
        };
        tokio::join!(driver, consumer);
        Ok(self.submitter.outcome().clone())
    }

    pub fn snapshot(&self) -> FaucetSnapshot {
        let connected = self
            .session
            .as_ref()
            .map(|s| (s.connected_address(), s.identity().clone()));
        let is_owner = match (&self.session, self.onchain_owner) {
            (Some(session), Some(owner)) => Some(session.connected_address() == owner),
            _ => None,
        };
        FaucetSnapshot {
            contract_address: self.config.contract_address,
            connected,
            observed: self.observed.clone(),
            max_attempts: self.config.max_attempts,
            remaining_attempts: remaining_attempts(
                self.config.max_attempts,
                self.observed.attempt_count,
            ),
            attempt_limit_exceeded: self.attempt_limit_exceeded,
            stale_fields: self.stale_fields.clone(),
            is_owner,
            outcome: self.submitter.outcome().clone(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            contract: self.config.contract_address.to_string(),
            account: self
                .session
                .as_ref()
                .map(|s| s.connected_address().to_string()),
            is_friend: self.observed.is_friend,
            has_received_reward: self.observed.has_received_reward,
            attempt_count: self.observed.attempt_count,
            remaining_attempts: remaining_attempts(
                self.config.max_attempts,
                self.observed.attempt_count,
            ),
            reward_amount_wei: self.observed.reward_amount_wei.to_string(),
            contract_balance_wei: self.observed.contract_balance_wei.to_string(),
            contract_balance_eth: format_ether(self.observed.contract_balance_wei),
            stale_fields: self
                .stale_fields
                .iter()
                .map(|f| f.label().to_string())
                .collect(),
        }
    }
}
