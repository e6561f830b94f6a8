//! In-memory chain double for driving the controller without a node.

use crate::{
    binding::{
        ContractHandle,
        WriteCall,
    },
    chain::FaucetChain,
    config::{
        DEFAULT_CONTRACT_ADDRESS,
        DEFAULT_MAX_ATTEMPTS,
        DEPOSIT_AMOUNT_WEI,
        FaucetConfig,
    },
    controller::FaucetController,
    error::{
        FaucetError,
        FaucetResult,
    },
    sync::Field,
    wallet::WalletSource,
};
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};
use tokio::sync::Notify;

pub const SECRET_AGE: u64 = 30;
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

/// Contract storage as the mock sees it.
#[derive(Debug)]
pub struct ContractState {
    pub owner: Address,
    pub secret_age: u64,
    pub reward_amount: U256,
    pub balance: U256,
    pub max_attempts: u64,
    pub friends: HashSet<Address>,
    pub rewarded: HashSet<Address>,
    pub attempts: HashMap<Address, u64>,
}

#[derive(Debug, Default)]
struct Faults {
    reads: HashMap<Field, FaucetError>,
    accounts: Option<FaucetError>,
    send: Option<FaucetError>,
    confirm: Option<FaucetError>,
}

#[derive(Debug, Default)]
struct Ledger {
    next_tx: u64,
    pending: HashMap<TxHash, (Address, WriteCall)>,
    sent: Vec<(Address, WriteCall)>,
    reads: HashMap<Field, usize>,
}

/// Cheap to clone; clones share contract state, faults and the ledger.
#[derive(Clone, Debug)]
pub struct MockChain {
    contract: Arc<Mutex<ContractState>>,
    faults: Arc<Mutex<Faults>>,
    ledger: Arc<Mutex<Ledger>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
    accounts: Vec<Address>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockChain {
    pub fn new(owner: Address) -> Self {
        let contract = ContractState {
            owner,
            secret_age: SECRET_AGE,
            reward_amount: U256::from(ONE_ETHER),
            balance: U256::from(10 * ONE_ETHER),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            friends: HashSet::new(),
            rewarded: HashSet::new(),
            attempts: HashMap::new(),
        };
        Self {
            contract: Arc::new(Mutex::new(contract)),
            faults: Arc::new(Mutex::new(Faults::default())),
            ledger: Arc::new(Mutex::new(Ledger::default())),
            gate: Arc::new(Mutex::new(None)),
            accounts: Vec::new(),
        }
    }

    /// Same contract, seen through a wallet exposing `accounts`.
    pub fn with_accounts(&self, accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            ..self.clone()
        }
    }

    pub fn contract(&self) -> MutexGuard<'_, ContractState> {
        lock(&self.contract)
    }

    pub fn fail_read(&self, field: Field, err: FaucetError) {
        lock(&self.faults).reads.insert(field, err);
    }

    pub fn heal_reads(&self) {
        lock(&self.faults).reads.clear();
    }

    pub fn reject_accounts(&self, err: FaucetError) {
        lock(&self.faults).accounts = Some(err);
    }

    pub fn fail_send(&self, err: FaucetError) {
        lock(&self.faults).send = Some(err);
    }

    pub fn fail_confirm(&self, err: FaucetError) {
        lock(&self.faults).confirm = Some(err);
    }

    /// Confirmations block until the returned gate is notified.
    pub fn hold_confirmations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.gate) = Some(Arc::clone(&gate));
        gate
    }

    pub fn reads_of(&self, field: Field) -> usize {
        lock(&self.ledger).reads.get(&field).copied().unwrap_or(0)
    }

    pub fn sent(&self) -> Vec<(Address, WriteCall)> {
        lock(&self.ledger).sent.clone()
    }

    fn read<T>(&self, field: Field, value: impl FnOnce(&ContractState) -> T) -> FaucetResult<T> {
        *lock(&self.ledger).reads.entry(field).or_insert(0) += 1;
        if let Some(err) = lock(&self.faults).reads.get(&field) {
            return Err(err.clone());
        }
        let contract = lock(&self.contract);
        Ok(value(&*contract))
    }

    /// The checks the contract would revert on, evaluated at submission.
    fn preflight(&self, from: Address, call: WriteCall) -> FaucetResult<()> {
        let contract = lock(&self.contract);
        let revert = |reason: &str| Err(FaucetError::TransactionReverted(reason.into()));
        match call {
            WriteCall::GuessAge(_) => {
                if contract.rewarded.contains(&from) {
                    return revert("You have already received your reward");
                }
                if contract.attempts.get(&from).copied().unwrap_or(0) >= contract.max_attempts {
                    return revert("No attempts left");
                }
                if contract.balance < contract.reward_amount {
                    return revert("Faucet is empty");
                }
                Ok(())
            }
            WriteCall::Deposit(_) => Ok(()),
            WriteCall::Withdraw => {
                if from != contract.owner {
                    return revert("Only owner can withdraw");
                }
                Ok(())
            }
        }
    }

    fn finalize(&self, from: Address, call: WriteCall) {
        let mut contract = lock(&self.contract);
        match call {
            WriteCall::GuessAge(age) => {
                *contract.attempts.entry(from).or_insert(0) += 1;
                if age == contract.secret_age {
                    contract.friends.insert(from);
                    contract.rewarded.insert(from);
                    let reward = contract.reward_amount;
                    contract.balance -= reward;
                }
            }
            WriteCall::Deposit(amount) => contract.balance += amount,
            WriteCall::Withdraw => contract.balance = U256::ZERO,
        }
    }
}

impl FaucetChain for MockChain {
    async fn request_accounts(&self) -> FaucetResult<Vec<Address>> {
        if let Some(err) = lock(&self.faults).accounts.clone() {
            return Err(err);
        }
        Ok(self.accounts.clone())
    }

    async fn owner(&self, _handle: &ContractHandle) -> FaucetResult<Address> {
        Ok(lock(&self.contract).owner)
    }

    async fn reward_amount(&self, _handle: &ContractHandle) -> FaucetResult<U256> {
        self.read(Field::RewardAmount, |c| c.reward_amount)
    }

    async fn is_friend(
        &self,
        _handle: &ContractHandle,
        account: Address,
    ) -> FaucetResult<bool> {
        self.read(Field::IsFriend, |c| c.friends.contains(&account))
    }

    async fn has_received_reward(
        &self,
        _handle: &ContractHandle,
        account: Address,
    ) -> FaucetResult<bool> {
        self.read(Field::HasReceivedReward, |c| c.rewarded.contains(&account))
    }

    async fn attempt_count(
        &self,
        _handle: &ContractHandle,
        account: Address,
    ) -> FaucetResult<U256> {
        self.read(Field::AttemptCount, |c| {
            U256::from(c.attempts.get(&account).copied().unwrap_or(0))
        })
    }

    async fn balance(&self, _of: Address) -> FaucetResult<U256> {
        self.read(Field::ContractBalance, |c| c.balance)
    }

    async fn send(&self, handle: &ContractHandle, call: WriteCall) -> FaucetResult<TxHash> {
        if let Some(err) = lock(&self.faults).send.clone() {
            return Err(err);
        }
        let from = handle.signer();
        self.preflight(from, call)?;
        let mut ledger = lock(&self.ledger);
        ledger.next_tx += 1;
        let tx_hash = TxHash::left_padding_from(&ledger.next_tx.to_be_bytes());
        ledger.pending.insert(tx_hash, (from, call));
        ledger.sent.push((from, call));
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> FaucetResult<()> {
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = lock(&self.faults).confirm.clone() {
            return Err(err);
        }
        let entry = lock(&self.ledger).pending.remove(&tx_hash);
        let Some((from, call)) = entry else {
            return Err(FaucetError::Network(format!("unknown transaction {tx_hash}")));
        };
        self.finalize(from, call);
        Ok(())
    }
}

pub struct TestContext {
    owner: Address,
    alice: Address,
    chain: MockChain,
}

impl TestContext {
    pub fn new() -> Self {
        let owner = Address::repeat_byte(0x0a);
        let alice = Address::repeat_byte(0xa1);
        Self {
            owner,
            alice,
            chain: MockChain::new(owner),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn alice(&self) -> Address {
        self.alice
    }

    pub fn chain(&self) -> &MockChain {
        &self.chain
    }

    pub fn config(&self) -> FaucetConfig {
        FaucetConfig {
            rpc_url: "http://127.0.0.1:8545".parse().unwrap(),
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            owner_address: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            deposit_amount_wei: DEPOSIT_AMOUNT_WEI,
            wallet: WalletSource::NodeAccounts,
            confirm_timeout: None,
        }
    }

    /// A controller already connected as `account`.
    pub async fn connected(&self, account: Address) -> FaucetController<MockChain> {
        let mut controller = FaucetController::new(self.config());
        controller
            .connect(self.chain.with_accounts(vec![account]), None)
            .await
            .unwrap();
        controller
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
