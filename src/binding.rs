//! Fixed ABI and address binding for the FriendshipFaucet contract.

use alloy::{
    primitives::{
        Address,
        Bytes,
        U256,
    },
    sol,
    sol_types::SolCall,
};
use std::fmt;

sol! {
    #[sol(rpc)]
    contract FriendshipFaucet {
        function owner() external view returns (address);
        function REWARD_AMOUNT() external view returns (uint256);
        function MY_AGE() external view returns (uint256);
        function friendsList(address account) external view returns (bool);
        function hasReceivedReward(address account) external view returns (bool);
        function attempts(address account) external view returns (uint256);
        function guessMyAge(uint256 ageGuess) external;
        function deposit() external payable;
        function withdraw() external;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OperationKind {
    Read,
    Write,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    Owner,
    RewardAmount,
    MyAge,
    IsFriend,
    HasReceivedReward,
    AttemptCount,
    GuessAge,
    Deposit,
    Withdraw,
}

pub const INTERFACE: &[Operation] = &[
    Operation::Owner,
    Operation::RewardAmount,
    Operation::MyAge,
    Operation::IsFriend,
    Operation::HasReceivedReward,
    Operation::AttemptCount,
    Operation::GuessAge,
    Operation::Deposit,
    Operation::Withdraw,
];

impl Operation {
    pub fn kind(self) -> OperationKind {
        match self {
            Operation::GuessAge | Operation::Deposit | Operation::Withdraw => {
                OperationKind::Write
            }
            _ => OperationKind::Read,
        }
    }

    pub fn signature(self) -> &'static str {
        match self {
            Operation::Owner => FriendshipFaucet::ownerCall::SIGNATURE,
            Operation::RewardAmount => FriendshipFaucet::REWARD_AMOUNTCall::SIGNATURE,
            Operation::MyAge => FriendshipFaucet::MY_AGECall::SIGNATURE,
            Operation::IsFriend => FriendshipFaucet::friendsListCall::SIGNATURE,
            Operation::HasReceivedReward => {
                FriendshipFaucet::hasReceivedRewardCall::SIGNATURE
            }
            Operation::AttemptCount => FriendshipFaucet::attemptsCall::SIGNATURE,
            Operation::GuessAge => FriendshipFaucet::guessMyAgeCall::SIGNATURE,
            Operation::Deposit => FriendshipFaucet::depositCall::SIGNATURE,
            Operation::Withdraw => FriendshipFaucet::withdrawCall::SIGNATURE,
        }
    }

    pub fn selector(self) -> [u8; 4] {
        match self {
            Operation::Owner => FriendshipFaucet::ownerCall::SELECTOR,
            Operation::RewardAmount => FriendshipFaucet::REWARD_AMOUNTCall::SELECTOR,
            Operation::MyAge => FriendshipFaucet::MY_AGECall::SELECTOR,
            Operation::IsFriend => FriendshipFaucet::friendsListCall::SELECTOR,
            Operation::HasReceivedReward => {
                FriendshipFaucet::hasReceivedRewardCall::SELECTOR
            }
            Operation::AttemptCount => FriendshipFaucet::attemptsCall::SELECTOR,
            Operation::GuessAge => FriendshipFaucet::guessMyAgeCall::SELECTOR,
            Operation::Deposit => FriendshipFaucet::depositCall::SELECTOR,
            Operation::Withdraw => FriendshipFaucet::withdrawCall::SELECTOR,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Owner => "owner",
            Operation::RewardAmount => "reward amount",
            Operation::MyAge => "secret age",
            Operation::IsFriend => "friend status",
            Operation::HasReceivedReward => "reward status",
            Operation::AttemptCount => "attempt count",
            Operation::GuessAge => "guess",
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
        };
        write!(f, "{name}")
    }
}

/// A state-changing call with its arguments.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WriteCall {
    GuessAge(u64),
    Deposit(U256),
    Withdraw,
}

impl WriteCall {
    pub fn operation(&self) -> Operation {
        match self {
            WriteCall::GuessAge(_) => Operation::GuessAge,
            WriteCall::Deposit(_) => Operation::Deposit,
            WriteCall::Withdraw => Operation::Withdraw,
        }
    }

    pub fn calldata(&self) -> Bytes {
        match self {
            WriteCall::GuessAge(age) => FriendshipFaucet::guessMyAgeCall {
                ageGuess: U256::from(*age),
            }
            .abi_encode()
            .into(),
            WriteCall::Deposit(_) => FriendshipFaucet::depositCall {}.abi_encode().into(),
            WriteCall::Withdraw => FriendshipFaucet::withdrawCall {}.abi_encode().into(),
        }
    }

    /// Native value attached to the call.
    pub fn value(&self) -> U256 {
        match self {
            WriteCall::Deposit(amount) => *amount,
            _ => U256::ZERO,
        }
    }
}

/// The deployed contract as seen by one signer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContractHandle {
    address: Address,
    interface: &'static [Operation],
    signer: Address,
}

impl ContractHandle {
    pub fn bind(
        address: Address,
        interface: &'static [Operation],
        signer: Address,
    ) -> Self {
        Self {
            address,
            interface,
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.interface.contains(&operation)
    }
}
