use crate::wallet::{
    WalletSource,
    resolve_keystore_dir,
};
use alloy::primitives::{
    Address,
    U256,
    address,
};
use clap::{
    Parser,
    Subcommand,
};
use std::{
    path::PathBuf,
    time::Duration,
};
use url::Url;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_CONTRACT_ADDRESS: Address =
    address!("0xECE91dE3036544FA603b5cDEA07d7B655c717Fed");
/// Mirrors the contract's attempt limit; the contract never exposes it.
pub const DEFAULT_MAX_ATTEMPTS: u64 = 3;
/// 0.001 ether.
pub const DEPOSIT_AMOUNT_WEI: U256 = U256::from_limbs([1_000_000_000_000_000, 0, 0, 0]);
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug, Parser)]
#[command(
    name = "friendship-faucet",
    version,
    about = "Guess the age, become a friend, collect the reward"
)]
pub struct Cli {
    /// JSON-RPC endpoint of the node
    #[arg(long, env = "FAUCET_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: Url,
    /// Address of the deployed FriendshipFaucet contract
    #[arg(long = "contract", env = "FAUCET_CONTRACT_ADDRESS")]
    pub contract_address: Option<Address>,
    /// Expected contract owner; a mismatch with the chain is reported
    #[arg(long = "owner", env = "FAUCET_OWNER_ADDRESS")]
    pub owner_address: Option<Address>,
    /// Attempts the contract allows per account
    #[arg(long, env = "FAUCET_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u64,
    /// Directory holding encrypted keystores (defaults to ~/.foundry/keystores)
    #[arg(long, env = "FAUCET_KEYSTORE_DIR")]
    pub keystore_dir: Option<String>,
    /// Keystore name to unlock (defaults to the first one found)
    #[arg(long, env = "FAUCET_WALLET")]
    pub wallet: Option<String>,
    /// Sign with the node's unlocked accounts instead of a keystore
    #[arg(long, conflicts_with_all = ["keystore_dir", "wallet"])]
    pub node_accounts: bool,
    /// Give up waiting for a receipt after this many seconds
    #[arg(long, env = "FAUCET_CONFIRM_TIMEOUT_SECS")]
    pub confirm_timeout_secs: Option<u64>,
    #[arg(long, env = "FAUCET_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Clone, Debug, Eq, PartialEq, Subcommand)]
pub enum Command {
    /// Interactive terminal UI (default)
    Tui,
    /// Connect, read the contract state and print it
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Submit an age guess
    Guess { age: u64 },
    /// Deposit 0.001 ether into the faucet
    Deposit,
    /// Withdraw the faucet balance (owner only)
    Withdraw,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FaucetConfig {
    pub rpc_url: Url,
    pub contract_address: Address,
    pub owner_address: Option<Address>,
    pub max_attempts: u64,
    pub deposit_amount_wei: U256,
    pub wallet: WalletSource,
    pub confirm_timeout: Option<Duration>,
}

impl FaucetConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let wallet = if cli.node_accounts {
            WalletSource::NodeAccounts
        } else {
            WalletSource::Keystore {
                dir: resolve_keystore_dir(cli.keystore_dir.as_deref()),
                name: cli.wallet.clone(),
            }
        };
        Self {
            rpc_url: cli.rpc_url.clone(),
            contract_address: cli.contract_address.unwrap_or(DEFAULT_CONTRACT_ADDRESS),
            owner_address: cli.owner_address,
            max_attempts: cli.max_attempts,
            deposit_amount_wei: DEPOSIT_AMOUNT_WEI,
            wallet,
            confirm_timeout: cli.confirm_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn deposit_amount__is_one_thousandth_of_an_ether() {
        assert_eq!(
            crate::format::format_ether(DEPOSIT_AMOUNT_WEI),
            "0.001"
        );
    }

    #[test]
    fn from_cli__node_accounts_flag_selects_node_wallet() {
        // given
        let cli = Cli::try_parse_from([
            "friendship-faucet",
            "--node-accounts",
            "--rpc-url",
            "http://localhost:9999",
            "--contract",
            "0x0000000000000000000000000000000000000001",
            "status",
        ])
        .unwrap();

        // when
        let config = FaucetConfig::from_cli(&cli);

        // then
        assert_eq!(config.wallet, WalletSource::NodeAccounts);
        assert_eq!(config.contract_address, Address::with_last_byte(1));
        assert_eq!(config.rpc_url.as_str(), "http://localhost:9999/");
        assert_eq!(cli.command, Some(Command::Status { json: false }));
    }

    #[test]
    fn from_cli__keystore_dir_is_used_verbatim() {
        // given
        let cli = Cli::try_parse_from([
            "friendship-faucet",
            "--keystore-dir",
            "/tmp/keys",
            "--wallet",
            "alice",
            "--confirm-timeout-secs",
            "30",
            "guess",
            "27",
        ])
        .unwrap();

        // when
        let config = FaucetConfig::from_cli(&cli);

        // then
        assert_eq!(
            config.wallet,
            WalletSource::Keystore {
                dir: PathBuf::from("/tmp/keys"),
                name: Some("alice".into()),
            }
        );
        assert_eq!(config.confirm_timeout, Some(Duration::from_secs(30)));
        assert_eq!(cli.command, Some(Command::Guess { age: 27 }));
    }

    #[test]
    fn cli__node_accounts_conflicts_with_wallet_name() {
        let parsed = Cli::try_parse_from([
            "friendship-faucet",
            "--node-accounts",
            "--wallet",
            "alice",
        ]);
        assert!(parsed.is_err());
    }
}
