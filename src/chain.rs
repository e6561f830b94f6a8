//! The wallet/provider boundary.

use crate::{
    binding::{
        ContractHandle,
        FriendshipFaucet,
        WriteCall,
    },
    error::{
        FaucetError,
        FaucetResult,
    },
};
use alloy::{
    network::{
        EthereumWallet,
        TransactionBuilder,
    },
    primitives::{
        Address,
        TxHash,
        U256,
    },
    providers::{
        DynProvider,
        Provider,
        ProviderBuilder,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use std::{
    future::Future,
    time::Duration,
};
use tokio::time;
use tracing::{
    debug,
    info,
};
use url::Url;

pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Everything the client needs from a wallet-backed node.
pub trait FaucetChain: Send + Sync + 'static {
    /// Accounts the wallet exposes to this client, in wallet order.
    fn request_accounts(&self) -> impl Future<Output = FaucetResult<Vec<Address>>> + Send;

    fn owner(
        &self,
        handle: &ContractHandle,
    ) -> impl Future<Output = FaucetResult<Address>> + Send;

    fn reward_amount(
        &self,
        handle: &ContractHandle,
    ) -> impl Future<Output = FaucetResult<U256>> + Send;

    fn is_friend(
        &self,
        handle: &ContractHandle,
        account: Address,
    ) -> impl Future<Output = FaucetResult<bool>> + Send;

    fn has_received_reward(
        &self,
        handle: &ContractHandle,
        account: Address,
    ) -> impl Future<Output = FaucetResult<bool>> + Send;

    fn attempt_count(
        &self,
        handle: &ContractHandle,
        account: Address,
    ) -> impl Future<Output = FaucetResult<U256>> + Send;

    fn balance(&self, of: Address) -> impl Future<Output = FaucetResult<U256>> + Send;

    /// Returns once the node has accepted the transaction.
    fn send(
        &self,
        handle: &ContractHandle,
        call: WriteCall,
    ) -> impl Future<Output = FaucetResult<TxHash>> + Send;

    /// Returns once the transaction is finalized with a successful receipt.
    fn confirm(&self, tx_hash: TxHash) -> impl Future<Output = FaucetResult<()>> + Send;
}

/// JSON-RPC implementation backed by alloy.
#[derive(Clone)]
pub struct RpcChain {
    provider: DynProvider,
    local_signer: Option<Address>,
    confirm_timeout: Option<Duration>,
}

impl RpcChain {
    /// Transactions are signed locally with `signer`, or by the node when absent.
    pub fn connect(
        url: Url,
        signer: Option<PrivateKeySigner>,
        confirm_timeout: Option<Duration>,
    ) -> Self {
        let (provider, local_signer) = match signer {
            Some(signer) => {
                let address = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url)
                    .erased();
                (provider, Some(address))
            }
            None => (ProviderBuilder::new().connect_http(url).erased(), None),
        };
        Self {
            provider,
            local_signer,
            confirm_timeout,
        }
    }

    fn instance(
        &self,
        handle: &ContractHandle,
    ) -> FriendshipFaucet::FriendshipFaucetInstance<DynProvider> {
        FriendshipFaucet::new(handle.address(), self.provider.clone())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> FaucetResult<()> {
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await? {
                Some(receipt) => {
                    debug!(%tx_hash, status = receipt.status(), "receipt found");
                    return receipt_outcome(receipt.status());
                }
                None => time::sleep(RECEIPT_POLL_INTERVAL).await,
            }
        }
    }
}

impl FaucetChain for RpcChain {
    async fn request_accounts(&self) -> FaucetResult<Vec<Address>> {
        if let Some(address) = self.local_signer {
            return Ok(vec![address]);
        }
        let accounts = self.provider.get_accounts().await?;
        Ok(accounts)
    }

    async fn owner(&self, handle: &ContractHandle) -> FaucetResult<Address> {
        let owner = self.instance(handle).owner().call().await?;
        Ok(owner)
    }

    async fn reward_amount(&self, handle: &ContractHandle) -> FaucetResult<U256> {
        let amount = self.instance(handle).REWARD_AMOUNT().call().await?;
        Ok(amount)
    }

    async fn is_friend(
        &self,
        handle: &ContractHandle,
        account: Address,
    ) -> FaucetResult<bool> {
        let flag = self.instance(handle).friendsList(account).call().await?;
        Ok(flag)
    }

    async fn has_received_reward(
        &self,
        handle: &ContractHandle,
        account: Address,
    ) -> FaucetResult<bool> {
        let flag = self
            .instance(handle)
            .hasReceivedReward(account)
            .call()
            .await?;
        Ok(flag)
    }

    async fn attempt_count(
        &self,
        handle: &ContractHandle,
        account: Address,
    ) -> FaucetResult<U256> {
        let count = self.instance(handle).attempts(account).call().await?;
        Ok(count)
    }

    async fn balance(&self, of: Address) -> FaucetResult<U256> {
        let balance = self.provider.get_balance(of).await?;
        Ok(balance)
    }

    async fn send(&self, handle: &ContractHandle, call: WriteCall) -> FaucetResult<TxHash> {
        if !handle.supports(call.operation()) {
            return Err(FaucetError::ContractCallFailed(format!(
                "{} is not part of the bound interface",
                call.operation()
            )));
        }
        let request = TransactionRequest::default()
            .with_from(handle.signer())
            .with_to(handle.address())
            .with_input(call.calldata())
            .with_value(call.value());
        let pending = self.provider.send_transaction(request).await?;
        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, operation = %call.operation(), "transaction accepted by node");
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> FaucetResult<()> {
        bounded(self.confirm_timeout, tx_hash, self.wait_for_receipt(tx_hash)).await
    }
}

fn receipt_outcome(succeeded: bool) -> FaucetResult<()> {
    if succeeded {
        Ok(())
    } else {
        Err(FaucetError::TransactionReverted(String::from(
            "transaction reverted",
        )))
    }
}

/// Runs `wait` under the optional confirmation limit. Running out of time is a network failure.
async fn bounded<F>(limit: Option<Duration>, tx_hash: TxHash, wait: F) -> FaucetResult<()>
where
    F: Future<Output = FaucetResult<()>>,
{
    match limit {
        Some(limit) => time::timeout(limit, wait).await.map_err(|_| {
            FaucetError::Network(format!(
                "no receipt for {tx_hash} after {}s",
                limit.as_secs()
            ))
        })?,
        None => wait.await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded__missing_receipt_times_out_as_network_error() {
        // given
        let tx_hash = TxHash::repeat_byte(0x11);
        let limit = Duration::from_secs(30);

        // when
        let result = bounded(Some(limit), tx_hash, std::future::pending()).await;

        // then
        assert_eq!(
            result,
            Err(FaucetError::Network(format!(
                "no receipt for {tx_hash} after 30s"
            )))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn bounded__receipt_within_limit_passes_through() {
        let tx_hash = TxHash::repeat_byte(0x22);
        let wait = async {
            time::sleep(Duration::from_secs(5)).await;
            receipt_outcome(false)
        };

        let result = bounded(Some(Duration::from_secs(30)), tx_hash, wait).await;

        assert_eq!(
            result,
            Err(FaucetError::TransactionReverted("transaction reverted".into()))
        );
    }

    #[tokio::test]
    async fn bounded__without_limit_awaits_the_receipt() {
        let tx_hash = TxHash::repeat_byte(0x33);

        let result = bounded(None, tx_hash, async { receipt_outcome(true) }).await;

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn receipt_outcome__failed_status_is_a_generic_revert() {
        assert_eq!(
            receipt_outcome(false),
            Err(FaucetError::TransactionReverted("transaction reverted".into()))
        );
        assert_eq!(receipt_outcome(true), Ok(()));
    }
}
