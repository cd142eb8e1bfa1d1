use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::UiTransactionEncoding;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::error::{ProbeError, Result};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// The handful of chain operations one probe cycle needs. Split out as a
/// trait so the loop can run against a scripted stand-in under test.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest blockhash at finalized commitment, with the block height at
    /// which it stops being usable.
    async fn latest_blockhash(&self) -> Result<(Hash, u64)>;

    /// Current slot at processed commitment, the fastest view of the tip.
    async fn processed_slot(&self) -> Result<u64>;

    /// Submit a signed transaction without preflight simulation.
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature>;

    /// Wait until the transaction reaches the configured commitment, fails
    /// on chain, or can no longer land because the chain passed
    /// `last_valid_block_height`.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<()>;

    /// Slot the transaction landed in, read back at the configured
    /// commitment.
    async fn landed_slot(&self, signature: &Signature) -> Result<u64>;
}

pub struct RpcChainClient {
    rpc: RpcClient,
    commitment: CommitmentConfig,
    confirm_poll: Duration,
}

impl RpcChainClient {
    pub fn new(config: &Config) -> Self {
        let commitment = config.commitment.to_commitment_config();
        Self {
            rpc: RpcClient::new_with_timeout_and_commitment(
                config.rpc_endpoint.clone(),
                RPC_TIMEOUT,
                commitment,
            ),
            commitment,
            confirm_poll: config.confirm_poll,
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::finalized())
            .await?;
        Ok((blockhash, last_valid_block_height))
    }

    async fn processed_slot(&self) -> Result<u64> {
        Ok(self
            .rpc
            .get_slot_with_commitment(CommitmentConfig::processed())
            .await?)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            ..RpcSendTransactionConfig::default()
        };
        Ok(self.rpc.send_transaction_with_config(tx, config).await?)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<()> {
        loop {
            if let Some(status) = self
                .rpc
                .get_signature_status_with_commitment(signature, self.commitment)
                .await?
            {
                return status.map_err(|err| ProbeError::TransactionFailed {
                    signature: *signature,
                    err,
                });
            }

            // The blockhash bounds the wait: once the chain moves past the
            // transaction's validity window it can never land.
            let block_height = self
                .rpc
                .get_block_height_with_commitment(self.commitment)
                .await?;
            if block_height > last_valid_block_height {
                return Err(ProbeError::BlockhashExpired {
                    signature: *signature,
                    last_valid_block_height,
                });
            }

            sleep(self.confirm_poll).await;
        }
    }

    async fn landed_slot(&self, signature: &Signature) -> Result<u64> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        let tx = self
            .rpc
            .get_transaction_with_config(signature, config)
            .await?;
        Ok(tx.slot)
    }
}
