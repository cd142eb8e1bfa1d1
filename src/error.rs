use solana_client::client_error::ClientError;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

/// Failures a probe cycle can raise. Every network step funnels into one of
/// these shapes so the classifier can route on structure instead of text.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("RPC error: {0}")]
    Rpc(#[from] ClientError),

    #[error("transaction {signature} expired: chain passed block height {last_valid_block_height}")]
    BlockhashExpired {
        signature: Signature,
        last_valid_block_height: u64,
    },

    #[error("transaction {signature} failed on chain: {err}")]
    TransactionFailed {
        signature: Signature,
        err: TransactionError,
    },
}

pub type Result<T> = std::result::Result<T, ProbeError>;
