use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Keypair;
use std::env;
use std::time::Duration;

/// Commitment level requested for sends, confirmation, and the landed-slot
/// read-back. Only the three current cluster levels are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => anyhow::bail!(
                "unsupported commitment level {other:?}, expected processed|confirmed|finalized"
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    pub fn to_commitment_config(self) -> CommitmentConfig {
        match self {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

pub struct Config {
    pub rpc_endpoint: String,
    pub signer: Keypair,
    pub sleep_loop: Duration,
    pub settle_delay: Duration,
    pub confirm_poll: Duration,
    pub va_api_key: String,
    pub verbose_log: bool,
    pub commitment: Commitment,
    pub use_priority_fee: bool,
    pub cu_budget: u32,
    pub priority_fee_micro_lamports: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_endpoint: env::var("RPC_ENDPOINT").context("RPC_ENDPOINT is not set")?,

            signer: parse_keypair(
                &env::var("WALLET_PRIVATE_KEYPAIR").context("WALLET_PRIVATE_KEYPAIR is not set")?,
            )?,

            sleep_loop: Duration::from_millis(
                env::var("SLEEP_MS_LOOP")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()?,
            ),

            settle_delay: Duration::from_millis(
                env::var("SLEEP_MS_RPC")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()?,
            ),

            confirm_poll: Duration::from_millis(
                env::var("CONFIRM_POLL_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()?,
            ),

            va_api_key: env::var("VA_API_KEY").context("VA_API_KEY is not set")?,

            verbose_log: env::var("VERBOSE_LOG").map(|v| v == "true").unwrap_or(false),

            commitment: Commitment::parse(
                &env::var("COMMITMENT").unwrap_or_else(|_| "confirmed".to_string()),
            )?,

            use_priority_fee: env::var("USE_PRIORITY_FEE")
                .map(|v| v == "true")
                .unwrap_or(false),

            cu_budget: env::var("CU_BUDGET")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,

            priority_fee_micro_lamports: env::var("PRIORITY_FEE_MICRO_LAMPORTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
        })
    }
}

fn parse_keypair(encoded: &str) -> Result<Keypair> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .context("WALLET_PRIVATE_KEYPAIR is not valid base58")?;
    Keypair::from_bytes(&bytes).context("WALLET_PRIVATE_KEYPAIR is not a valid keypair")
}
