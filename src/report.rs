use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Commitment;

pub const REPORT_ENDPOINT: &str = "https://www.validators.app/api/v1/ping-thing/mainnet";

/// Placeholder signature reported for cycles where no transaction landed, so
/// the sink can ingest the record while recognizing it as a non-event.
pub const SENTINEL_SIGNATURE: &str =
    "999999999999999999999999999999999999999999999999999999999999999999999999999999999999999999";

const TRANSACTION_TYPE: &str = "transfer";
const APPLICATION: &str = "rust";

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// One cycle's outcome as reported to validators.app.
///
/// `success` is true exactly when `signature` is a real signature rather than
/// the sentinel; the two constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingReport {
    pub time: u64,
    pub signature: String,
    pub transaction_type: String,
    pub success: bool,
    pub application: String,
    pub commitment_level: String,
    pub slot_sent: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_landed: Option<u64>,
}

impl PingReport {
    pub fn success(
        time_ms: u64,
        signature: &Signature,
        commitment: Commitment,
        slot_sent: u64,
        slot_landed: Option<u64>,
    ) -> Self {
        Self {
            time: time_ms,
            signature: signature.to_string(),
            transaction_type: TRANSACTION_TYPE.to_string(),
            success: true,
            application: APPLICATION.to_string(),
            commitment_level: commitment.as_str().to_string(),
            slot_sent,
            slot_landed,
        }
    }

    pub fn failure(time_ms: u64, commitment: Commitment, slot_sent: u64) -> Self {
        Self {
            time: time_ms,
            signature: SENTINEL_SIGNATURE.to_string(),
            transaction_type: TRANSACTION_TYPE.to_string(),
            success: false,
            application: APPLICATION.to_string(),
            commitment_level: commitment.as_str().to_string(),
            slot_sent,
            slot_landed: None,
        }
    }
}

/// Accepts one report per cycle. Delivery is fire-and-forget: the probe never
/// waits on it and never learns whether it arrived.
pub trait ReportSink: Send + Sync {
    fn submit(&self, report: PingReport);
}

pub struct HttpReporter {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpReporter {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: REPORT_ENDPOINT.to_string(),
            api_key,
        })
    }
}

impl ReportSink for HttpReporter {
    fn submit(&self, report: PingReport) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();

        tokio::spawn(async move {
            let result = client
                .post(&endpoint)
                .header("Token", &api_key)
                .json(&report)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!("report delivered: {}", response.status());
                }
                Ok(response) => {
                    warn!("report rejected by sink: {}", response.status());
                }
                Err(e) => {
                    warn!("failed to deliver report: {e}");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_ninety_nines() {
        assert_eq!(SENTINEL_SIGNATURE.len(), 90);
        assert!(SENTINEL_SIGNATURE.chars().all(|c| c == '9'));
    }

    #[test]
    fn success_flag_tracks_the_signature() {
        let signature = Signature::default();
        let ok = PingReport::success(42, &signature, Commitment::Confirmed, 100, Some(102));
        assert!(ok.success);
        assert_ne!(ok.signature, SENTINEL_SIGNATURE);

        let failed = PingReport::failure(0, Commitment::Confirmed, 100);
        assert!(!failed.success);
        assert_eq!(failed.signature, SENTINEL_SIGNATURE);
        assert_eq!(failed.slot_landed, None);
    }

    #[test]
    fn serializes_the_exact_wire_shape() {
        let signature = Signature::default();
        let report = PingReport::success(42, &signature, Commitment::Confirmed, 100, Some(102));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "time": 42,
                "signature": signature.to_string(),
                "transaction_type": "transfer",
                "success": true,
                "application": "rust",
                "commitment_level": "confirmed",
                "slot_sent": 100,
                "slot_landed": 102,
            })
        );
    }

    #[test]
    fn omits_slot_landed_when_absent() {
        let report = PingReport::failure(0, Commitment::Finalized, 100);
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("slot_landed").is_none());
        assert_eq!(value["commitment_level"], "finalized");
        assert_eq!(value["time"], 0);
    }
}
