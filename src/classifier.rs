use solana_client::client_error::ClientError;
use solana_client::rpc_request::RpcRequest;
use solana_sdk::transaction::TransactionError;

use crate::error::ProbeError;

/// How the probe loop should react to a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Benign infrastructure hiccup (stale or unresolvable blockhash): retry
    /// next cycle, no record, no counting.
    SilentRetry,
    /// The chain expired or rejected the transaction: report a failed cycle.
    RecordAsFailure,
    /// Unrecognized failure: counts toward the consecutive-failure budget.
    UnknownRetry,
}

pub fn classify(err: &ProbeError) -> Disposition {
    match err {
        ProbeError::BlockhashExpired { .. } => Disposition::RecordAsFailure,
        ProbeError::TransactionFailed { .. } => Disposition::RecordAsFailure,
        ProbeError::Rpc(client_error) => classify_rpc(client_error),
    }
}

fn classify_rpc(err: &ClientError) -> Disposition {
    // Structured signals first.
    if let Some(TransactionError::BlockhashNotFound) = err.get_transaction_error() {
        return Disposition::SilentRetry;
    }
    if matches!(err.request(), Some(RpcRequest::GetLatestBlockhash)) {
        return Disposition::SilentRetry;
    }

    // Some providers surface blockhash staleness only as text.
    if err.to_string().to_lowercase().contains("blockhash not found") {
        return Disposition::SilentRetry;
    }

    Disposition::UnknownRetry
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_client::client_error::ClientErrorKind;
    use solana_sdk::signature::Signature;

    fn custom(message: &str) -> ClientError {
        ClientErrorKind::Custom(message.to_string()).into()
    }

    #[test]
    fn expired_blockhash_is_recorded_as_failure() {
        let err = ProbeError::BlockhashExpired {
            signature: Signature::default(),
            last_valid_block_height: 1000,
        };
        assert_eq!(classify(&err), Disposition::RecordAsFailure);
    }

    #[test]
    fn on_chain_rejection_is_recorded_as_failure() {
        let err = ProbeError::TransactionFailed {
            signature: Signature::default(),
            err: TransactionError::AccountNotFound,
        };
        assert_eq!(classify(&err), Disposition::RecordAsFailure);
    }

    #[test]
    fn structured_blockhash_not_found_retries_silently() {
        let err = ProbeError::Rpc(
            ClientErrorKind::TransactionError(TransactionError::BlockhashNotFound).into(),
        );
        assert_eq!(classify(&err), Disposition::SilentRetry);
    }

    #[test]
    fn failed_blockhash_fetch_retries_silently() {
        let err = ProbeError::Rpc(ClientError::new_with_request(
            ClientErrorKind::Custom("connection reset by peer".to_string()),
            RpcRequest::GetLatestBlockhash,
        ));
        assert_eq!(classify(&err), Disposition::SilentRetry);
    }

    #[test]
    fn textual_blockhash_not_found_retries_silently() {
        let err = ProbeError::Rpc(custom("Blockhash not found"));
        assert_eq!(classify(&err), Disposition::SilentRetry);
    }

    #[test]
    fn anything_else_is_unknown() {
        let err = ProbeError::Rpc(custom("connection refused"));
        assert_eq!(classify(&err), Disposition::UnknownRetry);

        let err = ProbeError::Rpc(ClientError::new_with_request(
            ClientErrorKind::Custom("node is behind".to_string()),
            RpcRequest::SendTransaction,
        ));
        assert_eq!(classify(&err), Disposition::UnknownRetry);
    }
}
