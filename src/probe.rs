use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::chain::ChainClient;
use crate::classifier::{classify, Disposition};
use crate::config::Config;
use crate::error::Result;
use crate::report::{PingReport, ReportSink};

/// The self-transfer amount. Economically a no-op, it only exercises the
/// submission path.
const TRANSFER_LAMPORTS: u64 = 5000;

const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Per-cycle scratch state, consulted when a failed cycle still needs to be
/// reported.
#[derive(Default)]
struct ProbeAttempt {
    slot_sent: Option<u64>,
    started: Option<Instant>,
    completed: Option<Instant>,
}

impl ProbeAttempt {
    /// Milliseconds from send to confirmation. A cycle that never confirmed
    /// has no end timestamp and reports 0.
    fn elapsed_ms(&self) -> u64 {
        match self.started {
            Some(started) => {
                let completed = self.completed.unwrap_or(started);
                completed.duration_since(started).as_millis() as u64
            }
            None => 0,
        }
    }
}

/// Run of consecutive unrecognized failures. Any emitted record clears it;
/// spending the whole budget is fatal.
struct FailureBudget {
    consecutive: u32,
    limit: u32,
}

impl FailureBudget {
    fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit,
        }
    }

    fn record(&mut self) -> u32 {
        self.consecutive += 1;
        self.consecutive
    }

    fn exhausted(&self) -> bool {
        self.consecutive >= self.limit
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }
}

pub struct ProbeLoop<C, R> {
    config: Arc<Config>,
    chain: C,
    reporter: R,
    failures: FailureBudget,
}

impl<C: ChainClient, R: ReportSink> ProbeLoop<C, R> {
    pub fn new(config: Arc<Config>, chain: C, reporter: R) -> Self {
        Self {
            config,
            chain,
            reporter,
            failures: FailureBudget::new(MAX_CONSECUTIVE_FAILURES),
        }
    }

    /// Probe until the failure budget is spent; the returned error is the
    /// fatal one. Interruption comes from outside (see main).
    pub async fn run(mut self) -> Result<()> {
        let mut first = true;
        loop {
            if !first {
                sleep(self.config.sleep_loop).await;
            }
            first = false;
            self.step().await?;
        }
    }

    /// One cycle plus the reaction to its outcome. Returns an error only
    /// when consecutive unrecognized failures exhaust the budget.
    async fn step(&mut self) -> Result<()> {
        let mut attempt = ProbeAttempt::default();
        let outcome = self.cycle(&mut attempt).await;

        match outcome {
            Ok(report) => {
                self.failures.reset();
                self.emit(report);
            }
            Err(err) => match classify(&err) {
                Disposition::SilentRetry => {
                    info!("transient failure, retrying next cycle: {err}");
                }
                Disposition::RecordAsFailure => {
                    info!("chain rejected the probe transaction, reporting failed cycle: {err}");
                    let report = PingReport::failure(
                        attempt.elapsed_ms(),
                        self.config.commitment,
                        attempt.slot_sent.unwrap_or_default(),
                    );
                    self.failures.reset();
                    self.emit(report);
                }
                Disposition::UnknownRetry => {
                    let count = self.failures.record();
                    error!(detail = ?err, "unclassified probe failure ({count} consecutive): {err}");
                    if self.failures.exhausted() {
                        error!("aborting after {count} consecutive unclassified failures");
                        return Err(err);
                    }
                }
            },
        }

        Ok(())
    }

    async fn cycle(&self, attempt: &mut ProbeAttempt) -> Result<PingReport> {
        // The reference point and the send slot have no dependency on each
        // other; whichever fetch fails first fails the pair.
        let ((blockhash, last_valid_block_height), slot_sent) =
            tokio::try_join!(self.chain.latest_blockhash(), self.chain.processed_slot())?;
        attempt.slot_sent = Some(slot_sent);

        let tx = build_transfer(&self.config, blockhash);

        attempt.started = Some(Instant::now());
        let signature = self.chain.send_transaction(&tx).await?;

        self.chain
            .confirm_transaction(&signature, last_valid_block_height)
            .await?;
        attempt.completed = Some(Instant::now());

        // Give the signature time to propagate across RPC replicas before
        // reading it back. The landed slot is advisory: a failed lookup
        // leaves the field empty.
        sleep(self.config.settle_delay).await;
        let slot_landed = self.chain.landed_slot(&signature).await.ok();

        Ok(PingReport::success(
            attempt.elapsed_ms(),
            &signature,
            self.config.commitment,
            slot_sent,
            slot_landed,
        ))
    }

    fn emit(&self, report: PingReport) {
        debug!(
            "report payload: {}",
            serde_json::to_string(&report).unwrap_or_default()
        );
        self.reporter.submit(report);
    }
}

/// Self-transfer with the optional compute-budget pair ahead of it.
fn build_transfer(config: &Config, blockhash: Hash) -> Transaction {
    let payer = config.signer.pubkey();

    let mut instructions: Vec<Instruction> = Vec::with_capacity(3);
    if config.use_priority_fee {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(
            config.cu_budget,
        ));
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
            config.priority_fee_micro_lamports,
        ));
    }
    instructions.push(system_instruction::transfer(
        &payer,
        &payer,
        TRANSFER_LAMPORTS,
    ));

    Transaction::new_signed_with_payer(&instructions, Some(&payer), &[&config.signer], blockhash)
}
