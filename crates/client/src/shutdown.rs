//! Shutdown sweep
//!
//! Last-resort recovery for transactions the application never finished.
//! The sweep asks the factory for every transaction it knows, and rolls back
//! those that have started. It runs at most once per client, either from
//! `TransactionClient::shutdown` or from the process signal listener.
//!
//! The sweep never fails: every error is logged and counted, and the loop
//! moves on to the next transaction.
//!
//! Signal handling is process-wide. Every client that asks for it enrolls
//! its guard with one hub, and the hub runs a single listener for SIGINT,
//! SIGTERM and SIGHUP. On a signal it sweeps every live guard and then exits
//! the process once, with `128 + signal number`.

use crate::config::ClientConfig;
use crate::ledger::EnlistmentLedger;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use txlink_protocol::{TransactionError, TransactionFactory, TransactionId};

const SIGINT_EXIT_CODE: i32 = 130;
#[cfg(unix)]
const SIGTERM_EXIT_CODE: i32 = 143;
#[cfg(unix)]
const SIGHUP_EXIT_CODE: i32 = 129;

static SIGNAL_HUB: OnceLock<SignalHub> = OnceLock::new();

/// What a sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Transactions enumerated by the factory
    pub inspected: usize,
    /// Transactions this sweep rolled back
    pub rolled_back: Vec<TransactionId>,
    /// Started transactions that had already committed or rolled back
    pub already_terminal: usize,
    /// Transactions skipped because they never started
    pub not_started: usize,
    /// Remote calls that failed (enumeration, status or rollback)
    pub failed: usize,
    /// The sweep was cut short by the configured timeout
    pub timed_out: bool,
}

struct GuardState {
    client_name: String,
    factory: Arc<dyn TransactionFactory>,
    ledger: Arc<EnlistmentLedger>,
    timeout: Duration,
    swept: AtomicBool,
}

impl GuardState {
    async fn sweep(&self) -> Option<SweepReport> {
        if self.swept.swap(true, Ordering::SeqCst) {
            return None;
        }

        let mut report = SweepReport::default();
        if tokio::time::timeout(self.timeout, self.sweep_into(&mut report))
            .await
            .is_err()
        {
            tracing::warn!(
                "[{}] Shutdown sweep timed out after {:?}",
                self.client_name,
                self.timeout
            );
            report.timed_out = true;
        }

        tracing::info!(
            "[{}] Shutdown sweep inspected {} transactions, rolled back {}, {} failures",
            self.client_name,
            report.inspected,
            report.rolled_back.len(),
            report.failed
        );
        Some(report)
    }

    async fn sweep_into(&self, report: &mut SweepReport) {
        let transactions = match self.factory.transactions().await {
            Ok(transactions) => transactions,
            Err(e) => {
                tracing::warn!("[{}] Failed to enumerate transactions: {}", self.client_name, e);
                report.failed += 1;
                return;
            }
        };

        for transaction in transactions {
            report.inspected += 1;
            let txn_id = transaction.id();

            match transaction.has_started().await {
                Ok(true) => {}
                Ok(false) => {
                    report.not_started += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        "[{}] Failed to read state of {}: {}",
                        self.client_name,
                        txn_id,
                        e
                    );
                    report.failed += 1;
                    continue;
                }
            }

            match transaction.rollback().await {
                Ok(()) => {
                    tracing::info!("[{}] Rolled back unfinished {}", self.client_name, txn_id);
                    self.ledger.release(&txn_id);
                    report.rolled_back.push(txn_id);
                }
                Err(TransactionError::AlreadyTerminal(_)) => {
                    tracing::debug!("[{}] {} already finished", self.client_name, txn_id);
                    self.ledger.release(&txn_id);
                    report.already_terminal += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "[{}] Failed to roll back {}: {}",
                        self.client_name,
                        txn_id,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
    }
}

/// Rolls back unfinished transactions when the client goes away
pub struct ShutdownGuard {
    state: Arc<GuardState>,
    enrolled: bool,
}

impl ShutdownGuard {
    /// Install the guard for `factory`
    ///
    /// Releases `ledger` records of the transactions it finishes. When the
    /// config asks for signal handling the guard enrolls with the process
    /// hub, which starts its listener on first use, so this must run inside
    /// a tokio runtime.
    pub fn install(
        factory: Arc<dyn TransactionFactory>,
        ledger: Arc<EnlistmentLedger>,
        config: &ClientConfig,
    ) -> Self {
        let state = Arc::new(GuardState {
            client_name: config.client_name.clone(),
            factory,
            ledger,
            timeout: config.sweep_timeout,
            swept: AtomicBool::new(false),
        });

        let enrolled = config.install_signal_handler;
        if enrolled {
            let hub = SIGNAL_HUB.get_or_init(SignalHub::new);
            hub.enroll(&state);
            hub.ensure_listener();
        }

        tracing::debug!(
            "[{}] Shutdown guard installed (signal listener: {})",
            config.client_name,
            enrolled
        );

        Self { state, enrolled }
    }

    /// Run the sweep now; `None` if it already ran
    pub async fn sweep(&self) -> Option<SweepReport> {
        self.state.sweep().await
    }

    pub fn has_run(&self) -> bool {
        self.state.swept.load(Ordering::SeqCst)
    }

    pub fn listens_for_signal(&self) -> bool {
        self.enrolled
    }
}

/// Guards waiting for a termination signal, shared by every client
struct SignalHub {
    guards: Mutex<Vec<Weak<GuardState>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SignalHub {
    fn new() -> Self {
        Self {
            guards: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
        }
    }

    fn enroll(&self, state: &Arc<GuardState>) {
        let mut guards = self.guards.lock();
        guards.retain(|guard| guard.strong_count() > 0);
        guards.push(Arc::downgrade(state));
    }

    fn live_guards(&self) -> Vec<Arc<GuardState>> {
        self.guards.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// Sweep every guard still alive; guards that already swept are skipped
    async fn sweep_all(&self) -> Vec<SweepReport> {
        let mut reports = Vec::new();
        for guard in self.live_guards() {
            if let Some(report) = guard.sweep().await {
                reports.push(report);
            }
        }
        reports
    }

    /// Start the listener unless one is already running
    ///
    /// A listener whose runtime went away is replaced.
    fn ensure_listener(&'static self) {
        let mut listener = self.listener.lock();
        if listener.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        *listener = Some(tokio::spawn(async move {
            match wait_for_termination().await {
                Ok((name, code)) => {
                    tracing::info!(
                        "{} received, rolling back unfinished transactions",
                        name
                    );
                    let reports = self.sweep_all().await;
                    tracing::info!("Swept {} clients, exiting with status {}", reports.len(), code);
                    std::process::exit(code);
                }
                Err(e) => {
                    tracing::error!("Unable to listen for termination signal: {}", e);
                }
            }
        }));
    }
}

/// Wait for the first termination signal; returns its name and exit status
#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<(&'static str, i32)> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| ("SIGINT", SIGINT_EXIT_CODE)),
        _ = terminate.recv() => Ok(("SIGTERM", SIGTERM_EXIT_CODE)),
        _ = hangup.recv() => Ok(("SIGHUP", SIGHUP_EXIT_CODE)),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<(&'static str, i32)> {
    tokio::signal::ctrl_c().await?;
    Ok(("Ctrl+C", SIGINT_EXIT_CODE))
}
