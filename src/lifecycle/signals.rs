//! OS signal handling.
//!
//! # Responsibilities
//! - Subscribe to termination signals (SIGTERM, SIGINT)
//! - Close the shutdown gate when one arrives
//! - Return when the gate closes for any other reason
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Both signals are treated identically
//! - No gate means the feature is off: nothing is subscribed
//! - The subscription lives only as long as the wait

use std::fmt;
use std::future::Future;
use std::io;

use crate::lifecycle::shutdown::Shutdown;

/// Termination signals that start a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// A subscription to termination signals.
///
/// Dropping the source ends the subscription.
pub trait SignalSource: Send {
    /// Next signal, or `None` once the source can deliver no more.
    fn recv(&mut self) -> impl Future<Output = Option<TerminationSignal>> + Send;
}

/// Termination signals delivered to this process.
#[cfg(unix)]
pub struct OsSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    /// Subscribe to SIGINT and SIGTERM.
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }
}

#[cfg(unix)]
impl SignalSource for OsSignals {
    async fn recv(&mut self) -> Option<TerminationSignal> {
        tokio::select! {
            s = self.interrupt.recv() => s.map(|_| TerminationSignal::Interrupt),
            s = self.terminate.recv() => s.map(|_| TerminationSignal::Terminate),
        }
    }
}

/// Ctrl-C delivered to this process.
#[cfg(not(unix))]
pub struct OsSignals {
    _private: (),
}

#[cfg(not(unix))]
impl OsSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self { _private: () })
    }
}

#[cfg(not(unix))]
impl SignalSource for OsSignals {
    async fn recv(&mut self) -> Option<TerminationSignal> {
        tokio::signal::ctrl_c()
            .await
            .ok()
            .map(|_| TerminationSignal::Interrupt)
    }
}

/// Wait until shutdown starts, closing the gate on SIGINT/SIGTERM.
///
/// With no gate, returns immediately without subscribing to any signal.
pub async fn wait_for_signal(gate: Option<&Shutdown>) -> io::Result<()> {
    wait_for_signal_with(gate, OsSignals::install).await
}

/// Same as [`wait_for_signal`], over a caller-supplied signal subscription.
///
/// `install` is only called when a gate is present.
pub async fn wait_for_signal_with<S, F>(gate: Option<&Shutdown>, install: F) -> io::Result<()>
where
    S: SignalSource,
    F: FnOnce() -> io::Result<S>,
{
    let Some(gate) = gate else {
        return Ok(());
    };

    let mut signals = install()?;
    let mut signals_open = true;

    loop {
        tokio::select! {
            _ = gate.wait() => break,
            received = signals.recv(), if signals_open => match received {
                Some(signal) => {
                    tracing::info!(%signal, "Initiating graceful shutdown due to signal");
                    gate.trigger();
                    break;
                }
                // Source closed: only the gate can end the wait now.
                None => signals_open = false,
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Scripted signal source that records its own lifetime.
    struct ScriptedSignals {
        rx: mpsc::UnboundedReceiver<TerminationSignal>,
        dropped: Arc<AtomicBool>,
    }

    impl SignalSource for ScriptedSignals {
        async fn recv(&mut self) -> Option<TerminationSignal> {
            self.rx.recv().await
        }
    }

    impl Drop for ScriptedSignals {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn scripted() -> (
        mpsc::UnboundedSender<TerminationSignal>,
        Arc<AtomicBool>,
        impl FnOnce() -> io::Result<ScriptedSignals>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = dropped.clone();
        (tx, dropped, move || Ok(ScriptedSignals { rx, dropped: flag }))
    }

    #[tokio::test]
    async fn test_no_gate_returns_without_subscribing() {
        let installs = AtomicUsize::new(0);
        let install = || -> io::Result<ScriptedSignals> {
            installs.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::other("signals must not be installed without a gate"))
        };

        tokio::time::timeout(Duration::from_secs(1), wait_for_signal_with(None, install))
            .await
            .expect("should not block")
            .unwrap();
        assert_eq!(installs.load(Ordering::SeqCst), 0);

        wait_for_signal(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_signal_closes_gate_and_releases_subscription() {
        let gate = Shutdown::new();
        let (tx, dropped, install) = scripted();

        tx.send(TerminationSignal::Terminate).unwrap();
        wait_for_signal_with(Some(&gate), install).await.unwrap();

        assert!(gate.is_triggered());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_repeated_signals_are_harmless() {
        let gate = Shutdown::new();
        let (tx, _dropped, install) = scripted();

        tx.send(TerminationSignal::Interrupt).unwrap();
        tx.send(TerminationSignal::Terminate).unwrap();
        wait_for_signal_with(Some(&gate), install).await.unwrap();
        assert!(gate.is_triggered());

        // A second wait on the closed gate returns at once.
        let (tx, _dropped, install) = scripted();
        tx.send(TerminationSignal::Interrupt).unwrap();
        wait_for_signal_with(Some(&gate), install).await.unwrap();
        assert!(!gate.trigger());
    }

    #[tokio::test]
    async fn test_internal_trigger_ends_wait() {
        let gate = Shutdown::new();
        let (_tx, dropped, install) = scripted();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { wait_for_signal_with(Some(&gate), install).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        assert!(gate.trigger());
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait should end once the gate closes")
            .unwrap()
            .unwrap();
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_closed_source_falls_back_to_gate() {
        let gate = Shutdown::new();
        let (tx, _dropped, install) = scripted();
        drop(tx);

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { wait_for_signal_with(Some(&gate), install).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        gate.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_install_failure_is_reported() {
        let gate = Shutdown::new();
        let install = || -> io::Result<ScriptedSignals> { Err(io::Error::other("no signals here")) };

        assert!(wait_for_signal_with(Some(&gate), install).await.is_err());
        assert!(!gate.is_triggered());
    }
}
