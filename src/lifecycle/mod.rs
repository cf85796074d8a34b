//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     CLI flags or config file → Validate routes → Initial RemoteConfig
//!
//! Shutdown (shutdown.rs):
//!     Gate: Open → Closed, exactly once
//!     Every long-running task waits on a clone of the gate
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Close the gate
//!     Internal trigger → Close the same gate
//! ```
//!
//! # Design Decisions
//! - One gate per process, owned by the run loop and passed by clone
//! - Closing is idempotent; the first trigger wins, the rest are no-ops
//! - No timeout here: teardown deadlines belong to the caller

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{wait_for_signal, wait_for_signal_with, SignalSource, TerminationSignal};
