//! Engine call gate.
//!
//! The propagation library holds process-global state and is not safe
//! for reentrant calls. Every call, from every handler and from the
//! registry, funnels through this gate: a bounded semaphore with a
//! default capacity of one. Higher capacities exist only as a tunable
//! for hypothetically reentrant engines.
//!
//! The gate provides mutual exclusion, not FIFO fairness; callers must
//! not assume arrival order equals execution order.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::engine::PropagationLibrary;

/// Default number of concurrent engine calls.
pub const DEFAULT_GATE_PERMITS: usize = 1;

/// Errors surfaced by gated engine calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The caller's cancellation fired while waiting for a permit.
    #[error("engine call cancelled")]
    Cancelled,

    /// The engine returned a non-zero code; `msg` carries its last-error
    /// message.
    #[error("engine call failed: rc={rc}: {msg}")]
    Native {
        /// Raw engine return code.
        rc: i32,
        /// Last-error message read back from the engine.
        msg: String,
    },
}

impl GateError {
    /// Whether this is the cancellation variant.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GateError::Cancelled)
    }
}

/// Bounded gate serializing calls into the propagation library.
pub struct EngineGate {
    permits: Semaphore,
    capacity: usize,
    /// Serializes reads of the engine's global last-error slot so
    /// concurrent failures do not clobber each other's message.
    err_lock: Mutex<()>,
    lib: Arc<dyn PropagationLibrary>,
}

impl EngineGate {
    /// Create a gate with the given permit count (clamped to at least 1).
    pub fn new(lib: Arc<dyn PropagationLibrary>, permits: usize) -> Self {
        let capacity = permits.max(1);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
            err_lock: Mutex::new(()),
            lib,
        }
    }

    /// Configured permit count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run a return-code engine call under a permit.
    ///
    /// Waits for a permit (or the cancellation, whichever comes first),
    /// invokes `call`, and releases the permit - the permit guard is
    /// dropped even if `call` panics. A non-zero return code is turned
    /// into [`GateError::Native`] carrying the engine's last-error
    /// message.
    pub async fn with_call<F>(&self, cancel: &CancellationToken, call: F) -> Result<(), GateError>
    where
        F: FnOnce() -> i32,
    {
        let rc = self.run(cancel, call).await?;
        if rc != 0 {
            return Err(GateError::Native {
                rc,
                msg: self.last_error(),
            });
        }
        Ok(())
    }

    /// Run an engine call under a permit without interpreting its result.
    ///
    /// For operations with partial-success semantics (chunked ephemeris
    /// generation returns points alongside a non-zero code) where the
    /// caller owns the return-code policy.
    pub async fn run<T, F>(&self, cancel: &CancellationToken, call: F) -> Result<T, GateError>
    where
        F: FnOnce() -> T,
    {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GateError::Cancelled),
            permit = self.permits.acquire() => {
                permit.expect("gate semaphore closed")
            }
        };
        Ok(call())
    }

    /// Read the engine's last-error slot under the dedicated lock.
    pub fn last_error(&self) -> String {
        let _guard = self.err_lock.lock().unwrap();
        self.lib.last_err_msg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Frame, SatKey, TimeKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubLib {
        err: Mutex<String>,
    }

    impl StubLib {
        fn new(err: &str) -> Self {
            Self {
                err: Mutex::new(err.to_string()),
            }
        }
    }

    impl PropagationLibrary for StubLib {
        fn lib_info(&self) -> String {
            "stub".into()
        }
        fn sgp4_info(&self) -> String {
            "stub".into()
        }
        fn add_sat_from_lines(&self, _: &str, _: &str) -> SatKey {
            1
        }
        fn get_sat_key(&self, _: i32) -> SatKey {
            -1
        }
        fn init_sat(&self, _: SatKey) -> i32 {
            0
        }
        fn remove_sat_propagator(&self, _: SatKey) -> i32 {
            0
        }
        fn remove_sat_tle(&self, _: SatKey) -> i32 {
            0
        }
        fn remove_all_propagator(&self) -> i32 {
            0
        }
        fn remove_all_tle(&self) -> i32 {
            0
        }
        fn load_file_all(&self, _: &str) -> i32 {
            0
        }
        fn prop_all(&self, _: SatKey, _: TimeKind, _: f64) -> (Vec<f64>, i32) {
            (Vec::new(), 0)
        }
        fn gen_ephems_fill(
            &self,
            _: SatKey,
            _: f64,
            _: f64,
            _: f64,
            _: Frame,
            _: usize,
        ) -> (Vec<f64>, usize, i32) {
            (Vec::new(), 0, 0)
        }
        fn last_err_msg(&self) -> String {
            self.err.lock().unwrap().clone()
        }
    }

    fn gate(permits: usize) -> EngineGate {
        EngineGate::new(Arc::new(StubLib::new("engine exploded")), permits)
    }

    #[tokio::test]
    async fn ok_call_passes_through() {
        let gate = gate(1);
        let cancel = CancellationToken::new();
        assert!(gate.with_call(&cancel, || 0).await.is_ok());
    }

    #[tokio::test]
    async fn non_zero_rc_carries_last_error() {
        let gate = gate(1);
        let cancel = CancellationToken::new();
        let err = gate.with_call(&cancel, || 7).await.unwrap_err();
        match err {
            GateError::Native { rc, msg } => {
                assert_eq!(rc, 7);
                assert_eq!(msg, "engine exploded");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_before_acquire() {
        let gate = gate(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = gate.with_call(&cancel, || 0).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn zero_permit_request_clamps_to_one() {
        let gate = gate(0);
        assert_eq!(gate.capacity(), 1);
        let cancel = CancellationToken::new();
        assert!(gate.with_call(&cancel, || 0).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_permit_serializes_calls() {
        let gate = Arc::new(gate(1));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let gate = Arc::clone(&gate);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let cancel = CancellationToken::new();
                gate.with_call(&cancel, || {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(5));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    0
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_returns_closure_value() {
        let gate = gate(1);
        let cancel = CancellationToken::new();
        let value = gate.run(&cancel, || (vec![1.0, 2.0], 42)).await.unwrap();
        assert_eq!(value.1, 42);
    }
}
