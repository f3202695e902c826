//! Backend fallback dispatcher
//!
//! A print goes `Idle → Formatting → Dispatching → Succeeded | Failed`.
//! Backends are tried strictly in the job's order; the first successful send
//! ends the chain and every failure moves on to the next backend. No retries.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::backend::{Delivery, PrintBackend};
use crate::config::BackendKind;
use crate::job::PrintJob;

/// Print lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Formatting,
    Dispatching,
    Succeeded,
    Failed,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatchState::Idle => "idle",
            DispatchState::Formatting => "formatting",
            DispatchState::Dispatching => "dispatching",
            DispatchState::Succeeded => "succeeded",
            DispatchState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Log a state change
pub fn log_transition(order_id: &str, from: DispatchState, to: DispatchState) {
    debug!(order_id, from = %from, to = %to, "Print state changed");
}

/// One backend send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub backend: BackendKind,
    /// Failure cause; `None` when the send succeeded
    pub error: Option<String>,
}

impl Attempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Every attempt of one dispatch and how it ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempts: Vec<Attempt>,
    /// `Succeeded` or `Failed`
    pub outcome: DispatchState,
    /// Details from the backend that printed the job
    pub delivery: Option<Delivery>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == DispatchState::Succeeded
    }

    /// Backend that printed the job
    pub fn delivered_by(&self) -> Option<BackendKind> {
        self.attempts
            .iter()
            .find(|a| a.succeeded())
            .map(|a| a.backend)
    }
}

/// Registry of backend instances keyed by kind
#[derive(Default)]
pub struct PrintDispatcher {
    backends: HashMap<BackendKind, Arc<dyn PrintBackend>>,
}

impl PrintDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous one of the same kind
    pub fn register(&mut self, backend: Arc<dyn PrintBackend>) -> &mut Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    pub fn with_backend(mut self, backend: impl PrintBackend + 'static) -> Self {
        self.register(Arc::new(backend));
        self
    }

    pub fn has_backend(&self, kind: BackendKind) -> bool {
        self.backends.contains_key(&kind)
    }

    /// Try the job's backends in order until one accepts it
    #[instrument(skip(self, job), fields(order_id = %job.order_id, backends = ?job.backends))]
    pub fn dispatch(&self, job: &PrintJob) -> DispatchReport {
        log_transition(&job.order_id, DispatchState::Formatting, DispatchState::Dispatching);

        let mut attempts = Vec::with_capacity(job.backends.len());
        let mut delivery = None;

        for &kind in &job.backends {
            let Some(backend) = self.backends.get(&kind) else {
                warn!(backend = %kind, success = false, "Backend not available, trying next");
                attempts.push(Attempt {
                    backend: kind,
                    error: Some("backend not available".to_string()),
                });
                continue;
            };

            match backend.send(job) {
                Ok(d) => {
                    info!(backend = %kind, success = true, "Print job delivered");
                    attempts.push(Attempt {
                        backend: kind,
                        error: None,
                    });
                    delivery = Some(d);
                    break;
                }
                Err(e) => {
                    warn!(backend = %kind, success = false, error = %e, "Backend failed, trying next");
                    attempts.push(Attempt {
                        backend: kind,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let outcome = if delivery.is_some() {
            DispatchState::Succeeded
        } else {
            error!(attempts = attempts.len(), "All print backends failed");
            DispatchState::Failed
        };
        log_transition(&job.order_id, DispatchState::Dispatching, outcome);

        DispatchReport {
            attempts,
            outcome,
            delivery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, BackendResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        kind: BackendKind,
        ok: bool,
        calls: Arc<AtomicUsize>,
    }

    impl PrintBackend for Scripted {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn send(&self, _: &PrintJob) -> BackendResult<Delivery> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.ok {
                Ok(Delivery::delivered())
            } else {
                Err(BackendError::Configuration("down".to_string()))
            }
        }
    }

    fn scripted(kind: BackendKind, ok: bool) -> (Scripted, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Scripted {
                kind,
                ok,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn job(backends: Vec<BackendKind>) -> PrintJob {
        PrintJob::new("1", vec!["x".to_string()], backends)
    }

    #[test]
    fn test_first_success_halts_chain() {
        let (native, native_calls) = scripted(BackendKind::Native, true);
        let (html, html_calls) = scripted(BackendKind::Html, true);
        let dispatcher = PrintDispatcher::new().with_backend(native).with_backend(html);

        let report = dispatcher.dispatch(&job(vec![BackendKind::Native, BackendKind::Html]));

        assert!(report.succeeded());
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(native_calls.load(Ordering::SeqCst), 1);
        assert_eq!(html_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exhausted_chain_fails() {
        let (native, _) = scripted(BackendKind::Native, false);
        let dispatcher = PrintDispatcher::new().with_backend(native);

        let report = dispatcher.dispatch(&job(vec![BackendKind::Native, BackendKind::Serial]));

        assert_eq!(report.outcome, DispatchState::Failed);
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.attempts[1].error.as_deref(), Some("backend not available"));
        assert!(report.delivery.is_none());
        assert_eq!(report.delivered_by(), None);
    }

    #[test]
    fn test_order_is_respected() {
        let (native, _) = scripted(BackendKind::Native, true);
        let (html, _) = scripted(BackendKind::Html, true);
        let dispatcher = PrintDispatcher::new().with_backend(native).with_backend(html);

        let report = dispatcher.dispatch(&job(vec![BackendKind::Html, BackendKind::Native]));
        assert_eq!(report.delivered_by(), Some(BackendKind::Html));
    }
}
