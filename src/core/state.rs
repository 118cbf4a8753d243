use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, TryLockError};

use crate::core::config::Settings;
use crate::services::evaluation::EvaluationClient;
use crate::session::Session;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    session: Mutex<Session>,
    run_guard: Mutex<()>,
    evaluator: EvaluationClient,
}

impl AppState {
    pub(crate) fn new(settings: Settings, evaluator: EvaluationClient) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                session: Mutex::new(Session::new()),
                run_guard: Mutex::new(()),
                evaluator,
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn session(&self) -> &Mutex<Session> {
        &self.inner.session
    }

    /// Held for the whole of an evaluation run; fails while another run holds it.
    pub(crate) fn try_begin_run(&self) -> Result<MutexGuard<'_, ()>, TryLockError> {
        self.inner.run_guard.try_lock()
    }

    pub(crate) fn evaluator(&self) -> &EvaluationClient {
        &self.inner.evaluator
    }
}
