//! Application state management

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::ocr::InferenceEngine;

/// Shared application state
///
/// Constructed once at startup and injected into every handler. All fields
/// are immutable after construction except the readiness flag, which flips
/// exactly once when the engine finishes loading.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub config: Config,
    pub engine: Arc<dyn InferenceEngine>,
    pub model_loaded: AtomicBool,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                engine,
                model_loaded: AtomicBool::new(false),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the inference engine
    pub fn engine(&self) -> &Arc<dyn InferenceEngine> {
        &self.inner.engine
    }

    /// Whether the model has finished loading
    pub fn model_loaded(&self) -> bool {
        self.inner.model_loaded.load(Ordering::SeqCst)
    }

    /// Mark the model as loaded
    pub fn mark_loaded(&self) {
        self.inner.model_loaded.store(true, Ordering::SeqCst);
    }

    /// Reject the request unless the model is ready
    pub fn require_loaded(&self) -> Result<()> {
        if self.model_loaded() {
            Ok(())
        } else {
            Err(AppError::NotReady)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::MockEngine;

    #[test]
    fn readiness_flag() {
        let state = AppState::new(Config::default(), Arc::new(MockEngine::default()));

        assert!(!state.model_loaded());
        assert!(matches!(state.require_loaded(), Err(AppError::NotReady)));

        state.mark_loaded();
        assert!(state.model_loaded());
        assert!(state.require_loaded().is_ok());
    }
}
