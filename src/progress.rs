//! Streaming progress events and cooperative cancellation.
//!
//! The orchestrator emits one event per phase boundary; `percent` is
//! non-decreasing and a successful run ends with exactly one `complete`.
//! Cancellation is a shared atomic flag checked before each phase and at the
//! AI suspension point; timeouts are modeled by the caller cancelling the
//! token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::error::ConvertError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Parsing,
    Mapping,
    Rendering,
    Complete,
}

impl Phase {
    pub fn percent(self) -> u8 {
        match self {
            Phase::Parsing => 20,
            Phase::Mapping => 50,
            Phase::Rendering => 80,
            Phase::Complete => 100,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            percent: phase.percent(),
            message: None,
        }
    }

    pub fn with_message(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            percent: phase.percent(),
            message: Some(message.into()),
        }
    }
}

/// Cloneable cancellation handle; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Phase-boundary check used by the orchestrator and the AI adapter.
    pub fn ensure_active(&self) -> Result<(), ConvertError> {
        if self.is_cancelled() {
            Err(ConvertError::Cancelled)
        } else {
            Ok(())
        }
    }
}
