//! Window counter storage.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// The state of one counting window after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests recorded in the open window, including this one.
    pub count: u32,
    /// When the open window started.
    pub window_start: DateTime<Utc>,
}

/// Errors from counter storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// The backing store failed to answer.
    Unavailable { reason: String },
}

impl fmt::Display for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "counter store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for CounterError {}

/// Trait for atomic window counting.
///
/// `increment` must count the call into the window that is open at call
/// time, starting a fresh window when the previous one has aged out.
#[async_trait]
pub trait Counter: Send + Sync {
    /// Atomically increments the counter for a key and returns the window state.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CounterError>;
}

/// State for a single counting window.
#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: DateTime<Utc>,
}

/// In-process counter backed by a mutex-guarded map.
#[derive(Default)]
pub struct InMemoryCounter {
    state: Mutex<HashMap<String, WindowState>>,
}

impl InMemoryCounter {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the window for a key.
    pub fn reset(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.remove(key);
    }
}

#[async_trait]
impl Counter for InMemoryCounter {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CounterError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();

        let entry = state.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        // Counts reset strictly after the window has elapsed.
        if now - entry.window_start >= window {
            entry.window_start = now;
            entry.count = 0;
        }

        entry.count += 1;
        Ok(WindowCount {
            count: entry.count,
            window_start: entry.window_start,
        })
    }
}
