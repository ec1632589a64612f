//! Request throttling for gallery access.
//!
//! Sliding-window request counting keyed by token (and caller IP for public
//! audiences). The counter store sits behind the injectable [`Counter`]
//! trait so a single-process map or a distributed cache can satisfy it; the
//! in-memory implementation guards its window map with a mutex, making
//! increments atomic within one process. Distributed counters may let one
//! extra request through under concurrent increments; the documented race
//! tolerance is 1.

pub mod counter;
pub mod limiter;

pub use counter::{Counter, CounterError, InMemoryCounter, WindowCount};
pub use limiter::{RateKey, RateLimitConfig, RateLimitResult, RateLimiter, ThrottlePolicy};
