//! Optional JSONL trace of scheduling decisions for offline tuning.
//!
//! Build with `--features profiling` to record reviews, leech transitions,
//! ability estimates and composed sessions. Without the feature the macros
//! below expand to their bare body and nothing is recorded.
//!
//! ```rust
//! // Dropped unless `profiling::init` opened a trace file
//! study_core::profile_log!(study_core::profiling::EventType::LeechFlagged { lapses: 8 });
//! ```

#[cfg(feature = "profiling")]
mod event;
#[cfg(feature = "profiling")]
mod logger;

#[cfg(feature = "profiling")]
pub use event::{EventType, ProfileEvent};
#[cfg(feature = "profiling")]
pub use logger::{
    PROFILE_DIR_ENV_VAR, ScopeTimer, current_path, init, init_in, record, record_with_meta,
    shutdown,
};

#[cfg(not(feature = "profiling"))]
mod noop;
#[cfg(not(feature = "profiling"))]
pub use noop::{current_path, init, init_in, shutdown};

/// Record an event, optionally with `meta = <serde_json::Value>`.
///
/// The arguments are not evaluated when profiling is compiled out.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_log {
    ($event:expr) => {
        $crate::profiling::record($event)
    };
    ($event:expr, meta = $meta:expr) => {
        $crate::profiling::record_with_meta($event, $meta)
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_log {
    ($($ignored:tt)*) => {};
}

/// Evaluate `$body`, recording how long it took under `$name`.
///
/// ```rust
/// let doubled = study_core::profile_scope!("double", 21 * 2);
/// assert_eq!(doubled, 42);
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr, $body:expr) => {{
        let _timer = $crate::profiling::ScopeTimer::start($name);
        $body
    }};
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr, $body:expr) => {
        $body
    };
}
