//! Records written to the profiling trace, one JSON object per line.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An event stamped with its wall-clock time.
#[derive(Serialize)]
pub struct ProfileEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Set for `TimedScope` events only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ProfileEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            duration_us: None,
            metadata: None,
        }
    }

    pub fn with_duration(event_type: EventType, duration: std::time::Duration) -> Self {
        Self {
            duration_us: Some(duration.as_micros() as u64),
            ..Self::new(event_type)
        }
    }

    pub fn with_metadata(event_type: EventType, metadata: serde_json::Value) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::new(event_type)
        }
    }
}

/// What happened. Serialized with a snake_case `type` tag.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    // Trace lifecycle
    SessionStart {
        session_id: String,
    },
    SessionEnd {
        total_events: u64,
    },

    // Scheduling
    ReviewScheduled {
        quality: u8,
        interval_before: f64,
        interval_after: f64,
        ease_factor: f64,
    },
    LeechFlagged {
        lapses: u32,
    },

    // Ability
    AbilityEstimated {
        sample_size: usize,
        ability: f64,
    },

    // Sessions
    SessionComposed {
        candidates: usize,
        selected: usize,
        estimated_time: f64,
    },

    TimedScope {
        name: String,
        duration_ms: u64,
    },

    /// Free-form event for ad-hoc tuning experiments
    Custom {
        name: String,
        data: serde_json::Value,
    },
}
