//! Replay mode - drive the trackers from a recorded host session
//!
//! Reads newline-delimited host pushes, feeds them through a
//! [`GameStatus`](owkit_app::GameStatus) tracker and a game
//! [`TelemetryAdapter`](owkit_app::TelemetryAdapter), and writes every change
//! they emit to stdout as NDJSON.
//!
//! # Input Format
//!
//! One push per line, tagged by `type`. Payload fields use the host's
//! camelCase names:
//!
//! ```json
//! {"type":"game_info","gameInfo":{"id":54421,"isRunning":true,"isInFocus":true},"runningChanged":true}
//! {"type":"info_update","info":{"match_info":{"kills":"3"}}}
//! {"type":"new_events","events":[{"name":"kill","data":"{\"total\":3}"}]}
//! {"type":"error","reason":"Feature unavailable"}
//! ```
//!
//! # Output Format
//!
//! ```json
//! {"event":"status","topic":"running","is_running":true,"is_in_focus":true,"id":5442,"timestamp":1704700001000}
//! {"event":"change","path":"match_info.kills","val":3,"timestamp":1704700002000}
//! ```

pub mod host;
pub mod runner;

use std::io::Write;

use chrono::Utc;
use owkit_app::{StatusEvent, StatusTopic, TelemetryEvent, TelemetryPath};
use owkit_core::prelude::*;
use owkit_host::{GameInfoUpdatedEvent, InfoUpdate, NewEvents, TelemetryError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use host::ReplayHost;
pub use runner::{parse_pushes, replay, run_replay, ReplaySummary};

/// One recorded host push
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostPush {
    GameInfo(GameInfoUpdatedEvent),
    InfoUpdate(InfoUpdate),
    NewEvents(NewEvents),
    Error(TelemetryError),
}

/// Events written in replay mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// Replay began
    Started {
        features: Vec<String>,
        pushes: usize,
        timestamp: i64,
    },

    /// Game status tracker emitted a topic
    Status {
        topic: StatusTopic,
        is_running: bool,
        is_in_focus: bool,
        id: Option<i64>,
        timestamp: i64,
    },

    /// Feature negotiation finished
    Negotiated { granted: bool, timestamp: i64 },

    /// Telemetry adapter stopped with the game
    TelemetryStopped { timestamp: i64 },

    /// A telemetry value changed
    Change {
        path: TelemetryPath,
        val: Value,
        timestamp: i64,
    },

    /// The host reported an out-of-band error
    HostError { reason: String, timestamp: i64 },

    /// Replay ended
    Finished {
        pushes: usize,
        changes: usize,
        timestamp: i64,
    },
}

impl ReplayEvent {
    /// Write this event as one NDJSON line.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        serde_json::to_writer(&mut *out, self)?;
        writeln!(out)?;
        Ok(())
    }

    /// Current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn started(features: &[String], pushes: usize) -> Self {
        Self::Started {
            features: features.to_vec(),
            pushes,
            timestamp: Self::now(),
        }
    }

    pub fn status(topic: StatusTopic, event: &StatusEvent) -> Self {
        Self::Status {
            topic,
            is_running: event.is_running,
            is_in_focus: event.is_in_focus,
            id: event.id,
            timestamp: Self::now(),
        }
    }

    pub fn negotiated(granted: bool) -> Self {
        Self::Negotiated {
            granted,
            timestamp: Self::now(),
        }
    }

    pub fn telemetry_stopped() -> Self {
        Self::TelemetryStopped {
            timestamp: Self::now(),
        }
    }

    pub fn change(event: &TelemetryEvent) -> Self {
        Self::Change {
            path: event.path.clone(),
            val: event.val.clone(),
            timestamp: Self::now(),
        }
    }

    pub fn host_error(reason: &str) -> Self {
        Self::HostError {
            reason: reason.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn finished(pushes: usize, changes: usize) -> Self {
        Self::Finished {
            pushes,
            changes,
            timestamp: Self::now(),
        }
    }
}
