//! Replay runner - feeds recorded pushes through the trackers

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use owkit_app::telemetry::EVENTS_CATEGORY;
use owkit_app::{GameStatus, Settings, StatusEvent, StatusTopic, TelemetryAdapter, TelemetryTopic};
use owkit_core::prelude::*;
use owkit_core::ListenerRef;
use owkit_host::FEATURES_CATEGORY;
use tokio::sync::mpsc;

use super::{HostPush, ReplayEvent, ReplayHost};

const STATUS_TOPICS: [StatusTopic; 5] = [
    StatusTopic::Focus,
    StatusTopic::Running,
    StatusTopic::Resolution,
    StatusTopic::GameChanged,
    StatusTopic::Changed,
];

/// Counts reported when a replay ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub pushes: usize,
    pub changes: usize,
    /// Whether any negotiation was granted
    pub granted: bool,
}

/// Parse an NDJSON recording, skipping blank lines.
pub fn parse_pushes(text: &str) -> Result<Vec<HostPush>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|e| Error::host(format!("Invalid push on line {}: {}", index + 1, e)))
        })
        .collect()
}

/// Features to negotiate when none are given: every snapshot category in the
/// recording, plus the events category when it carries discrete events.
pub fn default_features(pushes: &[HostPush]) -> Vec<String> {
    let mut features = BTreeSet::new();
    for push in pushes {
        match push {
            HostPush::InfoUpdate(update) => {
                features.extend(
                    update
                        .info
                        .keys()
                        .filter(|category| category.as_str() != FEATURES_CATEGORY)
                        .cloned(),
                );
            }
            HostPush::NewEvents(events) if !events.events.is_empty() => {
                features.insert(EVENTS_CATEGORY.to_string());
            }
            _ => {}
        }
    }
    features.into_iter().collect()
}

/// Replay the recording at `path`, writing events to stdout.
pub async fn run_replay(
    path: &Path,
    settings: &Settings,
    features: Vec<String>,
) -> Result<ReplaySummary> {
    info!("═══════════════════════════════════════════════════════");
    info!("owkit replay: {}", path.display());
    info!("═══════════════════════════════════════════════════════");

    let text = std::fs::read_to_string(path)?;
    let pushes = parse_pushes(&text)?;

    let mut stdout = std::io::stdout();
    let summary = replay(&pushes, settings, features, &mut stdout).await?;
    stdout.flush()?;

    info!(
        "Replay finished: {} pushes, {} changes",
        summary.pushes, summary.changes
    );
    Ok(summary)
}

/// Feed `pushes` through a game status tracker and a game telemetry adapter.
///
/// The adapter is started when the game starts running and stopped when it
/// stops. Negotiation is attempted once per running period.
pub async fn replay<W: Write>(
    pushes: &[HostPush],
    settings: &Settings,
    features: Vec<String>,
    out: &mut W,
) -> Result<ReplaySummary> {
    let features = if features.is_empty() {
        default_features(pushes)
    } else {
        features
    };

    let host = Arc::new(ReplayHost::new());
    let status = GameStatus::new(host.clone());
    let adapter =
        TelemetryAdapter::for_game(host.clone(), features.clone(), &status, &settings.telemetry);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let listeners = ListenerRef::new();
    for topic in STATUS_TOPICS {
        let tx = tx.clone();
        status.emitter().add_listener_with_ref(
            topic,
            move |event: &StatusEvent| {
                let _ = tx.send(ReplayEvent::status(topic, event));
            },
            listeners,
        );
    }
    let changes_tx = tx.clone();
    adapter.emitter().add_listener_with_ref(
        TelemetryTopic::All,
        move |event| {
            let _ = changes_tx.send(ReplayEvent::change(event));
        },
        listeners,
    );

    ReplayEvent::started(&features, pushes.len()).write_to(out)?;
    status.start().await;

    let mut summary = ReplaySummary::default();
    let mut attempted = false;
    for push in pushes {
        host.deliver(push);
        summary.pushes += 1;

        if let HostPush::Error(error) = push {
            let _ = tx.send(ReplayEvent::host_error(&error.reason));
        }

        if status.is_running() {
            if !attempted && !adapter.is_running() {
                attempted = true;
                let granted = adapter.start().await;
                summary.granted |= granted;
                let _ = tx.send(ReplayEvent::negotiated(granted));
            }
        } else {
            attempted = false;
            if adapter.is_running() {
                adapter.stop().await;
                let _ = tx.send(ReplayEvent::telemetry_stopped());
            }
        }

        summary.changes += drain(&mut rx, out)?;
    }

    adapter.destroy().await;
    status.destroy().await;
    status.emitter().off_all(listeners);
    summary.changes += drain(&mut rx, out)?;

    ReplayEvent::finished(summary.pushes, summary.changes).write_to(out)?;
    Ok(summary)
}

/// Write queued events, returning how many were telemetry changes.
fn drain<W: Write>(rx: &mut mpsc::UnboundedReceiver<ReplayEvent>, out: &mut W) -> Result<usize> {
    let mut changes = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, ReplayEvent::Change { .. }) {
            changes += 1;
        }
        event.write_to(out)?;
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const SESSION: &str = r#"
{"type":"game_info","gameInfo":{"id":54421,"isRunning":true,"isInFocus":true},"runningChanged":true}
{"type":"info_update","info":{"match_info":{"kills":"1"}}}
{"type":"info_update","info":{"match_info":{"kills":"1"}}}
{"type":"info_update","info":{"match_info":{"kills":"2"}}}
{"type":"new_events","events":[{"name":"kill","data":"{\"total\":2}"}]}
{"type":"error","reason":"Feature unavailable"}
{"type":"game_info","gameInfo":null,"runningChanged":true}
"#;

    fn lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn of_kind<'a>(lines: &'a [Value], kind: &str) -> Vec<&'a Value> {
        lines.iter().filter(|line| line["event"] == kind).collect()
    }

    #[tokio::test]
    async fn test_replay_reports_changes_only() {
        let pushes = parse_pushes(SESSION).unwrap();
        let mut out = Vec::new();
        let summary = replay(&pushes, &Settings::default(), Vec::new(), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.pushes, 7);
        assert_eq!(summary.changes, 3);
        assert!(summary.granted);

        let lines = lines(&out);
        assert_eq!(lines.first().unwrap()["event"], "started");
        assert_eq!(lines.last().unwrap()["event"], "finished");

        let changes = of_kind(&lines, "change");
        assert_eq!(changes[0]["path"], "match_info.kills");
        assert_eq!(changes[0]["val"], 1);
        assert_eq!(changes[1]["val"], 2);
        assert_eq!(changes[2]["path"], "events.kill");
        assert_eq!(changes[2]["val"], json!({"total": 2}));

        assert_eq!(of_kind(&lines, "negotiated").len(), 1);
        assert_eq!(of_kind(&lines, "telemetry_stopped").len(), 1);
        assert_eq!(of_kind(&lines, "host_error")[0]["reason"], "Feature unavailable");

        let running: Vec<_> = of_kind(&lines, "status")
            .into_iter()
            .filter(|line| line["topic"] == "running")
            .collect();
        assert_eq!(running.len(), 2);
        assert_eq!(running[0]["id"], 5442);
        assert_eq!(running[1]["is_running"], false);
    }

    #[tokio::test]
    async fn test_snapshot_before_launch_is_seeded_on_start() {
        let pushes = parse_pushes(
            r#"{"type":"info_update","info":{"me":{"name":"\"player\""}}}
{"type":"game_info","gameInfo":{"id":10,"isRunning":true}}"#,
        )
        .unwrap();
        let mut out = Vec::new();
        let summary = replay(&pushes, &Settings::default(), Vec::new(), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.changes, 1);
        let lines = lines(&out);
        let changes = of_kind(&lines, "change");
        assert_eq!(changes[0]["path"], "me.name");
        assert_eq!(changes[0]["val"], "player");
    }

    #[tokio::test]
    async fn test_no_features_means_no_grant() {
        let pushes =
            parse_pushes(r#"{"type":"game_info","gameInfo":{"id":10,"isRunning":true}}"#).unwrap();
        let mut out = Vec::new();
        let summary = replay(&pushes, &Settings::default(), Vec::new(), &mut out)
            .await
            .unwrap();

        assert!(!summary.granted);
        assert_eq!(of_kind(&lines(&out), "negotiated")[0]["granted"], false);
    }

    #[test]
    fn test_default_features_from_recording() {
        let pushes = parse_pushes(SESSION).unwrap();
        assert_eq!(
            default_features(&pushes),
            vec!["events".to_string(), "match_info".to_string()]
        );
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_pushes("\n{\"type\":\"error\"}\n{oops}\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
    }
}
