//! End-to-end supervision scenarios against real `/bin/sh` children.
#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agentvisor::{
    AgentConfig, Event, EventKind, Extension, FixedPath, HardwareAgentExtension, Host,
    RestartPolicy, ShutdownOutcome, Supervisor, SupervisorConfig, SupervisorError,
    SupervisorState,
};
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("agentvisor=debug"))
        .with_test_writer()
        .try_init();
}

/// `sh -c <script> sh <args...>`: the extra args land in `$1`, `$2`, ...
fn shell(script: &str, args: &[&str], delay: Duration, retries: i64) -> SupervisorConfig {
    let mut argv = vec!["-c".to_string(), script.to_string(), "sh".to_string()];
    argv.extend(args.iter().map(|a| a.to_string()));
    SupervisorConfig::new(FixedPath::new("/bin/sh"))
        .with_args(argv)
        .with_restart(RestartPolicy::new(delay, retries))
}

async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} event"))
}

/// Collects events until (and including) the loop's `Stopped` event.
async fn until_stopped(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    timeout(WAIT, async {
        let mut seen = Vec::new();
        while let Ok(ev) = rx.recv().await {
            let done = ev.kind == EventKind::Stopped;
            seen.push(ev);
            if done {
                break;
            }
        }
        seen
    })
    .await
    .expect("supervisor did not stop")
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn no_retries_means_single_attempt() {
    init_tracing();
    let sup = Supervisor::new(shell("exit 1", &[], Duration::from_millis(10), 0));
    let mut rx = sup.subscribe();

    sup.start(None).unwrap();
    let events = until_stopped(&mut rx).await;

    assert_eq!(count(&events, EventKind::ProcessStarting), 1);
    assert_eq!(count(&events, EventKind::ProcessExited), 1);
    assert_eq!(count(&events, EventKind::RestartScheduled), 0);
    assert_eq!(count(&events, EventKind::RetriesExhausted), 1);
    sup.stopped().await;
    assert_eq!(sup.state(), SupervisorState::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_budget_allows_n_plus_one_attempts() {
    init_tracing();
    let sup = Supervisor::new(shell("exit 7", &[], Duration::from_millis(10), 3));
    let mut rx = sup.subscribe();

    sup.start(None).unwrap();
    let events = until_stopped(&mut rx).await;

    assert_eq!(count(&events, EventKind::ProcessStarting), 4);
    assert_eq!(count(&events, EventKind::RestartScheduled), 3);
    let died: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::RetriesExhausted)
        .collect();
    assert_eq!(died.len(), 1);
    assert_eq!(died[0].attempt, Some(4));
    assert!(died[0].reason.as_deref().unwrap_or("").contains("exit status: 7"));
}

#[tokio::test(flavor = "multi_thread")]
async fn recovers_after_two_failures_and_keeps_running() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("runs");
    let script = r#"n=$(cat "$1" 2>/dev/null || echo 0); n=$((n+1)); echo "$n" > "$1"; [ "$n" -le 2 ] && exit 1; exec sleep 30"#;
    let sup = Supervisor::new(shell(
        script,
        &[counter.to_str().unwrap()],
        Duration::from_millis(20),
        2,
    ));
    let mut rx = sup.subscribe();

    sup.start(None).unwrap();
    for attempt in 1..=3 {
        let started = next_of(&mut rx, EventKind::ProcessStarted).await;
        assert_eq!(started.attempt, Some(attempt));
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sup.state(), SupervisorState::Running);
    assert_eq!(read_lines(&counter), vec!["3"]);

    assert_eq!(sup.shutdown().await, ShutdownOutcome::Completed);
    assert_eq!(sup.state(), SupervisorState::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn restart_waits_for_the_delay() {
    init_tracing();
    let delay = Duration::from_millis(200);
    let sup = Supervisor::new(shell("exit 1", &[], delay, 1));
    let mut rx = sup.subscribe();

    sup.start(None).unwrap();
    let events = until_stopped(&mut rx).await;

    let crashes: Vec<Instant> = events
        .iter()
        .filter(|e| e.kind == EventKind::ProcessExited)
        .map(|e| e.instant)
        .collect();
    let starts: Vec<Instant> = events
        .iter()
        .filter(|e| e.kind == EventKind::ProcessStarting)
        .map(|e| e.instant)
        .collect();
    assert_eq!(starts.len(), 2);
    assert!(starts[1].duration_since(crashes[0]) >= delay);
    assert!(starts[1].duration_since(starts[0]) >= delay);
}

#[tokio::test(flavor = "multi_thread")]
async fn unlimited_retries_keep_restarting() {
    init_tracing();
    let sup = Supervisor::new(shell("exit 1", &[], Duration::from_millis(20), -1));
    let mut rx = sup.subscribe();

    sup.start(None).unwrap();
    for _ in 0..6 {
        next_of(&mut rx, EventKind::RestartScheduled).await;
    }
    assert!(!sup.is_stopped());

    assert_eq!(sup.shutdown().await, ShutdownOutcome::Completed);
    let rest = until_stopped(&mut rx).await;
    assert_eq!(count(&rest, EventKind::RetriesExhausted), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_sends_one_signal_and_never_restarts() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("signals");
    let script = r#"trap 'echo term >> "$1"; exit 0' TERM; echo ready >> "$1"; while true; do sleep 0.05; done"#;
    let sup = Supervisor::new(shell(
        script,
        &[log.to_str().unwrap()],
        Duration::from_millis(10),
        -1,
    ));
    let mut rx = sup.subscribe();

    sup.start(None).unwrap();
    next_of(&mut rx, EventKind::ProcessStarted).await;
    timeout(WAIT, async {
        while read_lines(&log).is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(sup.shutdown().await, ShutdownOutcome::Completed);
    assert_eq!(sup.state(), SupervisorState::Stopped);

    let after = until_stopped(&mut rx).await;
    assert_eq!(count(&after, EventKind::TerminateSent), 1);
    assert_eq!(count(&after, EventKind::ProcessStarting), 0);
    assert_eq!(count(&after, EventKind::RestartScheduled), 0);
    assert_eq!(read_lines(&log), vec!["ready", "term"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn exit_racing_shutdown_is_not_restarted() {
    init_tracing();
    let sup = Supervisor::new(shell("sleep 0.1; exit 1", &[], Duration::from_secs(1), -1));
    let mut rx = sup.subscribe();

    sup.start(None).unwrap();
    next_of(&mut rx, EventKind::ProcessStarted).await;
    tokio::time::sleep(Duration::from_millis(90)).await;

    assert_eq!(sup.shutdown().await, ShutdownOutcome::Completed);
    let events = until_stopped(&mut rx).await;
    let requested = events
        .iter()
        .position(|e| e.kind == EventKind::ShutdownRequested)
        .unwrap();
    assert_eq!(count(&events[requested..], EventKind::ProcessStarting), 0);
    assert_eq!(count(&events[requested..], EventKind::RestartScheduled), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn ignored_signal_exceeds_grace_without_hanging() {
    init_tracing();
    let cfg = shell("trap '' TERM; sleep 1.5", &[], Duration::from_millis(10), -1)
        .with_grace(Duration::from_millis(300));
    let sup = Supervisor::new(cfg);
    let mut rx = sup.subscribe();

    sup.start(None).unwrap();
    next_of(&mut rx, EventKind::ProcessStarted).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let outcome = timeout(Duration::from_secs(1), sup.shutdown())
        .await
        .expect("shutdown must return after the grace period");
    assert_eq!(outcome, ShutdownOutcome::GraceExceeded);
    assert_eq!(sup.state(), SupervisorState::ShuttingDown);
    assert!(!sup.is_stopped());

    timeout(WAIT, sup.stopped()).await.unwrap();
    assert_eq!(sup.state(), SupervisorState::Stopped);
    let rest = until_stopped(&mut rx).await;
    assert_eq!(count(&rest, EventKind::ProcessStarting), 0);
}

#[test]
fn stubborn_agent_does_not_hold_up_runtime_drop() {
    init_tracing();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let sup = rt.block_on(async {
        let cfg = shell("trap '' TERM; sleep 5", &[], Duration::from_millis(10), -1)
            .with_grace(Duration::from_millis(200));
        let sup = Supervisor::new(cfg);
        let mut rx = sup.subscribe();
        sup.start(None).unwrap();
        next_of(&mut rx, EventKind::ProcessStarted).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sup.shutdown().await, ShutdownOutcome::GraceExceeded);
        sup
    });

    let dropping = Instant::now();
    drop(rt);
    assert!(
        dropping.elapsed() < Duration::from_secs(2),
        "runtime drop took {:?}",
        dropping.elapsed()
    );
    assert_eq!(sup.state(), SupervisorState::ShuttingDown);
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_marker_releases_every_waiter() {
    init_tracing();
    let sup = Arc::new(Supervisor::new(shell("exec sleep 30", &[], Duration::from_millis(10), 0)));
    let mut rx = sup.subscribe();
    sup.start(None).unwrap();
    next_of(&mut rx, EventKind::ProcessStarted).await;

    let waiters: Vec<_> = (0..2)
        .map(|_| {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.stopped().await })
        })
        .collect();

    assert!(sup.shutdown().await.is_completed());
    for waiter in waiters {
        timeout(WAIT, waiter).await.unwrap().unwrap();
    }
    assert!(sup.is_stopped());
    // A second shutdown finds the marker already closed.
    assert_eq!(sup.shutdown().await, ShutdownOutcome::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn state_watch_reports_transitions() {
    init_tracing();
    let sup = Supervisor::new(shell("exit 1", &[], Duration::from_millis(50), 1));
    let mut state = sup.watch_state();
    sup.start(None).unwrap();

    let mut seen = vec![*state.borrow_and_update()];
    timeout(WAIT, async {
        while state.changed().await.is_ok() {
            let s = *state.borrow_and_update();
            seen.push(s);
            if s.is_terminal() {
                break;
            }
        }
    })
    .await
    .unwrap();

    assert!(seen.contains(&SupervisorState::Restarting));
    assert_eq!(seen.last(), Some(&SupervisorState::Stopped));
}

struct CountingHost(std::sync::Mutex<Vec<&'static str>>);

impl Host for CountingHost {
    fn report_fatal_error(&self, err: &SupervisorError) {
        self.0.lock().unwrap().push(err.as_label());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn extension_passes_grpc_endpoint_to_agent() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("argv0");
    let cfg: AgentConfig = serde_json::from_value(serde_json::json!({
        "executable": "/bin/sh",
        "extra_args": ["-c", format!("printf '%s\\n' \"$0\" > '{}'; exec sleep 30", out.display())],
        "grpc": "127.0.0.1:4317",
        "restart_delay": "50ms",
        "retries": 0,
    }))
    .unwrap();
    let ext = HardwareAgentExtension::new(&cfg);
    let mut rx = ext.supervisor().subscribe();
    let host = Arc::new(CountingHost(Default::default()));

    ext.start(host.clone()).await.unwrap();
    next_of(&mut rx, EventKind::ProcessStarted).await;
    timeout(WAIT, async {
        while read_lines(&out).is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(read_lines(&out), vec!["--grpc=127.0.0.1:4317"]);

    ext.shutdown().await.unwrap();
    assert_eq!(ext.supervisor().state(), SupervisorState::Stopped);
    assert!(host.0.lock().unwrap().is_empty());
}
