//! Full dashboard runs against the in-process simulated backend.

use std::io::Write;
use std::sync::{Arc, Mutex};
use stockpulse_core::api::{SimulatedBackend, SimulationSettings};
use stockpulse_core::domain::Company;
use stockpulse_core::notify::RecordingNotifier;
use stockpulse_core::render::{ChartFormatKind, JsonLinesSink};
use stockpulse_core::sync::{ManualClock, SyncState};
use stockpulse_core::testing::FrameLog;
use stockpulse_core::{DashboardConfig, DashboardView};

/// Writer that hands its bytes to a shared buffer.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn settings(steps: u32) -> SimulationSettings {
    SimulationSettings {
        steps_until_complete: steps,
        ..SimulationSettings::default()
    }
}

#[test]
fn simulated_run_completes_with_ordered_series() {
    let backend = Arc::new(SimulatedBackend::demo(42));
    let clock = Arc::new(ManualClock::at_epoch());
    let frames = FrameLog::new();
    let notes = RecordingNotifier::new();
    let mut view = DashboardView::new(
        backend,
        clock,
        Box::new(frames.clone()),
        Arc::new(notes.clone()),
        &DashboardConfig::default(),
    );

    view.mount(None).unwrap();
    view.run_until_settled(None);

    let session = view.session().unwrap();
    assert_eq!(session.company_id().as_str(), "acme");
    assert_eq!(session.state(), SyncState::Completed);
    assert!(notes.is_empty());
    for pair in session.series().samples().windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
    if let Some(last) = frames.last() {
        assert_eq!(last.points, session.series().points());
    }
}

#[test]
fn same_seed_gives_same_series() {
    let run = |seed: u64| {
        let mut view = DashboardView::new(
            Arc::new(SimulatedBackend::demo(seed)),
            Arc::new(ManualClock::at_epoch()),
            Box::new(FrameLog::new()),
            Arc::new(RecordingNotifier::new()),
            &DashboardConfig::default(),
        );
        view.mount(Some("globex")).unwrap();
        view.run_until_settled(None);
        view.session().unwrap().series().samples().to_vec()
    };
    assert_eq!(run(9), run(9));
}

#[test]
fn json_lines_output_tracks_frames() {
    let backend = Arc::new(SimulatedBackend::new(
        vec![Company::new("acme", "Acme Corp", "ACME")],
        settings(6),
        3,
    ));
    let buf = SharedBuf::default();
    let sink = JsonLinesSink::new(ChartFormatKind::Stock.format(), buf.clone());
    let mut view = DashboardView::new(
        backend,
        Arc::new(ManualClock::at_epoch()),
        Box::new(sink),
        Arc::new(RecordingNotifier::new()),
        &DashboardConfig::default(),
    );

    view.mount(None).unwrap();
    view.run_until_settled(None);
    let samples = view.session().unwrap().series().len();
    view.unmount();

    let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<serde_json::Value> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(!lines.is_empty());
    let last = lines.last().unwrap();
    assert_eq!(last["title"]["text"], "Acme Corp Stock Price");
    if samples == 0 {
        assert_eq!(last["placeholder"], true);
    } else {
        assert_eq!(last["series"][0]["data"].as_array().unwrap().len(), samples);
    }
}

#[test]
fn poll_limit_leaves_session_waiting() {
    let backend = Arc::new(SimulatedBackend::new(
        vec![Company::new("acme", "Acme Corp", "ACME")],
        settings(50),
        1,
    ));
    let mut view = DashboardView::new(
        backend,
        Arc::new(ManualClock::at_epoch()),
        Box::new(FrameLog::new()),
        Arc::new(RecordingNotifier::new()),
        &DashboardConfig::default(),
    );
    view.mount(None).unwrap();
    assert_eq!(view.run_until_settled(Some(3)), 3);
    assert_eq!(view.session().unwrap().state(), SyncState::Waiting);
    assert!(!view.is_settled());
}
