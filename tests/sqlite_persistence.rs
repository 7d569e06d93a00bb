use std::sync::Arc;

use anyhow::Result;

use deskwatch::clock::ManualClock;
use deskwatch::detect::Detection;
use deskwatch::geometry::BoundingBox;
use deskwatch::session::{MonitorSession, SessionOptions};
use deskwatch::status::Status;
use deskwatch::storage::{ProductivityStore, SqliteProductivityStore};

fn working() -> Vec<Detection> {
    vec![
        Detection::person(BoundingBox::from_corners(0.0, 0.0, 100.0, 200.0), 0.9),
        Detection::head(BoundingBox::from_corners(20.0, 0.0, 80.0, 60.0), 0.7),
    ]
}

fn idle() -> Vec<Detection> {
    vec![Detection::person(
        BoundingBox::from_corners(0.0, 0.0, 100.0, 200.0),
        0.9,
    )]
}

fn options() -> SessionOptions {
    SessionOptions {
        window: 1,
        ..SessionOptions::default()
    }
}

#[test]
fn restart_resumes_totals_without_counting_downtime() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("deskwatch.db");
    let db_path = db_path.to_string_lossy().to_string();

    let clock = Arc::new(ManualClock::at_local_hour(9));
    {
        let mut store = SqliteProductivityStore::open(&db_path)?;
        let mut session = MonitorSession::new(options(), clock.clone());
        session.process_detections(&working(), &mut ());
        clock.advance_ms(120_000);
        session.process_detections(&idle(), &mut ());
        clock.advance_ms(60_000);
        session.process_detections(&idle(), &mut ());
        assert!(session.save_to(&mut store));
    }

    // Ten minutes of downtime.
    clock.advance_ms(600_000);

    let mut store = SqliteProductivityStore::open(&db_path)?;
    let mut session = MonitorSession::new(options(), clock.clone());
    assert!(session.restore_from(&mut store));
    assert_eq!(session.ledger().total_working_time, 120_000);
    // The idle span open at save time is kept up to the last frame.
    assert_eq!(session.ledger().total_idle_time, 60_000);
    assert_eq!(session.current_status(), None);
    // Hour buckets credit each gap to the status reached at its end.
    assert_eq!(session.hours()[9].working_time, 1_000);
    assert_eq!(session.hours()[9].idle_time, 180_000);

    clock.advance_ms(30_000);
    session.process_detections(&working(), &mut ());
    let summary = session.summary();
    assert_eq!(summary.current_status, Some(Status::Working));
    assert_eq!(summary.total_working_time, 120_000);
    // Idle reopened at restore; downtime is not counted.
    assert_eq!(summary.total_idle_time, 60_000 + 30_000);

    assert_eq!(store.list_dates()?, vec![session.date()]);
    Ok(())
}

#[test]
fn closed_days_are_kept_side_by_side() -> Result<()> {
    let mut store = SqliteProductivityStore::open_in_memory()?;
    let clock = Arc::new(ManualClock::at_local_hour(22));
    let mut session = MonitorSession::new(options(), clock.clone());

    session.process_detections(&working(), &mut ());
    clock.advance_ms(2 * 3_600_000);
    assert!(session.day_changed());
    let closed = session.close_day().expect("day closed");
    store.save(&closed)?;

    clock.advance_ms(3_600_000);
    session.process_detections(&idle(), &mut ());
    assert!(session.save_to(&mut store));

    let dates = store.list_dates()?;
    assert_eq!(dates.len(), 2);
    assert_eq!(dates[0].succ_opt(), Some(dates[1]));

    let first = store.load(dates[0])?.expect("first day");
    assert_eq!(first.summary.total_working_time, 2 * 3_600_000);
    let second = store.load(dates[1])?.expect("second day");
    // WORKING carries over midnight until the IDLE frame at 01:00.
    assert_eq!(second.summary.total_working_time, 3_600_000);
    assert_eq!(second.summary.total_idle_time, 0);
    assert_eq!(second.hourly_data[1].idle_time, 3_600_000);
    Ok(())
}
