use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use crate::media::MediaController;
use crate::state::{EventBus, EventFilter, NodeEvent};
use crate::sync::{Correction, SyncController, SyncMode, Thresholds, evaluate};
use crate::testing::SimulatedMedia;
use crate::types::CorrectionTuning;

const EPSILON: f64 = 1e-9;

fn controller_at(local: f64) -> (SyncController, Arc<SimulatedMedia>, EventBus) {
    let media = Arc::new(SimulatedMedia::new().with_frame_rate(60.0));
    media.set_position(local);
    let events = EventBus::new();
    let controller = SyncController::new(
        media.clone(),
        1.0,
        CorrectionTuning::default(),
        events.clone(),
    );
    (controller, media, events)
}

#[test]
fn test_thresholds_scale_with_rate() {
    let tuning = CorrectionTuning::default();
    let normal = Thresholds::new(1.0, Some(60.0), &tuning);
    assert!((normal.scrub - 1.0).abs() < EPSILON);
    assert!((normal.fine - 1.0 / 120.0).abs() < EPSILON);

    let double = Thresholds::new(2.0, Some(60.0), &tuning);
    assert!((double.scrub - 0.5).abs() < EPSILON);
    assert!((double.fine - 1.0 / 240.0).abs() < EPSILON);
}

#[test]
fn test_unknown_frame_rate_uses_default() {
    let tuning = CorrectionTuning::default();
    let unknown = Thresholds::new(1.0, None, &tuning);
    let bogus = Thresholds::new(1.0, Some(0.0), &tuning);
    assert!((unknown.fine - 1.0 / 120.0).abs() < EPSILON);
    assert_eq!(unknown, bogus);
}

#[test]
fn test_small_drift_is_locked() {
    let tuning = CorrectionTuning::default();
    let correction = evaluate(10.004, 10.0, 1.0, Some(60.0), &tuning);
    assert_eq!(correction, Correction::Locked { rate: 1.0 });
}

#[test]
fn test_negative_drift_slows_down() {
    let tuning = CorrectionTuning::default();
    let Correction::Nudge { rate } = evaluate(9.9, 10.0, 1.0, Some(60.0), &tuning) else {
        panic!("expected a nudge");
    };
    assert!((rate - (1.0 - 0.05 - 0.075)).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_a_nudges() {
    let (controller, media, _) = controller_at(9.950);

    let correction = controller.on_sync(10.000).await;

    let Correction::Nudge { rate } = correction else {
        panic!("expected a nudge, got {correction:?}");
    };
    assert!((rate - 1.0875).abs() < 1e-6);
    assert!((media.rate() - 1.0875).abs() < 1e-6);
    assert!(media.seeks().is_empty());

    let state = controller.state().await;
    assert_eq!(state.mode, SyncMode::Nudging);
    assert!(state.correction_deadline.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_b_scrubs() {
    let (controller, media, events) = controller_at(4.0);
    let mut sync_events = EventFilter::sync_events(&events);

    let correction = controller.on_sync(6.5).await;

    assert_eq!(
        correction,
        Correction::Scrub {
            seek_to: 6.5,
            rate: 1.0
        }
    );
    assert_eq!(media.seeks(), vec![6.5]);
    assert!((media.rate() - 1.0).abs() < EPSILON);
    assert_eq!(controller.state().await.mode, SyncMode::Locked);

    let event = sync_events.recv().await.unwrap();
    assert!(matches!(event, NodeEvent::CorrectionApplied { seeked: true, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_nudge_expires_to_nominal() {
    let (controller, media, events) = controller_at(9.950);
    let mut sync_events = EventFilter::sync_events(&events);

    controller.on_sync(10.000).await;
    assert!(matches!(
        sync_events.recv().await,
        Some(NodeEvent::CorrectionApplied { seeked: false, .. })
    ));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(
        sync_events.recv().await,
        Some(NodeEvent::CorrectionExpired { rate: 1.0 })
    );
    assert!((media.rate() - 1.0).abs() < EPSILON);
    let state = controller.state().await;
    assert_eq!(state.mode, SyncMode::Locked);
    assert_eq!(state.correction_deadline, None);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_nudge_replaces_window() {
    let (controller, media, _) = controller_at(9.950);
    controller.on_sync(10.000).await;

    tokio::time::sleep(Duration::from_millis(800)).await;
    // Keep the slave behind so the second sync nudges again
    media.set_position(19.950);
    controller.on_sync(20.000).await;

    // The first window would have expired here
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(controller.state().await.mode, SyncMode::Nudging);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(controller.state().await.mode, SyncMode::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_locked_sync_cancels_window() {
    let (controller, media, _) = controller_at(9.950);
    controller.on_sync(10.000).await;

    media.set_position(20.0);
    let correction = controller.on_sync(20.001).await;
    assert_eq!(correction, Correction::Locked { rate: 1.0 });
    assert_eq!(controller.state().await.correction_deadline, None);
}

#[tokio::test(start_paused = true)]
async fn test_set_nominal_rate() {
    let (controller, media, _) = controller_at(0.0);
    controller.set_nominal_rate(2.0).await;
    assert!((media.rate() - 2.0).abs() < EPSILON);

    // 0.6s of drift is beyond the 0.5s scrub threshold at double speed
    let correction = controller.on_sync(0.6).await;
    assert!(matches!(correction, Correction::Scrub { rate, .. } if (rate - 2.0).abs() < EPSILON));
}

proptest! {
    #[test]
    fn correction_matches_drift_band(
        local in 0.0f64..1000.0,
        diff in -3.0f64..3.0,
        nominal in 0.25f64..4.0,
    ) {
        let tuning = CorrectionTuning::default();
        let thresholds = Thresholds::new(nominal, Some(60.0), &tuning);
        let received = local + diff;
        let correction = evaluate(received, local, nominal, Some(60.0), &tuning);
        let drift = received - local;

        if drift.abs() > thresholds.scrub {
            prop_assert_eq!(correction, Correction::Scrub { seek_to: received, rate: nominal });
        } else if drift.abs() > thresholds.fine {
            let Correction::Nudge { rate } = correction else {
                return Err(TestCaseError::fail("expected nudge"));
            };
            let factor = rate / nominal - 1.0;
            prop_assert!(factor.abs() <= 0.8 + 1e-9);
            prop_assert_eq!(factor.signum(), drift.signum());
        } else {
            prop_assert_eq!(correction, Correction::Locked { rate: nominal });
        }
    }
}
