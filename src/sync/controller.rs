//! Slave-side drift correction
//!
//! Every `seek_to_time` received from the master is compared with the
//! local media clock. Small drift is ignored, medium drift is closed by
//! nudging the playback rate for a bounded window and large drift is closed
//! with a seek.

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::media::MediaController;
use crate::net::TimerHandle;
use crate::state::{EventBus, NodeEvent};
use crate::types::CorrectionTuning;

/// Outcome of comparing a received position with the local one
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Within half a frame: play at the nominal rate
    Locked {
        /// Rate to apply
        rate: f64,
    },
    /// Close the gap by playing faster or slower for a while
    Nudge {
        /// Rate to apply
        rate: f64,
    },
    /// Too far off: seek, then play at the nominal rate
    Scrub {
        /// Position to seek to
        seek_to: f64,
        /// Rate to apply after the seek
        rate: f64,
    },
}

impl Correction {
    /// Rate the media ends up at
    #[must_use]
    pub fn rate(&self) -> f64 {
        match *self {
            Self::Locked { rate } | Self::Nudge { rate } | Self::Scrub { rate, .. } => rate,
        }
    }
}

/// Drift thresholds in wall-clock seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Drift above which the slave seeks
    pub scrub: f64,
    /// Drift above which the slave nudges its rate
    pub fine: f64,
}

impl Thresholds {
    /// Thresholds for a stream played at `nominal_rate`
    ///
    /// Both scale inversely with the rate so tolerance is expressed in
    /// played-back time. `fine` is half a frame period, taken from
    /// `frame_rate` when the stream reports one.
    #[must_use]
    pub fn new(nominal_rate: f64, frame_rate: Option<f64>, tuning: &CorrectionTuning) -> Self {
        let fps = frame_rate
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .unwrap_or(tuning.default_frame_rate);
        let half_frame = 0.5 / fps;
        Self {
            scrub: tuning.scrub_threshold_secs / nominal_rate,
            fine: half_frame / nominal_rate,
        }
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        1.0
    }
}

/// Decide how to react to a received authoritative position
#[must_use]
pub fn evaluate(
    received: f64,
    local: f64,
    nominal_rate: f64,
    frame_rate: Option<f64>,
    tuning: &CorrectionTuning,
) -> Correction {
    let nominal = sanitize_rate(nominal_rate);
    let thresholds = Thresholds::new(nominal, frame_rate, tuning);
    let diff = received - local;

    if diff.abs() > thresholds.scrub {
        Correction::Scrub {
            seek_to: received,
            rate: nominal,
        }
    } else if diff.abs() > thresholds.fine {
        let rate = nominal
            * (1.0
                + diff.signum() * tuning.flat_gain
                + tuning.proportional_gain * diff / thresholds.scrub);
        Correction::Nudge { rate }
    } else {
        Correction::Locked { rate: nominal }
    }
}

/// Correction mode of a slave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Playing at the nominal rate
    #[default]
    Locked,
    /// Playing at a corrective rate until the window expires
    Nudging,
}

impl SyncMode {
    /// Lower-case name used in snapshots
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Nudging => "nudging",
        }
    }
}

/// Correction state of a slave session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncState {
    /// Rate requested by the master or the operator
    pub nominal_rate: f64,
    /// Rate currently applied to the media
    pub corrective_rate: f64,
    /// When the corrective rate reverts to nominal
    pub correction_deadline: Option<Instant>,
    /// Current mode
    pub mode: SyncMode,
}

impl SyncState {
    fn new(nominal_rate: f64) -> Self {
        Self {
            nominal_rate,
            corrective_rate: nominal_rate,
            correction_deadline: None,
            mode: SyncMode::Locked,
        }
    }

    fn lock(&mut self) {
        self.corrective_rate = self.nominal_rate;
        self.correction_deadline = None;
        self.mode = SyncMode::Locked;
    }
}

struct Session {
    state: SyncState,
    /// At most one armed expiry; replacing it cancels the previous one
    expiry: Option<TimerHandle>,
}

struct Inner {
    media: Arc<dyn MediaController>,
    tuning: CorrectionTuning,
    events: EventBus,
    session: Mutex<Session>,
}

/// Applies received sync positions to the local media
pub struct SyncController {
    inner: Arc<Inner>,
}

impl SyncController {
    /// Create a controller driving `media` at `nominal_rate`
    #[must_use]
    pub fn new(
        media: Arc<dyn MediaController>,
        nominal_rate: f64,
        tuning: CorrectionTuning,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                media,
                tuning,
                events,
                session: Mutex::new(Session {
                    state: SyncState::new(sanitize_rate(nominal_rate)),
                    expiry: None,
                }),
            }),
        }
    }

    /// Apply one authoritative position from the master
    pub async fn on_sync(&self, received: f64) -> Correction {
        let inner = &self.inner;
        let local = inner.media.current_time();
        let mut session = inner.session.lock().await;
        let correction = evaluate(
            received,
            local,
            session.state.nominal_rate,
            inner.media.frame_rate(),
            &inner.tuning,
        );
        let drift = received - local;

        match correction {
            Correction::Scrub { seek_to, rate } => {
                inner.media.seek_to_time(seek_to);
                inner.media.set_rate(rate);
                session.state.lock();
                session.expiry = None;
                tracing::debug!(drift, seek_to, "Scrubbing to master position");
                inner.events.emit(NodeEvent::CorrectionApplied {
                    drift,
                    rate,
                    seeked: true,
                });
            }
            Correction::Nudge { rate } => {
                inner.media.set_rate(rate);
                let deadline = Instant::now() + inner.tuning.window;
                session.state.corrective_rate = rate;
                session.state.correction_deadline = Some(deadline);
                session.state.mode = SyncMode::Nudging;
                session.expiry = Some(Self::arm_expiry(Arc::downgrade(inner), deadline));
                tracing::trace!(drift, rate, "Nudging rate");
                inner.events.emit(NodeEvent::CorrectionApplied {
                    drift,
                    rate,
                    seeked: false,
                });
            }
            Correction::Locked { rate } => {
                inner.media.set_rate(rate);
                session.state.lock();
                session.expiry = None;
            }
        }
        correction
    }

    fn arm_expiry(inner: Weak<Inner>, deadline: Instant) -> TimerHandle {
        TimerHandle::after(deadline.saturating_duration_since(Instant::now()), async move {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut session = inner.session.lock().await;
            // A fresher correction may have replaced this window while we waited
            if session.state.correction_deadline != Some(deadline) {
                return;
            }
            let nominal = session.state.nominal_rate;
            session.state.lock();
            inner.media.set_rate(nominal);
            tracing::debug!(rate = nominal, "Correction window expired");
            inner.events.emit(NodeEvent::CorrectionExpired { rate: nominal });
        })
    }

    /// Change the nominal rate and play at it immediately
    pub async fn set_nominal_rate(&self, rate: f64) {
        let rate = sanitize_rate(rate);
        let mut session = self.inner.session.lock().await;
        session.state.nominal_rate = rate;
        session.state.lock();
        session.expiry = None;
        self.inner.media.set_rate(rate);
    }

    /// Drop any active correction and return to the nominal rate
    pub async fn reset(&self) {
        let mut session = self.inner.session.lock().await;
        session.state.lock();
        session.expiry = None;
        self.inner.media.set_rate(session.state.nominal_rate);
    }

    /// Copy of the current correction state
    pub async fn state(&self) -> SyncState {
        self.inner.session.lock().await.state
    }

    /// Tuning in use
    #[must_use]
    pub fn tuning(&self) -> &CorrectionTuning {
        &self.inner.tuning
    }
}
