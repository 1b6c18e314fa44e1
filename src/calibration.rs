//! GPS-assisted heading calibration
//!
//! When a device reports orientation angles but no absolute compass heading,
//! the angle's zero point is arbitrary. Walking in a straight line while
//! holding the device ahead lets the GPS heading of travel stand in for true
//! heading, and the difference to the raw angle becomes a constant offset.

use crate::types::Position;

/// Ground speed in m/s a fix must exceed before its heading is trusted
pub const DEFAULT_MIN_SPEED: f32 = 1.0;

/// Calibration state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationState {
    /// Not started
    #[default]
    Idle,
    /// Waiting for a fix that carries a heading
    AwaitingFirstFix,
    /// GPS heading available, waiting for the user to move fast enough
    AwaitingMovement,
    /// Offset computed
    Resolved,
    /// Positioning failed, no offset
    Aborted,
}

/// Outcome of feeding one fix into [`GpsCalibration::update`]
///
/// A single fix can both end the wait for the first heading and complete
/// calibration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationProgress {
    /// The fix was the first one carrying a heading
    pub needs_movement: bool,
    /// The fix completed calibration with this offset
    pub offset: Option<f32>,
}

/// Offset estimator between the raw orientation angle and GPS heading
///
/// # Example
/// ```
/// use heading_source::{GpsCalibration, CalibrationState, Position};
///
/// let mut calibration = GpsCalibration::default();
/// calibration.start();
/// calibration.record_angle(Some(10.0));
///
/// let progress = calibration.update(&Position::new(0.0, 0.0).with_heading(95.0).with_speed(1.5));
/// assert_eq!(progress.offset, Some(85.0));
/// assert_eq!(calibration.state(), CalibrationState::Resolved);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GpsCalibration {
    min_speed: f32,
    state: CalibrationState,
    latest_angle: Option<f32>,
    offset: Option<f32>,
}

impl GpsCalibration {
    pub fn new(min_speed: f32) -> Self {
        Self {
            min_speed,
            state: CalibrationState::Idle,
            latest_angle: None,
            offset: None,
        }
    }

    /// Leave `Idle` and start waiting for fixes
    ///
    /// Returns false if the procedure was already started.
    pub fn start(&mut self) -> bool {
        if self.state != CalibrationState::Idle {
            return false;
        }
        self.state = CalibrationState::AwaitingFirstFix;
        true
    }

    /// Overwrite the latest raw orientation angle
    ///
    /// Only one angle is kept. An event without an angle clears it.
    pub fn record_angle(&mut self, alpha: Option<f32>) {
        if self.is_active() {
            self.latest_angle = alpha;
        }
    }

    /// Feed a position fix
    pub fn update(&mut self, fix: &Position) -> CalibrationProgress {
        let mut progress = CalibrationProgress::default();
        if !self.is_active() {
            return progress;
        }

        // Fixes from network positioning carry no heading
        let Some(heading) = fix.heading() else {
            return progress;
        };

        if self.state == CalibrationState::AwaitingFirstFix {
            self.state = CalibrationState::AwaitingMovement;
            progress.needs_movement = true;
        }

        let moving = fix.speed.is_some_and(|speed| speed > self.min_speed);
        if let (true, Some(angle)) = (moving, self.latest_angle) {
            let offset = heading - angle;
            self.offset = Some(offset);
            self.state = CalibrationState::Resolved;
            progress.offset = Some(offset);
        }

        progress
    }

    /// Stop after a positioning failure or when the session is torn down
    ///
    /// Returns false if the procedure was not running.
    pub fn abort(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = CalibrationState::Aborted;
        true
    }

    /// Whether fixes are still being consumed
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            CalibrationState::AwaitingFirstFix | CalibrationState::AwaitingMovement
        )
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn latest_angle(&self) -> Option<f32> {
        self.latest_angle
    }

    /// Computed offset, once resolved
    pub fn offset(&self) -> Option<f32> {
        self.offset
    }

    pub fn min_speed(&self) -> f32 {
        self.min_speed
    }
}

impl Default for GpsCalibration {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPEED)
    }
}
