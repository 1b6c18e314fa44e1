//! Core types and settings for the heading-source library

use core::fmt;

use nalgebra::Vector3;

use crate::calibration::DEFAULT_MIN_SPEED;

/// Mechanism a session uses to obtain compass heading
///
/// Resolved exactly once per [`HeadingSession`](crate::HeadingSession) and
/// never changed afterwards.
///
/// # Example
/// ```
/// use heading_source::Method;
///
/// assert_eq!(Method::NativeBridge.as_str(), "nativeBridge");
/// assert!(!Method::Unavailable.is_available());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Heading reported directly by a native bridge API
    NativeBridge,
    /// Heading taken from the proprietary compass field of orientation events
    OrientationSensor,
    /// Orientation angle corrected by an offset measured against GPS heading
    OrientationWithGpsCorrection,
    /// No way to obtain heading on this device
    Unavailable,
}

impl Method {
    /// Stable tag for the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::NativeBridge => "nativeBridge",
            Method::OrientationSensor => "orientationSensor",
            Method::OrientationWithGpsCorrection => "orientationWithGpsCorrection",
            Method::Unavailable => "unavailable",
        }
    }

    /// Whether the method can deliver heading values
    pub fn is_available(&self) -> bool {
        !matches!(self, Method::Unavailable)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier returned by [`HeadingSession::watch`](crate::HeadingSession::watch)
///
/// Identifiers increase monotonically for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(pub(crate) u64);

impl WatchId {
    /// Rebuild an identifier from its raw value, e.g. one handed across an
    /// FFI boundary
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value of the identifier
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Handle for a subscription held by a platform capability
///
/// Capability implementations hand these out from their registration calls
/// and receive them back on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u64);

/// Device orientation event
///
/// Carries the optional proprietary compass heading and the standard
/// orientation angles (alpha, beta, gamma) in degrees.
///
/// # Example
/// ```
/// use heading_source::OrientationEvent;
///
/// let event = OrientationEvent::from_angles(15.0, 0.0, 0.0);
/// assert_eq!(event.alpha(), Some(15.0));
/// assert_eq!(event.compass_heading, None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationEvent {
    /// Proprietary compass heading in degrees from magnetic north
    pub compass_heading: Option<f32>,
    /// Orientation angles (alpha, beta, gamma) in degrees
    pub angles: Option<Vector3<f32>>,
}

impl OrientationEvent {
    /// Event carrying only orientation angles
    pub fn from_angles(alpha: f32, beta: f32, gamma: f32) -> Self {
        Self {
            compass_heading: None,
            angles: Some(Vector3::new(alpha, beta, gamma)),
        }
    }

    /// Event carrying a proprietary compass heading
    pub fn with_compass_heading(mut self, heading: f32) -> Self {
        self.compass_heading = Some(heading);
        self
    }

    /// Rotation around the vertical axis, if the event has angles
    pub fn alpha(&self) -> Option<f32> {
        self.angles.map(|angles| angles.x)
    }
}

/// Position fix reported by a positioning service
///
/// # Example
/// ```
/// use heading_source::Position;
///
/// let fix = Position::new(52.37, 4.89).with_heading(90.0).with_speed(1.5);
/// assert_eq!(fix.heading(), Some(90.0));
///
/// // Stationary devices report a NaN heading
/// let still = Position::new(52.37, 4.89).with_heading(f32::NAN);
/// assert_eq!(still.heading(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Horizontal accuracy in metres
    pub accuracy: f64,
    /// Direction of travel in degrees clockwise from true north
    pub heading: Option<f32>,
    /// Ground speed in metres per second
    pub speed: Option<f32>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn with_heading(mut self, heading: f32) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Heading derived from movement, if the fix carries a usable one
    pub fn heading(&self) -> Option<f32> {
        self.heading.filter(|heading| !heading.is_nan())
    }
}

/// Options passed to [`PositionService::watch_position`](crate::PositionService::watch_position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionOptions {
    /// Request the most accurate fixes the device can provide
    pub high_accuracy: bool,
}

/// Session settings
///
/// # Example
/// ```
/// use heading_source::SessionSettings;
///
/// let settings = SessionSettings {
///     min_calibration_speed: 1.5,   // require a brisk walk
///     ..Default::default()
/// };
/// assert!(settings.high_accuracy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    /// Ground speed in m/s a fix must exceed before its heading is trusted
    /// for calibration
    pub min_calibration_speed: f32,
    /// Request high accuracy fixes during calibration
    pub high_accuracy: bool,
    /// Wrap GPS-corrected headings into `[0, 360)`. Off by default, so
    /// watchers receive the raw `alpha + offset` sum
    pub wrap_corrected_heading: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            min_calibration_speed: DEFAULT_MIN_SPEED,
            high_accuracy: true,
            wrap_corrected_heading: false,
        }
    }
}
