#![no_std]

//! Heading Source - a unified compass heading API for mobile devices
//!
//! Phones expose compass heading in different ways, or not at all. This
//! library probes the capabilities a host platform provides, settles once on
//! the best mechanism, and exposes a single "watch heading" API on top of it.
//!
//! # Sources
//!
//! - **Native bridge**: a native API that reports heading degrees directly
//! - **Orientation sensor**: a proprietary compass heading field carried by
//!   device orientation events
//! - **Orientation with GPS correction**: when orientation events only carry
//!   a relative angle, the user walks a few steps and the GPS heading of
//!   travel is used to measure the angle's offset from north
//!
//! Platform capabilities are injected through the traits in [`platform`], so
//! the same session logic runs in a WebAssembly host, a native app shell, or
//! against fakes in tests.
//!
//! # Quick Start
//!
//! ```rust
//! use heading_source::{Capabilities, HeadingSession};
//!
//! // Capabilities come from the host: native bridge, orientation events, GPS
//! let session = HeadingSession::new(Capabilities::none());
//!
//! session.need_gps(|| println!("Go outside to get a GPS signal"));
//! session.need_move(|| println!("Walk forward holding the phone straight ahead"));
//! session.no_support(|| println!("No compass on this device"));
//!
//! let id = session.watch(|heading| println!("Heading: {heading:.1}°"));
//! session.init(|method| println!("Compass by {method}"));
//!
//! session.unwatch(id);
//! ```

extern crate alloc;

pub mod calibration;
mod error;
mod math;
mod milestone;
pub mod platform;
mod session;
mod types;

// Re-export all public types and functions
pub use calibration::{CalibrationProgress, CalibrationState, GpsCalibration};
pub use error::PositionError;
pub use math::{FULL_TURN, correct_heading, normalize_degrees};
pub use platform::{
    Capabilities, HeadingListener, NativeCompass, OrientationListener, OrientationSource,
    PositionErrorListener, PositionListener, PositionService,
};
pub use session::HeadingSession;
pub use types::*;
