//! Capability interfaces a host platform provides to a session
//!
//! Each capability is optional. A session probes them in a fixed order and
//! never touches one that is absent.
//!
//! Implementations hand listeners to the platform's event machinery and must
//! follow two rules:
//!
//! - never invoke a listener from inside the call that registers it;
//! - tolerate listeners being added or removed while an event is being
//!   dispatched, and skip a listener removed during that dispatch.

use alloc::rc::Rc;

use crate::error::PositionError;
use crate::types::{OrientationEvent, Position, PositionOptions, Token};

/// Listener for heading values from a native bridge
pub type HeadingListener = Rc<dyn Fn(f32)>;
/// Listener for device orientation events
pub type OrientationListener = Rc<dyn Fn(&OrientationEvent)>;
/// Listener for position fixes
pub type PositionListener = Rc<dyn Fn(&Position)>;
/// Listener for positioning failures
pub type PositionErrorListener = Rc<dyn Fn(&PositionError)>;

/// Native compass bridge reporting heading degrees directly
pub trait NativeCompass {
    fn watch_heading(&self, listener: HeadingListener) -> Token;
    fn clear_watch(&self, token: Token);
}

/// Stream of device orientation events
pub trait OrientationSource {
    fn add_listener(&self, listener: OrientationListener) -> Token;
    fn remove_listener(&self, token: Token);
}

/// Positioning service
pub trait PositionService {
    fn watch_position(
        &self,
        on_position: PositionListener,
        on_error: PositionErrorListener,
        options: PositionOptions,
    ) -> Token;
    fn clear_watch(&self, token: Token);
}

/// Set of capabilities available to a session
///
/// # Example
/// ```
/// use heading_source::Capabilities;
///
/// // A desktop browser: no compass, no orientation, no GPS
/// let capabilities = Capabilities::none();
/// assert!(capabilities.native.is_none());
/// ```
#[derive(Clone, Default)]
pub struct Capabilities {
    pub native: Option<Rc<dyn NativeCompass>>,
    pub orientation: Option<Rc<dyn OrientationSource>>,
    pub position: Option<Rc<dyn PositionService>>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_native(mut self, native: Rc<dyn NativeCompass>) -> Self {
        self.native = Some(native);
        self
    }

    pub fn with_orientation(mut self, orientation: Rc<dyn OrientationSource>) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn with_position(mut self, position: Rc<dyn PositionService>) -> Self {
        self.position = Some(position);
        self
    }
}
