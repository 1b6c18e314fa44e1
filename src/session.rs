//! Heading source detection and unified heading watching
//!
//! A [`HeadingSession`] decides once which mechanism can report compass
//! heading, then attaches watchers to it. Detection tries, in order:
//!
//! 1. a native compass bridge;
//! 2. the proprietary compass field of the first orientation event;
//! 3. the orientation angle of that event, calibrated against GPS heading
//!    while the user walks (see [`GpsCalibration`]);
//!
//! and otherwise settles on [`Method::Unavailable`].
//!
//! # Example
//! ```
//! use heading_source::{Capabilities, HeadingSession, Method};
//!
//! let session = HeadingSession::new(Capabilities::none());
//! session.no_support(|| println!("hide the compass"));
//! session.init(|method| println!("compass by {method}"));
//!
//! assert_eq!(session.method(), Some(Method::Unavailable));
//! ```

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::mem;

use tracing::{debug, info, trace, warn};

use crate::calibration::{CalibrationState, GpsCalibration};
use crate::error::PositionError;
use crate::math::correct_heading;
use crate::milestone::{Milestone, Observer, notify};
use crate::platform::{
    Capabilities, HeadingListener, OrientationListener, PositionErrorListener, PositionListener,
};
use crate::types::{
    Method, OrientationEvent, Position, PositionOptions, SessionSettings, Token, WatchId,
};

type WatchCallback = Rc<RefCell<dyn FnMut(f32)>>;

/// Platform subscription backing one watcher
#[derive(Debug, Clone, Copy)]
enum Subscription {
    Native(Token),
    Orientation(Token),
}

/// Platform subscriptions held while calibrating
#[derive(Debug, Default)]
struct CalibrationResources {
    recorder: Option<Token>,
    position_watch: Option<Token>,
}

struct SessionState {
    detecting: bool,
    torn_down: bool,
    last_id: u64,
    /// Offset between orientation angle and GPS heading
    offset: Option<f32>,
    /// Listener waiting for the first orientation event
    probe: Option<Token>,
    calibration: Option<GpsCalibration>,
    /// Present only while calibration is running
    calibration_resources: Option<CalibrationResources>,
    watchers: BTreeMap<WatchId, Subscription>,
    initialized: Milestone<Method>,
    needs_gps: Milestone<()>,
    needs_movement: Milestone<()>,
    unsupported: Milestone<()>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            detecting: false,
            torn_down: false,
            last_id: 0,
            offset: None,
            probe: None,
            calibration: None,
            calibration_resources: None,
            watchers: BTreeMap::new(),
            initialized: Milestone::new(),
            needs_gps: Milestone::new(),
            needs_movement: Milestone::new(),
            unsupported: Milestone::new(),
        }
    }
}

struct Inner {
    settings: SessionSettings,
    capabilities: Capabilities,
    state: RefCell<SessionState>,
}

/// Heading source manager
///
/// Cloning yields another handle to the same session. All interaction
/// happens on one thread; platform listeners hold only weak references, so
/// dropping the last handle makes pending listeners inert. Call
/// [`teardown`](Self::teardown) to also remove them from the platform.
#[derive(Clone)]
pub struct HeadingSession {
    inner: Rc<Inner>,
}

impl HeadingSession {
    /// Create a session with default settings
    pub fn new(capabilities: Capabilities) -> Self {
        Self::with_settings(capabilities, SessionSettings::default())
    }

    /// Create a session with the given settings
    pub fn with_settings(capabilities: Capabilities, settings: SessionSettings) -> Self {
        Self {
            inner: Rc::new(Inner {
                settings,
                capabilities,
                state: RefCell::new(SessionState::new()),
            }),
        }
    }

    /// Run `callback` with the resolved method
    ///
    /// Called immediately if detection already finished. Otherwise the
    /// callback is queued and detection starts if it is not already running.
    pub fn init<F>(&self, callback: F)
    where
        F: FnOnce(Method) + 'static,
    {
        self.inner.init(Box::new(callback));
    }

    /// Watch heading changes in degrees
    ///
    /// The returned id is valid immediately; the platform subscription is
    /// attached once the method resolves. Nothing is ever delivered when the
    /// method resolves to [`Method::Unavailable`].
    pub fn watch<F>(&self, callback: F) -> WatchId
    where
        F: FnMut(f32) + 'static,
    {
        let id = {
            let mut state = self.inner.state.borrow_mut();
            state.last_id = state.last_id.wrapping_add(1);
            WatchId(state.last_id)
        };

        let callback: WatchCallback = Rc::new(RefCell::new(callback));
        let weak = Rc::downgrade(&self.inner);
        self.inner.init(Box::new(move |method| {
            if let Some(inner) = weak.upgrade() {
                inner.attach(id, method, callback);
            }
        }));
        id
    }

    /// Stop a watcher
    ///
    /// Before resolution the removal is queued behind the watcher's own
    /// attachment, so it takes effect as soon as the watcher is attached.
    /// Unknown ids are ignored.
    pub fn unwatch(&self, id: WatchId) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.init(Box::new(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.detach(id);
            }
        }));
    }

    /// Run `callback` when GPS calibration starts
    ///
    /// The user should be asked to go outside to get a GPS signal.
    pub fn need_gps<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        let ready = self
            .inner
            .state
            .borrow_mut()
            .needs_gps
            .observe(unit_observer(callback));
        call_ready(ready);
    }

    /// Run `callback` once GPS heading is available and the user must walk
    /// holding the device straight ahead
    pub fn need_move<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        let ready = self
            .inner
            .state
            .borrow_mut()
            .needs_movement
            .observe(unit_observer(callback));
        call_ready(ready);
    }

    /// Run `callback` if the device has no way to report heading
    ///
    /// Never called once a real method has been resolved.
    pub fn no_support<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        let ready = self
            .inner
            .state
            .borrow_mut()
            .unsupported
            .observe(unit_observer(callback));
        call_ready(ready);
    }

    /// Resolved method, `None` while detection is pending
    pub fn method(&self) -> Option<Method> {
        self.inner.state.borrow().initialized.value()
    }

    /// Offset added to orientation angles, once GPS calibration finished
    pub fn offset(&self) -> Option<f32> {
        self.inner.state.borrow().offset
    }

    /// State of GPS calibration, `None` if it never started
    pub fn calibration_state(&self) -> Option<CalibrationState> {
        self.inner
            .state
            .borrow()
            .calibration
            .as_ref()
            .map(GpsCalibration::state)
    }

    /// Number of watchers attached to a platform subscription
    pub fn watcher_count(&self) -> usize {
        self.inner.state.borrow().watchers.len()
    }

    pub fn settings(&self) -> SessionSettings {
        self.inner.settings
    }

    /// End the session
    ///
    /// Removes every platform subscription and drops queued callbacks. A
    /// running calibration ends as [`CalibrationState::Aborted`]. The resolved
    /// method is kept, detection never restarts, and later watchers are not
    /// attached.
    pub fn teardown(&self) {
        let (watchers, probe, resources) = {
            let mut state = self.inner.state.borrow_mut();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.detecting = false;
            state.initialized.close();
            state.needs_gps.close();
            state.needs_movement.close();
            state.unsupported.close();
            if let Some(calibration) = state.calibration.as_mut() {
                calibration.abort();
            }
            (
                mem::take(&mut state.watchers),
                state.probe.take(),
                state.calibration_resources.take(),
            )
        };

        if let (Some(token), Some(orientation)) = (probe, &self.inner.capabilities.orientation) {
            orientation.remove_listener(token);
        }
        if let Some(resources) = resources {
            self.inner.release_calibration(resources);
        }

        let count = watchers.len();
        for subscription in watchers.into_values() {
            self.inner.release(subscription);
        }
        debug!(watchers = count, "heading session torn down");
    }
}

impl fmt::Debug for HeadingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("HeadingSession")
            .field("method", &state.initialized.value())
            .field("offset", &state.offset)
            .field("watchers", &state.watchers.len())
            .field("torn_down", &state.torn_down)
            .finish()
    }
}

impl Inner {
    fn init(self: &Rc<Self>, observer: Observer<Method>) {
        let mut state = self.state.borrow_mut();
        if let Some((observer, method)) = state.initialized.observe(observer) {
            drop(state);
            observer(method);
            return;
        }
        if state.detecting || state.torn_down {
            return;
        }
        state.detecting = true;
        drop(state);

        self.detect();
    }

    fn detect(self: &Rc<Self>) {
        if self.capabilities.native.is_some() {
            debug!("native compass bridge present");
            self.resolve(Method::NativeBridge);
        } else if let Some(orientation) = &self.capabilities.orientation {
            debug!("probing first orientation event");
            let weak = Rc::downgrade(self);
            let probe: OrientationListener = Rc::new(move |event: &OrientationEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.inspect_first_event(event);
                }
            });
            let token = orientation.add_listener(probe);
            self.state.borrow_mut().probe = Some(token);
        } else {
            debug!("no compass or orientation capability");
            self.resolve(Method::Unavailable);
        }
    }

    fn inspect_first_event(self: &Rc<Self>, event: &OrientationEvent) {
        let Some(token) = self.state.borrow_mut().probe.take() else {
            return;
        };
        if let Some(orientation) = &self.capabilities.orientation {
            orientation.remove_listener(token);
        }

        if event.compass_heading.is_some() {
            self.resolve(Method::OrientationSensor);
        } else if event.alpha().is_some() && self.capabilities.position.is_some() {
            self.start_calibration();
        } else {
            debug!("orientation event carries neither compass heading nor usable angle");
            self.resolve(Method::Unavailable);
        }
    }

    fn start_calibration(self: &Rc<Self>) {
        let (Some(orientation), Some(position)) = (
            self.capabilities.orientation.clone(),
            self.capabilities.position.clone(),
        ) else {
            self.resolve(Method::Unavailable);
            return;
        };

        let observers = {
            let mut state = self.state.borrow_mut();
            let mut calibration = GpsCalibration::new(self.settings.min_calibration_speed);
            calibration.start();
            state.calibration = Some(calibration);
            state.calibration_resources = Some(CalibrationResources::default());
            state.needs_gps.reach(())
        };
        info!(
            min_speed = self.settings.min_calibration_speed,
            "no compass heading, calibrating orientation against GPS"
        );
        notify(observers, ());

        let weak = Rc::downgrade(self);
        let recorder: OrientationListener = Rc::new(move |event: &OrientationEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.record_angle(event);
            }
        });
        let recorder = orientation.add_listener(recorder);
        if !self.hold_calibration_resource(|resources| resources.recorder = Some(recorder)) {
            orientation.remove_listener(recorder);
            return;
        }

        let weak = Rc::downgrade(self);
        let on_position: PositionListener = Rc::new(move |fix: &Position| {
            if let Some(inner) = weak.upgrade() {
                inner.on_fix(fix);
            }
        });
        let weak = Rc::downgrade(self);
        let on_error: PositionErrorListener = Rc::new(move |error: &PositionError| {
            if let Some(inner) = weak.upgrade() {
                inner.on_position_error(error);
            }
        });
        let options = PositionOptions {
            high_accuracy: self.settings.high_accuracy,
        };
        let watch = position.watch_position(on_position, on_error, options);
        if !self.hold_calibration_resource(|resources| resources.position_watch = Some(watch)) {
            position.clear_watch(watch);
        }
    }

    /// Store a subscription token while calibration is still running
    fn hold_calibration_resource(&self, hold: impl FnOnce(&mut CalibrationResources)) -> bool {
        match self.state.borrow_mut().calibration_resources.as_mut() {
            Some(resources) => {
                hold(resources);
                true
            }
            None => false,
        }
    }

    fn record_angle(&self, event: &OrientationEvent) {
        if let Some(calibration) = self.state.borrow_mut().calibration.as_mut() {
            calibration.record_angle(event.alpha());
        }
    }

    fn on_fix(self: &Rc<Self>, fix: &Position) {
        trace!(heading = ?fix.heading(), speed = ?fix.speed, "calibration fix");

        let (progress, observers) = {
            let mut state = self.state.borrow_mut();
            let Some(calibration) = state.calibration.as_mut() else {
                return;
            };
            let progress = calibration.update(fix);
            let observers = if progress.needs_movement {
                state.needs_movement.reach(())
            } else {
                Vec::new()
            };
            (progress, observers)
        };

        if progress.needs_movement {
            info!("GPS heading acquired, waiting for movement");
            notify(observers, ());
        }
        if let Some(offset) = progress.offset {
            self.finish_calibration(Some(offset));
        }
    }

    fn on_position_error(self: &Rc<Self>, error: &PositionError) {
        let aborted = self
            .state
            .borrow_mut()
            .calibration
            .as_mut()
            .is_some_and(GpsCalibration::abort);
        if !aborted {
            return;
        }
        warn!(%error, code = error.code(), "positioning failed during calibration");
        self.finish_calibration(None);
    }

    fn finish_calibration(self: &Rc<Self>, offset: Option<f32>) {
        let resources = {
            let mut state = self.state.borrow_mut();
            let Some(resources) = state.calibration_resources.take() else {
                return;
            };
            state.offset = offset;
            resources
        };
        self.release_calibration(resources);

        match offset {
            Some(offset) => {
                info!(offset, "orientation calibrated against GPS heading");
                self.resolve(Method::OrientationWithGpsCorrection);
            }
            None => self.resolve(Method::Unavailable),
        }
    }

    fn release_calibration(&self, resources: CalibrationResources) {
        let CalibrationResources {
            recorder,
            position_watch,
        } = resources;
        if let (Some(token), Some(orientation)) = (recorder, &self.capabilities.orientation) {
            orientation.remove_listener(token);
        }
        if let (Some(token), Some(position)) = (position_watch, &self.capabilities.position) {
            position.clear_watch(token);
        }
    }

    fn resolve(&self, method: Method) {
        let (initialized, unsupported) = {
            let mut state = self.state.borrow_mut();
            if state.initialized.value().is_some() {
                return;
            }
            state.detecting = false;

            let initialized = state.initialized.reach(method);
            let unsupported = if method.is_available() {
                state.unsupported.close();
                Vec::new()
            } else {
                state.unsupported.reach(())
            };
            state.needs_gps.close();
            state.needs_movement.close();
            (initialized, unsupported)
        };

        info!(%method, "heading source resolved");
        notify(initialized, method);
        notify(unsupported, ());
    }

    fn attach(&self, id: WatchId, method: Method, callback: WatchCallback) {
        let (offset, torn_down) = {
            let state = self.state.borrow();
            (state.offset, state.torn_down)
        };
        if torn_down {
            return;
        }

        let deliver = move |heading: f32| {
            // Skip re-entrant delivery into a callback that is still running
            if let Ok(mut callback) = callback.try_borrow_mut() {
                (&mut *callback)(heading);
            }
        };

        let subscription = match method {
            Method::NativeBridge => {
                let Some(native) = &self.capabilities.native else {
                    return;
                };
                let listener: HeadingListener = Rc::new(deliver);
                Subscription::Native(native.watch_heading(listener))
            }
            Method::OrientationSensor => {
                let Some(orientation) = &self.capabilities.orientation else {
                    return;
                };
                let listener: OrientationListener = Rc::new(move |event: &OrientationEvent| {
                    if let Some(heading) = event.compass_heading {
                        deliver(heading);
                    }
                });
                Subscription::Orientation(orientation.add_listener(listener))
            }
            Method::OrientationWithGpsCorrection => {
                let (Some(orientation), Some(offset)) = (&self.capabilities.orientation, offset)
                else {
                    return;
                };
                let wrap = self.settings.wrap_corrected_heading;
                let listener: OrientationListener = Rc::new(move |event: &OrientationEvent| {
                    if let Some(alpha) = event.alpha() {
                        deliver(correct_heading(alpha, offset, wrap));
                    }
                });
                Subscription::Orientation(orientation.add_listener(listener))
            }
            Method::Unavailable => return,
        };

        debug!(id = id.get(), %method, "watcher attached");
        self.state.borrow_mut().watchers.insert(id, subscription);
    }

    fn detach(&self, id: WatchId) {
        let removed = self.state.borrow_mut().watchers.remove(&id);
        match removed {
            Some(subscription) => {
                self.release(subscription);
                debug!(id = id.get(), "watcher detached");
            }
            None => trace!(id = id.get(), "no attached watcher to remove"),
        }
    }

    fn release(&self, subscription: Subscription) {
        match subscription {
            Subscription::Native(token) => {
                if let Some(native) = &self.capabilities.native {
                    native.clear_watch(token);
                }
            }
            Subscription::Orientation(token) => {
                if let Some(orientation) = &self.capabilities.orientation {
                    orientation.remove_listener(token);
                }
            }
        }
    }
}

fn unit_observer<F>(callback: F) -> Observer<()>
where
    F: FnOnce() + 'static,
{
    Box::new(move |()| callback())
}

fn call_ready<T>(ready: Option<(Observer<T>, T)>) {
    if let Some((observer, value)) = ready {
        observer(value);
    }
}
