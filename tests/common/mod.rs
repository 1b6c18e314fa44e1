//! Fake platform capabilities driven by the tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use heading_source::{
    Capabilities, HeadingListener, NativeCompass, OrientationEvent, OrientationListener,
    OrientationSource, Position, PositionError, PositionErrorListener, PositionListener,
    PositionOptions, PositionService, Token,
};

/// Listener registry that dispatches like a browser event target: listeners
/// added during dispatch wait for the next event, listeners removed during
/// dispatch are skipped.
struct Registry<L> {
    next: Cell<u64>,
    listeners: RefCell<BTreeMap<u64, L>>,
    removed: RefCell<Vec<u64>>,
}

impl<L: Clone> Registry<L> {
    fn new() -> Self {
        Self {
            next: Cell::new(0),
            listeners: RefCell::new(BTreeMap::new()),
            removed: RefCell::new(Vec::new()),
        }
    }

    fn add(&self, listener: L) -> Token {
        let id = self.next.get() + 1;
        self.next.set(id);
        self.listeners.borrow_mut().insert(id, listener);
        Token(id)
    }

    fn remove(&self, token: Token) {
        if self.listeners.borrow_mut().remove(&token.0).is_some() {
            self.removed.borrow_mut().push(token.0);
        }
    }

    fn dispatch(&self, mut call: impl FnMut(&L)) {
        let snapshot: Vec<(u64, L)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();
        for (id, listener) in snapshot {
            if self.listeners.borrow().contains_key(&id) {
                call(&listener);
            }
        }
    }

    fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn removed(&self) -> Vec<u64> {
        self.removed.borrow().clone()
    }
}

pub struct FakeNative {
    registry: Registry<HeadingListener>,
}

impl FakeNative {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            registry: Registry::new(),
        })
    }

    pub fn emit(&self, heading: f32) {
        self.registry.dispatch(|listener| listener(heading));
    }

    pub fn watch_count(&self) -> usize {
        self.registry.len()
    }
}

impl NativeCompass for FakeNative {
    fn watch_heading(&self, listener: HeadingListener) -> Token {
        self.registry.add(listener)
    }

    fn clear_watch(&self, token: Token) {
        self.registry.remove(token);
    }
}

pub struct FakeOrientation {
    registry: Registry<OrientationListener>,
}

impl FakeOrientation {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            registry: Registry::new(),
        })
    }

    pub fn emit(&self, event: OrientationEvent) {
        self.registry.dispatch(|listener| listener(&event));
    }

    pub fn emit_alpha(&self, alpha: f32) {
        self.emit(OrientationEvent::from_angles(alpha, 0.0, 0.0));
    }

    pub fn emit_compass(&self, heading: f32) {
        self.emit(OrientationEvent::from_angles(0.0, 0.0, 0.0).with_compass_heading(heading));
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    pub fn removed(&self) -> Vec<u64> {
        self.registry.removed()
    }
}

impl OrientationSource for FakeOrientation {
    fn add_listener(&self, listener: OrientationListener) -> Token {
        self.registry.add(listener)
    }

    fn remove_listener(&self, token: Token) {
        self.registry.remove(token);
    }
}

pub struct FakePosition {
    registry: Registry<(PositionListener, PositionErrorListener)>,
    options: RefCell<Vec<PositionOptions>>,
}

impl FakePosition {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            registry: Registry::new(),
            options: RefCell::new(Vec::new()),
        })
    }

    pub fn emit(&self, fix: Position) {
        self.registry.dispatch(|(on_position, _)| on_position(&fix));
    }

    pub fn fail(&self, error: PositionError) {
        self.registry.dispatch(|(_, on_error)| on_error(&error));
    }

    pub fn watch_count(&self) -> usize {
        self.registry.len()
    }

    pub fn requested_options(&self) -> Vec<PositionOptions> {
        self.options.borrow().clone()
    }
}

impl PositionService for FakePosition {
    fn watch_position(
        &self,
        on_position: PositionListener,
        on_error: PositionErrorListener,
        options: PositionOptions,
    ) -> Token {
        self.options.borrow_mut().push(options);
        self.registry.add((on_position, on_error))
    }

    fn clear_watch(&self, token: Token) {
        self.registry.remove(token);
    }
}

/// Shared log of values seen by callbacks
#[derive(Clone)]
pub struct Log<T>(Rc<RefCell<Vec<T>>>);

impl<T: Clone + 'static> Log<T> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn push(&self, value: T) {
        self.0.borrow_mut().push(value);
    }

    pub fn values(&self) -> Vec<T> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Callback recording every value it receives
    pub fn recorder(&self) -> impl FnMut(T) + 'static {
        let log = self.clone();
        move |value| log.push(value)
    }
}

/// Counter for unit callbacks
#[derive(Clone, Default)]
pub struct Counter(Rc<Cell<usize>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }

    pub fn callback(&self) -> impl FnOnce() + 'static {
        let count = Rc::clone(&self.0);
        move || count.set(count.get() + 1)
    }
}

/// Device with orientation events and GPS but no compass
pub fn gps_device() -> (Capabilities, Rc<FakeOrientation>, Rc<FakePosition>) {
    let orientation = FakeOrientation::new();
    let position = FakePosition::new();
    let capabilities = Capabilities::none()
        .with_orientation(orientation.clone())
        .with_position(position.clone());
    (capabilities, orientation, position)
}

pub fn fix() -> Position {
    Position::new(52.3676, 4.9041)
}
