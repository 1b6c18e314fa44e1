//! Simulates a phone without compass: the user is asked to go outside, then
//! to walk, and the orientation angle is calibrated against GPS heading.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use heading_source::{
    Capabilities, HeadingSession, OrientationEvent, OrientationListener, OrientationSource,
    Position, PositionErrorListener, PositionListener, PositionOptions, PositionService,
    SessionSettings, Token,
};

#[derive(Default)]
struct Orientation {
    next: Cell<u64>,
    listeners: RefCell<Vec<(u64, OrientationListener)>>,
}

impl Orientation {
    fn emit(&self, alpha: f32) {
        let event = OrientationEvent::from_angles(alpha, 2.0, -1.0);
        let listeners: Vec<(u64, OrientationListener)> = self.listeners.borrow().clone();
        for (id, listener) in listeners {
            if self.listeners.borrow().iter().any(|(live, _)| *live == id) {
                listener(&event);
            }
        }
    }
}

impl OrientationSource for Orientation {
    fn add_listener(&self, listener: OrientationListener) -> Token {
        let id = self.next.get() + 1;
        self.next.set(id);
        self.listeners.borrow_mut().push((id, listener));
        Token(id)
    }

    fn remove_listener(&self, token: Token) {
        self.listeners.borrow_mut().retain(|(id, _)| *id != token.0);
    }
}

#[derive(Default)]
struct Gps {
    watch: RefCell<Option<PositionListener>>,
}

impl Gps {
    fn emit(&self, fix: Position) {
        let listener = self.watch.borrow().clone();
        if let Some(listener) = listener {
            listener(&fix);
        }
    }
}

impl PositionService for Gps {
    fn watch_position(
        &self,
        on_position: PositionListener,
        _on_error: PositionErrorListener,
        options: PositionOptions,
    ) -> Token {
        println!("GPS watch started (high accuracy: {})", options.high_accuracy);
        *self.watch.borrow_mut() = Some(on_position);
        Token(1)
    }

    fn clear_watch(&self, _token: Token) {
        println!("GPS watch stopped");
        *self.watch.borrow_mut() = None;
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let orientation = Rc::new(Orientation::default());
    let gps = Rc::new(Gps::default());
    // Report headings in [0, 360) as a compass dial would
    let settings = SessionSettings {
        wrap_corrected_heading: true,
        ..Default::default()
    };
    let session = HeadingSession::with_settings(
        Capabilities::none()
            .with_orientation(orientation.clone())
            .with_position(gps.clone()),
        settings,
    );

    session.need_gps(|| println!("Please go outside to get a GPS signal"));
    session.need_move(|| println!("Walk forward holding the phone straight ahead"));
    session.init(|method| println!("Compass by {method}"));
    session.watch(|heading| println!("Heading: {heading:.1}°"));

    // The device points 30° left of its direction of travel
    let true_heading = 75.0_f32;
    let alpha_error = -30.0_f32;

    orientation.emit(0.0);
    gps.emit(Position::new(48.8566, 2.3522));
    gps.emit(Position::new(48.8566, 2.3522).with_heading(f32::NAN).with_speed(0.0));

    for (second, speed) in [0.4_f32, 0.9, 1.3].into_iter().enumerate() {
        orientation.emit(true_heading + alpha_error);
        gps.emit(
            Position::new(48.8566, 2.3522)
                .with_heading(true_heading)
                .with_speed(speed)
                .with_timestamp(second as u64 * 1000),
        );
    }

    println!("Offset: {:?}", session.offset());

    // Turn on the spot: headings now follow the corrected orientation angle
    for turn in [0.0_f32, 45.0, 90.0, 180.0, 300.0] {
        orientation.emit(true_heading + alpha_error + turn);
    }

    session.teardown();
}
