use std::cell::RefCell;
use std::rc::Rc;

use heading_source::{Capabilities, HeadingListener, HeadingSession, NativeCompass, Token};

/// Stand-in for a native compass plugin
#[derive(Default)]
struct Compass {
    listener: RefCell<Option<HeadingListener>>,
}

impl NativeCompass for Compass {
    fn watch_heading(&self, listener: HeadingListener) -> Token {
        *self.listener.borrow_mut() = Some(listener);
        Token(1)
    }

    fn clear_watch(&self, _token: Token) {
        *self.listener.borrow_mut() = None;
    }
}

fn main() {
    let compass = Rc::new(Compass::default());
    let session = HeadingSession::new(Capabilities::none().with_native(compass.clone()));

    session.no_support(|| println!("No compass on this device"));
    session.init(|method| println!("Compass by {method}"));

    let id = session.watch(|heading| println!("Heading: {heading:.1}°"));

    for step in 0..10 {
        // this loop stands in for the plugin reporting new readings
        let listener = compass.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(step as f32 * 36.0);
        }
    }

    session.unwatch(id);
}
