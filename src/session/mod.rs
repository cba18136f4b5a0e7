// Exchange session module
// Open/closed state, time to the next transition, and a caller-owned countdown

pub mod clock;
pub mod countdown;

pub use clock::{SessionCalendar, SessionClock, SessionEvent, SessionWindow};
pub use countdown::{format_countdown, Countdown};
