//! Bounded, sequenced event stream for a single in-flight analysis run (spec §4.10).

mod frame;
mod session;

pub use frame::{Envelope, Frame};
pub use session::{StreamError, StreamingSession};
