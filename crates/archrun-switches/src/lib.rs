//! Archiver switch model and serialization
//!
//! Turns a [`Switches`] map into the flat, ordered sequence of command-line
//! tokens that gets appended to the positional arguments of an archiver call.
//!
//! # Security Model
//!
//! Tokens are produced verbatim: no quoting and no escaping. They are meant to be
//! handed to an argv-style spawn, never to a shell. Password-bearing tokens can be
//! masked for logging with [`redact`].

pub mod error;
pub mod redact;
pub mod switches;

pub use error::SwitchError;
pub use redact::{REDACTED, redact};
pub use switches::{SwitchValue, Switches, serialize};
