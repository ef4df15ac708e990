#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! Low-level plumbing shared by every crate in the Vantora trading stack: request signing,
//! rate limiting, the REST/WebSocket protocol traits, clocks, channels and the read-only
//! snapshot pattern used for consistent cross-task state reads.
//!
//! Nothing in this crate knows about orders, candles or risk - it is the layer that lets
//! `vantora-data` and `vantora-execution` share one implementation of "how do I talk to an
//! exchange" instead of two.

pub mod channel;
pub mod clock;
pub mod error;
pub mod protocol;
pub mod rate_limit;
pub mod signer;
pub mod snapshot;

pub use clock::EngineClock;
pub use error::{ErrorKind, SocketError};
pub use signer::{ApiCredentials, HmacSigner, Signer};
