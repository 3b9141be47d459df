//! Live-change streaming
//!
//! One watch request becomes one [`StreamSession`] task:
//!
//! ```text
//! ResourceGateway::watch() -> Subscription -> StreamSession -> translate() -> Frame
//!                                                 ^                            |
//!                                   SessionContext (disconnect,     mpsc -> SSE body
//!                                    max duration)
//! ```
//!
//! The session owns the [`Subscription`](crate::gateway::Subscription) and
//! stops it exactly once, whichever way the stream ends. Failures after the
//! stream has started are delivered in-band as `ERROR` events; the connection
//! itself is only ever closed cleanly.

mod frame;
mod session;
mod translator;


pub use frame::*;
pub use session::*;
pub use translator::*;
