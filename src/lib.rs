//! A deferred process: one object that settles exactly once as resolved or
//! rejected, reports progress any number of times before that, and fans
//! every event out to the handlers registered on it.
//!
//! - [`Callbacks`] is the handler list with `once`/`memory` policy.
//! - [`Process`] owns three lists and the state machine.
//! - [`Promise`] and the [`Thenable`]/[`Bridge`] traits are the registration
//!   surface that can be installed on any object.
//! - [`Request`] is a request-style adapter whose `*_ajax` settlements run
//!   on a later turn of a [`Scheduler`].
//!
//! ```
//! use deferred_process::{Process, State, Thenable};
//!
//! let process = Process::<u32, String>::with_init(|process| {
//!     process.resolve(200);
//! });
//! process.reject("too late".into());
//! assert_eq!(process.state(), State::Resolved);
//! ```
mod callbacks;
mod context;
mod flags;
mod process;
mod promise;
mod request;
mod schedule;
mod settlement;

use thiserror::Error;

pub use callbacks::{handler, Callbacks, Handler};
pub use context::Context;
pub use flags::Flags;
pub use process::{Process, State};
pub use promise::{Bridge, Promise, Slot, Thenable};
pub use request::{Arg, Reply, Request};
pub use schedule::{Scheduler, Task};
pub use settlement::Settlement;

#[derive(Debug, Error)]
pub enum Error {
    #[error("the process was dropped before it settled")]
    ProcessDropped,
    #[error("could not schedule deferred settlement: {0}")]
    Schedule(#[from] futures::task::SpawnError),
    #[error("unknown callbacks flag `{0}`")]
    UnknownFlag(String),
}
