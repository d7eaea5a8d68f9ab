//! Client side of the fit wire protocol.
//!
//! Each operation opens one TCP connection to a daemon, sends a request
//! header and optional pack, and reads the reply until the daemon hangs up.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{fetch, pull, push, send_objects};
pub use error::{SyncError, SyncResult};
pub use transport::Exchange;
pub use types::{FetchResult, PullResult, PushResult, Remote};
