//! Async session layer.
//!
//! - [`Session`]: handshake, reassembly and telemetry for one band
//! - [`SessionObserver`]: callbacks for the orchestrating program
//! - [`run`]: the `tokio::select!` loop that feeds a session
//!
//! # Example
//!
//! ```ignore
//! let (tx, rx) = tokio::sync::mpsc::channel(64);
//! let transport = connect_somehow(tx).await?;
//! let mut session = Session::new(transport, auth_key, (), SessionConfig::default());
//! run(&mut session, rx, async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! let (_transport, ()) = session.finish();
//! ```

mod driver;
mod observer;
#[allow(clippy::module_inception)]
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::run;
pub use observer::*;
pub use session::*;
