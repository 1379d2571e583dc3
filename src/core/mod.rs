//! Core traits, types, and constants.
//!
//! This module has no optional dependencies: wire constants, the error
//! taxonomy, characteristic roles and the transport seam.

mod characteristic;
mod constants;
mod error;
mod traits;

pub use characteristic::*;
pub use constants::*;
pub use error::*;
pub use traits::*;
