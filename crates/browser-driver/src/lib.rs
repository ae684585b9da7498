//! Browser driver capability
//!
//! The adaptive runner never talks to a browser directly. Everything goes
//! through [`BrowserDriver`], which can be backed by:
//! - [`ScriptedDriver`] - a deterministic in-memory page used by tests and fixtures
//! - `ChromiumDriver` - a real Chromium page (feature `chromium`)
//!
//! Every operation is asynchronous and may fail; callers treat any error as a
//! failure of whatever step or check issued it.

pub mod driver;
pub mod errors;
pub mod scripted;
pub mod scripts;
pub mod types;

#[cfg(feature = "chromium")]
pub mod chromium;

pub use driver::*;
pub use errors::*;
pub use scripted::*;
pub use types::*;

#[cfg(feature = "chromium")]
pub use chromium::{ChromiumConfig, ChromiumDriver};
