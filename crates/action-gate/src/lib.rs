//! Gate checks - preconditions before a task and success signals after it
//!
//! Every check is one boolean question put to the browser driver:
//! - Preconditions: authenticated session, data ready, service reachable
//! - Signals: visibility, route, network idle, error toast, API success, app state
//!
//! Unknown check types are reported as unmet rather than raised.

pub mod conditions;
pub mod errors;
pub mod types;
pub mod validator;

pub use conditions::*;
pub use errors::*;
pub use types::*;
pub use validator::*;
