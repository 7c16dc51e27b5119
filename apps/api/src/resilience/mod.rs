// Deadline and retry wrappers applied around collaborator calls.
// Never wrap input validation in either.

mod retry;
mod timeout;

pub use retry::with_retry;
pub use timeout::{with_timeout, TimeoutError};
