//! Builders for test actors and creation requests.

mod cast;
mod new_protocol;

pub use cast::TestCast;
pub use new_protocol::NewProtocolBuilder;
