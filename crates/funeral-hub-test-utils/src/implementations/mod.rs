//! Test implementations (fakes) of Funeral Hub collaborators.

mod harness;
mod recording_dispatcher;

pub use harness::{Milestone, TestHarness};
pub use recording_dispatcher::RecordingNotificationDispatcher;
