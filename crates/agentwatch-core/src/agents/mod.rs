mod types;

pub use types::{TimeoutType, WaitingState};
