mod cli;

pub use cli::{Command, Config};
