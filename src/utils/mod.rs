//! Terminal helpers shared by the command implementations.

pub mod progress;
