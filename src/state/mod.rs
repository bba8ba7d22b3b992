//! State module for tracking crawl progress
//!
//! A crawl run moves through a fixed sequence of phases. `RunState` names those
//! phases and decides which transitions between them are legal.

mod run_state;

pub use run_state::RunState;
