//! Terminal habit tracker. Habits, completions and streaks live in a small local store, a
//! lightweight daemon checks reminder times in the background and raises desktop notifications.
//!

pub mod cli;
pub mod daemon;
pub mod fs;
pub mod notify;
pub mod store;
pub mod utils;
