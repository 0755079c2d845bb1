//! Build result classification and comment rendering.

pub mod classify;
pub mod format;

pub use classify::{BuildOutcome, classify_log};
pub use format::render_result_comment;
