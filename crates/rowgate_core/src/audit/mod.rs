//! Audit rendering, word-level diffing and change logging.

mod changelog;
mod render;
mod worddiff;

pub use changelog::ChangeLog;
pub use render::Auditor;
pub use worddiff::{diff_words, LineDiff, DELETE_CLOSE, DELETE_OPEN, INSERT_CLOSE, INSERT_OPEN};
