//! CLI command handlers, one file per command.

mod completions;
mod merge;
mod post_process;
mod upload;

pub use completions::{run_completions, run_man};
pub use merge::run_merge;
pub use post_process::run_post_process;
pub use upload::run_upload;
