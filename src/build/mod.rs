mod backend;
mod clean;
mod feedback;
mod run;

pub use backend::{BackendError, BuildBackend, CMakeBackend};
pub use clean::{clean, fullclean};
pub use feedback::FeedbackAnalyzer;
pub use run::{run_binary, show_size};
