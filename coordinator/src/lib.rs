pub mod config;
pub mod handlers;
pub mod monitor;
pub mod server;
pub mod state;

pub use config::CoordinatorConfig;
pub use state::{Coordinator, CoordinatorError, TaskRecord, TaskStatus};
