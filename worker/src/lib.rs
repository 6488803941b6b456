pub mod config;
pub mod executor;
pub mod storage;
pub mod worker;

pub use config::WorkerConfig;
pub use executor::{run_map, run_reduce, TaskError};
pub use worker::run;
