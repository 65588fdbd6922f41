pub mod batch;
pub mod cli;
pub mod config;
pub mod scheduler;
pub mod source;
pub mod sync;
