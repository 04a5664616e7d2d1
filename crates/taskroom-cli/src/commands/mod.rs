pub mod config;
pub mod shell;
pub mod sink;
pub mod timer;
