pub mod config;
pub mod tickets;
pub mod workflow;
