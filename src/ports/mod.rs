//! Port traits for the collaborators around the simulation core.

pub mod config_port;
pub mod data_port;
pub mod report_port;
