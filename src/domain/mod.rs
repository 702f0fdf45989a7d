//! Core domain types and logic.

pub mod price_bar;
pub mod session;
pub mod price_locator;
pub mod commission;
pub mod portfolio;
pub mod simulation;
pub mod result;
pub mod batch;
pub mod instrument;
pub mod refresh_plan;
pub mod config_validation;
pub mod error;
