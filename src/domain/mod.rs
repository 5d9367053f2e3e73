//! Core domain types and logic.
//!
//! The evaluation core is [`classifier`], [`signal_builder`] and [`verdict`]:
//! raw metrics flow one way into classified signals and then a verdict.

pub mod alerts;
pub mod catalog;
pub mod classifier;
pub mod config_validation;
pub mod dca;
pub mod derive;
pub mod error;
pub mod format;
pub mod price;
pub mod raw_metrics;
pub mod signal;
pub mod signal_builder;
pub mod verdict;
