//! Logging helpers for the core pipeline.

pub mod printout;

pub use printout::log_bundle;
