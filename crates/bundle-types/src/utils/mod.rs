//! Utility functions for formatting and address handling.

pub mod constants;
pub mod conversion;
pub mod formatting;

pub use constants::{GWEI, PLAIN_TRANSFER_GAS};
pub use conversion::parse_address;
pub use formatting::{format_gwei, truncate_id};
