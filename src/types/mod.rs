//! Common types used across the LicenseChain SDK.

mod common;
mod pagination;

pub use common::*;
pub use pagination::*;
