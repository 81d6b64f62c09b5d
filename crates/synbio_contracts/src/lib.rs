#![forbid(unsafe_code)]

pub mod common;
pub mod dialog;
pub mod record;
pub mod session;

pub use common::{ContractViolation, SchemaVersion, Validate};
