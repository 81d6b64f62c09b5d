#![forbid(unsafe_code)]

pub mod endpoints;
pub mod pipeline;
pub mod router;
pub mod selection;
