#![forbid(unsafe_code)]

pub mod compose;
pub mod fetch;
pub mod fuzzy;
pub mod normalize;
