//! Context structs that bind derived addresses to the instructions built from them.

pub mod listing;
pub mod token;
