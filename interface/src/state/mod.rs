pub mod curve;
mod listing;

pub use listing::*;
