//! Helpers for pretty-printing listing program errors in a readable, colorized format.

pub mod instruction_error;
