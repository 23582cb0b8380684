//! Plain-text rendering for the terminal front end.

pub mod board;
pub mod panels;
