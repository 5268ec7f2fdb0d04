//! Data layer for the attendance statistics tools.
//!
//! Parses weekly report text into records, reads and appends attendance
//! datasets, rolls records up into monthly branch and constituency tables,
//! ranks branches per month and exports the results.

pub mod aggregator;
pub mod analysis;
pub mod export;
pub mod parser;
pub mod ranker;
pub mod reader;
pub mod summary;

pub use attendance_core as core;
