//! Core types shared by every attendance-stats crate.
//!
//! Holds the attendance data model, the workspace error type, rate and
//! rounding maths, month ordering, number formatting and CLI settings.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod months;
pub mod settings;

pub use error::{AttendanceError, Result};
