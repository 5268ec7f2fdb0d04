//! Terminal viewer for attendance analysis results.

pub mod app;
pub mod chart_view;
pub mod table_view;
pub mod themes;

pub use attendance_core as core;
