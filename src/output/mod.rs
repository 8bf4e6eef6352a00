//! Output module for query results and load reports
//!
//! This module handles:
//! - Rendering query results as JSON
//! - Recording and printing load statistics

pub mod stats;

pub use stats::{print_statistics, render_statistics, FailedSession, LoadStatistics};

use crate::catalog::Session;
use serde::Serialize;

/// Query result envelope: a list of sessions
#[derive(Debug, Serialize)]
pub struct SessionsResult<'a> {
    pub sessions: &'a [Session],
}

/// Renders sessions as pretty JSON, ordered by identifier
pub fn render_sessions(sessions: &mut [Session]) -> Result<String, serde_json::Error> {
    sessions.sort_by(|a, b| a.id.cmp(&b.id));
    serde_json::to_string_pretty(&SessionsResult { sessions })
}
