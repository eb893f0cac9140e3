use bevy::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::format::{UnitSystem, format_distance};
use super::model::{Line, LineId};

/// Contract violations on session edits. Distinct from sensor conditions,
/// which are never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("measurement index {index} out of range (session holds {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Ordered collection of completed lines for one measuring activity.
#[derive(Resource, Debug, Default, Clone)]
pub struct MeasureSession {
    lines: Vec<Line>,
}

impl MeasureSession {
    pub fn append(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// No-op on an empty session.
    pub fn remove_last(&mut self) -> Option<Line> {
        self.lines.pop()
    }

    /// Remove the line at `index`. Out-of-range indices leave the session untouched.
    pub fn remove_at(&mut self, index: usize) -> Result<Line, SessionError> {
        if index >= self.lines.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        Ok(self.lines.remove(index))
    }

    /// Returns how many lines were dropped.
    pub fn clear(&mut self) -> usize {
        let removed = self.lines.len();
        self.lines.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// Sum of all line lengths in meters.
    pub fn total_distance(&self) -> f32 {
        self.lines.iter().map(Line::distance).sum()
    }

    pub fn summary(&self, units: UnitSystem) -> SessionSummary {
        let lines = self
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| LineSummary {
                index,
                id: line.id(),
                distance: line.distance(),
                label: format_distance(line.distance(), units),
                degenerate: line.is_degenerate(),
            })
            .collect();
        let total = self.total_distance();
        SessionSummary {
            count: self.lines.len(),
            total_distance: total,
            total_label: format_distance(total, units),
            units,
            lines,
        }
    }
}

/// Aggregated, formatted view of a session for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub count: usize,
    pub total_distance: f32,
    pub total_label: String,
    pub units: UnitSystem,
    pub lines: Vec<LineSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    pub index: usize,
    pub id: LineId,
    pub distance: f32,
    pub label: String,
    pub degenerate: bool,
}
