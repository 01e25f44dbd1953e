use std::fmt;
use std::str::FromStr;

use crate::JobError;

/// Job states the API reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatusKind {
    Incomplete,
    Prepared,
    Queued,
    Running,
    Complete,
    Error,
}

impl JobStatusKind {
    pub const ALL: [JobStatusKind; 6] = [
        Self::Incomplete,
        Self::Prepared,
        Self::Queued,
        Self::Running,
        Self::Complete,
        Self::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Prepared => "prepared",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Label for the results step.
    pub fn results_label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Complete => "Ready",
            Self::Queued => "Queued",
            Self::Incomplete | Self::Prepared => "Calculation Not Submitted",
            Self::Error => "Error",
        }
    }

    /// Label for the submit step.
    pub fn submit_label(self) -> &'static str {
        match self {
            Self::Prepared => "Ready For Calculation",
            Self::Complete | Self::Queued | Self::Running => "Submitted",
            Self::Incomplete => "Data Upload Required",
            Self::Error => "Error",
        }
    }

    /// Calculation has been handed to the backend.
    pub fn is_submitted(self) -> bool {
        matches!(self, Self::Queued | Self::Running | Self::Complete)
    }
}

impl FromStr for JobStatusKind {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| JobError::UnknownStatus {
                status: s.to_string(),
            })
    }
}

impl fmt::Display for JobStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
