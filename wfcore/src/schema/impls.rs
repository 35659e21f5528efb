use std::fmt;
use crate::{
    approval::ApprovalStatus,
    error::ValueError,
};
use super::*;

impl ApprovalSchema {
    /// The representation produced by the bundled migrations.
    pub const CURRENT: ApprovalSchema = ApprovalSchema {
        status: StatusEncoding::Symbolic,
        iteration: true,
        transition_ref: TransitionRefForm::Meta,
    };
}

impl Default for ApprovalSchema {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ApprovalSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status: {}, iteration: {}, transition reference: {}",
            match self.status {
                StatusEncoding::Symbolic => "symbolic",
                StatusEncoding::Integer => "integer",
            },
            if self.iteration { "present" } else { "absent" },
            match self.transition_ref {
                TransitionRefForm::Meta => "meta",
                TransitionRefForm::StatePair => "state pair",
            },
        )
    }
}

impl StatusEncoding {
    pub fn encode(&self, status: ApprovalStatus) -> StatusValue {
        match self {
            StatusEncoding::Symbolic => StatusValue::Symbolic(status.to_string()),
            StatusEncoding::Integer => StatusValue::Integer(status.into()),
        }
    }
}

impl StatusValue {
    pub fn decode(&self) -> Result<ApprovalStatus, ValueError> {
        match self {
            StatusValue::Symbolic(s) => s.parse(),
            StatusValue::Integer(n) => ApprovalStatus::try_from(*n)
                .map_err(|_| ValueError::Unsupported(n.to_string())),
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusValue::Symbolic(s) => write!(f, "{s:?}"),
            StatusValue::Integer(n) => write!(f, "{n}"),
        }
    }
}
