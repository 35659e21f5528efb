use std::{
    fmt,
    ops::{
        Deref,
        DerefMut,
    },
    str::FromStr,
};
use crate::error::ValueError;
use super::*;

impl ApprovalStatus {
    pub const ALL: [ApprovalStatus; 4] = [
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::Rejected,
        ApprovalStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<ApprovalStatus, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            "cancelled" => Ok(ApprovalStatus::Cancelled),
            s => Err(ValueError::Unsupported(s.to_string())),
        }
    }
}

impl From<Vec<Approval>> for Approvals {
    fn from(args: Vec<Approval>) -> Self {
        Self(args)
    }
}

impl<const N: usize> From<[Approval; N]> for Approvals {
    fn from(args: [Approval; N]) -> Self {
        Self(args.into())
    }
}

impl Deref for Approvals {
    type Target = Vec<Approval>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Approvals {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl IntoIterator for Approvals {
    type Item = Approval;
    type IntoIter = std::vec::IntoIter<Approval>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Approvals {
    /// Approvals of the transition meta at its highest iteration, ordered
    /// by id.
    pub fn latest_chain(&self, transition_meta_id: i64) -> Option<(i64, Vec<&Approval>)> {
        let iteration = self.0.iter()
            .filter(|a| a.transition_meta_id == transition_meta_id)
            .map(|a| a.iteration)
            .max()?;
        Some((iteration, self.0.iter()
            .filter(|a| a.transition_meta_id == transition_meta_id
                && a.iteration == iteration)
            .collect()))
    }

    /// Applies the updates in memory, as the backend would on commit.
    pub fn apply(&mut self, updates: &[ApprovalUpdate]) {
        for update in updates {
            if let Some(approval) = self.0.iter_mut().find(|a| a.id == update.id) {
                approval.status = update.status;
                approval.transactioner = update.transactioner;
                approval.transaction_ts = update.transaction_ts;
                approval.previous_id = update.previous_id;
            }
        }
    }
}

#[cfg(feature = "clap")]
mod clap {
    use ::clap::{
        ValueEnum,
        builder::PossibleValue,
    };
    use super::*;

    impl ValueEnum for ApprovalStatus {
        fn value_variants<'a>() -> &'a [Self] {
            &ApprovalStatus::ALL
        }

        fn to_possible_value(&self) -> Option<PossibleValue> {
            Some(PossibleValue::new(self.as_str()))
        }
    }
}
