use std::{
    fmt,
    str::FromStr,
};
use wfcore::{
    error::ValueError,
    schema::{
        StatusEncoding,
        TransitionRefForm,
    },
};
use super::*;

impl Reconciliation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusEncoding(StatusEncoding::Integer) => "status-integer",
            Self::StatusEncoding(StatusEncoding::Symbolic) => "status-symbolic",
            Self::Iteration(IterationTarget::Assessed) => "iteration-assess",
            Self::Iteration(IterationTarget::Dropped) => "iteration-drop",
            Self::TransitionReference(TransitionRefForm::Meta) => "transition-meta",
            Self::TransitionReference(TransitionRefForm::StatePair) => "transition-state-pair",
        }
    }
}

impl fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reconciliation {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Reconciliation, Self::Err> {
        Self::ALL.into_iter()
            .find(|target| target.as_str() == s)
            .ok_or_else(|| ValueError::Unsupported(s.to_string()))
    }
}

#[cfg(feature = "bin")]
mod clap {
    use ::clap::{
        ValueEnum,
        builder::PossibleValue,
    };
    use super::*;

    impl ValueEnum for Reconciliation {
        fn value_variants<'a>() -> &'a [Self] {
            &Reconciliation::ALL
        }

        fn to_possible_value(&self) -> Option<PossibleValue> {
            Some(PossibleValue::new(self.as_str()))
        }
    }
}
