use std::collections::HashSet;
use crate::error::ConfigurationError;
use super::*;

impl ApprovalDef {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn user(mut self, user_id: i64) -> Self {
        self.users.push(user_id);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl TransitionDef {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        approvals: impl Into<Vec<ApprovalDef>>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            approvals: approvals.into(),
        }
    }

    /// The approval steps paired with their effective priority.
    pub fn steps(&self) -> impl Iterator<Item = (i64, &ApprovalDef)> {
        self.approvals.iter()
            .enumerate()
            .map(|(n, def)| (def.priority.unwrap_or(n as i64), def))
    }
}

impl StateDef {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            initial: false,
        }
    }

    pub fn initial(mut self) -> Self {
        self.initial = true;
        self
    }
}

impl WorkflowDef {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn initial_state(&self) -> Result<&StateDef, ConfigurationError> {
        let mut initials = self.states.iter().filter(|s| s.initial);
        match (initials.next(), initials.next()) {
            (Some(state), None) => Ok(state),
            (None, _) => Err(ConfigurationError::NoInitialState),
            (Some(_), Some(_)) => Err(ConfigurationError::MultipleInitialStates(
                self.states.iter()
                    .filter(|s| s.initial)
                    .map(|s| s.label.clone())
                    .collect()
            )),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut labels = HashSet::new();
        for state in self.states.iter() {
            if !labels.insert(state.label.as_str()) {
                return Err(ConfigurationError::DuplicateState(state.label.clone()));
            }
        }
        self.initial_state()?;

        let mut edges = HashSet::new();
        for transition in self.transitions.iter() {
            for label in [&transition.source, &transition.destination] {
                if !labels.contains(label.as_str()) {
                    return Err(ConfigurationError::UnknownState(label.clone()));
                }
            }
            if !edges.insert((transition.source.as_str(), transition.destination.as_str())) {
                return Err(ConfigurationError::DuplicateTransition(
                    transition.source.clone(),
                    transition.destination.clone(),
                ));
            }
            if transition.approvals.is_empty() {
                return Err(ConfigurationError::NoApprovalSteps(
                    transition.source.clone(),
                    transition.destination.clone(),
                ));
            }
            let mut priorities = HashSet::new();
            for (priority, step) in transition.steps() {
                if !priorities.insert(priority) {
                    return Err(ConfigurationError::DuplicatePriority {
                        from: transition.source.clone(),
                        to: transition.destination.clone(),
                        priority,
                    });
                }
                let mut permissions = HashSet::new();
                if let Some(permission) = step.permissions.iter()
                    .find(|permission| !permissions.insert(permission.as_str()))
                {
                    return Err(ConfigurationError::DuplicatePermission {
                        from: transition.source.clone(),
                        to: transition.destination.clone(),
                        priority,
                        permission: permission.clone(),
                    });
                }
                let mut users = HashSet::new();
                if let Some(user) = step.users.iter()
                    .find(|user| !users.insert(**user))
                {
                    return Err(ConfigurationError::DuplicateUser {
                        from: transition.source.clone(),
                        to: transition.destination.clone(),
                        priority,
                        user: *user,
                    });
                }
            }
        }
        Ok(())
    }
}
