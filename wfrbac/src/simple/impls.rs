use wfcore::{
    ac::{
        Principal,
        permit::{
            Membership,
            Permit,
        },
        traits::Authority,
    },
    error::AuthorityError,
};

use super::*;

fn permission_match(granted: &str, requested: &str) -> bool {
    match granted.strip_suffix('*') {
        Some(prefix) => requested.starts_with(prefix),
        None => granted == requested,
    }
}

impl PermitEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permit(&mut self, Permit { subject, permission }: Permit) -> bool {
        self.permits.entry(subject)
            .or_default()
            .insert(permission)
    }

    pub fn join(&mut self, Membership { user, group }: Membership) -> bool {
        self.groups.entry(user)
            .or_default()
            .insert(group)
    }

    fn subject_has(&self, subject: &str, permission: &str) -> bool {
        self.permits.get(subject)
            .map(|granted| granted.iter()
                .any(|granted| permission_match(granted, permission)))
            .unwrap_or(false)
    }
}

impl FromIterator<Permit> for PermitEnforcer {
    fn from_iter<I: IntoIterator<Item=Permit>>(iter: I) -> Self {
        let mut result = Self::new();
        for permit in iter {
            result.permit(permit);
        }
        result
    }
}

impl Authority for PermitEnforcer {
    fn principal_has_permission(
        &self,
        principal: &Principal,
        permission: &str,
    ) -> Result<bool, AuthorityError> {
        let subject = principal.subject();
        let result = self.subject_has(subject, permission) || self.groups
            .get(subject)
            .map(|groups| groups.iter()
                .any(|group| self.subject_has(group, permission)))
            .unwrap_or(false);
        log::trace!("{principal} has {permission}: {result}");
        Ok(result)
    }
}
