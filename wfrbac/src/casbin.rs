use casbin::{
    CoreApi,
    DefaultModel,
    MemoryAdapter,
    MgmtApi,
};
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

/// The casbin model for workflow approvals.
///
/// A request carries the subject and the permission; subjects inherit
/// the permissions of their groups, and `keyMatch` allows a trailing `*`
/// in a granted permission.
pub const DEFAULT_MODEL: &str = "\
[request_definition]
r = sub, perm

[policy_definition]
p = sub, perm

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = (r.sub == p.sub || g(r.sub, p.sub)) && keyMatch(r.perm, p.perm)
";

pub struct CasbinEnforcer {
    enforcer: casbin::Enforcer,
}

impl CasbinEnforcer {
    pub async fn new(
        model: &str,
        permits: impl IntoIterator<Item = Permit>,
        memberships: impl IntoIterator<Item = Membership>,
    ) -> Result<Self, casbin::Error> {
        let m = DefaultModel::from_str(model).await?;
        let a = MemoryAdapter::default();
        let enforcer = casbin::Enforcer::new(m, a).await?;
        let mut result = Self { enforcer };
        let mut n = 0;
        for permit in permits {
            result.permit(permit).await?;
            n += 1;
        }
        for membership in memberships {
            result.join(membership).await?;
        }
        log::debug!("new CasbinEnforcer set up with {n} permits");
        Ok(result)
    }

    pub async fn permit(
        &mut self,
        Permit { subject, permission }: Permit,
    ) -> Result<bool, casbin::Error> {
        self.enforcer.add_named_policy("p", vec![subject, permission]).await
    }

    pub async fn revoke(
        &mut self,
        Permit { subject, permission }: Permit,
    ) -> Result<bool, casbin::Error> {
        self.enforcer.remove_named_policy("p", vec![subject, permission]).await
    }

    pub async fn join(
        &mut self,
        Membership { user, group }: Membership,
    ) -> Result<bool, casbin::Error> {
        self.enforcer.add_named_grouping_policy("g", vec![user, group]).await
    }

    fn casbin_enforce(
        &self,
        subject: &str,
        permission: &str,
    ) -> Result<bool, casbin::Error> {
        self.enforcer.enforce((subject, permission))
    }
}

impl Authority for CasbinEnforcer {
    fn principal_has_permission(
        &self,
        principal: &Principal,
        permission: &str,
    ) -> Result<bool, AuthorityError> {
        self.casbin_enforce(principal.subject(), permission)
            .map_err(|e| AuthorityError::Unavailable(e.to_string()))
    }
}
