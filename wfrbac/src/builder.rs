use serde::{Deserialize, Serialize};
use wfcore::ac::{
    permit::{
        Membership,
        Permit,
    },
    traits::Authority,
};

use crate::{
    error::Error,
    simple::PermitEnforcer,
};
#[cfg(feature = "casbin")]
use crate::casbin::{
    CasbinEnforcer,
    DEFAULT_MODEL,
};

#[derive(Clone, Debug, Default)]
pub(crate) enum Kind {
    #[default]
    Simple,
    #[cfg(feature = "casbin")]
    Casbin(Box<str>),
}

/// Permits and memberships as supplied by configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AuthorityRecords {
    #[serde(default)]
    pub permits: Vec<Permit>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

/// Builds the `Authority` consulted by the workflow platform.
///
/// Methods can be chained in order to set the configuration values.
/// The `Authority` is constructed by calling [`build`].
///
/// `Builder::new` produces the simple permit enforcer; `Builder::casbin`
/// produces one backed by casbin using the default model.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    pub(crate) records: AuthorityRecords,
    pub(crate) kind: Kind,
}

impl Builder {
    pub fn new() -> Self {
        Default::default()
    }

    #[cfg(feature = "casbin")]
    pub fn casbin() -> Self {
        Self {
            kind: Kind::Casbin(DEFAULT_MODEL.into()),
            .. Default::default()
        }
    }

    #[cfg(feature = "casbin")]
    pub fn casbin_model(mut self, val: &str) -> Self {
        self.kind = Kind::Casbin(val.into());
        self
    }

    pub fn permit(mut self, val: Permit) -> Self {
        self.records.permits.push(val);
        self
    }

    pub fn membership(mut self, val: Membership) -> Self {
        self.records.memberships.push(val);
        self
    }

    pub fn records(mut self, val: AuthorityRecords) -> Self {
        self.records.permits.extend(val.permits);
        self.records.memberships.extend(val.memberships);
        self
    }

    pub fn records_json(self, val: &str) -> Result<Self, Error> {
        Ok(self.records(serde_json::from_str(val)?))
    }

    pub fn build_simple(&self) -> PermitEnforcer {
        let mut enforcer = PermitEnforcer::from_iter(self.records.permits.iter().cloned());
        for membership in self.records.memberships.iter().cloned() {
            enforcer.join(membership);
        }
        enforcer
    }

    pub async fn build(&self) -> Result<Box<dyn Authority>, Error> {
        log::trace!("building a {}Enforcer", self.kind);
        Ok(match &self.kind {
            Kind::Simple => Box::new(self.build_simple()),
            #[cfg(feature = "casbin")]
            Kind::Casbin(model) => Box::new(
                CasbinEnforcer::new(
                    model,
                    self.records.permits.iter().cloned(),
                    self.records.memberships.iter().cloned(),
                ).await?
            ),
        })
    }
}

mod display {
    use std::fmt::{Display, Formatter, Result};
    use super::Kind;

    impl Display for Kind {
        fn fmt(&self, f: &mut Formatter<'_>) -> Result {
            match self {
                Kind::Simple => f.write_str("Permit"),
                #[cfg(feature = "casbin")]
                Kind::Casbin(..) => f.write_str("Casbin"),
            }
        }
    }
}
