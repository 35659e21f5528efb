use std::collections::{
    HashMap,
    HashSet,
};

/// Maps subjects (user names or groups) to the permissions granted to
/// them, with users optionally placed in groups.  A granted permission
/// ending in `*` matches every permission sharing its prefix.
#[derive(Clone, Debug, Default)]
pub struct PermitEnforcer {
    permits: HashMap<String, HashSet<String>>,
    groups: HashMap<String, HashSet<String>>,
}

mod impls;
