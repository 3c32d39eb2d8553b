use std::collections::{BTreeSet, HashSet};

pub const DEFAULT_ROLE: &str = "ROLE_USER";
pub const ELEVATED_ROLE: &str = "ROLE_ADMIN";

/// Which roles a newly registered user receives.
///
/// Everyone gets `default_role`. Names listed in `elevated_usernames`
/// (from `ELEVATED_USERNAMES`) also get `elevated_role`.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    default_role: String,
    elevated_role: String,
    elevated_usernames: HashSet<String>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl RolePolicy {
    pub fn new(elevated_usernames: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            default_role: DEFAULT_ROLE.to_string(),
            elevated_role: ELEVATED_ROLE.to_string(),
            elevated_usernames: elevated_usernames.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_elevated(&self, username: &str) -> bool {
        self.elevated_usernames.contains(username)
    }

    pub fn roles_for(&self, username: &str) -> BTreeSet<String> {
        let mut roles = BTreeSet::from([self.default_role.clone()]);
        if self.is_elevated(username) {
            roles.insert(self.elevated_role.clone());
        }
        roles
    }
}
