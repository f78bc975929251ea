use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Requester,
    Helper,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Requester => write!(f, "requester"),
            Role::Helper => write!(f, "helper"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("active role {0} is not among the granted roles")]
    RoleNotGranted(Role),
}

/// A verified caller. The subject and role claims come from the upstream
/// identity provider; policy decisions key strictly off the active role,
/// never the full granted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    subject: Uuid,
    granted: Vec<Role>,
    active: Role,
}

impl Identity {
    pub fn new(subject: Uuid, granted: Vec<Role>, active: Role) -> Result<Self, IdentityError> {
        if !granted.contains(&active) {
            return Err(IdentityError::RoleNotGranted(active));
        }
        Ok(Self {
            subject,
            granted,
            active,
        })
    }

    pub fn subject(&self) -> Uuid {
        self.subject
    }

    pub fn active_role(&self) -> Role {
        self.active
    }

    pub fn granted_roles(&self) -> &[Role] {
        &self.granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_role_must_be_granted() {
        let subject = Uuid::new_v4();
        let ok = Identity::new(subject, vec![Role::Requester, Role::Helper], Role::Helper);
        assert!(ok.is_ok());

        let err = Identity::new(subject, vec![Role::Requester], Role::Helper).unwrap_err();
        assert_eq!(err, IdentityError::RoleNotGranted(Role::Helper));
    }

    #[test]
    fn policy_sees_only_the_active_role() {
        let id = Identity::new(
            Uuid::new_v4(),
            vec![Role::Requester, Role::Helper],
            Role::Requester,
        )
        .unwrap();
        assert_eq!(id.active_role(), Role::Requester);
        assert_eq!(id.granted_roles().len(), 2);
    }
}
