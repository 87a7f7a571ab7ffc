//! Declarative authorization.
//!
//! Each operation names a [`Policy`] (the roles allowed to call it) and, where
//! it touches an owned entity, an ownership predicate. Both are evaluated
//! before the operation body runs.

use crate::credentials::Claims;
use crate::db::Role;

use super::error::{ServiceError, ServiceResult};

/// Authenticated identity resolved from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.id == user_id
    }
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// The set of roles allowed to invoke an operation
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    roles: &'static [Role],
    denial: &'static str,
}

impl Policy {
    pub const fn only(roles: &'static [Role], denial: &'static str) -> Self {
        Self { roles, denial }
    }

    /// Any verified caller
    pub const fn authenticated() -> Self {
        Self {
            roles: &[],
            denial: "",
        }
    }

    pub fn check(&self, caller: &Caller) -> ServiceResult<()> {
        if self.roles.is_empty() || self.roles.contains(&caller.role) {
            Ok(())
        } else {
            Err(ServiceError::forbidden(self.denial))
        }
    }
}

pub const TENANT_ONLY: Policy = Policy::only(
    &[Role::Tenant],
    "Access denied. Insufficient permissions.",
);
pub const LANDLORD_ONLY: Policy = Policy::only(
    &[Role::Landlord],
    "Access denied. Insufficient permissions.",
);
pub const ADMIN_ONLY: Policy = Policy::only(&[Role::Admin], "Admin access required");
pub const ANY_CALLER: Policy = Policy::authenticated();

/// Ownership predicate: the caller must be `owner_id`
pub fn require_owner(caller: &Caller, owner_id: &str, denial: &str) -> ServiceResult<()> {
    if caller.is(owner_id) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(denial))
    }
}

/// Ownership predicate that also admits administrators
pub fn require_owner_or_admin(caller: &Caller, owner_id: &str, denial: &str) -> ServiceResult<()> {
    if caller.is_admin() {
        return Ok(());
    }
    require_owner(caller, owner_id, denial)
}

#[cfg(test)]
pub(crate) fn caller(id: &str, role: Role) -> Caller {
    Caller {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_policies_admit_only_their_roles() {
        let tenant = caller("t1", Role::Tenant);
        let landlord = caller("l1", Role::Landlord);
        let admin = caller("a1", Role::Admin);

        assert!(TENANT_ONLY.check(&tenant).is_ok());
        assert!(TENANT_ONLY.check(&landlord).is_err());
        assert!(LANDLORD_ONLY.check(&landlord).is_ok());
        assert!(LANDLORD_ONLY.check(&admin).is_err());
        assert!(ADMIN_ONLY.check(&admin).is_ok());
        assert!(ADMIN_ONLY.check(&tenant).is_err());

        for c in [&tenant, &landlord, &admin] {
            assert!(ANY_CALLER.check(c).is_ok());
        }
    }

    #[test]
    fn ownership_predicates() {
        let landlord = caller("l1", Role::Landlord);
        let admin = caller("a1", Role::Admin);

        assert!(require_owner(&landlord, "l1", "no").is_ok());
        assert!(matches!(
            require_owner(&landlord, "l2", "no"),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(require_owner(&admin, "l1", "no").is_err());
        assert!(require_owner_or_admin(&admin, "l1", "no").is_ok());
    }
}
