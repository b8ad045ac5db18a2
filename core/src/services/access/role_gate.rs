//! Static role check over the role claim of an authenticated request

use crate::errors::AuthError;

/// Role granted access to every gated route
pub const ADMIN_ROLE: &str = "admin";

/// Allow-list of roles for a route
///
/// `admin` always passes. Any other role must match an entry exactly;
/// there is no hierarchy and no case folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allowed: Vec<String>,
}

impl RoleGate {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// A gate only administrators pass
    pub fn admin_only() -> Self {
        Self::new([ADMIN_ROLE])
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Checks a role taken from the request context
    ///
    /// # Arguments
    ///
    /// * `role` - The caller's role, `None` when the request is not
    ///   authenticated
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Access granted
    /// * `Err(AuthError::MissingRole)` - No role available
    /// * `Err(AuthError::InsufficientPermissions)` - Role not allowed
    pub fn check(&self, role: Option<&str>) -> Result<(), AuthError> {
        let role = match role {
            Some(role) if !role.is_empty() => role,
            _ => return Err(AuthError::MissingRole),
        };

        if role == ADMIN_ROLE || self.allowed.iter().any(|allowed| allowed == role) {
            return Ok(());
        }

        Err(AuthError::InsufficientPermissions {
            required: self.allowed.clone(),
            actual: role.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_role_passes() {
        let gate = RoleGate::new(["analyst", "user"]);
        assert!(gate.check(Some("user")).is_ok());
        assert!(gate.check(Some("analyst")).is_ok());
    }

    #[test]
    fn test_admin_always_passes() {
        let gate = RoleGate::new(["analyst"]);
        assert!(gate.check(Some(ADMIN_ROLE)).is_ok());
        assert!(RoleGate::new(Vec::<String>::new()).check(Some("admin")).is_ok());
    }

    #[test]
    fn test_missing_role() {
        let gate = RoleGate::admin_only();
        assert_eq!(gate.check(None), Err(AuthError::MissingRole));
        assert_eq!(gate.check(Some("")), Err(AuthError::MissingRole));
    }

    #[test]
    fn test_mismatch_reports_required_and_actual() {
        let gate = RoleGate::admin_only();
        assert_eq!(
            gate.check(Some("user")),
            Err(AuthError::InsufficientPermissions {
                required: vec!["admin".to_string()],
                actual: "user".to_string(),
            })
        );
    }

    #[test]
    fn test_match_is_exact() {
        let gate = RoleGate::new(["user"]);
        assert!(gate.check(Some("User")).is_err());
        assert!(gate.check(Some("Admin")).is_err());
        assert!(gate.check(Some("user ")).is_err());
    }
}
