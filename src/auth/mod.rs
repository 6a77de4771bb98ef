//! Authentication and authorization
//!
//! Provides:
//! - JWT access token validation
//! - Roles and the operations each role may perform
//! - Resolving the acting user for a request

pub mod jwt;
pub mod roles;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput};
pub use roles::{is_allowed, required_role, Operation, Role};

use crate::types::{Result, SawitError};

/// The user a request acts on behalf of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    /// Stand-in actor for tokenless requests in dev mode
    pub fn dev() -> Self {
        Self {
            user_id: "dev".into(),
            name: "dev".into(),
            role: Role::Admin,
        }
    }

    /// Fail with Forbidden unless the actor's role permits `operation`
    pub fn require(&self, operation: Operation) -> Result<()> {
        if is_allowed(operation, self.role) {
            Ok(())
        } else {
            Err(SawitError::Forbidden(format!(
                "Role '{}' requires '{}' or higher for this action",
                self.role,
                required_role(operation)
            )))
        }
    }
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Resolve the actor from an Authorization header
pub fn authenticate(validator: &JwtValidator, auth_header: Option<&str>, dev_mode: bool) -> Result<Actor> {
    match extract_token_from_header(auth_header) {
        Some(token) => validator.verify_token(token).map(Actor::from),
        None if dev_mode => Ok(Actor::dev()),
        None => Err(SawitError::Unauthorized("No token provided".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token() {
        let validator = JwtValidator::new_dev();
        assert!(matches!(
            authenticate(&validator, None, false),
            Err(SawitError::Unauthorized(_))
        ));
        assert_eq!(authenticate(&validator, None, true).unwrap(), Actor::dev());
    }

    #[test]
    fn test_token_resolves_actor() {
        let validator = JwtValidator::new_dev();
        let token = validator
            .generate_token(TokenInput {
                user_id: "u-7".into(),
                name: "Budi".into(),
                role: Role::Staff,
            })
            .unwrap();
        let header = format!("Bearer {}", token);

        let actor = authenticate(&validator, Some(&header), false).unwrap();
        assert_eq!(actor.name, "Budi");
        assert!(actor.require(Operation::WriteRecords).is_ok());
        assert!(matches!(
            actor.require(Operation::ClosePeriod),
            Err(SawitError::Forbidden(_))
        ));
    }

    #[test]
    fn test_bad_token_rejected_even_in_dev_mode() {
        let validator = JwtValidator::new_dev();
        assert!(authenticate(&validator, Some("Bearer nope"), true).is_err());
    }
}
