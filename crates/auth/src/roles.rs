use core::str::FromStr;

use serde::{Deserialize, Serialize};

use pharmacy_core::DomainError;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Customer => "Customer",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            other => Err(DomainError::validation(format!(
                "role must be Admin or Customer, got '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" customer ".parse::<Role>().unwrap(), Role::Customer);
    }

    #[test]
    fn rejects_unknown_roles() {
        assert!(matches!("root".parse::<Role>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn display_matches_storage_form() {
        assert_eq!(Role::Admin.to_string(), "Admin");
    }
}
