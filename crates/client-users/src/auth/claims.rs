//! JWT claims and caller roles.

use serde::{Deserialize, Serialize};

/// Caller role.
///
/// Role strings are accepted in either the bare form (`user`) or the
/// prefixed form issued by most identity providers (`ROLE_USER`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular API consumer.
    #[default]
    User,
    /// Administrator. Holds every capability a `User` has.
    Admin,
}

impl Role {
    /// Whether holding `self` grants the capabilities of `required`.
    pub fn satisfies(self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::User, Role::User) => true,
            (Role::User, Role::Admin) => false,
        }
    }

    /// Role name as stored on user records.
    pub fn as_role_name(self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.strip_prefix("role_").unwrap_or(&lower) {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject. Some issuers put the login name in `username` instead.
    #[serde(default, alias = "username")]
    pub sub: String,

    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,

    /// Audience. Issuers send either a single string or a list.
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub aud: Option<Vec<String>>,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    /// Issued at (as Unix timestamp).
    #[serde(default)]
    pub iat: Option<i64>,

    /// User's email.
    #[serde(default)]
    pub email: Option<String>,

    /// User's name.
    #[serde(default)]
    pub name: Option<String>,

    /// User's roles.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Custom role claim (alternative to roles array).
    #[serde(default)]
    pub role: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(|aud| match aud {
        OneOrMany::One(aud) => vec![aud],
        OneOrMany::Many(aud) => aud,
    }))
}

impl Claims {
    /// All recognised roles carried by the token. Unknown role names are skipped.
    pub fn granted_roles(&self) -> Vec<Role> {
        self.role
            .iter()
            .chain(self.roles.iter())
            .filter_map(|r| r.parse::<Role>().ok())
            .collect()
    }

    /// Whether the token grants `required`.
    pub fn has_role(&self, required: Role) -> bool {
        self.granted_roles()
            .into_iter()
            .any(|role| role.satisfies(required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(roles: &[&str], role: Option<&str>) -> Claims {
        Claims {
            sub: "caller".to_string(),
            iss: None,
            aud: None,
            exp: 0,
            iat: None,
            email: None,
            name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("ROLE_USER".parse::<Role>().unwrap(), Role::User);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("role_admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("ROLE_GUEST".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.satisfies(Role::User));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::User.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Admin));
    }

    #[test]
    fn test_has_role() {
        assert!(claims(&["ROLE_USER"], None).has_role(Role::User));
        assert!(claims(&[], Some("admin")).has_role(Role::User));
        assert!(!claims(&["ROLE_USER"], None).has_role(Role::Admin));
        assert!(!claims(&[], None).has_role(Role::User));
        assert!(!claims(&["ROLE_GUEST"], None).has_role(Role::User));
    }

    #[test]
    fn test_username_alias_for_sub() {
        let json = r#"{"username":"jane@example.com","exp":1,"roles":["ROLE_USER"]}"#;
        let parsed: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sub, "jane@example.com");
    }

    #[test]
    fn test_audience_string_or_list() {
        let single: Claims = serde_json::from_str(r#"{"sub":"a","exp":1,"aud":"users-api"}"#).unwrap();
        assert_eq!(single.aud, Some(vec!["users-api".to_string()]));

        let many: Claims =
            serde_json::from_str(r#"{"sub":"a","exp":1,"aud":["users-api","other"]}"#).unwrap();
        assert_eq!(many.aud.map(|a| a.len()), Some(2));
    }
}
