//! Building a principal from the claims of an identity token
//!
//! Tokens are decoded for their claims only. Signatures are NOT verified
//! here: the component that attached the token header is the trust boundary.

use super::Principal;
use crate::roles::RolesConfig;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::trace;

/// Lifetime in seconds given to a claims principal whose token has no usable `exp`
pub const DEFAULT_CLAIMS_TTL_SECS: i64 = 2 * 60 * 60;

/// Errors reading claims out of a token
#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("malformed token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),

    #[error("no sub claim in token, cannot create principal")]
    MissingSubject,

    #[error("claim {name} has unexpected type, expected {expected}")]
    InvalidClaim {
        name: &'static str,
        expected: &'static str,
    },
}

/// Claims decoded from a token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims(Map<String, Value>);

impl TokenClaims {
    /// Decode the payload of a compact JWS without checking its signature
    ///
    /// Segments may carry base64url padding, as load balancer tokens do.
    pub fn parse(token: &str) -> Result<Self, ClaimError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token = strip_padding(token);
        let data = jsonwebtoken::decode::<Map<String, Value>>(
            &token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )?;
        Ok(TokenClaims(data.claims))
    }

    pub fn from_map(claims: Map<String, Value>) -> Self {
        TokenClaims(claims)
    }

    pub fn subject(&self) -> Result<&str, ClaimError> {
        match self.0.get("sub") {
            None => Err(ClaimError::MissingSubject),
            Some(value) => value.as_str().ok_or(ClaimError::InvalidClaim {
                name: "sub",
                expected: "string",
            }),
        }
    }

    fn string(&self, name: &'static str) -> Result<Option<String>, ClaimError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ClaimError::InvalidClaim {
                name,
                expected: "string",
            }),
        }
    }

    fn groups(&self) -> Result<Option<Vec<String>>, ClaimError> {
        let invalid = ClaimError::InvalidClaim {
            name: "groups",
            expected: "array of strings",
        };
        match self.0.get("groups") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Some)
                .ok_or(invalid),
            Some(_) => Err(invalid),
        }
    }

    /// `exp` as a timestamp, if present and a valid number of epoch seconds
    fn expiry(&self) -> Option<DateTime<Utc>> {
        let seconds = self.0.get("exp")?.as_i64()?;
        Utc.timestamp_opt(seconds, 0).single()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Compact token with trailing `=` removed from every segment
fn strip_padding(token: &str) -> String {
    token
        .split('.')
        .map(|segment| segment.trim_end_matches('='))
        .collect::<Vec<_>>()
        .join(".")
}

/// Alias for a login: local part of an email, `+` and `.` replaced by `_`
pub fn alias_from_login(login: &str) -> String {
    let local = login.split_once('@').map_or(login, |(local, _)| local);
    local.replace(['+', '.'], "_")
}

/// Build a principal from token claims
///
/// The `sub` claim must equal `subject`. Groups, when present, are mapped to
/// roles through `roles`. A missing or unusable `exp` yields
/// `now + DEFAULT_CLAIMS_TTL_SECS`.
pub fn principal_from_claims(
    claims: TokenClaims,
    subject: &str,
    roles: &RolesConfig,
    now: DateTime<Utc>,
) -> Result<Principal, ClaimsPrincipalError> {
    let sub = claims.subject()?;
    if sub != subject {
        return Err(ClaimsPrincipalError::SubjectMismatch {
            expected: subject.to_string(),
            actual: sub.to_string(),
        });
    }

    let mut principal = Principal::new(sub);

    if let Some(login) = claims.string("login")? {
        principal.alias = alias_from_login(&login);
        principal.login = login;
    }
    principal.first_name = claims.string("fname")?.unwrap_or_default();
    principal.last_name = claims.string("lname")?.unwrap_or_default();
    principal.email = claims.string("eml")?.unwrap_or_default();
    principal.manager_id = claims.string("managerId")?.unwrap_or_default();
    principal.manager_name = claims.string("manager")?.unwrap_or_default();

    if let Some(groups) = claims.groups()? {
        principal.apply_grant(roles.derive_roles(&groups));
        principal.groups = groups;
    }

    principal.expiry = Some(
        claims
            .expiry()
            .unwrap_or_else(|| now + Duration::seconds(DEFAULT_CLAIMS_TTL_SECS)),
    );
    trace!(
        "principal from claims: id={}, login={}, roles={:?}",
        principal.id,
        principal.login,
        principal.roles
    );

    principal.raw_claims = super::RawClaims(claims.into_map());
    Ok(principal)
}

/// Failure building a principal from claims
#[derive(Error, Debug)]
pub enum ClaimsPrincipalError {
    #[error(transparent)]
    Claims(#[from] ClaimError),

    #[error("incorrect sub claim {actual} found in token, expected {expected}")]
    SubjectMismatch { expected: String, actual: String },
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::roles::{GroupSet, RoleSet};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::collections::HashMap;

    /// Sign claims with a throwaway key; the parser never checks it
    pub(crate) fn token(claims: Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"not-checked"),
        )
        .unwrap()
    }

    fn roles() -> RolesConfig {
        let mut definitions = HashMap::new();
        definitions.insert("viewer".to_string(), GroupSet::from_roles(["eng"]));
        definitions.insert("admin".to_string(), GroupSet::from_roles(["leads"]));
        RolesConfig {
            admin_roles: RoleSet::from_roles(["admin"]),
            super_admin_roles: RoleSet::new(),
            definitions,
        }
    }

    #[test]
    fn test_alias_from_login() {
        assert_eq!(alias_from_login("jane.doe+ops@example.com"), "jane_doe_ops");
        assert_eq!(alias_from_login("plain"), "plain");
        assert_eq!(alias_from_login("first.last"), "first_last");
    }

    #[test]
    fn test_parse_ignores_signature() {
        let mut jwt = token(json!({"sub": "u1"}));
        jwt.push_str("tampered");
        let claims = TokenClaims::parse(&jwt).unwrap();
        assert_eq!(claims.subject().unwrap(), "u1");
    }

    #[test]
    fn test_parse_padded_load_balancer_token() {
        // ES256 header with signer/client fields; both segments padded
        let jwt = concat!(
            "eyJ0eXAiOiJKV1QiLCJraWQiOiJrMSIsImFsZyI6IkVTMjU2IiwiaXNzIjoiaHR0cHM6Ly9jb2duaXRvLWlk",
            "cC51cy1lYXN0LTEuYW1hem9uYXdzLmNvbS9wb29sIiwiY2xpZW50IjoiYWJjIiwic2lnbmVyIjoiYXJuOmF3",
            "czplbGFzdGljbG9hZGJhbGFuY2luZzp1cy1lYXN0LTE6MTIzOmxvYWRiYWxhbmNlci9hcHAvbGIvMSIsImV4",
            "cCI6NDEwMjQ0NDgwMH0=",
            ".",
            "eyJzdWIiOiJ1MSIsImxvZ2luIjoiamFuZS5kb2VAZXhhbXBsZS5jb20iLCJncm91cHMiOlsiZW5nIl0sImV4",
            "cCI6NDEwMjQ0NDgwMH0=",
            ".",
            "c2lnbmF0dXJl==",
        );
        let claims = TokenClaims::parse(jwt).unwrap();
        assert_eq!(claims.subject().unwrap(), "u1");

        let principal = principal_from_claims(claims, "u1", &roles(), Utc::now()).unwrap();
        assert_eq!(principal.alias, "jane_doe");
        assert_eq!(principal.groups, vec!["eng"]);
        assert_eq!(principal.expiry.unwrap().timestamp(), 4_102_444_800);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            TokenClaims::parse("not-a-token"),
            Err(ClaimError::Malformed(_))
        ));
    }

    #[test]
    fn test_full_claims() {
        let claims = TokenClaims::parse(&token(json!({
            "sub": "u1",
            "login": "jane.doe@example.com",
            "fname": "Jane",
            "lname": "Doe",
            "eml": "jane@example.com",
            "groups": ["eng", "leads"],
            "managerId": "m9",
            "manager": "Max",
            "exp": 4_102_444_800i64,
            "roles": ["root"],
        })))
        .unwrap();

        let now = Utc::now();
        let principal = principal_from_claims(claims, "u1", &roles(), now).unwrap();
        assert_eq!(principal.alias, "jane_doe");
        assert_eq!(principal.last_name, "Doe");
        assert_eq!(principal.email, "jane@example.com");
        assert_eq!(principal.manager_name, "Max");
        assert_eq!(principal.roles.to_vec(), vec!["admin", "viewer"]);
        assert!(principal.is_admin);
        assert_eq!(principal.expiry.unwrap().timestamp(), 4_102_444_800);
        // a roles claim is never trusted
        assert!(!principal.roles.has("root"));
        assert!(principal.raw_claims.get("roles").is_some());
    }

    #[test]
    fn test_missing_exp_defaults_to_two_hours() {
        let claims = TokenClaims::from_map(
            json!({"sub": "u1", "exp": "soon"}).as_object().unwrap().clone(),
        );
        let now = Utc::now();
        let principal = principal_from_claims(claims, "u1", &roles(), now).unwrap();
        assert_eq!(
            principal.expiry,
            Some(now + Duration::seconds(DEFAULT_CLAIMS_TTL_SECS))
        );
        assert!(principal.login.is_empty());
        assert!(principal.groups.is_empty());
    }

    #[test]
    fn test_subject_mismatch() {
        let claims = TokenClaims::from_map(json!({"sub": "u2"}).as_object().unwrap().clone());
        let err = principal_from_claims(claims, "u1", &roles(), Utc::now()).unwrap_err();
        assert!(matches!(err, ClaimsPrincipalError::SubjectMismatch { .. }));
    }

    #[test]
    fn test_missing_subject() {
        let claims = TokenClaims::from_map(json!({"login": "x"}).as_object().unwrap().clone());
        let err = principal_from_claims(claims, "u1", &roles(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ClaimsPrincipalError::Claims(ClaimError::MissingSubject)
        ));
    }

    #[test]
    fn test_wrongly_typed_groups() {
        let claims = TokenClaims::from_map(
            json!({"sub": "u1", "groups": ["eng", 3]}).as_object().unwrap().clone(),
        );
        let err = principal_from_claims(claims, "u1", &roles(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ClaimsPrincipalError::Claims(ClaimError::InvalidClaim { name: "groups", .. })
        ));
    }
}
