//! End-to-end authorization: policy document, resolution and enforcement

use authgate::cache::{CacheConfig, CacheRegistry};
use authgate::principal::StaticPrincipalStore;
use authgate::{
    require_admin, require_admin_or_alias, AuthError, AuthPolicy, AuthRequest, Authorizer,
    Effect, Principal, Settings,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const POLICY: &str = r#"{
    "config": {
        "jwt": {
            "idTokenHeader": "x-amzn-oidc-data",
            "subClaimHeader": "x-amzn-oidc-identity"
        },
        "roles": {
            "admins": ["admin"],
            "superAdmins": ["root"],
            "def": {
                "admin": ["eng-leads"],
                "viewer": ["eng", "support"],
                "root": ["sre"]
            }
        }
    },
    "authrPolicy": [
        {"name": "public_health", "method": "GET", "url": "/health", "effect": "allow", "subjects": ["*"]},
        {"name": "read_dbs", "method": "GET", "url": "/api/v1/dbs", "effect": "allow", "subjects": ["viewer"]},
        {"name": "admins", "method": "*", "url": "*", "effect": "allow", "subjects": ["admin", "root"]},
        {"name": "deny_all", "method": "*", "url": "*", "effect": "deny", "subjects": ["*"]}
    ]
}"#;

fn token(claims: Value) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"unverified")).unwrap()
}

async fn authorizer() -> Authorizer {
    let registry = CacheRegistry::new();
    let cache = registry.open(&CacheConfig::memory()).await.unwrap();
    Authorizer::new(AuthPolicy::from_json(POLICY).unwrap(), cache)
}

fn request(method: &str, path: &str, subject: &str, groups: &[&str]) -> AuthRequest {
    AuthRequest::new(method, path)
        .with_header("X-Amzn-Oidc-Identity", subject)
        .with_header(
            "X-Amzn-Oidc-Data",
            token(json!({
                "sub": subject,
                "login": format!("{}@example.com", subject),
                "groups": groups,
            })),
        )
}

#[tokio::test]
async fn test_admin_allowed_everywhere_others_denied() {
    let authorizer = authorizer().await;
    let cancel = CancellationToken::new();

    let admin = authorizer
        .authorize(&request("DELETE", "/api/v1/dbs/7", "lead", &["eng-leads"]), &cancel)
        .await
        .unwrap();
    assert_eq!(admin.policy.name, "admins");
    assert!(require_admin(&admin.principal).is_ok());

    let err = authorizer
        .authorize(&request("DELETE", "/api/v1/dbs/7", "dev", &["eng"]), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Denied { effect: Effect::Deny, .. }));
    assert!(err.is_policy_rejection());
}

#[tokio::test]
async fn test_specific_allow_before_catch_all() {
    let authorizer = authorizer().await;
    let cancel = CancellationToken::new();

    let viewer = authorizer
        .authorize(&request("get", "/API/V1/DBS", "dev", &["support"]), &cancel)
        .await
        .unwrap();
    assert_eq!(viewer.policy.name, "read_dbs");
    assert_eq!(viewer.policy.priority, 1);

    let anyone = authorizer
        .authorize(&request("GET", "/health", "guest", &[]), &cancel)
        .await
        .unwrap();
    assert_eq!(anyone.policy.name, "public_health");
}

#[tokio::test]
async fn test_super_admin_via_root_role() {
    let authorizer = authorizer().await;
    let authorized = authorizer
        .authorize(&request("POST", "/api/v1/users", "ops", &["sre"]), &CancellationToken::new())
        .await
        .unwrap();
    assert!(authorized.principal.is_super_admin);
    assert!(require_admin_or_alias(&authorized.principal, "someone").is_ok());
}

#[tokio::test]
async fn test_alias_guard() {
    let authorizer = authorizer().await;
    let authorized = authorizer
        .authorize(&request("GET", "/api/v1/dbs", "jane.doe", &["eng"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(authorized.principal.alias, "jane_doe");
    assert!(require_admin_or_alias(&authorized.principal, "jane_doe").is_ok());
    assert!(matches!(
        require_admin_or_alias(&authorized.principal, "max"),
        Err(AuthError::AliasMismatch { .. })
    ));
    assert!(matches!(require_admin(&authorized.principal), Err(AuthError::NotAdmin(_))));
}

#[tokio::test]
async fn test_default_policy_denies_non_admins() {
    let registry = CacheRegistry::new();
    let cache = registry.open(&CacheConfig::memory()).await.unwrap();
    let mut policy = AuthPolicy::default();
    policy.config.jwt.sub_claim_header = "x-sub".to_string();
    let authorizer = Authorizer::new(policy, cache);

    let request = AuthRequest::new("GET", "/")
        .with_header("x-sub", "u1")
        .with_header("x-jwt-data", token(json!({"sub": "u1", "login": "u1@example.com"})));
    let err = authorizer
        .authorize(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Denied { ref policy, .. } if policy == "default_deny_all_to_all"
    ));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let authorizer = authorizer().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = authorizer
        .authorize(&request("GET", "/health", "guest", &[]), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Cancelled));
}

#[tokio::test]
async fn test_settings_wire_everything() {
    let dir = tempfile::tempdir().unwrap();
    let policy_path = dir.path().join("policy.json");
    std::fs::write(&policy_path, POLICY).unwrap();

    let principals_path = dir.path().join("principals.json");
    let mut record = Principal::new("svc");
    record.login = "svc@example.com".to_string();
    record.groups = vec!["eng-leads".to_string()];
    std::fs::write(&principals_path, serde_json::to_vec(&[record]).unwrap()).unwrap();

    let settings_path = dir.path().join("authgate.toml");
    let mut file = std::fs::File::create(&settings_path).unwrap();
    writeln!(file, "policy_path = {:?}", policy_path.display().to_string()).unwrap();
    writeln!(file, "principals_path = {:?}", principals_path.display().to_string()).unwrap();
    writeln!(file, "request_timeout_ms = 5000").unwrap();
    writeln!(file, "[cache]\nkind = \"memory\"").unwrap();
    drop(file);

    let settings = Settings::from_file(&settings_path).unwrap();
    let authorizer = settings.authorizer(&CacheRegistry::new()).await.unwrap();

    // token without login: roles come from the stored record's groups
    let request = AuthRequest::new("PUT", "/api/v1/dbs/1")
        .with_header("x-amzn-oidc-identity", "svc")
        .with_header("x-amzn-oidc-data", token(json!({"sub": "svc"})));
    let authorized = authorizer
        .authorize(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(authorized.policy.name, "admins");
    assert!(authorized.principal.is_admin);
}

#[test]
fn test_static_store_from_records() {
    let store = StaticPrincipalStore::from_records([Principal::new("a"), Principal::new("b")]);
    assert_eq!(store.len(), 2);
    let _: Arc<dyn authgate::PrincipalStore> = Arc::new(store);
}
