mod support;

use chrono::{Duration, Utc};
use common_auth::{AuthError, ClaimsGate};
use gate_service::store::{Account, Credential};
use serde_json::json;
use support::{config_with, sign, test_config, test_state, TEST_ISSUER, TEST_SECRET};

fn admin() -> Credential {
    Credential::new("admin", "password")
}

fn user() -> Credential {
    Credential::new("user", "password")
}

#[test]
fn issued_token_round_trips_through_standard_gate() {
    let config = test_config();
    let state = test_state();

    let issued = state.issuer.issue(&admin()).expect("admin login");
    let forwarded = state
        .standard_gate
        .authenticate(&issued.token)
        .expect("standard gate accepts admin");

    assert_eq!(forwarded, config.forward_claims.project(&issued.claims.to_value()));
    assert_eq!(forwarded.get_string("email").as_deref(), Some("admin@example.com"));
    assert_eq!(forwarded.get_string("role").as_deref(), Some("admin"));
    assert_eq!(forwarded.get_string("name").as_deref(), Some("ADMIN"));
}

#[test]
fn expiry_is_now_plus_ttl() {
    let state = test_state();
    let before = Utc::now();
    let issued = state.issuer.issue(&user()).expect("user login");

    assert_eq!(issued.claims.exp - issued.claims.iat, 1800);
    let expected = before + Duration::seconds(1800);
    assert!((issued.expires_at - expected).num_seconds().abs() <= 1);
    assert_eq!(issued.claims.expires_at(), Some(issued.expires_at));
}

#[test]
fn expired_token_is_rejected_before_predicate() {
    let state = test_state();
    let issued = state
        .issuer
        .issue_at(&user(), Utc::now() - Duration::hours(2))
        .expect("backdated login");

    // The user token would also fail the admin predicate; expiry wins.
    for gate in [&state.standard_gate, &state.admin_gate] {
        let err = gate.authenticate(&issued.token).expect_err("expired");
        assert!(matches!(err, AuthError::TokenExpired), "got {err:?}");
    }
}

#[test]
fn leeway_tolerates_recent_expiry() {
    let state = gate_service::build_state(&config_with(&[("JWT_LEEWAY_SECONDS", "120")]))
        .expect("state");
    let issued = state
        .issuer
        .issue_at(&user(), Utc::now() - Duration::seconds(1800 + 30))
        .expect("login");
    assert!(state.standard_gate.authenticate(&issued.token).is_ok());
}

#[test]
fn foreign_secret_fails_signature_check() {
    let state = test_state();
    let claims = state.issuer.issue(&admin()).expect("login").claims;
    let forged = sign(&claims, "not-the-secret");

    let err = state
        .standard_gate
        .authenticate(&forged)
        .expect_err("forged token");
    assert!(matches!(err, AuthError::InvalidSignature(_)), "got {err:?}");

    let err = state
        .standard_gate
        .authenticate("not.a.token")
        .expect_err("garbage token");
    assert!(matches!(err, AuthError::InvalidSignature(_)), "got {err:?}");
}

#[test]
fn issuer_and_audience_must_match() {
    let state = test_state();
    let mut claims = state.issuer.issue(&admin()).expect("login").claims;
    claims.aud = "someone-else".into();
    let err = state
        .standard_gate
        .authenticate(&sign(&claims, TEST_SECRET))
        .expect_err("wrong audience");
    assert!(matches!(err, AuthError::InvalidIssuerOrAudience(_)), "got {err:?}");

    claims.aud = TEST_ISSUER.into();
    claims.iss = "rogue.issuer".into();
    let err = state
        .standard_gate
        .authenticate(&sign(&claims, TEST_SECRET))
        .expect_err("wrong issuer");
    assert!(matches!(err, AuthError::InvalidIssuerOrAudience(_)), "got {err:?}");
}

#[test]
fn admin_passes_admin_gate() {
    let state = test_state();
    let issued = state.issuer.issue(&admin()).expect("login");
    let forwarded = state
        .admin_gate
        .authenticate(&issued.token)
        .expect("admin gate accepts admin");
    assert_eq!(forwarded.get_string("role").as_deref(), Some("admin"));
}

#[test]
fn user_fails_admin_predicate() {
    let state = test_state();
    let issued = state.issuer.issue(&user()).expect("login");

    assert!(state.standard_gate.authenticate(&issued.token).is_ok());
    let err = state
        .admin_gate
        .authenticate(&issued.token)
        .expect_err("user is not admin");
    assert!(matches!(err, AuthError::ClaimsPredicateFailed), "got {err:?}");
}

#[test]
fn read_only_permissions_fail_standard_predicate() {
    let state = test_state();
    let mut claims = state.issuer.issue(&user()).expect("login").claims;
    claims.permissions = vec!["read".to_string()];

    let err = state
        .standard_gate
        .authenticate(&sign(&claims, TEST_SECRET))
        .expect_err("missing create permission");
    assert!(matches!(err, AuthError::ClaimsPredicateFailed), "got {err:?}");
}

#[test]
fn unverified_email_fails_standard_predicate() {
    let state = test_state();
    let mut claims = state.issuer.issue(&user()).expect("login").claims;
    claims.email_verified = false;

    let err = state
        .standard_gate
        .authenticate(&sign(&claims, TEST_SECRET))
        .expect_err("unverified email");
    assert!(matches!(err, AuthError::ClaimsPredicateFailed), "got {err:?}");
}

#[test]
fn admin_gate_hook_requires_subject() {
    let state = test_state();
    let account = Account {
        subject: String::new(),
        username: "admin".into(),
        email_verified: true,
    };
    let claims = state
        .issuer
        .claims_for(&account, Utc::now())
        .expect("claims");

    let err = state
        .admin_gate
        .authenticate(&sign(&claims, TEST_SECRET))
        .expect_err("blank subject");
    assert!(matches!(err, AuthError::CustomValidationFailed(_)), "got {err:?}");

    // The standard gate has no hook.
    assert!(state
        .standard_gate
        .authenticate(&sign(&claims, TEST_SECRET))
        .is_ok());
}

#[test]
fn missing_forward_paths_are_skipped() {
    let config = config_with(&[("GATE_FORWARD_CLAIMS", "email=user.email,team=org.team")]);
    let gate = ClaimsGate::builder("standard", config.jwt_config(), config.standard_claims.clone())
        .with_forward_map(config.forward_claims.clone())
        .build();
    let state = test_state();
    let issued = state.issuer.issue(&admin()).expect("login");

    let forwarded = gate.authenticate(&issued.token).expect("accepted");
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded.get("email"), Some(&json!("admin@example.com")));
    assert!(forwarded.get("team").is_none());
}

#[test]
fn bad_credentials_never_issue() {
    let state = test_state();
    for credential in [
        Credential::new("admin", "wrong"),
        Credential::new("nobody", "password"),
        Credential::new("", ""),
    ] {
        let err = state.issuer.issue(&credential).expect_err("rejected");
        assert!(matches!(err, AuthError::InvalidCredentials), "got {err:?}");
    }
}
