use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use team_backend::db::models::User;
use team_backend::middleware::auth::{AutoLoginConfig, AutoLoginService, TokenRejection};

const USER_ID: i64 = 42;

fn service() -> AutoLoginService {
    AutoLoginService::new(AutoLoginConfig {
        secret: "test-secret".to_string(),
        ttl: Duration::days(30),
    })
}

fn user(locked: bool) -> Arc<User> {
    let expire = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap().timestamp();
    Arc::new(User {
        id: USER_ID,
        name: "u".to_string(),
        is_locked: locked,
        auto_login_expire: expire as u64,
        ..Default::default()
    })
}

fn verify(token: &str, ip: &str, locked: bool) -> Result<i64, TokenRejection> {
    let now = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
    service().verify(token, ip, now, |id| (id == USER_ID).then(|| user(locked)))
}

#[test]
fn test_pristine_token_verifies() {
    let token = service().encode(USER_ID, "10.0.0.1").unwrap();
    assert_eq!(verify(&token, "10.0.0.1", false), Ok(USER_ID));
}

#[test]
fn test_other_address_is_rejected() {
    let token = service().encode(USER_ID, "10.0.0.1").unwrap();
    assert_eq!(
        verify(&token, "10.0.0.2", false),
        Err(TokenRejection::AddressMismatch)
    );
}

#[test]
fn test_tampered_id_is_rejected() {
    let token = service().encode(USER_ID, "10.0.0.1").unwrap();
    let mut payload: serde_json::Value =
        serde_json::from_slice(&STANDARD.decode(&token).unwrap()).unwrap();
    payload["ID"] = serde_json::json!(USER_ID + 1);
    let forged = STANDARD.encode(serde_json::to_vec(&payload).unwrap());

    assert_eq!(
        verify(&forged, "10.0.0.1", false),
        Err(TokenRejection::BadSignature)
    );
}

#[test]
fn test_locked_user_is_rejected() {
    let token = service().encode(USER_ID, "10.0.0.1").unwrap();
    assert_eq!(verify(&token, "10.0.0.1", true), Err(TokenRejection::Locked));
}

#[test]
fn test_expired_or_revoked_token_is_rejected() {
    let token = service().encode(USER_ID, "10.0.0.1").unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
    let revoked = Arc::new(User {
        id: USER_ID,
        auto_login_expire: 0,
        ..Default::default()
    });
    let result = service().verify(&token, "10.0.0.1", now, |_| Some(revoked.clone()));
    assert_eq!(result, Err(TokenRejection::Expired));
}

#[test]
fn test_secret_is_part_of_signature() {
    let token = service().encode(USER_ID, "10.0.0.1").unwrap();
    let other = AutoLoginService::new(AutoLoginConfig {
        secret: "another".to_string(),
        ttl: Duration::days(30),
    });
    let now = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
    let result = other.verify(&token, "10.0.0.1", now, |_| Some(user(false)));
    assert_eq!(result, Err(TokenRejection::BadSignature));
}
