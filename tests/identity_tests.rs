use std::sync::{Arc, Mutex};

use guest_tasks::config::RemoteConfig;
use guest_tasks::error::AuthError;
use guest_tasks::identity::{IdentityProvider, LocalIdentity, RemoteIdentity, Subscription};
use guest_tasks::models::UserId;
use guest_tasks::storage::LocalStorage;
use guest_tasks::supabase::{Session, SessionUser, SupabaseClient};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_body(user: &str, access: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("refresh-{}", access),
        "user": { "id": user, "aud": "authenticated", "is_anonymous": true }
    })
}

fn client(server_uri: &str, storage: &LocalStorage) -> Arc<SupabaseClient> {
    let config = RemoteConfig::new(server_uri, "anon-key").unwrap();
    Arc::new(SupabaseClient::new(config, storage.clone()).unwrap())
}

/// Records every identity notification.
fn recorder(provider: &dyn IdentityProvider) -> (Arc<Mutex<Vec<Option<UserId>>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = provider.subscribe(Arc::new(move |user: Option<&UserId>| {
        sink.lock().unwrap().push(user.cloned());
    }));
    (seen, sub)
}

#[tokio::test]
async fn test_local_identity_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());
    let identity = LocalIdentity::new(storage.clone());

    let first = identity.resolve_or_create().await.unwrap();
    let second = identity.resolve_or_create().await.unwrap();
    assert_eq!(first, second);

    // A new provider over the same storage sees the same guest.
    let reopened = LocalIdentity::new(storage);
    assert_eq!(reopened.resolve_or_create().await.unwrap(), first);
}

#[tokio::test]
async fn test_local_new_guest_gets_new_id() {
    let dir = tempfile::tempdir().unwrap();
    let identity = LocalIdentity::new(LocalStorage::new(dir.path()));
    let (seen, _sub) = recorder(&identity);

    let old = identity.resolve_or_create().await.unwrap();
    identity.invalidate().await.unwrap();
    assert_eq!(identity.current(), None);

    let new = identity.resolve_or_create().await.unwrap();
    assert_ne!(old, new);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some(old), None, Some(new)]
    );
}

#[tokio::test]
async fn test_remote_signs_in_once_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("user-1", "tok-1")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());
    let identity = RemoteIdentity::new(client(&server.uri(), &storage));
    let (seen, _sub) = recorder(&identity);

    assert_eq!(identity.resolve_or_create().await.unwrap(), UserId::from("user-1"));
    assert_eq!(identity.resolve_or_create().await.unwrap(), UserId::from("user-1"));
    assert_eq!(*seen.lock().unwrap(), vec![Some(UserId::from("user-1"))]);

    // A fresh client picks up the persisted session without signing up again.
    let reopened = RemoteIdentity::new(client(&server.uri(), &storage));
    assert_eq!(reopened.resolve_or_create().await.unwrap(), UserId::from("user-1"));
}

#[tokio::test]
async fn test_overlapping_sign_ins_share_one_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("user-1", "tok-1"))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let client = client(&server.uri(), &LocalStorage::new(dir.path()));
    let identity = RemoteIdentity::new(client.clone());

    let (a, b) = tokio::join!(client.sign_in_anonymously(), client.sign_in_anonymously());
    assert_eq!(a.unwrap().user.id, b.unwrap().user.id);

    let (c, d) = tokio::join!(identity.resolve_or_create(), identity.resolve_or_create());
    assert_eq!(c.unwrap(), UserId::from("user-1"));
    assert_eq!(d.unwrap(), UserId::from("user-1"));
}

#[tokio::test]
async fn test_remote_new_guest_signs_out_then_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("user-1", "tok-1")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("user-2", "tok-2")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());
    let identity = RemoteIdentity::new(client(&server.uri(), &storage));
    let (seen, _sub) = recorder(&identity);

    let first = identity.resolve_or_create().await.unwrap();
    identity.invalidate().await.unwrap();
    assert_eq!(storage.read("session.json"), None);

    let second = identity.resolve_or_create().await.unwrap();
    assert_eq!(first, UserId::from("user-1"));
    assert_eq!(second, UserId::from("user-2"));
    assert_eq!(*seen.lock().unwrap(), vec![Some(first), None, Some(second)]);
}

#[tokio::test]
async fn test_remote_logout_of_unknown_session_still_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("user-1", "tok-1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"msg": "session not found"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());
    let identity = RemoteIdentity::new(client(&server.uri(), &storage));
    identity.resolve_or_create().await.unwrap();

    identity.invalidate().await.unwrap();
    assert_eq!(storage.read("session.json"), None);
}

#[tokio::test]
async fn test_remote_refreshes_expired_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("user-1", "tok-new")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("other", "x")))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());
    let expired = Session {
        access_token: "tok-old".into(),
        refresh_token: "refresh-old".into(),
        expires_at: 0,
        user: SessionUser { id: UserId::from("user-1") },
    };
    storage
        .write("session.json", &serde_json::to_string(&expired).unwrap())
        .unwrap();

    let c = client(&server.uri(), &storage);
    let identity = RemoteIdentity::new(c.clone());
    assert_eq!(identity.resolve_or_create().await.unwrap(), UserId::from("user-1"));
    assert_eq!(c.access_token().await.unwrap(), "tok-new");
}

#[tokio::test]
async fn test_remote_rejected_refresh_starts_new_guest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "invalid_grant", "error_description": "Refresh Token Not Found"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("user-9", "tok-9")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());
    let stale = Session {
        access_token: "tok-old".into(),
        refresh_token: "gone".into(),
        expires_at: 0,
        user: SessionUser { id: UserId::from("user-1") },
    };
    storage
        .write("session.json", &serde_json::to_string(&stale).unwrap())
        .unwrap();

    let identity = RemoteIdentity::new(client(&server.uri(), &storage));
    let (seen, _sub) = recorder(&identity);
    assert_eq!(identity.resolve_or_create().await.unwrap(), UserId::from("user-9"));
    assert_eq!(*seen.lock().unwrap(), vec![None, Some(UserId::from("user-9"))]);
}

#[tokio::test]
async fn test_remote_signup_failure_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"code": 422, "msg": "Anonymous sign-ins are disabled"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let identity = RemoteIdentity::new(client(&server.uri(), &LocalStorage::new(dir.path())));
    match identity.resolve_or_create().await {
        Err(AuthError::Rejected { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "Anonymous sign-ins are disabled");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_remote_unreachable_is_auth_error() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on the discard port.
    let identity = RemoteIdentity::new(client("http://127.0.0.1:9", &LocalStorage::new(dir.path())));
    assert!(matches!(
        identity.resolve_or_create().await,
        Err(AuthError::Http(_))
    ));
}
