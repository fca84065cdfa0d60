use super::*;
use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use shared::{
    domain::{PublicationId, PublicationStatus, ReportId, ReportStatus, UserKind},
    protocol::Profile,
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::session::unsigned_token;

#[derive(Clone)]
struct DirectoryState {
    token: String,
    users: Arc<Mutex<BTreeMap<String, Value>>>,
    next_id: Arc<Mutex<u32>>,
}

fn admin_token() -> String {
    unsigned_token(json!({
        "sub": "admin@binet.ma",
        "roles": "ROLE_ADMIN",
        "exp": Utc::now().timestamp() + 3600
    }))
}

fn check_auth(state: &DirectoryState, headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {}", state.token);
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        Some(_) => Err(StatusCode::FORBIDDEN.into_response()),
        None => Err(StatusCode::UNAUTHORIZED.into_response()),
    }
}

async fn list_users(State(state): State<DirectoryState>, headers: HeaderMap) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    let users = state.users.lock().await;
    Json(users.values().cloned().collect::<Vec<_>>()).into_response()
}

async fn get_user(
    State(state): State<DirectoryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    match state.users.lock().await.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_user(
    State(state): State<DirectoryState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    let mut users = state.users.lock().await;
    if users.values().any(|u| u["email"] == body["email"]) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "email already used", "field": "email"})),
        )
            .into_response();
    }
    let mut next_id = state.next_id.lock().await;
    *next_id += 1;
    let id = format!("u{}", *next_id);
    let user = json!({
        "id": id,
        "nom": body["nom"],
        "prenom": body["prenom"],
        "email": body["email"],
        "solde": 0.0,
        "roles": body["roles"],
        "entreprise": body["entreprise"],
    });
    users.insert(id, user.clone());
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn update_user(
    State(state): State<DirectoryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    let mut users = state.users.lock().await;
    let Some(user) = users.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let (Some(target), Some(patch)) = (user.as_object_mut(), body.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(user.clone()).into_response()
}

async fn delete_user(
    State(state): State<DirectoryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    match state.users.lock().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn login(State(state): State<DirectoryState>, Json(body): Json<Value>) -> Response {
    if body["password"] == "secret1" {
        Json(json!({"token": state.token})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "bad credentials"})),
        )
            .into_response()
    }
}

async fn moderate_publication(
    State(state): State<DirectoryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    Json(json!({
        "id": id,
        "title": "Memoire PFE",
        "type": "MEMOIR",
        "status": body["status"],
        "price": 50.0
    }))
    .into_response()
}

async fn report_status(
    State(state): State<DirectoryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    Json(json!({
        "id": id,
        "reason": "plagiarism",
        "publicationId": "p1",
        "reporterId": "u1",
        "status": body["status"],
        "createdAt": "2024-01-20T08:30:00"
    }))
    .into_response()
}

async fn list_categories(State(state): State<DirectoryState>, headers: HeaderMap) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    Json(json!([
        {"id": "c1", "name": "Informatique", "description": "", "isActive": true},
        {"id": "c2", "name": "Finance", "isActive": false}
    ]))
    .into_response()
}

async fn spawn_directory_server() -> anyhow::Result<(String, DirectoryState)> {
    let mut users = BTreeMap::new();
    users.insert(
        "u1".to_string(),
        json!({"id": "u1", "nom": "Alaoui", "prenom": "Sara", "email": "sara@binet.ma",
               "solde": 150.0, "roles": ["ROLE_ETUDIANT"], "ecole": "ENSIAS"}),
    );
    users.insert(
        "u2".to_string(),
        json!({"id": "u2", "nom": "Idrissi", "prenom": "Karim", "email": "karim@binet.ma",
               "solde": 20.0, "roles": ["ROLE_PROFESSEUR", "ROLE_ADMIN"]}),
    );
    let state = DirectoryState {
        token: admin_token(),
        users: Arc::new(Mutex::new(users)),
        next_id: Arc::new(Mutex::new(2)),
    };

    let app = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/auth/login", post(login))
        .route("/api/publications/:id", put(moderate_publication))
        .route("/api/reports/:id/status", put(report_status))
        .route("/api/categories", get(list_categories))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn settings_for(base_url: &str) -> Settings {
    Settings {
        api_base_url: base_url.to_string(),
        email_send_pause_ms: 0,
        ..Settings::default()
    }
}

fn logged_in(base_url: &str, token: &str) -> ApiClient {
    let session = Session::from_token(token).expect("session");
    ApiClient::new(&settings_for(base_url))
        .expect("client")
        .with_session(session)
}

#[tokio::test]
async fn list_users_sends_bearer_token_and_decodes_roles() {
    let (base_url, state) = spawn_directory_server().await.expect("spawn server");
    let users = logged_in(&base_url, &state.token)
        .users()
        .list_users()
        .await
        .expect("list");

    assert_eq!(users.len(), 2);
    let karim = users.iter().find(|u| u.id.as_str() == "u2").expect("u2");
    assert_eq!(karim.kind(), UserKind::Administrator);
    assert_eq!(karim.balance, 20.0);
}

#[tokio::test]
async fn request_without_session_fails_locally() {
    let (base_url, _state) = spawn_directory_server().await.expect("spawn server");
    let api = ApiClient::new(&settings_for(&base_url)).expect("client");

    let err = api.users().list_users().await.expect_err("no session");
    assert!(matches!(
        err,
        ClientError::Authentication { status: None, .. }
    ));
}

#[tokio::test]
async fn rejected_token_maps_to_authentication_error() {
    let (base_url, _state) = spawn_directory_server().await.expect("spawn server");
    let other_token = unsigned_token(json!({"sub": "intruder@binet.ma", "roles": "ROLE_ETUDIANT"}));

    let err = logged_in(&base_url, &other_token)
        .users()
        .list_users()
        .await
        .expect_err("forbidden");
    assert!(err.requires_reauth());
    assert!(matches!(
        err,
        ClientError::Authentication {
            status: Some(403),
            ..
        }
    ));
}

#[tokio::test]
async fn expired_session_is_rejected_before_sending() {
    let (base_url, _state) = spawn_directory_server().await.expect("spawn server");
    let expired = unsigned_token(json!({
        "sub": "admin@binet.ma",
        "roles": "ROLE_ADMIN",
        "exp": Utc::now().timestamp() - 60
    }));

    let err = logged_in(&base_url, &expired)
        .users()
        .list_users()
        .await
        .expect_err("expired");
    assert!(err.to_string().contains("session expired"));
}

#[tokio::test]
async fn get_unknown_user_is_not_found() {
    let (base_url, state) = spawn_directory_server().await.expect("spawn server");
    let err = logged_in(&base_url, &state.token)
        .users()
        .get_user(&UserId::from("missing"))
        .await
        .expect_err("missing user");
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn create_update_and_delete_round_trip_through_backend() {
    let (base_url, state) = spawn_directory_server().await.expect("spawn server");
    let users = logged_in(&base_url, &state.token).users();

    let created = users
        .create_user(&NewUser::new(
            "Benali",
            "Omar",
            "omar@binet.ma",
            "secret1",
            Profile::Professional {
                company: Some("OCP".into()),
                sector: None,
                position: None,
            },
        ))
        .await
        .expect("create");
    assert_eq!(created.kind(), UserKind::Professional);
    assert_eq!(created.profile_fields.company.as_deref(), Some("OCP"));

    let updated = users
        .update_user(
            &created.id,
            &UserUpdate {
                balance: Some(75.0),
                ..UserUpdate::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.balance, 75.0);

    users.delete_user(&created.id).await.expect("delete");
    assert!(!state.users.lock().await.contains_key(created.id.as_str()));
}

#[tokio::test]
async fn duplicate_email_surfaces_field_validation() {
    let (base_url, state) = spawn_directory_server().await.expect("spawn server");
    let err = logged_in(&base_url, &state.token)
        .users()
        .create_user(&NewUser::new(
            "Alaoui",
            "Sara",
            "sara@binet.ma",
            "secret1",
            Profile::empty(UserKind::Student),
        ))
        .await
        .expect_err("duplicate");

    match err {
        ClientError::Validation { field, message } => {
            assert_eq!(field, "email");
            assert_eq!(message, "email already used");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn short_password_is_rejected_before_request() {
    let (base_url, state) = spawn_directory_server().await.expect("spawn server");
    let err = logged_in(&base_url, &state.token)
        .users()
        .create_user(&NewUser::new(
            "Tazi",
            "Nadia",
            "nadia@binet.ma",
            "123",
            Profile::empty(UserKind::Student),
        ))
        .await
        .expect_err("short password");

    assert!(matches!(err, ClientError::Validation { ref field, .. } if field == "password"));
    assert_eq!(state.users.lock().await.len(), 2);
}

#[tokio::test]
async fn login_returns_session_for_valid_credentials() {
    let (base_url, state) = spawn_directory_server().await.expect("spawn server");
    let auth = AuthClient::new(ApiClient::new(&settings_for(&base_url)).expect("client"));

    let session = auth
        .login("admin@binet.ma", "secret1")
        .await
        .expect("login");
    assert_eq!(session.bearer(), state.token);
    assert!(session.principal().is_admin());

    let err = auth
        .login("admin@binet.ma", "wrong")
        .await
        .expect_err("bad password");
    assert!(err.requires_reauth());
}

#[tokio::test]
async fn logout_drops_session() {
    let (base_url, state) = spawn_directory_server().await.expect("spawn server");
    let mut api = logged_in(&base_url, &state.token);
    assert!(api.session().is_some());

    api.logout();
    assert!(api.session().is_none());
    assert!(api.users().list_users().await.is_err());
}

#[tokio::test]
async fn moderation_and_report_status_use_typed_statuses() {
    let (base_url, state) = spawn_directory_server().await.expect("spawn server");
    let api = logged_in(&base_url, &state.token);

    let publication = api
        .publications()
        .approve(&PublicationId::from("p1"))
        .await
        .expect("approve");
    assert_eq!(publication.status, PublicationStatus::Approved);

    let report = api
        .reports()
        .dismiss(&ReportId::from("r9"))
        .await
        .expect("dismiss");
    assert_eq!(report.status, ReportStatus::Dismissed);
    assert!(report.created_at.is_some());

    let categories = api.categories().list().await.expect("categories");
    assert_eq!(categories.len(), 2);
    assert!(!categories[1].is_active);
}

#[tokio::test]
async fn unreachable_backend_is_retryable_fetch_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = logged_in(&format!("http://{addr}"), &admin_token())
        .users()
        .list_users()
        .await
        .expect_err("refused");
    assert!(err.is_retryable());
}

#[test]
fn endpoint_percent_encodes_identifiers_and_keeps_base_path() {
    let api = ApiClient::new(&settings_for("http://localhost:8080/gateway")).expect("client");
    let url = api.endpoint(&["users", "a/b c"]).expect("url");
    assert_eq!(url.path(), "/gateway/users/a%2Fb%20c");

    let api = ApiClient::new(&settings_for("http://localhost:8080/")).expect("client");
    assert_eq!(api.endpoint(&["users"]).expect("url").path(), "/users");
}
