//! Assembling and serving the application.
//!
//! # Examples
//!
//! ```rust,no_run
//! # tokio_test::block_on(async {
//! let url = axum_items::server::spawn_app().await.unwrap();
//! let response = reqwest::get(format!("{url}/info")).await.unwrap();
//! assert_eq!(200, response.status());
//! # });
//! ```

use crate::{
    core::item::{
        item_repository::{InMemoryItemRepository, ItemRepository},
        pg_item_repository::PgItemRepository,
    },
    infra::{
        config::Config,
        database,
        error::{InternalError, PanicHandler},
        middleware::{log_request_response, MakeRequestIdSpan},
        openapi::ApiDoc,
        security::{TokenKeys, UserStore},
        state::AppState,
    },
};
use axum::{
    error_handling::HandleErrorLayer, response::IntoResponse, routing::get, Json, Router,
};
use color_eyre::eyre;
use http::{header::AUTHORIZATION, StatusCode};
use std::{iter::once, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};

/// Answers requests that take longer than ten seconds with 408.
fn timeout_layer() -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10))
}

/// Constructs the full REST API including middleware.
pub fn app(state: AppState) -> Router {
    // Fallible middleware from tower, mapped to infallible response with [`HandleErrorLayer`].
    let tower_middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e| async move {
            InternalError::Other(format!("Tower middleware failed: {e}")).into_response()
        }))
        .concurrency_limit(500);

    let docs = Router::new()
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .merge(RapiDoc::new("/api/openapi.json").path("/rapidoc"));

    Router::new()
        .nest("/api", crate::feature::api(state).merge(docs))
        // Layers
        .layer(timeout_layer())
        .layer(axum::middleware::from_fn(log_request_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(MakeRequestIdSpan)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new(once(AUTHORIZATION)))
        .layer(tower_middleware)
        .layer(CatchPanicLayer::custom(PanicHandler))
}

/// Builds the application state, connecting to the database if one is configured.
pub async fn init_state(config: &Config) -> eyre::Result<AppState> {
    let items: Arc<dyn ItemRepository> = match &config.database {
        Some(db_config) => {
            let db = database::init_db(db_config);
            database::migrate(&db).await?;
            tracing::info!("Storing items in {}", db_config.database_name);
            Arc::new(PgItemRepository::new(db))
        }
        None => {
            tracing::info!("No database configured, storing items in memory");
            Arc::new(InMemoryItemRepository::new())
        }
    };
    let keys = TokenKeys::new(&config.auth.jwt_secret, config.auth.token_ttl);
    let users = UserStore::from_config(&config.auth)?;
    Ok(AppState::new(items, keys, users))
}

/// Starts the axum server.
pub async fn run_app(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let app = app(state).into_make_service();

    tracing::info!("Starting axum on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await?;
    tracing::info!("Successfully shut down");
    Ok(())
}

/// Completes when when ctrl-c is pressed.
pub(crate) async fn shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to fetch ctrl_c: {}", e);
    }
    tracing::info!("Shutting down");
}

/// Spawn a server on a random port, returning the base url of the API.
pub async fn spawn_app() -> eyre::Result<String> {
    let config = crate::infra::config::load_config()?;
    let state = init_state(&config).await?;
    spawn_app_with_state(state).await
}

/// Spawn a server on a random port with custom state.
pub async fn spawn_app_with_state(state: AppState) -> eyre::Result<String> {
    let address = "127.0.0.1";
    let listener = TcpListener::bind(format!("{address}:0")).await?;
    let port = listener.local_addr()?.port();
    tokio::spawn(run_app(listener, state));
    Ok(format!("http://{address}:{port}/api"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::item::item_repository::{FetchItem, Item, ListItems},
        feature::auth::auth_api::{Me, Token},
        feature::info::info_api::AppInfo,
        infra::{
            config::{AuthConfig, UserConfig},
            error::ErrorBody,
        },
    };
    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    fn item(id: i32, name: &str, item_type: &str, price: i64, quantity: i32) -> Item {
        Item {
            id,
            name: name.to_string(),
            item_type: item_type.to_string(),
            price,
            quantity,
        }
    }

    fn test_state(items: Vec<Item>) -> (AppState, Arc<InMemoryItemRepository>) {
        let repo = Arc::new(InMemoryItemRepository::with_items(items));
        let keys = TokenKeys::new(SECRET, Duration::from_secs(600));
        let auth = AuthConfig {
            jwt_secret: SECRET.to_string(),
            token_ttl: Duration::from_secs(600),
            bcrypt_cost: 4,
            users: vec![UserConfig {
                username: "admin".to_string(),
                password: "admin".to_string(),
                roles: vec!["ADMIN".to_string()],
            }],
        };
        let users = UserStore::from_config(&auth).unwrap();
        (AppState::new(repo.clone(), keys, users), repo)
    }

    /// The items every test starts with.
    fn test_app() -> (Router, Arc<InMemoryItemRepository>) {
        let (state, repo) = test_state(vec![
            item(1, "item1", "type1 ", 1000, 1),
            item(2, "item2", "type2 ", 2000, 1),
        ]);
        (app(state), repo)
    }

    fn token(roles: &[&str]) -> String {
        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        TokenKeys::new(SECRET, Duration::from_secs(600))
            .issue("tester", &roles)
            .unwrap()
    }

    fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token(&["ADMIN"])));
        match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send<T: DeserializeOwned>(app: Router, req: Request<Body>) -> (StatusCode, T) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn lists_all_items() {
        let (app, _) = test_app();
        let (status, items): (_, Value) =
            send(app, admin_request("GET", "/api/v1/items", None)).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(2, items.as_array().unwrap().len());
        assert_eq!("item1", items[0]["name"]);
        assert_eq!("type1 ", items[0]["type"]);
    }

    #[tokio::test]
    async fn gets_existing_item() {
        let (app, _) = test_app();
        let (status, found): (_, Item) =
            send(app, admin_request("GET", "/api/v1/items/1", None)).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(item(1, "item1", "type1 ", 1000, 1), found);
    }

    #[tokio::test]
    async fn getting_missing_item_is_404() {
        let (app, _) = test_app();
        let (status, body): (_, ErrorBody) =
            send(app, admin_request("GET", "/api/v1/items/30", None)).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("ItemId 30 not found", body.message());
    }

    #[tokio::test]
    async fn creates_item() {
        let (app, repo) = test_app();
        let new_item = json!({"id": 3, "name": "item3", "type": "type3 ", "price": 1000, "quantity": 1});
        let (status, created): (_, Item) =
            send(app, admin_request("POST", "/api/v1/items", Some(new_item))).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(item(3, "item3", "type3 ", 1000, 1), created);
        assert_eq!(3, repo.list_items().await.unwrap().len());
    }

    #[tokio::test]
    async fn creating_existing_item_is_400() {
        let (app, repo) = test_app();
        let existing = json!({"id": 2, "name": "item2", "type": "type2 ", "price": 2000, "quantity": 1});
        let (status, body): (_, ErrorBody) =
            send(app, admin_request("POST", "/api/v1/items", Some(existing))).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("ItemId 2 already exists", body.message());
        assert_eq!(2, repo.list_items().await.unwrap().len());
    }

    #[tokio::test]
    async fn creating_invalid_item_is_422() {
        let (app, repo) = test_app();
        let invalid = json!({"id": 3, "name": "", "type": "type3", "price": -1, "quantity": 1});
        let (status, body): (_, ErrorBody) =
            send(app, admin_request("POST", "/api/v1/items", Some(invalid))).await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!("invalid field(s): name (length),price (range)", body.message());
        assert_eq!(None, repo.fetch_item(3).await.unwrap());
    }

    #[tokio::test]
    async fn updates_item() {
        let (app, repo) = test_app();
        let update = json!({"id": 1, "name": "UpdatedItemName", "type": "type3 ", "price": 1000, "quantity": 1});
        let (status, updated): (_, Item) =
            send(app, admin_request("PUT", "/api/v1/items/1", Some(update))).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("UpdatedItemName", updated.name);
        let stored = repo.fetch_item(1).await.unwrap().unwrap();
        assert_eq!("UpdatedItemName", stored.name);
        assert_eq!("type3 ", stored.item_type);
    }

    #[tokio::test]
    async fn updating_only_name_keeps_other_fields() {
        let (app, repo) = test_app();
        let update = json!({"name": "UpdatedItemName"});
        let (status, _): (_, Item) =
            send(app, admin_request("PUT", "/api/v1/items/1", Some(update))).await;
        assert_eq!(StatusCode::OK, status);
        let stored = repo.fetch_item(1).await.unwrap().unwrap();
        assert_eq!(item(1, "UpdatedItemName", "type1 ", 1000, 1), stored);
    }

    #[tokio::test]
    async fn updating_missing_item_is_404() {
        let (app, repo) = test_app();
        let update = json!({"id": 20, "name": "item3", "type": "type3 ", "price": 1000, "quantity": 1});
        let (status, body): (_, ErrorBody) =
            send(app, admin_request("PUT", "/api/v1/items/20", Some(update))).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("ItemId 20 not found", body.message());
        assert_eq!(None, repo.fetch_item(20).await.unwrap());
    }

    #[tokio::test]
    async fn deletes_item() {
        let (app, repo) = test_app();
        let (status, body): (_, Value) =
            send(app.clone(), admin_request("DELETE", "/api/v1/items/2", None)).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!({"deleted": true}), body);
        assert_eq!(None, repo.fetch_item(2).await.unwrap());

        let (status, _): (_, ErrorBody) =
            send(app, admin_request("GET", "/api/v1/items/2", None)).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
    }

    #[tokio::test]
    async fn deleting_missing_item_is_404() {
        let (app, repo) = test_app();
        let (status, body): (_, ErrorBody) =
            send(app, admin_request("DELETE", "/api/v1/items/20", None)).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("ItemId 20 not found", body.message());
        assert_eq!(2, repo.list_items().await.unwrap().len());
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let (app, _) = test_app();
        let res = app
            .oneshot(admin_request("GET", "/api/v1/items/abc", None))
            .await
            .unwrap();
        assert_eq!(StatusCode::BAD_REQUEST, res.status());
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let (app, _) = test_app();
        let req = Request::get("/api/v1/items").body(Body::empty()).unwrap();
        let (status, body): (_, ErrorBody) = send(app, req).await;
        assert_eq!(StatusCode::UNAUTHORIZED, status);
        assert_eq!("unauthorized", body.message());
    }

    #[tokio::test]
    async fn invalid_token_is_401() {
        let (app, _) = test_app();
        let req = Request::get("/api/v1/items")
            .header("Authorization", "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();
        let (status, _): (_, ErrorBody) = send(app, req).await;
        assert_eq!(StatusCode::UNAUTHORIZED, status);
    }

    #[tokio::test]
    async fn non_admin_is_403() {
        let (app, repo) = test_app();
        let req = Request::delete("/api/v1/items/1")
            .header("Authorization", format!("Bearer {}", token(&["USER"])))
            .body(Body::empty())
            .unwrap();
        let (status, body): (_, ErrorBody) = send(app, req).await;
        assert_eq!(StatusCode::FORBIDDEN, status);
        assert_eq!("forbidden", body.message());
        assert!(repo.fetch_item(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn signed_in_admin_can_list_items() {
        let (app, _) = test_app();
        let req = Request::post("/api/auth/signin")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"username": "admin", "password": "admin"}"#))
            .unwrap();
        let (status, token): (_, Token) = send(app.clone(), req).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("Bearer", token.token_type);
        assert_eq!(600, token.expires_in);

        let req = Request::get("/api/v1/items")
            .header("Authorization", format!("Bearer {}", token.token))
            .body(Body::empty())
            .unwrap();
        let (status, items): (_, Vec<Item>) = send(app.clone(), req).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(2, items.len());

        let req = Request::get("/api/auth/me")
            .header("Authorization", format!("Bearer {}", token.token))
            .body(Body::empty())
            .unwrap();
        let (status, me): (_, Me) = send(app, req).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("admin", me.username);
        assert_eq!(vec!["ADMIN".to_string()], me.roles);
    }

    #[tokio::test]
    async fn wrong_password_is_401() {
        let (app, _) = test_app();
        let req = Request::post("/api/auth/signin")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"username": "admin", "password": "notadmin"}"#))
            .unwrap();
        let (status, body): (_, ErrorBody) = send(app, req).await;
        assert_eq!(StatusCode::UNAUTHORIZED, status);
        assert_eq!("unauthorized", body.message());
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (app, _) = test_app();
        let req = Request::get("/api/info").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(StatusCode::OK, res.status());
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn openapi_lists_item_paths() {
        let (app, _) = test_app();
        let req = Request::get("/api/openapi.json").body(Body::empty()).unwrap();
        let (status, api): (_, Value) = send(app, req).await;
        assert_eq!(StatusCode::OK, status);
        assert!(api["paths"]["/api/v1/items"].is_object());
        assert!(api["paths"]["/api/v1/items/{id}"].is_object());
    }

    #[tokio::test]
    async fn redoc_oneshot() {
        let (app, _) = test_app();
        let req = Request::get("/api/redoc").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(StatusCode::OK, res.status());
    }

    #[tokio::test]
    async fn rapidoc_oneshot() {
        let (app, _) = test_app();
        let req = Request::get("/api/rapidoc").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(StatusCode::OK, res.status());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_requests_time_out_with_408() {
        let slow = Router::new()
            .route(
                "/slow",
                get(|| async { tokio::time::sleep(Duration::from_secs(60)).await }),
            )
            .layer(timeout_layer());
        let req = Request::get("/slow").body(Body::empty()).unwrap();
        let res = slow.oneshot(req).await.unwrap();
        assert_eq!(StatusCode::REQUEST_TIMEOUT, res.status());
    }

    #[tokio::test]
    async fn spawned_server_answers_over_http() {
        let (state, _) = test_state(vec![]);
        let url = spawn_app_with_state(state).await.unwrap();
        let client = reqwest::Client::new();

        let info: AppInfo = client
            .get(format!("{url}/info"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(env!("CARGO_PKG_NAME"), info.name);

        let response = client
            .post(format!("{url}/v1/items"))
            .bearer_auth(token(&["ADMIN"]))
            .json(&item(7, "item7", "type7", 70, 7))
            .send()
            .await
            .unwrap();
        assert_eq!(reqwest::StatusCode::OK, response.status());

        let items: Vec<Item> = client
            .get(format!("{url}/v1/items"))
            .bearer_auth(token(&["ADMIN"]))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(vec![item(7, "item7", "type7", 70, 7)], items);
    }
}
