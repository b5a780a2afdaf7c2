use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, Path, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
};
use platform_api::{ApiError, ApiResult};
use platform_db::DbPool;
use products_hr::{
    Employee, EmployeeId, EmployeeService, SeaOrmEmployeeRepository, ServiceError,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub employees: EmployeeService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the employee service to the SeaORM repository over `pool`.
    pub fn new(pool: DbPool, config: Arc<AppConfig>) -> Self {
        let repo = SeaOrmEmployeeRepository::new(pool.clone());
        Self {
            pool,
            employees: EmployeeService::new(Arc::new(repo)),
            config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "employee server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/employees",
            get(list_employees_handler).post(create_employee_handler),
        )
        .route(
            "/api/employees/{id}",
            get(get_employee_handler)
                .put(update_employee_handler)
                .delete(delete_employee_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// `Json` whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct JsonBody<T>(T);

/// `Path` whose rejections render as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
struct PathParam<T>(T);

/// Request body for create and update. A client-sent `id` is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl EmployeePayload {
    fn validate(&self) -> ApiResult<()> {
        for (field, value) in [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::InvalidInput(format!("{field} must not be blank")));
            }
        }
        Ok(())
    }

    fn into_employee(self) -> Employee {
        Employee::new(self.first_name, self.last_name, self.email)
    }
}

fn service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::AlreadyExists { .. } => ApiError::Conflict(err.to_string()),
        ServiceError::Repository(inner) => ApiError::internal(inner),
    }
}

async fn create_employee_handler(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EmployeePayload>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    payload.validate()?;
    let created = state
        .employees
        .create_employee(payload.into_employee())
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_employees_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Employee>>> {
    let employees = state
        .employees
        .list_employees()
        .await
        .map_err(service_error)?;
    Ok(Json(employees))
}

async fn get_employee_handler(
    State(state): State<AppState>,
    PathParam(id): PathParam<EmployeeId>,
) -> ApiResult<Json<Employee>> {
    state
        .employees
        .get_employee_by_id(id)
        .await
        .map_err(service_error)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn update_employee_handler(
    State(state): State<AppState>,
    PathParam(id): PathParam<EmployeeId>,
    JsonBody(payload): JsonBody<EmployeePayload>,
) -> ApiResult<Json<Employee>> {
    let Some(mut existing) = state
        .employees
        .get_employee_by_id(id)
        .await
        .map_err(service_error)?
    else {
        return Err(ApiError::NotFound);
    };
    payload.validate()?;
    existing.first_name = payload.first_name;
    existing.last_name = payload.last_name;
    existing.email = payload.email;
    let updated = state
        .employees
        .update_employee(existing)
        .await
        .map_err(service_error)?;
    Ok(Json(updated))
}

async fn delete_employee_handler(
    State(state): State<AppState>,
    PathParam(id): PathParam<EmployeeId>,
) -> ApiResult<StatusCode> {
    state
        .employees
        .delete_employee(id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::OK)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = match platform_db::ping(&state.pool).await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "database ping failed");
            false
        }
    };
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use platform_db::DatabaseSettings;
    use products_hr::InMemoryEmployeeRepository;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_router() -> (Router, Arc<InMemoryEmployeeRepository>) {
        let pool = platform_db::connect(&DatabaseSettings::new("sqlite::memory:"))
            .await
            .unwrap();
        let repo = Arc::new(InMemoryEmployeeRepository::new());
        let state = AppState {
            pool,
            employees: EmployeeService::new(repo.clone()),
            config: Arc::new(AppConfig::default()),
        };
        (build_router(state), repo)
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    fn juan() -> Value {
        json!({"firstName": "Juan", "lastName": "de la Rosa", "email": "juan@example.com"})
    }

    #[tokio::test]
    async fn create_returns_201_with_saved_employee() {
        let (router, _) = test_router().await;
        let (status, body) = send(&router, Method::POST, "/api/employees", Some(juan())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            json_of(&body),
            json!({"id": 1, "firstName": "Juan", "lastName": "de la Rosa", "email": "juan@example.com"})
        );
    }

    #[tokio::test]
    async fn create_ignores_client_id() {
        let (router, _) = test_router().await;
        let mut payload = juan();
        payload["id"] = json!(77);
        let (status, body) = send(&router, Method::POST, "/api/employees", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json_of(&body)["id"], 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_409_with_message() {
        let (router, repo) = test_router().await;
        send(&router, Method::POST, "/api/employees", Some(juan())).await;
        let (status, body) = send(&router, Method::POST, "/api/employees", Some(juan())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            json_of(&body),
            json!({
                "code": "CONFLICT",
                "message": "Employee already exist with given email juan@example.com"
            })
        );
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn blank_fields_are_400() {
        let (router, repo) = test_router().await;
        let payload = json!({"firstName": "  ", "lastName": "X", "email": "x@example.com"});
        let (status, body) = send(&router, Method::POST, "/api/employees", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["code"], "INVALID_INPUT");
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let (router, repo) = test_router().await;
        let payload = json!({"firstName": "Juan"});
        let (status, body) = send(&router, Method::POST, "/api/employees", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["code"], "INVALID_INPUT");
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn non_json_body_is_400_with_error_json() {
        let (router, repo) = test_router().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/employees")
            .header(http::header::CONTENT_TYPE, "text/plain")
            .body(Body::from("Juan"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(json_of(&bytes)["code"], "INVALID_INPUT");
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn list_returns_all_employees() {
        let (router, _) = test_router().await;
        send(&router, Method::POST, "/api/employees", Some(juan())).await;
        let rodrigo =
            json!({"firstName": "Rodrigo", "lastName": "Sarabia", "email": "rodrigo@example.com"});
        send(&router, Method::POST, "/api/employees", Some(rodrigo)).await;

        let (status, body) = send(&router, Method::GET, "/api/employees", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = json_of(&body);
        assert_eq!(list.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn get_by_id_returns_employee_or_404() {
        let (router, _) = test_router().await;
        send(&router, Method::POST, "/api/employees", Some(juan())).await;

        let (status, body) = send(&router, Method::GET, "/api/employees/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["firstName"], "Juan");

        let (status, body) = send(&router, Method::GET, "/api/employees/5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn non_numeric_id_is_400() {
        let (router, _) = test_router().await;
        let (status, body) = send(&router, Method::GET, "/api/employees/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn ids_beyond_32_bits_are_ordinary_misses() {
        let (router, _) = test_router().await;
        for uri in ["/api/employees/2147483648", "/api/employees/9999999999"] {
            let (status, body) = send(&router, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "GET {uri}");
            assert!(body.is_empty());

            let (status, _) = send(&router, Method::DELETE, uri, None).await;
            assert_eq!(status, StatusCode::OK, "DELETE {uri}");
        }
    }

    #[tokio::test]
    async fn update_of_missing_employee_is_404_even_with_blank_fields() {
        let (router, repo) = test_router().await;
        let payload = json!({"firstName": "", "lastName": "", "email": ""});
        let (status, _) = send(&router, Method::PUT, "/api/employees/1", Some(payload)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn update_with_blank_fields_is_400_and_keeps_row() {
        let (router, _) = test_router().await;
        send(&router, Method::POST, "/api/employees", Some(juan())).await;
        let payload = json!({"firstName": "John", "lastName": "de la Rosa", "email": " "});
        let (status, body) = send(&router, Method::PUT, "/api/employees/1", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["code"], "INVALID_INPUT");

        let (_, body) = send(&router, Method::GET, "/api/employees/1", None).await;
        assert_eq!(json_of(&body)["email"], "juan@example.com");
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let (router, _) = test_router().await;
        send(&router, Method::POST, "/api/employees", Some(juan())).await;

        let payload = json!({"firstName": "John", "lastName": "de la Rosa", "email": "john@example.com"});
        let (status, body) = send(&router, Method::PUT, "/api/employees/1", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        let updated = json_of(&body);
        assert_eq!(updated["id"], 1);
        assert_eq!(updated["firstName"], "John");
        assert_eq!(updated["email"], "john@example.com");
    }

    #[tokio::test]
    async fn update_of_missing_employee_is_404_and_stores_nothing() {
        let (router, repo) = test_router().await;
        let payload = json!({"firstName": "John", "lastName": "de la Rosa", "email": "john@example.com"});
        let (status, _) = send(&router, Method::PUT, "/api/employees/1", Some(payload)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn delete_is_200_even_when_absent() {
        let (router, _) = test_router().await;
        send(&router, Method::POST, "/api/employees", Some(juan())).await;

        let (status, body) = send(&router, Method::DELETE, "/api/employees/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, _) = send(&router, Method::GET, "/api/employees/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, Method::DELETE, "/api/employees/1", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_database_status() {
        let (router, _) = test_router().await;
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let health = json_of(&body);
        assert_eq!(health["ok"], true);
        assert_eq!(health["dbOk"], true);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (router, _) = test_router().await;
        let request = Request::builder()
            .uri("/api/employees")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
