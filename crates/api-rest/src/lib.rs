//! # API REST
//!
//! REST API implementation for Posterbox.
//!
//! Handles:
//! - HTTP endpoints with axum (upload, direct link, fetch, delete)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialisation, CORS, multipart)
//!
//! Every handler validates field presence before any side effect; a
//! validation failure short-circuits with a 400 and `{"error": message}`
//! and leaves the catalogue untouched. Media-host failures surface the
//! provider's message with a 500. Catalogue persistence is best-effort and
//! never turns an accepted mutation into an error response.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use posterbox_core::{CatalogError, CatalogStore, StoredLink, UserPosters};
use posterbox_uploader::{MediaUploader, UploadError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Poster images comfortably fit under this; multipart bodies above it are
/// rejected by the transport before reaching the handler.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Multipart field name carrying the poster image bytes.
const POSTER_FIELD: &str = "poster";

/// Application state shared across REST API handlers.
///
/// The catalogue store and the media uploader are injected here rather than
/// read from process globals, so tests can substitute both.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CatalogStore>,
    pub uploader: Arc<dyn MediaUploader>,
    pub upload_folder: String,
}

/// A stored poster link as returned by the mutation endpoints.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct PosterLinkRes {
    pub username: String,
    pub film: String,
    pub url: String,
}

impl From<StoredLink> for PosterLinkRes {
    fn from(link: StoredLink) -> Self {
        Self {
            username: link.username,
            film: link.film,
            url: link.url,
        }
    }
}

/// Request body for POST /link.
#[derive(Debug, serde::Deserialize, ToSchema)]
pub struct AddLinkReq {
    pub film: Option<String>,
    pub username: Option<String>,
    pub link: Option<String>,
}

/// Request body for POST /delete.
#[derive(Debug, serde::Deserialize, ToSchema)]
pub struct DeleteReq {
    pub username: Option<String>,
    pub film: Option<String>,
}

/// Confirmation message returned by POST /delete.
#[derive(Debug, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct DeleteRes {
    pub message: String,
}

/// Error body returned by all failing endpoints.
#[derive(Debug, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

/// Health check response.
#[derive(Debug, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorRes>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

fn server_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

fn store_error(e: CatalogError) -> ApiError {
    match e {
        CatalogError::InvalidInput(message) => bad_request(message),
        CatalogError::LinkNotFound { .. } => not_found("Poster not found"),
        other => {
            tracing::error!("catalogue operation failed: {other}");
            server_error("Internal error")
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, upload_poster, add_link, user_posters, delete_link),
    components(schemas(
        HealthRes,
        PosterLinkRes,
        AddLinkReq,
        DeleteReq,
        DeleteRes,
        ErrorRes
    ))
)]
struct ApiDoc;

/// Builds the Posterbox REST router.
///
/// Routes, Swagger UI and CORS are assembled here; binaries only bind a
/// listener and serve the result.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload_poster))
        .route("/link", post(add_link))
        .route("/delete", post(delete_link))
        .route("/:username", get(user_posters))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Posterbox is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Poster uploaded and link stored", body = PosterLinkRes),
        (status = 400, description = "Missing file, film or username", body = ErrorRes),
        (status = 500, description = "Media host rejected the upload", body = ErrorRes)
    )
)]
/// Upload a poster image and store its public URL
///
/// Accepts a multipart form with the image bytes in the `poster` field and
/// `film`/`username` text fields. The payload is forwarded to the media
/// host from memory (never buffered to disk); on success the returned
/// durable URL is stored for the (username, film) pair.
///
/// # Errors
///
/// Returns `400 Bad Request` if the file, film or username field is
/// missing, and `500 Internal Server Error` carrying the provider's
/// message if the media host rejects the upload.
#[axum::debug_handler]
async fn upload_poster(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PosterLinkRes>, ApiError> {
    let mut poster: Option<Vec<u8>> = None;
    let mut film: Option<String> = None;
    let mut username: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart request: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(POSTER_FIELD) => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("failed to read poster field: {e}")))?;
                poster = Some(data.to_vec());
            }
            Some("film") => {
                film = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| bad_request(format!("failed to read film field: {e}")))?,
                );
            }
            Some("username") => {
                username = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| bad_request(format!("failed to read username field: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let Some(poster) = poster else {
        return Err(bad_request("No file received"));
    };
    let Some(film) = film.filter(|f| !f.trim().is_empty()) else {
        return Err(bad_request("No film name received"));
    };
    let Some(username) = username.filter(|u| !u.trim().is_empty()) else {
        return Err(bad_request("No username received"));
    };

    tracing::info!("upload request for {username} - {film}");

    let uploaded = state
        .uploader
        .upload(poster, &state.upload_folder)
        .await
        .map_err(|e| {
            tracing::error!("poster upload failed: {e}");
            match e {
                UploadError::Provider(message) => server_error(message),
                other => server_error(other.to_string()),
            }
        })?;

    let stored = state
        .store
        .set_link(&username, &film, &uploaded.url)
        .map_err(store_error)?;
    Ok(Json(stored.into()))
}

#[utoipa::path(
    post,
    path = "/link",
    request_body = AddLinkReq,
    responses(
        (status = 200, description = "Poster link stored", body = PosterLinkRes),
        (status = 400, description = "Missing link, film or username", body = ErrorRes)
    )
)]
/// Store a poster link supplied directly by the client
///
/// # Errors
///
/// Returns `400 Bad Request` if the link, film or username field is
/// missing or empty. Nothing is mutated on a validation failure.
#[axum::debug_handler]
async fn add_link(
    State(state): State<AppState>,
    Json(req): Json<AddLinkReq>,
) -> Result<Json<PosterLinkRes>, ApiError> {
    let Some(link) = present(req.link) else {
        return Err(bad_request("No link received"));
    };
    let Some(film) = present(req.film) else {
        return Err(bad_request("No film name received"));
    };
    let Some(username) = present(req.username) else {
        return Err(bad_request("No username received"));
    };

    tracing::info!("direct link request for {username} - {film}");

    let stored = state
        .store
        .set_link(&username, &film, &link)
        .map_err(store_error)?;
    Ok(Json(stored.into()))
}

#[utoipa::path(
    get,
    path = "/{username}",
    params(
        ("username" = String, Path, description = "User whose poster links to fetch")
    ),
    responses(
        (status = 200, description = "The user's film to poster-URL mapping, possibly empty", body = BTreeMap<String, String>)
    )
)]
/// Fetch a user's poster links
///
/// Unknown users yield an empty mapping, never an error.
#[axum::debug_handler]
async fn user_posters(
    State(state): State<AppState>,
    AxumPath(username): AxumPath<String>,
) -> Json<UserPosters> {
    Json(state.store.user_posters(&username))
}

#[utoipa::path(
    post,
    path = "/delete",
    request_body = DeleteReq,
    responses(
        (status = 200, description = "Poster link removed", body = DeleteRes),
        (status = 400, description = "Missing username or film", body = ErrorRes),
        (status = 404, description = "No such poster link", body = ErrorRes)
    )
)]
/// Remove a stored poster link
///
/// # Errors
///
/// Returns `400 Bad Request` if the username or film field is missing and
/// `404 Not Found` if the user or film entry does not exist.
#[axum::debug_handler]
async fn delete_link(
    State(state): State<AppState>,
    Json(req): Json<DeleteReq>,
) -> Result<Json<DeleteRes>, ApiError> {
    let (Some(username), Some(film)) = (present(req.username), present(req.film)) else {
        return Err(bad_request("Missing username or film name"));
    };

    tracing::info!("delete request for {username} - {film}");

    let message = state
        .store
        .delete_link(&username, &film)
        .map_err(store_error)?;
    Ok(Json(DeleteRes { message }))
}

/// A field counts as present only when it holds a non-empty value.
fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use posterbox_core::CoreConfig;
    use posterbox_uploader::{UploadResult, UploadedMedia};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct FixedUrlUploader;

    #[async_trait]
    impl MediaUploader for FixedUrlUploader {
        async fn upload(&self, _payload: Vec<u8>, folder: &str) -> UploadResult<UploadedMedia> {
            Ok(UploadedMedia {
                url: format!("https://media.test/{folder}/poster.png"),
                public_id: None,
            })
        }
    }

    struct FailingUploader;

    #[async_trait]
    impl MediaUploader for FailingUploader {
        async fn upload(&self, _payload: Vec<u8>, _folder: &str) -> UploadResult<UploadedMedia> {
            Err(UploadError::Provider("Invalid image file".into()))
        }
    }

    fn test_state(temp: &TempDir, uploader: Arc<dyn MediaUploader>) -> AppState {
        let cfg = Arc::new(CoreConfig::new(temp.path().join("poster.json")).unwrap());
        AppState {
            store: Arc::new(CatalogStore::load(cfg)),
            uploader,
            upload_folder: "letterboxd-posters".into(),
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    const BOUNDARY: &str = "posterbox-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a [u8]),
    }

    fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"poster.png\"\r\nContent-Type: image/png\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_alive() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(&temp, Arc::new(FixedUrlUploader)));

        let (status, body) = send(app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn link_then_get_round_trips() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp, Arc::new(FixedUrlUploader));

        let (status, body) = send(
            router(state.clone()),
            json_request(
                "/link",
                json!({"username": "alice", "film": "Dune", "link": "http://x/p.jpg"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"username": "alice", "film": "Dune", "url": "http://x/p.jpg"})
        );

        let (status, body) = send(router(state), get_request("/alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"Dune": "http://x/p.jpg"}));
    }

    #[tokio::test]
    async fn link_with_missing_field_is_rejected() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp, Arc::new(FixedUrlUploader));

        let cases = [
            json!({"username": "alice", "film": "Dune"}),
            json!({"username": "alice", "link": "http://x/p.jpg"}),
            json!({"film": "Dune", "link": "http://x/p.jpg"}),
            json!({"username": "alice", "film": "Dune", "link": ""}),
        ];
        for case in cases {
            let (status, body) = send(router(state.clone()), json_request("/link", case)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }

        assert!(state.store.user_posters("alice").is_empty());
    }

    #[tokio::test]
    async fn unknown_user_yields_empty_object() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(&temp, Arc::new(FixedUrlUploader)));

        let (status, body) = send(app, get_request("/nobody")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn delete_removes_link_then_reports_not_found() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp, Arc::new(FixedUrlUploader));
        state
            .store
            .set_link("alice", "Dune", "http://x/p.jpg")
            .unwrap();

        let (status, body) = send(
            router(state.clone()),
            json_request("/delete", json!({"username": "alice", "film": "Dune"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("Dune"));

        let (status, body) = send(router(state.clone()), get_request("/alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));

        let (status, _) = send(
            router(state),
            json_request("/delete", json!({"username": "alice", "film": "Dune"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_with_missing_fields_is_rejected() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp, Arc::new(FixedUrlUploader));

        let (status, body) = send(
            router(state),
            json_request("/delete", json!({"username": "alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Missing username or film name"));
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected_and_catalogue_unchanged() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp, Arc::new(FixedUrlUploader));

        let (status, body) = send(
            router(state.clone()),
            multipart_request(&[
                Part::Text("film", "Dune"),
                Part::Text("username", "alice"),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("No file received"));
        assert!(state.store.user_posters("alice").is_empty());
    }

    #[tokio::test]
    async fn upload_without_film_or_username_is_rejected() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp, Arc::new(FixedUrlUploader));
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

        let (status, body) = send(
            router(state.clone()),
            multipart_request(&[Part::File("poster", &png), Part::Text("username", "alice")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("No film name received"));

        let (status, body) = send(
            router(state),
            multipart_request(&[Part::File("poster", &png), Part::Text("film", "Dune")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("No username received"));
    }

    #[tokio::test]
    async fn upload_stores_the_providers_url() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp, Arc::new(FixedUrlUploader));
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

        let (status, body) = send(
            router(state.clone()),
            multipart_request(&[
                Part::File("poster", &png),
                Part::Text("film", "Dune"),
                Part::Text("username", "alice"),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "username": "alice",
                "film": "Dune",
                "url": "https://media.test/letterboxd-posters/poster.png"
            })
        );
        assert_eq!(
            state
                .store
                .user_posters("alice")
                .get("Dune")
                .map(String::as_str),
            Some("https://media.test/letterboxd-posters/poster.png")
        );
    }

    #[tokio::test]
    async fn upload_surfaces_provider_failure_as_server_error() {
        let temp = TempDir::new().unwrap();
        let state = test_state(&temp, Arc::new(FailingUploader));
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

        let (status, body) = send(
            router(state.clone()),
            multipart_request(&[
                Part::File("poster", &png),
                Part::Text("film", "Dune"),
                Part::Text("username", "alice"),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!("Invalid image file"));
        assert!(state.store.user_posters("alice").is_empty());
    }
}
