use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready and reports its store backend", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Upload a document to share in a room
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = String, content_type = "multipart/form-data", description = "File in the `pdf` or `file` field"),
    responses(
        (status = 200, description = "Document stored", body = UploadResponse),
        (status = 400, description = "No file uploaded", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn upload_doc() {}

/// Register a user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = UserResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn register_doc() {}

/// Log in
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed token", body = LoginResponse),
        (status = 400, description = "Wrong password", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn login_doc() {}

/// Current user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "User the bearer token was issued to", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn me_doc() {}

/// Server diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Connection, cache and persistence counters", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Annotation history of a room
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/annotations",
    params(
        ("room_id" = String, Path, description = "Room identifier")
    ),
    responses(
        (status = 200, description = "Highlights and notes in sequence order", body = RoomRecord),
        (status = 400, description = "Invalid room id", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn room_annotations_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        upload_doc,
        register_doc,
        login_doc,
        me_doc,
        diagnostics_doc,
        room_annotations_doc,
    ),
    components(
        schemas(
            HealthResponse, ErrorResponse, UploadResponse,
            RegisterRequest, UserResponse, LoginRequest, LoginResponse,
            DiagnosticsResponse, RoomRecord, Highlight, Note
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
