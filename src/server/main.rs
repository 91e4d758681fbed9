use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use snaptext::common::{get_current_timestamp_str, init_logger_exe};
use snaptext::ocr::{EngineConfig, Language};
use snaptext::pipeline::{run_pipeline, PipelineError, RecognitionOutcome, UploadRequest};
use snaptext::storage::{secure_filename, CollisionPolicy, UploadStore};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

mod session;
mod views;

use session::{LastResult, SessionStore};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    engine: EngineConfig,
    store: UploadStore,
    policy: CollisionPolicy,
    sessions: SessionStore,
}

#[tokio::main]
async fn main() {
    init_logger_exe();

    log::info!("Starting server...");

    let engine = EngineConfig::from_env();
    log::info!("Tesseract command: {}", engine.command().display());
    if !engine.is_reachable() {
        log::warn!(
            "Tesseract does not answer at {}; uploads will fail until it is installed",
            engine.command().display()
        );
    }

    let upload_dir =
        std::env::var("SNAPTEXT_UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
    let store = UploadStore::new(&upload_dir).expect("failed to create upload directory");
    log::info!("Upload directory: {}", store.root().display());

    let policy = std::env::var("SNAPTEXT_COLLISION_POLICY")
        .map(|v| CollisionPolicy::from(v.as_str()))
        .unwrap_or_default();
    log::info!("Collision policy: {:?}", policy);

    let state = AppState {
        engine,
        store,
        policy,
        sessions: SessionStore::default(),
    };

    let app = app(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap()));

    log::info!("Attempting to bind to port {}", port);

    let listener = TcpListener::bind(addr).await.unwrap();
    log::info!("Successfully bound to http://{}", addr);

    axum::serve(listener, app).await.unwrap();
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route("/health", get(|| async { "healthy" }))
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/uploads/:filename", get(uploaded_file))
        .route("/download/:filename", get(download_file))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// How the client wants the upload answered, decided from the request
/// headers before the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseMode {
    Json,
    Html,
}

fn response_mode(headers: &HeaderMap) -> ResponseMode {
    let marker = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"));
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));

    if marker || accepts_json {
        ResponseMode::Json
    } else {
        ResponseMode::Html
    }
}

fn request_session(headers: &HeaderMap) -> (String, bool) {
    match session::session_id_from_headers(headers) {
        Some(sid) => (sid, false),
        None => (Uuid::new_v4().simple().to_string(), true),
    }
}

fn with_session_cookie(mut response: Response, sid: &str, is_new: bool) -> Response {
    if is_new {
        if let Ok(value) = format!("sid={}; Path=/; HttpOnly", sid).parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (sid, is_new) = request_session(&headers);
    let flashes = state.sessions.take_flashes(&sid);
    let last = state.sessions.last(&sid);
    let html = views::render_index(&flashes, last.as_ref());
    with_session_cookie(Html(html).into_response(), &sid, is_new)
}

#[derive(Serialize)]
struct UploadResponse {
    ok: bool,
    text: String,
    lang: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    download: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "ok": false, "error": message }))).into_response()
}

fn pipeline_error_response(
    err: &PipelineError,
    mode: ResponseMode,
    sessions: &SessionStore,
    sid: &str,
) -> Response {
    log::error!("upload failed: {}", err);
    match mode {
        ResponseMode::Json => {
            let status = if err.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            json_error(status, err.user_messages().join(" "))
        }
        ResponseMode::Html => {
            for message in err.user_messages() {
                sessions.flash(sid, message);
            }
            Redirect::to("/").into_response()
        }
    }
}

fn success_response(
    outcome: RecognitionOutcome,
    mode: ResponseMode,
    sessions: &SessionStore,
    sid: &str,
) -> Response {
    match mode {
        ResponseMode::Json => {
            let warning = (!outcome.warnings.is_empty()).then(|| outcome.warnings.join(" "));
            Json(UploadResponse {
                ok: true,
                download: outcome
                    .artifact_name
                    .as_ref()
                    .map(|name| format!("/download/{}", name)),
                text: outcome.text,
                lang: outcome.lang,
                warning,
            })
            .into_response()
        }
        ResponseMode::Html => {
            if let Some(artifact_name) = &outcome.artifact_name {
                sessions.set_last(
                    sid,
                    LastResult {
                        artifact_name: artifact_name.clone(),
                        lang: outcome.lang,
                        text: outcome.text.clone(),
                        at: get_current_timestamp_str(),
                    },
                );
            }
            Html(views::render_result(&outcome)).into_response()
        }
    }
}

fn invalid_body_response(
    error: axum::extract::multipart::MultipartError,
    mode: ResponseMode,
    sessions: &SessionStore,
    sid: &str,
) -> Response {
    log::error!("failed to read multipart body: {}", error);
    let message = format!("Invalid upload body: {}", error);
    match mode {
        ResponseMode::Json => json_error(StatusCode::BAD_REQUEST, message),
        ResponseMode::Html => {
            sessions.flash(sid, message);
            Redirect::to("/").into_response()
        }
    }
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mode = response_mode(&headers);
    let (sid, is_new) = request_session(&headers);

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut lang: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                let response = invalid_body_response(e, mode, &state.sessions, &sid);
                return with_session_cookie(response, &sid, is_new);
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((filename, bytes.to_vec())),
                    Err(e) => {
                        let response = invalid_body_response(e, mode, &state.sessions, &sid);
                        return with_session_cookie(response, &sid, is_new);
                    }
                }
            }
            "lang" => lang = field.text().await.ok(),
            _ => {}
        }
    }

    let Some((filename, bytes)) = file else {
        let err = PipelineError::EmptyFilename;
        let response = pipeline_error_response(&err, mode, &state.sessions, &sid);
        return with_session_cookie(response, &sid, is_new);
    };

    let request = UploadRequest {
        filename,
        bytes,
        lang,
    };
    let engine = state.engine.clone();
    let store = state.store.clone();
    let policy = state.policy;

    // The engine call and disk writes block; keep them off the runtime workers.
    let result =
        tokio::task::spawn_blocking(move || run_pipeline(&request, &engine, &store, policy)).await;

    let response = match result {
        Ok(Ok(outcome)) => success_response(outcome, mode, &state.sessions, &sid),
        Ok(Err(err)) => pipeline_error_response(&err, mode, &state.sessions, &sid),
        Err(e) => {
            log::error!("pipeline task panicked: {}", e);
            let message = "OCR processing failed unexpectedly.".to_string();
            match mode {
                ResponseMode::Json => json_error(StatusCode::INTERNAL_SERVER_ERROR, message),
                ResponseMode::Html => {
                    state.sessions.flash(&sid, message);
                    Redirect::to("/").into_response()
                }
            }
        }
    };
    with_session_cookie(response, &sid, is_new)
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tiff") => "image/tiff",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

async fn serve_from_store(state: &AppState, filename: &str, as_attachment: bool) -> Response {
    if filename.is_empty() || secure_filename(filename) != filename {
        return (StatusCode::BAD_REQUEST, "invalid filename").into_response();
    }

    let Some(path) = state.store.resolve(filename) else {
        return (StatusCode::NOT_FOUND, "file not found").into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mut response =
                ([(header::CONTENT_TYPE, content_type_for(filename))], bytes).into_response();
            if as_attachment {
                if let Ok(value) = format!("attachment; filename=\"{}\"", filename).parse() {
                    response
                        .headers_mut()
                        .insert(header::CONTENT_DISPOSITION, value);
                }
            }
            response
        }
        Err(e) => {
            log::error!("failed to read {}: {}", path.display(), e);
            (StatusCode::NOT_FOUND, "file not found").into_response()
        }
    }
}

async fn uploaded_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    serve_from_store(&state, &filename, false).await
}

async fn download_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    serve_from_store(&state, &filename, true).await
}
