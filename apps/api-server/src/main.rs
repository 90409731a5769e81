//! api-server: HTTP backend for SmartLink.
//!
//! Serves the creation and lookup contract used by the wizard and the
//! visitor-side resolver, the static snapshot documents crawlers read, the
//! `/l/:code` short URL entry point and QR codes for short URLs.
//! - Storage: SQLite (default, `sqlite` feature) or in-memory.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN for the SPA.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # public URLs as seen by visitors
//! PUBLIC_BASE_URL=https://links.example.com \
//! SHORTLINK_DOMAIN=https://sl.example.com \
//!   cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod pages;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::contract::{CreatedSmartLink, CreationPayload, SmartLinkLookup, SnapshotResponse};
use domain::redirect::{RedirectState, ShortCodeResolver, ShortCodeTarget};
use domain::service::SmartLinkService;
use domain::short_id::Base62ShortIdGenerator;
use domain::snapshot::SnapshotConfig;
use domain::{
    Clock, CoreError, RedirectError, ShortId, Slug, SmartLink, SmartLinkRepository,
    SnapshotStore, StaticSnapshot,
};
use qrcode::render::svg;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Short ids are left-padded to this many base62 digits.
const SHORT_ID_MIN_WIDTH: usize = 6;

// Storage backend chosen at startup; memory or sqlite (feature-gated).
enum AnyRepo {
    Memory(InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteRepo),
}

impl AnyRepo {
    fn memory() -> Self {
        AnyRepo::Memory(InMemoryRepo::new())
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(path: Option<&std::path::Path>) -> Result<Self, CoreError> {
        let repo = match path {
            Some(p) => {
                if let Some(dir) = p.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                sqlite_adapter::SqliteRepo::new(p)?
            }
            None => sqlite_adapter::SqliteRepo::from_env()?,
        };
        Ok(AnyRepo::Sqlite(repo))
    }
}

impl SmartLinkRepository for AnyRepo {
    fn next_sequence(&self) -> Result<u64, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.next_sequence(),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.next_sequence(),
        }
    }

    fn get(&self, id: &str) -> Result<Option<SmartLink>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.get(id),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.get(id),
        }
    }

    fn get_by_short_id(&self, short_id: &ShortId) -> Result<Option<SmartLink>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.get_by_short_id(short_id),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.get_by_short_id(short_id),
        }
    }

    fn get_by_slugs(&self, artist: &Slug, track: &Slug) -> Result<Option<SmartLink>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.get_by_slugs(artist, track),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.get_by_slugs(artist, track),
        }
    }

    fn put(&self, link: SmartLink) -> Result<(), CoreError> {
        match self {
            AnyRepo::Memory(r) => r.put(link),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.put(link),
        }
    }

    fn increment_click(&self, short_id: &ShortId) -> Result<(), CoreError> {
        match self {
            AnyRepo::Memory(r) => r.increment_click(short_id),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.increment_click(short_id),
        }
    }

    fn list(&self, limit: usize) -> Result<Vec<SmartLink>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.list(limit),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.list(limit),
        }
    }
}

impl SnapshotStore for AnyRepo {
    fn put_snapshot(&self, snapshot: StaticSnapshot) -> Result<(), CoreError> {
        match self {
            AnyRepo::Memory(r) => r.put_snapshot(snapshot),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.put_snapshot(snapshot),
        }
    }

    fn get_snapshot(&self, short_id: &ShortId) -> Result<Option<StaticSnapshot>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.get_snapshot(short_id),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.get_snapshot(short_id),
        }
    }
}

type Service = SmartLinkService<AnyRepo, Base62ShortIdGenerator, StdClock>;

#[derive(Clone)]
struct AppState {
    service: Arc<Service>,
    public_base_url: Arc<str>,
    shortlink_domain: Option<Arc<str>>,
    snapshot: Arc<SnapshotConfig>,
}

impl AppState {
    fn new(repo: AnyRepo, cfg: &config::Config) -> Self {
        Self {
            service: Arc::new(SmartLinkService::new(
                repo,
                Base62ShortIdGenerator::new(SHORT_ID_MIN_WIDTH),
                StdClock,
            )),
            public_base_url: cfg.public_base_url.as_str().into(),
            shortlink_domain: cfg.shortlink_domain.as_deref().map(Into::into),
            snapshot: Arc::new(cfg.snapshot.clone()),
        }
    }
}

#[derive(Clone)]
struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> std::time::SystemTime {
        std::time::SystemTime::now()
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_local();

    let state = AppState::new(build_repo(&cfg), &cfg);

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = routes()
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state);

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(%addr, base = %cfg.public_base_url, "api-server listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/smartlinks", post(create_smartlink).get(list_smartlinks))
        .route(
            "/api/smartlinks/:artist_slug/:track_slug",
            get(get_smartlink_by_slugs),
        )
        .route("/api/short/:code", get(get_short_code))
        .route("/api/snapshots/:short_id", post(create_snapshot))
        .route("/s/:short_id", get(serve_snapshot))
        .route("/l", get(open_missing_code))
        .route("/l/:code", get(open_short_code))
        .route("/qr/:short_id", get(qr_code))
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
fn build_repo(cfg: &config::Config) -> AnyRepo {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => match AnyRepo::sqlite(cfg.db_path.as_deref()) {
            Ok(r) => r,
            Err(e) => {
                error!(err = %e, "failed to open sqlite store, falling back to memory");
                AnyRepo::memory()
            }
        },
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            warn!("built without the sqlite feature, using memory storage");
            AnyRepo::memory()
        }
        config::StorageProvider::Memory => AnyRepo::memory(),
    }
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkOut {
    #[serde(rename = "_id")]
    id: String,
    short_id: String,
    short_url: String,
    artist_slug: String,
    track_slug: String,
    artist_name: String,
    track_title: String,
    is_published: bool,
    click_count: u64,
    created_at: String,
}

fn link_to_out(link: &SmartLink, headers: &HeaderMap, shortlink_domain: Option<&str>) -> LinkOut {
    LinkOut {
        id: link.id.clone(),
        short_id: link.short_id.as_str().to_string(),
        short_url: http_common::build_short_url(
            shortlink_domain,
            request_host(headers),
            link.short_id.as_str(),
        ),
        artist_slug: link.artist_slug.as_str().to_string(),
        track_slug: link.track_slug.as_str().to_string(),
        artist_name: link.artist_name.clone(),
        track_title: link.track_title.clone(),
        is_published: link.is_published,
        click_count: link.click_count,
        created_at: http_common::system_time_to_rfc3339(link.created_at),
    }
}

fn request_host(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Status and visitor-safe message for a service error.
fn status_and_message(e: &CoreError) -> (StatusCode, String) {
    match e {
        CoreError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        CoreError::InvalidSlug(msg) => (StatusCode::BAD_REQUEST, format!("invalid slug: {}", msg)),
        CoreError::AlreadyExists => (
            StatusCode::CONFLICT,
            "a SmartLink with this slug already exists".into(),
        ),
        CoreError::NotFound => (StatusCode::NOT_FOUND, "SmartLink not found".into()),
        CoreError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".into(),
        ),
    }
}

fn core_error_response(op: &'static str, e: CoreError) -> Response {
    let (status, message) = status_and_message(&e);
    if status.is_server_error() {
        error!(op, err = ?e, "request failed");
    } else {
        warn!(op, err = %e, "request rejected");
    }
    (status, Json(http_common::json_failure(&message))).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(http_common::json_err("not_found")),
    )
        .into_response()
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn create_smartlink(
    State(state): State<AppState>,
    payload: Result<Json<CreationPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rej) => {
            warn!(err = %rej, "create rejected: unreadable body");
            return (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_failure(&rej.body_text())),
            )
                .into_response();
        }
    };

    let input = match payload.into_new_smartlink() {
        Ok(i) => i,
        Err(e) => return core_error_response("create", e.into()),
    };

    match state.service.create(input) {
        Ok(link) => {
            info!(
                short_id = %link.short_id,
                path = %link.canonical_path(),
                published = link.is_published,
                "smartlink created"
            );
            (
                StatusCode::CREATED,
                Json(http_common::json_success(&CreatedSmartLink::from(&link))),
            )
                .into_response()
        }
        Err(e) => core_error_response("create", e),
    }
}

async fn list_smartlinks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ListQuery>,
) -> Response {
    let limit = match q.limit {
        Some(n) if (1..=500).contains(&n) => n,
        Some(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_failure("limit must be between 1 and 500")),
            )
                .into_response()
        }
        None => 50,
    };

    match state.service.list(limit) {
        Ok(links) => {
            let out: Vec<LinkOut> = links
                .iter()
                .map(|l| link_to_out(l, &headers, state.shortlink_domain.as_deref()))
                .collect();
            info!(count = out.len(), limit, "list ok");
            (StatusCode::OK, Json(http_common::json_success(&out))).into_response()
        }
        Err(e) => core_error_response("list", e),
    }
}

async fn get_short_code(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    let Ok(code) = ShortId::new(code) else {
        warn!("malformed short code");
        return not_found();
    };
    match state.service.resolve_short_code(&code) {
        Ok(link) => {
            info!(short_id = %code, clicks = link.click_count, "short code resolved");
            (
                StatusCode::OK,
                Json(http_common::json_success(&SmartLinkLookup::from(&link))),
            )
                .into_response()
        }
        Err(e) => core_error_response("short code lookup", e),
    }
}

async fn get_smartlink_by_slugs(
    State(state): State<AppState>,
    Path((artist_slug, track_slug)): Path<(String, String)>,
) -> Response {
    let (Ok(artist), Ok(track)) = (Slug::new(artist_slug), Slug::new(track_slug)) else {
        warn!("malformed slug in canonical route");
        return not_found();
    };
    match state.service.get_by_slugs(&artist, &track) {
        Ok(link) => (
            StatusCode::OK,
            Json(http_common::json_success(&SmartLinkLookup::from(&link))),
        )
            .into_response(),
        Err(e) => core_error_response("canonical lookup", e),
    }
}

async fn create_snapshot(State(state): State<AppState>, Path(short_id): Path<String>) -> Response {
    let failure = |status: StatusCode, message: String| {
        (
            status,
            Json(SnapshotResponse {
                success: false,
                url: None,
                html: None,
                error: Some(message),
            }),
        )
            .into_response()
    };

    let Ok(short_id) = ShortId::new(short_id) else {
        warn!("snapshot rejected: malformed short id");
        return failure(StatusCode::BAD_REQUEST, "invalid short id".into());
    };
    match state.service.publish_snapshot(&short_id, &state.snapshot) {
        Ok(snapshot) => {
            info!(short_id = %short_id, url = %snapshot.url, "snapshot generated");
            (
                StatusCode::OK,
                Json(SnapshotResponse {
                    success: true,
                    url: Some(snapshot.url),
                    html: Some(snapshot.html),
                    error: None,
                }),
            )
                .into_response()
        }
        Err(e) => {
            let (status, message) = status_and_message(&e);
            if status.is_server_error() {
                error!(short_id = %short_id, err = ?e, "snapshot failed");
            } else {
                warn!(short_id = %short_id, err = %e, "snapshot rejected");
            }
            failure(status, message)
        }
    }
}

async fn serve_snapshot(State(state): State<AppState>, Path(short_id): Path<String>) -> Response {
    let missing = || {
        (
            StatusCode::NOT_FOUND,
            Html(pages::snapshot_missing(&state.snapshot.site_name)),
        )
            .into_response()
    };
    let Ok(short_id) = ShortId::new(short_id) else {
        return missing();
    };
    match state.service.snapshot(&short_id, &state.snapshot) {
        Ok(snapshot) => (
            [(header::CACHE_CONTROL, "public, max-age=300")],
            Html(snapshot.html),
        )
            .into_response(),
        Err(CoreError::NotFound) => {
            warn!(short_id = %short_id, "snapshot 404");
            missing()
        }
        Err(e) => {
            error!(short_id = %short_id, err = ?e, "snapshot error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::snapshot_missing(&state.snapshot.site_name)),
            )
                .into_response()
        }
    }
}

async fn open_short_code(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    redirect_short_code(&state, Some(&code))
}

async fn open_missing_code(State(state): State<AppState>) -> Response {
    redirect_short_code(&state, None)
}

/// Resolve a short URL through the resolver state machine and send the
/// visitor to the canonical route on the public site.
fn redirect_short_code(state: &AppState, code: Option<&str>) -> Response {
    let outcome = ShortCodeResolver::from_route(code).resolve_with(|id| {
        match state.service.resolve_short_code(id) {
            Ok(link) => Ok(Some(ShortCodeTarget {
                artist_slug: link.artist_slug,
                track_slug: link.track_slug,
            })),
            Err(CoreError::NotFound) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    });

    match outcome {
        RedirectState::Navigate(path) => {
            let location = http_common::join_url(&state.public_base_url, &path);
            info!(code = code.unwrap_or("-"), %location, "short url redirect");
            Redirect::to(&location).into_response()
        }
        RedirectState::Failed(err) => {
            let status = match &err {
                RedirectError::MissingCode => StatusCode::BAD_REQUEST,
                RedirectError::NotFound => StatusCode::NOT_FOUND,
                RedirectError::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                error!(code = code.unwrap_or("-"), err = %err, "short url lookup failed");
            } else {
                warn!(code = code.unwrap_or("-"), err = %err, "short url not resolved");
            }
            (
                status,
                Html(pages::redirect_error(&err, &state.snapshot.site_name)),
            )
                .into_response()
        }
        unsettled => {
            error!(state = ?unsettled, "resolver did not settle");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_err("internal")),
            )
                .into_response()
        }
    }
}

async fn qr_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(short_id): Path<String>,
) -> Response {
    let Ok(short_id) = ShortId::new(short_id) else {
        return not_found();
    };
    match state.service.repo().get_by_short_id(&short_id) {
        Ok(Some(link)) if link.is_published => {
            let url = http_common::build_short_url(
                state.shortlink_domain.as_deref(),
                request_host(&headers),
                short_id.as_str(),
            );
            render_qr_code(&url)
        }
        Ok(_) => not_found(),
        Err(e) => core_error_response("qr lookup", e),
    }
}

fn render_qr_code(url: &str) -> Response {
    match QrCode::new(url.as_bytes()) {
        Ok(code) => {
            let svg_string = code
                .render()
                .min_dimensions(200, 200)
                .dark_color(svg::Color("#000000"))
                .light_color(svg::Color("#ffffff"))
                .build();
            (
                [
                    (header::CONTENT_TYPE, "image/svg+xml"),
                    (header::CACHE_CONTROL, "public, max-age=86400"),
                ],
                svg_string,
            )
                .into_response()
        }
        Err(e) => {
            error!(url, err = ?e, "qr generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_failure("qr generation failed")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn app() -> Router {
        let cfg = config::Config {
            port: 3001,
            cors_allow_origin: HeaderValue::from_static("*"),
            storage_provider: config::StorageProvider::Memory,
            db_path: None,
            log_format: config::LogFormat::Pretty,
            public_base_url: "https://links.test".into(),
            shortlink_domain: Some("https://sl.test".into()),
            snapshot: SnapshotConfig {
                site_base_url: "https://links.test".into(),
                redirect_delay: Duration::from_millis(1500),
                ..SnapshotConfig::default()
            },
        };
        routes().with_state(AppState::new(AnyRepo::memory(), &cfg))
    }

    async fn send(router: &Router, req: Request<Body>) -> Response {
        router.clone().oneshot(req).await.unwrap()
    }

    async fn body_bytes(resp: Response) -> Vec<u8> {
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        String::from_utf8(body_bytes(resp).await).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn creation_body(published: bool) -> serde_json::Value {
        serde_json::json!({
            "artistName": "The Band",
            "trackTitle": "Night Song",
            "platformLinks": [
                {"platform": "spotify", "url": "https://open.spotify.com/track/abc123"},
                {"platform": "deezer", "url": "https://www.deezer.com/track/1"}
            ],
            "isPublished": published
        })
    }

    /// Create a SmartLink and return its short id.
    async fn create(router: &Router, body: serde_json::Value) -> String {
        let resp = send(router, post_json("/api/smartlinks", body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        json["data"]["shortId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_then_lookup_by_code_and_slugs() {
        let router = app();
        let resp = send(&router, post_json("/api/smartlinks", creation_body(true))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["data"]["artistSlug"], "the-band");
        assert_eq!(created["data"]["trackSlug"], "night-song");
        let code = created["data"]["shortId"].as_str().unwrap().to_string();
        assert_eq!(code.len(), SHORT_ID_MIN_WIDTH);

        let resp = send(&router, get(&format!("/api/short/{}", code))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let lookup = body_json(resp).await;
        assert_eq!(lookup["data"]["artist"]["slug"], "the-band");
        assert_eq!(lookup["data"]["smartLink"]["slug"], "night-song");
        assert_eq!(lookup["data"]["smartLink"]["clickCount"], 1);

        let resp = send(&router, get("/api/smartlinks/the-band/night-song")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let by_slugs = body_json(resp).await;
        assert_eq!(by_slugs["data"]["smartLink"]["shortId"], code.as_str());
        assert_eq!(
            by_slugs["data"]["smartLink"]["platformLinks"][0]["platform"],
            "spotify"
        );
    }

    #[tokio::test]
    async fn invalid_payloads_are_rejected_with_envelope() {
        let router = app();

        let mut no_links = creation_body(true);
        no_links["platformLinks"] = serde_json::json!([]);
        let resp = send(&router, post_json("/api/smartlinks", no_links)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("platform"));

        let req = Request::builder()
            .method("POST")
            .uri("/api/smartlinks")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = send(&router, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["success"], false);
    }

    #[tokio::test]
    async fn custom_slug_conflict_is_409() {
        let router = app();
        let mut body = creation_body(true);
        body["slug"] = "my-song".into();
        create(&router, body.clone()).await;

        let resp = send(&router, post_json("/api/smartlinks", body)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["success"], false);
    }

    #[tokio::test]
    async fn unknown_and_unpublished_codes_are_404() {
        let router = app();
        let draft = create(&router, creation_body(false)).await;

        for uri in [format!("/api/short/{}", draft), "/api/short/zzzzzz".into()] {
            let resp = send(&router, get(&uri)).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            let json = body_json(resp).await;
            assert_eq!(json["success"], false);
            assert!(json.get("data").is_none());
        }
    }

    #[tokio::test]
    async fn short_url_redirects_to_canonical_route() {
        let router = app();
        let code = create(&router, creation_body(true)).await;

        let resp = send(&router, get(&format!("/l/{}", code))).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://links.test/smartlinks/the-band/night-song"
        );
    }

    #[tokio::test]
    async fn short_url_failures_render_pages() {
        let router = app();

        let resp = send(&router, get("/l/nope42")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().get(header::LOCATION).is_none());
        assert!(body_text(resp).await.contains("Link not found"));

        let resp = send(&router, get("/l")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("no short code"));
    }

    #[tokio::test]
    async fn snapshot_publish_and_serve() {
        let router = app();
        let code = create(&router, creation_body(true)).await;

        let resp = send(
            &router,
            Request::builder()
                .method("POST")
                .uri(format!("/api/snapshots/{}", code))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["url"], format!("https://links.test/s/{}", code));
        assert!(json["html"].as_str().unwrap().contains("og:title"));

        let resp = send(&router, get(&format!("/s/{}", code))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let html = body_text(resp).await;
        assert!(html.contains("Night Song"));
        assert!(html.contains("1500"));
    }

    #[tokio::test]
    async fn snapshot_is_generated_lazily_and_404s_when_unknown() {
        let router = app();
        let code = create(&router, creation_body(true)).await;

        let resp = send(&router, get(&format!("/s/{}", code))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&router, get("/s/unknown1")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(
            &router,
            Request::builder()
                .method("POST")
                .uri("/api/snapshots/unknown1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert!(json.get("html").is_none());
    }

    #[tokio::test]
    async fn qr_code_is_svg_for_published_links() {
        let router = app();
        let code = create(&router, creation_body(true)).await;

        let resp = send(&router, get(&format!("/qr/{}", code))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
        assert!(body_text(resp).await.contains("<svg"));

        let resp = send(&router, get("/qr/unknown1")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_is_newest_first_with_short_urls() {
        let router = app();
        create(&router, creation_body(true)).await;
        let mut second = creation_body(true);
        second["trackTitle"] = "Day Song".into();
        let newest = create(&router, second).await;

        let resp = send(&router, get("/api/smartlinks?limit=10")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let items = json["data"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["shortId"], newest.as_str());
        assert_eq!(items[0]["shortUrl"], format!("https://sl.test/l/{}", newest));

        let resp = send(&router, get("/api/smartlinks?limit=0")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn healthz_ok() {
        let resp = send(&app(), get("/healthz")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }
}
