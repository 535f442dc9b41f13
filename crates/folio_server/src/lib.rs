use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use folio_core::prelude::*;
use tower_http::trace::TraceLayer;
use tracing::warn;

mod api;

pub mod auth;
pub mod jwt;
pub mod state;

use crate::auth::JWTServiceAuthProvider;
use crate::jwt::JwtService;
use state::AppState;

/// The builder for the Folio Server.
#[derive(Clone, Debug, Default)]
pub struct FolioServer {
    config: FolioServerConfig,
}

impl FolioServer {
    pub fn new(config: FolioServerConfig) -> Self {
        Self { config }
    }
}

#[derive(Clone, Debug)]
pub struct FolioServerConfig {
    /// The secret used to sign admin session tokens.
    ///
    /// Defaults to `TOP_SECRET`.
    ///
    /// **NOTE:** This should be set to a secure value!
    pub jwt_secret: String,
    /// Viewport thresholds for the `width` query parameter.
    pub breakpoints: Breakpoints,
    /// Largest accepted upload body in bytes.
    ///
    /// Defaults to 50 MiB.
    pub max_upload_bytes: usize,
}

const DEFAULT_SECRET: &str = "TOP_SECRET";

impl Default for FolioServerConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_SECRET.to_string(),
            breakpoints: Breakpoints::default(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl FolioServerConfig {
    /// Server settings derived from the process-wide config.
    pub fn from_folio_config(config: &FolioConfig) -> Self {
        Self {
            jwt_secret: config
                .jwt_secret
                .clone()
                .unwrap_or_else(|| DEFAULT_SECRET.to_string()),
            breakpoints: config.breakpoints,
            ..Default::default()
        }
    }
}

impl FolioServer {
    pub fn build<S, R, G, P, A>(self, library: AssetLibrary<S, R, G, P>, auth: A) -> Router
    where
        S: StorageBackend,
        R: RecordStore,
        G: ThumbnailService,
        P: ExistenceProbe,
        A: AuthProvider,
    {
        let FolioServerConfig {
            jwt_secret,
            breakpoints,
            max_upload_bytes,
        } = self.config;
        if jwt_secret == DEFAULT_SECRET {
            warn!("Default JWT secret used. Consider setting `jwt_secret` to a secure value!")
        }
        let jwt_service = JwtService::new(&jwt_secret);
        let state = AppState {
            library,
            auth: JWTServiceAuthProvider::new(jwt_service.clone(), auth),
            jwt_service,
            breakpoints,
        };

        Router::new()
            .route("/health", get(|| async { "OK" }))
            .route("/auth/login", post(api::auth_login))
            .route("/assets/{id}/url", get(api::asset_url))
            .route("/roles/{role}", get(api::role_holder))
            .route("/categories", get(api::hub))
            .route("/categories/{slug}/assets", get(api::gallery))
            .route("/media/{bucket}/{*key}", get(api::media))
            .route("/pricing", get(api::pricing))
            .route("/pricing/{slug}", get(api::pricing_page))
            .route("/reviews", get(api::reviews))
            .route(
                "/admin/assets",
                get(api::list_assets).post(api::upload_asset),
            )
            .route("/admin/assets/{id}", axum::routing::delete(api::delete_asset))
            .route("/admin/roles/{role}", put(api::promote))
            .route("/admin/backfill", post(api::backfill))
            .route(
                "/admin/categories",
                get(api::list_categories).post(api::create_category),
            )
            .route(
                "/admin/categories/{id}",
                put(api::update_category).delete(api::delete_category),
            )
            .route(
                "/admin/pricing/categories",
                get(api::pricing).post(api::create_pricing_category),
            )
            .route(
                "/admin/pricing/categories/{id}",
                put(api::update_pricing_category).delete(api::delete_pricing_category),
            )
            .route(
                "/admin/pricing/plans",
                get(api::list_pricing_plans).post(api::create_pricing_plan),
            )
            .route(
                "/admin/pricing/plans/{id}",
                put(api::update_pricing_plan).delete(api::delete_pricing_plan),
            )
            .route(
                "/admin/reviews",
                get(api::reviews).post(api::create_review),
            )
            .route(
                "/admin/reviews/{id}",
                put(api::update_review).delete(api::delete_review),
            )
            .layer(DefaultBodyLimit::max(max_upload_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

pub mod prelude {
    pub use crate::auth::*;
    pub use crate::jwt::*;
    pub use crate::state::*;
    pub use crate::{FolioServer, FolioServerConfig};
}
