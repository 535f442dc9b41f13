use crate::auth::AuthenticatedUser;
use crate::jwt::SESSION_TTL_DAYS;
use crate::state::AppState;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use folio_core::prelude::*;
use serde::Deserialize;
use tracing::{error, info};

pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::UNAUTHORIZED,
    }
}

fn folio_status(err: &FolioError) -> StatusCode {
    match err {
        FolioError::Storage(e) => storage_status(e),
        FolioError::Store(e) => store_status(e),
        FolioError::Thumbnail(_) => StatusCode::BAD_GATEWAY,
        FolioError::AssetNotFound(_)
        | FolioError::CategoryNotFound(_)
        | FolioError::UnknownCategory(_) => StatusCode::NOT_FOUND,
        FolioError::InvalidScope(_) | FolioError::InvalidInput(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<FolioError>() {
            folio_status(e)
        } else if let Some(e) = self.0.downcast_ref::<StorageError>() {
            storage_status(e)
        } else if let Some(e) = self.0.downcast_ref::<StoreError>() {
            store_status(e)
        } else if let Some(e) = self.0.downcast_ref::<AuthError>() {
            auth_status(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

fn check_scope(user: &User, required: &str) -> Result<(), ApiError> {
    if user.scopes.iter().any(|s| s == "admin" || s == required) {
        Ok(())
    } else {
        Err(ApiError::from(AuthError::Forbidden(format!(
            "Missing permission: '{required}' scope required."
        ))))
    }
}

fn parse_role(role: &str) -> Result<Role, ApiError> {
    role.parse::<Role>()
        .map_err(|e| ApiError::from(FolioError::InvalidInput(e)))
}

/// Viewport hints sent by the page. Without a width the large tier is served.
#[derive(Deserialize)]
pub struct ViewportParams {
    width: Option<u32>,
    #[serde(default)]
    hero: bool,
}

fn select_tier(breakpoints: &Breakpoints, width: Option<u32>, hero: bool) -> SizeTier {
    width.map_or(SizeTier::Large, |width| breakpoints.select(width, hero))
}

/// GET /assets/{id}/url
pub async fn asset_url<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    Path(id): Path<AssetId>,
    Query(params): Query<ViewportParams>,
) -> Json<ResolvedUrl>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    let tier = select_tier(&state.breakpoints, params.width, params.hero);
    Json(state.library.resolve_asset(id, tier).await)
}

#[derive(Deserialize)]
pub struct RoleParams {
    category: Option<CategoryId>,
    width: Option<u32>,
}

/// GET /roles/{role}
pub async fn role_holder<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    Path(role): Path<String>,
    Query(params): Query<RoleParams>,
) -> Result<Json<RoleHolder>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    let role = parse_role(&role)?;
    let tier = select_tier(&state.breakpoints, params.width, role.is_hero());

    let holder = state
        .library
        .resolve_role(role, params.category, tier)
        .await?;
    Ok(Json(holder))
}

/// GET /categories
pub async fn hub<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    Query(params): Query<ViewportParams>,
) -> Result<Json<Vec<HubEntry>>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    let tier = select_tier(&state.breakpoints, params.width, false);
    Ok(Json(state.library.hub(tier).await?))
}

/// GET /categories/{slug}/assets
pub async fn gallery<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    Path(slug): Path<String>,
    Query(params): Query<ViewportParams>,
) -> Result<Json<Vec<GalleryItem>>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    let tier = select_tier(&state.breakpoints, params.width, false);
    Ok(Json(state.library.gallery(&slug, tier).await?))
}

#[derive(Deserialize)]
pub struct AssetListParams {
    category: Option<CategoryId>,
    role: Option<String>,
}

/// GET /admin/assets
pub async fn list_assets<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(params): Query<AssetListParams>,
) -> Result<Json<Vec<Asset>>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "read")?;

    let filter = AssetFilter {
        category_id: params.category,
        role: params.role.as_deref().map(parse_role).transpose()?,
    };
    Ok(Json(state.library.list_assets(filter).await?))
}

#[derive(Deserialize)]
pub struct UploadParams {
    name: String,
    category: Option<CategoryId>,
}

/// POST /admin/assets
/// Accepts the raw file as body. Thumbnail failures are reported, not fatal.
pub async fn upload_asset<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;

    if body.is_empty() {
        return Err(FolioError::InvalidInput("empty upload".into()).into());
    }

    let report = state
        .library
        .ingest(&params.name, body, params.category, Some(user.id))
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// DELETE /admin/assets/{id}
pub async fn delete_asset<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<AssetId>,
) -> Result<Json<DeleteReport>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    Ok(Json(state.library.delete(id).await?))
}

#[derive(Deserialize)]
pub struct PromoteRequest {
    asset_id: AssetId,
    category: Option<CategoryId>,
}

/// PUT /admin/roles/{role}
pub async fn promote<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(role): Path<String>,
    Json(req): Json<PromoteRequest>,
) -> Result<Json<Asset>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;

    let role = parse_role(&role)?;
    let asset = state
        .library
        .promote(req.asset_id, role, req.category)
        .await?;
    Ok(Json(asset))
}

/// POST /admin/backfill
pub async fn backfill<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<BackfillReport>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    Ok(Json(state.library.backfill(Some(&user.id)).await?))
}

/// GET /admin/categories
pub async fn list_categories<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Category>>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "read")?;
    Ok(Json(state.library.categories().await?))
}

/// POST /admin/categories
pub async fn create_category<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(category): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    let category = state.library.create_category(category).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /admin/categories/{id}
pub async fn update_category<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<CategoryId>,
    Json(patch): Json<CategoryPatch>,
) -> Result<Json<Category>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    Ok(Json(state.library.update_category(id, patch).await?))
}

/// DELETE /admin/categories/{id}
pub async fn delete_category<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    state.library.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /media/{bucket}/{*key}
/// Serves stored objects for backends without a public host of their own.
pub async fn media<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    let data = state.library.read_object(&bucket, &key).await?;
    let mime = mime_guess::from_path(&key).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], data))
}

/// GET /pricing
pub async fn pricing<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
) -> Result<Json<Vec<PricingCategory>>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    Ok(Json(state.library.catalog().pricing_categories().await?))
}

/// GET /pricing/{slug}
pub async fn pricing_page<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    Path(slug): Path<String>,
) -> Result<Json<PricingPage>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    Ok(Json(state.library.catalog().pricing_page(&slug).await?))
}

/// POST /admin/pricing/categories
pub async fn create_pricing_category<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(category): Json<NewPricingCategory>,
) -> Result<impl IntoResponse, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    let category = state
        .library
        .catalog()
        .create_pricing_category(category)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /admin/pricing/categories/{id}
pub async fn update_pricing_category<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<PricingCategoryId>,
    Json(patch): Json<PricingCategoryPatch>,
) -> Result<Json<PricingCategory>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    let catalog = state.library.catalog();
    Ok(Json(catalog.update_pricing_category(id, patch).await?))
}

/// DELETE /admin/pricing/categories/{id}
pub async fn delete_pricing_category<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<PricingCategoryId>,
) -> Result<StatusCode, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    state.library.catalog().delete_pricing_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct PlanListParams {
    category: Option<PricingCategoryId>,
}

/// GET /admin/pricing/plans
pub async fn list_pricing_plans<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(params): Query<PlanListParams>,
) -> Result<Json<Vec<PricingPlan>>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "read")?;
    let catalog = state.library.catalog();
    Ok(Json(catalog.pricing_plans(params.category).await?))
}

/// POST /admin/pricing/plans
pub async fn create_pricing_plan<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(plan): Json<NewPricingPlan>,
) -> Result<impl IntoResponse, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    let plan = state.library.catalog().create_pricing_plan(plan).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PUT /admin/pricing/plans/{id}
pub async fn update_pricing_plan<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<PricingPlanId>,
    Json(patch): Json<PricingPlanPatch>,
) -> Result<Json<PricingPlan>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    let catalog = state.library.catalog();
    Ok(Json(catalog.update_pricing_plan(id, patch).await?))
}

/// DELETE /admin/pricing/plans/{id}
pub async fn delete_pricing_plan<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<PricingPlanId>,
) -> Result<StatusCode, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    state.library.catalog().delete_pricing_plan(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /reviews
pub async fn reviews<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
) -> Result<Json<Vec<Review>>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    Ok(Json(state.library.catalog().reviews().await?))
}

/// POST /admin/reviews
pub async fn create_review<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(review): Json<NewReview>,
) -> Result<impl IntoResponse, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    let review = state.library.catalog().create_review(review).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// PUT /admin/reviews/{id}
pub async fn update_review<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<ReviewId>,
    Json(patch): Json<ReviewPatch>,
) -> Result<Json<Review>, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    Ok(Json(state.library.catalog().update_review(id, patch).await?))
}

/// DELETE /admin/reviews/{id}
pub async fn delete_review<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    check_scope(&user, "write")?;
    state.library.catalog().delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// POST /auth/login
pub async fn auth_login<S, R, G, P, A>(
    State(state): State<AppState<S, R, G, P, A>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    let user = state.auth.login(req.email.trim(), &req.password).await?;
    let session_token = state
        .jwt_service
        .mint(&user, chrono::Duration::days(SESSION_TTL_DAYS))?;
    info!("Admin session issued for {}", user.id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "user": user.id,
        "token": session_token,
        "expires_in": SESSION_TTL_DAYS * 24 * 60 * 60
    })))
}
