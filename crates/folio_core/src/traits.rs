use crate::catalog::*;
use crate::error::*;
use crate::manifest::{DerivedManifest, GeneratedThumbnails};
use crate::model::*;

use bytes::Bytes;

/// One object-storage bucket.
pub trait StorageBackend: Send + Sync + 'static + Clone {
    /// Stores `data` under `key`. Without `overwrite` an existing object is an error.
    fn upload(
        &self,
        key: &str,
        data: Bytes,
        overwrite: bool,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Object names directly under `prefix`, relative to it. `""` lists the bucket root.
    fn list(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// Removes the given keys. Missing keys are ignored.
    fn remove(&self, keys: &[String]) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    fn read(&self, key: &str) -> impl Future<Output = Result<Bytes, StorageError>> + Send;

    /// Pure URL construction. Says nothing about whether the object exists.
    fn public_url(&self, key: &str) -> String;
}

/// The relational table store holding asset, category, pricing and review records.
pub trait RecordStore: Send + Sync + 'static + Clone {
    fn insert_asset(&self, asset: NewAsset)
    -> impl Future<Output = Result<Asset, StoreError>> + Send;

    fn get_asset(&self, id: AssetId)
    -> impl Future<Output = Result<Option<Asset>, StoreError>> + Send;

    fn find_asset_by_path(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<Asset>, StoreError>> + Send;

    /// Matching assets, newest first.
    fn list_assets(
        &self,
        filter: AssetFilter,
    ) -> impl Future<Output = Result<Vec<Asset>, StoreError>> + Send;

    fn set_role_flag(
        &self,
        id: AssetId,
        role: Role,
        value: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_manifest(
        &self,
        id: AssetId,
        manifest: Option<DerivedManifest>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_asset(&self, id: AssetId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All categories ordered by id.
    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, StoreError>> + Send;

    fn get_category(
        &self,
        id: CategoryId,
    ) -> impl Future<Output = Result<Option<Category>, StoreError>> + Send;

    fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Category>, StoreError>> + Send;

    fn insert_category(
        &self,
        category: NewCategory,
    ) -> impl Future<Output = Result<Category, StoreError>> + Send;

    fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> impl Future<Output = Result<Category, StoreError>> + Send;

    fn delete_category(&self, id: CategoryId)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Ordered by display order, then name.
    fn list_pricing_categories(
        &self,
    ) -> impl Future<Output = Result<Vec<PricingCategory>, StoreError>> + Send;

    /// `category.slug` is set by the caller; stores fall back to the slugified name.
    fn insert_pricing_category(
        &self,
        category: NewPricingCategory,
    ) -> impl Future<Output = Result<PricingCategory, StoreError>> + Send;

    fn update_pricing_category(
        &self,
        id: PricingCategoryId,
        patch: PricingCategoryPatch,
    ) -> impl Future<Output = Result<PricingCategory, StoreError>> + Send;

    fn delete_pricing_category(
        &self,
        id: PricingCategoryId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Plans of one category, or all plans. Ordered by display order, then price.
    fn list_pricing_plans(
        &self,
        category: Option<PricingCategoryId>,
    ) -> impl Future<Output = Result<Vec<PricingPlan>, StoreError>> + Send;

    fn insert_pricing_plan(
        &self,
        plan: NewPricingPlan,
    ) -> impl Future<Output = Result<PricingPlan, StoreError>> + Send;

    fn update_pricing_plan(
        &self,
        id: PricingPlanId,
        patch: PricingPlanPatch,
    ) -> impl Future<Output = Result<PricingPlan, StoreError>> + Send;

    fn delete_pricing_plan(
        &self,
        id: PricingPlanId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Ordered by display order, then id.
    fn list_reviews(&self) -> impl Future<Output = Result<Vec<Review>, StoreError>> + Send;

    fn insert_review(&self, review: NewReview)
    -> impl Future<Output = Result<Review, StoreError>> + Send;

    fn update_review(
        &self,
        id: ReviewId,
        patch: ReviewPatch,
    ) -> impl Future<Output = Result<Review, StoreError>> + Send;

    fn delete_review(&self, id: ReviewId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The external service turning originals into derived variants.
pub trait ThumbnailService: Send + Sync + 'static + Clone {
    fn generate(
        &self,
        bucket: &str,
        file: &str,
        category: Option<&str>,
    ) -> impl Future<Output = Result<GeneratedThumbnails, ThumbnailError>> + Send;

    /// Asks the service to drop everything it derived from `path`.
    fn delete_job(
        &self,
        _path: &str,
        _derived_paths: &[String],
    ) -> impl Future<Output = Result<(), ThumbnailError>> + Send {
        async { Ok(()) }
    }
}

/// A derived key the resolver wants confirmed before using it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: String,
    pub url: String,
}

/// Single-shot existence check. Implementations must not retry.
pub trait ExistenceProbe: Send + Sync + 'static + Clone {
    fn probe(&self, candidate: &Candidate) -> impl Future<Output = Result<bool, StorageError>> + Send;
}

pub trait AuthProvider: Send + Sync + 'static + Clone {
    fn verify(&self, token: &str) -> impl Future<Output = Result<User, AuthError>> + Send;

    /// Optional: Exchanges admin credentials for a User identity.
    fn login(
        &self,
        _email: &str,
        _password: &str,
    ) -> impl Future<Output = Result<User, AuthError>> + Send {
        async {
            Err(AuthError::Generic(
                "Credential login not supported by this provider".into(),
            ))
        }
    }
}

/// Probes by asking the bucket itself.
#[derive(Clone)]
pub struct StorageProbe<S: StorageBackend>(pub S);

impl<S: StorageBackend> ExistenceProbe for StorageProbe<S> {
    async fn probe(&self, candidate: &Candidate) -> Result<bool, StorageError> {
        self.0.exists(&candidate.key).await
    }
}
