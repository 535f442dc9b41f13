//! In-process backends for demos and tests.
//!
//! **NOTE:** Nothing here is persisted.

use crate::catalog::*;
use crate::error::*;
use crate::manifest::{DerivedManifest, GeneratedThumbnails, ImageFormat, derived_key};
use crate::size::SizeTier;
use crate::model::*;
use crate::traits::*;
use bytes::Bytes;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

fn poisoned<E>(_: E) -> StorageError {
    StorageError::Generic("Storage lock poisoned".into())
}

/// A bucket kept in a map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    public_base: String,
    objects: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into(),
            objects: Default::default(),
        }
    }
}

impl StorageBackend for MemoryStorage {
    async fn upload(&self, key: &str, data: Bytes, overwrite: bool) -> Result<(), StorageError> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        if !overwrite && objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = match prefix.trim_end_matches('/') {
            "" => String::new(),
            p => format!("{p}/"),
        };
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects
            .keys()
            .filter_map(|key| key.strip_prefix(&dir))
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().map_err(poisoned)?.contains_key(key))
    }

    async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        self.objects
            .read()
            .map_err(poisoned)?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base.trim_end_matches('/'))
    }
}

#[derive(Default)]
struct Tables {
    assets: BTreeMap<AssetId, Asset>,
    categories: BTreeMap<CategoryId, Category>,
    pricing_categories: BTreeMap<PricingCategoryId, PricingCategory>,
    pricing_plans: BTreeMap<PricingPlanId, PricingPlan>,
    reviews: BTreeMap<ReviewId, Review>,
    next_asset: AssetId,
    next_category: CategoryId,
    next_pricing_category: PricingCategoryId,
    next_pricing_plan: PricingPlanId,
    next_review: ReviewId,
}

/// Record store kept in maps, ids assigned sequentially from 1.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
}

fn lock_err<E>(_: E) -> StoreError {
    StoreError::Generic("Record store lock poisoned".into())
}

fn asset_not_found(id: AssetId) -> StoreError {
    StoreError::NotFound {
        entity: "asset",
        id: id.to_string(),
    }
}

fn category_not_found(id: CategoryId) -> StoreError {
    not_found("category", id)
}

fn not_found(entity: &'static str, id: i64) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn slug_taken(categories: &BTreeMap<PricingCategoryId, PricingCategory>, id: i64, slug: &str) -> bool {
    categories.values().any(|c| c.id != id && c.slug == slug)
}

impl MemoryRecordStore {
    pub fn asset_count(&self) -> usize {
        self.tables.read().map(|t| t.assets.len()).unwrap_or_default()
    }
}

impl RecordStore for MemoryRecordStore {
    async fn insert_asset(&self, asset: NewAsset) -> Result<Asset, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        if tables.assets.values().any(|a| a.path == asset.path) {
            return Err(StoreError::Conflict(format!(
                "asset with path '{}' already exists",
                asset.path
            )));
        }
        tables.next_asset += 1;
        let row = Asset {
            id: tables.next_asset,
            path: asset.path,
            title: asset.title,
            category_id: asset.category_id,
            roles: RoleFlags::default(),
            derived: None,
            created_at: Utc::now(),
            uploaded_by: asset.uploaded_by,
        };
        tables.assets.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, StoreError> {
        Ok(self.tables.read().map_err(lock_err)?.assets.get(&id).cloned())
    }

    async fn find_asset_by_path(&self, path: &str) -> Result<Option<Asset>, StoreError> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables.assets.values().find(|a| a.path == path).cloned())
    }

    async fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>, StoreError> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut assets: Vec<Asset> = tables
            .assets
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        assets.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(assets)
    }

    async fn set_role_flag(&self, id: AssetId, role: Role, value: bool) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let asset = tables.assets.get_mut(&id).ok_or_else(|| asset_not_found(id))?;
        asset.roles.set(role, value);
        Ok(())
    }

    async fn set_manifest(
        &self,
        id: AssetId,
        manifest: Option<DerivedManifest>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let asset = tables.assets.get_mut(&id).ok_or_else(|| asset_not_found(id))?;
        asset.derived = manifest;
        Ok(())
    }

    async fn delete_asset(&self, id: AssetId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        tables.assets.remove(&id).map(|_| ()).ok_or_else(|| asset_not_found(id))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.tables.read().map_err(lock_err)?.categories.get(&id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let slug = slugify(&category.name);
        if tables.categories.values().any(|c| c.slug == slug) {
            return Err(StoreError::Conflict(format!("category '{slug}' already exists")));
        }
        tables.next_category += 1;
        let row = Category {
            id: tables.next_category,
            name: category.name,
            slug,
            thumbnail_url: category.thumbnail_url.filter(|url| !url.is_empty()),
            visible_on_hub: category.visible_on_hub,
        };
        tables.categories.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let mut category = tables
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| category_not_found(id))?;
        patch.apply(&mut category);
        if tables
            .categories
            .values()
            .any(|c| c.id != id && c.slug == category.slug)
        {
            return Err(StoreError::Conflict(format!(
                "category '{}' already exists",
                category.slug
            )));
        }
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        tables
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| category_not_found(id))
    }

    async fn list_pricing_categories(&self) -> Result<Vec<PricingCategory>, StoreError> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut categories: Vec<_> = tables.pricing_categories.values().cloned().collect();
        categories.sort_by(cmp_pricing_categories);
        Ok(categories)
    }

    async fn insert_pricing_category(
        &self,
        category: NewPricingCategory,
    ) -> Result<PricingCategory, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let slug = category.slug.unwrap_or_else(|| slugify(&category.name));
        if slug_taken(&tables.pricing_categories, 0, &slug) {
            return Err(StoreError::Conflict(format!("pricing category '{slug}' already exists")));
        }
        tables.next_pricing_category += 1;
        let row = PricingCategory {
            id: tables.next_pricing_category,
            name: category.name,
            slug,
            description: category.description,
            thumbnail_url: category.thumbnail_url,
            display_order: category.display_order,
        };
        tables.pricing_categories.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_pricing_category(
        &self,
        id: PricingCategoryId,
        patch: PricingCategoryPatch,
    ) -> Result<PricingCategory, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let mut category = tables
            .pricing_categories
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("pricing category", id))?;
        patch.apply(&mut category);
        if slug_taken(&tables.pricing_categories, id, &category.slug) {
            return Err(StoreError::Conflict(format!(
                "pricing category '{}' already exists",
                category.slug
            )));
        }
        tables.pricing_categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_pricing_category(&self, id: PricingCategoryId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        tables
            .pricing_categories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("pricing category", id))
    }

    async fn list_pricing_plans(
        &self,
        category: Option<PricingCategoryId>,
    ) -> Result<Vec<PricingPlan>, StoreError> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut plans: Vec<_> = tables
            .pricing_plans
            .values()
            .filter(|p| category.is_none_or(|id| p.category_id == id))
            .cloned()
            .collect();
        plans.sort_by(cmp_pricing_plans);
        Ok(plans)
    }

    async fn insert_pricing_plan(&self, plan: NewPricingPlan) -> Result<PricingPlan, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        tables.next_pricing_plan += 1;
        let row = PricingPlan {
            id: tables.next_pricing_plan,
            category_id: plan.category_id,
            title: plan.title,
            description: plan.description,
            price: plan.price,
            deliverables: plan.deliverables,
            display_order: plan.display_order,
        };
        tables.pricing_plans.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_pricing_plan(
        &self,
        id: PricingPlanId,
        patch: PricingPlanPatch,
    ) -> Result<PricingPlan, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let plan = tables
            .pricing_plans
            .get_mut(&id)
            .ok_or_else(|| not_found("pricing plan", id))?;
        patch.apply(plan);
        Ok(plan.clone())
    }

    async fn delete_pricing_plan(&self, id: PricingPlanId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        tables
            .pricing_plans
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("pricing plan", id))
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError> {
        let tables = self.tables.read().map_err(lock_err)?;
        let mut reviews: Vec<_> = tables.reviews.values().cloned().collect();
        reviews.sort_by(cmp_reviews);
        Ok(reviews)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        tables.next_review += 1;
        let row = Review {
            id: tables.next_review,
            name: review.name,
            company: review.company,
            image_url: review.image_url,
            content: review.content,
            display_order: review.display_order,
        };
        tables.reviews.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review, StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let review = tables
            .reviews
            .get_mut(&id)
            .ok_or_else(|| not_found("review", id))?;
        patch.apply(review);
        Ok(review.clone())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        tables
            .reviews
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("review", id))
    }
}

/// Stands in for the thumbnail service: copies the original unchanged into every tier as webp.
#[derive(Clone)]
pub struct PassthroughThumbnails<S: StorageBackend> {
    originals: S,
    derived: S,
}

impl<S: StorageBackend> PassthroughThumbnails<S> {
    pub fn new(originals: S, derived: S) -> Self {
        Self { originals, derived }
    }
}

impl<S: StorageBackend> ThumbnailService for PassthroughThumbnails<S> {
    async fn generate(
        &self,
        _bucket: &str,
        file: &str,
        _category: Option<&str>,
    ) -> Result<GeneratedThumbnails, ThumbnailError> {
        let data = self
            .originals
            .read(file)
            .await
            .map_err(|e| ThumbnailError::Rejected(e.to_string()))?;

        let mut manifest = DerivedManifest::default();
        for tier in SizeTier::ALL {
            let key = derived_key(file, tier, ImageFormat::Webp);
            self.derived
                .upload(&key, data.clone(), true)
                .await
                .map_err(|e| ThumbnailError::Rejected(e.to_string()))?;
            manifest.insert(tier, ImageFormat::Webp, key);
        }
        Ok(GeneratedThumbnails::Structured(manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_returns_direct_children_only() {
        let storage = MemoryStorage::new("https://cdn.test/b");
        for key in ["a.jpg", "medium/a.webp", "medium/b.webp", "large/a.avif"] {
            storage.upload(key, Bytes::from_static(b"x"), false).await.unwrap();
        }

        assert_eq!(storage.list("").await.unwrap(), vec!["a.jpg"]);
        assert_eq!(storage.list("medium").await.unwrap(), vec!["a.webp", "b.webp"]);
        assert_eq!(storage.list("medium/").await.unwrap(), vec!["a.webp", "b.webp"]);
    }

    #[tokio::test]
    async fn upload_respects_overwrite_flag() {
        let storage = MemoryStorage::default();
        storage.upload("a", Bytes::from_static(b"1"), false).await.unwrap();
        assert!(matches!(
            storage.upload("a", Bytes::from_static(b"2"), false).await,
            Err(StorageError::AlreadyExists(_))
        ));
        storage.upload("a", Bytes::from_static(b"3"), true).await.unwrap();
        assert_eq!(storage.read("a").await.unwrap(), Bytes::from_static(b"3"));
    }

    #[tokio::test]
    async fn paths_are_unique() {
        let records = MemoryRecordStore::default();
        records
            .insert_asset(NewAsset::placeholder("a.jpg", None))
            .await
            .unwrap();
        assert!(matches!(
            records.insert_asset(NewAsset::placeholder("a.jpg", None)).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(records.asset_count(), 1);
    }

    #[tokio::test]
    async fn renaming_onto_a_taken_slug_conflicts() {
        let records = MemoryRecordStore::default();
        let new = |name: &str| NewCategory {
            name: name.into(),
            thumbnail_url: None,
            visible_on_hub: true,
        };
        records.insert_category(new("Cars")).await.unwrap();
        let boats = records.insert_category(new("Boats")).await.unwrap();

        let rename = |name: &str| CategoryPatch {
            name: Some(name.into()),
            ..Default::default()
        };
        assert!(matches!(
            records.update_category(boats.id, rename("cars")).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(records.get_category(boats.id).await.unwrap().unwrap().slug, "boats");

        let renamed = records.update_category(boats.id, rename("Sail Boats")).await.unwrap();
        assert_eq!(renamed.slug, "sail-boats");
        let same = records.update_category(boats.id, rename("sail boats")).await.unwrap();
        assert_eq!(same.name, "sail boats");
    }

    #[tokio::test]
    async fn passthrough_fills_every_tier() {
        let originals = MemoryStorage::new("https://cdn.test/o");
        let derived = MemoryStorage::new("https://cdn.test/d");
        originals
            .upload("shot.jpg", Bytes::from_static(b"jpg"), false)
            .await
            .unwrap();

        let thumbnails = PassthroughThumbnails::new(originals, derived.clone());
        let manifest = thumbnails
            .generate("photos-original", "shot.jpg", None)
            .await
            .unwrap()
            .into_manifest();

        assert_eq!(manifest.keys().count(), 3);
        assert!(derived.exists("large/shot.webp").await.unwrap());
        assert!(thumbnails.generate("b", "missing.jpg", None).await.is_err());
    }
}
