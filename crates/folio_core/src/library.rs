//! Asset lifecycle: ingest, delete, listing and the public gallery views.

use crate::backfill::{BackfillReport, backfill};
use crate::catalog::Catalog;
use crate::config::DEFAULT_DERIVED_BUCKET;
use crate::error::{FolioError, StorageError};
use crate::manifest::base_name;
use crate::model::*;
use crate::resolver::{DerivedPathResolver, ResolvedUrl};
use crate::roles::RoleResolver;
use crate::size::SizeTier;
use crate::traits::*;
use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

/// Outcome of an upload. The record exists even when thumbnail generation failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub asset: Asset,
    pub thumbnail_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubEntry {
    pub category: Category,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryItem {
    pub asset: Asset,
    pub url: ResolvedUrl,
}

/// Current holder of a role together with the URL to display for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleHolder {
    pub asset: Option<Asset>,
    pub url: ResolvedUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReport {
    pub path: String,
    pub derived_removed: Vec<String>,
}

/// Storage key for a fresh upload: `{millis}-{rand6}-{clean base}{.ext}`.
pub fn unique_key(file_name: &str, millis: i64, suffix: &str) -> String {
    let (base, ext) = match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.split_at(dot),
        _ => return format!("{millis}-{suffix}-{file_name}"),
    };
    let clean: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    format!("{millis}-{suffix}-{clean}{ext}")
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Everything the site needs, built once at startup and handed to consumers.
#[derive(Clone)]
pub struct AssetLibrary<S, R, G, P>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
{
    originals: S,
    derived: S,
    originals_bucket: String,
    derived_bucket: String,
    records: R,
    thumbnails: G,
    resolver: DerivedPathResolver<S, P>,
    roles: RoleResolver<R>,
    catalog: Catalog<R>,
}

impl<S, R, G, P> AssetLibrary<S, R, G, P>
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
{
    pub fn new(
        originals: S,
        derived: S,
        records: R,
        thumbnails: G,
        probe: P,
        originals_bucket: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            resolver: DerivedPathResolver::new(
                originals.clone(),
                derived.clone(),
                probe,
                placeholder,
            ),
            roles: RoleResolver::new(records.clone()),
            catalog: Catalog::new(records.clone()),
            originals,
            derived,
            originals_bucket: originals_bucket.into(),
            derived_bucket: DEFAULT_DERIVED_BUCKET.to_string(),
            records,
            thumbnails,
        }
    }

    /// Name the derived bucket is served under. Defaults to `photos-derived`.
    pub fn with_derived_bucket(mut self, name: impl Into<String>) -> Self {
        self.derived_bucket = name.into();
        self
    }

    /// Reads an object from the bucket named `bucket`.
    pub async fn read_object(&self, bucket: &str, key: &str) -> Result<Bytes, FolioError> {
        let storage = if bucket == self.originals_bucket {
            &self.originals
        } else if bucket == self.derived_bucket {
            &self.derived
        } else {
            return Err(StorageError::NotFound(format!("{bucket}/{key}")).into());
        };
        Ok(storage.read(key).await?)
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn resolver(&self) -> &DerivedPathResolver<S, P> {
        &self.resolver
    }

    pub fn roles(&self) -> &RoleResolver<R> {
        &self.roles
    }

    /// Pricing packages and reviews.
    pub fn catalog(&self) -> &Catalog<R> {
        &self.catalog
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn ingest(
        &self,
        file_name: &str,
        data: Bytes,
        category_id: Option<CategoryId>,
        uploaded_by: Option<String>,
    ) -> Result<IngestReport, FolioError> {
        if file_name.trim().is_empty() {
            return Err(FolioError::InvalidInput("file name is empty".into()));
        }
        let category = match category_id {
            Some(id) => Some(
                self.records
                    .get_category(id)
                    .await?
                    .ok_or(FolioError::CategoryNotFound(id))?,
            ),
            None => None,
        };

        let key = unique_key(file_name, Utc::now().timestamp_millis(), &random_suffix());
        self.originals.upload(&key, data, true).await?;
        info!("Uploaded original {key}");

        let asset = match self.records.find_asset_by_path(&key).await? {
            Some(existing) => existing,
            None => {
                self.records
                    .insert_asset(NewAsset {
                        path: key.clone(),
                        title: file_name.to_string(),
                        category_id,
                        uploaded_by,
                    })
                    .await?
            }
        };

        let generated = self
            .thumbnails
            .generate(
                &self.originals_bucket,
                &key,
                category.as_ref().map(|c| c.slug.as_str()),
            )
            .await;

        let (asset, thumbnail_error) = match generated {
            Ok(generated) => {
                let manifest = generated.into_manifest();
                if manifest.is_empty() {
                    warn!("Thumbnail service generated nothing for {key}");
                    (asset, Some("Thumbnail service returned no generated images".to_string()))
                } else {
                    self.records
                        .set_manifest(asset.id, Some(manifest.clone()))
                        .await?;
                    (
                        Asset {
                            derived: Some(manifest),
                            ..asset
                        },
                        None,
                    )
                }
            }
            Err(e) => {
                warn!("Thumbnail generation failed for {key}: {e}");
                (asset, Some(e.to_string()))
            }
        };

        Ok(IngestReport {
            asset,
            thumbnail_error,
        })
    }

    /// Derived keys belonging to `asset`: its manifest plus anything a scan of the tier folders finds.
    pub async fn derived_keys(&self, asset: &Asset) -> Result<Vec<String>, FolioError> {
        let base = base_name(&asset.path);
        let mut keys: BTreeSet<String> = asset
            .derived
            .iter()
            .flat_map(|manifest| manifest.keys().map(str::to_string))
            .collect();

        for tier in SizeTier::ALL {
            for name in self.derived.list(tier.as_str()).await? {
                if base_name(&name) == base {
                    keys.insert(format!("{tier}/{name}"));
                }
            }
        }
        Ok(keys.into_iter().collect())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, asset_id: AssetId) -> Result<DeleteReport, FolioError> {
        let asset = self
            .records
            .get_asset(asset_id)
            .await?
            .ok_or(FolioError::AssetNotFound(asset_id))?;

        let derived = self.derived_keys(&asset).await?;
        if !derived.is_empty() {
            self.derived.remove(&derived).await?;
        }
        self.originals.remove(std::slice::from_ref(&asset.path)).await?;
        self.records.delete_asset(asset_id).await?;
        info!("Deleted {} and {} derived variants", asset.path, derived.len());

        if let Err(e) = self.thumbnails.delete_job(&asset.path, &derived).await {
            warn!("Delete job for {} failed: {e}", asset.path);
        }

        Ok(DeleteReport {
            path: asset.path,
            derived_removed: derived,
        })
    }

    pub async fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>, FolioError> {
        Ok(self.records.list_assets(filter).await?)
    }

    pub async fn backfill(&self, uploaded_by: Option<&str>) -> Result<BackfillReport, FolioError> {
        backfill(&self.originals, &self.records, uploaded_by).await
    }

    pub async fn resolve_asset(&self, asset_id: AssetId, tier: SizeTier) -> ResolvedUrl {
        match self.records.get_asset(asset_id).await {
            Ok(Some(asset)) => self.resolver.resolve_asset(&asset, tier).await,
            Ok(None) => self.resolver.placeholder(),
            Err(e) => {
                warn!("Asset lookup for {asset_id} failed: {e}");
                self.resolver.placeholder()
            }
        }
    }

    pub async fn resolve_role(
        &self,
        role: Role,
        scope: Option<CategoryId>,
        tier: SizeTier,
    ) -> Result<RoleHolder, FolioError> {
        if role.is_scoped() != scope.is_some() {
            return Err(FolioError::InvalidScope(format!(
                "{role} {} a category",
                if role.is_scoped() { "requires" } else { "does not take" }
            )));
        }
        let (asset, url) = self
            .resolver
            .resolve_role(&self.roles, role, scope, tier)
            .await;
        Ok(RoleHolder { asset, url })
    }

    pub async fn promote(
        &self,
        asset_id: AssetId,
        role: Role,
        scope: Option<CategoryId>,
    ) -> Result<Asset, FolioError> {
        self.roles.promote_to_role(asset_id, role, scope).await
    }

    async fn hub_thumbnail(&self, category: &Category, tier: SizeTier) -> Option<String> {
        if let Some(url) = &category.thumbnail_url {
            return Some(url.clone());
        }
        match self
            .roles
            .get_role_holder(Role::CategoryThumbnail, Some(category.id))
            .await
        {
            Ok(Some(asset)) => Some(self.resolver.resolve_asset(&asset, tier).await.url),
            Ok(None) => None,
            Err(e) => {
                warn!("Thumbnail lookup for {} failed: {e}", category.slug);
                None
            }
        }
    }

    /// Visible categories with their thumbnail URLs, looked up concurrently.
    pub async fn hub(&self, tier: SizeTier) -> Result<Vec<HubEntry>, FolioError> {
        let categories: Vec<Category> = self
            .records
            .list_categories()
            .await?
            .into_iter()
            .filter(|c| c.visible_on_hub)
            .collect();

        let lookups: Vec<_> = categories
            .iter()
            .map(|category| self.hub_thumbnail(category, tier))
            .collect();
        let thumbnails = join_all(lookups).await;

        Ok(categories
            .into_iter()
            .zip(thumbnails)
            .map(|(category, thumbnail_url)| HubEntry {
                category,
                thumbnail_url,
            })
            .collect())
    }

    pub async fn gallery(&self, slug: &str, tier: SizeTier) -> Result<Vec<GalleryItem>, FolioError> {
        let category = self.category(slug).await?;

        let assets = self
            .records
            .list_assets(AssetFilter::category(category.id))
            .await?;

        let mut items = Vec::with_capacity(assets.len());
        for asset in assets {
            let url = self.resolver.resolve_asset(&asset, tier).await;
            items.push(GalleryItem { asset, url });
        }
        Ok(items)
    }

    pub async fn category(&self, slug: &str) -> Result<Category, FolioError> {
        self.records
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| FolioError::UnknownCategory(slug.to_string()))
    }

    pub async fn categories(&self) -> Result<Vec<Category>, FolioError> {
        Ok(self.records.list_categories().await?)
    }

    pub async fn create_category(&self, category: NewCategory) -> Result<Category, FolioError> {
        if slugify(&category.name).is_empty() {
            return Err(FolioError::InvalidInput("category name is empty".into()));
        }
        Ok(self.records.insert_category(category).await?)
    }

    pub async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, FolioError> {
        if patch.name.as_deref().is_some_and(|name| slugify(name).is_empty()) {
            return Err(FolioError::InvalidInput("category name is empty".into()));
        }
        if self.records.get_category(id).await?.is_none() {
            return Err(FolioError::CategoryNotFound(id));
        }
        Ok(self.records.update_category(id, patch).await?)
    }

    pub async fn delete_category(&self, id: CategoryId) -> Result<(), FolioError> {
        if self.records.get_category(id).await?.is_none() {
            return Err(FolioError::CategoryNotFound(id));
        }
        Ok(self.records.delete_category(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThumbnailError;
    use crate::manifest::{DerivedManifest, GeneratedThumbnails, ImageFormat};
    use crate::memory::{MemoryRecordStore, MemoryStorage};
    use crate::resolver::UrlSource;
    use std::sync::{Arc, Mutex};

    /// Writes the variants it reports into the derived bucket, like the real service.
    #[derive(Clone)]
    struct FakeThumbnails {
        derived: MemoryStorage,
        fail: bool,
        deleted: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    }

    impl ThumbnailService for FakeThumbnails {
        async fn generate(
            &self,
            _bucket: &str,
            file: &str,
            _category: Option<&str>,
        ) -> Result<GeneratedThumbnails, ThumbnailError> {
            if self.fail {
                return Err(ThumbnailError::Rejected("sharp crashed".into()));
            }
            let mut manifest = DerivedManifest::default();
            for tier in SizeTier::ALL {
                let key = crate::manifest::derived_key(file, tier, ImageFormat::Webp);
                self.derived
                    .upload(&key, Bytes::from_static(b"webp"), true)
                    .await
                    .map_err(|e| ThumbnailError::Transport(e.to_string()))?;
                manifest.insert(tier, ImageFormat::Webp, key);
            }
            Ok(GeneratedThumbnails::Structured(manifest))
        }

        async fn delete_job(&self, path: &str, derived: &[String]) -> Result<(), ThumbnailError> {
            self.deleted
                .lock()
                .unwrap()
                .push((path.to_string(), derived.to_vec()));
            Ok(())
        }
    }

    type TestLibrary =
        AssetLibrary<MemoryStorage, MemoryRecordStore, FakeThumbnails, StorageProbe<MemoryStorage>>;

    fn library(fail: bool) -> (TestLibrary, FakeThumbnails) {
        let originals = MemoryStorage::new("https://cdn.test/photos-original");
        let derived = MemoryStorage::new("https://cdn.test/photos-derived");
        let thumbnails = FakeThumbnails {
            derived: derived.clone(),
            fail,
            deleted: Default::default(),
        };
        let library = AssetLibrary::new(
            originals,
            derived.clone(),
            MemoryRecordStore::default(),
            thumbnails.clone(),
            StorageProbe(derived),
            "photos-original",
            "/placeholder.avif",
        );
        (library, thumbnails)
    }

    #[test]
    fn unique_keys_are_cleaned() {
        assert_eq!(
            unique_key("My Trip (1).JPG", 1758043612700, "rkk5vv"),
            "1758043612700-rkk5vv-My-Trip-1.JPG"
        );
        assert_eq!(unique_key("README", 1, "abcdef"), "1-abcdef-README");
        assert_eq!(random_suffix().len(), 6);
    }

    #[tokio::test]
    async fn ingest_writes_manifest() {
        let (library, _) = library(false);
        let report = library
            .ingest("sunset.jpg", Bytes::from_static(b"jpg"), None, Some("admin".into()))
            .await
            .unwrap();

        assert!(report.thumbnail_error.is_none());
        let stored = library.records().get_asset(report.asset.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "sunset.jpg");
        assert!(stored.path.ends_with("-sunset.jpg"));
        let manifest = stored.derived.unwrap();
        assert!(manifest.get(SizeTier::Large, ImageFormat::Webp).is_some());

        let url = library.resolve_asset(stored.id, SizeTier::Large).await;
        assert!(matches!(url.source, UrlSource::Manifest { .. }));
    }

    #[tokio::test]
    async fn failed_generation_keeps_record_without_manifest() {
        let (library, _) = library(true);
        let report = library
            .ingest("sunset.jpg", Bytes::from_static(b"jpg"), None, None)
            .await
            .unwrap();

        assert!(report.thumbnail_error.unwrap().contains("sharp crashed"));
        let stored = library.records().get_asset(report.asset.id).await.unwrap().unwrap();
        assert!(stored.derived.is_none());
        assert_eq!(
            library.resolve_asset(stored.id, SizeTier::Medium).await.source,
            UrlSource::Original
        );
    }

    #[tokio::test]
    async fn ingest_rejects_unknown_category() {
        let (library, _) = library(false);
        assert!(matches!(
            library.ingest("a.jpg", Bytes::new(), Some(42), None).await,
            Err(FolioError::CategoryNotFound(42))
        ));
    }

    #[tokio::test]
    async fn delete_removes_original_variants_and_record() {
        let (library, thumbnails) = library(false);
        let report = library
            .ingest("sunset.jpg", Bytes::from_static(b"jpg"), None, None)
            .await
            .unwrap();
        let asset = report.asset;

        let deleted = library.delete(asset.id).await.unwrap();

        assert_eq!(deleted.derived_removed.len(), 3);
        assert!(library.records().get_asset(asset.id).await.unwrap().is_none());
        assert!(library.derived.list("medium").await.unwrap().is_empty());
        assert!(!library.originals.exists(&asset.path).await.unwrap());
        let jobs = thumbnails.deleted.lock().unwrap().clone();
        assert_eq!(jobs, vec![(asset.path.clone(), deleted.derived_removed)]);
    }

    #[tokio::test]
    async fn hub_prefers_override_then_role_holder() {
        let (library, _) = library(false);
        let cars = library
            .create_category(NewCategory {
                name: "Cars".into(),
                thumbnail_url: None,
                visible_on_hub: true,
            })
            .await
            .unwrap();
        library
            .create_category(NewCategory {
                name: "Drone".into(),
                thumbnail_url: Some("https://cdn.test/drone.avif".into()),
                visible_on_hub: true,
            })
            .await
            .unwrap();
        library
            .create_category(NewCategory {
                name: "Hidden".into(),
                thumbnail_url: None,
                visible_on_hub: false,
            })
            .await
            .unwrap();
        let car = library
            .ingest("car.jpg", Bytes::from_static(b"jpg"), Some(cars.id), None)
            .await
            .unwrap()
            .asset;
        library
            .promote(car.id, Role::CategoryThumbnail, Some(cars.id))
            .await
            .unwrap();

        let hub = library.hub(SizeTier::Medium).await.unwrap();

        assert_eq!(hub.len(), 2);
        let car_url = hub[0].thumbnail_url.as_deref().unwrap();
        assert!(car_url.starts_with("https://cdn.test/photos-derived/medium/"));
        assert_eq!(hub[1].thumbnail_url.as_deref(), Some("https://cdn.test/drone.avif"));
    }

    #[tokio::test]
    async fn gallery_lists_category_assets_with_urls() {
        let (library, _) = library(false);
        let cars = library
            .create_category(NewCategory {
                name: "Cars".into(),
                thumbnail_url: None,
                visible_on_hub: true,
            })
            .await
            .unwrap();
        for name in ["a.jpg", "b.jpg"] {
            library
                .ingest(name, Bytes::from_static(b"jpg"), Some(cars.id), None)
                .await
                .unwrap();
        }
        library
            .ingest("other.jpg", Bytes::from_static(b"jpg"), None, None)
            .await
            .unwrap();

        let gallery = library.gallery("cars", SizeTier::Small).await.unwrap();
        assert_eq!(gallery.len(), 2);
        assert!(gallery.iter().all(|item| item.url.url.contains("/small/")));
        assert!(library.gallery("boats", SizeTier::Small).await.is_err());
    }

    #[tokio::test]
    async fn role_resolution_without_holder_is_placeholder() {
        let (library, _) = library(false);
        let holder = library
            .resolve_role(Role::HomeHero, None, SizeTier::Large)
            .await
            .unwrap();
        assert!(holder.asset.is_none());
        assert_eq!(holder.url.url, "/placeholder.avif");
        assert!(
            library
                .resolve_role(Role::CategoryThumbnail, None, SizeTier::Large)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn reads_objects_by_bucket_name() {
        let (library, _) = library(false);
        let report = library
            .ingest("dune.jpg", Bytes::from_static(b"jpg"), None, None)
            .await
            .unwrap();

        let original = library
            .read_object("photos-original", &report.asset.path)
            .await
            .unwrap();
        assert_eq!(original, Bytes::from_static(b"jpg"));
        let key = crate::manifest::derived_key(&report.asset.path, SizeTier::Small, ImageFormat::Webp);
        assert!(library.read_object("photos-derived", &key).await.is_ok());
        assert!(matches!(
            library.read_object("secrets", "dune.jpg").await,
            Err(FolioError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn renames_to_blank_or_taken_names_are_rejected() {
        let (library, _) = library(false);
        let new = |name: &str| NewCategory {
            name: name.into(),
            thumbnail_url: None,
            visible_on_hub: true,
        };
        library.create_category(new("Cars")).await.unwrap();
        let boats = library.create_category(new("Boats")).await.unwrap();

        let rename = |name: &str| CategoryPatch {
            name: Some(name.into()),
            ..Default::default()
        };
        assert!(matches!(
            library.update_category(boats.id, rename("   ")).await,
            Err(FolioError::InvalidInput(_))
        ));
        assert!(matches!(
            library.update_category(boats.id, rename("cars")).await,
            Err(FolioError::Store(crate::error::StoreError::Conflict(_)))
        ));
        assert_eq!(library.category("boats").await.unwrap().id, boats.id);
    }
}
