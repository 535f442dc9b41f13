//! [`RecordStore`] over a PostgREST endpoint (the hosted table store).
//!
//! Tables: `images` for assets, `image_categories` for categories, and
//! `pricing_categories`, `pricing_plans` and `reviews` for the catalog.

use folio_core::prelude::*;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};

const ASSETS: &str = "images";
const CATEGORIES: &str = "image_categories";
const PRICING_CATEGORIES: &str = "pricing_categories";
const PRICING_PLANS: &str = "pricing_plans";
const REVIEWS: &str = "reviews";

#[derive(Clone)]
pub struct RestRecordStore {
    rest_url: String,
    key: String,
    client: Client,
}

fn network(e: reqwest::Error) -> StoreError {
    StoreError::Generic(format!("Network error: {e}"))
}

fn eq(value: impl ToString) -> String {
    format!("eq.{}", value.to_string())
}

#[derive(Serialize)]
struct CategoryRow<'a> {
    name: &'a str,
    slug: String,
    thumbnail_url: Option<&'a str>,
    visible_on_hub: bool,
}

#[derive(Serialize)]
struct CategoryUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail_url: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visible_on_hub: Option<bool>,
}

/// Serializes a patch, sending blank nullable text columns as `null`.
fn patch_body(patch: &impl Serialize, nullable: &[&str]) -> Result<serde_json::Value, StoreError> {
    let mut body = serde_json::to_value(patch)?;
    if let Some(fields) = body.as_object_mut() {
        for field in nullable {
            if fields
                .get(*field)
                .and_then(|v| v.as_str())
                .is_some_and(|v| v.trim().is_empty())
            {
                fields.insert(field.to_string(), serde_json::Value::Null);
            }
        }
    }
    Ok(body)
}

impl RestRecordStore {
    /// `rest_url` is the PostgREST root, e.g. `https://xyz.supabase.co/rest/v1`.
    /// Use the service-role key for admin writes, the anon key for public reads.
    pub fn new(rest_url: impl Into<String>, key: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            client,
        }
    }

    fn table(&self, builder: impl FnOnce(&Client, String) -> RequestBuilder, table: &str) -> RequestBuilder {
        builder(&self.client, format!("{}/{table}", self.rest_url))
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        error!("Record store returned {status}: {text}");
        Err(match status {
            StatusCode::CONFLICT => StoreError::Conflict(text),
            _ => StoreError::Generic(format!("{status}: {text}")),
        })
    }

    async fn rows<T: DeserializeOwned>(request: RequestBuilder) -> Result<Vec<T>, StoreError> {
        let response = Self::check(request.send().await.map_err(network)?).await?;
        let body = response.bytes().await.map_err(network)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn single<T: DeserializeOwned>(
        request: RequestBuilder,
        entity: &'static str,
        id: impl ToString,
    ) -> Result<T, StoreError> {
        Self::rows::<T>(request.header("Prefer", "return=representation"))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                entity,
                id: id.to_string(),
            })
    }

    async fn delete_row<T: DeserializeOwned>(
        &self,
        table: &str,
        entity: &'static str,
        id: i64,
    ) -> Result<(), StoreError> {
        let request = self
            .table(Client::delete, table)
            .query(&[("id", eq(id))]);
        Self::single::<T>(request, entity, id).await.map(|_| ())
    }

    async fn patch_asset(&self, id: AssetId, body: serde_json::Value) -> Result<(), StoreError> {
        let request = self
            .table(Client::patch, ASSETS)
            .query(&[("id", eq(id))])
            .json(&body);
        Self::single::<Asset>(request, "asset", id).await.map(|_| ())
    }
}

impl RecordStore for RestRecordStore {
    #[instrument(skip(self))]
    async fn insert_asset(&self, asset: NewAsset) -> Result<Asset, StoreError> {
        let request = self.table(Client::post, ASSETS).json(&asset);
        let row: Asset = Self::single(request, "asset", &asset.path).await?;
        debug!(id = row.id, "Inserted asset");
        Ok(row)
    }

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, StoreError> {
        let request = self
            .table(Client::get, ASSETS)
            .query(&[("id", eq(id)), ("limit", "1".into())]);
        Ok(Self::rows(request).await?.into_iter().next())
    }

    async fn find_asset_by_path(&self, path: &str) -> Result<Option<Asset>, StoreError> {
        let request = self
            .table(Client::get, ASSETS)
            .query(&[("path", eq(path)), ("limit", "1".into())]);
        Ok(Self::rows(request).await?.into_iter().next())
    }

    async fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>, StoreError> {
        let mut query = vec![("order", "created_at.desc,id.desc".to_string())];
        if let Some(category) = filter.category_id {
            query.push(("category_id", eq(category)));
        }
        if let Some(role) = filter.role {
            query.push((role.column(), eq(true)));
        }
        Self::rows(self.table(Client::get, ASSETS).query(&query)).await
    }

    #[instrument(skip(self))]
    async fn set_role_flag(&self, id: AssetId, role: Role, value: bool) -> Result<(), StoreError> {
        self.patch_asset(id, serde_json::json!({ (role.column()): value }))
            .await
    }

    async fn set_manifest(
        &self,
        id: AssetId,
        manifest: Option<DerivedManifest>,
    ) -> Result<(), StoreError> {
        self.patch_asset(id, serde_json::json!({ "derived": manifest }))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_asset(&self, id: AssetId) -> Result<(), StoreError> {
        let request = self
            .table(Client::delete, ASSETS)
            .query(&[("id", eq(id))]);
        Self::single::<Asset>(request, "asset", id).await.map(|_| ())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let request = self
            .table(Client::get, CATEGORIES)
            .query(&[("order", "id.asc")]);
        Self::rows(request).await
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let request = self
            .table(Client::get, CATEGORIES)
            .query(&[("id", eq(id)), ("limit", "1".into())]);
        Ok(Self::rows(request).await?.into_iter().next())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let request = self
            .table(Client::get, CATEGORIES)
            .query(&[("slug", eq(slug)), ("limit", "1".into())]);
        Ok(Self::rows(request).await?.into_iter().next())
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let row = CategoryRow {
            name: &category.name,
            slug: slugify(&category.name),
            thumbnail_url: category.thumbnail_url.as_deref().filter(|url| !url.is_empty()),
            visible_on_hub: category.visible_on_hub,
        };
        let request = self.table(Client::post, CATEGORIES).json(&row);
        Self::single(request, "category", &row.slug).await
    }

    async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, StoreError> {
        let update = CategoryUpdate {
            name: patch.name.as_deref(),
            slug: patch.name.as_deref().map(slugify),
            thumbnail_url: patch
                .thumbnail_url
                .as_deref()
                .map(|url| (!url.is_empty()).then_some(url)),
            visible_on_hub: patch.visible_on_hub,
        };
        let request = self
            .table(Client::patch, CATEGORIES)
            .query(&[("id", eq(id))])
            .json(&update);
        Self::single(request, "category", id).await
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let request = self
            .table(Client::delete, CATEGORIES)
            .query(&[("id", eq(id))]);
        Self::single::<Category>(request, "category", id)
            .await
            .map(|_| ())
    }

    async fn list_pricing_categories(&self) -> Result<Vec<PricingCategory>, StoreError> {
        let request = self
            .table(Client::get, PRICING_CATEGORIES)
            .query(&[("order", "display_order.asc,name.asc,id.asc")]);
        Self::rows(request).await
    }

    async fn insert_pricing_category(
        &self,
        mut category: NewPricingCategory,
    ) -> Result<PricingCategory, StoreError> {
        let slug = category
            .slug
            .get_or_insert_with(|| slugify(&category.name))
            .clone();
        let request = self.table(Client::post, PRICING_CATEGORIES).json(&category);
        Self::single(request, "pricing category", slug).await
    }

    async fn update_pricing_category(
        &self,
        id: PricingCategoryId,
        patch: PricingCategoryPatch,
    ) -> Result<PricingCategory, StoreError> {
        let body = patch_body(&patch, &["description", "thumbnail_url"])?;
        let request = self
            .table(Client::patch, PRICING_CATEGORIES)
            .query(&[("id", eq(id))])
            .json(&body);
        Self::single(request, "pricing category", id).await
    }

    async fn delete_pricing_category(&self, id: PricingCategoryId) -> Result<(), StoreError> {
        self.delete_row::<PricingCategory>(PRICING_CATEGORIES, "pricing category", id)
            .await
    }

    async fn list_pricing_plans(
        &self,
        category: Option<PricingCategoryId>,
    ) -> Result<Vec<PricingPlan>, StoreError> {
        let mut query = vec![("order", "display_order.asc,price.asc,id.asc".to_string())];
        if let Some(category) = category {
            query.push(("category_id", eq(category)));
        }
        Self::rows(self.table(Client::get, PRICING_PLANS).query(&query)).await
    }

    async fn insert_pricing_plan(&self, plan: NewPricingPlan) -> Result<PricingPlan, StoreError> {
        let request = self.table(Client::post, PRICING_PLANS).json(&plan);
        Self::single(request, "pricing plan", &plan.title).await
    }

    async fn update_pricing_plan(
        &self,
        id: PricingPlanId,
        patch: PricingPlanPatch,
    ) -> Result<PricingPlan, StoreError> {
        let request = self
            .table(Client::patch, PRICING_PLANS)
            .query(&[("id", eq(id))])
            .json(&patch);
        Self::single(request, "pricing plan", id).await
    }

    async fn delete_pricing_plan(&self, id: PricingPlanId) -> Result<(), StoreError> {
        self.delete_row::<PricingPlan>(PRICING_PLANS, "pricing plan", id)
            .await
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError> {
        let request = self
            .table(Client::get, REVIEWS)
            .query(&[("order", "display_order.asc,id.asc")]);
        Self::rows(request).await
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let request = self.table(Client::post, REVIEWS).json(&review);
        Self::single(request, "review", &review.name).await
    }

    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review, StoreError> {
        let body = patch_body(&patch, &["company", "image_url"])?;
        let request = self
            .table(Client::patch, REVIEWS)
            .query(&[("id", eq(id))])
            .json(&body);
        Self::single(request, "review", id).await
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), StoreError> {
        self.delete_row::<Review>(REVIEWS, "review", id).await
    }
}
