//! Pricing packages and client reviews.
//!
//! Plain records kept next to the photo library. Public listings come back in
//! display order.

use crate::error::{FolioError, StoreError};
use crate::model::slugify;
use crate::traits::RecordStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::instrument;

pub type PricingCategoryId = i64;
pub type PricingPlanId = i64;
pub type ReviewId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingCategory {
    pub id: PricingCategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPricingCategory {
    pub name: String,
    /// Derived from `name` when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingCategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
}

impl PricingCategoryPatch {
    pub fn apply(&self, category: &mut PricingCategory) {
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(slug) = &self.slug {
            category.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            category.description = non_empty(description);
        }
        if let Some(url) = &self.thumbnail_url {
            category.thumbnail_url = non_empty(url);
        }
        if let Some(order) = self.display_order {
            category.display_order = order;
        }
    }
}

/// One package offered inside a pricing category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPlan {
    pub id: PricingPlanId,
    pub category_id: PricingCategoryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPricingPlan {
    pub category_id: PricingCategoryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingPlanPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<PricingCategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
}

impl PricingPlanPatch {
    pub fn apply(&self, plan: &mut PricingPlan) {
        if let Some(category_id) = self.category_id {
            plan.category_id = category_id;
        }
        if let Some(title) = &self.title {
            plan.title = title.clone();
        }
        if let Some(description) = &self.description {
            plan.description = description.clone();
        }
        if let Some(price) = self.price {
            plan.price = price;
        }
        if let Some(deliverables) = &self.deliverables {
            plan.deliverables = deliverables.clone();
        }
        if let Some(order) = self.display_order {
            plan.display_order = order;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub content: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub content: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
}

impl ReviewPatch {
    pub fn apply(&self, review: &mut Review) {
        if let Some(name) = &self.name {
            review.name = name.clone();
        }
        if let Some(company) = &self.company {
            review.company = non_empty(company);
        }
        if let Some(url) = &self.image_url {
            review.image_url = non_empty(url);
        }
        if let Some(content) = &self.content {
            review.content = content.clone();
        }
        if let Some(order) = self.display_order {
            review.display_order = order;
        }
    }
}

/// A pricing category with its plans, as shown on its public page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPage {
    pub category: PricingCategory,
    pub plans: Vec<PricingPlan>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Trims every entry and drops the blank ones.
pub fn clean_deliverables(deliverables: &[String]) -> Vec<String> {
    deliverables
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn cmp_pricing_categories(a: &PricingCategory, b: &PricingCategory) -> Ordering {
    (a.display_order, &a.name, a.id).cmp(&(b.display_order, &b.name, b.id))
}

pub fn cmp_pricing_plans(a: &PricingPlan, b: &PricingPlan) -> Ordering {
    a.display_order
        .cmp(&b.display_order)
        .then(a.price.total_cmp(&b.price))
        .then(a.id.cmp(&b.id))
}

pub fn cmp_reviews(a: &Review, b: &Review) -> Ordering {
    (a.display_order, a.id).cmp(&(b.display_order, b.id))
}

fn invalid(reason: &str) -> FolioError {
    FolioError::InvalidInput(reason.to_string())
}

fn check_price(price: f64) -> Result<(), FolioError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(invalid("price must be a non-negative number"))
    }
}

fn not_found(entity: &'static str, id: i64) -> FolioError {
    FolioError::Store(StoreError::NotFound {
        entity,
        id: id.to_string(),
    })
}

/// Pricing and review operations over a [`RecordStore`].
#[derive(Clone)]
pub struct Catalog<R: RecordStore> {
    records: R,
}

impl<R: RecordStore> Catalog<R> {
    pub fn new(records: R) -> Self {
        Self { records }
    }

    pub async fn pricing_categories(&self) -> Result<Vec<PricingCategory>, FolioError> {
        Ok(self.records.list_pricing_categories().await?)
    }

    /// The public page for one pricing category.
    pub async fn pricing_page(&self, slug: &str) -> Result<PricingPage, FolioError> {
        let category = self
            .pricing_categories()
            .await?
            .into_iter()
            .find(|c| c.slug == slug)
            .ok_or_else(|| FolioError::UnknownCategory(slug.to_string()))?;
        let plans = self.records.list_pricing_plans(Some(category.id)).await?;
        Ok(PricingPage { category, plans })
    }

    #[instrument(skip(self))]
    pub async fn create_pricing_category(
        &self,
        mut category: NewPricingCategory,
    ) -> Result<PricingCategory, FolioError> {
        if category.name.trim().is_empty() {
            return Err(invalid("pricing category name is empty"));
        }
        let slug = slugify(category.slug.as_deref().unwrap_or(&category.name));
        if slug.is_empty() {
            return Err(invalid("pricing category slug is empty"));
        }
        category.slug = Some(slug);
        Ok(self.records.insert_pricing_category(category).await?)
    }

    #[instrument(skip(self))]
    pub async fn update_pricing_category(
        &self,
        id: PricingCategoryId,
        mut patch: PricingCategoryPatch,
    ) -> Result<PricingCategory, FolioError> {
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(invalid("pricing category name is empty"));
        }
        if let Some(slug) = patch.slug.as_deref().map(slugify) {
            if slug.is_empty() {
                return Err(invalid("pricing category slug is empty"));
            }
            patch.slug = Some(slug);
        }
        Ok(self.records.update_pricing_category(id, patch).await?)
    }

    /// Plans of the category are kept.
    #[instrument(skip(self))]
    pub async fn delete_pricing_category(&self, id: PricingCategoryId) -> Result<(), FolioError> {
        Ok(self.records.delete_pricing_category(id).await?)
    }

    pub async fn pricing_plans(
        &self,
        category: Option<PricingCategoryId>,
    ) -> Result<Vec<PricingPlan>, FolioError> {
        Ok(self.records.list_pricing_plans(category).await?)
    }

    async fn require_pricing_category(&self, id: PricingCategoryId) -> Result<(), FolioError> {
        if self
            .records
            .list_pricing_categories()
            .await?
            .iter()
            .any(|c| c.id == id)
        {
            Ok(())
        } else {
            Err(not_found("pricing category", id))
        }
    }

    #[instrument(skip(self))]
    pub async fn create_pricing_plan(
        &self,
        mut plan: NewPricingPlan,
    ) -> Result<PricingPlan, FolioError> {
        if plan.title.trim().is_empty() {
            return Err(invalid("plan title is empty"));
        }
        check_price(plan.price)?;
        self.require_pricing_category(plan.category_id).await?;
        plan.deliverables = clean_deliverables(&plan.deliverables);
        Ok(self.records.insert_pricing_plan(plan).await?)
    }

    #[instrument(skip(self))]
    pub async fn update_pricing_plan(
        &self,
        id: PricingPlanId,
        mut patch: PricingPlanPatch,
    ) -> Result<PricingPlan, FolioError> {
        if patch.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
            return Err(invalid("plan title is empty"));
        }
        if let Some(price) = patch.price {
            check_price(price)?;
        }
        if let Some(category_id) = patch.category_id {
            self.require_pricing_category(category_id).await?;
        }
        patch.deliverables = patch.deliverables.as_deref().map(clean_deliverables);
        Ok(self.records.update_pricing_plan(id, patch).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_pricing_plan(&self, id: PricingPlanId) -> Result<(), FolioError> {
        Ok(self.records.delete_pricing_plan(id).await?)
    }

    pub async fn reviews(&self) -> Result<Vec<Review>, FolioError> {
        Ok(self.records.list_reviews().await?)
    }

    #[instrument(skip(self))]
    pub async fn create_review(&self, mut review: NewReview) -> Result<Review, FolioError> {
        if review.name.trim().is_empty() || review.content.trim().is_empty() {
            return Err(invalid("review needs a name and text"));
        }
        review.company = review.company.as_deref().and_then(non_empty);
        review.image_url = review.image_url.as_deref().and_then(non_empty);
        Ok(self.records.insert_review(review).await?)
    }

    #[instrument(skip(self))]
    pub async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> Result<Review, FolioError> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&patch.name) || blank(&patch.content) {
            return Err(invalid("review needs a name and text"));
        }
        Ok(self.records.update_review(id, patch).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_review(&self, id: ReviewId) -> Result<(), FolioError> {
        Ok(self.records.delete_review(id).await?)
    }
}
