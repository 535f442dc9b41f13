use crate::manifest::DerivedManifest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type AssetId = i64;
pub type CategoryId = i64;

/// A designation an asset can hold. At most one asset holds a role per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    HomeHero,
    PhotoHero,
    VideoHero,
    ContactImage,
    AboutImage,
    /// Scoped per category.
    CategoryThumbnail,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::HomeHero,
        Role::PhotoHero,
        Role::VideoHero,
        Role::ContactImage,
        Role::AboutImage,
        Role::CategoryThumbnail,
    ];

    pub fn is_scoped(&self) -> bool {
        matches!(self, Role::CategoryThumbnail)
    }

    /// Full-bleed banner roles, selected with the hero breakpoint.
    pub fn is_hero(&self) -> bool {
        matches!(self, Role::HomeHero | Role::PhotoHero | Role::VideoHero)
    }

    /// Column name of the flag in the record store.
    pub fn column(&self) -> &'static str {
        match self {
            Role::HomeHero => "is_home_hero",
            Role::PhotoHero => "is_photo_hero",
            Role::VideoHero => "is_video_hero",
            Role::ContactImage => "is_contact_image",
            Role::AboutImage => "is_about_image",
            Role::CategoryThumbnail => "is_category_thumbnail",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::HomeHero => "home_hero",
            Role::PhotoHero => "photo_hero",
            Role::VideoHero => "video_hero",
            Role::ContactImage => "contact_image",
            Role::AboutImage => "about_image",
            Role::CategoryThumbnail => "category_thumbnail",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// Role flags as stored on an asset row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags {
    #[serde(default)]
    pub is_home_hero: bool,
    #[serde(default)]
    pub is_photo_hero: bool,
    #[serde(default)]
    pub is_video_hero: bool,
    #[serde(default)]
    pub is_contact_image: bool,
    #[serde(default)]
    pub is_about_image: bool,
    #[serde(default)]
    pub is_category_thumbnail: bool,
}

impl RoleFlags {
    pub fn get(&self, role: Role) -> bool {
        match role {
            Role::HomeHero => self.is_home_hero,
            Role::PhotoHero => self.is_photo_hero,
            Role::VideoHero => self.is_video_hero,
            Role::ContactImage => self.is_contact_image,
            Role::AboutImage => self.is_about_image,
            Role::CategoryThumbnail => self.is_category_thumbnail,
        }
    }

    pub fn set(&mut self, role: Role, value: bool) {
        let flag = match role {
            Role::HomeHero => &mut self.is_home_hero,
            Role::PhotoHero => &mut self.is_photo_hero,
            Role::VideoHero => &mut self.is_video_hero,
            Role::ContactImage => &mut self.is_contact_image,
            Role::AboutImage => &mut self.is_about_image,
            Role::CategoryThumbnail => &mut self.is_category_thumbnail,
        };
        *flag = value;
    }

    pub fn any(&self) -> bool {
        Role::ALL.iter().any(|role| self.get(*role))
    }
}

/// One uploaded original and everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,

    /// Storage key in the originals bucket. Unique.
    pub path: String,

    pub title: String,

    /// `None` means uncategorized.
    pub category_id: Option<CategoryId>,

    #[serde(flatten)]
    pub roles: RoleFlags,

    /// Absent until the thumbnail service reported what it generated.
    #[serde(default)]
    pub derived: Option<DerivedManifest>,

    pub created_at: DateTime<Utc>,

    pub uploaded_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    pub path: String,
    pub title: String,
    pub category_id: Option<CategoryId>,
    pub uploaded_by: Option<String>,
}

impl NewAsset {
    /// An uncategorized record for an object found in storage without one.
    pub fn placeholder(path: impl Into<String>, uploaded_by: Option<String>) -> Self {
        let path = path.into();
        Self {
            title: path.clone(),
            path,
            category_id: None,
            uploaded_by,
        }
    }
}

/// Equality filters for asset queries. Results are ordered newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetFilter {
    pub category_id: Option<CategoryId>,
    /// Only assets holding this role.
    pub role: Option<Role>,
}

impl AssetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(category_id: CategoryId) -> Self {
        Self {
            category_id: Some(category_id),
            role: None,
        }
    }

    pub fn role(role: Role, scope: Option<CategoryId>) -> Self {
        Self {
            category_id: scope,
            role: Some(role),
        }
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        self.category_id
            .is_none_or(|category| asset.category_id == Some(category))
            && self.role.is_none_or(|role| asset.roles.get(role))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    /// Overrides the thumbnail role holder when set.
    pub thumbnail_url: Option<String>,
    pub visible_on_hub: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_true")]
    pub visible_on_hub: bool,
}

fn default_true() -> bool {
    true
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_on_hub: Option<bool>,
}

impl CategoryPatch {
    pub fn apply(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.clone();
            category.slug = slugify(name);
        }
        if let Some(url) = &self.thumbnail_url {
            category.thumbnail_url = (!url.is_empty()).then(|| url.clone());
        }
        if let Some(visible) = self.visible_on_hub {
            category.visible_on_hub = visible;
        }
    }
}

/// URL-safe identifier for a category name: `" Street  Portraits "` → `street-portraits`.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub scopes: Vec<String>,
}
