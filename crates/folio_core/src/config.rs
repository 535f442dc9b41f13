use crate::error::ConfigError;
use crate::size::Breakpoints;
use std::time::Duration;

/// Process-wide settings, read once at startup and passed to whatever needs them.
#[derive(Clone, Debug)]
pub struct FolioConfig {
    /// Backend project URL, e.g. `https://xyz.supabase.co`.
    pub project_url: String,
    /// Public key for read-only access.
    pub anon_key: String,
    /// Privileged key for admin-only operations.
    pub service_role_key: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Signs admin session tokens. The server falls back to its own default when unset.
    pub jwt_secret: Option<String>,
    pub thumbnail_service_url: Option<String>,
    pub video_service_url: Option<String>,
    /// Base for public object URLs; `{storage_public_url}/{bucket}/{key}`.
    ///
    /// Defaults to `{project_url}/storage/v1/object/public`.
    pub storage_public_url: String,
    /// Defaults to `photos-original`.
    pub originals_bucket: String,
    /// Defaults to `photos-derived`.
    pub derived_bucket: String,
    /// Defaults to `/photoAssets/home-hero.avif`.
    pub placeholder: String,
    pub breakpoints: Breakpoints,
    /// Applied to every outbound HTTP call. Defaults to 10 seconds.
    pub http_timeout: Duration,
}

pub const DEFAULT_ORIGINALS_BUCKET: &str = "photos-original";
pub const DEFAULT_DERIVED_BUCKET: &str = "photos-derived";
pub const DEFAULT_PLACEHOLDER: &str = "/photoAssets/home-hero.avif";

impl FolioConfig {
    pub fn new(project_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let project_url = project_url.into().trim_end_matches('/').to_string();
        Self {
            storage_public_url: format!("{project_url}/storage/v1/object/public"),
            project_url,
            anon_key: anon_key.into(),
            service_role_key: None,
            admin_email: None,
            admin_password: None,
            jwt_secret: None,
            thumbnail_service_url: None,
            video_service_url: None,
            originals_bucket: DEFAULT_ORIGINALS_BUCKET.to_string(),
            derived_bucket: DEFAULT_DERIVED_BUCKET.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            breakpoints: Breakpoints::default(),
            http_timeout: Duration::from_secs(10),
        }
    }

    /// Reads `FOLIO_*` variables. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mut config = Self::new(
            required("FOLIO_PROJECT_URL")?,
            required("FOLIO_ANON_KEY")?,
        );
        config.service_role_key = get("FOLIO_SERVICE_ROLE_KEY");
        config.admin_email = get("FOLIO_ADMIN_EMAIL");
        config.admin_password = get("FOLIO_ADMIN_PASSWORD");
        config.jwt_secret = get("FOLIO_JWT_SECRET");
        config.thumbnail_service_url = get("FOLIO_THUMBNAIL_SERVICE_URL");
        config.video_service_url = get("FOLIO_VIDEO_SERVICE_URL");

        if let Some(url) = get("FOLIO_STORAGE_PUBLIC_URL") {
            config.storage_public_url = url.trim_end_matches('/').to_string();
        }
        if let Some(bucket) = get("FOLIO_ORIGINALS_BUCKET") {
            config.originals_bucket = bucket;
        }
        if let Some(bucket) = get("FOLIO_DERIVED_BUCKET") {
            config.derived_bucket = bucket;
        }
        if let Some(placeholder) = get("FOLIO_PLACEHOLDER") {
            config.placeholder = placeholder;
        }

        let number = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            get(key)
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                        key,
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };
        let pixels = |key: &'static str| -> Result<Option<u32>, ConfigError> {
            number(key)?
                .map(|v| {
                    u32::try_from(v).map_err(|e| ConfigError::Invalid {
                        key,
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        if let Some(medium) = pixels("FOLIO_BREAKPOINT_MEDIUM")? {
            config.breakpoints.medium = medium;
        }
        if let Some(large) = pixels("FOLIO_BREAKPOINT_LARGE")? {
            config.breakpoints.large = large;
        }
        if let Some(hero) = pixels("FOLIO_BREAKPOINT_HERO_LARGE")? {
            config.breakpoints.hero_large = hero;
        }
        if config.breakpoints.medium > config.breakpoints.large {
            return Err(ConfigError::Invalid {
                key: "FOLIO_BREAKPOINT_MEDIUM",
                reason: "must not exceed FOLIO_BREAKPOINT_LARGE".into(),
            });
        }
        if let Some(secs) = number("FOLIO_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// PostgREST endpoint of the record store.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.project_url)
    }

    pub fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/{bucket}", self.storage_public_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_in_optional_values() {
        let config = FolioConfig::from_lookup(lookup(&[
            ("FOLIO_PROJECT_URL", "https://xyz.supabase.co/"),
            ("FOLIO_ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.project_url, "https://xyz.supabase.co");
        assert_eq!(config.rest_url(), "https://xyz.supabase.co/rest/v1");
        assert_eq!(
            config.bucket_url(&config.derived_bucket),
            "https://xyz.supabase.co/storage/v1/object/public/photos-derived"
        );
        assert_eq!(config.placeholder, DEFAULT_PLACEHOLDER);
        assert_eq!(config.breakpoints, Breakpoints::default());
        assert!(config.service_role_key.is_none());
    }

    #[test]
    fn missing_required_values_are_reported() {
        let err = FolioConfig::from_lookup(lookup(&[("FOLIO_ANON_KEY", "anon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("FOLIO_PROJECT_URL")));
    }

    #[test]
    fn breakpoints_are_validated() {
        let err = FolioConfig::from_lookup(lookup(&[
            ("FOLIO_PROJECT_URL", "https://p"),
            ("FOLIO_ANON_KEY", "anon"),
            ("FOLIO_BREAKPOINT_MEDIUM", "2000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = FolioConfig::from_lookup(lookup(&[
            ("FOLIO_PROJECT_URL", "https://p"),
            ("FOLIO_ANON_KEY", "anon"),
            ("FOLIO_BREAKPOINT_LARGE", "wide"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "FOLIO_BREAKPOINT_LARGE",
                ..
            }
        ));
    }
}
