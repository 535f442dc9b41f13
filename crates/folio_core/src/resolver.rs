//! Finds the best displayable URL for an original at a given size tier.
//!
//! The chain is: manifest entry → probed conventional key → original → placeholder.
//! Every step degrades to the next one, so resolution never fails.

use crate::manifest::{DerivedManifest, ImageFormat, base_name, derived_key};
use crate::model::{Asset, CategoryId, Role};
use crate::roles::RoleResolver;
use crate::size::SizeTier;
use crate::traits::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Which step of the chain produced a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UrlSource {
    Manifest { tier: SizeTier, format: ImageFormat },
    Probed { tier: SizeTier, format: ImageFormat },
    Original,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedUrl {
    pub url: String,
    pub source: UrlSource,
}

#[derive(Clone)]
pub struct DerivedPathResolver<S: StorageBackend, P: ExistenceProbe> {
    originals: S,
    derived: S,
    probe: P,
    placeholder: String,
}

impl<S: StorageBackend, P: ExistenceProbe> DerivedPathResolver<S, P> {
    pub fn new(originals: S, derived: S, probe: P, placeholder: impl Into<String>) -> Self {
        Self {
            originals,
            derived,
            probe,
            placeholder: placeholder.into(),
        }
    }

    pub fn placeholder(&self) -> ResolvedUrl {
        ResolvedUrl {
            url: self.placeholder.clone(),
            source: UrlSource::Placeholder,
        }
    }

    /// Conventional derived keys for `original_key`, in format preference order.
    pub fn derived_candidates(&self, original_key: &str, tier: SizeTier) -> Vec<Candidate> {
        ImageFormat::PREFERENCE
            .iter()
            .map(|format| {
                let key = derived_key(original_key, tier, *format);
                let url = self.derived.public_url(&key);
                Candidate { key, url }
            })
            .collect()
    }

    pub async fn resolve_asset(&self, asset: &Asset, tier: SizeTier) -> ResolvedUrl {
        self.resolve(Some(&asset.path), asset.derived.as_ref(), tier)
            .await
    }

    pub async fn resolve(
        &self,
        original_key: Option<&str>,
        manifest: Option<&DerivedManifest>,
        tier: SizeTier,
    ) -> ResolvedUrl {
        let Some(key) = original_key.filter(|key| !key.is_empty()) else {
            debug!("No original key, using placeholder");
            return self.placeholder();
        };

        match manifest.filter(|manifest| !manifest.is_empty()) {
            Some(manifest) => {
                if let Some((format, derived)) = manifest.preferred(tier) {
                    debug!(key, %tier, %format, "Resolved from manifest");
                    return ResolvedUrl {
                        url: self.derived.public_url(derived),
                        source: UrlSource::Manifest { tier, format },
                    };
                }
                debug!(key, %tier, "Manifest has no variant for tier");
            }
            None => {
                if let Some(resolved) = self.probe_candidates(key, tier).await {
                    return resolved;
                }
            }
        }

        debug!(key, %tier, "Falling back to original");
        ResolvedUrl {
            url: self.originals.public_url(key),
            source: UrlSource::Original,
        }
    }

    async fn probe_candidates(&self, key: &str, tier: SizeTier) -> Option<ResolvedUrl> {
        let base = base_name(key);
        for (format, candidate) in ImageFormat::PREFERENCE
            .into_iter()
            .zip(self.derived_candidates(key, tier))
        {
            match self.probe.probe(&candidate).await {
                Ok(true) => {
                    debug!(base, %tier, %format, "Derived variant confirmed");
                    return Some(ResolvedUrl {
                        url: candidate.url,
                        source: UrlSource::Probed { tier, format },
                    });
                }
                Ok(false) => {}
                Err(e) => warn!("Probe for {} failed: {e}", candidate.key),
            }
        }
        None
    }

    /// Resolves whichever asset currently holds `role`. Lookup failures yield the placeholder.
    pub async fn resolve_role<R: RecordStore>(
        &self,
        roles: &RoleResolver<R>,
        role: Role,
        scope: Option<CategoryId>,
        tier: SizeTier,
    ) -> (Option<Asset>, ResolvedUrl) {
        match roles.get_role_holder(role, scope).await {
            Ok(Some(asset)) => {
                let url = self.resolve_asset(&asset, tier).await;
                (Some(asset), url)
            }
            Ok(None) => (None, self.placeholder()),
            Err(e) => {
                warn!("Role holder lookup for {role} failed: {e}");
                (None, self.placeholder())
            }
        }
    }
}
