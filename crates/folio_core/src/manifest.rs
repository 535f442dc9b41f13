use crate::size::SizeTier;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;
use std::fmt;
use std::str::FromStr;

/// Encoding of a derived asset. Declaration order is the preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Avif,
    Webp,
    Jpg,
}

impl ImageFormat {
    /// Formats in the order a resolver should try them.
    pub const PREFERENCE: [ImageFormat; 3] = [ImageFormat::Avif, ImageFormat::Webp, ImageFormat::Jpg];

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Avif => "avif",
            ImageFormat::Webp => "webp",
            ImageFormat::Jpg => "jpg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avif" => Ok(ImageFormat::Avif),
            "webp" => Ok(ImageFormat::Webp),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            other => Err(format!("unsupported derived format '{other}'")),
        }
    }
}

/// Where each derived variant of one original lives in the derived bucket.
///
/// Serialized as `{"medium": {"webp": "medium/x.webp"}}`.
///
/// Decoding is lenient: `jpeg` reads as `jpg`, and unknown tiers, formats or
/// non-string keys are dropped with a warning instead of failing the row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DerivedManifest {
    pub variants: BTreeMap<SizeTier, BTreeMap<ImageFormat, String>>,
}

impl<'de> Deserialize<'de> for DerivedManifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Value::deserialize(deserializer)?))
    }
}

impl DerivedManifest {
    /// Builds a manifest from whatever shape a stored row holds.
    pub fn from_value(value: Value) -> Self {
        let mut manifest = DerivedManifest::default();
        let tiers = match value {
            Value::Object(tiers) => tiers,
            Value::Null => return manifest,
            other => {
                warn!(manifest = %other, "Ignoring derived manifest that is not an object");
                return manifest;
            }
        };

        for (tier_name, formats) in tiers {
            let Ok(tier) = tier_name.parse::<SizeTier>() else {
                warn!(tier = %tier_name, "Dropping unknown tier from derived manifest");
                continue;
            };
            let Value::Object(formats) = formats else {
                warn!(tier = %tier_name, "Dropping tier whose formats are not an object");
                continue;
            };
            for (format_name, key) in formats {
                match (format_name.parse::<ImageFormat>(), key) {
                    (Ok(format), Value::String(key)) => manifest.insert(tier, format, key),
                    (_, key) => {
                        warn!(tier = %tier_name, format = %format_name, %key, "Dropping derived manifest entry")
                    }
                }
            }
        }
        manifest
    }

    pub fn is_empty(&self) -> bool {
        self.variants.values().all(|formats| formats.is_empty())
    }

    pub fn insert(&mut self, tier: SizeTier, format: ImageFormat, key: impl Into<String>) {
        self.variants
            .entry(tier)
            .or_default()
            .insert(format, key.into());
    }

    pub fn get(&self, tier: SizeTier, format: ImageFormat) -> Option<&str> {
        self.variants
            .get(&tier)
            .and_then(|formats| formats.get(&format))
            .map(String::as_str)
    }

    /// First variant for `tier` in format preference order.
    pub fn preferred(&self, tier: SizeTier) -> Option<(ImageFormat, &str)> {
        ImageFormat::PREFERENCE
            .iter()
            .find_map(|format| self.get(tier, *format).map(|key| (*format, key)))
    }

    /// Every derived key, for cleanup.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variants
            .values()
            .flat_map(|formats| formats.values().map(String::as_str))
    }
}

/// The thumbnail service's answer, normalized once at the service boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedThumbnails {
    /// `{size: {format: key}}` as returned by newer service versions.
    Structured(DerivedManifest),
    /// Plain list of derived keys as returned by older service versions.
    Flat(Vec<String>),
    Empty,
}

impl GeneratedThumbnails {
    pub fn into_manifest(self) -> DerivedManifest {
        match self {
            GeneratedThumbnails::Structured(manifest) => manifest,
            GeneratedThumbnails::Flat(keys) => {
                let mut manifest = DerivedManifest::default();
                for key in keys {
                    if let Some((tier, format)) = parse_derived_key(&key) {
                        manifest.insert(tier, format, key);
                    }
                }
                manifest
            }
            GeneratedThumbnails::Empty => DerivedManifest::default(),
        }
    }
}

/// Strips directories and the extension from a storage key: `a/b/IMG_1.jpg` → `IMG_1`.
pub fn base_name(key: &str) -> &str {
    let file = key.rsplit('/').next().unwrap_or(key);
    match file.rfind('.') {
        Some(0) | None => file,
        Some(dot) => &file[..dot],
    }
}

/// Builds the conventional derived key `{tier}/{base}.{ext}`.
pub fn derived_key(original_key: &str, tier: SizeTier, format: ImageFormat) -> String {
    format!("{tier}/{}.{}", base_name(original_key), format.extension())
}

/// Reads tier and format back out of a `{tier}/{stem}.{ext}` key.
pub fn parse_derived_key(key: &str) -> Option<(SizeTier, ImageFormat)> {
    let (folder, file) = key.split_once('/')?;
    let tier = folder.parse().ok()?;
    let (_, ext) = file.rsplit_once('.')?;
    let format = ext.parse().ok()?;
    Some((tier, format))
}
