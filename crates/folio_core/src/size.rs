//! Viewport width → size tier selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::watch;

/// Discrete resolution tier a derived asset is generated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

impl SizeTier {
    pub const ALL: [SizeTier; 3] = [SizeTier::Small, SizeTier::Medium, SizeTier::Large];

    /// Folder name used for this tier in the derived bucket.
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeTier::Small => "small",
            SizeTier::Medium => "medium",
            SizeTier::Large => "large",
        }
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(SizeTier::Small),
            "medium" => Ok(SizeTier::Medium),
            "large" => Ok(SizeTier::Large),
            other => Err(format!("unknown size tier '{other}'")),
        }
    }
}

/// Pixel thresholds. Each one is an inclusive lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoints {
    /// Widths at or above this are `Medium`.
    ///
    /// Default: `768`
    pub medium: u32,
    /// Widths at or above this are `Large`.
    ///
    /// Default: `1024`
    pub large: u32,
    /// Hero images switch from `Medium` to `Large` here. Heroes never drop to `Small`.
    ///
    /// Default: `1024`
    pub hero_large: u32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            medium: 768,
            large: 1024,
            hero_large: 1024,
        }
    }
}

impl Breakpoints {
    pub fn tier_for(&self, width: u32) -> SizeTier {
        if width >= self.large {
            SizeTier::Large
        } else if width >= self.medium {
            SizeTier::Medium
        } else {
            SizeTier::Small
        }
    }

    pub fn hero_tier_for(&self, width: u32) -> SizeTier {
        if width >= self.hero_large {
            SizeTier::Large
        } else {
            SizeTier::Medium
        }
    }

    pub fn select(&self, width: u32, hero: bool) -> SizeTier {
        if hero {
            self.hero_tier_for(width)
        } else {
            self.tier_for(width)
        }
    }
}

/// Tracks the tier for a stream of viewport widths.
///
/// Subscribers are only woken when the tier actually changes, so resizes inside a tier
/// never trigger another round of URL resolution.
pub struct TierWatch {
    breakpoints: Breakpoints,
    hero: bool,
    tx: watch::Sender<SizeTier>,
}

impl TierWatch {
    pub fn new(breakpoints: Breakpoints, initial_width: u32) -> Self {
        let (tx, _) = watch::channel(breakpoints.tier_for(initial_width));
        Self {
            breakpoints,
            hero: false,
            tx,
        }
    }

    pub fn hero(breakpoints: Breakpoints, initial_width: u32) -> Self {
        let (tx, _) = watch::channel(breakpoints.hero_tier_for(initial_width));
        Self {
            breakpoints,
            hero: true,
            tx,
        }
    }

    pub fn current(&self) -> SizeTier {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SizeTier> {
        self.tx.subscribe()
    }

    /// Feeds a new width. Returns the new tier if it changed.
    pub fn observe(&self, width: u32) -> Option<SizeTier> {
        let next = self.breakpoints.select(width, self.hero);
        let changed = self.tx.send_if_modified(|tier| {
            if *tier == next {
                false
            } else {
                *tier = next;
                true
            }
        });
        changed.then_some(next)
    }
}
