use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::key::{BackgroundKey, KeyNormalizer};
use crate::listing::{AssetKind, AssetListing};

/// A static background image the sink can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub name: String,
    pub path: PathBuf,
    pub dimensions: Option<(u32, u32)>,
}

impl ImageHandle {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            dimensions: None,
        }
    }
}

/// How a static image was matched to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    CaseInsensitive,
    SheetIndex,
    Substring,
}

/// Lookup from background keys to static images, plus the set of keys
/// known to have a video variant.
///
/// Both halves only grow during a session: resolved keys are memoized and
/// video registrations are never revoked. Registering a new image forgets
/// every memoized answer that was not an exact match.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    prefix: String,
    /// Listed static images by their listed name (case preserved).
    statics: BTreeMap<String, ImageHandle>,
    /// Key -> listed name and match tier, filled on first successful resolution.
    resolved: HashMap<BackgroundKey, (String, MatchTier)>,
    videos: HashSet<BackgroundKey>,
    video_paths: HashMap<BackgroundKey, PathBuf>,
    video_dir: Option<PathBuf>,
    video_extension: String,
}

impl AssetCatalog {
    pub fn new(normalizer: &KeyNormalizer) -> Self {
        Self {
            prefix: normalizer.prefix().to_string(),
            video_extension: "mp4".into(),
            ..Self::default()
        }
    }

    /// Build the catalog once from the asset listing.
    pub fn from_listing(listing: &dyn AssetListing, normalizer: &KeyNormalizer) -> Result<Self> {
        let entries = listing.list().context("Failed to list background assets")?;
        let mut catalog = Self::new(normalizer);
        for entry in entries {
            match entry.kind {
                AssetKind::Image => {
                    let mut handle = ImageHandle::new(&entry.name, entry.path);
                    handle.dimensions = entry.dimensions;
                    catalog.register_static(handle);
                }
                AssetKind::Video => match normalizer.normalize(&entry.name) {
                    Ok(key) => catalog.register_discovered_video(key, entry.path),
                    Err(e) => log::warn!("Skipping video asset '{}': {e}", entry.name),
                },
            }
        }
        log::info!(
            "Background catalog: {} images, {} videos",
            catalog.statics.len(),
            catalog.videos.len()
        );
        Ok(catalog)
    }

    /// Where speculative prepares look for `<key>.<ext>` when no video was listed.
    pub fn with_video_dir(mut self, dir: impl Into<PathBuf>, extension: &str) -> Self {
        self.video_dir = Some(dir.into());
        self.video_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn register_static(&mut self, handle: ImageHandle) {
        self.statics.insert(handle.name.clone(), handle);
        self.resolved.retain(|_, (_, tier)| *tier == MatchTier::Exact);
    }

    pub fn register_discovered_video(&mut self, key: BackgroundKey, path: PathBuf) {
        self.video_paths.insert(key.clone(), path);
        self.videos.insert(key);
    }

    pub fn has_known_video(&self, key: &BackgroundKey) -> bool {
        self.videos.contains(key)
    }

    /// Record that a video prepared successfully. Idempotent and permanent.
    pub fn register_video_success(&mut self, key: &BackgroundKey) {
        if self.videos.insert(key.clone()) {
            log::info!("Registered video background '{key}'");
        }
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    pub fn video_count(&self) -> usize {
        self.videos.len()
    }

    /// Location handed to the video backend for `key`.
    pub fn video_url(&self, key: &BackgroundKey) -> String {
        if let Some(path) = self.video_paths.get(key) {
            return path.display().to_string();
        }
        let bare = self.bare(key);
        match &self.video_dir {
            Some(dir) => dir
                .join(format!("{bare}.{}", self.video_extension))
                .display()
                .to_string(),
            None => bare.to_string(),
        }
    }

    /// Resolve a static image for `key`, memoizing the result.
    pub fn resolve_static(&mut self, key: &BackgroundKey) -> Option<ImageHandle> {
        if let Some((name, _)) = self.resolved.get(key) {
            return self.statics.get(name).cloned();
        }
        let (name, tier) = self.find_static(key)?;
        if tier == MatchTier::Substring {
            log::warn!("Low-confidence background match: '{key}' -> '{name}'");
        } else if tier != MatchTier::Exact {
            log::debug!("Background '{key}' matched '{name}' ({tier:?})");
        }
        let handle = self.statics.get(&name).cloned();
        self.resolved.insert(key.clone(), (name, tier));
        handle
    }

    /// Ordered fallback search. Exact beats case-insensitive beats
    /// sheet-index beats substring.
    pub fn find_static(&self, key: &BackgroundKey) -> Option<(String, MatchTier)> {
        let wanted = self.candidates(key);

        for w in &wanted {
            if self.statics.contains_key(*w) {
                return Some(((*w).to_string(), MatchTier::Exact));
            }
        }

        for name in self.statics.keys() {
            let lower = name.to_lowercase();
            if wanted.iter().any(|w| *w == lower) {
                return Some((name.clone(), MatchTier::CaseInsensitive));
            }
        }

        for name in self.statics.keys() {
            let stem = strip_sheet_index(&name.to_lowercase()).to_string();
            if wanted.iter().any(|w| strip_sheet_index(w) == stem) {
                return Some((name.clone(), MatchTier::SheetIndex));
            }
        }

        let mut best: Option<(usize, &String)> = None;
        for name in self.statics.keys() {
            let lower = name.to_lowercase();
            if lower.is_empty() {
                continue;
            }
            for w in &wanted {
                if lower.contains(*w) || w.contains(lower.as_str()) {
                    let diff = lower.len().abs_diff(w.len());
                    if best.is_none_or(|(d, _)| diff < d) {
                        best = Some((diff, name));
                    }
                }
            }
        }
        best.map(|(_, name)| (name.clone(), MatchTier::Substring))
    }

    /// The key itself, then the key without the namespace prefix.
    fn candidates<'a>(&self, key: &'a BackgroundKey) -> Vec<&'a str> {
        let full = key.as_str();
        let bare = self.bare(key);
        if bare != full && !bare.is_empty() {
            vec![full, bare]
        } else {
            vec![full]
        }
    }

    fn bare<'a>(&self, key: &'a BackgroundKey) -> &'a str {
        if self.prefix.is_empty() {
            return key.as_str();
        }
        key.as_str()
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(key.as_str())
    }
}

/// Drop a trailing sheet index such as `_0`, `-12` or ` 3`.
fn strip_sheet_index(name: &str) -> &str {
    let digits_start = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits_start == name.len() || digits_start == 0 {
        return name;
    }
    let head = &name[..digits_start];
    match head.strip_suffix(['_', '-', ' ']) {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}
