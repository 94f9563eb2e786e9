use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Image extensions treated as static backgrounds.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];
/// Extensions treated as looping video backgrounds.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Video,
}

/// One asset as reported by the asset pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Name as listed, without extension (e.g. `bg_office_0`).
    pub name: String,
    pub path: PathBuf,
    pub kind: AssetKind,
    pub dimensions: Option<(u32, u32)>,
}

impl AssetEntry {
    pub fn image(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            kind: AssetKind::Image,
            dimensions: None,
        }
    }

    pub fn video(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            kind: AssetKind::Video,
            dimensions: None,
        }
    }
}

/// Source of the asset list the catalog is built from at startup.
pub trait AssetListing {
    fn list(&self) -> Result<Vec<AssetEntry>>;
}

/// In-memory listing for hosts that already know their assets.
#[derive(Debug, Clone, Default)]
pub struct StaticListing {
    pub entries: Vec<AssetEntry>,
}

impl StaticListing {
    pub fn new(entries: Vec<AssetEntry>) -> Self {
        Self { entries }
    }
}

impl AssetListing for StaticListing {
    fn list(&self) -> Result<Vec<AssetEntry>> {
        Ok(self.entries.clone())
    }
}

/// Scans a media directory (non-recursive) for images and videos.
#[derive(Debug, Clone)]
pub struct DirListing {
    pub dir: PathBuf,
}

impl DirListing {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

pub fn classify(path: &Path) -> Option<AssetKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(AssetKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(AssetKind::Video)
    } else {
        None
    }
}

impl AssetListing for DirListing {
    fn list(&self) -> Result<Vec<AssetEntry>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read media directory {}", self.dir.display()))?;

        let mut assets = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(kind) = classify(&path) else {
                continue;
            };
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_string();
            if name.is_empty() {
                continue;
            }
            let dimensions = match kind {
                AssetKind::Image => match image::image_dimensions(&path) {
                    Ok(dims) => Some(dims),
                    Err(e) => {
                        log::warn!("Failed to read image header {}: {e}", path.display());
                        None
                    }
                },
                AssetKind::Video => None,
            };
            assets.push(AssetEntry {
                name,
                path,
                kind,
                dimensions,
            });
        }

        assets.sort_by(|a, b| a.name.cmp(&b.name));
        log::info!(
            "Listed {} background assets from {}",
            assets.len(),
            self.dir.display()
        );
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, w: u32, h: u32) {
        image::RgbaImage::new(w, h).save(path).unwrap();
    }

    #[test]
    fn classify_by_extension() {
        assert_eq!(classify(Path::new("a/bg_office.PNG")), Some(AssetKind::Image));
        assert_eq!(classify(Path::new("bg_office.mp4")), Some(AssetKind::Video));
        assert_eq!(classify(Path::new("notes.txt")), None);
        assert_eq!(classify(Path::new("noext")), None);
    }

    #[test]
    fn dir_listing_finds_images_and_videos() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("bg_office.png"), 4, 3);
        std::fs::write(dir.path().join("bg_rain.mp4"), b"not really a video").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"skip me").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let assets = DirListing::new(dir.path()).list().unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].name, "bg_office");
        assert_eq!(assets[0].kind, AssetKind::Image);
        assert_eq!(assets[0].dimensions, Some((4, 3)));
        assert_eq!(assets[1].name, "bg_rain");
        assert_eq!(assets[1].kind, AssetKind::Video);
        assert_eq!(assets[1].dimensions, None);
    }

    #[test]
    fn unreadable_image_header_still_listed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bg_broken.png"), b"garbage").unwrap();
        let assets = DirListing::new(dir.path()).list().unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].dimensions, None);
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = DirListing::new(&missing).list().unwrap_err();
        assert!(err.to_string().contains("Failed to read media directory"));
    }

    #[test]
    fn static_listing_returns_entries() {
        let listing = StaticListing::new(vec![AssetEntry::image("bg_park", "park.png")]);
        let assets = listing.list().unwrap();
        assert_eq!(assets, vec![AssetEntry::image("bg_park", "park.png")]);
    }
}
