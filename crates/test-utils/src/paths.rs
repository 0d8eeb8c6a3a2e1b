//! Path utilities: temporary archive roots and system font lookup.

use std::path::{Path, PathBuf};

use volcano_common::AssetKey;

/// Font files tried by [`find_system_font`], in order.
pub const FONT_CANDIDATES: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
];

/// Returns the workspace root directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Locate a TrueType font, checking `TEST_FONT` first.
pub fn find_system_font() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(font) = std::env::var("TEST_FONT") {
        candidates.push(PathBuf::from(font));
    }
    candidates.extend(FONT_CANDIDATES.iter().map(PathBuf::from));
    candidates.into_iter().find(|p| p.is_file())
}

/// A throwaway archive root, removed on drop.
pub struct TempArchive {
    dir: tempfile::TempDir,
}

impl TempArchive {
    pub fn new() -> Self {
        Self {
            dir: tempfile::Builder::new()
                .prefix("volcano_archive_")
                .tempdir()
                .expect("Failed to create temporary archive root"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn site_dir(&self, site: &str) -> PathBuf {
        self.root().join(site)
    }

    /// Write `bytes` where the archive keeps `key`, bypassing the store.
    pub fn seed_asset(&self, key: &AssetKey, bytes: &[u8]) -> PathBuf {
        let path = self.root().join(key.archive_path());
        std::fs::create_dir_all(path.parent().expect("asset path has a parent"))
            .expect("Failed to create asset directory");
        std::fs::write(&path, bytes).expect("Failed to seed asset");
        path
    }

    /// Write an arbitrary file relative to the archive root.
    pub fn seed_file(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(&path, bytes).expect("Failed to seed file");
        path
    }
}

impl Default for TempArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volcano_common::BandComposite;

    #[test]
    fn test_workspace_root_is_valid() {
        let root = workspace_root();
        assert!(
            root.join("Cargo.toml").exists(),
            "Workspace root should contain Cargo.toml: {:?}",
            root
        );
    }

    #[test]
    fn test_seed_asset_uses_archive_layout() {
        let archive = TempArchive::new();
        let key = AssetKey::new(
            "Villarrica",
            chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            BandComposite::TrueColor,
        );
        let path = archive.seed_asset(&key, b"png");
        assert_eq!(path, archive.root().join("Villarrica/RGB/2025-06-01_RGB.png"));
        assert!(path.exists());
    }

    #[test]
    fn test_temp_archive_is_removed_on_drop() {
        let root = {
            let archive = TempArchive::new();
            archive.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
