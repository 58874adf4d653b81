use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Kinds of dataset asset found in a session directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Midi,
    Wav,
}

impl AssetKind {
    /// Classify a path by its (case-insensitive) extension.
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            "mid" | "midi" => Some(Self::Midi),
            "wav" => Some(Self::Wav),
            _ => None,
        }
    }
}

/// Files of `kind` directly inside `dir`, sorted by file name.
///
/// A missing directory yields an empty list; sub-directories are not
/// descended into.
pub fn scan(dir: &Path, kind: AssetKind) -> Vec<PathBuf> {
    if !dir.is_dir() {
        log::debug!("Asset directory {} does not exist", dir.display());
        return Vec::new();
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| AssetKind::of(path) == Some(kind))
        .collect();

    log::debug!(
        "Found {} {:?} file(s) in {}",
        files.len(),
        kind,
        dir.display()
    );
    files
}

/// The file name of `path` as a string key.
pub fn file_key(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_asset_kind() {
        assert_eq!(AssetKind::of(Path::new("a/cover.PNG")), Some(AssetKind::Image));
        assert_eq!(AssetKind::of(Path::new("cover.jpeg")), Some(AssetKind::Image));
        assert_eq!(AssetKind::of(Path::new("song.mid")), Some(AssetKind::Midi));
        assert_eq!(AssetKind::of(Path::new("song.midi")), Some(AssetKind::Midi));
        assert_eq!(AssetKind::of(Path::new("take.wav")), Some(AssetKind::Wav));
        assert_eq!(AssetKind::of(Path::new("notes.txt")), None);
        assert_eq!(AssetKind::of(Path::new("README")), None);
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("b.mid"), b"").unwrap();
        fs::write(dir.join("a.mid"), b"").unwrap();
        fs::write(dir.join("c.png"), b"").unwrap();
        fs::create_dir(dir.join("nested")).unwrap();
        fs::write(dir.join("nested").join("d.mid"), b"").unwrap();

        let found: Vec<String> = scan(dir, AssetKind::Midi)
            .iter()
            .map(|p| file_key(p))
            .collect();
        assert_eq!(found, vec!["a.mid", "b.mid"]);
        assert_eq!(scan(dir, AssetKind::Image).len(), 1);
        assert!(scan(dir, AssetKind::Wav).is_empty());
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(scan(&temp_dir.path().join("absent"), AssetKind::Image).is_empty());
    }
}
