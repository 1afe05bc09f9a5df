pub mod keybinds;
pub mod relocate;

pub use keybinds::KeyBindMap;
pub use relocate::move_file;

use crate::error::ScanError;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Extensions accepted by the directory scan (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

pub fn is_image_extension(ext: &str) -> bool {
    let ext = ext.to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// A file found by [`list_images`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImage {
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// One image of the set. `folder` is relative to the set root; empty means the root itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub name: String,
    pub folder: String,
    pub modified: DateTime<Utc>,
}

impl ImageEntry {
    pub fn relative_path(&self) -> PathBuf {
        if self.folder.is_empty() {
            PathBuf::from(&self.name)
        } else {
            Path::new(&self.folder).join(&self.name)
        }
    }
}

/// Ordered images of one folder selection.
///
/// The length and order never change after construction; indices are the identity used by
/// the cache and the cursor. Only the per-entry folder is mutable.
#[derive(Debug)]
pub struct ImageSet {
    root: PathBuf,
    entries: RwLock<Vec<ImageEntry>>,
}

impl ImageSet {
    pub fn new(root: impl Into<PathBuf>, scanned: Vec<ScannedImage>) -> Self {
        let entries = scanned
            .into_iter()
            .map(|s| ImageEntry {
                name: s.name,
                folder: String::new(),
                modified: s.modified,
            })
            .collect();

        Self {
            root: root.into(),
            entries: RwLock::new(entries),
        }
    }

    /// Scans `dir` and builds the set in one step
    pub fn scan(dir: &Path) -> Result<Self, ScanError> {
        let scanned = list_images(dir)?;
        Ok(Self::new(dir, scanned))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, index: usize) -> Option<ImageEntry> {
        self.read().get(index).cloned()
    }

    /// Absolute location of the image, following any move already applied to it
    pub fn path_of(&self, index: usize) -> Option<PathBuf> {
        self.read()
            .get(index)
            .map(|e| self.root.join(e.relative_path()))
    }

    /// Records that the image now lives in `folder`. Returns false for an unknown index.
    pub fn set_folder(&self, index: usize, folder: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(index) {
            Some(entry) => {
                entry.folder = folder.to_string();
                true
            }
            None => false,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<ImageEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lists the images directly inside `dir`, oldest first.
///
/// # Behavior
/// - Only regular files with a supported image extension are returned
/// - Hidden files (names starting with '.') are skipped
/// - Does not recurse into subdirectories
/// - Entries that cannot be inspected are skipped rather than failing the scan
/// - The sort is stable, so files sharing a timestamp keep directory order
pub fn list_images(dir: &Path) -> Result<Vec<ScannedImage>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| ScanError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut images = Vec::new();

    for entry_result in entries {
        let entry = match entry_result {
            Ok(e) => e,
            Err(_) => continue,
        };

        let path = entry.path();

        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        if name.starts_with('.') {
            continue;
        }

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !is_image_extension(extension) {
            continue;
        }

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(_) => continue,
        };

        if !metadata.is_file() {
            continue;
        }

        let modified: DateTime<Utc> = match metadata.modified() {
            Ok(m) => m.into(),
            Err(_) => continue,
        };

        images.push(ScannedImage { name, modified });
    }

    images.sort_by(|a, b| a.modified.cmp(&b.modified));

    Ok(images)
}


#[cfg(test)]
mod tests {
    use super::*;

    mod extension_tests {
        use super::*;

        #[test]
        fn test_supported_extensions() {
            assert!(is_image_extension("png"));
            assert!(is_image_extension("jpg"));
            assert!(is_image_extension("jpeg"));
            assert!(is_image_extension("webp"));
        }

        #[test]
        fn test_extension_case_insensitive() {
            assert!(is_image_extension("PNG"));
            assert!(is_image_extension("Jpg"));
        }

        #[test]
        fn test_unsupported_extensions() {
            assert!(!is_image_extension("txt"));
            assert!(!is_image_extension("pdf"));
            assert!(!is_image_extension(""));
        }
    }

    mod scan_tests {
        use super::test_support::write_with_mtime;
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn test_list_images_sorted_by_modification_time() {
            let temp_dir = TempDir::new().unwrap();
            let dir = temp_dir.path();

            write_with_mtime(dir, "c.png", b"c", 30);
            write_with_mtime(dir, "a.png", b"a", 10);
            write_with_mtime(dir, "b.jpg", b"b", 20);

            let images = list_images(dir).unwrap();
            let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, vec!["a.png", "b.jpg", "c.png"]);
        }

        #[test]
        fn test_list_images_filters_non_images_and_hidden() {
            let temp_dir = TempDir::new().unwrap();
            let dir = temp_dir.path();

            write_with_mtime(dir, "photo.png", b"x", 1);
            write_with_mtime(dir, "notes.txt", b"x", 2);
            write_with_mtime(dir, ".hidden.png", b"x", 3);
            fs::create_dir(dir.join("nested.png")).unwrap();

            let images = list_images(dir).unwrap();
            assert_eq!(images.len(), 1);
            assert_eq!(images[0].name, "photo.png");
        }

        #[test]
        fn test_list_images_does_not_recurse() {
            let temp_dir = TempDir::new().unwrap();
            let dir = temp_dir.path();

            fs::create_dir(dir.join("Keep")).unwrap();
            write_with_mtime(&dir.join("Keep"), "inner.png", b"x", 1);
            write_with_mtime(dir, "outer.png", b"x", 2);

            let images = list_images(dir).unwrap();
            assert_eq!(images.len(), 1);
            assert_eq!(images[0].name, "outer.png");
        }

        #[test]
        fn test_list_images_empty_directory() {
            let temp_dir = TempDir::new().unwrap();
            assert!(list_images(temp_dir.path()).unwrap().is_empty());
        }

        #[test]
        fn test_list_images_not_a_directory() {
            let temp_dir = TempDir::new().unwrap();
            write_with_mtime(temp_dir.path(), "a.png", b"a", 1);

            let result = list_images(&temp_dir.path().join("a.png"));
            assert!(matches!(result, Err(ScanError::NotADirectory(_))));

            let result = list_images(&temp_dir.path().join("missing"));
            assert!(matches!(result, Err(ScanError::NotADirectory(_))));
        }
    }

    mod image_set_tests {
        use super::*;

        fn scanned(name: &str) -> ScannedImage {
            ScannedImage {
                name: name.to_string(),
                modified: Utc::now(),
            }
        }

        #[test]
        fn test_image_set_starts_in_root() {
            let set = ImageSet::new("/photos", vec![scanned("a.png"), scanned("b.jpg")]);

            assert_eq!(set.len(), 2);
            assert_eq!(set.entry(0).unwrap().folder, "");
            assert_eq!(set.path_of(1).unwrap(), PathBuf::from("/photos/b.jpg"));
            assert!(set.entry(2).is_none());
        }

        #[test]
        fn test_set_folder_changes_path_only() {
            let set = ImageSet::new("/photos", vec![scanned("a.png"), scanned("b.jpg")]);

            assert!(set.set_folder(1, "Keep"));
            assert_eq!(set.path_of(1).unwrap(), PathBuf::from("/photos/Keep/b.jpg"));
            assert_eq!(set.entry(1).unwrap().name, "b.jpg");
            assert_eq!(set.entry(0).unwrap().folder, "");
        }

        #[test]
        fn test_set_folder_out_of_range() {
            let set = ImageSet::new("/photos", vec![scanned("a.png")]);
            assert!(!set.set_folder(5, "Keep"));
        }
    }
}
