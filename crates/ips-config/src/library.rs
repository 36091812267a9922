//! Library folder scanning
//!
//! A library folder holds `library.json` and one sub-folder per module with
//! its `module.json`. Support folders are skipped.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::manifest::{LibraryManifest, ModuleManifest};

/// Sub-folders of a library that never contain modules
pub const SKIPPED_FOLDERS: [&str; 5] = ["libs", "docs", "imgs", "tests", "actions"];

/// A loaded library folder
#[derive(Debug, Clone)]
pub struct LibraryFolder {
    pub path: PathBuf,
    pub manifest: LibraryManifest,
    pub modules: Vec<ModuleFolder>,
}

/// A loaded module folder
#[derive(Debug, Clone)]
pub struct ModuleFolder {
    pub path: PathBuf,
    pub manifest: ModuleManifest,
}

/// Load `library.json` and every module folder below `dir`
pub fn load_library(dir: impl AsRef<Path>) -> ConfigResult<LibraryFolder> {
    let dir = dir.as_ref();
    let manifest: LibraryManifest = read_json(&dir.join("library.json"))?;

    let mut modules = Vec::new();
    for folder in module_folders(dir)? {
        let manifest = load_module(&folder)?;
        modules.push(ModuleFolder {
            path: folder,
            manifest,
        });
    }

    info!(
        "Loaded library '{}' ({}) with {} modules",
        manifest.name,
        manifest.id,
        modules.len()
    );

    Ok(LibraryFolder {
        path: dir.to_path_buf(),
        manifest,
        modules,
    })
}

/// Load the `module.json` of a single module folder
pub fn load_module(dir: impl AsRef<Path>) -> ConfigResult<ModuleManifest> {
    let manifest: ModuleManifest = read_json(&dir.as_ref().join("module.json"))?;
    debug!("Loaded module '{}' ({})", manifest.name, manifest.id);
    Ok(manifest)
}

/// Module candidate folders below a library, sorted by name
pub(crate) fn module_folders(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::ReadFile {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut folders: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            !name.starts_with('.') && !SKIPPED_FOLDERS.contains(&name)
        })
        .collect();
    folders.sort();
    Ok(folders)
}

/// Read and deserialize a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    if !path.exists() {
        return Err(ConfigError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::ParseJson {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LIBRARY_JSON: &str = r#"{
        "id": "{11111111-2222-3333-4444-555555555555}",
        "author": "Jane",
        "name": "Demo",
        "url": "https://example.org",
        "version": "1.0",
        "build": 1,
        "date": 0
    }"#;

    fn write_module(root: &Path, folder: &str, name: &str, id: &str) {
        let dir = root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("module.json"),
            format!(
                r#"{{"id": "{}", "name": "{}", "type": 3, "vendor": "", "aliases": [],
                    "url": "https://example.org", "parentRequirements": [],
                    "childRequirements": [], "implemented": [], "prefix": "DEMO"}}"#,
                id, name
            ),
        )
        .unwrap();
    }

    fn make_test_library() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("library.json"), LIBRARY_JSON).unwrap();
        write_module(dir.path(), "Beta", "Beta", "{BBBBBBBB-0000-0000-0000-000000000000}");
        write_module(dir.path(), "Alpha", "Alpha", "{AAAAAAAA-0000-0000-0000-000000000000}");
        for skipped in SKIPPED_FOLDERS {
            fs::create_dir_all(dir.path().join(skipped)).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_library_skips_support_folders() {
        let dir = make_test_library();
        let library = load_library(dir.path()).unwrap();
        assert_eq!(library.manifest.name, "Demo");
        let names: Vec<_> = library
            .modules
            .iter()
            .map(|m| m.manifest.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_missing_library_json() {
        let dir = TempDir::new().unwrap();
        let err = load_library(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_module_folder_without_manifest_fails() {
        let dir = make_test_library();
        fs::create_dir_all(dir.path().join("Broken")).unwrap();
        let err = load_library(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("module.json"), "{ not json").unwrap();
        let err = load_module(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
