//! Asset directory handling.
//!
//! - [`AssetIndex`] holds the text of every stylesheet pages may reference
//! - [`copy_assets`] mirrors the directory into the output

use crate::{compiler::BuildError, log};
use rayon::prelude::*;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

/// Absolute path → file content, for asset files matching the style filters.
#[derive(Debug, Default)]
pub struct AssetIndex {
    files: FxHashMap<PathBuf, String>,
}

impl AssetIndex {
    /// Read every file under `dir` whose path matches one of `filters`.
    ///
    /// A missing directory gives an empty index.
    pub fn load(dir: &Path, filters: &[Regex]) -> Result<Self, BuildError> {
        let paths: Vec<PathBuf> = files_under(dir)
            .into_iter()
            .filter(|path| {
                let text = path.to_string_lossy();
                filters.iter().any(|re| re.is_match(&text))
            })
            .collect();

        let files = paths
            .par_iter()
            .map(|path| {
                fs::read_to_string(path)
                    .map(|content| (clean_path(path), content))
                    .map_err(|err| BuildError::io(path, err))
            })
            .collect::<Result<FxHashMap<_, _>, _>>()?;

        let index = Self { files };
        if !index.is_empty() {
            log!("assets"; "indexed {} stylesheets", index.len());
        }
        Ok(index)
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(&clean_path(path)).map(String::as_str)
    }

    /// Look up a style reference, which is relative to the project root.
    /// A leading `/` is accepted.
    pub fn resolve(&self, root: &Path, style: &str) -> Option<&str> {
        self.get(&root.join(style.trim_start_matches('/')))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Copy every file under `assets` to the same relative path under `output`.
///
/// Returns the number of files copied.
pub fn copy_assets(assets: &Path, output: &Path) -> Result<usize, BuildError> {
    let files = files_under(assets);

    files.par_iter().try_for_each(|source| {
        let relative = source.strip_prefix(assets).unwrap_or(source);
        let dest = output.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|err| BuildError::io(parent, err))?;
        }
        fs::copy(source, &dest).map_err(|err| BuildError::io(source, err))?;
        Ok::<_, BuildError>(())
    })?;

    Ok(files.len())
}

/// Regular files under `dir`, sorted. A missing directory yields nothing.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Resolve `.` and `..` without touching the filesystem.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for part in path.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn css_only() -> Vec<Regex> {
        vec![Regex::new(r"\.css$").unwrap()]
    }

    #[test]
    fn test_load_filters_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        fs::create_dir_all(assets.join("theme")).unwrap();
        fs::write(assets.join("site.css"), "body{}").unwrap();
        fs::write(assets.join("theme/dark.css"), ".dark{}").unwrap();
        fs::write(assets.join("logo.svg"), "<svg/>").unwrap();

        let index = AssetIndex::load(&assets, &css_only()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve(dir.path(), "assets/site.css"), Some("body{}"));
        assert_eq!(index.resolve(dir.path(), "/assets/theme/dark.css"), Some(".dark{}"));
        assert_eq!(index.resolve(dir.path(), "./assets/theme/../site.css"), Some("body{}"));
        assert!(index.resolve(dir.path(), "assets/logo.svg").is_none());
    }

    #[test]
    fn test_load_missing_dir() {
        let index = AssetIndex::load(Path::new("/definitely/not/here"), &css_only()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_no_filters_indexes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.css"), "").unwrap();
        assert!(AssetIndex::load(dir.path(), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_copy_assets_mirrors_tree() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        let output = dir.path().join("dist");
        fs::create_dir_all(assets.join("img")).unwrap();
        fs::write(assets.join("site.css"), "body{}").unwrap();
        fs::write(assets.join("img/logo.svg"), "<svg/>").unwrap();

        assert_eq!(copy_assets(&assets, &output).unwrap(), 2);
        assert_eq!(fs::read_to_string(output.join("site.css")).unwrap(), "body{}");
        assert!(output.join("img/logo.svg").is_file());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("../x")), PathBuf::from("../x"));
    }
}
