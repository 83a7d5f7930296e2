//! On-disk patch storage.
//!
//! A project keeps its patches under `.patchiman/`, split into three
//! categories. A patch lives in exactly one category; moving it is a rename.
//! The storage root itself holds symlinks to the committed patches.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage directory name inside a project.
pub const STORAGE_ROOT: &str = ".patchiman";

const PATCH_EXTENSION: &str = "patch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageCategory {
    Original,
    Postponed,
    Committed,
}

impl StorageCategory {
    pub const ALL: [StorageCategory; 3] = [
        StorageCategory::Committed,
        StorageCategory::Postponed,
        StorageCategory::Original,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            StorageCategory::Original => "original",
            StorageCategory::Postponed => "postponed",
            StorageCategory::Committed => "committed",
        }
    }

    /// Which category currently holds `patch_name`, if any.
    pub fn locate(project: &Path, patch_name: &str) -> Option<StorageCategory> {
        Self::ALL
            .into_iter()
            .find(|category| category_path(project, *category).join(patch_name).is_file())
    }
}

impl fmt::Display for StorageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{0} doesn't have an initialized storage")]
    NotInitialized(PathBuf),

    #[error("patch {name} not found in storage")]
    PatchNotFound { name: String },

    #[error("patch {name} is already postponed")]
    AlreadyPostponed { name: String },

    #[error("invalid patch name `{0}`")]
    InvalidName(String),

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> StorageError + 'a {
    move |source| StorageError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

pub fn storage_path(project: &Path) -> PathBuf {
    project.join(STORAGE_ROOT)
}

pub fn category_path(project: &Path, category: StorageCategory) -> PathBuf {
    storage_path(project).join(category.dir_name())
}

fn is_patch(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(PATCH_EXTENSION)
}

/// (Re)create an empty storage, discarding any existing one.
pub fn init(project: &Path) -> Result<(), StorageError> {
    let root = storage_path(project);
    match fs::remove_dir_all(&root) {
        Ok(()) => tracing::info!(path = %root.display(), "removed previous storage"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error("remove", &root)(e)),
    }
    for category in StorageCategory::ALL {
        let path = category_path(project, category);
        fs::create_dir_all(&path).map_err(io_error("create", &path))?;
        tracing::debug!(category = %category, "initialized");
    }
    Ok(())
}

/// Whether every category directory exists.
pub fn is_valid(project: &Path) -> bool {
    StorageCategory::ALL
        .into_iter()
        .all(|category| category_path(project, category).is_dir())
}

/// Move `patch_name` from `original` or `committed` into `postponed`.
pub fn postpone(project: &Path, patch_name: &str) -> Result<PathBuf, StorageError> {
    ensure_valid(project)?;
    validate_name(patch_name)?;

    let from = match StorageCategory::locate(project, patch_name) {
        Some(StorageCategory::Postponed) => {
            return Err(StorageError::AlreadyPostponed {
                name: patch_name.to_string(),
            })
        }
        Some(category) => category,
        None => {
            return Err(StorageError::PatchNotFound {
                name: patch_name.to_string(),
            })
        }
    };

    let src = category_path(project, from).join(patch_name);
    let dst = category_path(project, StorageCategory::Postponed).join(patch_name);
    fs::rename(&src, &dst).map_err(io_error("move", &src))?;
    tracing::info!(patch = patch_name, from = %from, "postponed");

    if from == StorageCategory::Committed {
        relink(project)?;
    }
    Ok(dst)
}

/// Replace the `*.patch` links at the storage root with one link per
/// committed patch. Returns the number of links created.
pub fn relink(project: &Path) -> Result<usize, StorageError> {
    ensure_valid(project)?;
    let root = storage_path(project);

    for entry in fs::read_dir(&root).map_err(io_error("read", &root))? {
        let entry = entry.map_err(io_error("read", &root))?;
        let path = entry.path();
        if !is_patch(&path) {
            continue;
        }
        let file_type = entry.file_type().map_err(io_error("inspect", &path))?;
        if file_type.is_dir() {
            continue;
        }
        fs::remove_file(&path).map_err(io_error("delete", &path))?;
        tracing::debug!(path = %path.display(), "unlinked");
    }

    let committed = category_path(project, StorageCategory::Committed);
    let mut patches = Vec::new();
    for entry in fs::read_dir(&committed).map_err(io_error("read", &committed))? {
        let path = entry.map_err(io_error("read", &committed))?.path();
        if is_patch(&path) && path.is_file() {
            patches.push(path);
        }
    }
    patches.sort();

    for patch in &patches {
        let Some(name) = patch.file_name() else {
            continue;
        };
        let link = root.join(name);
        let relative = Path::new(StorageCategory::Committed.dir_name()).join(name);
        link_patch(&relative, &link).map_err(io_error("link", &link))?;
        tracing::debug!(link = %link.display(), "linked");
    }
    Ok(patches.len())
}

#[cfg(unix)]
fn link_patch(points_to: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(points_to, link)
}

#[cfg(windows)]
fn link_patch(points_to: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(points_to, link)
}

fn ensure_valid(project: &Path) -> Result<(), StorageError> {
    if is_valid(project) {
        Ok(())
    } else {
        Err(StorageError::NotInitialized(project.to_path_buf()))
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let path = Path::new(name);
    let plain = path.components().count() == 1 && path.file_name().is_some();
    if name.is_empty() || !plain {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
