//! Staging directories for trial patch application.
//!
//! A [`StagingPair`] holds two trees: *clean*, a pristine copy of the project,
//! and *target*, where patches are tried. Target is only ever derived from
//! clean. After any failed or indeterminate application the target is thrown
//! away and recopied with [`StagingPair::redeploy`].
//!
//! Ephemeral trees go through [`scoped`], which removes its root on every exit
//! path.

use crate::config::Staging;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("{0} not found")]
    MissingDirectory(PathBuf),

    #[error("{0} already exists, refusing to overwrite")]
    AlreadyDeployed(PathBuf),

    #[error("{dir} is inside {project}, refusing to copy a tree into itself")]
    InsideProject { dir: PathBuf, project: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl StagingError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> StagingError + '_ {
        move |source| StagingError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The clean/target directory pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPair {
    clean: PathBuf,
    target: PathBuf,
}

impl StagingPair {
    /// Deploy `source` under `root`: clean = copy(source), target = copy(clean).
    ///
    /// Fails if either directory already exists. On failure nothing created
    /// by this call is left behind.
    pub fn create(source: &Path, root: &Path, names: &Staging) -> Result<Self, StagingError> {
        let pair = Self::at(root, names);
        for dir in [&pair.clean, &pair.target] {
            if dir.exists() {
                return Err(StagingError::AlreadyDeployed(dir.clone()));
            }
            if is_inside(dir, source) {
                return Err(StagingError::InsideProject {
                    dir: dir.clone(),
                    project: source.to_path_buf(),
                });
            }
        }

        if let Err(err) = copy_tree(source, &pair.clean) {
            remove_tree(&pair.clean);
            return Err(err);
        }
        tracing::info!(from = %source.display(), to = %pair.clean.display(), "copied project");

        if let Err(err) = copy_tree(&pair.clean, &pair.target) {
            remove_tree(&pair.target);
            remove_tree(&pair.clean);
            return Err(err);
        }
        tracing::info!(from = %pair.clean.display(), to = %pair.target.display(), "replicated clean tree");

        Ok(pair)
    }

    /// Open an existing pair under `root`, failing if either tree is missing.
    pub fn open(root: &Path, names: &Staging) -> Result<Self, StagingError> {
        let pair = Self::at(root, names);
        for dir in [&pair.clean, &pair.target] {
            if !dir.is_dir() {
                return Err(StagingError::MissingDirectory(dir.clone()));
            }
            tracing::debug!(dir = %dir.display(), "exists");
        }
        Ok(pair)
    }

    /// A pair over explicit paths. Nothing is checked or created.
    pub fn from_paths(clean: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            clean: clean.into(),
            target: target.into(),
        }
    }

    fn at(root: &Path, names: &Staging) -> Self {
        Self::from_paths(root.join(&names.clean), root.join(&names.target))
    }

    pub fn clean(&self) -> &Path {
        &self.clean
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Discard the target and recopy it from clean.
    pub fn redeploy(&self) -> Result<(), StagingError> {
        redeploy(&self.clean, &self.target)
    }
}

/// target = copy(src), discarding whatever target held. A missing target is
/// fine.
pub fn redeploy(src: &Path, target: &Path) -> Result<(), StagingError> {
    if !src.is_dir() {
        return Err(StagingError::MissingDirectory(src.to_path_buf()));
    }
    match fs::remove_dir_all(target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(StagingError::io(target)(e)),
    }
    if let Err(err) = copy_tree(src, target) {
        remove_tree(target);
        return Err(err);
    }
    tracing::debug!(from = %src.display(), to = %target.display(), "redeployed");
    Ok(())
}

/// Recursively copy `src` into `dst`, creating `dst`.
///
/// File modification times are kept. Symlinks are recreated as symlinks on
/// unix and copied as their targets elsewhere.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), StagingError> {
    if !src.is_dir() {
        return Err(StagingError::MissingDirectory(src.to_path_buf()));
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).map_err(|_| StagingError::Io {
            path: entry.path().to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, "entry escaped source tree"),
        })?;
        let dest = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dest).map_err(StagingError::io(&dest))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest).map_err(StagingError::io(&dest))?;
            let metadata = entry.metadata()?;
            let mtime = filetime::FileTime::from_last_modification_time(&metadata);
            filetime::set_file_mtime(&dest, mtime).map_err(StagingError::io(&dest))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, dest: &Path) -> Result<(), StagingError> {
    let points_to = fs::read_link(link).map_err(StagingError::io(link))?;
    std::os::unix::fs::symlink(points_to, dest).map_err(StagingError::io(dest))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, dest: &Path) -> Result<(), StagingError> {
    if link.is_dir() {
        return copy_tree(link, dest);
    }
    fs::copy(link, dest).map_err(StagingError::io(dest))?;
    Ok(())
}

/// Whether `path` (which need not exist yet) resolves to a location below
/// the existing directory `tree`.
fn is_inside(path: &Path, tree: &Path) -> bool {
    let Ok(tree) = tree.canonicalize() else {
        return false;
    };
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        if let Ok(resolved) = existing.canonicalize() {
            let full = missing
                .iter()
                .rev()
                .fold(resolved, |acc: PathBuf, name| acc.join(name));
            return full.starts_with(&tree);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            _ => return false,
        }
    }
}

fn remove_tree(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to clean up partial tree");
        }
    }
}

/// Run `f` with a fresh ephemeral directory that is removed afterwards,
/// whether `f` succeeds, fails or panics.
pub fn scoped<F, R, E>(f: F) -> Result<R, E>
where
    F: FnOnce(&Path) -> Result<R, E>,
    E: From<StagingError>,
{
    let root = tempfile::Builder::new()
        .prefix("patchiman-")
        .tempdir()
        .map_err(StagingError::io(&std::env::temp_dir()))?;
    tracing::debug!(root = %root.path().display(), "staging root created");

    let result = f(root.path());

    let path = root.path().to_path_buf();
    if let Err(e) = root.close() {
        tracing::warn!(root = %path.display(), error = %e, "failed to remove staging root");
    }
    result
}
