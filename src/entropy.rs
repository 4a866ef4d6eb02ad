//! Selection of files used as a randomness hint for key generation

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use rand::Rng;

use crate::error::{Error, Result};

/// Minimum number of regular files that must be found under the configured roots
pub const MIN_FILES: usize = 3;

/// Number of files handed to the toolkit
pub const SAMPLE_SIZE: usize = 3;

/// Expand a leading `~/` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

/// Collect every regular file below each root, in walk order.
///
/// Roots are walked depth first with directory entries visited in name order. A root that is
/// itself a regular file contributes just that file. Symbolic links, directories and special
/// files are never collected. A missing root is an error; unreadable directories below a root
/// are skipped.
pub fn collect_files(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = vec![];
    for root in roots {
        let root = expand_home(root);
        fs::symlink_metadata(&root).map_err(|source| Error::EntropyRoot {
            path: root.clone(),
            source,
        })?;
        walk(root, &mut files);
    }
    Ok(files)
}

fn walk(root: PathBuf, files: &mut Vec<PathBuf>) {
    let mut stack = vec![root];
    while let Some(path) = stack.pop() {
        let file_type = match fs::symlink_metadata(&path) {
            Ok(meta) => meta.file_type(),
            Err(e) => {
                debug!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if file_type.is_file() {
            files.push(path);
        } else if file_type.is_dir() {
            match read_sorted(&path) {
                // reversed so the stack yields entries in name order
                Ok(entries) => stack.extend(entries.into_iter().rev()),
                Err(e) => debug!("skipping {}: {}", path.display(), e),
            }
        }
    }
}

fn read_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// Draw [`SAMPLE_SIZE`] files uniformly, with replacement
pub fn sample<R: Rng + ?Sized>(files: &[PathBuf], rng: &mut R) -> Result<Vec<PathBuf>> {
    if files.len() < MIN_FILES {
        return Err(Error::InsufficientEntropy {
            found: files.len(),
            required: MIN_FILES,
        });
    }
    Ok((0..SAMPLE_SIZE)
        .map(|_| files[rng.gen_range(0..files.len())].clone())
        .collect())
}

/// Walk `roots`, sample the result and join it with the platform path-list separator
pub fn randomness_hint<R: Rng + ?Sized>(roots: &[PathBuf], rng: &mut R) -> Result<OsString> {
    let files = collect_files(roots)?;
    debug!("found {} random files", files.len());
    let selected = sample(&files, rng)?;
    Ok(env::join_paths(selected)?)
}
