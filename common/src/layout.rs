//! File naming convention shared by map and reduce tasks.
//!
//! * intermediate files: `mr-<partition>-<producer worker id>`
//! * output files: `mr-out-<partition>`
//! * scratch files: `.mr-scratch-*`, never matched by the conventions above
//!
//! Input files must not use any of these names, see [`is_reserved_name`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;

use crate::WorkerId;

/// Prefix of uncommitted map output.
pub const SCRATCH_PREFIX: &str = ".mr-scratch-";

/// Whether `file` has a name the layout writes itself. An input named like
/// `mr-0-notes.txt` would be read back by reduce as map output.
pub fn is_reserved_name(file: &str) -> bool {
    let name = Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file);
    if name.starts_with(SCRATCH_PREFIX) || name.starts_with("mr-out-") {
        return true;
    }
    match name.strip_prefix("mr-").and_then(|rest| rest.split_once('-')) {
        Some((partition, _)) => {
            !partition.is_empty() && partition.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Root directory holding inputs, intermediate and output files.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an input file name. Absolute paths are used as-is.
    pub fn input_path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// Committed map output for `partition` written by `producer`.
    pub fn intermediate_path(&self, partition: u32, producer: &WorkerId) -> PathBuf {
        self.root.join(format!("mr-{}-{}", partition, producer))
    }

    /// Final reduce output for `partition`.
    pub fn output_path(&self, partition: u32) -> PathBuf {
        self.root.join(format!("mr-out-{}", partition))
    }

    /// Every committed intermediate file for `partition`, from any producer,
    /// in lexicographic order.
    pub fn intermediate_files(&self, partition: u32) -> Result<Vec<PathBuf>> {
        let root = Pattern::escape(&self.root.to_string_lossy());
        let spec = format!("{}/mr-{}-*", root, partition);

        let mut files = glob::glob(&spec)
            .with_context(|| format!("invalid glob pattern `{}`", spec))?
            .collect::<Result<Vec<_>, _>>()?;
        files.retain(|path| path.is_file());
        files.sort();

        Ok(files)
    }

    /// Every output file present, in lexicographic order.
    pub fn output_files(&self) -> Result<Vec<PathBuf>> {
        let root = Pattern::escape(&self.root.to_string_lossy());
        let spec = format!("{}/mr-out-*", root);

        let mut files = glob::glob(&spec)?.collect::<Result<Vec<_>, _>>()?;
        files.sort();

        Ok(files)
    }
}
