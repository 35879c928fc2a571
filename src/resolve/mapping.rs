// src/resolve/mapping.rs

//! Validated file mapping declarations.

use std::path::PathBuf;

use crate::config::model::{FileMappingConfig, FilesConfig, TargetConfig};
use crate::types::{ExtDot, PathFilter};

/// Where outputs of a mapping go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dest {
    /// No destination: the output path equals the input path (cleaners,
    /// linters, in-place rewriters).
    InPlace,
    /// Per-input outputs below this directory.
    Dir(PathBuf),
    /// Every input maps onto this one file.
    File(PathBuf),
}

/// A declarative rule resolving source patterns to `(input, output)` pairs.
///
/// Paths are relative to the project root unless absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    pub cwd: Option<PathBuf>,
    pub src: Vec<String>,
    pub dest: Dest,
    /// When false, `src` entries are literal paths rather than patterns.
    pub expand: bool,
    pub flatten: bool,
    pub ext: Option<String>,
    pub ext_dot: ExtDot,
    pub filter: Option<PathFilter>,
}

impl FileMapping {
    /// A glob mapping below `cwd` into `dest`, the common case.
    pub fn expanded(cwd: impl Into<PathBuf>, dest: impl Into<PathBuf>, src: &[&str]) -> Self {
        Self {
            cwd: Some(cwd.into()),
            src: src.iter().map(|s| s.to_string()).collect(),
            dest: Dest::Dir(dest.into()),
            expand: true,
            flatten: false,
            ext: None,
            ext_dot: ExtDot::First,
            filter: None,
        }
    }

    /// Literal paths, output in place.
    pub fn literal(src: &[&str]) -> Self {
        Self {
            cwd: None,
            src: src.iter().map(|s| s.to_string()).collect(),
            dest: Dest::InPlace,
            expand: false,
            flatten: false,
            ext: None,
            ext_dot: ExtDot::First,
            filter: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn from_parts(
        src: Vec<String>,
        cwd: Option<&String>,
        dest: Option<&String>,
        expand: bool,
        flatten: bool,
        ext: Option<&String>,
        ext_dot: ExtDot,
        filter: Option<PathFilter>,
    ) -> Self {
        Self {
            cwd: cwd.map(PathBuf::from),
            src,
            dest: dest.map(|d| Dest::Dir(PathBuf::from(d))).unwrap_or(Dest::InPlace),
            expand,
            flatten,
            ext: ext.cloned(),
            ext_dot,
            filter,
        }
    }
}

impl From<&FileMappingConfig> for FileMapping {
    fn from(cfg: &FileMappingConfig) -> Self {
        FileMapping::from_parts(
            cfg.src.to_vec(),
            cfg.cwd.as_ref(),
            cfg.dest.as_ref(),
            cfg.expand,
            cfg.flatten,
            cfg.ext.as_ref(),
            cfg.ext_dot,
            cfg.filter,
        )
    }
}

/// All mappings a target declares, in declaration order.
///
/// Compact `files` tables (`"dest" = [patterns]`) are treated as expanded
/// patterns relative to the project root, all mapping onto `dest`.
pub fn mappings_for_target(target: &TargetConfig) -> Vec<FileMapping> {
    if let Some(src) = &target.src {
        return vec![FileMapping::from_parts(
            src.to_vec(),
            target.cwd.as_ref(),
            target.dest.as_ref(),
            target.expand,
            target.flatten,
            target.ext.as_ref(),
            target.ext_dot,
            target.filter,
        )];
    }

    match &target.files {
        Some(FilesConfig::List(list)) => list.iter().map(FileMapping::from).collect(),
        Some(FilesConfig::Compact(map)) => map
            .iter()
            .map(|(dest, src)| FileMapping {
                cwd: None,
                src: src.to_vec(),
                dest: Dest::File(PathBuf::from(dest)),
                expand: true,
                flatten: false,
                ext: None,
                ext_dot: ExtDot::First,
                filter: None,
            })
            .collect(),
        None => Vec::new(),
    }
}
