// src/resolve/paths.rs

//! Output path computation for resolved inputs.

use std::path::{Path, PathBuf};

use crate::resolve::mapping::{Dest, FileMapping};
use crate::types::ExtDot;

/// Compute the output path for `input`, matched below `base`.
pub fn output_path(root: &Path, base: &Path, input: &Path, mapping: &FileMapping) -> PathBuf {
    let dest_dir = match &mapping.dest {
        Dest::InPlace => return input.to_path_buf(),
        Dest::File(file) => return root.join(file),
        Dest::Dir(dir) => root.join(dir),
    };

    let rel: PathBuf = if mapping.flatten {
        input.file_name().map(PathBuf::from).unwrap_or_default()
    } else {
        match input.strip_prefix(base) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => input.file_name().map(PathBuf::from).unwrap_or_default(),
        }
    };

    let rel = match &mapping.ext {
        Some(ext) => replace_ext(&rel, ext, mapping.ext_dot),
        None => rel,
    };

    dest_dir.join(rel)
}

/// Replace the extension of the final path component with `ext`.
///
/// `ext` is appended verbatim, so it carries its own leading dot (`".css"`)
/// or any other suffix (`"-report.txt"`). A leading dot of hidden files is
/// not treated as an extension separator.
pub fn replace_ext(path: &Path, ext: &str, dot: ExtDot) -> PathBuf {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };

    let (prefix, body) = match name.strip_prefix('.') {
        Some(rest) => (".", rest),
        None => ("", name),
    };

    let split = match dot {
        ExtDot::First => body.find('.'),
        ExtDot::Last => body.rfind('.'),
    };

    let stem = match split {
        Some(idx) => &body[..idx],
        None => body,
    };

    path.with_file_name(format!("{prefix}{stem}{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_from_first_dot_by_default() {
        let out = replace_ext(Path::new("js/app.min.js"), ".js", ExtDot::First);
        assert_eq!(out, PathBuf::from("js/app.js"));
    }

    #[test]
    fn replaces_last_extension_only() {
        let out = replace_ext(Path::new("app.min.js"), ".map", ExtDot::Last);
        assert_eq!(out, PathBuf::from("app.min.map"));
    }

    #[test]
    fn ext_may_be_any_suffix() {
        let out = replace_ext(Path::new("index.html"), "-report.txt", ExtDot::First);
        assert_eq!(out, PathBuf::from("index-report.txt"));
    }

    #[test]
    fn hidden_files_keep_their_leading_dot() {
        let out = replace_ext(Path::new(".eslintrc.json"), ".yml", ExtDot::First);
        assert_eq!(out, PathBuf::from(".eslintrc.yml"));
    }

    #[test]
    fn flatten_drops_directories() {
        let mut mapping = FileMapping::expanded("pages", "build", &["**/*.hbs"]);
        mapping.flatten = true;
        mapping.ext = Some(".html".to_string());

        let root = Path::new("/p");
        let out = output_path(root, &root.join("pages"), &root.join("pages/blog/post.hbs"), &mapping);
        assert_eq!(out, PathBuf::from("/p/build/post.html"));
    }
}
