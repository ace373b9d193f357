//! Path helpers shared by the store and the object model.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use super::StoreError;

/// Strip input-file extensions and characters that are unsafe in file names
pub fn clean_filename(name: &str) -> String {
    let mut name = name.to_string();
    for ext in [
        ".csv", ".txt", ".raw", ".tab", ".RAW", ".mgf", ".mzML", ".mzIdentML",
    ] {
        name = name.replace(ext, "");
    }
    name.replace([':', '/', '~'], "")
        .replace('@', "at")
        .replace(['[', ']'], "_")
}

/// Split a slash-separated store path into its components
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
    if parts
        .iter()
        .any(|p| p.is_empty() || *p == "." || *p == ".." || p.contains('\\'))
    {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

/// Ensure `path` ends with `extension`, replacing any other extension
pub fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let wanted = extension.trim_start_matches('.');
    match path.extension() {
        Some(ext) if ext == wanted => path.to_path_buf(),
        _ => path.with_extension(wanted),
    }
}

/// Compare strings so that embedded numbers sort by value (`a2` < `a10`)
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let mut ln = String::new();
                while let Some(c) = left.peek().copied().filter(char::is_ascii_digit) {
                    ln.push(c);
                    left.next();
                }
                let mut rn = String::new();
                while let Some(c) = right.peek().copied().filter(char::is_ascii_digit) {
                    rn.push(c);
                    right.next();
                }
                let lt = ln.trim_start_matches('0');
                let rt = rn.trim_start_matches('0');
                let ord = lt.len().cmp(&rt.len()).then_with(|| lt.cmp(rt));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

/// Recursively copy a file or directory tree
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), StoreError> {
    if src.is_file() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
        return Ok(());
    }
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
    }
    Ok(())
}
