use std::path::{Path, PathBuf};

/// File name without its final extension (`report.tar.gz` -> `report.tar`).
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Lower-cased extension without the dot, or an empty string.
pub fn extension(path: &Path) -> String {
    path.extension()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Parent directory as a string, empty for bare names.
pub fn folder(path: &Path) -> String {
    path.parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// First free name in `dir` for `file_name`: the name itself, then
/// `<stem> (1).<ext>`, `<stem> (2).<ext>` and so on.
pub fn numbered_destination<F>(dir: &Path, file_name: &str, exists: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let candidate = dir.join(file_name);
    if !exists(&candidate) {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = stem(as_path);
    let ext = as_path
        .extension()
        .map(|s| format!(".{}", s.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1usize;
    loop {
        let candidate = dir.join(format!("{} ({}){}", stem, n, ext));
        if !exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_path_projections() {
        let path = Path::new("/data/Inbox/Report.Final.PDF");
        assert_eq!(stem(path), "Report.Final");
        assert_eq!(extension(path), "pdf");
        assert_eq!(file_name(path), "Report.Final.PDF");
        assert_eq!(folder(path), "/data/Inbox");
        assert_eq!(extension(Path::new("/data/README")), "");
    }

    #[test]
    fn test_numbered_destination() {
        let taken: HashSet<PathBuf> = ["/out/a.txt", "/out/a (1).txt"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let exists = |p: &Path| taken.contains(p);

        assert_eq!(
            numbered_destination(Path::new("/out"), "a.txt", exists),
            PathBuf::from("/out/a (2).txt")
        );
        assert_eq!(
            numbered_destination(Path::new("/out"), "b.txt", exists),
            PathBuf::from("/out/b.txt")
        );
    }

    #[test]
    fn test_numbered_destination_without_extension() {
        let exists = |p: &Path| p == Path::new("/out/notes");
        assert_eq!(
            numbered_destination(Path::new("/out"), "notes", exists),
            PathBuf::from("/out/notes (1)")
        );
    }

    #[test]
    fn test_expand_home_leaves_other_paths() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(expand_home("rel/~x"), PathBuf::from("rel/~x"));
    }
}
