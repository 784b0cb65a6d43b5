//! Discovery of input videos in the working directory.
//!
//! Only the top level of the directory is scanned. The output and done
//! directories live inside it and are skipped because they are directories.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Video container extensions accepted as input (case-sensitive matching).
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".mkv", ".avi", ".mov", ".wmv", ".webm", ".flv", ".m4v",
];

/// Checks if a file has a video extension (case-sensitive).
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|accepted| accepted.strip_prefix('.') == Some(ext))
        })
        .unwrap_or(false)
}

/// Hidden files (leading `.`) are never picked up.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Lists the videos directly inside `dir`, sorted by file name.
///
/// Sorting fixes the discovery order, which is also the admission order.
/// Unreadable entries are skipped; an unreadable `dir` is an error.
pub fn discover_videos(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut videos = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // depth 0 means the directory itself could not be read
            Err(e) if e.depth() == 0 => return Err(e),
            Err(_) => continue,
        };

        let path = entry.path();

        if !entry.file_type().is_file() || is_hidden(path) || !is_video_file(path) {
            continue;
        }

        videos.push(path.to_path_buf());
    }

    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_video_extensions_defined() {
        for ext in [".mp4", ".mkv", ".avi", ".mov", ".wmv", ".webm", ".flv", ".m4v"] {
            assert!(VIDEO_EXTENSIONS.contains(&ext), "{} missing", ext);
        }
        assert_eq!(VIDEO_EXTENSIONS.len(), 8);
    }

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("a.mp4")));
        assert!(is_video_file(Path::new("/media/b.mkv")));
        assert!(is_video_file(Path::new("my.holiday.2024.webm")));
        assert!(!is_video_file(Path::new("movie.MKV"))); // case-sensitive
        assert!(!is_video_file(Path::new("movie.Mp4")));
        assert!(!is_video_file(Path::new("notes.txt")));
        assert!(!is_video_file(Path::new("mp4"))); // no extension
        assert!(!is_video_file(Path::new("movie.mp4.part")));
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(Path::new(".secret.mkv")));
        assert!(is_hidden(Path::new("/media/.cache.mp4")));
        assert!(!is_hidden(Path::new("/media/visible.mp4")));
    }

    #[test]
    fn test_discover_videos_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        for name in ["b.mkv", "a.mp4", "c.avi", "notes.txt", "UPPER.MP4", ".hidden.mov"] {
            File::create(root.join(name)).unwrap();
        }
        // Directories named like videos and nested videos are ignored
        fs::create_dir_all(root.join("folder.mp4")).unwrap();
        fs::create_dir_all(root.join("done")).unwrap();
        File::create(root.join("done").join("old.mkv")).unwrap();

        let videos = discover_videos(root).unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["a.mp4", "b.mkv", "c.avi"]);
    }

    #[test]
    fn test_discover_videos_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover_videos(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_discover_videos_missing_dir_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(discover_videos(&missing).is_err());
    }

    // A file is accepted if and only if its extension matches the list exactly.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_video_extension_filtering(
            basename in "[a-zA-Z0-9_-]{1,20}",
            ext in prop_oneof![
                Just("mp4"), Just("mkv"), Just("avi"), Just("mov"),
                Just("wmv"), Just("webm"), Just("flv"), Just("m4v"),
                Just("MP4"), Just("Mkv"), Just("AVI"), Just("MOV"),
                Just("txt"), Just("jpg"), Just("srt"), Just("part"),
            ],
        ) {
            let path = PathBuf::from(format!("/media/{}.{}", basename, ext));

            let expected = matches!(
                ext,
                "mp4" | "mkv" | "avi" | "mov" | "wmv" | "webm" | "flv" | "m4v"
            );
            prop_assert_eq!(is_video_file(&path), expected, "extension {}", ext);
        }

        #[test]
        fn prop_discovery_in_name_order(
            names in proptest::collection::btree_set("[a-z0-9]{1,10}", 1..10),
        ) {
            let temp_dir = TempDir::new().unwrap();
            for name in &names {
                File::create(temp_dir.path().join(format!("{}.mkv", name))).unwrap();
            }

            let videos = discover_videos(temp_dir.path()).unwrap();
            let mut expected: Vec<PathBuf> = names
                .iter()
                .map(|n| temp_dir.path().join(format!("{}.mkv", n)))
                .collect();
            expected.sort();

            prop_assert_eq!(videos, expected);
        }
    }
}
