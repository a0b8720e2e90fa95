//! Pure mapping between notes and their on-disk layout.
//!
//! ```text
//! notes/
//!   {YY-MM-DD}-{sanitized-title}.gd/
//!     meta.json
//!     content.json
//! ```
//!
//! Nothing in here touches the filesystem.
use std::path::{Path, PathBuf};

use chrono::DateTime;

use crate::{GdError, NoteContent, NoteMetadata, Result};

/// Extension that marks a directory as a note directory.
pub const NOTE_DIR_EXTENSION: &str = "gd";
pub const METADATA_FILE_NAME: &str = "meta.json";
pub const CONTENT_FILE_NAME: &str = "content.json";

const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
/// Upper bound for the title part of a directory name, in bytes. Leaves room
/// for the date prefix, the extension and the `.deleted-` tombstone prefix
/// under the usual 255 byte file name limit.
pub const MAX_TITLE_BYTES: usize = 200;

/// Formats epoch millis as a sortable `YY-MM-DD` date (UTC).
pub fn short_date(epoch_millis: i64) -> String {
    DateTime::from_timestamp_millis(epoch_millis)
        .unwrap_or_default()
        .format("%y-%m-%d")
        .to_string()
}

/// Makes a title safe to use as part of a directory name.
pub fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .trim()
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    // Leading dots would hide the note directory.
    let sanitized =
        truncate_at_char_boundary(sanitized.trim_start_matches('.'), MAX_TITLE_BYTES);
    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized.to_string()
    }
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Directory name for a note, derived from its creation date and title.
pub fn file_name_from_metadata(metadata: &NoteMetadata) -> String {
    format!(
        "{}-{}.{}",
        short_date(metadata.created_datetime),
        sanitize_title(&metadata.title),
        NOTE_DIR_EXTENSION
    )
}

/// Whether a directory entry name looks like a note directory.
pub fn is_note_dir_name(name: &str) -> bool {
    !name.starts_with('.')
        && Path::new(name)
            .extension()
            .is_some_and(|ext| ext == NOTE_DIR_EXTENSION)
}

pub fn metadata_file_name(note_dir: &Path) -> PathBuf {
    note_dir.join(METADATA_FILE_NAME)
}

pub fn content_file_name(note_dir: &Path) -> PathBuf {
    note_dir.join(CONTENT_FILE_NAME)
}

pub fn serialize_metadata(metadata: &NoteMetadata) -> Result<String> {
    Ok(serde_json::to_string_pretty(metadata)?)
}

pub fn deserialize_metadata(raw: &str) -> Result<NoteMetadata> {
    let metadata: NoteMetadata = serde_json::from_str(raw)?;
    if metadata.id.is_empty() {
        return Err(GdError::InvalidFormat {
            message: "note metadata has an empty id".to_string(),
        });
    }
    Ok(metadata)
}

pub fn serialize_content(content: &NoteContent) -> Result<String> {
    Ok(serde_json::to_string_pretty(content)?)
}

pub fn deserialize_content(raw: &str) -> Result<NoteContent> {
    let content: NoteContent = serde_json::from_str(raw)?;
    if content.note_id.is_empty() {
        return Err(GdError::InvalidFormat {
            message: "note content has an empty note id".to_string(),
        });
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoteContentSnippet;

    // 2021-03-04T05:06:07Z
    const CREATED: i64 = 1_614_834_367_000;

    fn metadata(title: &str) -> NoteMetadata {
        let mut meta = NoteMetadata::new(title, vec!["rust".into()]);
        meta.created_datetime = CREATED;
        meta.updated_datetime = CREATED + 10;
        meta
    }

    #[test]
    fn file_name_is_deterministic() {
        let meta = metadata("My first note");
        assert_eq!(file_name_from_metadata(&meta), "21-03-04-My-first-note.gd");
        assert_eq!(
            file_name_from_metadata(&meta),
            file_name_from_metadata(&meta.clone())
        );
    }

    #[test]
    fn changing_title_changes_file_name() {
        let a = metadata("Alpha");
        let mut b = a.clone();
        b.title = "Beta".into();
        assert_ne!(file_name_from_metadata(&a), file_name_from_metadata(&b));
    }

    #[test]
    fn sanitizes_path_separators_and_dots() {
        assert_eq!(sanitize_title("a/b\\c: d"), "abc-d");
        assert_eq!(sanitize_title("..hidden"), "hidden");
        assert_eq!(sanitize_title("   "), "untitled");
    }

    #[test]
    fn long_titles_are_truncated_on_char_boundary() {
        let ascii = "word ".repeat(60);
        let sanitized = sanitize_title(&ascii);
        assert_eq!(sanitized.len(), MAX_TITLE_BYTES);
        assert!(ascii.replace(' ', "-").starts_with(&sanitized));

        // three-byte chars do not divide the limit evenly
        let wide = "日本語".repeat(100);
        let sanitized = sanitize_title(&wide);
        assert!(sanitized.len() <= MAX_TITLE_BYTES);
        assert_eq!(sanitized.len(), 198);
        assert!(sanitized.chars().all(|c| "日本語".contains(c)));

        let name = file_name_from_metadata(&metadata(&ascii));
        assert!(format!(".deleted-{}", name).len() < 255);
    }

    #[test]
    fn recognizes_note_dirs() {
        assert!(is_note_dir_name("21-03-04-x.gd"));
        assert!(!is_note_dir_name("meta.json"));
        assert!(!is_note_dir_name(".gitkeep"));
        assert!(!is_note_dir_name(".21-03-04-x.gd"));
    }

    #[test]
    fn fixed_file_names() {
        let dir = Path::new("/w/notes/x.gd");
        assert_eq!(metadata_file_name(dir), Path::new("/w/notes/x.gd/meta.json"));
        assert_eq!(content_file_name(dir), Path::new("/w/notes/x.gd/content.json"));
    }

    #[test]
    fn metadata_round_trip_skips_derived_path() {
        let mut meta = metadata("Round trip");
        meta.note_path = Some(PathBuf::from("/somewhere"));

        let raw = serialize_metadata(&meta).unwrap();
        assert!(!raw.contains("somewhere"));
        assert!(raw.contains("createdDatetime"));

        let back = deserialize_metadata(&raw).unwrap();
        assert_eq!(back, meta);
        assert!(back.note_path.is_none());
    }

    #[test]
    fn content_round_trip_keeps_snippet_order() {
        let content = NoteContent::new(
            "note-1",
            vec![
                NoteContentSnippet::text("intro"),
                NoteContentSnippet::code("let x = 1;", Some("rust".into()), Some("x.rs".into())),
                NoteContentSnippet::text("outro"),
            ],
        );
        let back = deserialize_content(&serialize_content(&content).unwrap()).unwrap();
        assert_eq!(back, content);
        assert_eq!(back.snippets[2].value, "outro");
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(deserialize_metadata("{not json").is_err());
        assert!(matches!(
            deserialize_content(r#"{"noteId":"","snippets":[]}"#),
            Err(GdError::InvalidFormat { .. })
        ));
    }
}
