//! Core data structures for the gdnotes workspace.
//!
//! A note is stored as two records: [`NoteMetadata`] (identity and indexing
//! data) and [`NoteContent`] (the ordered body snippets). Both carry the path
//! of the note directory they were read from, which is never serialized.
use std::{collections::HashSet, path::PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and indexing data for a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    /// Stable unique identifier, assigned at creation
    pub id: String,
    /// Display title
    pub title: String,
    /// Tag / language labels
    #[serde(default)]
    pub stacks: Vec<String>,
    /// Creation time in epoch millis
    pub created_datetime: i64,
    /// Last content mutation in epoch millis
    pub updated_datetime: i64,
    /// Directory the record was read from or written to
    #[serde(skip)]
    pub note_path: Option<PathBuf>,
}

impl NoteMetadata {
    /// Creates metadata for a brand new note with a fresh id.
    pub fn new(title: impl Into<String>, stacks: Vec<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            stacks,
            created_datetime: now,
            updated_datetime: now,
            note_path: None,
        }
    }

    /// Bumps `updated_datetime` after a content mutation.
    pub fn touch(&mut self) {
        let now = Utc::now().timestamp_millis();
        // Clock skew must never move the timestamp backwards.
        self.updated_datetime = now.max(self.updated_datetime.saturating_add(1));
    }
}

impl PartialEq for NoteMetadata {
    fn eq(&self, other: &Self) -> bool {
        let stacks: HashSet<&String> = self.stacks.iter().collect();
        let other_stacks: HashSet<&String> = other.stacks.iter().collect();

        self.id == other.id
            && self.title == other.title
            && stacks == other_stacks
            && self.created_datetime == other.created_datetime
            && self.updated_datetime == other.updated_datetime
    }
}

impl Eq for NoteMetadata {}

/// Kind of a content snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetType {
    Text,
    Code,
}

/// One block of a note body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteContentSnippet {
    /// Unique within the owning note
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SnippetType,
    pub value: String,
    /// Only meaningful for code snippets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl NoteContentSnippet {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: SnippetType::Text,
            value: value.into(),
            language: None,
            file_name: None,
        }
    }

    pub fn code(
        value: impl Into<String>,
        language: Option<String>,
        file_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: SnippetType::Code,
            value: value.into(),
            language,
            file_name,
        }
    }
}

/// The body of a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteContent {
    /// Must match the owning [`NoteMetadata::id`]
    pub note_id: String,
    /// Display order is significant
    pub snippets: Vec<NoteContentSnippet>,
    #[serde(skip)]
    pub note_path: Option<PathBuf>,
}

impl NoteContent {
    pub fn new(note_id: impl Into<String>, snippets: Vec<NoteContentSnippet>) -> Self {
        Self {
            note_id: note_id.into(),
            snippets,
            note_path: None,
        }
    }
}

impl PartialEq for NoteContent {
    fn eq(&self, other: &Self) -> bool {
        self.note_id == other.note_id && self.snippets == other.snippets
    }
}

impl Eq for NoteContent {}

/// Editor colour theme kept in [`WorkspaceInfo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Workspace-level settings, stored outside the notes directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub theme: Theme,
}
