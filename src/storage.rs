use std::path::{Path, PathBuf};

use log::{debug, error, info, trace, warn};

use crate::{fs_gateway, layout, GdError, NoteContent, NoteMetadata, Result};

/// CRUD-style access to the notes directory.
///
/// Reads degrade gracefully: a missing or corrupt note reads as `None` so a
/// single broken note never breaks listing. Writes are explicit user saves
/// and always propagate their failure.
#[derive(Debug, Clone)]
pub struct NoteStorage {
    /// Directory holding one sub-directory per note
    notes_dir: PathBuf,
}

impl NoteStorage {
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            notes_dir: notes_dir.into(),
        }
    }

    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    /// Reads the metadata of every note in the notes directory.
    ///
    /// Entries whose metadata is missing or unparsable are skipped. The
    /// result is unordered; callers sort explicitly.
    pub async fn read_note_metadata_collection(&self) -> Result<Vec<NoteMetadata>> {
        let names = match fs_gateway::list_directory(&self.notes_dir).await {
            Ok(names) => names,
            Err(e) if e.is_not_found() => {
                debug!(
                    "Notes directory {} does not exist yet",
                    self.notes_dir.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                error!("Failed to list notes directory: {}", e);
                return Err(e);
            }
        };

        let mut collection = Vec::with_capacity(names.len());
        let mut skipped = 0;

        for name in names.iter().filter(|n| layout::is_note_dir_name(n)) {
            match self.read_note_metadata(&self.notes_dir.join(name)).await {
                Some(metadata) => collection.push(metadata),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} unreadable notes while listing", skipped);
        }
        debug!("Read metadata for {} notes", collection.len());
        Ok(collection)
    }

    /// Reads one note's metadata, or `None` if it is missing or corrupt.
    pub async fn read_note_metadata(&self, note_dir: &Path) -> Option<NoteMetadata> {
        let file = layout::metadata_file_name(note_dir);

        let parsed = match fs_gateway::read_to_string(&file).await {
            Ok(raw) => layout::deserialize_metadata(&raw),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(mut metadata) => {
                metadata.note_path = Some(note_dir.to_path_buf());
                trace!("Loaded metadata for note {}", metadata.id);
                Some(metadata)
            }
            Err(e) => {
                warn!("Failed to read metadata {}: {}", file.display(), e);
                None
            }
        }
    }

    /// Reads one note's content, or `None` if it is missing or corrupt.
    pub async fn read_note_content(&self, note_dir: &Path) -> Option<NoteContent> {
        let file = layout::content_file_name(note_dir);

        let parsed = match fs_gateway::read_to_string(&file).await {
            Ok(raw) => layout::deserialize_content(&raw),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(mut content) => {
                content.note_path = Some(note_dir.to_path_buf());
                Some(content)
            }
            Err(e) => {
                warn!("Failed to read content {}: {}", file.display(), e);
                None
            }
        }
    }

    /// Saves metadata into its note directory, which must already exist.
    ///
    /// Metadata that was not read from disk is matched to its note through
    /// its id, never through its title. The write is refused if the target
    /// directory holds a different note.
    pub async fn write_note_metadata(&self, metadata: &NoteMetadata) -> Result<()> {
        let note_dir = self
            .resolve_note_dir(metadata.note_path.as_deref(), &metadata.id)
            .await?;

        let file = layout::metadata_file_name(&note_dir);
        if fs_gateway::exists(&file).await {
            if let Some(existing) = self.read_note_metadata(&note_dir).await {
                ensure_same_note(&existing.id, &metadata.id, &note_dir)?;
            }
        }
        debug!("Writing metadata of note {} to {}", metadata.id, note_dir.display());

        let raw = layout::serialize_metadata(metadata)?;
        fs_gateway::write_file(&file, raw).await
    }

    /// Saves content into its note directory.
    ///
    /// Content that was not read from disk is matched to its note through
    /// the metadata id.
    pub async fn write_note_content(&self, content: &NoteContent) -> Result<()> {
        ensure_snippets(content)?;

        let note_dir = self
            .resolve_note_dir(content.note_path.as_deref(), &content.note_id)
            .await?;

        let file = layout::content_file_name(&note_dir);
        if fs_gateway::exists(&file).await {
            if let Some(existing) = self.read_note_content(&note_dir).await {
                ensure_same_note(&existing.note_id, &content.note_id, &note_dir)?;
            }
        }
        debug!("Writing content of note {} to {}", content.note_id, note_dir.display());

        let raw = layout::serialize_content(content)?;
        fs_gateway::write_file(&file, raw).await
    }

    /// Creates the note directory and writes both records into it.
    ///
    /// Returns the new note directory. If a write fails the directory may be
    /// left behind half populated; cleanup is up to the caller.
    pub async fn create_note(
        &self,
        metadata: &NoteMetadata,
        content: &NoteContent,
    ) -> Result<PathBuf> {
        if metadata.id != content.note_id {
            return Err(GdError::InvalidFormat {
                message: format!(
                    "content belongs to note {} but metadata is {}",
                    content.note_id, metadata.id
                ),
            });
        }
        ensure_snippets(content)?;

        let note_dir = self
            .notes_dir
            .join(layout::file_name_from_metadata(metadata));
        if fs_gateway::exists(&note_dir).await {
            error!("Note directory already exists: {}", note_dir.display());
            return Err(GdError::NoteAlreadyExists { path: note_dir });
        }

        fs_gateway::make_directory(&note_dir).await?;

        let meta_raw = layout::serialize_metadata(metadata)?;
        let content_raw = layout::serialize_content(content)?;
        let meta_file = layout::metadata_file_name(&note_dir);
        let content_file = layout::content_file_name(&note_dir);

        tokio::try_join!(
            fs_gateway::write_file(&meta_file, meta_raw),
            fs_gateway::write_file(&content_file, content_raw),
        )?;

        info!("Created note {} at {}", metadata.id, note_dir.display());
        Ok(note_dir)
    }

    /// Removes a note directory.
    ///
    /// The directory is first renamed to a hidden name that listing ignores,
    /// then deleted, so a note never shows up with only one of its records.
    pub async fn delete_note(&self, note_dir: &Path) -> Result<()> {
        let name = note_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| GdError::DirectoryError {
                path: note_dir.to_path_buf(),
            })?;
        let tombstone = note_dir.with_file_name(format!(".deleted-{}", name));

        fs_gateway::rename(note_dir, &tombstone).await?;
        fs_gateway::remove_directory(&tombstone).await?;

        info!("Deleted note at {}", note_dir.display());
        Ok(())
    }

    async fn resolve_note_dir(&self, attached: Option<&Path>, note_id: &str) -> Result<PathBuf> {
        match attached {
            Some(path) => Ok(path.to_path_buf()),
            None => self
                .find_note_dir(note_id)
                .await?
                .ok_or_else(|| GdError::NoteNotFound {
                    id: note_id.to_string(),
                }),
        }
    }

    /// Finds the directory of the note whose metadata carries `note_id`.
    pub async fn find_note_dir(&self, note_id: &str) -> Result<Option<PathBuf>> {
        let found = self
            .read_note_metadata_collection()
            .await?
            .into_iter()
            .find(|m| m.id == note_id)
            .and_then(|m| m.note_path);
        Ok(found)
    }
}

fn ensure_same_note(on_disk: &str, incoming: &str, note_dir: &Path) -> Result<()> {
    if on_disk != incoming {
        error!(
            "Refusing to overwrite note {} at {} with note {}",
            on_disk,
            note_dir.display(),
            incoming
        );
        return Err(GdError::InvalidFormat {
            message: format!(
                "{} belongs to note {}, not {}",
                note_dir.display(),
                on_disk,
                incoming
            ),
        });
    }
    Ok(())
}

fn ensure_snippets(content: &NoteContent) -> Result<()> {
    if content.snippets.is_empty() {
        error!("Refusing to persist note {} without snippets", content.note_id);
        return Err(GdError::EmptyContent {
            note_id: content.note_id.clone(),
        });
    }
    Ok(())
}
