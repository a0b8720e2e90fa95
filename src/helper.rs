use crate::NoteMetadata;

/// Splits a comma-separated stack list, dropping blanks and duplicates while
/// keeping the first-seen order.
pub fn parse_stacks(stacks: Option<String>) -> Vec<String> {
    let mut parsed: Vec<String> = Vec::new();
    for stack in stacks
        .iter()
        .flat_map(|s| s.split(','))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        if !parsed.iter().any(|p| p == stack) {
            parsed.push(stack.to_string());
        }
    }
    parsed
}

/// Orders metadata newest-updated first; ties fall back to title.
pub fn sort_by_recent(notes: &mut [NoteMetadata]) {
    notes.sort_by(|a, b| {
        b.updated_datetime
            .cmp(&a.updated_datetime)
            .then_with(|| a.title.cmp(&b.title))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stacks() {
        assert_eq!(
            parse_stacks(Some(" rust, git,,rust ".into())),
            vec!["rust".to_string(), "git".to_string()]
        );
        assert!(parse_stacks(None).is_empty());
    }

    #[test]
    fn sorts_newest_first() {
        let mut old = NoteMetadata::new("old", vec![]);
        old.updated_datetime = 1;
        let mut new = NoteMetadata::new("new", vec![]);
        new.updated_datetime = 2;

        let mut notes = vec![old, new];
        sort_by_recent(&mut notes);
        assert_eq!(notes[0].title, "new");
    }
}
