//! Editing a search-filtered view of the game list and folding the edits
//! back into the full list.
//!
//! The persisted form is one `|`-delimited line; editing happens on a
//! newline-delimited copy. Lines outside the filter are never dropped or
//! reordered by a filtered edit.

/// Baseline for one edit session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSession {
    original: String,
}

impl EditSession {
    pub fn begin(persisted: &str) -> Self {
        Self {
            original: begin_edit(persisted),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn filtered(&self, term: &str) -> String {
        apply_filter(&self.original, term)
    }

    pub fn merge(&self, edited: &str, term: &str) -> Vec<String> {
        merge(&self.original, edited, term)
    }
}

/// Newline-delimited form of the persisted list.
pub fn begin_edit(persisted: &str) -> String {
    persisted.trim().replace('|', "\n")
}

/// Lines containing `term`, case-insensitively, in their original order.
pub fn apply_filter(original: &str, term: &str) -> String {
    if term.is_empty() {
        return original.to_string();
    }
    let needle = term.to_lowercase();
    original
        .split('\n')
        .filter(|line| matches(line, &needle))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Folds `edited` (the edited filtered view) back into `original`.
///
/// With an empty `term` the edited lines replace the list. Otherwise each
/// original line matching `term` takes the next edited line, keeping the
/// original when the edited lines run out; other lines pass through.
pub fn merge(original: &str, edited: &str, term: &str) -> Vec<String> {
    let mut edited = clean_lines(edited).into_iter();

    if term.is_empty() {
        return edited.map(str::to_string).collect();
    }

    let needle = term.to_lowercase();
    clean_lines(original)
        .into_iter()
        .map(|line| {
            if matches(line, &needle) {
                edited.next().unwrap_or(line).to_string()
            } else {
                line.to_string()
            }
        })
        .collect()
}

/// Single-line `|`-delimited form written to disk.
pub fn to_persisted(lines: &[String]) -> String {
    lines.join("|")
}

fn clean_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn matches(line: &str, needle: &str) -> bool {
    line.to_lowercase().contains(needle)
}
