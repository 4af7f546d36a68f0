use crate::diff::parser::{DiffLine, FileChange, Hunk};
use crate::git::history::StackCommit;
use serde::{Deserialize, Serialize};

/// Edit intent of a selectable line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Add,
    Delete,
}

/// The smallest selectable grain of an edit: one added or removed line.
///
/// The composite id is `{commitHash}-{fileId}-{hunkId}-line-{index}` where
/// `index` is the 0-based position within the hunk's content buffer (the
/// `@@` header line sits at index 0). Ids are valid for one parse pass
/// only; re-derive them after any re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUnit {
    pub id: String,
    pub commit_hash: String,
    pub file_id: String,
    pub file_name: String,
    pub hunk_id: String,
    pub line_index: usize,
    /// The line as it appears in the hunk, prefix character included.
    pub content: String,
    pub kind: LineKind,
}

impl ChangeUnit {
    /// The line text without its `+`/`-` prefix.
    pub fn text(&self) -> &str {
        &self.content[1..]
    }
}

/// Explode one hunk into its selectable edit lines. Context lines carry no
/// edit intent and are never independently selectable.
pub fn explode(commit_hash: &str, file: &FileChange, hunk: &Hunk) -> Vec<ChangeUnit> {
    let mut units = Vec::new();

    for (i, line) in hunk.lines.iter().enumerate() {
        let kind = match line {
            DiffLine::Added(_) => LineKind::Add,
            DiffLine::Removed(_) => LineKind::Delete,
            _ => continue,
        };

        // Index 0 is the header line, body lines start at 1.
        let line_index = i + 1;
        units.push(ChangeUnit {
            id: format!("{commit_hash}-{}-{}-line-{line_index}", file.id, hunk.id),
            commit_hash: commit_hash.to_string(),
            file_id: file.id.clone(),
            file_name: file.file_name.clone(),
            hunk_id: hunk.id.clone(),
            line_index,
            content: line.render(),
            kind,
        });
    }

    units
}

/// All selectable units of one commit, in file order, then hunk order,
/// then line order.
pub fn explode_commit(commit: &StackCommit) -> Vec<ChangeUnit> {
    let mut units = Vec::new();
    for file in &commit.changes {
        for hunk in &file.hunks {
            units.extend(explode(&commit.commit.hash, file, hunk));
        }
    }
    units
}

/// Group units by file name, preserving encounter order of both files and
/// the units within them.
pub fn by_file(units: &[ChangeUnit]) -> Vec<(String, Vec<ChangeUnit>)> {
    let mut groups: Vec<(String, Vec<ChangeUnit>)> = Vec::new();

    for unit in units {
        match groups.iter_mut().find(|(name, _)| *name == unit.file_name) {
            Some((_, bucket)) => bucket.push(unit.clone()),
            None => groups.push((unit.file_name.clone(), vec![unit.clone()])),
        }
    }

    groups
}
