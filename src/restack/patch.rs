use crate::diff::units::LineKind;
use crate::restack::plan::LineMutation;

/// Apply line mutations to a file's base content.
///
/// Policy (deliberately approximate, kept for compatibility with the
/// behavior this engine replaces):
/// - deletions remove the first remaining occurrence of the exact line
///   text (followed by a newline),
/// - additions are appended after the existing content, one per line,
/// - a trailing newline is ensured whenever anything was added.
///
/// Matching deletions by content rather than position is robust to minor
/// upstream shifts but can mis-match when a file contains duplicate lines.
/// That is a known correctness gap, not an accident; see DESIGN.md.
pub fn apply_mutations(base_content: Option<&str>, mutations: &[LineMutation]) -> String {
    let mut content = base_content.unwrap_or("").to_string();

    for mutation in mutations.iter().filter(|m| m.kind == LineKind::Delete) {
        let needle = format!("{}\n", mutation.text);
        if let Some(pos) = content.find(&needle) {
            content.replace_range(pos..pos + needle.len(), "");
        }
    }

    let additions: Vec<&str> = mutations
        .iter()
        .filter(|m| m.kind == LineKind::Add)
        .map(|m| m.text.as_str())
        .collect();

    if !additions.is_empty() {
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&additions.join("\n"));
        if !content.ends_with('\n') {
            content.push('\n');
        }
    }

    content
}
