use serde::{Deserialize, Serialize};

/// One line of a hunk body, classified once at parse time so downstream
/// code never re-inspects raw prefix characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
    /// `\ No newline at end of file` marker; the text after the backslash
    /// is kept verbatim so the hunk can be re-rendered byte-for-byte.
    NoNewline(String),
}

impl DiffLine {
    /// Classify a raw diff line. Returns `None` for anything that is not a
    /// recognized hunk body line (tool banners, index lines, noise).
    pub fn parse(raw: &str) -> Option<DiffLine> {
        let mut chars = raw.chars();
        match chars.next()? {
            ' ' => Some(DiffLine::Context(raw[1..].to_string())),
            '+' => Some(DiffLine::Added(raw[1..].to_string())),
            '-' => Some(DiffLine::Removed(raw[1..].to_string())),
            '\\' => Some(DiffLine::NoNewline(raw[1..].to_string())),
            _ => None,
        }
    }

    /// Render the line exactly as it appeared in the diff input.
    pub fn render(&self) -> String {
        match self {
            DiffLine::Context(t) => format!(" {t}"),
            DiffLine::Added(t) => format!("+{t}"),
            DiffLine::Removed(t) => format!("-{t}"),
            DiffLine::NoNewline(t) => format!("\\{t}"),
        }
    }

    /// The line text without its prefix character.
    pub fn text(&self) -> &str {
        match self {
            DiffLine::Context(t)
            | DiffLine::Added(t)
            | DiffLine::Removed(t)
            | DiffLine::NoNewline(t) => t,
        }
    }

    /// True for lines that carry edit intent (additions and deletions).
    pub fn is_edit(&self) -> bool {
        matches!(self, DiffLine::Added(_) | DiffLine::Removed(_))
    }

    /// Counts toward the old side of the hunk (context + removed).
    pub fn counts_old(&self) -> bool {
        matches!(self, DiffLine::Context(_) | DiffLine::Removed(_))
    }

    /// Counts toward the new side of the hunk (context + added).
    pub fn counts_new(&self) -> bool {
        matches!(self, DiffLine::Context(_) | DiffLine::Added(_))
    }
}

/// One contiguous block of changes within a file.
///
/// Ids are stable for the lifetime of a single parse pass only; callers
/// must re-derive them after any re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    pub id: String,
    pub file_id: String,
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// The `@@ ... @@` header line, verbatim.
    pub header: String,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// Re-render the hunk body, header first, exactly as the retained
    /// subset of the input appeared (round-trip guarantee).
    pub fn content(&self) -> String {
        let mut out = self.header.clone();
        for line in &self.lines {
            out.push('\n');
            out.push_str(&line.render());
        }
        out
    }

    /// Number of body lines on the old side (context + removed).
    pub fn old_line_count(&self) -> usize {
        self.lines.iter().filter(|l| l.counts_old()).count()
    }

    /// Number of body lines on the new side (context + added).
    pub fn new_line_count(&self) -> usize {
        self.lines.iter().filter(|l| l.counts_new()).count()
    }
}

/// How a file changed within one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// All hunks touching one file in one commit's diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub id: String,
    pub file_name: String,
    pub change_type: ChangeType,
    pub hunks: Vec<Hunk>,
    /// Previous path, set only when `change_type` is `Renamed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

/// Parse unified diff text into structured file changes.
///
/// The input is whatever the version-control tool printed for one or more
/// commits, file headers first. Malformed or unrecognized lines are skipped
/// rather than failing the whole parse: the source is an external tool's
/// output and a partial result beats no result.
pub fn parse(raw_diff: &str) -> Vec<FileChange> {
    let mut files: Vec<FileChange> = Vec::new();
    let mut current_file: Option<FileChange> = None;
    let mut current_hunk: Option<Hunk> = None;
    let mut hunk_counter = 0usize;

    for line in raw_diff.split('\n') {
        // File header: diff --git a/<path> b/<path>
        if line.starts_with("diff --git ") {
            flush_hunk(&mut current_file, &mut current_hunk);
            if let Some(file) = current_file.take() {
                files.push(file);
            }

            current_file = parse_file_header(line).map(|file_name| FileChange {
                id: format!("file-{}", files.len()),
                file_name,
                change_type: ChangeType::Modified,
                hunks: Vec::new(),
                old_path: None,
            });
            hunk_counter = 0;
            continue;
        }

        if current_file.is_none() {
            continue;
        }

        // Status markers refine the current file without starting anything new.
        if let Some(file) = current_file.as_mut() {
            if line.starts_with("new file mode") {
                file.change_type = ChangeType::Added;
            } else if line.starts_with("deleted file mode") {
                file.change_type = ChangeType::Deleted;
            } else if let Some(old) = line.strip_prefix("rename from ") {
                file.change_type = ChangeType::Renamed;
                file.old_path = Some(old.to_string());
            }
        }

        // Hunk header: @@ -oldStart[,oldLines] +newStart[,newLines] @@
        if line.starts_with("@@") {
            flush_hunk(&mut current_file, &mut current_hunk);
            let file_id = current_file
                .as_ref()
                .map(|f| f.id.clone())
                .unwrap_or_default();

            current_hunk =
                parse_hunk_header(line).map(|(old_start, old_lines, new_start, new_lines)| {
                    let hunk = Hunk {
                        id: format!("{file_id}-hunk-{hunk_counter}"),
                        file_id: file_id.clone(),
                        old_start,
                        old_lines,
                        new_start,
                        new_lines,
                        header: line.to_string(),
                        lines: Vec::new(),
                    };
                    hunk_counter += 1;
                    hunk
                });
            continue;
        }

        // Hunk body: context, additions, deletions, no-newline marker.
        if let Some(hunk) = current_hunk.as_mut() {
            if let Some(diff_line) = DiffLine::parse(line) {
                hunk.lines.push(diff_line);
            }
        }
    }

    flush_hunk(&mut current_file, &mut current_hunk);
    if let Some(file) = current_file.take() {
        files.push(file);
    }

    files
}

fn flush_hunk(file: &mut Option<FileChange>, hunk: &mut Option<Hunk>) {
    if let (Some(file), Some(hunk)) = (file.as_mut(), hunk.take()) {
        file.hunks.push(hunk);
    }
}

/// Extract the "b/" side path from a `diff --git a/<path> b/<path>` line.
fn parse_file_header(line: &str) -> Option<String> {
    let rest = line.strip_prefix("diff --git a/")?;
    let pos = rest.rfind(" b/")?;
    let name = &rest[pos + 3..];
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Parse `@@ -a[,b] +c[,d] @@ ...` into (a, b, c, d). Omitted counts
/// default to 1, per the unified diff convention.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let rest = line.strip_prefix("@@ -")?;
    let end = rest.find(" @@")?;
    let (old_spec, new_spec) = rest[..end].split_once(" +")?;
    let (old_start, old_lines) = parse_range(old_spec)?;
    let (new_start, new_lines) = parse_range(new_spec)?;
    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_range(spec: &str) -> Option<(u32, u32)> {
    match spec.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((spec.parse().ok()?, 1)),
    }
}
