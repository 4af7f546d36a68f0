use crate::api;
use crate::cli::output::Output;
use crate::diff::units::LineKind;
use crate::errors::{RestackError, Result};
use crate::git::get_current_repository;
use console::style;

/// Show the restackable commit range, optionally down to selectable lines.
pub async fn run(base: Option<String>, head: String, lines: bool, json: bool) -> Result<()> {
    let repo = get_current_repository()?;

    let base = match base.or_else(|| api::detect_base_branch(&repo)) {
        Some(base) => base,
        None => {
            return Err(RestackError::config(
                "Could not detect a base branch; pass one with --base",
            ))
        }
    };

    let stack = api::list_commits(&repo, &base, &head)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stack)?);
        return Ok(());
    }

    Output::section(format!("Commits on {base}..{head}"));
    if stack.is_empty() {
        Output::info("Nothing to restack: the range is empty");
        return Ok(());
    }

    for entry in &stack {
        let commit = &entry.commit;
        println!(
            "\n{} {} {}",
            style(&commit.short_hash).yellow(),
            style(&commit.date).dim(),
            commit.message
        );

        for change in &entry.changes {
            let marker = match change.change_type {
                crate::diff::ChangeType::Added => style("A").green(),
                crate::diff::ChangeType::Modified => style("M").cyan(),
                crate::diff::ChangeType::Deleted => style("D").red(),
                crate::diff::ChangeType::Renamed => style("R").yellow(),
            };
            let edits: usize = change
                .hunks
                .iter()
                .flat_map(|h| &h.lines)
                .filter(|l| l.is_edit())
                .count();
            Output::sub_item(format!(
                "{marker} {} ({} hunks, {edits} edits)",
                change.file_name,
                change.hunks.len()
            ));
        }

        if lines {
            let units = crate::diff::explode_commit(entry);
            for (file_name, file_units) in crate::diff::by_file(&units) {
                println!("    {}", style(&file_name).bold());
                for unit in file_units {
                    let sign = match unit.kind {
                        LineKind::Add => style("+").green(),
                        LineKind::Delete => style("-").red(),
                    };
                    println!(
                        "      {sign} {:<60} {}",
                        unit.text(),
                        style(&unit.id).dim()
                    );
                }
            }
        }
    }

    if lines {
        Output::tip("Assign unit ids to new commits in a request file, then run 'rk apply'");
    }

    Ok(())
}
