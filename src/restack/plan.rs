use crate::diff::units::{ChangeUnit, LineKind};
use crate::errors::{RestackError, Result};
use crate::git::history::StackCommit;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One new commit in a line-granularity restack request: a message plus the
/// ids of the change units assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestackCommit {
    pub message: String,
    pub line_ids: Vec<String>,
}

/// A full line-granularity restack request, as produced by the selection UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestackRequest {
    /// The commit the rewritten history is rebuilt on top of.
    pub base_branch: String,
    /// New commits in application order (index 0 lands first after the base).
    pub new_commits: Vec<RestackCommit>,
}

/// A hunk-granularity assignment: move one whole hunk into the target
/// commit slot. The target keeps the original commit's message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestackOperation {
    pub target_commit_index: usize,
    pub hunk_id: String,
    pub file_id: String,
    /// Commit the hunk was taken from. File and hunk ids restart in every
    /// commit's parse, so without this an id pair that occurs in more than
    /// one commit of the range is rejected as ambiguous.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
}

/// One line operation to replay into a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMutation {
    pub kind: LineKind,
    /// Line text without its diff prefix.
    pub text: String,
}

/// All mutations one plan step applies to one file, in replay order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMutations {
    pub file_name: String,
    pub mutations: Vec<LineMutation>,
}

/// One target commit of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub message: String,
    /// Files in encounter order; each file appears at most once per step.
    pub files: Vec<FileMutations>,
}

/// A deterministic build plan: one step per target commit, fully computed
/// before any repository state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestackPlan {
    pub steps: Vec<PlanStep>,
}

impl RestackPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Build a plan from a line-granularity request.
///
/// Validation is eager: unknown unit ids, duplicate assignments, empty
/// messages and empty targets are all rejected here, before any git state
/// is touched. Units are replayed in their canonical order (hunk order,
/// then line order) regardless of the order ids appear in the request.
pub fn plan(units: &[ChangeUnit], new_commits: &[RestackCommit]) -> Result<RestackPlan> {
    if new_commits.is_empty() {
        return Err(RestackError::plan("no commits to create"));
    }

    let known: HashSet<&str> = units.iter().map(|u| u.id.as_str()).collect();
    let mut assigned: HashSet<&str> = HashSet::new();

    for (index, commit) in new_commits.iter().enumerate() {
        if commit.message.trim().is_empty() {
            return Err(RestackError::plan(format!(
                "target commit {index} has an empty message"
            )));
        }
        if commit.line_ids.is_empty() {
            return Err(RestackError::plan(format!(
                "target commit {index} (\"{}\") has no assigned lines",
                commit.message
            )));
        }
        for id in &commit.line_ids {
            if !known.contains(id.as_str()) {
                return Err(RestackError::plan(format!(
                    "unknown change unit '{id}' (stale selection? re-fetch and retry)"
                )));
            }
            if !assigned.insert(id.as_str()) {
                return Err(RestackError::plan(format!(
                    "change unit '{id}' is assigned to more than one commit"
                )));
            }
        }
    }

    let steps = new_commits
        .iter()
        .map(|commit| {
            let wanted: HashSet<&str> = commit.line_ids.iter().map(String::as_str).collect();
            let selected: Vec<&ChangeUnit> = units
                .iter()
                .filter(|u| wanted.contains(u.id.as_str()))
                .collect();
            PlanStep {
                message: commit.message.trim().to_string(),
                files: group_mutations(&selected),
            }
        })
        .collect();

    Ok(RestackPlan { steps })
}

/// Build a plan from hunk-granularity operations.
///
/// `commits` must be the restack range ordered oldest first; target index 0
/// is the first commit applied after the base and reuses the message of the
/// original commit at that index.
pub fn plan_operations(
    commits: &[StackCommit],
    operations: &[RestackOperation],
) -> Result<RestackPlan> {
    if operations.is_empty() {
        return Err(RestackError::plan("no operations provided"));
    }

    let max_index = operations
        .iter()
        .map(|op| op.target_commit_index)
        .max()
        .unwrap_or(0);
    if max_index >= commits.len() {
        return Err(RestackError::plan(format!(
            "target commit index {max_index} is outside the {}-commit range",
            commits.len()
        )));
    }

    let mut steps = Vec::new();
    for (index, original) in commits.iter().enumerate() {
        let refs: Vec<&RestackOperation> = operations
            .iter()
            .filter(|op| op.target_commit_index == index)
            .collect();
        if refs.is_empty() {
            continue;
        }

        // Expand each referenced hunk into its edit lines, walking the
        // parsed commits in canonical order so within-file order is kept.
        let mut selected: Vec<ChangeUnit> = Vec::new();
        for op in &refs {
            selected.extend(find_hunk_units(commits, op)?);
        }

        let refs_of: Vec<&ChangeUnit> = selected.iter().collect();
        steps.push(PlanStep {
            message: original.commit.message.clone(),
            files: group_mutations(&refs_of),
        });
    }

    Ok(RestackPlan { steps })
}

/// Group selected units by file, preserving each unit's original
/// within-file order, and strip them down to line mutations.
fn group_mutations(selected: &[&ChangeUnit]) -> Vec<FileMutations> {
    let mut files: Vec<FileMutations> = Vec::new();

    for unit in selected {
        let mutation = LineMutation {
            kind: unit.kind,
            text: unit.text().to_string(),
        };
        match files.iter_mut().find(|f| f.file_name == unit.file_name) {
            Some(group) => group.mutations.push(mutation),
            None => files.push(FileMutations {
                file_name: unit.file_name.clone(),
                mutations: vec![mutation],
            }),
        }
    }

    files
}

/// Resolve one operation's hunk to its edit lines. When the operation
/// names a commit, only that commit is searched; otherwise the id pair
/// must match exactly one commit in the range.
fn find_hunk_units(commits: &[StackCommit], op: &RestackOperation) -> Result<Vec<ChangeUnit>> {
    let mut found: Option<Vec<ChangeUnit>> = None;

    for commit in commits {
        if let Some(hash) = &op.commit_hash {
            if *hash != commit.commit.hash {
                continue;
            }
        }
        for file in &commit.changes {
            if file.id != op.file_id {
                continue;
            }
            for hunk in &file.hunks {
                if hunk.id != op.hunk_id {
                    continue;
                }
                if found.is_some() {
                    return Err(RestackError::plan(format!(
                        "hunk '{}' in file '{}' exists in more than one commit; \
                         set commitHash on the operation to pick one",
                        op.hunk_id, op.file_id
                    )));
                }
                found = Some(crate::diff::units::explode(&commit.commit.hash, file, hunk));
            }
        }
    }

    found.ok_or_else(|| {
        RestackError::plan(format!(
            "unknown hunk '{}' in file '{}'",
            op.hunk_id, op.file_id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parser::parse;
    use crate::diff::units::explode;

    const DIFF: &str = "\
diff --git a/file.ts b/file.ts
--- a/file.ts
+++ b/file.ts
@@ -1,2 +1,3 @@
 context
-old
+new
+added";

    fn units() -> Vec<ChangeUnit> {
        let files = parse(DIFF);
        explode("abc123", &files[0], &files[0].hunks[0])
    }

    fn commit(message: &str, ids: &[&str]) -> RestackCommit {
        RestackCommit {
            message: message.to_string(),
            line_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_plan_groups_by_target_then_file() {
        let units = units();
        let commits = vec![
            commit("first", &[&units[0].id]),
            commit("second", &[&units[1].id, &units[2].id]),
        ];

        let plan = plan(&units, &commits).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].message, "first");
        assert_eq!(plan.steps[0].files.len(), 1);
        assert_eq!(plan.steps[0].files[0].file_name, "file.ts");
        assert_eq!(
            plan.steps[0].files[0].mutations,
            vec![LineMutation {
                kind: LineKind::Delete,
                text: "old".to_string()
            }]
        );
        assert_eq!(plan.steps[1].files[0].mutations.len(), 2);
    }

    #[test]
    fn test_plan_keeps_canonical_line_order() {
        let units = units();
        // Ids listed out of order; the plan must replay them in hunk order.
        let commits = vec![commit("all", &[&units[2].id, &units[0].id, &units[1].id])];

        let plan = plan(&units, &commits).unwrap();
        let texts: Vec<&str> = plan.steps[0].files[0]
            .mutations
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, vec!["old", "new", "added"]);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let units = units();
        let commits = vec![
            commit("first", &[&units[0].id]),
            commit("second", &[&units[1].id, &units[2].id]),
        ];
        assert_eq!(
            plan(&units, &commits).unwrap(),
            plan(&units, &commits).unwrap()
        );
    }

    #[test]
    fn test_plan_rejects_unknown_unit() {
        let units = units();
        let commits = vec![commit("bad", &["nope-file-0-hunk-0-line-9"])];
        let err = plan(&units, &commits).unwrap_err();
        assert!(matches!(err, RestackError::Plan(_)));
    }

    #[test]
    fn test_plan_rejects_empty_message() {
        let units = units();
        let commits = vec![commit("   ", &[&units[0].id])];
        assert!(plan(&units, &commits).is_err());
    }

    #[test]
    fn test_plan_rejects_empty_target() {
        let units = units();
        let commits = vec![commit("empty", &[])];
        assert!(plan(&units, &commits).is_err());
    }

    #[test]
    fn test_plan_rejects_double_assignment() {
        let units = units();
        let commits = vec![
            commit("first", &[&units[0].id]),
            commit("second", &[&units[0].id]),
        ];
        assert!(plan(&units, &commits).is_err());
    }

    #[test]
    fn test_plan_rejects_no_commits() {
        assert!(plan(&units(), &[]).is_err());
    }

    fn stack_commit(hash: &str, message: &str, diff: &str) -> StackCommit {
        StackCommit {
            commit: crate::git::history::CommitRef {
                hash: hash.to_string(),
                short_hash: hash.chars().take(7).collect(),
                author: "Test".to_string(),
                date: "2024-01-01".to_string(),
                message: message.to_string(),
                files_changed: vec!["file.ts".to_string()],
            },
            changes: parse(diff),
        }
    }

    // Two files, so the follow-up change to file.ts gets the id "file-1",
    // which no other commit in these tests uses.
    const SECOND_DIFF: &str = "\
diff --git a/other.ts b/other.ts
--- a/other.ts
+++ b/other.ts
@@ -1 +1,2 @@
 keep
+noise
diff --git a/file.ts b/file.ts
--- a/file.ts
+++ b/file.ts
@@ -1,3 +1,4 @@
 context
 new
 added
+later";

    #[test]
    fn test_plan_operations_merges_hunks_into_target() {
        let commits = vec![
            stack_commit("aaaa111", "first change", DIFF),
            stack_commit("bbbb222", "second change", SECOND_DIFF),
        ];
        let operations = vec![
            RestackOperation {
                target_commit_index: 0,
                hunk_id: commits[0].changes[0].hunks[0].id.clone(),
                file_id: commits[0].changes[0].id.clone(),
                commit_hash: Some("aaaa111".to_string()),
            },
            RestackOperation {
                target_commit_index: 0,
                hunk_id: commits[1].changes[1].hunks[0].id.clone(),
                file_id: commits[1].changes[1].id.clone(),
                commit_hash: None,
            },
        ];

        let plan = plan_operations(&commits, &operations).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].message, "first change");
        let texts: Vec<&str> = plan.steps[0].files[0]
            .mutations
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, vec!["old", "new", "added", "later"]);
    }

    #[test]
    fn test_plan_operations_keeps_original_messages_per_target() {
        let commits = vec![
            stack_commit("aaaa111", "first change", DIFF),
            stack_commit("bbbb222", "second change", SECOND_DIFF),
        ];
        let operations = vec![
            RestackOperation {
                target_commit_index: 1,
                hunk_id: commits[0].changes[0].hunks[0].id.clone(),
                file_id: commits[0].changes[0].id.clone(),
                commit_hash: Some("aaaa111".to_string()),
            },
            RestackOperation {
                target_commit_index: 0,
                hunk_id: commits[1].changes[1].hunks[0].id.clone(),
                file_id: commits[1].changes[1].id.clone(),
                commit_hash: None,
            },
        ];

        let plan = plan_operations(&commits, &operations).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].message, "first change");
        assert_eq!(plan.steps[0].files[0].mutations[0].text, "later");
        assert_eq!(plan.steps[1].message, "second change");
    }

    #[test]
    fn test_plan_operations_rejects_out_of_range_target() {
        let commits = vec![stack_commit("aaaa111", "only", DIFF)];
        let operations = vec![RestackOperation {
            target_commit_index: 1,
            hunk_id: commits[0].changes[0].hunks[0].id.clone(),
            file_id: commits[0].changes[0].id.clone(),
            commit_hash: None,
        }];
        let err = plan_operations(&commits, &operations).unwrap_err();
        assert!(matches!(err, RestackError::Plan(_)));
    }

    #[test]
    fn test_plan_operations_rejects_unknown_hunk() {
        let commits = vec![stack_commit("aaaa111", "only", DIFF)];
        let operations = vec![RestackOperation {
            target_commit_index: 0,
            hunk_id: "hunk-9".to_string(),
            file_id: "file-0".to_string(),
            commit_hash: None,
        }];
        assert!(plan_operations(&commits, &operations).is_err());
    }

    // Same single-file shape as DIFF, so both commits parse to the id pair
    // file-0 / file-0-hunk-0.
    const COLLIDING_DIFF: &str = "\
diff --git a/file.ts b/file.ts
--- a/file.ts
+++ b/file.ts
@@ -1,3 +1,4 @@
 context
 new
 added
+later-edit";

    #[test]
    fn test_plan_operations_resolves_hunk_within_named_commit() {
        let commits = vec![
            stack_commit("aaaa111", "first change", DIFF),
            stack_commit("bbbb222", "second change", COLLIDING_DIFF),
        ];
        let operations = vec![RestackOperation {
            target_commit_index: 0,
            hunk_id: commits[1].changes[0].hunks[0].id.clone(),
            file_id: commits[1].changes[0].id.clone(),
            commit_hash: Some("bbbb222".to_string()),
        }];

        let plan = plan_operations(&commits, &operations).unwrap();
        let texts: Vec<&str> = plan.steps[0].files[0]
            .mutations
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        // The second commit's hunk, not the first commit's identically-named one.
        assert_eq!(texts, vec!["later-edit"]);
    }

    #[test]
    fn test_plan_operations_rejects_ambiguous_hunk_without_commit_hash() {
        let commits = vec![
            stack_commit("aaaa111", "first change", DIFF),
            stack_commit("bbbb222", "second change", COLLIDING_DIFF),
        ];
        let operations = vec![RestackOperation {
            target_commit_index: 0,
            hunk_id: "file-0-hunk-0".to_string(),
            file_id: "file-0".to_string(),
            commit_hash: None,
        }];

        let err = plan_operations(&commits, &operations).unwrap_err();
        assert!(matches!(err, RestackError::Plan(_)));
        assert!(err.to_string().contains("more than one commit"));
    }

    #[test]
    fn test_plan_operations_rejects_hash_and_hunk_mismatch() {
        let commits = vec![stack_commit("aaaa111", "only", DIFF)];
        let operations = vec![RestackOperation {
            target_commit_index: 0,
            hunk_id: "file-0-hunk-0".to_string(),
            file_id: "file-0".to_string(),
            commit_hash: Some("bbbb222".to_string()),
        }];
        assert!(plan_operations(&commits, &operations).is_err());
    }

    #[test]
    fn test_plan_operations_rejects_empty() {
        assert!(plan_operations(&[], &[]).is_err());
    }
}
