//! Change plans and applied changes.
//!
//! A [`ChangePlan`] is the planner's answer to one approved recommendation:
//! one to five [`PlannedChange`] entries, each naming a single atomic edit to
//! exactly one line of one file. Restricting execution to this small operation
//! vocabulary keeps every accepted change mechanically checkable and
//! individually revertible, which is what makes run-level rollback tractable.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::recommendation::Recommendation;

/// One atomic single-line edit operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeOp {
    /// Replace the value of a named attribute on the target line,
    /// e.g. `class="btn"` to `class="btn-primary"`.
    ReplaceAttributeValue {
        /// Attribute name, e.g. `class`.
        attribute: String,
        /// Current attribute value.
        from: String,
        /// Replacement attribute value.
        to: String,
    },

    /// Replace the value of a CSS property on the target line,
    /// e.g. `color: #888` to `color: #333`.
    ReplaceStyleValue {
        /// CSS property name, e.g. `color`.
        property: String,
        /// Current property value.
        from: String,
        /// Replacement property value.
        to: String,
    },

    /// Replace the first occurrence of a text fragment on the target line.
    ReplaceText {
        /// Text fragment to replace.
        from: String,
        /// Replacement text.
        to: String,
    },

    /// Append a value to a named attribute on the target line, preserving
    /// the existing value, e.g. adding a class token to `class="..."`.
    AppendToAttribute {
        /// Attribute name, e.g. `class`.
        attribute: String,
        /// Value to append (space-separated).
        value: String,
    },
}

impl ChangeOp {
    /// Apply this operation to a single line, producing the edited line.
    ///
    /// Returns `Err` with a human-readable reason when the operation's
    /// anchor (attribute, property, or text fragment) is not present on the
    /// line. Callers treat that as a per-change rejection.
    pub fn apply_to_line(&self, line: &str) -> Result<String, String> {
        match self {
            ChangeOp::ReplaceAttributeValue {
                attribute,
                from,
                to,
            } => {
                let needle = format!("{attribute}=\"{from}\"");
                if !line.contains(&needle) {
                    return Err(format!("attribute {attribute}=\"{from}\" not found on line"));
                }
                Ok(line.replacen(&needle, &format!("{attribute}=\"{to}\""), 1))
            }
            ChangeOp::ReplaceStyleValue { property, from, to } => {
                // Tolerate both `prop: value` and `prop:value` spacing.
                for sep in [": ", ":"] {
                    let needle = format!("{property}{sep}{from}");
                    if line.contains(&needle) {
                        return Ok(line.replacen(&needle, &format!("{property}{sep}{to}"), 1));
                    }
                }
                Err(format!("style {property}: {from} not found on line"))
            }
            ChangeOp::ReplaceText { from, to } => {
                if !line.contains(from.as_str()) {
                    return Err(format!("text '{from}' not found on line"));
                }
                Ok(line.replacen(from.as_str(), to, 1))
            }
            ChangeOp::AppendToAttribute { attribute, value } => {
                let open = format!("{attribute}=\"");
                let Some(start) = line.find(&open) else {
                    return Err(format!("attribute {attribute} not found on line"));
                };
                let value_start = start + open.len();
                let Some(rel_end) = line[value_start..].find('"') else {
                    return Err(format!("attribute {attribute} is not terminated"));
                };
                let insert_at = value_start + rel_end;
                let existing = &line[value_start..insert_at];
                let separator = if existing.is_empty() { "" } else { " " };
                let mut edited = String::with_capacity(line.len() + value.len() + 1);
                edited.push_str(&line[..insert_at]);
                edited.push_str(separator);
                edited.push_str(value);
                edited.push_str(&line[insert_at..]);
                Ok(edited)
            }
        }
    }
}

/// One planned single-line edit against a point-in-time file snapshot.
///
/// `line_content` carries the exact content the planner saw at `line`; the
/// executor rejects the change if the live file has drifted away from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct PlannedChange {
    /// Target file, relative to the project root.
    pub file: PathBuf,

    /// 1-indexed line number the edit applies to.
    pub line: usize,

    /// Exact current content of the target line at planning time.
    pub line_content: String,

    /// The atomic edit to perform.
    #[serde(flatten)]
    pub op: ChangeOp,
}

/// The planner's full answer for one approved recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChangePlan {
    /// The recommendation this plan implements.
    pub recommendation: Recommendation,

    /// Short label for the approach taken (free-form, for logs and reports).
    pub strategy: String,

    /// Planner's estimate of the score impact of this plan.
    pub expected_impact: f64,

    /// The planned edits, at most one line each.
    pub changes: Vec<PlannedChange>,
}

impl ChangePlan {
    /// A plan with no changes, meaning the planner could not find a safe,
    /// line-exact edit. Treated as a skip, not an error.
    pub fn empty(recommendation: Recommendation) -> Self {
        Self {
            recommendation,
            strategy: String::new(),
            expected_impact: 0.0,
            changes: Vec::new(),
        }
    }

    /// Whether this plan contains no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The distinct set of files this plan touches.
    pub fn target_files(&self) -> BTreeSet<PathBuf> {
        self.changes.iter().map(|c| c.file.clone()).collect()
    }
}

/// Kind of filesystem change an [`AppliedChange`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// An existing file was edited in place.
    Edit,
    /// A new file was created.
    Create,
    /// A file was deleted.
    Delete,
}

/// The result of executing one [`PlannedChange`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppliedChange {
    /// File that was changed, relative to the project root.
    pub path: PathBuf,

    /// Kind of change.
    pub kind: ChangeKind,

    /// Full file content before the change.
    pub old_content: String,

    /// Full file content after the change, re-read from disk.
    pub new_content: String,

    /// Minimal unified diff between old and new content.
    pub diff: String,
}

impl AppliedChange {
    /// Build an applied-change record for an in-place edit, deriving the diff.
    pub fn edit(path: impl Into<PathBuf>, old_content: String, new_content: String) -> Self {
        let diff = unified_diff(&old_content, &new_content);
        Self {
            path: path.into(),
            kind: ChangeKind::Edit,
            old_content,
            new_content,
            diff,
        }
    }

    /// Number of lines that differ between the old and new content.
    pub fn changed_line_count(&self) -> usize {
        changed_lines(&self.old_content, &self.new_content)
    }
}

/// Count lines that differ between two texts: pairwise-different lines plus
/// the length difference when one text has more lines than the other.
pub fn changed_lines(old: &str, new: &str) -> usize {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let paired = old_lines
        .iter()
        .zip(new_lines.iter())
        .filter(|(a, b)| a != b)
        .count();
    paired + old_lines.len().abs_diff(new_lines.len())
}

/// Percentage growth of `new` relative to `old`, in lines. Zero when the file
/// shrank or the old content was empty.
pub fn growth_percent(old: &str, new: &str) -> f64 {
    let old_lines = old.lines().count();
    let new_lines = new.lines().count();
    if old_lines == 0 || new_lines <= old_lines {
        return 0.0;
    }
    (new_lines - old_lines) as f64 / old_lines as f64 * 100.0
}

/// Render a minimal unified diff: changed lines only, with `-`/`+` markers
/// and a `@@` hunk header per run of consecutive changes.
pub fn unified_diff(old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let max = old_lines.len().max(new_lines.len());

    let mut out = String::new();
    let mut in_hunk = false;
    for i in 0..max {
        let a = old_lines.get(i);
        let b = new_lines.get(i);
        if a == b {
            in_hunk = false;
            continue;
        }
        if !in_hunk {
            out.push_str(&format!("@@ line {} @@\n", i + 1));
            in_hunk = true;
        }
        if let Some(a) = a {
            out.push_str(&format!("-{a}\n"));
        }
        if let Some(b) = b {
            out.push_str(&format!("+{b}\n"));
        }
    }
    out
}

/// Reference to a file morally owned by `AppliedChange` batches: the path and
/// the content it had before the cycle's first write. Used for verification
/// and rollback bookkeeping.
pub type FileBackup = (PathBuf, String);

/// Helper: normalize a path for use as a memory/avoidance target key.
/// Uses the lowercased file stem so `Header.tsx` matches recommendations
/// that mention "header" without the extension.
pub fn target_key(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| path.to_string_lossy().to_lowercase())
}
