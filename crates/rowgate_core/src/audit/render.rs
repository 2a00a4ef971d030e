//! Deterministic entity rendering and field-level diffing.

use crate::audit::worddiff::diff_words;
use crate::config::{Config, RedactionList};
use crate::entity::{Entity, FieldDescriptor};
use rowgate_engine::Row;

/// Single-line renderings truncate field values beyond this many characters.
const SINGLE_LINE_LIMIT: usize = 64;
/// Marker appended to truncated single-line values.
const TRUNCATION_MARKER: &str = "...";
/// Marker opening a multi-line value in multi-line renderings.
const MULTILINE_OPEN: &str = "(value starts across multiple lines)";
/// Marker closing a multi-line value in multi-line renderings.
const MULTILINE_CLOSE: &str = "(end of lines)";
/// Column separator between the old and new side in split diffs.
const COLUMN_MARKER: &str = " | ";

/// Renders entities for logs and computes field-level diffs for audit
/// changelogs.
///
/// Output is deterministic: fields are walked in descriptor declaration
/// order, values render through [`rowgate_engine::Value::render`], and the
/// word diff uses a fixed alignment. The auditor never mutates its inputs.
///
/// Fields flagged `redact` in the descriptor carry embedded configuration
/// text; volatile sub-parameters named in the redaction list are stripped
/// before rendering or comparing, so a value that only changed its
/// bookkeeping timestamp diffs as unchanged.
#[derive(Debug, Clone, Default)]
pub struct Auditor {
    redactions: RedactionList,
}

impl Auditor {
    /// Creates an auditor with the given redaction list.
    #[must_use]
    pub fn new(redactions: RedactionList) -> Self {
        Self { redactions }
    }

    /// Creates an auditor from the broker layer configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.redactions.clone())
    }

    /// Returns the redaction list in use.
    #[must_use]
    pub fn redactions(&self) -> &RedactionList {
        &self.redactions
    }

    /// Reads one persisted field's audit text from a row snapshot.
    ///
    /// Returns `None` when the column is absent from the snapshot; callers
    /// skip the field silently - auditing is best-effort, never fatal.
    fn field_text(&self, field: &FieldDescriptor, row: &Row) -> Option<String> {
        let value = row.get(field.name)?;
        let text = value.render();
        if field.redact {
            Some(self.redactions.strip(&text))
        } else {
            Some(text)
        }
    }

    /// Renders an entity's persisted fields in declaration order, each as
    /// `[FIELD] value`.
    ///
    /// With `single_line=true` the fields are joined by spaces, embedded
    /// newlines are escaped and long values are truncated with a marker -
    /// the form for log lines. Otherwise each field is on its own line,
    /// nothing is truncated, and multi-line values are bracketed with
    /// explicit start/end markers so the output stays unambiguous when
    /// reloaded - the form for audit storage.
    pub fn render<E: Entity>(&self, entity: &E, single_line: bool) -> String {
        let row = entity.to_row();
        let mut parts = Vec::new();
        for field in E::descriptor().persisted_fields() {
            let Some(text) = self.field_text(field, &row) else {
                continue;
            };
            if single_line {
                let mut flat = text.replace('\n', "\\n");
                if flat.chars().count() > SINGLE_LINE_LIMIT {
                    flat = flat.chars().take(SINGLE_LINE_LIMIT).collect();
                    flat.push_str(TRUNCATION_MARKER);
                }
                parts.push(format!("[{}] {flat}", field.name));
            } else if text.contains('\n') {
                parts.push(format!(
                    "[{}] {MULTILINE_OPEN}\n{text}\n{MULTILINE_CLOSE}",
                    field.name
                ));
            } else {
                parts.push(format!("[{}] {text}", field.name));
            }
        }
        parts.join(if single_line { " " } else { "\n" })
    }

    /// Computes the field-level diff of two snapshots of the same entity
    /// type.
    ///
    /// For each persisted field whose (redacted) renderings differ, emits
    /// the field name followed by a word-level diff computed line-by-line
    /// on the newline-split values: lines are paired by index, a missing
    /// line diffs against the empty line, unchanged lines are skipped.
    ///
    /// With `merge=true` each changed line is one unified stream carrying
    /// both `[-...-]` and `{+...+}` runs; otherwise the annotated old and
    /// new sides are emitted side by side, separated by the column marker.
    ///
    /// Identical snapshots produce the empty string.
    pub fn diff<E: Entity>(&self, old: &E, new: &E, merge: bool) -> String {
        let old_row = old.to_row();
        let new_row = new.to_row();
        let mut output = Vec::new();

        for field in E::descriptor().persisted_fields() {
            let (Some(old_text), Some(new_text)) = (
                self.field_text(field, &old_row),
                self.field_text(field, &new_row),
            ) else {
                continue;
            };
            if old_text == new_text {
                continue;
            }

            output.push(format!("[{}]", field.name));
            let old_lines: Vec<&str> = old_text.split('\n').collect();
            let new_lines: Vec<&str> = new_text.split('\n').collect();
            for index in 0..old_lines.len().max(new_lines.len()) {
                let old_line = old_lines.get(index).copied().unwrap_or("");
                let new_line = new_lines.get(index).copied().unwrap_or("");
                if old_line == new_line {
                    continue;
                }
                let diff = diff_words(old_line, new_line);
                if merge {
                    output.push(diff.merged);
                } else {
                    output.push(format!("{}{COLUMN_MARKER}{}", diff.old_side, diff.new_side));
                }
            }
        }

        output.join("\n")
    }
}
