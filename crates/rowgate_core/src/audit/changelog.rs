//! Audit changelog records.

use crate::audit::render::Auditor;
use crate::entity::{require_int, require_text, Entity, EntityDescriptor, FieldDescriptor};
use crate::error::CoreResult;
use rowgate_engine::{Key, Row, Value};
use std::time::{SystemTime, UNIX_EPOCH};

static CHANGELOG_FIELDS: [FieldDescriptor; 7] = [
    FieldDescriptor::new("CHL_ID"),
    FieldDescriptor::new("CHL_ENTITY"),
    FieldDescriptor::new("CHL_KEY_NAME"),
    FieldDescriptor::new("CHL_KEY_VALUE"),
    FieldDescriptor::new("CHL_OLD_TEXT"),
    FieldDescriptor::new("CHL_NEW_TEXT"),
    FieldDescriptor::new("CHL_TIME"),
];

static CHANGELOG: EntityDescriptor = EntityDescriptor {
    name: "ChangeLog",
    table: "CHL",
    fields: &CHANGELOG_FIELDS,
    key: &["CHL_ID"],
    generated: Some("CHL_ID"),
};

/// One audited change: a before/after pair as opaque rendered text, the
/// key naming the logical row changed, and a timestamp.
///
/// A changelog is itself an entity and persists through the same broker
/// path as anything else - there is no special channel.
#[derive(Debug, Clone)]
pub struct ChangeLog {
    /// Generated record id (0 until stored).
    pub id: i64,
    /// Name of the changed entity type.
    pub entity_name: String,
    /// Key column names of the changed row.
    pub key_name: String,
    /// Key values of the changed row.
    pub key_value: String,
    /// Multi-line rendering of the pre-image.
    pub old_text: String,
    /// Multi-line rendering of the post-image.
    pub new_text: String,
    /// Unix-millis timestamp of the capture.
    pub changed_at: i64,
}

impl Entity for ChangeLog {
    fn descriptor() -> &'static EntityDescriptor {
        &CHANGELOG
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("CHL_ID", Value::Int(self.id))
            .with("CHL_ENTITY", Value::text(self.entity_name.clone()))
            .with("CHL_KEY_NAME", Value::text(self.key_name.clone()))
            .with("CHL_KEY_VALUE", Value::text(self.key_value.clone()))
            .with("CHL_OLD_TEXT", Value::text(self.old_text.clone()))
            .with("CHL_NEW_TEXT", Value::text(self.new_text.clone()))
            .with("CHL_TIME", Value::Int(self.changed_at))
    }

    fn from_row(row: &Row) -> CoreResult<Self> {
        Ok(Self {
            id: require_int("ChangeLog", row, "CHL_ID")?,
            entity_name: require_text("ChangeLog", row, "CHL_ENTITY")?,
            key_name: require_text("ChangeLog", row, "CHL_KEY_NAME")?,
            key_value: require_text("ChangeLog", row, "CHL_KEY_VALUE")?,
            old_text: require_text("ChangeLog", row, "CHL_OLD_TEXT")?,
            new_text: require_text("ChangeLog", row, "CHL_NEW_TEXT")?,
            changed_at: require_int("ChangeLog", row, "CHL_TIME")?,
        })
    }

    fn key(&self) -> Key {
        Key::single("CHL_ID", Value::Int(self.id))
    }

    fn apply_generated_key(&mut self, value: i64) {
        self.id = value;
    }
}

impl PartialEq for ChangeLog {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Auditor {
    /// Captures a changelog record for a before/after pair.
    ///
    /// Returns `None` when the two snapshots diff as unchanged (after
    /// redaction), so untouched rows and volatile-only rewrites produce no
    /// audit noise.
    pub fn changelog<E: Entity>(&self, old: &E, new: &E) -> Option<ChangeLog> {
        if self.diff(old, new, true).is_empty() {
            return None;
        }
        let key = new.key();
        Some(ChangeLog {
            id: 0,
            entity_name: E::descriptor().name.to_string(),
            key_name: key.column_names(),
            key_value: key
                .parts()
                .iter()
                .map(|(_, value)| value.render())
                .collect::<Vec<_>>()
                .join(";"),
            old_text: self.render(old, false),
            new_text: self.render(new, false),
            changed_at: unix_millis(),
        })
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
