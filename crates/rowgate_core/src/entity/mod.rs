//! Entity model: descriptor tables and row mapping.

mod descriptor;

pub use descriptor::{is_persisted, EntityDescriptor, FieldDescriptor};

use crate::error::{CoreError, CoreResult};
use rowgate_engine::{Key, Row, Value};

/// A plain record type persisted as one table row.
///
/// Entities are created by mapping a single data row, mutated only through
/// their own fields before a store operation, and treated as immutable
/// snapshots once diffed or logged. Identity is the natural key: two
/// entities are equal iff their keys are equal, independent of other field
/// values - concrete types implement `PartialEq` over [`Entity::key`].
///
/// # Example
///
/// ```rust,ignore
/// struct Account { id: i64, name: String }
///
/// static FIELDS: [FieldDescriptor; 2] =
///     [FieldDescriptor::new("ACC_ID"), FieldDescriptor::new("ACC_NAME")];
/// static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
///     name: "Account",
///     table: "ACC",
///     fields: &FIELDS,
///     key: &["ACC_ID"],
///     generated: Some("ACC_ID"),
/// };
///
/// impl Entity for Account {
///     fn descriptor() -> &'static EntityDescriptor { &DESCRIPTOR }
///     fn to_row(&self) -> Row {
///         Row::new()
///             .with("ACC_ID", Value::Int(self.id))
///             .with("ACC_NAME", Value::text(self.name.clone()))
///     }
///     fn from_row(row: &Row) -> CoreResult<Self> {
///         Ok(Self {
///             id: require_int("Account", row, "ACC_ID")?,
///             name: require_text("Account", row, "ACC_NAME")?,
///         })
///     }
///     fn key(&self) -> Key { Key::single("ACC_ID", Value::Int(self.id)) }
///     fn apply_generated_key(&mut self, value: i64) { self.id = value; }
/// }
/// ```
pub trait Entity: Send + 'static {
    /// Returns the static descriptor for this entity type.
    fn descriptor() -> &'static EntityDescriptor
    where
        Self: Sized;

    /// Maps the entity to a row, emitting fields in descriptor order.
    fn to_row(&self) -> Row;

    /// Maps a row back to an entity.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when a required column is absent or has the
    /// wrong type.
    fn from_row(row: &Row) -> CoreResult<Self>
    where
        Self: Sized;

    /// Returns the natural key of this instance.
    fn key(&self) -> Key;

    /// Writes back an engine-generated key value.
    ///
    /// The default is a no-op for entity types without a generated key.
    fn apply_generated_key(&mut self, _value: i64) {}

    /// Transient aggregate-size hint, set when this instance represents a
    /// paged or aggregated result. Never persisted, never audited.
    fn collection_size(&self) -> Option<usize> {
        None
    }
}

/// Reads a required text column during row mapping.
///
/// # Errors
///
/// Returns `MissingField` or `FieldType`.
pub fn require_text(entity: &'static str, row: &Row, field: &'static str) -> CoreResult<String> {
    match row.get(field) {
        Some(Value::Text(value)) => Ok(value.clone()),
        Some(other) => Err(CoreError::field_type(
            entity,
            field,
            "text",
            other.type_name(),
        )),
        None => Err(CoreError::missing_field(entity, field)),
    }
}

/// Reads a required integer column during row mapping.
///
/// # Errors
///
/// Returns `MissingField` or `FieldType`.
pub fn require_int(entity: &'static str, row: &Row, field: &'static str) -> CoreResult<i64> {
    match row.get(field) {
        Some(Value::Int(value)) => Ok(*value),
        Some(other) => Err(CoreError::field_type(
            entity,
            field,
            "int",
            other.type_name(),
        )),
        None => Err(CoreError::missing_field(entity, field)),
    }
}

/// Reads a required boolean column during row mapping.
///
/// # Errors
///
/// Returns `MissingField` or `FieldType`.
pub fn require_bool(entity: &'static str, row: &Row, field: &'static str) -> CoreResult<bool> {
    match row.get(field) {
        Some(Value::Bool(value)) => Ok(*value),
        Some(other) => Err(CoreError::field_type(
            entity,
            field,
            "bool",
            other.type_name(),
        )),
        None => Err(CoreError::missing_field(entity, field)),
    }
}
