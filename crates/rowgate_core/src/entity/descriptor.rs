//! Static per-type field descriptor tables.
//!
//! Descriptors replace runtime reflection: each entity type declares its
//! persisted fields once, in declaration order, and every generic facility
//! (row mapping, audit rendering, diffing) walks the same table. Ordering
//! and membership are therefore identical on every call.

/// Describes one field of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Column name. Persisted fields follow the naming convention checked
    /// by [`is_persisted`]; anything else is treated as transient.
    pub name: &'static str,
    /// Whether the field carries embedded configuration text subject to
    /// volatile sub-parameter redaction.
    pub redact: bool,
}

impl FieldDescriptor {
    /// Creates a plain field descriptor.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            redact: false,
        }
    }

    /// Creates a descriptor for a configuration-text field whose volatile
    /// sub-parameters are stripped before audit render/diff.
    #[must_use]
    pub const fn redacted(name: &'static str) -> Self {
        Self { name, redact: true }
    }
}

/// Static description of an entity type.
///
/// Built by hand (or by codegen) as a `static`, one per entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    /// Entity type name, for diagnostics and changelog records.
    pub name: &'static str,
    /// Table the entity persists to.
    pub table: &'static str,
    /// All fields, in declaration order.
    pub fields: &'static [FieldDescriptor],
    /// Natural key column names, in key order.
    pub key: &'static [&'static str],
    /// Column whose value the engine generates when unset on insert.
    pub generated: Option<&'static str>,
}

impl EntityDescriptor {
    /// Iterates the persisted fields, in declaration order.
    ///
    /// Transient fields (those not following the naming convention) are
    /// filtered out here, so audit tooling never sees them.
    pub fn persisted_fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|field| is_persisted(field.name))
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Returns `true` when a field name follows the persisted-field convention:
/// a short uppercase alphanumeric code (2 to 4 characters, at least one
/// letter), an underscore, then a non-empty attribute name.
///
/// `ABC_VALUE` is persisted; `internalCache`, `collectionSize` and `_X`
/// are transient.
#[must_use]
pub fn is_persisted(name: &str) -> bool {
    let Some(separator) = name.find('_') else {
        return false;
    };
    if !(2..=4).contains(&separator) || separator + 1 >= name.len() {
        return false;
    }
    let prefix = &name[..separator];
    prefix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && prefix.chars().any(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convention_accepts_coded_names() {
        assert!(is_persisted("ABC_VALUE"));
        assert!(is_persisted("CHL_KEY_NAME"));
        assert!(is_persisted("AB_X"));
        assert!(is_persisted("A1B2_X"));
    }

    #[test]
    fn convention_rejects_transient_names() {
        assert!(!is_persisted("internalCache"));
        assert!(!is_persisted("collectionSize"));
        assert!(!is_persisted("abc_value"));
        assert!(!is_persisted("A_X"));
        assert!(!is_persisted("TOOLONG_X"));
        assert!(!is_persisted("ABC_"));
        assert!(!is_persisted("ABC"));
        assert!(!is_persisted("12_X"));
    }

    #[test]
    fn persisted_fields_filters_and_keeps_order() {
        static FIELDS: [FieldDescriptor; 3] = [
            FieldDescriptor::new("ABC_ID"),
            FieldDescriptor::new("internalCache"),
            FieldDescriptor::redacted("ABC_DATA"),
        ];
        static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
            name: "Probe",
            table: "ABC",
            fields: &FIELDS,
            key: &["ABC_ID"],
            generated: None,
        };

        let names: Vec<_> = DESCRIPTOR.persisted_fields().map(|f| f.name).collect();
        assert_eq!(names, vec!["ABC_ID", "ABC_DATA"]);
        assert!(DESCRIPTOR.field("ABC_DATA").unwrap().redact);
        assert!(!DESCRIPTOR.field("ABC_ID").unwrap().redact);
    }
}
