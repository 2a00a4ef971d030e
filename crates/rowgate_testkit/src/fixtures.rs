//! Sample entities and in-memory factory fixtures.

use rowgate_core::{
    require_bool, require_int, require_text, Broker, BrokerExt, BrokerFactory, Config, CoreResult,
    Entity, EntityDescriptor, FieldDescriptor,
};
use rowgate_engine::{Engine, Key, MemoryEngine, Row, Value};
use std::sync::Arc;

/// A simple entity with a generated single-column key.
#[derive(Debug, Clone)]
pub struct Account {
    /// Generated key (0 until stored).
    pub id: i64,
    /// Display name.
    pub name: String,
}

static ACCOUNT_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::new("ACC_ID"),
    FieldDescriptor::new("ACC_NAME"),
];
static ACCOUNT: EntityDescriptor = EntityDescriptor {
    name: "Account",
    table: "ACC",
    fields: &ACCOUNT_FIELDS,
    key: &["ACC_ID"],
    generated: Some("ACC_ID"),
};

impl Account {
    /// Creates an unstored account (key assigned on store).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }

    /// Creates a key-only probe for lookups.
    #[must_use]
    pub fn probe(id: i64) -> Self {
        Self {
            id,
            name: String::new(),
        }
    }
}

impl Entity for Account {
    fn descriptor() -> &'static EntityDescriptor {
        &ACCOUNT
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("ACC_ID", Value::Int(self.id))
            .with("ACC_NAME", Value::text(self.name.clone()))
    }

    fn from_row(row: &Row) -> CoreResult<Self> {
        Ok(Self {
            id: require_int("Account", row, "ACC_ID")?,
            name: require_text("Account", row, "ACC_NAME")?,
        })
    }

    fn key(&self) -> Key {
        Key::single("ACC_ID", Value::Int(self.id))
    }

    fn apply_generated_key(&mut self, value: i64) {
        self.id = value;
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// An entity with an embedded configuration-text field subject to
/// redaction, and a transient aggregate-size hint.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Generated key (0 until stored).
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Embedded configuration text (`key = value` lines).
    pub setup: String,
    /// Whether the channel is live.
    pub active: bool,
    /// Transient hint set when this instance stands for a paged result.
    pub aggregate_size: Option<usize>,
}

static CHANNEL_FIELDS: [FieldDescriptor; 4] = [
    FieldDescriptor::new("CHA_ID"),
    FieldDescriptor::new("CHA_NAME"),
    FieldDescriptor::redacted("CHA_SETUP"),
    FieldDescriptor::new("CHA_ACTIVE"),
];
static CHANNEL: EntityDescriptor = EntityDescriptor {
    name: "Channel",
    table: "CHA",
    fields: &CHANNEL_FIELDS,
    key: &["CHA_ID"],
    generated: Some("CHA_ID"),
};

impl Channel {
    /// Creates an unstored channel.
    pub fn new(name: impl Into<String>, setup: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            setup: setup.into(),
            active: true,
            aggregate_size: None,
        }
    }

    /// Creates a key-only probe for lookups.
    #[must_use]
    pub fn probe(id: i64) -> Self {
        Self {
            id,
            name: String::new(),
            setup: String::new(),
            active: false,
            aggregate_size: None,
        }
    }
}

impl Entity for Channel {
    fn descriptor() -> &'static EntityDescriptor {
        &CHANNEL
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("CHA_ID", Value::Int(self.id))
            .with("CHA_NAME", Value::text(self.name.clone()))
            .with("CHA_SETUP", Value::text(self.setup.clone()))
            .with("CHA_ACTIVE", Value::Bool(self.active))
    }

    fn from_row(row: &Row) -> CoreResult<Self> {
        Ok(Self {
            id: require_int("Channel", row, "CHA_ID")?,
            name: require_text("Channel", row, "CHA_NAME")?,
            setup: require_text("Channel", row, "CHA_SETUP")?,
            active: require_bool("Channel", row, "CHA_ACTIVE")?,
            aggregate_size: None,
        })
    }

    fn key(&self) -> Key {
        Key::single("CHA_ID", Value::Int(self.id))
    }

    fn apply_generated_key(&mut self, value: i64) {
        self.id = value;
    }

    fn collection_size(&self) -> Option<usize> {
        self.aggregate_size
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// An entity with a composite natural key and no generated column.
#[derive(Debug, Clone)]
pub struct Grant {
    /// First key column: grantee.
    pub user: String,
    /// Second key column: granted role.
    pub role: String,
    /// Free-form note.
    pub comment: String,
}

static GRANT_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::new("GRA_USER"),
    FieldDescriptor::new("GRA_ROLE"),
    FieldDescriptor::new("GRA_COMMENT"),
];
static GRANT: EntityDescriptor = EntityDescriptor {
    name: "Grant",
    table: "GRA",
    fields: &GRANT_FIELDS,
    key: &["GRA_USER", "GRA_ROLE"],
    generated: None,
};

impl Grant {
    /// Creates a grant.
    pub fn new(
        user: impl Into<String>,
        role: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            role: role.into(),
            comment: comment.into(),
        }
    }
}

impl Entity for Grant {
    fn descriptor() -> &'static EntityDescriptor {
        &GRANT
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("GRA_USER", Value::text(self.user.clone()))
            .with("GRA_ROLE", Value::text(self.role.clone()))
            .with("GRA_COMMENT", Value::text(self.comment.clone()))
    }

    fn from_row(row: &Row) -> CoreResult<Self> {
        Ok(Self {
            user: require_text("Grant", row, "GRA_USER")?,
            role: require_text("Grant", row, "GRA_ROLE")?,
            comment: require_text("Grant", row, "GRA_COMMENT")?,
        })
    }

    fn key(&self) -> Key {
        Key::composite(vec![
            ("GRA_USER".to_string(), Value::text(self.user.clone())),
            ("GRA_ROLE".to_string(), Value::text(self.role.clone())),
        ])
    }
}

impl PartialEq for Grant {
    fn eq(&self, other: &Self) -> bool {
        self.user == other.user && self.role == other.role
    }
}

/// A broker factory over a private in-memory engine, for tests.
pub struct TestStore {
    /// The engine, kept for direct seeding and row counting.
    pub engine: Arc<MemoryEngine>,
    /// The factory under test.
    pub factory: BrokerFactory,
}

impl TestStore {
    /// Creates a store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a store with a specific configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let engine = Arc::new(MemoryEngine::new());
        let factory = BrokerFactory::new(Arc::clone(&engine) as Arc<dyn Engine>, config);
        Self { engine, factory }
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test against a fresh in-memory store.
pub fn with_store<F: FnOnce(&TestStore)>(test: F) {
    test(&TestStore::new());
}

/// Stores one account per name, returning the generated ids.
///
/// # Panics
///
/// Panics on any broker failure; this is a test fixture.
pub fn seed_accounts(store: &TestStore, names: &[&str]) -> Vec<i64> {
    let mut broker = store.factory.broker().expect("open broker");
    let mut ids = Vec::new();
    for name in names {
        let mut account = Account::new(*name);
        broker.store(&mut account, false).expect("store account");
        ids.push(account.id);
    }
    broker.release(true).expect("release broker");
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_assigns_sequential_ids() {
        with_store(|store| {
            let ids = seed_accounts(store, &["anna", "beth"]);
            assert_eq!(ids, vec![1, 2]);
            assert_eq!(store.engine.row_count("ACC"), 2);
        });
    }

    #[test]
    fn entity_identity_is_the_natural_key() {
        let a = Account {
            id: 1,
            name: "x".into(),
        };
        let b = Account {
            id: 1,
            name: "completely different".into(),
        };
        assert_eq!(a, b);

        let g1 = Grant::new("anna", "admin", "one");
        let g2 = Grant::new("anna", "admin", "two");
        let g3 = Grant::new("anna", "guest", "one");
        assert_eq!(g1, g2);
        assert_ne!(g1, g3);
    }

    #[test]
    fn collection_size_is_a_transient_hint() {
        let mut channel = Channel::new("c", "");
        assert_eq!(channel.collection_size(), None);
        channel.aggregate_size = Some(12);
        assert_eq!(channel.collection_size(), Some(12));
        // Never part of the persisted row.
        assert_eq!(channel.to_row().len(), 4);
    }
}
