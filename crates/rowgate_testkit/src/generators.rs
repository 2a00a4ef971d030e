//! Property-based test generators.

use proptest::prelude::*;
use rowgate_engine::{Row, Value};

/// Strategy producing arbitrary cell values.
///
/// Floats are drawn from a finite range so comparisons stay exact.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1_000_000i64..1_000_000).prop_map(|n| Value::Float(n as f64 / 16.0)),
        "[a-z0-9 ]{0,24}".prop_map(Value::text),
    ]
}

/// Strategy producing persisted-convention column names (`ABC_NAME`).
pub fn column_name_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{3}_[A-Z]{1,8}"
}

/// Strategy producing rows with up to six uniquely named columns.
pub fn row_strategy() -> impl Strategy<Value = Row> {
    proptest::collection::btree_map(column_name_strategy(), value_strategy(), 0..6).prop_map(
        |columns| {
            let mut row = Row::new();
            for (name, value) in columns {
                row.set(&name, value);
            }
            row
        },
    )
}

/// Strategy producing embedded configuration text: `key = value` lines,
/// some of which carry the default volatile marker.
pub fn config_text_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            ("[a-z]{2,8}", "[a-z0-9]{0,10}").prop_map(|(k, v)| format!("{k} = {v}")),
            "[0-9]{1,8}".prop_map(|v| format!("ectrans.lastupdate = \"{v}\"")),
        ],
        0..8,
    )
    .prop_map(|lines| lines.join("\n"))
}

/// Strategy producing short word-made lines for diff properties.
pub fn line_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,6}", 0..10).prop_map(|words| words.join(" "))
}
