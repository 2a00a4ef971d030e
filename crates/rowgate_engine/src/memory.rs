//! In-memory engine adapter.

use crate::dialect::{parse_command, parse_predicate, Command, SelectCommand};
use crate::engine::{Cursor, Engine, Session, Statement};
use crate::error::{EngineError, EngineResult};
use crate::value::{Key, Row, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

const NULL: Value = Value::Null;

/// An in-memory persistence engine.
///
/// This adapter stores all rows in memory and is suitable for:
/// - Unit and integration tests
/// - Ephemeral deployments that don't need persistence
///
/// Tables are created on first insert; rows are kept in insertion order;
/// each table has its own generated-key counter starting at 1.
///
/// # Thread Safety
///
/// The engine is thread-safe and can be shared across threads; each session
/// obtained from it is single-threaded.
///
/// # Example
///
/// ```rust
/// use rowgate_engine::{Engine, Key, MemoryEngine, Row, Session, Value};
///
/// let engine = MemoryEngine::new();
/// let mut session = engine.open_session().unwrap();
/// let row = Row::new().with("ACC_ID", Value::Int(1)).with("ACC_NAME", Value::text("anna"));
/// let key = Key::single("ACC_ID", Value::Int(1));
/// session.insert("ACC", &row, &key, None).unwrap();
/// assert_eq!(session.fetch("ACC", &key).unwrap(), Some(row));
/// session.close(true).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    last_key: i64,
}

impl MemoryEngine {
    /// Creates a new empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows currently in a table.
    ///
    /// Useful for tests and diagnostics.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Drops all tables and rows.
    pub fn clear(&self) {
        self.tables.write().clear();
    }
}

impl Engine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    fn open_session(&self) -> EngineResult<Box<dyn Session>> {
        Ok(Box::new(MemorySession {
            tables: Arc::clone(&self.tables),
            closed: false,
        }))
    }
}

struct MemorySession {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            Err(EngineError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

impl Session for MemorySession {
    fn fetch(&mut self, table: &str, key: &Key) -> EngineResult<Option<Row>> {
        self.ensure_open()?;
        let tables = self.tables.read();
        Ok(tables
            .get(table)
            .and_then(|t| t.rows.iter().find(|row| key.matches(row)))
            .cloned())
    }

    fn insert(
        &mut self,
        table: &str,
        row: &Row,
        key: &Key,
        generated: Option<&str>,
    ) -> EngineResult<Option<i64>> {
        self.ensure_open()?;
        let mut tables = self.tables.write();
        let entry = tables.entry(table.to_string()).or_default();

        let mut stored = row.clone();
        let mut assigned = None;
        if let Some(column) = generated {
            let current = stored.get(column).cloned().unwrap_or(Value::Null);
            if current.is_unset() {
                entry.last_key += 1;
                stored.set(column, Value::Int(entry.last_key));
                assigned = Some(entry.last_key);
            } else if let Value::Int(explicit) = current {
                // Explicit keys advance the counter so later generated keys
                // never collide with them.
                entry.last_key = entry.last_key.max(explicit);
            }
        }

        let effective = Key::composite(
            key.parts()
                .iter()
                .map(|(column, value)| {
                    let value = stored.get(column).cloned().unwrap_or_else(|| value.clone());
                    (column.clone(), value)
                })
                .collect(),
        );
        if !effective.is_unset() && entry.rows.iter().any(|existing| effective.matches(existing)) {
            return Err(EngineError::constraint_violation(format!(
                "duplicate key in table {table}: {}",
                effective.render()
            )));
        }

        entry.rows.push(stored);
        Ok(assigned)
    }

    fn update(&mut self, table: &str, key: &Key, row: &Row) -> EngineResult<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write();
        let existing = tables
            .get_mut(table)
            .and_then(|t| t.rows.iter_mut().find(|candidate| key.matches(candidate)));
        match existing {
            Some(target) => {
                target.merge(row);
                Ok(())
            }
            None => Err(EngineError::row_not_found(table, key.render())),
        }
    }

    fn delete(&mut self, table: &str, key: &Key) -> EngineResult<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write();
        let Some(entry) = tables.get_mut(table) else {
            return Err(EngineError::row_not_found(table, key.render()));
        };
        match entry.rows.iter().position(|row| key.matches(row)) {
            Some(index) => {
                entry.rows.remove(index);
                Ok(())
            }
            None => Err(EngineError::row_not_found(table, key.render())),
        }
    }

    fn prepare(&mut self, sql: &str) -> EngineResult<Box<dyn Statement>> {
        self.ensure_open()?;
        let command = parse_command(sql)?;
        Ok(Box::new(MemoryStatement {
            tables: Arc::clone(&self.tables),
            command,
            closed: false,
        }))
    }

    fn scan(&mut self, table: &str, predicate: Option<&str>) -> EngineResult<Box<dyn Statement>> {
        self.ensure_open()?;
        let predicate = parse_predicate(predicate.unwrap_or(""))?;
        Ok(Box::new(MemoryStatement {
            tables: Arc::clone(&self.tables),
            command: Command::Select(SelectCommand {
                table: table.to_string(),
                filters: predicate.filters,
                order: predicate.order,
            }),
            closed: false,
        }))
    }

    fn close(&mut self, _success: bool) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

struct MemoryStatement {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    command: Command,
    closed: bool,
}

impl Statement for MemoryStatement {
    fn execute_query(&mut self) -> EngineResult<Box<dyn Cursor>> {
        if self.closed {
            return Err(EngineError::StatementClosed);
        }
        let Command::Select(select) = &self.command else {
            return Err(EngineError::invalid_query(
                "statement does not produce rows",
            ));
        };

        let tables = self.tables.read();
        let mut rows: Vec<Row> = tables
            .get(&select.table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|row| {
                        select
                            .filters
                            .iter()
                            .all(|filter| row.get(&filter.column) == Some(&filter.value))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &select.order {
            rows.sort_by(|a, b| {
                let left = a.get(&order.column).unwrap_or(&NULL);
                let right = b.get(&order.column).unwrap_or(&NULL);
                let ordering = left.cmp_total(right);
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(Box::new(MemoryCursor {
            rows,
            pos: 0,
            closed: false,
        }))
    }

    fn execute_update(&mut self) -> EngineResult<u64> {
        if self.closed {
            return Err(EngineError::StatementClosed);
        }
        match &self.command {
            Command::Select(_) => Err(EngineError::invalid_query(
                "statement produces rows; use execute_query",
            )),
            Command::Delete(delete) => {
                let mut tables = self.tables.write();
                let Some(entry) = tables.get_mut(&delete.table) else {
                    return Ok(0);
                };
                let before = entry.rows.len();
                entry.rows.retain(|row| {
                    !delete
                        .filters
                        .iter()
                        .all(|filter| row.get(&filter.column) == Some(&filter.value))
                });
                Ok((before - entry.rows.len()) as u64)
            }
            Command::Update(update) => {
                let mut tables = self.tables.write();
                let Some(entry) = tables.get_mut(&update.table) else {
                    return Ok(0);
                };
                let mut affected = 0;
                for row in entry.rows.iter_mut() {
                    let matches = update
                        .filters
                        .iter()
                        .all(|filter| row.get(&filter.column) == Some(&filter.value));
                    if matches {
                        for (column, value) in &update.assignments {
                            row.set(column, value.clone());
                        }
                        affected += 1;
                    }
                }
                Ok(affected)
            }
        }
    }

    fn close(&mut self) -> EngineResult<()> {
        self.closed = true;
        Ok(())
    }
}

struct MemoryCursor {
    rows: Vec<Row>,
    pos: usize,
    closed: bool,
}

impl Cursor for MemoryCursor {
    fn next_row(&mut self) -> EngineResult<Option<Row>> {
        if self.closed {
            return Err(EngineError::CursorClosed);
        }
        let row = self.rows.get(self.pos).cloned();
        if row.is_some() {
            self.pos += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> EngineResult<()> {
        self.closed = true;
        Ok(())
    }
}
