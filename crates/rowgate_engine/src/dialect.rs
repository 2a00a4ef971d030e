//! Minimal query dialect for adapters without a native parser.
//!
//! The dialect covers exactly what the default adapter executes: single-table
//! `SELECT` / `UPDATE` / `DELETE` with equality predicates and an optional
//! `ORDER BY`, plus a bare predicate form used by table scans. SQL dialect
//! specifics beyond this subset belong to the concrete engine behind the
//! boundary, not to this crate.
//!
//! The parser is a hand-rolled single pass: tokenize, then descend. No
//! regular expressions, no external parser.

use crate::error::{EngineError, EngineResult};
use crate::value::Value;

/// An equality filter: `column = literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name.
    pub column: String,
    /// Literal the column must equal.
    pub value: Value,
}

/// An `ORDER BY` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Column to order by.
    pub column: String,
    /// `true` for descending order.
    pub descending: bool,
}

/// A parsed `SELECT * FROM ...` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCommand {
    /// Table to read.
    pub table: String,
    /// Equality filters, all of which must match.
    pub filters: Vec<Filter>,
    /// Optional ordering.
    pub order: Option<OrderBy>,
}

/// A parsed `UPDATE ... SET ...` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    /// Table to update.
    pub table: String,
    /// `column = literal` assignments, applied in order.
    pub assignments: Vec<(String, Value)>,
    /// Equality filters selecting the rows to update.
    pub filters: Vec<Filter>,
}

/// A parsed `DELETE FROM ...` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteCommand {
    /// Table to delete from.
    pub table: String,
    /// Equality filters selecting the rows to delete.
    pub filters: Vec<Filter>,
}

/// Any statement the dialect accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A query producing rows.
    Select(SelectCommand),
    /// A row update.
    Update(UpdateCommand),
    /// A row deletion.
    Delete(DeleteCommand),
}

/// The bare predicate form used by table scans: filters plus ordering,
/// without a statement head.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    /// Equality filters, all of which must match. Empty matches everything.
    pub filters: Vec<Filter>,
    /// Optional ordering.
    pub order: Option<OrderBy>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Text(String),
    Number(String),
    Symbol(char),
}

fn tokenize(input: &str) -> EngineResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '\'' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('\'') => {
                        // '' is an escaped quote inside the literal
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            text.push('\'');
                        } else {
                            break;
                        }
                    }
                    Some(other) => text.push(other),
                    None => {
                        return Err(EngineError::invalid_query("unterminated string literal"))
                    }
                }
            }
            tokens.push(Token::Text(text));
        } else if ch.is_ascii_digit() || ch == '-' {
            let mut number = String::new();
            number.push(ch);
            chars.next();
            if ch == '-' && !chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(EngineError::invalid_query("dangling '-'"));
            }
            while let Some(&digit) = chars.peek() {
                if digit.is_ascii_digit() || digit == '.' {
                    number.push(digit);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(number));
        } else if ch.is_ascii_alphabetic() || ch == '_' {
            let mut word = String::new();
            while let Some(&part) = chars.peek() {
                if part.is_ascii_alphanumeric() || part == '_' || part == '.' {
                    word.push(part);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(word));
        } else if ch == '=' || ch == ',' || ch == '*' {
            tokens.push(Token::Symbol(ch));
            chars.next();
        } else {
            return Err(EngineError::invalid_query(format!(
                "unexpected character {ch:?}"
            )));
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn expect_keyword(&mut self, keyword: &str) -> EngineResult<()> {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(EngineError::invalid_query(format!("expected {keyword}")))
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> EngineResult<()> {
        match self.next() {
            Some(Token::Symbol(found)) if found == symbol => Ok(()),
            _ => Err(EngineError::invalid_query(format!("expected '{symbol}'"))),
        }
    }

    fn identifier(&mut self, what: &str) -> EngineResult<String> {
        match self.next() {
            Some(Token::Word(word)) => Ok(word),
            _ => Err(EngineError::invalid_query(format!("expected {what}"))),
        }
    }

    fn literal(&mut self) -> EngineResult<Value> {
        match self.next() {
            Some(Token::Text(text)) => Ok(Value::Text(text)),
            Some(Token::Number(number)) => {
                if let Ok(int) = number.parse::<i64>() {
                    Ok(Value::Int(int))
                } else {
                    number.parse::<f64>().map(Value::Float).map_err(|_| {
                        EngineError::invalid_query(format!("malformed number {number:?}"))
                    })
                }
            }
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("null") => Ok(Value::Null),
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("false") => {
                Ok(Value::Bool(false))
            }
            _ => Err(EngineError::invalid_query("expected literal")),
        }
    }

    /// `column = literal [AND column = literal ...]`
    fn filters(&mut self) -> EngineResult<Vec<Filter>> {
        let mut filters = Vec::new();
        loop {
            let column = self.identifier("filter column")?;
            self.expect_symbol('=')?;
            let value = self.literal()?;
            filters.push(Filter { column, value });
            if self.peek_keyword("and") {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(filters)
    }

    /// `ORDER BY column [ASC|DESC]`, if present.
    fn order(&mut self) -> EngineResult<Option<OrderBy>> {
        if !self.peek_keyword("order") {
            return Ok(None);
        }
        self.pos += 1;
        self.expect_keyword("by")?;
        let column = self.identifier("order column")?;
        let mut descending = false;
        if self.peek_keyword("desc") {
            self.pos += 1;
            descending = true;
        } else if self.peek_keyword("asc") {
            self.pos += 1;
        }
        Ok(Some(OrderBy { column, descending }))
    }

    fn finish(&self) -> EngineResult<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(EngineError::invalid_query("unexpected trailing input"))
        }
    }
}

/// Parses a full statement.
///
/// # Errors
///
/// Returns `InvalidQuery` for anything outside the dialect subset.
pub fn parse_command(sql: &str) -> EngineResult<Command> {
    let mut parser = Parser::new(tokenize(sql)?);

    let command = if parser.peek_keyword("select") {
        parser.pos += 1;
        parser.expect_symbol('*')?;
        parser.expect_keyword("from")?;
        let table = parser.identifier("table name")?;
        let filters = if parser.peek_keyword("where") {
            parser.pos += 1;
            parser.filters()?
        } else {
            Vec::new()
        };
        let order = parser.order()?;
        Command::Select(SelectCommand {
            table,
            filters,
            order,
        })
    } else if parser.peek_keyword("delete") {
        parser.pos += 1;
        parser.expect_keyword("from")?;
        let table = parser.identifier("table name")?;
        let filters = if parser.peek_keyword("where") {
            parser.pos += 1;
            parser.filters()?
        } else {
            Vec::new()
        };
        Command::Delete(DeleteCommand { table, filters })
    } else if parser.peek_keyword("update") {
        parser.pos += 1;
        let table = parser.identifier("table name")?;
        parser.expect_keyword("set")?;
        let mut assignments = Vec::new();
        loop {
            let column = parser.identifier("assignment column")?;
            parser.expect_symbol('=')?;
            let value = parser.literal()?;
            assignments.push((column, value));
            if matches!(parser.peek(), Some(Token::Symbol(','))) {
                parser.pos += 1;
            } else {
                break;
            }
        }
        let filters = if parser.peek_keyword("where") {
            parser.pos += 1;
            parser.filters()?
        } else {
            Vec::new()
        };
        Command::Update(UpdateCommand {
            table,
            assignments,
            filters,
        })
    } else {
        return Err(EngineError::invalid_query(
            "expected SELECT, UPDATE or DELETE",
        ));
    };

    parser.finish()?;
    Ok(command)
}

/// Parses the bare predicate form used by table scans.
///
/// The leading `WHERE` keyword is optional; an empty string matches
/// everything.
///
/// # Errors
///
/// Returns `InvalidQuery` for anything outside the predicate subset.
pub fn parse_predicate(input: &str) -> EngineResult<Predicate> {
    let mut parser = Parser::new(tokenize(input)?);
    if parser.at_end() {
        return Ok(Predicate::default());
    }

    if parser.peek_keyword("where") {
        parser.pos += 1;
    }
    let filters = if parser.peek_keyword("order") || parser.at_end() {
        Vec::new()
    } else {
        parser.filters()?
    };
    let order = parser.order()?;
    parser.finish()?;
    Ok(Predicate { filters, order })
}
