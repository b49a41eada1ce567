//! Dry-run driver.
//!
//! [`RecordingDriver`] executes nothing. It records every statement it is
//! handed and answers queries with no rows, unless rows were scripted for a
//! statement fragment with [`RecordingDriver::with_rows`]. Against an
//! unscripted recorder every collection looks missing, so a sync prints the
//! full DDL for an empty database.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::identifier::{escape_value, quote_backtick, quote_double, LiteralStyle, Timezone};
use crate::core::traits::Driver;
use crate::core::value::{Row, SqlValue};
use crate::error::DriverError;

/// Driver that records statements instead of running them.
#[derive(Debug)]
pub struct RecordingDriver {
    dialect: String,
    timezone: Timezone,
    scripted: Vec<(String, Vec<Row>)>,
    statements: Mutex<Vec<String>>,
}

impl RecordingDriver {
    /// Create a recorder that quotes and escapes like `dialect`.
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            timezone: Timezone::Local,
            scripted: Vec::new(),
            statements: Mutex::new(Vec::new()),
        }
    }

    /// Timezone for temporal literals.
    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Answer statements containing `fragment` with `rows`. The first
    /// matching fragment wins.
    pub fn with_rows(mut self, fragment: impl Into<String>, rows: Vec<Row>) -> Self {
        self.scripted.push((fragment.into(), rows));
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<String>> {
        // A poisoned log is still a valid list of strings
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every statement received, in order.
    pub fn statements(&self) -> Vec<String> {
        self.log().clone()
    }

    /// Statements that would change the schema (catalog reads left out).
    pub fn ddl(&self) -> Vec<String> {
        self.log()
            .iter()
            .filter(|sql| !is_catalog_read(sql))
            .cloned()
            .collect()
    }

    fn literal_style(&self) -> LiteralStyle {
        match self.dialect.as_str() {
            "mysql" | "mariadb" => LiteralStyle::Mysql,
            "sqlite" => LiteralStyle::Sqlite,
            _ => LiteralStyle::Postgres,
        }
    }
}

fn is_catalog_read(sql: &str) -> bool {
    let head = sql.trim_start().get(..6).unwrap_or_default();
    head.eq_ignore_ascii_case("SELECT") || head.eq_ignore_ascii_case("PRAGMA")
}

#[async_trait]
impl Driver for RecordingDriver {
    fn dialect(&self) -> &str {
        &self.dialect
    }

    fn escape_id(&self, name: &str) -> String {
        match self.literal_style() {
            LiteralStyle::Mysql => quote_backtick(name),
            LiteralStyle::Postgres | LiteralStyle::Sqlite => quote_double(name),
        }
    }

    fn escape_value(&self, value: &SqlValue) -> String {
        escape_value(value, self.literal_style(), self.timezone)
    }

    async fn execute(&self, sql: &str) -> std::result::Result<Vec<Row>, DriverError> {
        self.log().push(sql.to_string());
        Ok(self
            .scripted
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}
