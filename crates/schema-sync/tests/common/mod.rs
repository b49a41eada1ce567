//! Scripted in-memory driver shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use schema_sync::core::identifier::{escape_value, quote_backtick, quote_double, LiteralStyle, Timezone};
use schema_sync::{
    Driver, DriverError, PropertyDescriptor, PropertyMap, Row, SqlValue, SyncOptions, Synchronizer,
};

/// Driver that records statements, answers scripted queries and fails on
/// demand.
pub struct MockDriver {
    dialect: &'static str,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<(String, String)>,
    log: Mutex<Vec<String>>,
}

impl MockDriver {
    pub fn new(dialect: &'static str) -> Self {
        Self {
            dialect,
            responses: Vec::new(),
            failures: Vec::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Answer statements containing `fragment` with `rows`.
    pub fn respond(mut self, fragment: &str, rows: Vec<Row>) -> Self {
        self.responses.push((fragment.to_string(), rows));
        self
    }

    /// Fail statements containing `fragment` with `message`.
    pub fn fail_on(mut self, fragment: &str, message: &str) -> Self {
        self.failures.push((fragment.to_string(), message.to_string()));
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Statements other than catalog reads.
    pub fn ddl(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| !s.starts_with("SELECT") && !s.starts_with("PRAGMA"))
            .collect()
    }

    fn style(&self) -> LiteralStyle {
        match self.dialect {
            "mysql" => LiteralStyle::Mysql,
            "sqlite" => LiteralStyle::Sqlite,
            _ => LiteralStyle::Postgres,
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn dialect(&self) -> &str {
        self.dialect
    }

    fn escape_id(&self, name: &str) -> String {
        match self.style() {
            LiteralStyle::Mysql => quote_backtick(name),
            _ => quote_double(name),
        }
    }

    fn escape_value(&self, value: &SqlValue) -> String {
        escape_value(value, self.style(), Timezone::Local)
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>, DriverError> {
        self.log.lock().unwrap().push(sql.to_string());
        if let Some((_, message)) = self.failures.iter().find(|(f, _)| sql.contains(f.as_str())) {
            return Err(DriverError::new(message.clone()));
        }
        Ok(self
            .responses
            .iter()
            .find(|(f, _)| sql.contains(f.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

/// Build a property map from `(name, descriptor)` pairs, keeping order.
pub fn props(entries: Vec<(&str, PropertyDescriptor)>) -> PropertyMap {
    entries
        .into_iter()
        .map(|(name, prop)| (name.to_string(), prop))
        .collect()
}

/// A synchronizer bound to a shared mock.
pub fn synchronizer(driver: MockDriver, options: SyncOptions) -> (Arc<MockDriver>, Synchronizer) {
    let driver = Arc::new(driver);
    let sync = Synchronizer::new(driver.clone(), options).unwrap();
    (driver, sync)
}
