//! Sync orchestrator - reconciles declared collections with the live schema.

pub mod builder;
pub mod diff;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::identifier::validate_identifier;
use crate::core::property::PropertyDescriptor;
use crate::core::schema::{
    CollectionDefinition, ColumnMap, ColumnPlan, IndexSpec, KeyColumn, Prerequisite, PropertyMap,
};
use crate::core::traits::{CustomType, DialectAdapter, Driver};
use crate::drivers::DialectImpl;
use crate::error::{Result, SyncError};
use crate::queue::Queue;

pub use builder::CustomTypes;

/// Options controlling what a sync may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Diff existing tables and alter them to match. Off by default: only
    /// missing tables are created.
    pub alter_existing: bool,

    /// Keep live columns that no property declares.
    pub suppress_column_drop: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            alter_existing: false,
            suppress_column_drop: true,
        }
    }
}

/// Options for [`Synchronizer::drop`].
#[derive(Debug, Clone, Default)]
pub struct DropOptions {
    /// Restrict to these collections. `None` drops every registered one.
    pub collections: Option<Vec<String>>,
}

/// What a sync did to one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CollectionOutcome {
    Created,
    Unchanged,
    Altered { changes: usize },
}

/// Per-collection entry of a [`SyncReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub name: String,

    #[serde(flatten)]
    pub outcome: CollectionOutcome,
}

/// Result of a sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Unique run identifier.
    pub run_id: String,

    /// When the sync started.
    pub started_at: DateTime<Utc>,

    /// When the sync completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Outcome per collection, in registration order.
    pub collections: Vec<CollectionReport>,

    /// Total statements issued (table, column and index changes).
    pub changes: usize,
}

/// Result of a drop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropReport {
    /// Tables dropped, in the order the statements were issued.
    pub tables: Vec<String>,
}

/// One planned column change on the alter path.
enum ColumnStep<'c> {
    Add {
        column: String,
        prerequisite: Option<Prerequisite>,
        after: Option<&'c str>,
    },
    Modify {
        name: &'c str,
        column: String,
        prerequisite: Option<Prerequisite>,
        property: &'c PropertyDescriptor,
    },
    Drop {
        name: &'c str,
    },
}

/// Schema synchronizer.
///
/// Holds the registered collections and custom types and is bound to one
/// driver and the dialect adapter chosen for it.
pub struct Synchronizer {
    driver: Arc<dyn Driver>,
    dialect: DialectImpl,
    options: SyncOptions,
    collections: Vec<CollectionDefinition>,
    types: CustomTypes,
    join_tables: HashMap<String, Vec<String>>,
}

impl Synchronizer {
    /// Create a synchronizer for a driver, picking the adapter from the
    /// driver's dialect.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DialectNotFound`] for an unknown dialect.
    pub fn new(driver: Arc<dyn Driver>, options: SyncOptions) -> Result<Self> {
        let dialect = DialectImpl::from_dialect(driver.dialect())?;
        Ok(Self::with_dialect(driver, dialect, options))
    }

    /// Create a synchronizer with an explicit adapter.
    pub fn with_dialect(driver: Arc<dyn Driver>, dialect: DialectImpl, options: SyncOptions) -> Self {
        Self {
            driver,
            dialect,
            options,
            collections: Vec::new(),
            types: CustomTypes::new(),
            join_tables: HashMap::new(),
        }
    }

    /// The bound dialect adapter.
    pub fn dialect(&self) -> &DialectImpl {
        &self.dialect
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Registered collections, in registration order.
    pub fn collections(&self) -> &[CollectionDefinition] {
        &self.collections
    }

    /// Register a collection.
    ///
    /// # Errors
    ///
    /// Rejects invalid table or column names, invalid property descriptors
    /// and a name that is already registered. Property combinations the
    /// dialect cannot express, such as an index on a dialect without
    /// secondary indexes, are [`SyncError::Unsupported`].
    pub fn define_collection(&mut self, name: impl Into<String>, properties: PropertyMap) -> Result<()> {
        let name = name.into();
        validate_identifier(&name)?;
        if self.collections.iter().any(|c| c.name == name) {
            return Err(SyncError::Config(format!(
                "Collection '{}' is already defined",
                name
            )));
        }
        for (prop_name, property) in &properties {
            builder::validate_property(&name, prop_name, property)?;
        }

        let collection = CollectionDefinition::new(name, properties);
        self.dialect.validate_collection(&collection)?;
        if !self.dialect.supports_indexes() {
            if let Some(index) = self.collection_indexes(&collection).first() {
                return Err(SyncError::unsupported(
                    self.dialect.name(),
                    format!("index '{}' on '{}'", index.name, collection.name),
                ));
            }
        }

        debug!(
            "Defined collection {} ({} properties)",
            collection.name,
            collection.properties.len()
        );
        self.collections.push(collection);
        Ok(())
    }

    /// Register a custom type. Properties whose type tag equals `name` use
    /// it instead of the dialect mapping.
    pub fn define_type(&mut self, name: impl Into<String>, definition: impl CustomType + 'static) {
        self.types.insert(name.into(), Box::new(definition));
    }

    /// Register many-to-many join tables dropped together with `collection`.
    pub fn define_join_tables<I, S>(&mut self, collection: &str, tables: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.join_tables.entry(collection.to_string()).or_default();
        for table in tables {
            let table = table.into();
            validate_identifier(&table)?;
            entry.push(table);
        }
        Ok(())
    }

    /// Check a declared property against its live column.
    pub fn need_to_sync(&self, declared: &PropertyDescriptor, live: &PropertyDescriptor) -> bool {
        diff::need_to_sync(&self.dialect, declared, live)
    }

    /// The indexes a collection declares, named for the bound dialect.
    pub fn collection_indexes(&self, collection: &CollectionDefinition) -> Vec<IndexSpec> {
        builder::collection_indexes(&self.dialect, collection)
    }

    /// Plan the column definition for one property of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownPropertyType`] when neither a custom type
    /// nor the dialect maps the property.
    pub fn create_column(
        &self,
        collection: &str,
        name: &str,
        property: &PropertyDescriptor,
    ) -> Result<ColumnPlan> {
        builder::create_column(
            &self.dialect,
            self.driver.as_ref(),
            &self.types,
            collection,
            name,
            property,
        )
        .ok_or_else(|| SyncError::unknown_type(collection, name))
    }

    /// Reconcile every registered collection with the database.
    ///
    /// Collections are processed one at a time in registration order. The
    /// first failure aborts the run and is returned on its own.
    pub async fn sync(&self) -> Result<SyncReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!(
            "Starting sync run {} ({} collections, dialect {})",
            run_id,
            self.collections.len(),
            self.dialect.name()
        );

        let mut collections = Vec::with_capacity(self.collections.len());
        let mut changes = 0;

        for collection in &self.collections {
            let (outcome, issued) = match self.sync_one(collection).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        "{}: sync failed after {} changes: {}",
                        collection.name, changes, e
                    );
                    return Err(e);
                }
            };
            changes += issued;
            collections.push(CollectionReport {
                name: collection.name.clone(),
                outcome,
            });
        }

        let completed_at = Utc::now();
        let duration_seconds = timer.elapsed().as_secs_f64();
        info!(
            "Sync complete: {} collections, {} changes in {:.2}s",
            collections.len(),
            changes,
            duration_seconds
        );

        Ok(SyncReport {
            run_id,
            started_at,
            completed_at,
            duration_seconds,
            collections,
            changes,
        })
    }

    async fn sync_one(&self, collection: &CollectionDefinition) -> Result<(CollectionOutcome, usize)> {
        let driver = self.driver.as_ref();

        if !self.dialect.has_collection(driver, &collection.name).await? {
            let changes = self.create_collection(collection).await?;
            info!("{}: created ({} statements)", collection.name, changes);
            return Ok((CollectionOutcome::Created, changes));
        }

        if !self.options.alter_existing {
            info!("{}: exists, skipped", collection.name);
            return Ok((CollectionOutcome::Unchanged, 0));
        }

        let changes = self.sync_collection(collection).await?;
        if changes == 0 {
            info!("{}: up to date", collection.name);
            Ok((CollectionOutcome::Unchanged, 0))
        } else {
            info!("{}: altered ({} changes)", collection.name, changes);
            Ok((CollectionOutcome::Altered { changes }, changes))
        }
    }

    /// Create a missing collection and its indexes.
    ///
    /// Column prerequisites run first, then the table, then the indexes.
    /// Returns the number of statements issued; a prerequisite that was
    /// already satisfied issues none.
    async fn create_collection(&self, collection: &CollectionDefinition) -> Result<usize> {
        let driver = self.driver.as_ref();
        let dialect = &self.dialect;

        let mut columns = Vec::with_capacity(collection.properties.len());
        let mut prerequisites = Vec::new();
        let mut keys = Vec::new();

        for (prop_name, property) in &collection.properties {
            let (prerequisite, column) = self
                .create_column(&collection.name, prop_name, property)?
                .into_parts();
            prerequisites.extend(prerequisite);
            columns.push(column);
            if property.key {
                keys.push(KeyColumn {
                    name: property.column_name(prop_name).to_string(),
                    serial: property.is_serial(),
                });
            }
        }
        let keys = dialect.process_keys(keys);

        let (table, columns, keys) = (collection.name.as_str(), &columns, &keys);
        let mut queue = Queue::new("create");
        for step in &prerequisites {
            queue.add(move || dialect.run_prerequisite(driver, step));
        }
        queue.add(move || async move {
            dialect
                .create_collection(driver, table, columns, keys)
                .await
                .map(|()| 1)
        });
        let mut changes: usize = queue.run().await?.into_iter().sum();

        let indexes = self.collection_indexes(collection);
        changes += self.sync_indexes(table, &indexes).await?;
        Ok(changes)
    }

    /// Alter an existing collection to match its declaration.
    ///
    /// Missing columns are added in declaration order after their preceding
    /// property, changed columns are modified, and undeclared live columns
    /// are dropped unless `suppress_column_drop` is set. Indexes are synced
    /// last. Returns the number of statements issued.
    pub async fn sync_collection(&self, collection: &CollectionDefinition) -> Result<usize> {
        let driver = self.driver.as_ref();
        let table = collection.name.as_str();
        let live: ColumnMap = self.dialect.get_collection_properties(driver, table).await?;

        let mut steps = Vec::new();
        let mut previous: Option<&str> = None;
        for (prop_name, property) in &collection.properties {
            let name = property.column_name(prop_name);
            match live.get(name) {
                None => {
                    let (prerequisite, column) =
                        self.create_column(table, prop_name, property)?.into_parts();
                    steps.push(ColumnStep::Add {
                        column,
                        prerequisite,
                        after: previous,
                    });
                }
                Some(current) if self.need_to_sync(property, current) => {
                    debug!("{}.{}: column differs from declaration", table, name);
                    let (prerequisite, column) =
                        self.create_column(table, prop_name, property)?.into_parts();
                    steps.push(ColumnStep::Modify {
                        name,
                        column,
                        prerequisite,
                        property,
                    });
                }
                Some(_) => {}
            }
            previous = Some(name);
        }

        if !self.options.suppress_column_drop {
            for name in live.keys() {
                if collection.property_for_column(name).is_none() {
                    steps.push(ColumnStep::Drop {
                        name: name.as_str(),
                    });
                }
            }
        }

        let mut queue = Queue::new("columns");
        for step in &steps {
            queue.add(move || self.apply_column_step(table, step));
        }
        let mut changes: usize = queue.run().await?.into_iter().sum();

        let indexes = self.collection_indexes(collection);
        changes += self.sync_indexes(table, &indexes).await?;
        Ok(changes)
    }

    /// Apply one column step, returning the number of changes it made.
    async fn apply_column_step(&self, table: &str, step: &ColumnStep<'_>) -> Result<usize> {
        let driver = self.driver.as_ref();
        let mut issued = 0;
        match step {
            ColumnStep::Add {
                column,
                prerequisite,
                after,
            } => {
                if let Some(prerequisite) = prerequisite {
                    issued += self.dialect.run_prerequisite(driver, prerequisite).await?;
                }
                self.dialect
                    .add_collection_column(driver, table, column, *after)
                    .await?;
            }
            ColumnStep::Modify {
                name,
                column,
                prerequisite,
                property,
            } => {
                if let Some(prerequisite) = prerequisite {
                    issued += self.dialect.run_prerequisite(driver, prerequisite).await?;
                }
                self.dialect
                    .modify_collection_column(driver, table, name, column, property)
                    .await?;
            }
            ColumnStep::Drop { name } => {
                self.dialect
                    .drop_collection_column(driver, table, name)
                    .await?;
            }
        }
        Ok(issued + 1)
    }

    /// Make the live indexes of a collection match `indexes`.
    ///
    /// Missing indexes are added, indexes whose uniqueness differs are
    /// removed and re-added, and live indexes that are not wanted are
    /// removed. Primary-key indexes are never reported by the adapters, so
    /// they are left alone. Returns the number of statements issued.
    pub async fn sync_indexes(&self, collection: &str, indexes: &[IndexSpec]) -> Result<usize> {
        let driver = self.driver.as_ref();
        let dialect = &self.dialect;
        let live = dialect.get_collection_indexes(driver, collection).await?;

        let mut queue = Queue::new("indexes");
        for index in indexes {
            match live.get(&index.name) {
                None => queue.add(move || dialect.add_index(driver, collection, index)),
                Some(current) if current.unique != index.unique => {
                    debug!(
                        "{}: index {} uniqueness changed, recreating",
                        collection, index.name
                    );
                    let name = index.name.as_str();
                    queue.add(move || dialect.remove_index(driver, collection, name));
                    queue.add(move || dialect.add_index(driver, collection, index));
                }
                Some(_) => {}
            }
        }
        for name in live.keys() {
            if !indexes.iter().any(|index| &index.name == name) {
                let name = name.as_str();
                queue.add(move || dialect.remove_index(driver, collection, name));
            }
        }

        Ok(queue.run().await?.len())
    }

    /// Drop registered collections and their join tables.
    ///
    /// Every `DROP TABLE IF EXISTS` is attempted even after a failure; the
    /// first error is returned once all have settled.
    pub async fn drop(&self, options: &DropOptions) -> Result<DropReport> {
        if let Some(only) = &options.collections {
            if let Some(unknown) = only
                .iter()
                .find(|name| !self.collections.iter().any(|c| &c.name == *name))
            {
                return Err(SyncError::Config(format!(
                    "Collection '{}' is not defined",
                    unknown
                )));
            }
        }

        let mut tables: Vec<&str> = Vec::new();
        for collection in &self.collections {
            if let Some(only) = &options.collections {
                if !only.contains(&collection.name) {
                    continue;
                }
            }
            tables.push(&collection.name);
            if let Some(joins) = self.join_tables.get(&collection.name) {
                tables.extend(joins.iter().map(String::as_str));
            }
        }

        let driver = self.driver.as_ref();
        let mut dropped = Vec::with_capacity(tables.len());
        let mut first_error = None;
        for table in tables {
            match self.dialect.drop_collection(driver, table).await {
                Ok(()) => dropped.push(table.to_string()),
                Err(e) => {
                    warn!("Failed to drop {}: {}", table, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Dropped {} tables", dropped.len());
                Ok(DropReport { tables: dropped })
            }
        }
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("dialect", &self.dialect.name())
            .field("options", &self.options)
            .field("collections", &self.collections.len())
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}
