//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use strata_core::{
    ColumnDescriptor, ColumnType, CoreResult, Dialect, Driver, DriverError, DriverOutput, Entity,
    EntityMetadata, Record, TableDescriptor, Value,
};

/// Records every statement and answers with queued outputs.
///
/// An empty queue answers with [`DriverOutput::default`].
#[derive(Debug, Default)]
pub struct RecordingDriver {
    statements: Mutex<Vec<String>>,
    outputs: Mutex<VecDeque<Result<DriverOutput, DriverError>>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        RecordingDriver::default()
    }

    pub fn push(&self, output: DriverOutput) {
        self.outputs.lock().unwrap().push_back(Ok(output));
    }

    pub fn push_error(&self, error: DriverError) {
        self.outputs.lock().unwrap().push_back(Err(error));
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

impl Driver for RecordingDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<DriverOutput, DriverError> {
        self.statements.lock().unwrap().push(sql.to_string());
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(DriverOutput::default()))
    }

    async fn begin_transaction(&self) -> Result<(), DriverError> {
        self.statements.lock().unwrap().push("BEGIN".to_string());
        Ok(())
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.statements.lock().unwrap().push("COMMIT".to_string());
        Ok(())
    }

    async fn roll_back(&self) -> Result<(), DriverError> {
        self.statements.lock().unwrap().push("ROLLBACK".to_string());
        Ok(())
    }
}

// =============================================================================
// Entities
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Hero {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
}

impl Hero {
    pub fn new(name: &str, description: &str) -> Self {
        Hero {
            id: None,
            name: name.to_string(),
            description: Some(description.to_string()),
        }
    }
}

impl Entity for Hero {
    const NAME: &'static str = "Hero";

    fn describe() -> CoreResult<EntityMetadata> {
        EntityMetadata::builder(Self::NAME)
            .table(TableDescriptor::derived(Self::NAME))
            .column(ColumnDescriptor::id("id"))
            .column(ColumnDescriptor::builder("name", ColumnType::Varchar).length(100))
            .column(ColumnDescriptor::builder("description", ColumnType::Text).nullable())
            .build()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.clone())
            .with("description", self.description.clone())
    }

    fn from_record(record: Record) -> CoreResult<Self> {
        Ok(Hero {
            id: record.get_i64("id")?,
            name: record.require_string("name")?,
            description: record.get_string("description")?,
        })
    }
}

/// Soft-deletable, with a property name differing from its column.
#[derive(Debug, Clone, PartialEq)]
pub struct Villain {
    pub id: Option<i64>,
    pub name: String,
    pub rank: i64,
}

impl Entity for Villain {
    const NAME: &'static str = "Villain";

    fn describe() -> CoreResult<EntityMetadata> {
        EntityMetadata::builder(Self::NAME)
            .table(TableDescriptor::derived(Self::NAME))
            .column(ColumnDescriptor::id("id"))
            .column(ColumnDescriptor::builder("name", ColumnType::Varchar).length(100))
            .column(ColumnDescriptor::builder("rank", ColumnType::Int))
            .column(
                ColumnDescriptor::builder("deletedAt", ColumnType::DateTime)
                    .name("deleted_at")
                    .delete_date(),
            )
            .build()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.clone())
            .with("rank", self.rank)
    }

    fn from_record(record: Record) -> CoreResult<Self> {
        Ok(Villain {
            id: record.get_i64("id")?,
            name: record.require_string("name")?,
            rank: record.require_i64("rank")?,
        })
    }
}
