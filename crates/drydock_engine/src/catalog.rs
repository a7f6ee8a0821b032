//! Local catalog: the metadata store DDL operations run against.

use crate::operation::{EngineError, EngineResult};
use indexmap::IndexMap;
use std::fs;
use std::path::PathBuf;

/// Definition of one catalog table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Where the table's data would live under the warehouse
    pub location: Option<PathBuf>,
}

/// In-process metadata store, backed by a warehouse directory when one is
/// configured
///
/// Lives entirely inside the run's workspace; nothing survives across runs.
#[derive(Debug, Default)]
pub struct Catalog {
    warehouse_dir: Option<PathBuf>,
    tables: IndexMap<String, TableDef>,
}

impl Catalog {
    /// Empty catalog with no backing directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the catalog at a warehouse directory; table creation will
    /// materialize per-table subdirectories under it
    pub fn set_warehouse_dir(&mut self, dir: PathBuf) {
        self.warehouse_dir = Some(dir);
    }

    /// Create a table
    ///
    /// # Errors
    ///
    /// [`EngineError::TableExists`] when the name is taken and
    /// `if_not_exists` is false; [`EngineError::Io`] when the warehouse
    /// subdirectory cannot be created.
    pub fn create_table(&mut self, name: &str, if_not_exists: bool) -> EngineResult<()> {
        if self.tables.contains_key(name) {
            if if_not_exists {
                return Ok(());
            }
            return Err(EngineError::TableExists {
                name: name.to_string(),
            });
        }

        let location = match &self.warehouse_dir {
            Some(dir) => {
                let path = dir.join(name);
                fs::create_dir_all(&path).map_err(|err| EngineError::Io {
                    reason: err.to_string(),
                })?;
                Some(path)
            }
            None => None,
        };

        self.tables.insert(
            name.to_string(),
            TableDef {
                name: name.to_string(),
                location,
            },
        );
        Ok(())
    }

    /// Drop a table
    ///
    /// # Errors
    ///
    /// [`EngineError::TableMissing`] when absent and `if_exists` is false.
    pub fn drop_table(&mut self, name: &str, if_exists: bool) -> EngineResult<()> {
        if self.tables.shift_remove(name).is_none() && !if_exists {
            return Err(EngineError::TableMissing {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Look up a table definition
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// All table names, in creation order
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}
