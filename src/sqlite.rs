use std::fs;

use camino::Utf8Path;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::IngressError;
use crate::graph::{GraphStore, GraphTransaction, Node, Properties, Relationship};

/// Graph store persisted in a single SQLite database: one table of nodes keyed
/// by id and one table of typed relationships between them.
#[derive(Debug)]
pub struct SqliteGraph {
    conn: Connection,
}

impl SqliteGraph {
    pub fn open(path: &Utf8Path) -> Result<Self, IngressError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| IngressError::Filesystem(err.to_string()))?;
        }
        let conn = Connection::open(path.as_std_path())?;
        let graph = Self { conn };
        graph.migrate()?;
        Ok(graph)
    }

    pub fn open_in_memory() -> Result<Self, IngressError> {
        let graph = Self {
            conn: Connection::open_in_memory()?,
        };
        graph.migrate()?;
        Ok(graph)
    }

    fn migrate(&self) -> Result<(), IngressError> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS nodes (
              id TEXT PRIMARY KEY,
              label TEXT NOT NULL,
              properties TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS relationships (
              source TEXT NOT NULL REFERENCES nodes(id),
              rel_type TEXT NOT NULL,
              target TEXT NOT NULL REFERENCES nodes(id),
              PRIMARY KEY (source, rel_type, target)
            );
            "#,
        )?;
        Ok(())
    }

    pub fn node(&self, id: &str) -> Result<Option<Node>, IngressError> {
        let row = self
            .conn
            .query_row(
                "SELECT label, properties FROM nodes WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        row.map(|(label, properties)| {
            let properties: Properties = serde_json::from_str(&properties)
                .map_err(|err| IngressError::GraphStore(err.to_string()))?;
            Ok(Node { label, properties })
        })
        .transpose()
    }

    pub fn relationships(&self) -> Result<Vec<Relationship>, IngressError> {
        let mut stmt = self.conn.prepare(
            "SELECT source, rel_type, target FROM relationships ORDER BY source, rel_type, target",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Relationship {
                source: row.get(0)?,
                rel_type: row.get(1)?,
                target: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count(&self, table: &str) -> Result<usize, IngressError> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

pub struct SqliteTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl GraphTransaction for SqliteTransaction<'_> {
    fn merge_node(
        &mut self,
        label: &str,
        id: &str,
        properties: &Properties,
    ) -> Result<(), IngressError> {
        let properties = serde_json::to_string(properties)
            .map_err(|err| IngressError::GraphStore(err.to_string()))?;
        self.tx.execute(
            r#"
            INSERT INTO nodes(id, label, properties)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET label=excluded.label, properties=excluded.properties
            "#,
            params![id, label, properties],
        )?;
        Ok(())
    }

    fn merge_relationship(
        &mut self,
        source: &str,
        rel_type: &str,
        target: &str,
    ) -> Result<(), IngressError> {
        self.tx.execute(
            r#"
            INSERT INTO relationships(source, rel_type, target)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(source, rel_type, target) DO NOTHING
            "#,
            params![source, rel_type, target],
        )?;
        Ok(())
    }

    fn commit(self) -> Result<(), IngressError> {
        self.tx.commit()?;
        Ok(())
    }
}

impl GraphStore for SqliteGraph {
    type Transaction<'a> = SqliteTransaction<'a>;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, IngressError> {
        Ok(SqliteTransaction {
            tx: self.conn.transaction()?,
        })
    }

    fn clear(&mut self) -> Result<(), IngressError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM relationships", [])?;
        tx.execute("DELETE FROM nodes", [])?;
        tx.commit()?;
        Ok(())
    }

    fn node_count(&self) -> Result<usize, IngressError> {
        self.count("nodes")
    }

    fn relationship_count(&self) -> Result<usize, IngressError> {
        self.count("relationships")
    }
}
