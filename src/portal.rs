use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::dedup_preserving_order;

pub const NAME_COLUMN: &str = "name";
pub const EFO_ID_COLUMN: &str = "EFO_id";
pub const DESCRIPTION_COLUMN: &str = "description";
pub const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortalRow {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "EFO_id", default)]
    pub efo_ids: String,
    #[serde(default)]
    pub description: String,
}

impl PortalRow {
    /// The row's own identifier: the `id` column when present and non-empty, else `name`.
    pub fn identifier(&self) -> &str {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(self.name.as_str())
    }

    pub fn cross_references(&self) -> Vec<String> {
        dedup_preserving_order(
            self.efo_ids
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortalTable {
    rows: Vec<PortalRow>,
    by_name: HashMap<String, usize>,
}

impl PortalTable {
    pub fn new(rows: Vec<PortalRow>) -> Self {
        let mut by_name = HashMap::new();
        for (index, row) in rows.iter().enumerate() {
            by_name.entry(row.name.clone()).or_insert(index);
        }
        Self { rows, by_name }
    }

    pub fn first_for_name(&self, name: &str) -> Option<&PortalRow> {
        self.by_name.get(name).map(|index| &self.rows[*index])
    }

    pub fn rows(&self) -> &[PortalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
