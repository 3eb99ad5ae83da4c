use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::CATALOG_TRAIT_NAMESPACE;
use crate::error::IngressError;

pub const MAPPED_TRAIT_COLUMN: usize = 12;
pub const MAPPED_TRAIT_URI_COLUMN: usize = 13;
pub const STUDY_COLUMN: &str = "STUDY";
pub const STUDY_ACCESSION_COLUMN: &str = "STUDY ACCESSION";
pub const PROCESSED_TRAIT_NAME_COLUMN: &str = "processed_trait_name";
pub const PROCESSED_CURIE_COLUMN: &str = "processed_curie";

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSchema {
    columns: Vec<String>,
    mapped_trait: usize,
    mapped_trait_uri: usize,
    study: usize,
    study_accession: usize,
}

impl CatalogSchema {
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self, IngressError> {
        let columns = header
            .iter()
            .map(|name| name.as_ref().trim().to_string())
            .collect::<Vec<_>>();
        if columns.len() <= MAPPED_TRAIT_URI_COLUMN {
            return Err(IngressError::CatalogSchema(format!(
                "expected at least {} columns, header has {}",
                MAPPED_TRAIT_URI_COLUMN + 1,
                columns.len()
            )));
        }
        let find = |name: &str| {
            columns
                .iter()
                .position(|column| column == name)
                .ok_or_else(|| IngressError::CatalogSchema(format!("missing column {name:?}")))
        };
        let study = find(STUDY_COLUMN)?;
        let study_accession = find(STUDY_ACCESSION_COLUMN)?;
        Ok(Self {
            mapped_trait: MAPPED_TRAIT_COLUMN,
            mapped_trait_uri: MAPPED_TRAIT_URI_COLUMN,
            study,
            study_accession,
            columns,
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn entry(&self, line: usize, values: Vec<String>) -> Result<Option<CatalogEntry>, IngressError> {
        if values.len() != self.width() {
            return Err(IngressError::CatalogSchema(format!(
                "row {line} has {} columns, header has {}",
                values.len(),
                self.width()
            )));
        }
        let Some(processed_trait_name) = processed_trait_name(&values[self.mapped_trait]) else {
            return Ok(None);
        };
        let Some(processed_curie) = processed_curie(&values[self.mapped_trait_uri]) else {
            return Ok(None);
        };
        Ok(Some(CatalogEntry {
            mapped_trait: values[self.mapped_trait].clone(),
            mapped_trait_uri: values[self.mapped_trait_uri].clone(),
            study: values[self.study].clone(),
            study_accession: values[self.study_accession].trim().to_string(),
            processed_trait_name,
            processed_curie,
            values,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub mapped_trait: String,
    pub mapped_trait_uri: String,
    pub study: String,
    pub study_accession: String,
    pub processed_trait_name: String,
    pub processed_curie: String,
    values: Vec<String>,
}

impl CatalogEntry {
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Original columns followed by the two derived ones.
    pub fn output_row(&self) -> Vec<String> {
        let mut row = self.values.clone();
        row.push(self.processed_trait_name.clone());
        row.push(self.processed_curie.clone());
        row
    }
}

#[derive(Debug, Clone)]
pub struct CatalogTable {
    schema: CatalogSchema,
    entries: Vec<CatalogEntry>,
    by_trait: HashMap<String, Vec<usize>>,
}

impl CatalogTable {
    pub fn preprocess<I>(schema: CatalogSchema, rows: I) -> Result<Self, IngressError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut entries = Vec::new();
        let mut by_trait = HashMap::<String, Vec<usize>>::new();
        for (index, values) in rows.into_iter().enumerate() {
            // header is line 1
            let Some(entry) = schema.entry(index + 2, values)? else {
                continue;
            };
            by_trait
                .entry(entry.processed_trait_name.clone())
                .or_default()
                .push(entries.len());
            entries.push(entry);
        }
        Ok(Self {
            schema,
            entries,
            by_trait,
        })
    }

    pub fn schema(&self) -> &CatalogSchema {
        &self.schema
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = self.schema.columns.clone();
        header.push(PROCESSED_TRAIT_NAME_COLUMN.to_string());
        header.push(PROCESSED_CURIE_COLUMN.to_string());
        header
    }

    pub fn output_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.entries.iter().map(CatalogEntry::output_row)
    }

    pub fn rows_for_trait<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.by_trait
            .get(name)
            .map(|indices| indices.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|index| &self.entries[*index])
    }
}

pub fn processed_trait_name(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let underscored = value.replace(' ', "_");
    let cleaned = NON_WORD.replace_all(&underscored, "");
    Some(format!("{CATALOG_TRAIT_NAMESPACE}{cleaned}"))
}

pub fn processed_curie(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let last = value.trim().rsplit('/').next().unwrap_or_default();
    let curie = last.replace('_', ":");
    (!curie.is_empty()).then_some(curie)
}
