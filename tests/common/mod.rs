#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use camino::Utf8PathBuf;

use kg_ingress::catalog::{CatalogSchema, CatalogTable};
use kg_ingress::domain::RawPhenotypeRecord;
use kg_ingress::error::IngressError;
use kg_ingress::fetch::{Page, PageSource};
use kg_ingress::ontology::OntologyResolver;
use kg_ingress::pipeline::{ProgressEvent, ProgressSink};
use kg_ingress::portal::PortalTable;
use kg_ingress::reference::{ReferencePaths, ReferenceTables};

pub const CATALOG_HEADER: [&str; 16] = [
    "DATE ADDED TO CATALOG",
    "PUBMED ID",
    "FIRST AUTHOR",
    "DATE",
    "JOURNAL",
    "LINK",
    "STUDY",
    "DISEASE/TRAIT",
    "INITIAL SAMPLE SIZE",
    "REPLICATION SAMPLE SIZE",
    "PLATFORM [SNPS PASSING QC]",
    "ASSOCIATION COUNT",
    "MAPPED_TRAIT",
    "MAPPED_TRAIT_URI",
    "STUDY ACCESSION",
    "GENOTYPING TECHNOLOGY",
];

pub fn fixture(name: &str) -> Utf8PathBuf {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    Utf8PathBuf::from_path_buf(path).unwrap()
}

pub fn fixture_paths() -> ReferencePaths {
    ReferencePaths {
        ontology: fixture("ordo.ttl"),
        catalog: fixture("gcat.tsv"),
        portal: fixture("portal.csv"),
    }
}

pub fn fixture_tables() -> ReferenceTables {
    ReferenceTables::load(&fixture_paths()).unwrap()
}

pub fn catalog_row(study: &str, mapped_trait: &str, uri: &str, accession: &str) -> Vec<String> {
    let mut row = vec![String::new(); CATALOG_HEADER.len()];
    row[6] = study.to_string();
    row[12] = mapped_trait.to_string();
    row[13] = uri.to_string();
    row[14] = accession.to_string();
    row
}

pub fn catalog_table(rows: Vec<Vec<String>>) -> CatalogTable {
    let schema = CatalogSchema::from_header(&CATALOG_HEADER[..]).unwrap();
    CatalogTable::preprocess(schema, rows).unwrap()
}

/// Tables with only the given catalog rows; the ontology and portal are empty.
pub fn catalog_only_tables(rows: Vec<Vec<String>>) -> ReferenceTables {
    ReferenceTables::new(
        OntologyResolver::new().unwrap(),
        catalog_table(rows),
        PortalTable::default(),
    )
}

pub fn record(key: &str) -> RawPhenotypeRecord {
    RawPhenotypeRecord::new(key, format!("{key} display"))
}

/// Serves a fixed list of pages, chained by the tokens `t1`, `t2`, ...
pub struct ScriptedPages {
    pages: Vec<Result<Page, String>>,
    pub requested: Mutex<Vec<Option<String>>>,
}

impl ScriptedPages {
    pub fn new(pages: Vec<Vec<RawPhenotypeRecord>>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(index, data)| {
                let token = (index + 1 < count).then(|| format!("t{}", index + 1));
                Ok(Page::new(data, token.as_deref()))
            })
            .collect();
        Self {
            pages,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Makes the page at `index` fail with a 503.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.pages[index] = Err("service unavailable".to_string());
        self
    }

    fn page(&self, index: usize) -> Result<Page, IngressError> {
        match self.pages.get(index) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(message)) => Err(IngressError::FetchStatus {
                status: 503,
                message: message.clone(),
            }),
            None => Err(IngressError::FetchDecode(format!("no page {index}"))),
        }
    }
}

impl PageSource for ScriptedPages {
    fn first_page(&self) -> Result<Page, IngressError> {
        self.requested.lock().unwrap().push(None);
        self.page(0)
    }

    fn next_page(&self, token: &str) -> Result<Page, IngressError> {
        self.requested.lock().unwrap().push(Some(token.to_string()));
        let index = token
            .strip_prefix('t')
            .and_then(|index| index.parse::<usize>().ok())
            .ok_or_else(|| IngressError::FetchDecode(format!("unknown token {token}")))?;
        self.page(index)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}
