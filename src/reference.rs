use std::fs::File;
use std::io::{BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;
use oxigraph::io::RdfFormat;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{CatalogSchema, CatalogTable};
use crate::error::IngressError;
use crate::ontology::OntologyResolver;
use crate::portal::{DESCRIPTION_COLUMN, EFO_ID_COLUMN, NAME_COLUMN, PortalRow, PortalTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePaths {
    pub ontology: Utf8PathBuf,
    pub catalog: Utf8PathBuf,
    pub portal: Utf8PathBuf,
}

impl Default for ReferencePaths {
    fn default() -> Self {
        Self {
            ontology: Utf8PathBuf::from("data/ORDO_en_4.5.owl"),
            catalog: Utf8PathBuf::from("data/gcat_v1.0.3.1.tsv"),
            portal: Utf8PathBuf::from("data/amp-traits-mapping-portal-phenotypes_06262024.csv"),
        }
    }
}

/// The three reference sources, loaded once per run and read-only afterwards.
pub struct ReferenceTables {
    pub ontology: OntologyResolver,
    pub catalog: CatalogTable,
    pub portal: PortalTable,
}

impl ReferenceTables {
    pub fn new(ontology: OntologyResolver, catalog: CatalogTable, portal: PortalTable) -> Self {
        Self {
            ontology,
            catalog,
            portal,
        }
    }

    pub fn load(paths: &ReferencePaths) -> Result<Self, IngressError> {
        let portal = load_portal(&paths.portal)?;
        info!(rows = portal.len(), path = %paths.portal, "loaded portal trait mapping");

        let catalog = load_catalog(&paths.catalog)?;
        info!(rows = catalog.len(), path = %paths.catalog, "loaded GWAS catalog");

        let ontology = load_ontology(&paths.ontology)?;
        info!(
            triples = ontology.triple_count()?,
            path = %paths.ontology,
            "loaded Orphanet ontology"
        );

        Ok(Self::new(ontology, catalog, portal))
    }
}

pub fn open_reference(path: &Utf8Path) -> Result<Box<dyn Read>, IngressError> {
    let file = File::open(path.as_std_path()).map_err(|err| IngressError::ReferenceRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let reader = BufReader::new(file);
    if path.extension() == Some("gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

pub fn load_catalog(path: &Utf8Path) -> Result<CatalogTable, IngressError> {
    read_catalog(open_reference(path)?)
}

pub fn load_portal(path: &Utf8Path) -> Result<PortalTable, IngressError> {
    read_portal(open_reference(path)?)
}

pub fn load_ontology(path: &Utf8Path) -> Result<OntologyResolver, IngressError> {
    OntologyResolver::from_reader(ontology_format(path), open_reference(path)?)
}

pub fn read_catalog(reader: impl Read) -> Result<CatalogTable, IngressError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(reader);
    let header = reader
        .headers()
        .map_err(|err| IngressError::CatalogSchema(err.to_string()))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let schema = CatalogSchema::from_header(&header)?;
    let rows = reader
        .records()
        .map(|record| record.map(|record| record.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| IngressError::CatalogSchema(format!("unreadable row: {err}")))?;
    CatalogTable::preprocess(schema, rows)
}

pub fn read_portal(reader: impl Read) -> Result<PortalTable, IngressError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|err| IngressError::PortalSchema(err.to_string()))?
        .clone();
    for required in [NAME_COLUMN, EFO_ID_COLUMN, DESCRIPTION_COLUMN] {
        if !headers.iter().any(|column| column == required) {
            return Err(IngressError::PortalSchema(format!(
                "missing column {required:?}"
            )));
        }
    }
    let rows = reader
        .deserialize::<PortalRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| IngressError::PortalSchema(err.to_string()))?;
    Ok(PortalTable::new(rows))
}

pub fn ontology_format(path: &Utf8Path) -> RdfFormat {
    let path = if path.extension() == Some("gz") {
        path.file_stem().map(Utf8Path::new).unwrap_or(path)
    } else {
        path
    };
    match path.extension() {
        Some("ttl") => RdfFormat::Turtle,
        Some("nt") => RdfFormat::NTriples,
        Some("nq") => RdfFormat::NQuads,
        Some("trig") => RdfFormat::TriG,
        _ => RdfFormat::RdfXml,
    }
}
