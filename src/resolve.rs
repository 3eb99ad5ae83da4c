use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::{CatalogEntry, CatalogTable};
use crate::domain::{
    NO_DESCRIPTION, OrphanetId, PORTAL_TRAIT_NAMESPACE, Phenotype, PhenotypeSource,
    RawPhenotypeRecord, Resolved, Study,
};
use crate::error::IngressError;
use crate::ontology::OntologyResolver;
use crate::portal::PortalTable;
use crate::reference::ReferenceTables;

/// Turns one raw record into a canonical phenotype. `Ok(None)` means the
/// reference data has no entry for the key; the record is dropped.
pub trait EntityResolver: Sync {
    fn resolve(&self, record: &RawPhenotypeRecord) -> Result<Option<Resolved>, IngressError>;
}

pub struct OntologyPhenotypes<'a> {
    ontology: &'a OntologyResolver,
}

impl<'a> OntologyPhenotypes<'a> {
    pub fn new(ontology: &'a OntologyResolver) -> Self {
        Self { ontology }
    }
}

impl EntityResolver for OntologyPhenotypes<'_> {
    fn resolve(&self, record: &RawPhenotypeRecord) -> Result<Option<Resolved>, IngressError> {
        let id = OrphanetId::from_phenotype_key(&record.phenotype_key)?;
        let Some(term) = self.ontology.lookup(&id)? else {
            debug!(key = %record.phenotype_key, "Orphanet term not found");
            return Ok(None);
        };
        Ok(Some(Resolved::phenotype_only(Phenotype::new(
            term.uri,
            record.phenotype_key.as_str(),
            record.phenotype_display_name.as_str(),
            term.description,
            term.xrefs,
        ))))
    }
}

pub struct CatalogPhenotypes<'a> {
    catalog: &'a CatalogTable,
}

impl<'a> CatalogPhenotypes<'a> {
    pub fn new(catalog: &'a CatalogTable) -> Self {
        Self { catalog }
    }
}

impl EntityResolver for CatalogPhenotypes<'_> {
    fn resolve(&self, record: &RawPhenotypeRecord) -> Result<Option<Resolved>, IngressError> {
        let rows = self
            .catalog
            .rows_for_trait(&record.phenotype_key)
            .collect::<Vec<&CatalogEntry>>();
        let Some(first) = rows.first() else {
            debug!(key = %record.phenotype_key, "no GWAS catalog rows for trait");
            return Ok(None);
        };

        let phenotype = Arc::new(Phenotype::new(
            first.processed_curie.as_str(),
            record.phenotype_key.as_str(),
            record.phenotype_display_name.as_str(),
            NO_DESCRIPTION,
            rows.iter().map(|row| row.processed_curie.clone()),
        ));

        let mut accessions = HashSet::new();
        let studies = rows
            .iter()
            .filter(|row| accessions.insert(row.study_accession.as_str()))
            .filter_map(|row| {
                let study =
                    Study::from_accession(&row.study_accession, row.study.as_str(), phenotype.clone());
                if study.is_none() {
                    debug!(
                        key = %record.phenotype_key,
                        accession = %row.study_accession,
                        "skipping study with unexpected accession"
                    );
                }
                study
            })
            .collect();

        Ok(Some(Resolved { phenotype, studies }))
    }
}

pub struct PortalPhenotypes<'a> {
    portal: &'a PortalTable,
}

impl<'a> PortalPhenotypes<'a> {
    pub fn new(portal: &'a PortalTable) -> Self {
        Self { portal }
    }
}

impl EntityResolver for PortalPhenotypes<'_> {
    fn resolve(&self, record: &RawPhenotypeRecord) -> Result<Option<Resolved>, IngressError> {
        let Some(row) = self.portal.first_for_name(&record.phenotype_key) else {
            debug!(key = %record.phenotype_key, "no portal mapping for phenotype");
            return Ok(None);
        };
        let description = if row.description.trim().is_empty() {
            NO_DESCRIPTION
        } else {
            row.description.as_str()
        };
        Ok(Some(Resolved::phenotype_only(Phenotype::new(
            format!("{PORTAL_TRAIT_NAMESPACE}{}", row.identifier()),
            record.phenotype_key.as_str(),
            record.phenotype_display_name.as_str(),
            description,
            row.cross_references(),
        ))))
    }
}

/// Classifies each record and routes it to the resolver for its source.
pub struct PhenotypeResolver<'a> {
    ontology: OntologyPhenotypes<'a>,
    catalog: CatalogPhenotypes<'a>,
    portal: PortalPhenotypes<'a>,
}

impl<'a> PhenotypeResolver<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self {
            ontology: OntologyPhenotypes::new(&tables.ontology),
            catalog: CatalogPhenotypes::new(&tables.catalog),
            portal: PortalPhenotypes::new(&tables.portal),
        }
    }

    pub fn resolver_for(&self, source: PhenotypeSource) -> &dyn EntityResolver {
        match source {
            PhenotypeSource::Ontology => &self.ontology,
            PhenotypeSource::Catalog => &self.catalog,
            PhenotypeSource::Portal => &self.portal,
        }
    }
}

impl EntityResolver for PhenotypeResolver<'_> {
    fn resolve(&self, record: &RawPhenotypeRecord) -> Result<Option<Resolved>, IngressError> {
        let source = PhenotypeSource::classify(&record.phenotype_key);
        self.resolver_for(source).resolve(record)
    }
}
