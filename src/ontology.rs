use std::io::Read;

use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use tracing::debug;

use crate::domain::{NO_DESCRIPTION, OrphanetId, dedup_preserving_order};
use crate::error::IngressError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyTerm {
    pub uri: String,
    pub label: String,
    pub description: String,
    pub xrefs: Vec<String>,
}

/// Read-only view over the Orphanet ontology. Safe to share across worker threads.
#[derive(Clone)]
pub struct OntologyResolver {
    store: Store,
}

impl OntologyResolver {
    pub fn new() -> Result<Self, IngressError> {
        let store = Store::new().map_err(|err| IngressError::OntologyLoad(err.to_string()))?;
        Ok(Self { store })
    }

    pub fn from_reader(format: RdfFormat, reader: impl Read) -> Result<Self, IngressError> {
        let resolver = Self::new()?;
        resolver
            .store
            .load_from_reader(format, reader)
            .map_err(|err| IngressError::OntologyLoad(err.to_string()))?;
        Ok(resolver)
    }

    pub fn triple_count(&self) -> Result<usize, IngressError> {
        self.store
            .len()
            .map_err(|err| IngressError::OntologyLoad(err.to_string()))
    }

    pub fn lookup(&self, id: &OrphanetId) -> Result<Option<OntologyTerm>, IngressError> {
        let uri = id.term_uri();
        let query = term_query(&uri);
        let results = self
            .store
            .query(query.as_str())
            .map_err(|err| IngressError::OntologyQuery(err.to_string()))?;
        let QueryResults::Solutions(solutions) = results else {
            return Err(IngressError::OntologyQuery(
                "term query did not return solutions".to_string(),
            ));
        };

        let mut term: Option<OntologyTerm> = None;
        for solution in solutions {
            let solution = solution.map_err(|err| IngressError::OntologyQuery(err.to_string()))?;
            let Some(label) = solution.get("label") else {
                continue;
            };
            let entry = term.get_or_insert_with(|| OntologyTerm {
                uri: uri.clone(),
                label: term_text(label),
                description: solution
                    .get("description")
                    .map(term_text)
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                xrefs: Vec::new(),
            });
            if let Some(Term::Literal(xref)) = solution.get("db_xref") {
                entry.xrefs.push(xref.value().to_string());
            }
        }

        if term.is_none() {
            debug!(term = %uri, "no labelled ontology class");
        }
        Ok(term.map(|mut term| {
            term.xrefs = dedup_preserving_order(term.xrefs);
            term
        }))
    }
}

fn term_query(uri: &str) -> String {
    format!(
        r#"
        PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
        PREFIX efo: <http://www.ebi.ac.uk/efo/>
        PREFIX owl: <http://www.w3.org/2002/07/owl#>
        PREFIX oboInOwl: <http://www.geneontology.org/formats/oboInOwl#>

        SELECT ?label ?description ?db_xref
        WHERE {{
            <{uri}> a owl:Class .
            <{uri}> rdfs:label ?label .
            OPTIONAL {{ <{uri}> efo:definition ?description . }}
            OPTIONAL {{ <{uri}> oboInOwl:hasDbXref ?db_xref . }}
        }}
        "#
    )
}

fn term_text(term: &Term) -> String {
    match term {
        Term::Literal(literal) => literal.value().to_string(),
        Term::NamedNode(node) => node.as_str().to_string(),
        other => other.to_string(),
    }
}
