mod common;

use std::io::Cursor;
use std::str::FromStr;

use assert_matches::assert_matches;
use oxigraph::io::RdfFormat;

use kg_ingress::domain::{NO_DESCRIPTION, OrphanetId};
use kg_ingress::error::IngressError;
use kg_ingress::ontology::OntologyResolver;
use kg_ingress::reference::load_ontology;

use common::fixture;

fn ontology() -> OntologyResolver {
    load_ontology(&fixture("ordo.ttl")).unwrap()
}

fn id(value: &str) -> OrphanetId {
    OrphanetId::from_str(value).unwrap()
}

#[test]
fn term_with_several_xrefs_collapses_to_one() {
    let term = ontology().lookup(&id("558")).unwrap().unwrap();
    assert_eq!(term.uri, "http://www.orpha.net/ORDO/Orphanet_558");
    assert_eq!(term.label, "Marfan syndrome");
    assert_eq!(term.description, "A systemic disease of connective tissue.");

    let mut xrefs = term.xrefs.clone();
    xrefs.sort();
    assert_eq!(xrefs, vec!["ICD-10:Q87.4", "MeSH:D008382", "OMIM:154700"]);
}

#[test]
fn term_without_definition_uses_placeholder() {
    let term = ontology().lookup(&id("93460")).unwrap().unwrap();
    assert_eq!(term.label, "Disease X");
    assert_eq!(term.description, NO_DESCRIPTION);
    assert!(term.xrefs.is_empty());
}

#[test]
fn unknown_or_unclassed_terms_are_absent() {
    let ontology = ontology();
    assert_eq!(ontology.lookup(&id("424242")).unwrap(), None);
    assert_eq!(ontology.lookup(&id("1000")).unwrap(), None);
}

#[test]
fn rdf_xml_is_loaded() {
    let owl = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
         xmlns:owl="http://www.w3.org/2002/07/owl#"
         xmlns:oboInOwl="http://www.geneontology.org/formats/oboInOwl#">
  <owl:Class rdf:about="http://www.orpha.net/ORDO/Orphanet_166024">
    <rdfs:label xml:lang="en">Multiple epiphyseal dysplasia</rdfs:label>
    <oboInOwl:hasDbXref>OMIM:600204</oboInOwl:hasDbXref>
  </owl:Class>
</rdf:RDF>
"#;
    let ontology = OntologyResolver::from_reader(RdfFormat::RdfXml, Cursor::new(owl)).unwrap();
    let term = ontology.lookup(&id("166024")).unwrap().unwrap();
    assert_eq!(term.label, "Multiple epiphyseal dysplasia");
    assert_eq!(term.xrefs, vec!["OMIM:600204"]);
}

#[test]
fn broken_ontology_fails_to_load() {
    assert_matches!(
        OntologyResolver::from_reader(RdfFormat::Turtle, Cursor::new("this is not turtle")).err(),
        Some(IngressError::OntologyLoad(_))
    );
}
