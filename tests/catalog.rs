mod common;

use std::io::Cursor;

use assert_matches::assert_matches;

use kg_ingress::catalog::{CatalogSchema, CatalogTable, PROCESSED_CURIE_COLUMN};
use kg_ingress::error::IngressError;
use kg_ingress::reference::{load_catalog, read_catalog};

use common::{CATALOG_HEADER, catalog_row, catalog_table, fixture};

#[test]
fn fixture_catalog_drops_rows_without_trait_or_uri() {
    let table = load_catalog(&fixture("gcat.tsv")).unwrap();
    assert_eq!(table.len(), 5);
    assert!(
        table
            .entries()
            .iter()
            .all(|entry| !entry.processed_trait_name.is_empty() && !entry.processed_curie.is_empty())
    );
    assert_eq!(table.rows_for_trait("gcat_trait_body_mass_index").count(), 4);
    assert_eq!(table.rows_for_trait("gcat_trait_height").count(), 0);
}

#[test]
fn derived_columns_follow_the_naming_rules() {
    let table = catalog_table(vec![
        catalog_row(
            "Study A",
            "Alzheimer's disease (late onset)",
            "http://www.ebi.ac.uk/efo/EFO_0000249",
            "GCST000010",
        ),
        catalog_row(
            "Study B",
            "HbA1c measurement",
            "http://purl.obolibrary.org/obo/MONDO_0005148",
            "GCST000011",
        ),
    ]);

    let entries = table.entries();
    assert_eq!(
        entries[0].processed_trait_name,
        "gcat_trait_Alzheimers_disease_late_onset"
    );
    assert_eq!(entries[0].processed_curie, "EFO:0000249");
    assert_eq!(entries[1].processed_trait_name, "gcat_trait_HbA1c_measurement");
    assert_eq!(entries[1].processed_curie, "MONDO:0005148");
}

#[test]
fn preprocessed_output_is_a_fixed_point() {
    let table = load_catalog(&fixture("gcat.tsv")).unwrap();
    let header = table.header();
    assert_eq!(header.last().map(String::as_str), Some(PROCESSED_CURIE_COLUMN));
    assert_eq!(header.len(), CATALOG_HEADER.len() + 2);

    // Re-reading the original columns of the preprocessed rows changes nothing.
    let schema = table.schema().clone();
    let again = CatalogTable::preprocess(
        schema,
        table.entries().iter().map(|entry| entry.values().to_vec()),
    )
    .unwrap();
    assert_eq!(again.entries(), table.entries());
    assert_eq!(
        again.output_rows().collect::<Vec<_>>(),
        table.output_rows().collect::<Vec<_>>()
    );
}

#[test]
fn short_header_is_rejected() {
    let header = CATALOG_HEADER[..13].to_vec();
    assert_matches!(
        CatalogSchema::from_header(&header[..]),
        Err(IngressError::CatalogSchema(_))
    );
}

#[test]
fn missing_accession_column_is_rejected() {
    let mut header = CATALOG_HEADER.to_vec();
    header[14] = "ACCESSION";
    let err = CatalogSchema::from_header(&header[..]).unwrap_err();
    assert_matches!(err, IngressError::CatalogSchema(message) if message.contains("STUDY ACCESSION"));
}

#[test]
fn ragged_row_fails_the_whole_load() {
    let mut input = CATALOG_HEADER.join("\t");
    input.push('\n');
    input.push_str(&catalog_row("Study", "trait", "http://x/EFO_1", "GCST1").join("\t"));
    input.push('\n');
    input.push_str("only\tthree\tcolumns\n");

    assert_matches!(
        read_catalog(Cursor::new(input)),
        Err(IngressError::CatalogSchema(message)) if message.contains("row 3")
    );
}
