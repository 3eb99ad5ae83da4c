use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::IngressError;

pub const ONTOLOGY_MARKER: &str = "Orphanet";
pub const CATALOG_MARKER: &str = "gcat_trait";
pub const ORDO_TERM_NAMESPACE: &str = "http://www.orpha.net/ORDO/Orphanet_";
pub const CATALOG_TRAIT_NAMESPACE: &str = "gcat_trait_";
pub const PORTAL_TRAIT_NAMESPACE: &str = "PORTAL.TRAIT:";
pub const STUDY_ACCESSION_PREFIX: &str = "GCST";
pub const STUDY_NAMESPACE: &str = "GCST:";
pub const NO_DESCRIPTION: &str = "No description available";

/// One row of the phenotype index as returned by BioIndex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPhenotypeRecord {
    pub phenotype_key: String,
    pub phenotype_display_name: String,
}

impl RawPhenotypeRecord {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            phenotype_key: key.into(),
            phenotype_display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhenotypeSource {
    Ontology,
    Catalog,
    Portal,
}

impl PhenotypeSource {
    /// First match wins: ontology marker, then catalog marker, then the portal fallback.
    pub fn classify(key: &str) -> Self {
        if key.contains(ONTOLOGY_MARKER) {
            PhenotypeSource::Ontology
        } else if key.contains(CATALOG_MARKER) {
            PhenotypeSource::Catalog
        } else {
            PhenotypeSource::Portal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhenotypeSource::Ontology => "orphanet",
            PhenotypeSource::Catalog => "gcat",
            PhenotypeSource::Portal => "portal",
        }
    }
}

impl fmt::Display for PhenotypeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrphanetId(String);

impl OrphanetId {
    pub fn from_phenotype_key(key: &str) -> Result<Self, IngressError> {
        let tail = key.rsplit('_').next().unwrap_or(key);
        tail.parse().map_err(|_| IngressError::MalformedKey {
            key: key.to_string(),
            reason: "no trailing numeric Orphanet id".to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn term_uri(&self) -> String {
        format!("{ORDO_TERM_NAMESPACE}{}", self.0)
    }
}

impl fmt::Display for OrphanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrphanetId {
    type Err = IngressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(IngressError::MalformedKey {
                key: value.to_string(),
                reason: "Orphanet id must be numeric".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phenotype {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub cross_references: Vec<String>,
}

impl Phenotype {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        cross_references: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            cross_references: dedup_preserving_order(cross_references),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Study {
    pub id: String,
    pub description: String,
    pub phenotype: Arc<Phenotype>,
}

impl Study {
    pub fn from_accession(
        accession: &str,
        description: impl Into<String>,
        phenotype: Arc<Phenotype>,
    ) -> Option<Self> {
        let number = accession.trim().strip_prefix(STUDY_ACCESSION_PREFIX)?;
        if number.is_empty() {
            return None;
        }
        Some(Self {
            id: format!("{STUDY_NAMESPACE}{number}"),
            description: description.into(),
            phenotype,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Phenotype(Arc<Phenotype>),
    Study(Study),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Phenotype(phenotype) => &phenotype.id,
            Entity::Study(study) => &study.id,
        }
    }
}

/// Outcome of resolving one raw record: the phenotype plus any studies that reference it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub phenotype: Arc<Phenotype>,
    pub studies: Vec<Study>,
}

impl Resolved {
    pub fn phenotype_only(phenotype: Phenotype) -> Self {
        Self {
            phenotype: Arc::new(phenotype),
            studies: Vec::new(),
        }
    }

    pub fn into_entities(self) -> impl Iterator<Item = Entity> {
        std::iter::once(Entity::Phenotype(self.phenotype))
            .chain(self.studies.into_iter().map(Entity::Study))
    }
}

pub fn dedup_preserving_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn classify_prefers_ontology_marker() {
        assert_eq!(
            PhenotypeSource::classify("Orphanet_93460"),
            PhenotypeSource::Ontology
        );
        assert_eq!(
            PhenotypeSource::classify("gcat_trait_Orphanet_like"),
            PhenotypeSource::Ontology
        );
        assert_eq!(
            PhenotypeSource::classify("gcat_trait_body_mass_index"),
            PhenotypeSource::Catalog
        );
        assert_eq!(PhenotypeSource::classify("T2D"), PhenotypeSource::Portal);
    }

    #[test]
    fn parse_orphanet_id_from_key() {
        let id = OrphanetId::from_phenotype_key("Orphanet_93460").unwrap();
        assert_eq!(id.as_str(), "93460");
        assert_eq!(id.term_uri(), "http://www.orpha.net/ORDO/Orphanet_93460");
    }

    #[test]
    fn parse_orphanet_id_rejects_missing_number() {
        let err = OrphanetId::from_phenotype_key("Orphanet_").unwrap_err();
        assert_matches!(err, IngressError::MalformedKey { .. });

        let err = OrphanetId::from_phenotype_key("Orphanet_abc").unwrap_err();
        assert_matches!(err, IngressError::MalformedKey { .. });
    }

    #[test]
    fn study_id_from_accession() {
        let phenotype = Arc::new(Phenotype::new("EFO:0001", "k", "K", NO_DESCRIPTION, []));
        let study = Study::from_accession("GCST001", "Study A", phenotype.clone()).unwrap();
        assert_eq!(study.id, "GCST:001");
        assert!(Study::from_accession("PMID123", "x", phenotype.clone()).is_none());
        assert!(Study::from_accession("GCST", "x", phenotype).is_none());
    }

    #[test]
    fn cross_references_are_deduplicated() {
        let phenotype = Phenotype::new(
            "id",
            "k",
            "K",
            NO_DESCRIPTION,
            vec!["a".to_string(), "b".to_string(), "a".to_string()],
        );
        assert_eq!(phenotype.cross_references, vec!["a", "b"]);
    }
}
