use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::warn;

use crate::domain::{Entity, Phenotype, Study};
use crate::error::IngressError;

pub const PHENOTYPE_LABEL: &str = "Phenotype";
pub const STUDY_LABEL: &str = "Study";
pub const HAS_PHENOTYPE: &str = "HAS_PHENOTYPE";

pub type Properties = BTreeMap<String, Value>;

pub trait GraphTransaction {
    /// Creates the node or overwrites the attributes of the existing node with this id.
    fn merge_node(
        &mut self,
        label: &str,
        id: &str,
        properties: &Properties,
    ) -> Result<(), IngressError>;

    /// Creates the relationship unless it already exists. Both endpoints must exist.
    fn merge_relationship(
        &mut self,
        source: &str,
        rel_type: &str,
        target: &str,
    ) -> Result<(), IngressError>;

    fn commit(self) -> Result<(), IngressError>;
}

pub trait GraphStore {
    type Transaction<'a>: GraphTransaction
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, IngressError>;
    fn clear(&mut self) -> Result<(), IngressError>;
    fn node_count(&self) -> Result<usize, IngressError>;
    fn relationship_count(&self) -> Result<usize, IngressError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failed: usize,
}

pub struct GraphLoader<'a, S: GraphStore> {
    store: &'a mut S,
}

impl<'a, S: GraphStore> GraphLoader<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Merges every entity in its own transaction. A failed entity is rolled
    /// back and counted; loading continues with the next one.
    pub fn load(&mut self, entities: &[Entity]) -> LoadSummary {
        let mut summary = LoadSummary::default();
        for entity in entities {
            match self.merge_entity(entity) {
                Ok(()) => summary.loaded += 1,
                Err(err) => {
                    warn!(id = %entity.id(), error = %err, "failed to merge entity");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    pub fn merge_entity(&mut self, entity: &Entity) -> Result<(), IngressError> {
        let mut tx = self.store.begin()?;
        match entity {
            Entity::Phenotype(phenotype) => {
                tx.merge_node(PHENOTYPE_LABEL, &phenotype.id, &phenotype_properties(phenotype))?;
            }
            Entity::Study(study) => {
                let phenotype = &study.phenotype;
                tx.merge_node(PHENOTYPE_LABEL, &phenotype.id, &phenotype_properties(phenotype))?;
                tx.merge_node(STUDY_LABEL, &study.id, &study_properties(study))?;
                tx.merge_relationship(&study.id, HAS_PHENOTYPE, &phenotype.id)?;
            }
        }
        tx.commit()
    }
}

pub fn phenotype_properties(phenotype: &Phenotype) -> Properties {
    Properties::from([
        ("name".to_string(), Value::from(phenotype.name.as_str())),
        (
            "display_name".to_string(),
            Value::from(phenotype.display_name.as_str()),
        ),
        (
            "description".to_string(),
            Value::from(phenotype.description.as_str()),
        ),
        (
            "cross_references".to_string(),
            Value::from(phenotype.cross_references.clone()),
        ),
    ])
}

pub fn study_properties(study: &Study) -> Properties {
    Properties::from([(
        "description".to_string(),
        Value::from(study.description.as_str()),
    )])
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Relationship {
    pub source: String,
    pub rel_type: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryGraph {
    nodes: BTreeMap<String, Node>,
    relationships: BTreeSet<Relationship>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.nodes.iter()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }
}

pub struct MemoryTransaction<'a> {
    graph: &'a mut MemoryGraph,
    nodes: BTreeMap<String, Node>,
    relationships: Vec<Relationship>,
}

impl GraphTransaction for MemoryTransaction<'_> {
    fn merge_node(
        &mut self,
        label: &str,
        id: &str,
        properties: &Properties,
    ) -> Result<(), IngressError> {
        self.nodes.insert(
            id.to_string(),
            Node {
                label: label.to_string(),
                properties: properties.clone(),
            },
        );
        Ok(())
    }

    fn merge_relationship(
        &mut self,
        source: &str,
        rel_type: &str,
        target: &str,
    ) -> Result<(), IngressError> {
        for endpoint in [source, target] {
            if !self.nodes.contains_key(endpoint) && !self.graph.nodes.contains_key(endpoint) {
                return Err(IngressError::GraphStore(format!(
                    "relationship endpoint {endpoint} has not been merged"
                )));
            }
        }
        self.relationships.push(Relationship {
            source: source.to_string(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }

    fn commit(self) -> Result<(), IngressError> {
        self.graph.nodes.extend(self.nodes);
        self.graph.relationships.extend(self.relationships);
        Ok(())
    }
}

impl GraphStore for MemoryGraph {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, IngressError> {
        Ok(MemoryTransaction {
            graph: self,
            nodes: BTreeMap::new(),
            relationships: Vec::new(),
        })
    }

    fn clear(&mut self) -> Result<(), IngressError> {
        self.nodes.clear();
        self.relationships.clear();
        Ok(())
    }

    fn node_count(&self) -> Result<usize, IngressError> {
        Ok(self.nodes.len())
    }

    fn relationship_count(&self) -> Result<usize, IngressError> {
        Ok(self.relationships.len())
    }
}
