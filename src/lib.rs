pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod ontology;
pub mod output;
pub mod pipeline;
pub mod portal;
pub mod reference;
pub mod resolve;
pub mod sqlite;
