use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IngressError {
    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    ConfigValue(String),

    #[error("BioIndex request failed: {0}")]
    FetchHttp(String),

    #[error("BioIndex returned status {status}: {message}")]
    FetchStatus { status: u16, message: String },

    #[error("failed to decode BioIndex page: {0}")]
    FetchDecode(String),

    #[error("failed to read reference file {path}: {message}")]
    ReferenceRead { path: Utf8PathBuf, message: String },

    #[error("GWAS catalog layout mismatch: {0}")]
    #[diagnostic(help("the catalog is read by column position; check the file matches the v1.0.3 studies layout"))]
    CatalogSchema(String),

    #[error("portal mapping layout mismatch: {0}")]
    PortalSchema(String),

    #[error("failed to load ontology: {0}")]
    OntologyLoad(String),

    #[error("ontology query failed: {0}")]
    OntologyQuery(String),

    #[error("malformed phenotype key {key}: {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("graph store error: {0}")]
    GraphStore(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl From<rusqlite::Error> for IngressError {
    fn from(value: rusqlite::Error) -> Self {
        IngressError::GraphStore(value.to_string())
    }
}
