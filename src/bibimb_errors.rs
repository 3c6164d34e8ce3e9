use thiserror::Error;

#[derive(Error, Debug)]
pub enum BibimbError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid growth curve mode: {0}")]
    InvalidMode(String),

    #[error("Orbit integration failed: {0}")]
    Integration(String),

    #[error("Malformed file: {0}")]
    FileFormat(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown potential type: {0}")]
    UnknownPotential(String),

    #[error("Error during the nom parsing: {0}")]
    NomParsing(String),

    #[error("Unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML configuration error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PartialEq for BibimbError {
    fn eq(&self, other: &Self) -> bool {
        use BibimbError::*;
        match (self, other) {
            (Configuration(a), Configuration(b)) => a == b,
            (InvalidMode(a), InvalidMode(b)) => a == b,
            (Integration(a), Integration(b)) => a == b,
            (FileFormat(a), FileFormat(b)) => a == b,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (UnknownPotential(a), UnknownPotential(b)) => a == b,
            (NomParsing(a), NomParsing(b)) => a == b,

            // not comparable: equal when same variant
            (Io(_), Io(_)) => true,
            (Csv(_), Csv(_)) => true,
            (Toml(_), Toml(_)) => true,

            _ => false,
        }
    }
}
