use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhabciError {
    #[error("GIT_BRANCH was not set. Are you running this outside of a CI build?")]
    MissingBranch,

    #[error("the diff_id ({0}) was not a valid diff")]
    InvalidDiffId(String),

    #[error("Missing 'name' argument")]
    MissingName,

    #[error("{0} was not set")]
    MissingSetting(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("HTTP error: {0}")]
    Http(Box<ureq::Error>),

    #[error("Conduit call {method} failed ({code}): {info}")]
    Conduit {
        method: String,
        code: String,
        info: String,
    },

    #[error("`{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown coverage format")]
    UnknownFormat,
}

impl PhabciError {
    /// Errors caused by missing or malformed job input rather than a
    /// failing collaborator.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PhabciError::MissingBranch
                | PhabciError::InvalidDiffId(_)
                | PhabciError::MissingName
                | PhabciError::MissingSetting(_)
        )
    }
}

impl From<ureq::Error> for PhabciError {
    fn from(e: ureq::Error) -> Self {
        PhabciError::Http(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, PhabciError>;
