use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Reply has no '{0}' header line")]
    MissingHeader(&'static str),

    #[error("Malformed {kind} record: '{line}'")]
    MalformedRecord { kind: &'static str, line: String },

    #[error("Invalid number '{value}' in {kind} record")]
    InvalidNumber { kind: &'static str, value: String },

    #[error("Invalid model identifier: '{0}'")]
    InvalidModelId(String),
}

impl ParseError {
    pub(crate) fn malformed(kind: &'static str, line: &str) -> Self {
        ParseError::MalformedRecord {
            kind,
            line: line.to_string(),
        }
    }
}
