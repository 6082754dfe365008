use crate::ty::ValueKind;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Strict mode only. Every violation found by one call, one per line.
    #[error("{}", .0.join("\n"))]
    TypeMismatch(Vec<String>),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("failed to parse JSON input: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot convert a {found} into record `{record}`: expected a JSON object")]
    NotAnObject { record: String, found: ValueKind },
}

impl ConvertError {
    /// Failures that make a collection element fall through to the next
    /// candidate record type.
    pub fn is_candidate_rejection(&self) -> bool {
        !matches!(self, ConvertError::Parse(_))
    }

    /// The individual failure lines of this error.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ConvertError::TypeMismatch(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    #[error("record `{record}` is missing required field(s): {}", .fields.join(", "))]
    MissingFields { record: String, fields: Vec<String> },

    #[error("record `{record}` has no field named `{field}`")]
    UnknownField { record: String, field: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("at JSON path {path} → {message}")]
    Syntax { path: String, message: String },

    #[error("invalid type `{text}`: {message}")]
    Type { text: String, message: String },

    #[error("record `{record}` field `{field}` refers to undeclared record `{name}`")]
    UnknownRecord {
        record: String,
        field: String,
        name: String,
    },

    #[error("record `{0}` is declared more than once")]
    DuplicateRecord(String),
}
