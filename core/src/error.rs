use crate::DocId;
use thiserror::Error;

/// Broad category of a [`SearchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied a bad id, text, query or configuration.
    InvalidArgument,
    /// The referenced document is not live.
    NotFound,
    /// The index structures disagree with each other. Always a bug.
    InternalInvariant,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("invalid document id {id}: ids must be non-negative")]
    InvalidId { id: DocId },

    #[error("document id {id} is already in use")]
    DuplicateId { id: DocId },

    #[error("document text contains a control character")]
    InvalidText,

    #[error("stop word {word:?} contains a control character")]
    InvalidStopWord { word: String },

    #[error("query contains a control character")]
    InvalidQuery,

    #[error("query contains a lone '-' with no term after it")]
    EmptyMinusTerm,

    #[error("query token {token:?} starts with more than one '-'")]
    DoubleMinus { token: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("document {id} not found")]
    UnknownId { id: DocId },

    #[error("index inconsistency: {0}")]
    Inconsistent(String),
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::InvalidId { .. }
            | SearchError::DuplicateId { .. }
            | SearchError::InvalidText
            | SearchError::InvalidStopWord { .. }
            | SearchError::InvalidQuery
            | SearchError::EmptyMinusTerm
            | SearchError::DoubleMinus { .. }
            | SearchError::InvalidConfig(_) => ErrorKind::InvalidArgument,
            SearchError::UnknownId { .. } => ErrorKind::NotFound,
            SearchError::Inconsistent(_) => ErrorKind::InternalInvariant,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_are_invalid_argument() {
        assert_eq!(SearchError::EmptyMinusTerm.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            SearchError::DoubleMinus { token: "--cat".into() }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(SearchError::UnknownId { id: 3 }.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn messages_name_the_offender() {
        let err = SearchError::DuplicateId { id: 42 };
        assert_eq!(err.to_string(), "document id 42 is already in use");
    }
}
