use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("The layer is violating the expected format, because: {reason}")]
    FormatError { reason: &'static str },

    /// Represents an empty source. For example, an empty text file being given
    /// as input to `UsdaReader::parse_layer()`.
    #[error("Source contains no data")]
    EmptySource,

    #[error("Syntax error in line {line}: {reason}")]
    SyntaxError { line: usize, reason: String },

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

pub mod highlevel;
pub mod usda;
