use thiserror::Error;

/// Failure to read or write an XLSX package. All variants are fatal to a load.
#[derive(Debug, Error)]
pub enum XlsxError {
    /// Not a ZIP container, or a corrupt one.
    #[error("not a readable xlsx package: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// A part the package must have is absent.
    #[error("xlsx package is missing part '{0}'")]
    MissingPart(String),
    /// A part is not well-formed XML.
    #[error("malformed XML in '{part}': {message}")]
    Xml { part: String, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
