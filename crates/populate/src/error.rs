use thiserror::Error;

use sheetfill_io::XlsxError;

#[derive(Debug, Error)]
pub enum PopulateError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty synonym, bad canonical key, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Data item list could not be read.
    #[error("data items parse error: {0}")]
    ItemsParse(String),
    /// Template failed to load or serialize. Always fatal.
    #[error("template workbook error: {0}")]
    Workbook(#[from] XlsxError),
}
