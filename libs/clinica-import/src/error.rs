use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("not a Word document: {0}")]
    NotADocx(String),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("document body exceeds {0} bytes once decompressed")]
    TooLarge(u64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("required field '{0}' was not found in the document")]
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, ImportError>;
