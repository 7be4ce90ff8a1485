use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
