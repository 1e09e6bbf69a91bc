use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("This feature is not supported yet: {0}.")]
    UnsupportedFeature(String),
    #[error("Invalid value for field {field}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("Could not read the transaction descriptor: {source}")]
    Deserialization {
        #[from]
        source: serde_json::Error,
    },
}
impl Error {
    pub fn invalid_field(field: impl Into<String>, reason: impl core::fmt::Display) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}
