//! Error types for the einvoice-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the einvoice library.
#[derive(Error, Debug)]
pub enum EinvoiceError {
    /// Invoice XML could not be deserialized.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Fonts or images needed for rendering could not be loaded.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceLoadError),

    /// PDF rendering error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while deserializing an invoice document.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The document is not well-formed XML or does not match the schema.
    #[error("invalid invoice XML: {0}")]
    Xml(String),

    /// Required element is missing.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// Element is present but its value cannot be interpreted.
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },
}

impl From<quick_xml::DeError> for ParseError {
    fn from(err: quick_xml::DeError) -> Self {
        let message = err.to_string();
        // quick-xml reports absent struct fields as "missing field `Name`"
        if let Some(field) = message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.strip_suffix('`'))
        {
            return ParseError::MissingElement(field.to_string());
        }
        // Custom field validators report "invalid value for Name: raw"
        if let Some((field, value)) = message
            .strip_prefix("invalid value for ")
            .and_then(|rest| rest.split_once(": "))
        {
            return ParseError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
            };
        }
        ParseError::Xml(message)
    }
}

/// Errors raised while loading fonts and images at startup.
#[derive(Error, Debug)]
pub enum ResourceLoadError {
    /// Asset file does not exist.
    #[error("resource not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Asset file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Font program could not be parsed.
    #[error("failed to parse font {name}: {reason}")]
    Font { name: String, reason: String },

    /// Bitmap could not be decoded.
    #[error("failed to decode image {name}: {reason}")]
    Image { name: String, reason: String },
}

/// Errors raised while producing PDF bytes.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Low-level PDF object or stream error.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Content stream could not be encoded.
    #[error("failed to encode content stream: {0}")]
    Content(String),

    /// Failed to serialize the document.
    #[error("failed to write document: {0}")]
    Write(#[from] std::io::Error),
}

/// Result type for the einvoice library.
pub type Result<T> = std::result::Result<T, EinvoiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_maps_to_missing_element() {
        let err = ParseError::from(quick_xml::DeError::Custom(
            "missing field `InvoiceNumber`".to_string(),
        ));
        assert!(matches!(err, ParseError::MissingElement(ref f) if f == "InvoiceNumber"));
    }

    #[test]
    fn test_other_errors_stay_xml() {
        let err = ParseError::from(quick_xml::DeError::Custom("unexpected end".to_string()));
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn test_error_display() {
        let err = EinvoiceError::from(ResourceLoadError::NotFound(PathBuf::from("fonts/simkai.ttf")));
        assert_eq!(
            err.to_string(),
            "resource error: resource not found: fonts/simkai.ttf"
        );
    }
}
