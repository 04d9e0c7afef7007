//! Invoice document deserialization and field display rules.

mod parser;
pub mod rules;

pub use parser::{InvoiceParser, XmlInvoiceParser};

#[cfg(test)]
pub(crate) use parser::tests::SAMPLE_XML;

use crate::error::ParseError;

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;
