//! XML deserializer for electronic invoice documents.

use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, trace};

use crate::error::{EinvoiceError, ParseError};
use crate::models::invoice::EInvoice;

use super::Result;

/// Trait for invoice parsing.
pub trait InvoiceParser {
    /// Parse one invoice from the raw document bytes.
    fn parse(&self, xml: &[u8]) -> Result<EInvoice>;

    /// Read and parse one invoice file.
    fn parse_file(&self, path: &Path) -> crate::Result<EInvoice> {
        let data = fs::read(path)?;
        self.parse(&data).map_err(EinvoiceError::from)
    }
}

/// Parser for the accounting data standard XML schema, backed by quick-xml.
///
/// Unknown elements are skipped; every element of the record tree that is
/// not optional must be present.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlInvoiceParser;

impl XmlInvoiceParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }
}

impl InvoiceParser for XmlInvoiceParser {
    fn parse(&self, xml: &[u8]) -> Result<EInvoice> {
        let start = Instant::now();

        let text = std::str::from_utf8(xml)
            .map_err(|e| ParseError::Xml(format!("document is not valid UTF-8: {}", e)))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let invoice: EInvoice = quick_xml::de::from_str(text)?;

        debug!(
            "Parsed invoice {} with {} items in {:?}",
            invoice.invoice_number(),
            invoice.items().len(),
            start.elapsed()
        );
        trace!("Parsed invoice: {:?}", invoice);

        Ok(invoice)
    }
}
