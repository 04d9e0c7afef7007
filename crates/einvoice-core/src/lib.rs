//! Core library for rendering Chinese electronic invoices to PDF.
//!
//! This crate provides:
//! - Deserialization of invoice XML documents into a typed model
//! - Display rules for tax rates, dates and amounts
//! - A small table layout engine and the fixed single-page invoice layout
//! - PDF serialization with embedded TrueType fonts
//! - Sequential batch conversion of a directory of invoices

pub mod batch;
pub mod error;
pub mod invoice;
pub mod models;
pub mod pdf;

pub use batch::{discover_invoices, BatchConverter, BatchEvent, BatchReport, FailedFile};
pub use error::{EinvoiceError, ParseError, RenderError, ResourceLoadError, Result};
pub use invoice::{InvoiceParser, XmlInvoiceParser};
pub use models::config::EinvoiceConfig;
pub use models::invoice::EInvoice;
pub use pdf::{InvoiceRenderer, PageLayout, RenderResources};
