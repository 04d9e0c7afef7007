//! PDF rendering module.
//!
//! [`InvoiceRenderer`] composes a [`PageLayout`] from an invoice using the
//! table engine in [`layout`], and [`PdfWriter`] serializes it.

pub mod font;
pub mod layout;
mod renderer;
pub mod resources;
mod writer;

pub use font::{Color, FontKind, FontProgram, TextStyle};
pub use renderer::{InvoiceRenderer, PageLayout, Region, RegionKind};
pub use resources::{InlineImage, RenderResources};
pub use writer::PdfWriter;

use crate::error::RenderError;

/// Page width in points.
pub const PAGE_WIDTH: f32 = 610.0;

/// Page height in points.
pub const PAGE_HEIGHT: f32 = 394.0;

pub const MARGIN_LEFT: f32 = 13.0;
pub const MARGIN_RIGHT: f32 = 13.0;
pub const MARGIN_TOP: f32 = 10.0;
pub const MARGIN_BOTTOM: f32 = 0.0;

/// Width available to tables between the side margins.
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
