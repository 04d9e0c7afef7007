//! Composes the single-page invoice layout.

use std::time::Instant;

use tracing::{debug, trace};

use crate::invoice::rules::{format_issue_date, format_tax_rate, with_currency};
use crate::models::invoice::{EInvoice, IssueItem};

use super::font::{Color, TextStyle};
use super::layout::{
    Borders, Cell, Chunk, DrawOp, Edges, HAlign, Paragraph, Phrase, Table, VAlign,
};
use super::resources::RenderResources;
use super::writer::PdfWriter;
use super::{Result, CONTENT_WIDTH, MARGIN_LEFT, MARGIN_TOP, PAGE_HEIGHT, PAGE_WIDTH};

/// Minimum height of the items table; a filler row makes up the difference.
const ITEMS_MIN_HEIGHT: f32 = 110.0;

/// Fixed height of the remarks row.
const REMARKS_HEIGHT: f32 = 56.0;

/// Size of the mark in front of the amount in words.
const TOTAL_IMAGE_SIZE: f32 = 14.0;

/// Horizontal scaling of taxpayer identification numbers.
const ID_NUMBER_SCALE: f32 = 0.9;

/// Blocks of the page, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Title,
    BuyerSeller,
    Items,
    Subtotal,
    GrandTotal,
    Remarks,
    Signature,
}

impl RegionKind {
    /// Page order.
    pub const ORDER: [RegionKind; 7] = [
        RegionKind::Title,
        RegionKind::BuyerSeller,
        RegionKind::Items,
        RegionKind::Subtotal,
        RegionKind::GrandTotal,
        RegionKind::Remarks,
        RegionKind::Signature,
    ];
}

/// One laid-out block with its vertical extent.
#[derive(Debug, Clone)]
pub struct Region {
    pub kind: RegionKind,
    /// Upper edge in page coordinates.
    pub top: f32,
    /// Lower edge in page coordinates.
    pub bottom: f32,
    /// Heights of the table rows, or of the paragraph for the signature.
    pub row_heights: Vec<f32>,
    pub ops: Vec<DrawOp>,
}

impl Region {
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn row_count(&self) -> usize {
        self.row_heights.len()
    }
}

/// Complete page ready to be serialized.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    /// Document title stored in the PDF metadata.
    pub document_title: String,
    regions: Vec<Region>,
}

impl PageLayout {
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, kind: RegionKind) -> Option<&Region> {
        self.regions.iter().find(|r| r.kind == kind)
    }

    /// Every draw operation on the page, in region order.
    pub fn ops(&self) -> impl Iterator<Item = &DrawOp> {
        self.regions.iter().flat_map(|r| r.ops.iter())
    }
}

/// Renders invoices to the fixed single-page layout.
#[derive(Debug, Clone, Default)]
pub struct InvoiceRenderer {
    writer: PdfWriter,
}

impl InvoiceRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render an invoice to PDF bytes.
    pub fn render(&self, invoice: &EInvoice, resources: &RenderResources) -> Result<Vec<u8>> {
        let start = Instant::now();
        let layout = self.compose(invoice, resources);
        let bytes = self.writer.write(&layout, resources)?;
        debug!(
            "Rendered invoice {} ({} bytes) in {:?}",
            invoice.invoice_number(),
            bytes.len(),
            start.elapsed()
        );
        Ok(bytes)
    }

    /// Lay out the seven blocks of the page.
    pub fn compose(&self, invoice: &EInvoice, resources: &RenderResources) -> PageLayout {
        let mut flow = Flow {
            cursor: PAGE_HEIGHT - MARGIN_TOP,
            resources,
            regions: Vec::with_capacity(RegionKind::ORDER.len()),
        };

        let title_top = flow.cursor;
        flow.table(RegionKind::Title, &title_table(invoice));
        if let Some(title) = flow.regions.last_mut() {
            title.ops.extend(title_rules(title_top));
        }

        flow.table(RegionKind::BuyerSeller, &buyer_seller_table(invoice));
        flow.table(RegionKind::Items, &items_table(invoice.items(), resources));
        flow.table(RegionKind::Subtotal, &subtotal_table(invoice));
        flow.table(RegionKind::GrandTotal, &grand_total_table(invoice));
        flow.table(RegionKind::Remarks, &remarks_table(invoice));
        flow.paragraph(RegionKind::Signature, &signature(invoice));

        for region in &flow.regions {
            trace!(
                "{:?}: top {:.1}, bottom {:.1}, {} rows",
                region.kind,
                region.top,
                region.bottom,
                region.row_count()
            );
        }

        PageLayout {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            document_title: invoice.invoice_number().to_string(),
            regions: flow.regions,
        }
    }
}

/// Vertical cursor stacking blocks down the page.
struct Flow<'a> {
    cursor: f32,
    resources: &'a RenderResources,
    regions: Vec<Region>,
}

impl Flow<'_> {
    fn table(&mut self, kind: RegionKind, table: &Table) {
        let (before, after) = table.spacing();
        let top = self.cursor - before;
        let layout = table.layout(MARGIN_LEFT, top, self.resources);
        let bottom = top - layout.height();
        self.cursor = bottom - after;
        self.regions.push(Region {
            kind,
            top,
            bottom,
            row_heights: layout.row_heights,
            ops: layout.ops,
        });
    }

    fn paragraph(&mut self, kind: RegionKind, paragraph: &Paragraph) {
        let top = self.cursor;
        let (ops, height) = paragraph.layout(MARGIN_LEFT, top, CONTENT_WIDTH, self.resources);
        self.cursor = top - height;
        self.regions.push(Region {
            kind,
            top,
            bottom: self.cursor,
            row_heights: vec![height],
            ops,
        });
    }
}

/// Cell with the dark red border used throughout the form.
fn cell(phrase: impl Into<Phrase>) -> Cell {
    Cell::new(phrase).border_color(Color::FIELD)
}

fn label_and_value(label: &str, value: &str) -> Phrase {
    Phrase::new()
        .chunk(Chunk::new(label, TextStyle::FIELD))
        .chunk(Chunk::new(value, TextStyle::CONTENT))
}

fn title_table(invoice: &EInvoice) -> Table {
    let padding = Edges::new(0.0, 10.0, 0.0, 0.0);
    let issue_date = format_issue_date(&invoice.tax_supervision_info.issue_time);

    Table::new(&[210.0, 374.0, 210.0], CONTENT_WIDTH)
        .spacing_after(25.0)
        .cell(Cell::empty().borders(Borders::empty()))
        .cell(
            cell(Phrase::text(invoice.title(), TextStyle::TITLE))
                .borders(Borders::empty())
                .padding(padding)
                .h_align(HAlign::Center),
        )
        .cell(
            Cell::paragraphs(vec![
                Paragraph::new(label_and_value("发票号码：", invoice.invoice_number())),
                Paragraph::new(label_and_value("开票日期：", &issue_date)),
            ])
            .borders(Borders::empty())
            .padding(padding),
        )
}

/// Double rule under the title.
fn title_rules(top: f32) -> Vec<DrawOp> {
    [42.0, 45.0]
        .into_iter()
        .map(|offset| DrawOp::Line {
            from: (190.0, top - offset),
            to: (PAGE_WIDTH - 200.0, top - offset),
            width: 0.6,
            color: Color::FIELD,
        })
        .collect()
}

fn buyer_seller_table(invoice: &EInvoice) -> Table {
    let buyer = &invoice.data.buyer_information;
    let seller = &invoice.data.seller_information;

    let role = |label: &str| {
        cell(Phrase::text(label, TextStyle::FIELD))
            .rowspan(2)
            .padding(Edges::new(3.0, 6.0, 3.0, 6.0))
    };
    let name = |value: &str, padding: Edges| {
        cell(label_and_value("名称：", value))
            .without(Borders::LEFT | Borders::BOTTOM)
            .padding(padding)
    };
    let id_number = |value: &str| {
        cell(
            Phrase::new()
                .chunk(Chunk::new("统一社会信用代码/纳税人识别号：", TextStyle::FIELD))
                .chunk(Chunk::new(value, TextStyle::ID_NUMBER).with_h_scale(ID_NUMBER_SCALE)),
        )
        .without(Borders::LEFT | Borders::TOP)
        .padding(Edges::new(3.0, 5.0, 3.0, 0.0))
    };

    Table::new(&[34.0, 550.0, 34.0, 550.0], CONTENT_WIDTH)
        .cell(role("购买方信息"))
        .cell(name(&buyer.buyer_name, Edges::new(3.0, 10.0, 3.0, 10.0)))
        .cell(role("销售方信息"))
        .cell(name(&seller.seller_name, Edges::new(3.0, 10.0, 3.0, 0.0)))
        .cell(id_number(&buyer.buyer_id_num))
        .cell(id_number(&seller.seller_id_num))
}

const ITEM_COLUMNS: usize = 8;

fn items_table(items: &[IssueItem], resources: &RenderResources) -> Table {
    const HEADERS: [(&str, HAlign); ITEM_COLUMNS] = [
        ("项目名称", HAlign::Center),
        ("规格型号", HAlign::Center),
        ("单 位", HAlign::Center),
        ("数 量", HAlign::Center),
        ("单 价", HAlign::Right),
        ("金 额", HAlign::Right),
        ("税率/征收率", HAlign::Center),
        ("税 额", HAlign::Right),
    ];

    let mut table = Table::new(
        &[170.0, 114.0, 62.0, 120.0, 120.0, 120.0, 106.0, 126.0],
        CONTENT_WIDTH,
    );

    for (i, (label, align)) in HEADERS.into_iter().enumerate() {
        table.push(
            cell(Phrase::text(label, TextStyle::FIELD))
                .borders(edge_borders(i, Borders::BOTTOM))
                .padding(Edges::new(5.0, 4.0, 5.0, 6.0))
                .h_align(align),
        );
    }

    for item in items {
        let tax_rate = format_tax_rate(&item.tax_rate);
        let values = [
            (item.item_name.as_str(), HAlign::Left),
            (item.spec_mod.as_deref().unwrap_or_default(), HAlign::Center),
            (item.mea_units.as_deref().unwrap_or_default(), HAlign::Center),
            (item.quantity.as_deref().unwrap_or_default(), HAlign::Center),
            (item.un_price.as_deref().unwrap_or_default(), HAlign::Right),
            (item.amount.as_str(), HAlign::Right),
            (tax_rate.as_str(), HAlign::Center),
            (item.com_tax_am.as_str(), HAlign::Right),
        ];
        for (i, (value, align)) in values.into_iter().enumerate() {
            table.push(
                cell(Phrase::text(value, TextStyle::CONTENT))
                    .borders(edge_borders(i, Borders::empty()))
                    .padding(Edges::uniform(0.0))
                    .h_align(align)
                    .v_align(VAlign::Top),
            );
        }
    }

    let filler = ITEMS_MIN_HEIGHT - table.total_height(resources);
    table.cell(
        Cell::empty()
            .border_color(Color::FIELD)
            .borders(Borders::LEFT | Borders::RIGHT)
            .colspan(ITEM_COLUMNS)
            .fixed_height(filler),
    )
}

/// Borders of a cell in an eight-column row: outer columns close the table sides.
fn edge_borders(column: usize, base: Borders) -> Borders {
    match column {
        0 => base | Borders::LEFT,
        c if c == ITEM_COLUMNS - 1 => base | Borders::RIGHT,
        _ => base,
    }
}

fn subtotal_table(invoice: &EInvoice) -> Table {
    let basic = &invoice.data.basic_information;
    let padding = Edges::new(5.0, 4.0, 5.0, 6.0);

    Table::new(&[247.0, 460.0, 240.0], CONTENT_WIDTH)
        .cell(
            cell(Phrase::text("合\u{3000}\u{3000}\u{3000}\u{3000}计", TextStyle::FIELD))
                .borders(Borders::LEFT | Borders::BOTTOM)
                .padding(padding)
                .h_align(HAlign::Center),
        )
        .cell(
            cell(Phrase::text(with_currency(&basic.total_am_without_tax), TextStyle::CONTENT))
                .borders(Borders::BOTTOM)
                .padding(padding)
                .h_align(HAlign::Right),
        )
        .cell(
            cell(Phrase::text(with_currency(&basic.total_tax_am), TextStyle::CONTENT))
                .borders(Borders::RIGHT | Borders::BOTTOM)
                .padding(padding)
                .h_align(HAlign::Right),
        )
}

fn grand_total_table(invoice: &EInvoice) -> Table {
    let basic = &invoice.data.basic_information;
    let padding = Edges::new(5.0, 4.0, 5.0, 6.0);

    let words = Phrase::new()
        .chunk(Chunk::image(TOTAL_IMAGE_SIZE, TOTAL_IMAGE_SIZE))
        .chunk(Chunk::new(&basic.total_tax_included_amount_in_chinese, TextStyle::CONTENT).with_rise(4.0));
    let figures = Phrase::new()
        .chunk(Chunk::new("（小写）", TextStyle::FIELD).with_rise(1.2))
        .chunk(
            Chunk::new(with_currency(&basic.total_tax_included_amount), TextStyle::CONTENT)
                .with_rise(1.2),
        );

    Table::new(&[247.0, 414.0, 287.0], CONTENT_WIDTH)
        .cell(
            cell(Phrase::text("价税合计（大写）", TextStyle::FIELD))
                .without(Borders::TOP)
                .padding(padding)
                .h_align(HAlign::Center)
                .v_align(VAlign::Middle),
        )
        .cell(
            cell(words)
                .borders(Borders::BOTTOM)
                .padding(Edges::uniform(5.0))
                .v_align(VAlign::Middle),
        )
        .cell(
            cell(figures)
                .borders(Borders::RIGHT | Borders::BOTTOM)
                .padding(padding)
                .v_align(VAlign::Middle),
        )
}

fn remarks_table(invoice: &EInvoice) -> Table {
    Table::new(&[18.0, 566.0], CONTENT_WIDTH)
        .cell(
            cell(Phrase::text("备\n\n注", TextStyle::FIELD))
                .without(Borders::TOP)
                .padding(Edges::new(3.0, 6.0, 3.0, 6.0))
                .h_align(HAlign::Center)
                .v_align(VAlign::Middle)
                .fixed_height(REMARKS_HEIGHT),
        )
        .cell(
            cell(Phrase::text(invoice.remark(), TextStyle::CONTENT))
                .borders(Borders::RIGHT | Borders::BOTTOM)
                .padding(Edges::uniform(0.0))
                .fixed_height(REMARKS_HEIGHT),
        )
}

fn signature(invoice: &EInvoice) -> Paragraph {
    Paragraph::new(label_and_value(
        "开票人：",
        &invoice.data.basic_information.drawer,
    ))
    .spacing_before(12.0)
    .first_line_indent(45.0)
}
