//! Table and paragraph layout.
//!
//! Tables have relative column widths scaled to a locked total width. Cells are
//! placed left to right, row by row, skipping slots taken by row-spanning cells
//! above. Laying out a table or paragraph yields [`DrawOp`]s in page
//! coordinates (origin bottom-left, y grows upwards).

use std::mem;

use bitflags::bitflags;

use super::font::{is_wide, Color, TextStyle};
use super::resources::RenderResources;

/// Border width of a cell unless overridden.
pub const DEFAULT_BORDER_WIDTH: f32 = 0.5;

/// Padding on every side of a cell unless overridden.
pub const DEFAULT_PADDING: f32 = 2.0;

/// Line height as a multiple of the largest font size on the line.
const LEADING_FACTOR: f32 = 1.2;

/// Share of the font size below the baseline.
const DESCENT_FACTOR: f32 = 0.25;

/// Slack for floating point width comparisons.
const EPSILON: f32 = 0.001;

/// A primitive drawing operation on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Text run with its baseline starting at (`x`, `y`).
    Text {
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
        h_scale: f32,
        rise: f32,
    },
    /// The inline image with its lower-left corner at (`x`, `y`).
    Image { x: f32, y: f32, width: f32, height: f32 },
    /// Straight stroked line.
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Color,
    },
}

/// Horizontal alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical alignment of cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

bitflags! {
    /// Sides of a cell that get a border.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Borders: u8 {
        const LEFT = 1;
        const TOP = 1 << 1;
        const RIGHT = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

/// Per-side distances, in left, top, right, bottom order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edges {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Edges {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ChunkContent {
    Text(String),
    Image { width: f32, height: f32 },
}

/// A run of text in one style, or the inline image.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    content: ChunkContent,
    style: TextStyle,
    h_scale: f32,
    rise: f32,
}

impl Chunk {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            content: ChunkContent::Text(text.into()),
            style,
            h_scale: 1.0,
            rise: 0.0,
        }
    }

    /// The inline image scaled to `width` x `height`.
    pub fn image(width: f32, height: f32) -> Self {
        Self {
            content: ChunkContent::Image { width, height },
            style: TextStyle::CONTENT,
            h_scale: 1.0,
            rise: 0.0,
        }
    }

    /// Horizontal scaling, 1.0 being the natural width.
    pub fn with_h_scale(mut self, h_scale: f32) -> Self {
        self.h_scale = h_scale;
        self
    }

    /// Baseline offset, positive raises the chunk.
    pub fn with_rise(mut self, rise: f32) -> Self {
        self.rise = rise;
        self
    }
}

/// Sequence of chunks flowed as one piece of text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Phrase {
    chunks: Vec<Chunk>,
}

impl Phrase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phrase made of a single text chunk.
    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Self::new().chunk(Chunk::new(text, style))
    }

    pub fn chunk(mut self, chunk: Chunk) -> Self {
        self.chunks.push(chunk);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl From<Chunk> for Phrase {
    fn from(chunk: Chunk) -> Self {
        Self::new().chunk(chunk)
    }
}

/// A phrase with block-level formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    phrase: Phrase,
    align: HAlign,
    spacing_before: f32,
    first_line_indent: f32,
}

impl Paragraph {
    pub fn new(phrase: impl Into<Phrase>) -> Self {
        Self {
            phrase: phrase.into(),
            align: HAlign::Left,
            spacing_before: 0.0,
            first_line_indent: 0.0,
        }
    }

    pub fn align(mut self, align: HAlign) -> Self {
        self.align = align;
        self
    }

    pub fn spacing_before(mut self, spacing: f32) -> Self {
        self.spacing_before = spacing;
        self
    }

    pub fn first_line_indent(mut self, indent: f32) -> Self {
        self.first_line_indent = indent;
        self
    }

    /// Height of the paragraph, spacing included, when flowed into `width`.
    pub fn height(&self, width: f32, resources: &RenderResources) -> f32 {
        TextBlock::new(std::slice::from_ref(self), width, resources).height()
    }

    /// Lay the paragraph out below `top`, returning its draw operations and height.
    pub fn layout(
        &self,
        x: f32,
        top: f32,
        width: f32,
        resources: &RenderResources,
    ) -> (Vec<DrawOp>, f32) {
        let block = TextBlock::new(std::slice::from_ref(self), width, resources);
        let mut ops = Vec::new();
        block.emit(x, top, width, &mut ops);
        (ops, block.height())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CellContent {
    Empty,
    Phrase(Phrase),
    Paragraphs(Vec<Paragraph>),
}

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    content: CellContent,
    borders: Borders,
    border_width: f32,
    border_color: Color,
    padding: Edges,
    h_align: HAlign,
    v_align: VAlign,
    rowspan: usize,
    colspan: usize,
    fixed_height: Option<f32>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            content: CellContent::Empty,
            borders: Borders::all(),
            border_width: DEFAULT_BORDER_WIDTH,
            border_color: Color::BLACK,
            padding: Edges::uniform(DEFAULT_PADDING),
            h_align: HAlign::Left,
            v_align: VAlign::Top,
            rowspan: 1,
            colspan: 1,
            fixed_height: None,
        }
    }
}

impl Cell {
    /// Cell without content.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cell holding one phrase, aligned by the cell alignment.
    pub fn new(phrase: impl Into<Phrase>) -> Self {
        Self {
            content: CellContent::Phrase(phrase.into()),
            ..Self::default()
        }
    }

    /// Cell holding a stack of paragraphs, each with its own alignment.
    pub fn paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            content: CellContent::Paragraphs(paragraphs),
            ..Self::default()
        }
    }

    /// Draw exactly these sides.
    pub fn borders(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    /// Remove borders from these sides.
    pub fn without(mut self, sides: Borders) -> Self {
        self.borders.remove(sides);
        self
    }

    pub fn border_color(mut self, color: Color) -> Self {
        self.border_color = color;
        self
    }

    pub fn padding(mut self, padding: Edges) -> Self {
        self.padding = padding;
        self
    }

    pub fn h_align(mut self, align: HAlign) -> Self {
        self.h_align = align;
        self
    }

    pub fn v_align(mut self, align: VAlign) -> Self {
        self.v_align = align;
        self
    }

    pub fn rowspan(mut self, rows: usize) -> Self {
        self.rowspan = rows.max(1);
        self
    }

    pub fn colspan(mut self, cols: usize) -> Self {
        self.colspan = cols.max(1);
        self
    }

    /// Fix the cell height; negative values are clamped to zero.
    pub fn fixed_height(mut self, height: f32) -> Self {
        self.fixed_height = Some(height.max(0.0));
        self
    }

    fn text_block(&self, width: f32, resources: &RenderResources) -> TextBlock {
        match &self.content {
            CellContent::Empty => TextBlock::default(),
            CellContent::Phrase(phrase) => {
                let paragraph = Paragraph::new(phrase.clone()).align(self.h_align);
                TextBlock::new(std::slice::from_ref(&paragraph), width, resources)
            }
            CellContent::Paragraphs(paragraphs) => TextBlock::new(paragraphs, width, resources),
        }
    }

    fn inner_width(&self, width: f32) -> f32 {
        (width - self.padding.left - self.padding.right).max(0.0)
    }

    /// Height the cell needs when given `width`.
    fn natural_height(&self, width: f32, resources: &RenderResources) -> f32 {
        match self.fixed_height {
            Some(height) => height,
            None => {
                let content = self.text_block(self.inner_width(width), resources).height();
                self.padding.top + content + self.padding.bottom
            }
        }
    }

    fn emit(
        &self,
        x: f32,
        top: f32,
        width: f32,
        height: f32,
        resources: &RenderResources,
        ops: &mut Vec<DrawOp>,
    ) {
        if self.border_width > 0.0 {
            let (left, right, bottom) = (x, x + width, top - height);
            let sides = [
                (Borders::LEFT, (left, top), (left, bottom)),
                (Borders::TOP, (left, top), (right, top)),
                (Borders::RIGHT, (right, top), (right, bottom)),
                (Borders::BOTTOM, (left, bottom), (right, bottom)),
            ];
            for (side, from, to) in sides {
                if self.borders.contains(side) {
                    ops.push(DrawOp::Line {
                        from,
                        to,
                        width: self.border_width,
                        color: self.border_color,
                    });
                }
            }
        }

        let inner_width = self.inner_width(width);
        let block = self.text_block(inner_width, resources);
        if block.is_empty() {
            return;
        }

        let inner_height = height - self.padding.top - self.padding.bottom;
        let free = (inner_height - block.height()).max(0.0);
        let offset = match self.v_align {
            VAlign::Top => 0.0,
            VAlign::Middle => free / 2.0,
            VAlign::Bottom => free,
        };
        block.emit(
            x + self.padding.left,
            top - self.padding.top - offset,
            inner_width,
            ops,
        );
    }
}

/// Result of laying out a table.
#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    /// Draw operations, borders before content for each cell.
    pub ops: Vec<DrawOp>,
    /// Height of every row.
    pub row_heights: Vec<f32>,
}

impl TableLayout {
    /// Total height of the rows.
    pub fn height(&self) -> f32 {
        self.row_heights.iter().sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    index: usize,
    row: usize,
    col: usize,
    rowspan: usize,
    colspan: usize,
}

/// Grid table with locked total width.
#[derive(Debug, Clone)]
pub struct Table {
    relative_widths: Vec<f32>,
    total_width: f32,
    spacing_before: f32,
    spacing_after: f32,
    cells: Vec<Cell>,
}

impl Table {
    /// Table whose columns get `relative_widths` scaled to `total_width`.
    pub fn new(relative_widths: &[f32], total_width: f32) -> Self {
        Self {
            relative_widths: relative_widths.to_vec(),
            total_width,
            spacing_before: 0.0,
            spacing_after: 0.0,
            cells: Vec::new(),
        }
    }

    pub fn spacing_before(mut self, spacing: f32) -> Self {
        self.spacing_before = spacing;
        self
    }

    pub fn spacing_after(mut self, spacing: f32) -> Self {
        self.spacing_after = spacing;
        self
    }

    pub fn cell(mut self, cell: Cell) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub fn spacing(&self) -> (f32, f32) {
        (self.spacing_before, self.spacing_after)
    }

    /// Absolute column widths.
    pub fn column_widths(&self) -> Vec<f32> {
        let sum: f32 = self.relative_widths.iter().sum();
        if sum <= 0.0 {
            return vec![0.0; self.relative_widths.len()];
        }
        self.relative_widths
            .iter()
            .map(|w| w / sum * self.total_width)
            .collect()
    }

    /// Number of rows the cells added so far occupy.
    pub fn row_count(&self) -> usize {
        self.place().1
    }

    /// Height of the rows added so far.
    pub fn total_height(&self, resources: &RenderResources) -> f32 {
        let (placements, rows) = self.place();
        self.row_heights(&placements, rows, &self.column_widths(), resources)
            .iter()
            .sum()
    }

    /// Lay the table out with its top-left corner at (`x`, `top`).
    ///
    /// Spacing before and after is left to the caller.
    pub fn layout(&self, x: f32, top: f32, resources: &RenderResources) -> TableLayout {
        let widths = self.column_widths();
        let (placements, rows) = self.place();
        let row_heights = self.row_heights(&placements, rows, &widths, resources);

        let mut ops = Vec::new();
        for p in &placements {
            let cell_x = x + widths[..p.col].iter().sum::<f32>();
            let cell_top = top - row_heights[..p.row].iter().sum::<f32>();
            let width: f32 = widths[p.col..p.col + p.colspan].iter().sum();
            let height: f32 = row_heights[p.row..p.row + p.rowspan].iter().sum();
            self.cells[p.index].emit(cell_x, cell_top, width, height, resources, &mut ops);
        }

        TableLayout { ops, row_heights }
    }

    fn place(&self) -> (Vec<Placement>, usize) {
        let cols = self.relative_widths.len();
        if cols == 0 {
            return (Vec::new(), 0);
        }

        let mut occupied: Vec<Vec<bool>> = Vec::new();
        let mut placements = Vec::with_capacity(self.cells.len());
        let (mut row, mut col) = (0, 0);

        for (index, cell) in self.cells.iter().enumerate() {
            loop {
                if col >= cols {
                    row += 1;
                    col = 0;
                }
                if occupied.len() <= row {
                    occupied.resize(row + 1, vec![false; cols]);
                }
                if !occupied[row][col] {
                    break;
                }
                col += 1;
            }

            let colspan = cell.colspan.min(cols - col);
            let rowspan = cell.rowspan;
            if occupied.len() < row + rowspan {
                occupied.resize(row + rowspan, vec![false; cols]);
            }
            for taken in &mut occupied[row..row + rowspan] {
                taken[col..col + colspan].fill(true);
            }

            placements.push(Placement {
                index,
                row,
                col,
                rowspan,
                colspan,
            });
            col += colspan;
        }

        let rows = placements.iter().map(|p| p.row + 1).max().unwrap_or(0);
        for p in &mut placements {
            p.rowspan = p.rowspan.min(rows - p.row);
        }
        (placements, rows)
    }

    fn row_heights(
        &self,
        placements: &[Placement],
        rows: usize,
        widths: &[f32],
        resources: &RenderResources,
    ) -> Vec<f32> {
        let mut heights = vec![0.0_f32; rows];
        let natural = |p: &Placement| {
            let width: f32 = widths[p.col..p.col + p.colspan].iter().sum();
            self.cells[p.index].natural_height(width, resources)
        };

        for p in placements.iter().filter(|p| p.rowspan == 1) {
            heights[p.row] = heights[p.row].max(natural(p));
        }

        // Spanning cells taller than their rows stretch the last spanned row
        for p in placements.iter().filter(|p| p.rowspan > 1) {
            let last = p.row + p.rowspan - 1;
            let spanned: f32 = heights[p.row..=last].iter().sum();
            let needed = natural(p);
            if needed > spanned {
                heights[last] += needed - spanned;
            }
        }

        heights
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text {
        text: String,
        style: TextStyle,
        h_scale: f32,
        rise: f32,
    },
    Image {
        width: f32,
        height: f32,
        rise: f32,
    },
}

/// One laid-out line of text.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Line {
    pieces: Vec<(Piece, f32)>,
    width: f32,
    ascent: f32,
    descent: f32,
    max_size: f32,
}

impl Line {
    fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    fn height(&self) -> f32 {
        (self.ascent + self.descent).max(self.max_size * LEADING_FACTOR)
    }

    /// Include a font size in the line metrics.
    fn note_text_metrics(&mut self, style: &TextStyle, rise: f32) {
        self.max_size = self.max_size.max(style.size);
        self.ascent = self.ascent.max(style.size * (1.0 - DESCENT_FACTOR) + rise);
        self.descent = self.descent.max(style.size * DESCENT_FACTOR - rise);
    }

    fn push_text(&mut self, text: &str, width: f32, style: TextStyle, h_scale: f32, rise: f32) {
        self.note_text_metrics(&style, rise);
        self.width += width;

        if let Some((
            Piece::Text {
                text: last,
                style: last_style,
                h_scale: last_scale,
                rise: last_rise,
            },
            last_width,
        )) = self.pieces.last_mut()
        {
            if *last_style == style && *last_scale == h_scale && *last_rise == rise {
                last.push_str(text);
                *last_width += width;
                return;
            }
        }

        self.pieces.push((
            Piece::Text {
                text: text.to_string(),
                style,
                h_scale,
                rise,
            },
            width,
        ));
    }

    fn push_image(&mut self, width: f32, height: f32, rise: f32) {
        self.ascent = self.ascent.max(height + rise);
        self.width += width;
        self.pieces.push((Piece::Image { width, height, rise }, width));
    }

    /// Text of the line without styling.
    #[cfg(test)]
    pub(crate) fn plain_text(&self) -> String {
        self.pieces
            .iter()
            .filter_map(|(piece, _)| match piece {
                Piece::Text { text, .. } => Some(text.as_str()),
                Piece::Image { .. } => None,
            })
            .collect()
    }
}

/// Split text into breakable tokens: line feeds, runs of spaces, single wide
/// characters and runs of other characters.
fn tokenize(text: &str) -> Vec<&str> {
    #[derive(PartialEq)]
    enum Class {
        Newline,
        Space,
        Wide,
        Word,
    }
    let class = |ch: char| match ch {
        '\n' => Class::Newline,
        ' ' | '\t' => Class::Space,
        ch if is_wide(ch) => Class::Wide,
        _ => Class::Word,
    };

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<Class> = None;
    for (i, ch) in text.char_indices() {
        let c = class(ch);
        let continues = matches!(
            (&current, &c),
            (Some(Class::Space), Class::Space) | (Some(Class::Word), Class::Word)
        );
        if !continues {
            if current.is_some() {
                tokens.push(&text[start..i]);
            }
            start = i;
        }
        current = Some(c);
    }
    if current.is_some() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Space run waiting for the next word; dropped when the line breaks there.
#[derive(Debug, Clone)]
struct PendingSpace {
    text: String,
    width: f32,
    style: TextStyle,
    h_scale: f32,
    rise: f32,
}

impl PendingSpace {
    fn width(pending: &Option<PendingSpace>) -> f32 {
        pending.as_ref().map_or(0.0, |p| p.width)
    }

    fn flush(pending: &mut Option<PendingSpace>, line: &mut Line) {
        if let Some(p) = pending.take() {
            line.push_text(&p.text, p.width, p.style, p.h_scale, p.rise);
        }
    }
}

/// Break a phrase into lines no wider than `width`; the first line is shortened
/// by `first_indent`.
pub(crate) fn break_lines(
    phrase: &Phrase,
    width: f32,
    first_indent: f32,
    resources: &RenderResources,
) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut pending: Option<PendingSpace> = None;
    let mut available = width - first_indent;

    let finish = |line: &mut Line, lines: &mut Vec<Line>, available: &mut f32| {
        lines.push(mem::take(line));
        *available = width;
    };

    for chunk in &phrase.chunks {
        match &chunk.content {
            ChunkContent::Image { width: w, height: h } => {
                let needed = line.width + PendingSpace::width(&pending) + w;
                if !line.is_empty() && needed > available + EPSILON {
                    pending = None;
                    finish(&mut line, &mut lines, &mut available);
                }
                PendingSpace::flush(&mut pending, &mut line);
                line.push_image(*w, *h, chunk.rise);
            }
            ChunkContent::Text(text) => {
                let font = resources.font(chunk.style.font);
                let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
                let measure = |s: &str| font.text_width(s, chunk.style.size, chunk.h_scale);
                let push = |line: &mut Line, s: &str, w: f32| {
                    line.push_text(s, w, chunk.style, chunk.h_scale, chunk.rise)
                };

                for token in tokenize(&normalized) {
                    if token == "\n" {
                        pending = None;
                        line.note_text_metrics(&chunk.style, chunk.rise);
                        finish(&mut line, &mut lines, &mut available);
                        continue;
                    }

                    let w = measure(token);
                    if token.starts_with([' ', '\t']) {
                        if !line.is_empty() {
                            pending = Some(PendingSpace {
                                text: token.to_string(),
                                width: w,
                                style: chunk.style,
                                h_scale: chunk.h_scale,
                                rise: chunk.rise,
                            });
                        }
                        continue;
                    }

                    if line.width + PendingSpace::width(&pending) + w <= available + EPSILON {
                        PendingSpace::flush(&mut pending, &mut line);
                        push(&mut line, token, w);
                        continue;
                    }

                    pending = None;
                    if !line.is_empty() {
                        finish(&mut line, &mut lines, &mut available);
                    }
                    if w <= available + EPSILON {
                        push(&mut line, token, w);
                        continue;
                    }

                    // Longer than a whole line: split between characters
                    let mut buf = [0u8; 4];
                    for ch in token.chars() {
                        let s: &str = ch.encode_utf8(&mut buf);
                        let cw = measure(s);
                        if !line.is_empty() && line.width + cw > available + EPSILON {
                            finish(&mut line, &mut lines, &mut available);
                        }
                        push(&mut line, s, cw);
                    }
                }
            }
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[derive(Debug, Clone)]
struct PlacedLine {
    line: Line,
    align: HAlign,
    indent: f32,
    gap_before: f32,
}

/// Paragraphs broken into lines for a given width.
#[derive(Debug, Clone, Default)]
struct TextBlock {
    lines: Vec<PlacedLine>,
}

impl TextBlock {
    fn new(paragraphs: &[Paragraph], width: f32, resources: &RenderResources) -> Self {
        let mut lines = Vec::new();
        for paragraph in paragraphs {
            let broken = break_lines(
                &paragraph.phrase,
                width,
                paragraph.first_line_indent,
                resources,
            );
            for (i, line) in broken.into_iter().enumerate() {
                lines.push(PlacedLine {
                    line,
                    align: paragraph.align,
                    indent: if i == 0 { paragraph.first_line_indent } else { 0.0 },
                    gap_before: if i == 0 { paragraph.spacing_before } else { 0.0 },
                });
            }
        }
        Self { lines }
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn height(&self) -> f32 {
        self.lines
            .iter()
            .map(|l| l.gap_before + l.line.height())
            .sum()
    }

    fn emit(&self, x: f32, top: f32, width: f32, ops: &mut Vec<DrawOp>) {
        let mut line_top = top;
        for placed in &self.lines {
            line_top -= placed.gap_before;
            let line = &placed.line;
            let free = width - placed.indent - line.width;
            let mut cursor = x
                + placed.indent
                + match placed.align {
                    HAlign::Left => 0.0,
                    HAlign::Center => free / 2.0,
                    HAlign::Right => free,
                };
            let baseline = line_top - (line.height() - line.descent);

            for (piece, piece_width) in &line.pieces {
                match piece {
                    Piece::Text {
                        text,
                        style,
                        h_scale,
                        rise,
                    } => ops.push(DrawOp::Text {
                        x: cursor,
                        y: baseline,
                        text: text.clone(),
                        style: *style,
                        h_scale: *h_scale,
                        rise: *rise,
                    }),
                    Piece::Image {
                        width,
                        height,
                        rise,
                    } => ops.push(DrawOp::Image {
                        x: cursor,
                        y: baseline + rise,
                        width: *width,
                        height: *height,
                    }),
                }
                cursor += piece_width;
            }
            line_top -= line.height();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resources() -> RenderResources {
        RenderResources::synthetic()
    }

    fn texts(ops: &[DrawOp]) -> Vec<&str> {
        ops.iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn lines_of(phrase: &Phrase, width: f32) -> Vec<String> {
        break_lines(phrase, width, 0.0, &resources())
            .iter()
            .map(Line::plain_text)
            .collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("发票 ab  cd\n号"),
            vec!["发", "票", " ", "ab", "  ", "cd", "\n", "号"]
        );
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_cjk_breaks_anywhere() {
        // 9pt ideographs are 9 units wide, four fit into 40
        let phrase = Phrase::text("购买方信息名称", TextStyle::CONTENT);
        assert_eq!(lines_of(&phrase, 40.0), vec!["购买方信", "息名称"]);
    }

    #[test]
    fn test_latin_breaks_at_spaces() {
        // Latin glyphs are 4.5 units wide at 9pt
        let phrase = Phrase::text("alpha beta gamma", TextStyle::CONTENT);
        assert_eq!(lines_of(&phrase, 50.0), vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn test_long_word_is_split() {
        let phrase = Phrase::text("ABCDEFGHIJ", TextStyle::CONTENT);
        assert_eq!(lines_of(&phrase, 20.0), vec!["ABCD", "EFGH", "IJ"]);
    }

    #[test]
    fn test_explicit_line_breaks_keep_empty_lines() {
        let phrase = Phrase::text("备\r\n\r\n注", TextStyle::FIELD);
        let lines = break_lines(&phrase, 100.0, 0.0, &resources());
        let text: Vec<_> = lines.iter().map(Line::plain_text).collect();
        assert_eq!(text, vec!["备", "", "注"]);
        assert!(lines[1].height() > 0.0);
    }

    #[test]
    fn test_chunks_of_one_style_merge() {
        let phrase = Phrase::new()
            .chunk(Chunk::new("名称：", TextStyle::FIELD))
            .chunk(Chunk::new("示例", TextStyle::CONTENT))
            .chunk(Chunk::new("公司", TextStyle::CONTENT));
        let lines = break_lines(&phrase, 500.0, 0.0, &resources());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].pieces.len(), 2);
    }

    #[test]
    fn test_image_raises_line_height() {
        let phrase = Phrase::new()
            .chunk(Chunk::image(14.0, 14.0))
            .chunk(Chunk::new("壹佰圆整", TextStyle::CONTENT).with_rise(4.0));
        let lines = break_lines(&phrase, 500.0, 0.0, &resources());
        assert!(lines[0].height() >= 14.0);
        assert_eq!(lines[0].width, 14.0 + 36.0);
    }

    #[test]
    fn test_column_widths_scale_to_total() {
        let table = Table::new(&[1.0, 3.0], 100.0);
        assert_eq!(table.column_widths(), vec![25.0, 75.0]);
    }

    #[test]
    fn test_rowspan_placement() {
        let table = Table::new(&[1.0, 1.0], 100.0)
            .cell(Cell::new(Phrase::text("A", TextStyle::CONTENT)).rowspan(2))
            .cell(Cell::new(Phrase::text("B", TextStyle::CONTENT)))
            .cell(Cell::new(Phrase::text("C", TextStyle::CONTENT)));
        let (placements, rows) = table.place();
        assert_eq!(rows, 2);
        assert_eq!((placements[2].row, placements[2].col), (1, 1));
    }

    #[test]
    fn test_colspan_fills_row() {
        let mut table = Table::new(&[1.0, 1.0, 1.0], 90.0);
        for _ in 0..3 {
            table.push(Cell::empty());
        }
        table.push(Cell::empty().colspan(3));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_row_height_from_padding_and_text() {
        let res = resources();
        let table = Table::new(&[1.0], 100.0).cell(
            Cell::new(Phrase::text("甲", TextStyle::CONTENT)).padding(Edges::new(0.0, 4.0, 0.0, 6.0)),
        );
        let expected = 4.0 + 9.0 * LEADING_FACTOR + 6.0;
        assert!((table.total_height(&res) - expected).abs() < EPSILON);
    }

    #[test]
    fn test_fixed_height_overrides_content() {
        let res = resources();
        let table = Table::new(&[1.0], 100.0)
            .cell(Cell::new(Phrase::text("甲", TextStyle::CONTENT)).fixed_height(56.0));
        assert_eq!(table.total_height(&res), 56.0);

        let negative = Table::new(&[1.0], 100.0).cell(Cell::empty().fixed_height(-20.0));
        assert_eq!(negative.total_height(&res), 0.0);
    }

    #[test]
    fn test_tall_rowspan_grows_last_row() {
        let res = resources();
        let table = Table::new(&[1.0, 1.0], 100.0)
            .cell(Cell::empty().rowspan(2).fixed_height(100.0))
            .cell(Cell::empty().fixed_height(10.0))
            .cell(Cell::empty().fixed_height(10.0));
        let layout = table.layout(0.0, 200.0, &res);
        assert_eq!(layout.row_heights, vec![10.0, 90.0]);
    }

    #[test]
    fn test_borders_follow_flags() {
        let res = resources();
        let table = Table::new(&[1.0], 100.0)
            .cell(Cell::empty().borders(Borders::LEFT | Borders::BOTTOM));
        let layout = table.layout(10.0, 100.0, &res);
        let lines = layout
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count();
        assert_eq!(lines, 2);

        let none = Table::new(&[1.0], 100.0).cell(Cell::empty().without(Borders::all()));
        assert!(none.layout(0.0, 100.0, &res).ops.is_empty());
    }

    #[test]
    fn test_alignment_in_cell() {
        let res = resources();
        let table = Table::new(&[1.0, 1.0], 200.0)
            .cell(
                Cell::new(Phrase::text("AB", TextStyle::CONTENT))
                    .padding(Edges::uniform(0.0))
                    .h_align(HAlign::Right),
            )
            .cell(
                Cell::new(Phrase::text("AB", TextStyle::CONTENT))
                    .padding(Edges::uniform(0.0))
                    .h_align(HAlign::Center),
            );
        let layout = table.layout(0.0, 100.0, &res);
        let xs: Vec<f32> = layout
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { x, .. } => Some(*x),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![100.0 - 9.0, 100.0 + (100.0 - 9.0) / 2.0]);
        assert_eq!(texts(&layout.ops), vec!["AB", "AB"]);
    }

    #[test]
    fn test_middle_alignment_centres_block() {
        let res = resources();
        let table = Table::new(&[1.0], 100.0).cell(
            Cell::new(Phrase::text("甲", TextStyle::CONTENT))
                .padding(Edges::uniform(0.0))
                .fixed_height(50.0)
                .v_align(VAlign::Middle),
        );
        let layout = table.layout(0.0, 100.0, &res);
        let y = layout
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Text { y, .. } => Some(*y),
                _ => None,
            })
            .unwrap();
        let line_height = 9.0 * LEADING_FACTOR;
        let top = 100.0 - (50.0 - line_height) / 2.0;
        let expected = top - (line_height - 9.0 * DESCENT_FACTOR);
        assert!((y - expected).abs() < EPSILON);
    }

    #[test]
    fn test_paragraph_indent_and_spacing() {
        let res = resources();
        let paragraph = Paragraph::new(Phrase::text("开票人：张三", TextStyle::FIELD))
            .spacing_before(12.0)
            .first_line_indent(45.0);
        let (ops, height) = paragraph.layout(13.0, 100.0, 500.0, &res);
        assert!((height - (12.0 + 9.0 * LEADING_FACTOR)).abs() < EPSILON);
        match &ops[0] {
            DrawOp::Text { x, .. } => assert_eq!(*x, 58.0),
            other => panic!("unexpected op {other:?}"),
        }
        assert!((paragraph.height(500.0, &res) - height).abs() < EPSILON);
    }
}
