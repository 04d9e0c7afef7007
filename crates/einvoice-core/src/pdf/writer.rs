//! Serializes a [`PageLayout`] into a single-page PDF with `lopdf`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, trace};

use crate::error::RenderError;

use super::font::{Color, FontKind, FontProgram};
use super::layout::DrawOp;
use super::renderer::PageLayout;
use super::resources::{InlineImage, RenderResources};
use super::Result;

/// Resource name of the inline image.
const IMAGE_NAME: &str = "Im1";

/// Mappings per `beginbfchar` section.
const BFCHAR_CHUNK: usize = 100;

/// Writes page layouts as PDF documents.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    producer: String,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self {
            producer: format!("einvoice {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the document and return its bytes.
    pub fn write(&self, layout: &PageLayout, resources: &RenderResources) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let used = used_glyphs(layout, resources);
        let mut fonts = Dictionary::new();
        for kind in FontKind::ALL {
            let glyphs = used.get(&kind).cloned().unwrap_or_default();
            let font_id = embed_font(&mut doc, resources.font(kind), &glyphs);
            fonts.set(kind.resource_name(), font_id);
        }

        let image_id = embed_image(&mut doc, resources.total_image());

        let content = Content {
            operations: content_operations(layout, resources),
        };
        let content = content
            .encode()
            .map_err(|e| RenderError::Content(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(layout.width),
                Object::Real(layout.height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => fonts,
                "XObject" => dictionary! { IMAGE_NAME => image_id },
            },
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(self.producer.as_str()),
            "Title" => Object::string_literal(layout.document_title.as_str()),
            "CreationDate" => Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        trace!("Serialized {} objects into {} bytes", doc.objects.len(), bytes.len());
        Ok(bytes)
    }
}

/// Glyph ids drawn with each font, mapped back to their characters.
fn used_glyphs(
    layout: &PageLayout,
    resources: &RenderResources,
) -> BTreeMap<FontKind, BTreeMap<u16, char>> {
    let mut used: BTreeMap<FontKind, BTreeMap<u16, char>> = BTreeMap::new();
    for op in layout.ops() {
        if let DrawOp::Text { text, style, .. } = op {
            let font = resources.font(style.font);
            let glyphs = used.entry(style.font).or_default();
            for ch in text.chars() {
                match font.glyph_id(ch) {
                    Some(gid) => {
                        glyphs.entry(gid).or_insert(ch);
                    }
                    None => {
                        debug!("No glyph for {:?} in {}, drawing .notdef", ch, font.name());
                        glyphs.entry(0).or_insert(ch);
                    }
                }
            }
        }
    }
    used
}

/// Embed a full TrueType program as a Type0 font with Identity-H encoding.
fn embed_font(doc: &mut Document, font: &FontProgram, glyphs: &BTreeMap<u16, char>) -> ObjectId {
    let data = font.data().to_vec();
    let length = data.len() as i64;
    let file_id = doc.add_object(Stream::new(dictionary! { "Length1" => length }, data));

    let [x_min, y_min, x_max, y_max] = font.bbox();
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(font.name().as_bytes().to_vec()),
        "Flags" => font.flags() as i64,
        "FontBBox" => vec![
            Object::Integer(x_min.into()),
            Object::Integer(y_min.into()),
            Object::Integer(x_max.into()),
            Object::Integer(y_max.into()),
        ],
        "ItalicAngle" => 0,
        "Ascent" => font.ascender() as i64,
        "Descent" => font.descender() as i64,
        "CapHeight" => font.cap_height() as i64,
        "StemV" => 80,
        "FontFile2" => file_id,
    });

    let mut cid_font = dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => Object::Name(font.name().as_bytes().to_vec()),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        "CIDToGIDMap" => "Identity",
    };
    if !glyphs.is_empty() {
        cid_font.set("W", widths_array(font, glyphs));
    }
    let cid_font_id = doc.add_object(cid_font);

    let cmap = to_unicode_cmap(glyphs);
    let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, cmap.into_bytes()));

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(font.name().as_bytes().to_vec()),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![cid_font_id.into()],
        "ToUnicode" => to_unicode_id,
    })
}

/// `/W` array grouping runs of consecutive glyph ids.
fn widths_array(font: &FontProgram, glyphs: &BTreeMap<u16, char>) -> Vec<Object> {
    let gids: Vec<u16> = glyphs.keys().copied().collect();
    let mut array = Vec::new();

    let mut i = 0;
    while i < gids.len() {
        let start = gids[i];
        let mut widths = vec![Object::Integer(font.glyph_width(start).into())];
        while i + 1 < gids.len() && gids[i + 1] == gids[i] + 1 {
            i += 1;
            widths.push(Object::Integer(font.glyph_width(gids[i]).into()));
        }
        array.push(Object::Integer(start.into()));
        array.push(Object::Array(widths));
        i += 1;
    }
    array
}

fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let mappings: Vec<(u16, char)> = glyphs.iter().map(|(&gid, &ch)| (gid, ch)).collect();
    for chunk in mappings.chunks(BFCHAR_CHUNK) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (gid, ch) in chunk {
            let utf16: String = ch
                .encode_utf16(&mut [0u16; 2])
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            let _ = writeln!(cmap, "<{gid:04X}> <{utf16}>");
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}

fn embed_image(doc: &mut Document, image: &InlineImage) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width() as i64,
        "Height" => image.height() as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if let Some(alpha) = image.alpha() {
        let mask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha.to_vec(),
        ));
        dict.set("SMask", mask_id);
    }

    doc.add_object(Stream::new(dict, image.rgb().to_vec()))
}

fn content_operations(layout: &PageLayout, resources: &RenderResources) -> Vec<Operation> {
    let mut ops = Vec::new();
    for op in layout.ops() {
        match op {
            DrawOp::Text {
                x,
                y,
                text,
                style,
                h_scale,
                rise,
            } => {
                let glyphs: Vec<u8> = resources
                    .font(style.font)
                    .encode(text)
                    .iter()
                    .flat_map(|gid| gid.to_be_bytes())
                    .collect();
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![style.font.resource_name().into(), Object::Real(style.size)],
                ));
                ops.push(Operation::new("rg", color_operands(style.color)));
                ops.push(Operation::new("Tz", vec![Object::Real(h_scale * 100.0)]));
                ops.push(Operation::new("Ts", vec![Object::Real(*rise)]));
                ops.push(Operation::new("Td", vec![Object::Real(*x), Object::Real(*y)]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(glyphs, StringFormat::Hexadecimal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::Image {
                x,
                y,
                width,
                height,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        Object::Real(*width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(*height),
                        Object::Real(*x),
                        Object::Real(*y),
                    ],
                ));
                ops.push(Operation::new("Do", vec![IMAGE_NAME.into()]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::Line {
                from,
                to,
                width,
                color,
            } => {
                ops.push(Operation::new("w", vec![Object::Real(*width)]));
                ops.push(Operation::new("RG", color_operands(*color)));
                ops.push(Operation::new("m", vec![Object::Real(from.0), Object::Real(from.1)]));
                ops.push(Operation::new("l", vec![Object::Real(to.0), Object::Real(to.1)]));
                ops.push(Operation::new("S", vec![]));
            }
        }
    }
    ops
}

fn color_operands(color: Color) -> Vec<Object> {
    color.components().into_iter().map(Object::Real).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{InvoiceParser, XmlInvoiceParser, SAMPLE_XML};
    use crate::pdf::InvoiceRenderer;

    fn sample_pdf() -> Vec<u8> {
        let invoice = XmlInvoiceParser::new().parse(SAMPLE_XML.as_bytes()).unwrap();
        InvoiceRenderer::new()
            .render(&invoice, &RenderResources::synthetic())
            .unwrap()
    }

    fn has_name(dict: &Dictionary, key: &[u8], value: &[u8]) -> bool {
        matches!(dict.get(key), Ok(Object::Name(name)) if name == value)
    }

    fn dictionaries(doc: &Document) -> impl Iterator<Item = &Dictionary> {
        doc.objects.values().filter_map(|object| match object {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        })
    }

    #[test]
    fn test_single_page_with_media_box() {
        let doc = Document::load_mem(&sample_pdf()).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page = doc.get_dictionary(pages[&1]).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let dims: Vec<f32> = media_box.iter().map(|o| o.as_float().unwrap()).collect();
        assert_eq!(dims, vec![0.0, 0.0, 610.0, 394.0]);
    }

    #[test]
    fn test_fonts_are_embedded_as_type0() {
        let doc = Document::load_mem(&sample_pdf()).unwrap();
        let type0 = dictionaries(&doc)
            .filter(|d| has_name(d, b"Subtype", b"Type0"))
            .count();
        let cid = dictionaries(&doc)
            .filter(|d| has_name(d, b"Subtype", b"CIDFontType2"))
            .count();
        let files = dictionaries(&doc).filter(|d| d.has(b"Length1")).count();
        assert_eq!((type0, cid, files), (3, 3, 3));
    }

    #[test]
    fn test_image_has_soft_mask() {
        let doc = Document::load_mem(&sample_pdf()).unwrap();
        let rgb = dictionaries(&doc)
            .find(|d| has_name(d, b"ColorSpace", b"DeviceRGB"))
            .unwrap();
        assert!(rgb.has(b"SMask"));
        assert_eq!(rgb.get(b"Width").unwrap().as_i64().unwrap(), 4);
    }

    #[test]
    fn test_document_info() {
        let doc = Document::load_mem(&sample_pdf()).unwrap();
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        match info.get(b"Title").unwrap() {
            Object::String(bytes, _) => assert_eq!(bytes.as_slice(), b"24440000000000000001"),
            other => panic!("unexpected title {other:?}"),
        }
        assert!(info.has(b"CreationDate"));
    }

    #[test]
    fn test_content_operators() {
        let mut doc = Document::load_mem(&sample_pdf()).unwrap();
        doc.decompress();
        let page_id = doc.get_pages()[&1];
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let operators: Vec<&str> = content
            .operations
            .iter()
            .map(|op| op.operator.as_str())
            .collect();
        for expected in ["BT", "Tf", "Tz", "Ts", "Tj", "ET", "RG", "m", "l", "S", "cm", "Do"] {
            assert!(operators.contains(&expected), "missing {expected}");
        }

        let condensed = content.operations.iter().any(|op| {
            op.operator == "Tz"
                && op
                    .operands
                    .first()
                    .and_then(|o| o.as_float().ok())
                    .is_some_and(|v| (v - 90.0).abs() < 0.01)
        });
        assert!(condensed);
    }

    #[test]
    fn test_widths_group_consecutive_glyphs() {
        let font = FontProgram::synthetic("Test");
        let glyphs: BTreeMap<u16, char> = "ABD"
            .chars()
            .map(|ch| (font.glyph_id(ch).unwrap(), ch))
            .collect();
        let array = widths_array(&font, &glyphs);
        // A and B are adjacent, D stands alone
        assert_eq!(array.len(), 4);
        assert_eq!(array[1].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_uncovered_character_gets_notdef_width() {
        let xml = SAMPLE_XML.replace("项目编号：2024-001", "备注\u{1F600}");
        let invoice = XmlInvoiceParser::new().parse(xml.as_bytes()).unwrap();
        let resources = RenderResources::synthetic();
        let layout = InvoiceRenderer::new().compose(&invoice, &resources);

        let used = used_glyphs(&layout, &resources);
        let content = &used[&FontKind::Content];
        assert_eq!(content.get(&0), Some(&'\u{1F600}'));

        let font = resources.font(FontKind::Content);
        let array = widths_array(font, content);
        assert_eq!(array[0].as_i64().unwrap(), 0);
        let first = array[1].as_array().unwrap();
        assert_eq!(first[0].as_i64().unwrap(), font.glyph_width(0) as i64);
        assert_eq!(font.char_width('\u{1F600}'), font.glyph_width(0));
    }

    #[test]
    fn test_to_unicode_sections() {
        let glyphs: BTreeMap<u16, char> = (0..150u16).map(|gid| (gid + 1, 'A')).collect();
        let cmap = to_unicode_cmap(&glyphs);
        assert!(cmap.contains("100 beginbfchar"));
        assert!(cmap.contains("50 beginbfchar"));
        assert!(cmap.contains("<0001> <0041>"));
    }
}
