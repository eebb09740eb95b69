//! PAGE XML import and export.
//!
//! The interchange format for text-line datasets is PAGE XML
//! (<http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15>):
//! one `<Page>` per image, a single `<TextRegion>`, and one `<TextLine>`
//! with a `<Coords points="x,y x,y ...">` element per region. Transcribed
//! text round-trips through `<TextEquiv><Unicode>`.
//!
//! Import accepts namespaced and namespace-free documents (files in the wild
//! vary) and can simplify dense point chains with a distance threshold.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::client::{PointWire, RegionWire};
use crate::format::error::FormatError;

const PAGE_NAMESPACE: &str = "http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15";

/// Regions plus texts (keyed by region index) parsed from one PAGE file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub regions: Vec<RegionWire>,
    pub texts: BTreeMap<usize, String>,
}

/// Drop consecutive points closer than `threshold` pixels. The first point
/// is always kept, and the final point is re-appended if simplification
/// swallowed it. A threshold of zero disables simplification.
pub fn simplify_points(points: Vec<PointWire>, threshold: f32) -> Vec<PointWire> {
    if threshold <= 0.0 || points.is_empty() {
        return points;
    }
    let mut kept = vec![points[0]];
    for p in &points[1..] {
        let last = kept.last().unwrap();
        let dx = (p.x - last.x) as f32;
        let dy = (p.y - last.y) as f32;
        if (dx * dx + dy * dy).sqrt() >= threshold {
            kept.push(*p);
        }
    }
    let last = *points.last().unwrap();
    if *kept.last().unwrap() != last {
        kept.push(last);
    }
    kept
}

/// Strip an XML namespace prefix, if any.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Parse the `points` attribute format: whitespace-separated `x,y` pairs.
/// Malformed pairs are skipped rather than failing the whole file.
fn parse_points_attr(value: &str) -> Vec<PointWire> {
    let mut points = Vec::new();
    for pair in value.split_whitespace() {
        let Some((x, y)) = pair.split_once(',') else {
            continue;
        };
        let (Ok(x), Ok(y)) = (x.trim().parse::<f32>(), y.trim().parse::<f32>()) else {
            continue;
        };
        points.push(PointWire::new(x.round() as i32, y.round() as i32));
    }
    points
}

/// Parse a PAGE XML document into regions and texts.
pub fn parse_page_xml(xml: &str, simplify: f32) -> Result<PageContent, FormatError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut content = PageContent::default();
    let mut in_text_line = false;
    let mut in_unicode = false;
    let mut line_points: Option<Vec<PointWire>> = None;
    let mut line_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"TextLine" => {
                    in_text_line = true;
                    line_points = None;
                    line_text.clear();
                }
                b"Unicode" if in_text_line => in_unicode = true,
                b"Coords" if in_text_line => {
                    if let Some(attr) = e
                        .try_get_attribute("points")
                        .map_err(|e| FormatError::Xml(e.into()))?
                    {
                        let value = attr.unescape_value().map_err(FormatError::Xml)?;
                        line_points = Some(parse_points_attr(&value));
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if in_text_line && local_name(e.name().as_ref()) == b"Coords" {
                    if let Some(attr) = e
                        .try_get_attribute("points")
                        .map_err(|e| FormatError::Xml(e.into()))?
                    {
                        let value = attr.unescape_value().map_err(FormatError::Xml)?;
                        line_points = Some(parse_points_attr(&value));
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_unicode {
                    line_text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"TextLine" => {
                    if let Some(mut points) = line_points.take() {
                        if simplify > 0.0 {
                            points = simplify_points(points, simplify);
                        }
                        if !points.is_empty() {
                            let index = content.regions.len();
                            if !line_text.is_empty() {
                                content.texts.insert(index, line_text.clone());
                            }
                            content.regions.push(RegionWire::new(points));
                        }
                    }
                    in_text_line = false;
                }
                b"Unicode" => in_unicode = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FormatError::Xml(e)),
            _ => {}
        }
    }

    log::debug!(
        "Parsed PAGE XML: {} lines, {} with text",
        content.regions.len(),
        content.texts.len()
    );
    Ok(content)
}

/// Serialize regions for one image as a PAGE XML document.
pub fn write_page_xml(
    image_name: &str,
    image_width: u32,
    image_height: u32,
    content: &PageContent,
) -> Result<String, FormatError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| FormatError::Xml(e.into()))?;

    let mut root = BytesStart::new("PcGts");
    root.push_attribute(("xmlns", PAGE_NAMESPACE));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| FormatError::Xml(e.into()))?;

    let mut page = BytesStart::new("Page");
    page.push_attribute(("imageFilename", image_name));
    page.push_attribute(("imageWidth", image_width.to_string().as_str()));
    page.push_attribute(("imageHeight", image_height.to_string().as_str()));
    writer
        .write_event(Event::Start(page))
        .map_err(|e| FormatError::Xml(e.into()))?;

    let mut text_region = BytesStart::new("TextRegion");
    text_region.push_attribute(("id", "r1"));
    writer
        .write_event(Event::Start(text_region))
        .map_err(|e| FormatError::Xml(e.into()))?;

    for (i, region) in content.regions.iter().enumerate() {
        let mut line = BytesStart::new("TextLine");
        line.push_attribute(("id", format!("l{}", i).as_str()));
        writer
            .write_event(Event::Start(line))
            .map_err(|e| FormatError::Xml(e.into()))?;

        let points = region
            .points
            .iter()
            .map(|p| format!("{},{}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ");
        let mut coords = BytesStart::new("Coords");
        coords.push_attribute(("points", points.as_str()));
        writer
            .write_event(Event::Empty(coords))
            .map_err(|e| FormatError::Xml(e.into()))?;

        if let Some(text) = content.texts.get(&i) {
            writer
                .write_event(Event::Start(BytesStart::new("TextEquiv")))
                .map_err(|e| FormatError::Xml(e.into()))?;
            writer
                .write_event(Event::Start(BytesStart::new("Unicode")))
                .map_err(|e| FormatError::Xml(e.into()))?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| FormatError::Xml(e.into()))?;
            writer
                .write_event(Event::End(BytesEnd::new("Unicode")))
                .map_err(|e| FormatError::Xml(e.into()))?;
            writer
                .write_event(Event::End(BytesEnd::new("TextEquiv")))
                .map_err(|e| FormatError::Xml(e.into()))?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("TextLine")))
            .map_err(|e| FormatError::Xml(e.into()))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("TextRegion")))
        .map_err(|e| FormatError::Xml(e.into()))?;
    writer
        .write_event(Event::End(BytesEnd::new("Page")))
        .map_err(|e| FormatError::Xml(e.into()))?;
    writer
        .write_event(Event::End(BytesEnd::new("PcGts")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    String::from_utf8(writer.into_inner())
        .map_err(|_| FormatError::invalid_format("Invalid UTF-8 in XML"))
}
