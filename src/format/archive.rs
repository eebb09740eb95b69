//! ZIP dataset import and export.
//!
//! A dataset bundle is a flat ZIP of images, one PAGE XML per image (same
//! stem, `.xml` extension), and on export a `METS.xml` manifest pairing each
//! image with its transcription file. On import, images without a sibling
//! XML are accepted with no regions.

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::format::error::FormatError;
use crate::format::page_xml::{self, PageContent};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// One image pulled out of a dataset archive.
#[derive(Debug, Clone)]
pub struct ImportedImage {
    /// Bare filename (directories inside the archive are flattened).
    pub name: String,
    pub bytes: Vec<u8>,
    /// Parsed sibling PAGE XML, when the archive had one.
    pub content: Option<PageContent>,
}

/// One image to be written into a dataset archive.
#[derive(Debug, Clone)]
pub struct ExportImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content: PageContent,
}

fn file_stem(name: &str) -> &str {
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

fn is_image_name(name: &str) -> bool {
    extension(name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Skip hidden files and macOS resource forks when walking an archive.
fn is_junk_entry(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("__macosx") || lower.contains("/.") || lower.starts_with('.')
}

/// Extract images and their sibling PAGE XML files from a ZIP archive.
///
/// `simplify` is the point-chain simplification threshold applied to parsed
/// coordinates (0 disables it). Results are sorted by image name for a
/// stable ordering.
pub fn import_dataset<R: Read + Seek>(
    reader: R,
    simplify: f32,
) -> Result<Vec<ImportedImage>, FormatError> {
    let mut archive = ZipArchive::new(reader)?;

    let mut images: Vec<(String, Vec<u8>)> = Vec::new();
    let mut xml_by_stem: HashMap<String, String> = HashMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let full_name = file.name().to_string();
        if is_junk_entry(&full_name) {
            log::trace!("Skipping junk entry: {}", full_name);
            continue;
        }
        // Flatten directories: datasets in the wild nest arbitrarily.
        let name = full_name.rsplit('/').next().unwrap_or(&full_name).to_string();

        if is_image_name(&name) {
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)?;
            log::debug!("Extracted image '{}' ({} bytes)", name, bytes.len());
            images.push((name, bytes));
        } else if extension(&name).as_deref() == Some("xml") {
            let mut xml = String::new();
            file.read_to_string(&mut xml)?;
            xml_by_stem.insert(file_stem(&name).to_string(), xml);
        }
    }

    if images.is_empty() {
        return Err(FormatError::invalid_format("No image files found in archive"));
    }

    images.sort_by(|a, b| a.0.cmp(&b.0));

    let mut imported = Vec::with_capacity(images.len());
    for (name, bytes) in images {
        let content = match xml_by_stem.get(file_stem(&name)) {
            Some(xml) => match page_xml::parse_page_xml(xml, simplify) {
                Ok(content) => Some(content),
                Err(e) => {
                    log::warn!("Failed to parse PAGE XML for '{}': {}", name, e);
                    None
                }
            },
            None => None,
        };
        imported.push(ImportedImage { name, bytes, content });
    }

    log::info!(
        "Imported {} images ({} with annotations) from archive",
        imported.len(),
        imported.iter().filter(|i| i.content.is_some()).count()
    );
    Ok(imported)
}

/// Write a dataset archive: every image, a PAGE XML per image, and a METS
/// manifest pairing them.
pub fn export_dataset<W: Write + Seek>(
    writer: W,
    images: &[ExportImage],
) -> Result<(), FormatError> {
    if images.is_empty() {
        return Err(FormatError::invalid_format("Nothing to export"));
    }

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    let mut manifest = Vec::with_capacity(images.len());
    for (idx, image) in images.iter().enumerate() {
        zip.start_file(image.name.as_str(), options)?;
        zip.write_all(&image.bytes)?;

        let xml_name = format!("{}.xml", file_stem(&image.name));
        let xml = page_xml::write_page_xml(&image.name, image.width, image.height, &image.content)?;
        zip.start_file(xml_name.as_str(), options)?;
        zip.write_all(xml.as_bytes())?;

        manifest.push((format!("f{}", idx), image.name.clone(), xml_name));
    }

    zip.start_file("METS.xml", options)?;
    let mets = write_mets(&manifest)?;
    zip.write_all(mets.as_bytes())?;

    zip.finish()?;
    log::info!("Exported {} images to dataset archive", images.len());
    Ok(())
}

/// Build the METS manifest: a file section with image and transcription
/// groups, and a physical struct map pairing them per page.
fn write_mets(manifest: &[(String, String, String)]) -> Result<String, FormatError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut root = BytesStart::new("mets");
    root.push_attribute(("xmlns", "http://www.loc.gov/METS/"));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| FormatError::Xml(e.into()))?;

    writer
        .write_event(Event::Start(BytesStart::new("fileSec")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    for (use_attr, suffix, href_of) in [
        ("image", "i", 0usize),
        ("transcription", "x", 1usize),
    ] {
        let mut group = BytesStart::new("fileGrp");
        group.push_attribute(("USE", use_attr));
        writer
            .write_event(Event::Start(group))
            .map_err(|e| FormatError::Xml(e.into()))?;

        for (id, img, xml) in manifest {
            let href = if href_of == 0 { img } else { xml };
            let mut file = BytesStart::new("file");
            file.push_attribute(("ID", format!("{}{}", id, suffix).as_str()));
            writer
                .write_event(Event::Start(file))
                .map_err(|e| FormatError::Xml(e.into()))?;

            let mut locat = BytesStart::new("FLocat");
            locat.push_attribute(("LOCTYPE", "URL"));
            locat.push_attribute(("href", href.as_str()));
            writer
                .write_event(Event::Empty(locat))
                .map_err(|e| FormatError::Xml(e.into()))?;

            writer
                .write_event(Event::End(BytesEnd::new("file")))
                .map_err(|e| FormatError::Xml(e.into()))?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("fileGrp")))
            .map_err(|e| FormatError::Xml(e.into()))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("fileSec")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    let mut struct_map = BytesStart::new("structMap");
    struct_map.push_attribute(("TYPE", "physical"));
    writer
        .write_event(Event::Start(struct_map))
        .map_err(|e| FormatError::Xml(e.into()))?;

    let mut doc = BytesStart::new("div");
    doc.push_attribute(("TYPE", "document"));
    writer
        .write_event(Event::Start(doc))
        .map_err(|e| FormatError::Xml(e.into()))?;

    for (id, _, _) in manifest {
        let mut page = BytesStart::new("div");
        page.push_attribute(("TYPE", "page"));
        writer
            .write_event(Event::Start(page))
            .map_err(|e| FormatError::Xml(e.into()))?;
        for suffix in ["i", "x"] {
            let mut fptr = BytesStart::new("fptr");
            fptr.push_attribute(("FILEID", format!("{}{}", id, suffix).as_str()));
            writer
                .write_event(Event::Empty(fptr))
                .map_err(|e| FormatError::Xml(e.into()))?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("div")))
            .map_err(|e| FormatError::Xml(e.into()))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("div")))
        .map_err(|e| FormatError::Xml(e.into()))?;
    writer
        .write_event(Event::End(BytesEnd::new("structMap")))
        .map_err(|e| FormatError::Xml(e.into()))?;
    writer
        .write_event(Event::End(BytesEnd::new("mets")))
        .map_err(|e| FormatError::Xml(e.into()))?;

    String::from_utf8(writer.into_inner())
        .map_err(|_| FormatError::invalid_format("Invalid UTF-8 in XML"))
}
