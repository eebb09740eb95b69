//! Dataset interchange formats.
//!
//! PAGE XML for per-image text-line annotations, and ZIP bundles for whole
//! datasets (images + PAGE XML + METS manifest).

pub mod archive;
pub mod error;
pub mod page_xml;

pub use archive::{ExportImage, ImportedImage, export_dataset, import_dataset};
pub use error::FormatError;
pub use page_xml::{PageContent, parse_page_xml, simplify_points, write_page_xml};
