//! Image metadata and load coordination.
//!
//! Opening an image kicks off two independent asynchronous fetches: the
//! image bytes and the annotation payload. They may complete in either
//! order, and neither result may be applied until both are present (the
//! viewport fit, and therefore the history baseline, depend on the image
//! dimensions). [`PendingLoad`] is the barrier that collects both halves and
//! rejects stale completions by filename.

use thiserror::Error;

use crate::client::AnnotationPayload;

/// Errors while preparing a fetched image for display.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    /// Decode fetched image bytes far enough to learn the dimensions.
    pub fn decode(name: impl Into<String>, bytes: &[u8]) -> Result<Self, LoadError> {
        let name = name.into();
        let decoded = image::load_from_memory(bytes)?;
        let info = Self {
            width: decoded.width(),
            height: decoded.height(),
            name,
        };
        log::debug!("Decoded '{}' ({}x{})", info.name, info.width, info.height);
        Ok(info)
    }
}

/// Barrier for the two halves of an image-open operation.
#[derive(Debug)]
pub struct PendingLoad {
    image_name: String,
    image: Option<ImageInfo>,
    payload: Option<AnnotationPayload>,
}

impl PendingLoad {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            image: None,
            payload: None,
        }
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Accept a decoded image, unless it belongs to a superseded load.
    /// Returns whether the image was accepted.
    pub fn offer_image(&mut self, info: ImageInfo) -> bool {
        if info.name != self.image_name {
            log::debug!(
                "Ignoring stale image completion for '{}' (current: '{}')",
                info.name,
                self.image_name
            );
            return false;
        }
        self.image = Some(info);
        true
    }

    /// Accept an annotation payload, unless it belongs to a superseded load.
    pub fn offer_payload(&mut self, payload: AnnotationPayload) -> bool {
        if payload.image_name != self.image_name {
            log::debug!(
                "Ignoring stale annotation completion for '{}' (current: '{}')",
                payload.image_name,
                self.image_name
            );
            return false;
        }
        self.payload = Some(payload);
        true
    }

    pub fn is_ready(&self) -> bool {
        self.image.is_some() && self.payload.is_some()
    }

    /// Consume the barrier once both halves are present.
    pub fn into_parts(self) -> Option<(ImageInfo, AnnotationPayload)> {
        match (self.image, self.payload) {
            (Some(info), Some(payload)) => Some((info, payload)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> ImageInfo {
        ImageInfo {
            name: name.into(),
            width: 100,
            height: 80,
        }
    }

    #[test]
    fn test_ready_requires_both_halves() {
        let mut pending = PendingLoad::new("a.jpg");
        assert!(!pending.is_ready());

        assert!(pending.offer_image(info("a.jpg")));
        assert!(!pending.is_ready());

        assert!(pending.offer_payload(AnnotationPayload::empty("a.jpg")));
        assert!(pending.is_ready());

        let (image, payload) = pending.into_parts().unwrap();
        assert_eq!(image.width, 100);
        assert_eq!(payload.image_name, "a.jpg");
    }

    #[test]
    fn test_completion_order_does_not_matter() {
        let mut pending = PendingLoad::new("a.jpg");
        assert!(pending.offer_payload(AnnotationPayload::empty("a.jpg")));
        assert!(pending.offer_image(info("a.jpg")));
        assert!(pending.is_ready());
    }

    #[test]
    fn test_stale_completions_rejected() {
        let mut pending = PendingLoad::new("b.jpg");
        assert!(!pending.offer_image(info("a.jpg")));
        assert!(!pending.offer_payload(AnnotationPayload::empty("a.jpg")));
        assert!(!pending.is_ready());
    }

    #[test]
    fn test_decode_real_bytes() {
        let mut png = Vec::new();
        let img = image::RgbaImage::new(17, 9);
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let decoded = ImageInfo::decode("tiny.png", &png).unwrap();
        assert_eq!((decoded.width, decoded.height), (17, 9));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(ImageInfo::decode("x.png", b"not an image").is_err());
    }
}
