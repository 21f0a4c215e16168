//! Template image loading
//!
//! Baseline JPEGs are embedded untouched (`/DCTDecode`). Everything else is
//! decoded and re-encoded as 8-bit samples behind `/FlateDecode`, with any
//! alpha channel split out into a soft mask.

use std::io::Write;
use std::path::Path;

use flate2::{write::ZlibEncoder, Compression};
use image::{DynamicImage, GenericImageView, ImageFormat};
use lopdf::{dictionary, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::PdfError;

/// PDF colour space of the embedded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    fn pdf_name(self) -> &'static str {
        match self {
            ColorSpace::Gray => "DeviceGray",
            ColorSpace::Rgb => "DeviceRGB",
        }
    }
}

/// How the sample data is stored in the PDF stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Original JPEG bytes
    Dct,
    /// Zlib-compressed raw samples
    Flate,
}

impl ImageEncoding {
    fn filter_name(self) -> &'static str {
        match self {
            ImageEncoding::Dct => "DCTDecode",
            ImageEncoding::Flate => "FlateDecode",
        }
    }
}

/// A template image ready to be placed on a page
#[derive(Debug, Clone)]
pub struct TemplateImage {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    encoding: ImageEncoding,
    data: Vec<u8>,
    /// Flate-compressed 8-bit alpha samples
    soft_mask: Option<Vec<u8>>,
}

impl TemplateImage {
    /// Read and prepare a template from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PdfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), size = bytes.len(), "Loaded template image");
        Self::from_bytes(&bytes)
    }

    /// Prepare a template from encoded image bytes (JPEG, PNG or WebP)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        if bytes.is_empty() {
            return Err(PdfError::EmptyTemplate);
        }

        let format = image::guess_format(bytes)
            .map_err(|_| PdfError::UnsupportedImage("unrecognised image signature".into()))?;

        match format {
            ImageFormat::Jpeg => match JpegHeader::parse(bytes) {
                Some(header) if header.precision == 8 && matches!(header.components, 1 | 3) => {
                    Ok(Self {
                        width: u32::from(header.width),
                        height: u32::from(header.height),
                        color_space: if header.components == 1 {
                            ColorSpace::Gray
                        } else {
                            ColorSpace::Rgb
                        },
                        encoding: ImageEncoding::Dct,
                        data: bytes.to_vec(),
                        soft_mask: None,
                    })
                }
                // CMYK, 12-bit and odd headers go through the decoder
                _ => Self::decode(bytes, format),
            },
            ImageFormat::Png | ImageFormat::WebP => Self::decode(bytes, format),
            other => Err(PdfError::UnsupportedImage(format!("{:?}", other))),
        }
    }

    fn decode(bytes: &[u8], format: ImageFormat) -> Result<Self, PdfError> {
        let img = image::load_from_memory_with_format(bytes, format)?;
        let (width, height) = img.dimensions();
        let color = img.color();

        let (color_space, samples) = if color.has_color() {
            (ColorSpace::Rgb, img.to_rgb8().into_raw())
        } else {
            (ColorSpace::Gray, img.to_luma8().into_raw())
        };

        let soft_mask = if color.has_alpha() {
            alpha_samples(&img).map(|a| deflate(&a)).transpose()?
        } else {
            None
        };

        Ok(Self {
            width,
            height,
            color_space,
            encoding: ImageEncoding::Flate,
            data: deflate(&samples)?,
            soft_mask,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn has_soft_mask(&self) -> bool {
        self.soft_mask.is_some()
    }

    /// Image XObject stream, optionally referencing an already-added soft mask
    pub(crate) fn xobject(&self, soft_mask: Option<ObjectId>) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(self.width),
            "Height" => i64::from(self.height),
            "ColorSpace" => self.color_space.pdf_name(),
            "BitsPerComponent" => 8,
            "Filter" => self.encoding.filter_name(),
        };
        if let Some(id) = soft_mask {
            dict.set("SMask", Object::Reference(id));
        }
        Stream::new(dict, self.data.clone())
    }

    pub(crate) fn soft_mask_stream(&self) -> Option<Stream> {
        self.soft_mask.as_ref().map(|alpha| {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(self.width),
                "Height" => i64::from(self.height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            };
            Stream::new(dict, alpha.clone())
        })
    }
}

/// Alpha channel, or `None` when every pixel is opaque
fn alpha_samples(img: &DynamicImage) -> Option<Vec<u8>> {
    let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p.0[3]).collect();
    if alpha.iter().all(|&a| a == u8::MAX) {
        None
    } else {
        Some(alpha)
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(deflate_error)?;
    encoder.finish().map_err(deflate_error)
}

fn deflate_error(e: std::io::Error) -> PdfError {
    PdfError::OperationError(format!("Deflate failed: {}", e))
}

/// Frame header of a JPEG file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    /// Bits per sample
    precision: u8,
    width: u16,
    height: u16,
    components: u8,
}

impl JpegHeader {
    /// Walk the marker segments up to the first SOFn
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
            return None;
        }

        let mut pos = 2;
        while pos + 4 <= bytes.len() {
            if bytes[pos] != 0xFF {
                return None;
            }
            let marker = bytes[pos + 1];
            match marker {
                // fill byte
                0xFF => {
                    pos += 1;
                    continue;
                }
                // TEM and RSTn carry no length
                0x01 | 0xD0..=0xD7 => {
                    pos += 2;
                    continue;
                }
                // SOS or EOI before any frame header
                0xD9 | 0xDA => return None,
                _ => {}
            }

            let len = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
            if is_start_of_frame(marker) {
                let seg = bytes.get(pos + 4..pos + 10)?;
                let header = Self {
                    precision: seg[0],
                    height: u16::from_be_bytes([seg[1], seg[2]]),
                    width: u16::from_be_bytes([seg[3], seg[4]]),
                    components: seg[5],
                };
                // height 0 means it is defined later by a DNL segment
                return (header.width > 0 && header.height > 0).then_some(header);
            }
            pos += 2 + len;
        }
        None
    }
}

fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}
