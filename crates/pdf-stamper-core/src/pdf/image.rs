//! Image XObjects for title-block embedding.
//!
//! JPEG data is embedded as-is with the DCTDecode filter. PNG data is decoded,
//! split into color and alpha planes, and stored Flate-compressed with the
//! alpha plane attached as a soft mask.

use lopdf::{Dictionary, Object, Stream};

use crate::error::{Error, Result};

/// Declared image format of a title-block image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Choose the format from a URL: a `.png` suffix (any case) means PNG,
    /// anything else is treated as JPEG.
    pub fn from_url(url: &str) -> Self {
        if url.to_ascii_lowercase().ends_with(".png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }
}

/// JPEG frame header info
#[derive(Debug, Clone, Copy)]
struct JpegInfo {
    width: u32,
    height: u32,
    num_components: u8,
}

/// Decoded image ready to be added to a document.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    color_space: &'static str,
    /// Image stream (already filtered)
    data: ImageData,
    /// 8-bit alpha plane, if the source had transparency
    alpha: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
enum ImageData {
    Dct(Vec<u8>),
    Raw(Vec<u8>),
}

/// Read the SOF segment of a JPEG stream.
fn read_jpeg_info(data: &[u8]) -> Result<JpegInfo> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(Error::ImageDecode("not a JPEG stream".to_string()));
    }

    let mut i = 2;
    while i + 9 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF0..SOF15 except DHT (C4), JPG (C8) and DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            let height = u32::from(u16::from_be_bytes([data[i + 5], data[i + 6]]));
            let width = u32::from(u16::from_be_bytes([data[i + 7], data[i + 8]]));
            let num_components = data[i + 9];
            return Ok(JpegInfo {
                width,
                height,
                num_components,
            });
        }

        let length = usize::from(u16::from_be_bytes([data[i + 2], data[i + 3]]));
        if length < 2 {
            break;
        }
        i += 2 + length;
    }

    Err(Error::ImageDecode("JPEG frame header not found".to_string()))
}

impl ImageXObject {
    /// Create an XObject from image bytes in the declared format.
    pub fn from_bytes(data: &[u8], format: ImageFormat) -> Result<Self> {
        match format {
            ImageFormat::Jpeg => Self::from_jpeg(data),
            ImageFormat::Png => Self::from_png(data),
        }
    }

    /// JPEG images are embedded directly with DCTDecode.
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let info = read_jpeg_info(data)?;

        let color_space = match info.num_components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            color_space,
            data: ImageData::Dct(data.to_vec()),
            alpha: None,
        })
    }

    /// PNG images are decoded to 8-bit samples; transparency becomes a soft mask.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(|e| Error::ImageDecode(format!("invalid PNG: {e}")))?;

        let (width, height) = (decoded.width(), decoded.height());
        let has_alpha = decoded.color().has_alpha();
        let is_gray = !decoded.color().has_color();

        let alpha = has_alpha.then(|| {
            decoded
                .to_rgba8()
                .pixels()
                .map(|p| p[3])
                .collect::<Vec<u8>>()
        });

        let (samples, color_space) = if is_gray {
            (decoded.to_luma8().into_raw(), "DeviceGray")
        } else {
            (decoded.to_rgb8().into_raw(), "DeviceRGB")
        };

        Ok(Self {
            width,
            height,
            color_space,
            data: ImageData::Raw(samples),
            alpha,
        })
    }

    /// Build the image stream plus, when present, its soft-mask stream.
    ///
    /// The caller adds the mask first and passes its id to
    /// [`Self::to_pdf_stream`].
    pub fn mask_stream(&self) -> Result<Option<Stream>> {
        self.alpha
            .as_ref()
            .map(|alpha| {
                let dict = self.base_dict("DeviceGray");
                compressed_stream(dict, alpha.clone())
            })
            .transpose()
    }

    /// Convert to a lopdf image stream, referencing an optional soft mask.
    pub fn to_pdf_stream(&self, smask: Option<lopdf::ObjectId>) -> Result<Stream> {
        let mut dict = self.base_dict(self.color_space);
        if let Some(mask_id) = smask {
            dict.set("SMask", Object::Reference(mask_id));
        }

        match &self.data {
            ImageData::Dct(bytes) => {
                dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
                if self.color_space == "DeviceCMYK" {
                    // Adobe-style CMYK JPEGs store inverted samples
                    dict.set(
                        "Decode",
                        Object::Array([1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect()),
                    );
                }
                Ok(Stream::new(dict, bytes.clone()).with_compression(false))
            }
            ImageData::Raw(samples) => compressed_stream(dict, samples.clone()),
        }
    }

    fn base_dict(&self, color_space: &str) -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(self.width))),
            ("Height", Object::Integer(i64::from(self.height))),
            ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ])
    }
}

fn compressed_stream(dict: Dictionary, content: Vec<u8>) -> Result<Stream> {
    let mut stream = Stream::new(dict, content);
    stream
        .compress()
        .map_err(|e| Error::ImageDecode(format!("failed to compress image data: {e}")))?;
    Ok(stream)
}
