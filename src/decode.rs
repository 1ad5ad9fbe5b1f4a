use dicom_object::{file::ReadPreamble, OpenFileOptions};
use dicom_pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder};
use image::DynamicImage;
use std::io::Cursor;
use thiserror::Error;

const DICOM_EXTENSION: &str = ".dcm";

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Error decoding image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Error reading image: {0}")]
    Io(#[from] std::io::Error),
    #[error("DICOM file is corrupt or malformed: {0}")]
    DicomContainer(String),
    #[error("DICOM pixel data is corrupt or uses an unsupported compression: {0}")]
    DicomPixelData(String),
    #[error("Unsupported DICOM samples per pixel: {0}")]
    UnsupportedSamplesPerPixel(u16),
    #[error("DICOM pixel data holds {actual} samples, expected {expected}")]
    TruncatedPixelData { expected: usize, actual: usize },
}

/// Container format of an incoming file, told apart by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Standard,
    Dicom,
}

impl SourceFormat {
    pub fn detect(filename: &str) -> Self {
        if filename.to_lowercase().ends_with(DICOM_EXTENSION) {
            SourceFormat::Dicom
        } else {
            SourceFormat::Standard
        }
    }
}

/// Stored sample values of the first frame of a DICOM image, row-major with
/// interleaved samples.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub samples: Vec<f32>,
}

#[derive(Debug)]
pub enum DecodedImage {
    Raster(DynamicImage),
    Dicom(PixelGrid),
}

pub fn decode(bytes: &[u8], filename: &str) -> Result<DecodedImage, DecodeError> {
    match SourceFormat::detect(filename) {
        SourceFormat::Dicom => {
            tracing::debug!(filename, "Decoding DICOM radiograph");
            decode_dicom(bytes).map(DecodedImage::Dicom)
        }
        SourceFormat::Standard => decode_standard(bytes).map(DecodedImage::Raster),
    }
}

pub fn decode_standard(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    let image_reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(image_reader.decode()?)
}

pub fn decode_dicom(bytes: &[u8]) -> Result<PixelGrid, DecodeError> {
    let object = OpenFileOptions::new()
        .read_preamble(ReadPreamble::Auto)
        .from_reader(bytes)
        .map_err(|e| DecodeError::DicomContainer(e.to_string()))?;

    let decoded = object
        .decode_pixel_data()
        .map_err(|e| DecodeError::DicomPixelData(e.to_string()))?;

    let samples_per_pixel = decoded.samples_per_pixel() as u16;
    if !matches!(samples_per_pixel, 1 | 3) {
        return Err(DecodeError::UnsupportedSamplesPerPixel(samples_per_pixel));
    }

    let width = decoded.columns() as u32;
    let height = decoded.rows() as u32;

    // Stored values, no rescale slope/intercept.
    let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
    let mut samples: Vec<f32> = decoded
        .to_vec_with_options(&options)
        .map_err(|e| DecodeError::DicomPixelData(e.to_string()))?;

    let expected = width as usize * height as usize * samples_per_pixel as usize;
    if samples.len() < expected {
        return Err(DecodeError::TruncatedPixelData {
            expected,
            actual: samples.len(),
        });
    }
    samples.truncate(expected);

    Ok(PixelGrid {
        width,
        height,
        samples_per_pixel,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png_bytes() -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(40, 30, Rgb([255, 0, 0]));
        let mut image_data: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut image_data), image::ImageFormat::Png)
            .unwrap();
        image_data
    }

    #[test]
    fn test_detect_format_by_extension() {
        assert_eq!(SourceFormat::detect("scan.dcm"), SourceFormat::Dicom);
        assert_eq!(SourceFormat::detect("pacientes/juan/RADIO.DCM"), SourceFormat::Dicom);
        assert_eq!(SourceFormat::detect("hand.png"), SourceFormat::Standard);
        assert_eq!(SourceFormat::detect("hand.jpg"), SourceFormat::Standard);
        assert_eq!(SourceFormat::detect("dcm"), SourceFormat::Standard);
        assert_eq!(SourceFormat::detect(""), SourceFormat::Standard);
    }

    #[test]
    fn test_decode_standard_png() {
        let decoded = decode(&png_bytes(), "hand.png").unwrap();
        match decoded {
            DecodedImage::Raster(img) => {
                assert_eq!(img.width(), 40);
                assert_eq!(img.height(), 30);
            }
            DecodedImage::Dicom(_) => panic!("png decoded as DICOM"),
        }
    }

    #[test]
    fn test_decode_standard_sniffs_content_not_name() {
        // The extension only separates DICOM from everything else.
        assert!(matches!(
            decode(&png_bytes(), "upload.jpg"),
            Ok(DecodedImage::Raster(_))
        ));
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result = decode(b"definitely not an image", "hand.png");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_corrupt_dicom() {
        let err = decode(&[0u8; 64], "scan.dcm").unwrap_err();
        assert!(matches!(err, DecodeError::DicomContainer(_)));
        assert!(err.to_string().contains("DICOM"));
    }

    #[test]
    fn test_png_named_dcm_is_rejected() {
        assert!(decode(&png_bytes(), "scan.dcm").is_err());
    }
}
