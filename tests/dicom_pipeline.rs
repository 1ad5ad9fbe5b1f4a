use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use fracture_prediction::{
    config::TensorLayout,
    decision::Status,
    decode::{decode, DecodeError, DecodedImage},
    model_service::{InferenceError, ModelService},
    normalize::window_to_u8,
    pipeline::{analyze, PipelineError, Preprocessing},
};
use ndarray::Array4;

const ROWS: u16 = 6;
const COLUMNS: u16 = 8;
const SOP_INSTANCE_UID: &str = "1.2.826.0.1.3680043.2.1125.1";

/// Uncompressed DICOM file with `samples_per_pixel` interleaved samples.
fn dicom_file(
    samples_per_pixel: u16,
    photometric: &str,
    bits_allocated: u16,
    pixel_data: PrimitiveValue,
) -> Vec<u8> {
    let pixel_vr = if bits_allocated == 8 { VR::OB } else { VR::OW };
    let mut elements = vec![
        DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(uids::DIGITAL_X_RAY_IMAGE_STORAGE_FOR_PRESENTATION),
        ),
        DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(SOP_INSTANCE_UID),
        ),
        DataElement::new(
            tags::SAMPLES_PER_PIXEL,
            VR::US,
            PrimitiveValue::from(samples_per_pixel),
        ),
        DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from(photometric),
        ),
        DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(ROWS)),
        DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(COLUMNS)),
        DataElement::new(
            tags::BITS_ALLOCATED,
            VR::US,
            PrimitiveValue::from(bits_allocated),
        ),
        DataElement::new(
            tags::BITS_STORED,
            VR::US,
            PrimitiveValue::from(bits_allocated),
        ),
        DataElement::new(
            tags::HIGH_BIT,
            VR::US,
            PrimitiveValue::from(bits_allocated - 1),
        ),
        DataElement::new(
            tags::PIXEL_REPRESENTATION,
            VR::US,
            PrimitiveValue::from(0_u16),
        ),
        DataElement::new(tags::PIXEL_DATA, pixel_vr, pixel_data),
    ];
    if samples_per_pixel > 1 {
        elements.push(DataElement::new(
            tags::PLANAR_CONFIGURATION,
            VR::US,
            PrimitiveValue::from(0_u16),
        ));
    }

    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(uids::DIGITAL_X_RAY_IMAGE_STORAGE_FOR_PRESENTATION)
        .media_storage_sop_instance_uid(SOP_INSTANCE_UID)
        .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN);

    let file = InMemDicomObject::from_element_iter(elements)
        .with_meta(meta)
        .unwrap();
    let mut bytes = Vec::new();
    file.write_all(&mut bytes).unwrap();
    bytes
}

fn pixel_count() -> usize {
    ROWS as usize * COLUMNS as usize
}

/// Monochrome 16-bit radiograph with a ramp peaking at `peak`.
fn synthetic_dicom(peak: u16) -> Vec<u8> {
    let count = pixel_count();
    let pixels: Vec<u16> = (0..count)
        .map(|i| (i as u32 * peak as u32 / (count as u32 - 1)) as u16)
        .collect();
    dicom_file(1, "MONOCHROME2", 16, PrimitiveValue::U16(pixels.into()))
}

/// 8-bit RGB image: red ramp, constant green, empty blue.
fn rgb_dicom() -> Vec<u8> {
    let samples: Vec<u8> = (0..pixel_count())
        .flat_map(|i| [(i * 4) as u8, 100, 0])
        .collect();
    dicom_file(3, "RGB", 8, PrimitiveValue::U8(samples.into()))
}

struct InspectingModel;

impl ModelService for InspectingModel {
    fn predict(&self, input: &Array4<f32>) -> Result<f32, InferenceError> {
        assert_eq!(input.shape(), &[1, 3, 16, 16]);
        assert!(input.iter().all(|v| (0.0..=255.0).contains(v)));
        Ok(0.1)
    }
}

#[test]
fn test_decode_sixteen_bit_dicom() {
    let decoded = decode(&synthetic_dicom(4000), "radio.dcm").unwrap();
    let grid = match decoded {
        DecodedImage::Dicom(grid) => grid,
        DecodedImage::Raster(_) => panic!("expected a DICOM pixel grid"),
    };

    assert_eq!(grid.width, COLUMNS as u32);
    assert_eq!(grid.height, ROWS as u32);
    assert_eq!(grid.samples_per_pixel, 1);
    assert_eq!(grid.samples.len(), ROWS as usize * COLUMNS as usize);
    assert_eq!(grid.samples[0], 0.0);
    assert_eq!(grid.samples.last().copied(), Some(4000.0));
}

#[test]
fn test_window_stretches_peak_to_white() {
    let grid = match decode(&synthetic_dicom(4000), "RADIO.DCM").unwrap() {
        DecodedImage::Dicom(grid) => grid,
        DecodedImage::Raster(_) => panic!("expected a DICOM pixel grid"),
    };

    let gray = window_to_u8(&grid).unwrap().to_luma8();
    assert_eq!(gray.dimensions(), (COLUMNS as u32, ROWS as u32));
    assert_eq!(gray.as_raw().first().copied(), Some(0));
    assert_eq!(gray.as_raw().last().copied(), Some(255));
    assert_eq!(gray.as_raw().iter().copied().max(), Some(255));
}

#[test]
fn test_all_black_dicom_is_rejected() {
    let preprocessing = Preprocessing {
        image_size: 16,
        layout: TensorLayout::Nchw,
    };
    let err = analyze(&InspectingModel, &preprocessing, &synthetic_dicom(0), "radio.dcm")
        .unwrap_err();
    assert!(matches!(err, PipelineError::Normalize(_)));
}

#[test]
fn test_dicom_through_pipeline() {
    let preprocessing = Preprocessing {
        image_size: 16,
        layout: TensorLayout::Nchw,
    };
    let report = analyze(
        &InspectingModel,
        &preprocessing,
        &synthetic_dicom(4000),
        "pacientes/juan/radio.dcm",
    )
    .unwrap();

    assert_eq!(report.status, Status::Danger);
    assert_eq!(report.confidence_fracture, 90.0);
}

#[test]
fn test_decode_rgb_dicom() {
    let grid = match decode(&rgb_dicom(), "color.dcm").unwrap() {
        DecodedImage::Dicom(grid) => grid,
        DecodedImage::Raster(_) => panic!("expected a DICOM pixel grid"),
    };
    assert_eq!(grid.samples_per_pixel, 3);
    assert_eq!(grid.samples.len(), pixel_count() * 3);
    assert_eq!(&grid.samples[3..6], &[4.0, 100.0, 0.0]);

    // Brightest sample is the last red value, 47 * 4 = 188.
    let rgb = window_to_u8(&grid).unwrap().to_rgb8();
    assert_eq!(rgb.dimensions(), (COLUMNS as u32, ROWS as u32));
    assert_eq!(rgb.get_pixel(COLUMNS as u32 - 1, ROWS as u32 - 1).0, [255, 135, 0]);
}

#[test]
fn test_two_sample_dicom_is_unsupported() {
    let samples: Vec<u16> = vec![1000; pixel_count() * 2];
    let bytes = dicom_file(2, "MONOCHROME2", 16, PrimitiveValue::U16(samples.into()));

    let err = decode(&bytes, "odd.dcm").unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedSamplesPerPixel(2)));
}

#[test]
fn test_dicom_extension_forces_dicom_decoder() {
    let err = decode(b"\x89PNG not really", "hand.dcm").unwrap_err();
    assert!(matches!(err, DecodeError::DicomContainer(_)));
}
