//! Screenshot to single-page PDF conversion
//!
//! The page is not a standard paper size: it is the screenshot scaled by the
//! largest factor that still fits inside A4, so the image fills it exactly.

use crate::CaptureError;
use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// Page dimensions in PDF points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// ISO A4, 210 x 297 mm
pub const A4: PageSize = PageSize {
    width: 210.0 * POINTS_PER_MM,
    height: 297.0 * POINTS_PER_MM,
};

/// Uniform scale that fits an image of the given pixel size inside `page`.
pub fn fit_scale(image_width: u32, image_height: u32, page: PageSize) -> f64 {
    let scale_x = page.width / f64::from(image_width);
    let scale_y = page.height / f64::from(image_height);
    scale_x.min(scale_y)
}

/// Page size for an image scaled by [`fit_scale`].
///
/// # Examples
///
/// ```rust
/// use page_capture::{fitted_page_size, A4};
///
/// let page = fitted_page_size(1920, 1080, A4);
/// assert!((page.width - A4.width).abs() < 1e-9);
/// assert!(page.height < A4.height);
/// ```
pub fn fitted_page_size(image_width: u32, image_height: u32, page: PageSize) -> PageSize {
    let scale = fit_scale(image_width, image_height, page);
    PageSize {
        width: f64::from(image_width) * scale,
        height: f64::from(image_height) * scale,
    }
}

/// Wrap a screenshot in a one-page PDF sized to the image.
pub fn png_to_pdf(image_data: &[u8]) -> Result<Vec<u8>, CaptureError> {
    let image = image::load_from_memory(image_data)?;
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(CaptureError::Image("image has no pixels".to_string()));
    }

    let page = fitted_page_size(width, height, A4);
    debug!(
        "Fitting {}x{} image onto {:.2}x{:.2}pt page",
        width, height, page.width, page.height
    );

    // DeviceRGB samples, 8 bits each, no alpha
    let rgb = image.to_rgb8().into_raw();

    write_image_page(rgb, width, height, page)
}

fn write_image_page(
    rgb_samples: Vec<u8>,
    pixel_width: u32,
    pixel_height: u32,
    page: PageSize,
) -> Result<Vec<u8>, CaptureError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(pixel_width),
            "Height" => i64::from(pixel_height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb_samples,
    );
    // Lossless FlateDecode
    image.compress()?;
    let image_id = doc.add_object(image);

    let width = Object::Real(page.width as f32);
    let height = Object::Real(page.height as f32);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.clone(),
                    Object::Integer(0),
                    Object::Integer(0),
                    height.clone(),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), width, height],
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
    doc.trailer.set("Root", catalog_id);

    let mut pdf_data = Vec::new();
    doc.save_to(&mut pdf_data)?;
    Ok(pdf_data)
}
