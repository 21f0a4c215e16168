//! Single-page composition
//!
//! Builds the document from scratch: catalog, page tree with one page, the
//! template XObject and a content stream that paints it.

use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, Stream,
};
use tracing::debug;

use crate::error::PdfError;
use crate::layout::PageLayout;
use crate::template::TemplateImage;

/// Resource name of the template XObject
const IMAGE_NAME: &[u8] = b"Im0";

/// Render the template onto a single page and serialize the PDF
pub fn render_page(template: &TemplateImage, layout: &PageLayout) -> Result<Vec<u8>, PdfError> {
    layout.validate()?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let soft_mask_id = template.soft_mask_stream().map(|s| doc.add_object(s));
    let image_id = doc.add_object(template.xobject(soft_mask_id));

    let (x, y) = layout.image_origin();
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(layout.placement.width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(layout.placement.height),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| PdfError::OperationError(format!("Content encoding failed: {}", e)))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_NAME, Object::Reference(image_id));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(layout.page.width),
            Object::Real(layout.page.height),
        ],
        "Resources" => dictionary! {
            "XObject" => xobjects,
        },
        "Contents" => Object::Reference(content_id),
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::OperationError(format!("Save failed: {}", e)))?;

    debug!(
        size = buffer.len(),
        image_width = template.width(),
        image_height = template.height(),
        "Rendered template page"
    );

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ImagePlacement, PageSize};
    use crate::template::tests::{encode, rgb_jpeg};
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    fn load_single_page(pdf: &[u8]) -> (Document, lopdf::ObjectId) {
        let doc = Document::load_mem(pdf).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.get(&1).unwrap();
        (doc, page_id)
    }

    fn image_of(doc: &Document, page_id: lopdf::ObjectId) -> &Stream {
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_ref = xobjects.get(IMAGE_NAME).unwrap().as_reference().unwrap();
        doc.get_object(image_ref).unwrap().as_stream().unwrap()
    }

    #[test]
    fn test_renders_single_a4_page() {
        let template = TemplateImage::from_bytes(&rgb_jpeg(20, 30)).unwrap();
        let pdf = render_page(&template, &PageLayout::default()).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));

        let (doc, page_id) = load_single_page(&pdf);
        let page = doc.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), PageSize::A4.width);
        assert_eq!(media_box[3].as_float().unwrap(), PageSize::A4.height);
    }

    #[test]
    fn test_jpeg_embedded_with_dct_filter() {
        let jpeg = rgb_jpeg(20, 30);
        let template = TemplateImage::from_bytes(&jpeg).unwrap();
        let pdf = render_page(&template, &PageLayout::default()).unwrap();

        let (doc, page_id) = load_single_page(&pdf);
        let image = image_of(&doc, page_id);
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 20);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 30);
        assert_eq!(
            image.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
        assert_eq!(image.content, jpeg);
    }

    #[test]
    fn test_content_stream_places_image_from_top_left() {
        let template = TemplateImage::from_bytes(&rgb_jpeg(4, 4)).unwrap();
        let layout = PageLayout {
            page: PageSize::LETTER,
            placement: ImagePlacement {
                x: 50.0,
                y: 100.0,
                width: 300.0,
                height: 200.0,
            },
        };
        let pdf = render_page(&template, &layout).unwrap();

        let (doc, page_id) = load_single_page(&pdf);
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let ops: Vec<&str> = content
            .operations
            .iter()
            .map(|op| op.operator.as_str())
            .collect();
        assert_eq!(ops, vec!["q", "cm", "Do", "Q"]);

        let cm: Vec<f32> = content.operations[1]
            .operands
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        assert_eq!(cm, vec![300.0, 0.0, 0.0, 200.0, 50.0, 492.0]);
    }

    #[test]
    fn test_translucent_template_references_soft_mask() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 0]));
        let png = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);
        let template = TemplateImage::from_bytes(&png).unwrap();
        let pdf = render_page(&template, &PageLayout::default()).unwrap();

        let (doc, page_id) = load_single_page(&pdf);
        let image = image_of(&doc, page_id);
        let mask_ref = image.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = doc.get_object(mask_ref).unwrap().as_stream().unwrap();
        assert_eq!(
            mask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
    }

    #[test]
    fn test_invalid_layout_is_rejected_before_rendering() {
        let template = TemplateImage::from_bytes(&rgb_jpeg(4, 4)).unwrap();
        let mut layout = PageLayout::default();
        layout.page.height = -1.0;
        assert!(matches!(
            render_page(&template, &layout),
            Err(PdfError::InvalidLayout(_))
        ));
    }
}
