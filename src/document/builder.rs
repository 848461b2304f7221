//! Assembling an image-only PDF from a sequence of page images.

use lopdf::{dictionary, Document, Object, Stream};

use crate::error::BuildError;
use crate::raster::{ColorModel, ImageEncoding, PageImage};

/// Upper bound on pages per document, as a resource guard against
/// runaway rasterizer output.
pub const DEFAULT_MAX_PAGES: usize = 5000;

/// Builds a single-image-per-page document.
///
/// Page N of the output is image N of the input, sized so that one PDF
/// unit equals one pixel, with the image painted over the full page rect.
pub struct DocumentBuilder {
    max_pages: usize,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES)
    }
}

impl DocumentBuilder {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    /// Construct the in-memory document. No disk I/O.
    pub fn build(&self, images: &[PageImage]) -> Result<Document, BuildError> {
        self.validate(images)?;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(images.len());

        for image in images {
            let page_id = self.add_page(&mut doc, pages_id, image);
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => images.len() as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Ok(doc)
    }

    fn validate(&self, images: &[PageImage]) -> Result<(), BuildError> {
        if images.is_empty() {
            return Err(BuildError::NoPages);
        }
        if images.len() > self.max_pages {
            return Err(BuildError::TooManyPages {
                count: images.len(),
                max: self.max_pages,
            });
        }
        for image in images {
            let page = image.index + 1;
            if image.data.is_empty() {
                return Err(BuildError::EmptyImage { page });
            }
            if image.width == 0 || image.height == 0 {
                return Err(BuildError::ZeroDimension { page });
            }
        }
        Ok(())
    }

    fn add_page(
        &self,
        doc: &mut Document,
        pages_id: lopdf::ObjectId,
        image: &PageImage,
    ) -> lopdf::ObjectId {
        let width = i64::from(image.width);
        let height = i64::from(image.height);

        let color_space = match image.color {
            ColorModel::Gray => "DeviceGray",
            ColorModel::Rgb => "DeviceRGB",
        };
        let filter = match image.encoding {
            ImageEncoding::Jpeg => "DCTDecode",
        };

        // The payload is already compressed; keep lopdf from deflating it
        // a second time on save.
        let xobject_id = doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => filter,
                },
                image.data.clone(),
            )
            .with_compression(false),
        );

        let name = format!("Im{}", image.index + 1);
        let content = format!("q {} 0 0 {} 0 0 cm /{} Do Q", width, height, name).into_bytes();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    name => xobject_id,
                },
            },
        })
    }
}
