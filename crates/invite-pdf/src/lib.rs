//! Invitation PDF rendering
//!
//! Composes a one-page PDF whose only content is a template image, placed
//! at a fixed position on the page. Built directly with lopdf so the Lambda
//! binary stays free of a layout engine.
//!
//! ```no_run
//! use invite_pdf::{render_page, PageLayout, TemplateImage};
//!
//! let template = TemplateImage::open("template.jpg")?;
//! let pdf = render_page(&template, &PageLayout::default())?;
//! assert!(pdf.starts_with(b"%PDF-"));
//! # Ok::<(), invite_pdf::PdfError>(())
//! ```

pub mod error;
pub mod layout;
pub mod render;
pub mod template;

pub use error::PdfError;
pub use layout::{ImagePlacement, PageLayout, PageSize};
pub use render::render_page;
pub use template::{ColorSpace, ImageEncoding, TemplateImage};
