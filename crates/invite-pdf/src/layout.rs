//! Page geometry
//!
//! All values are PDF points (1/72 inch). Image placement is expressed from
//! the top-left corner of the page, the way designers measure templates.

use crate::error::PdfError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// ISO A4, 210 x 297 mm
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    /// US Letter, 8.5 x 11 in
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// Where the template image is drawn, measured from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for ImagePlacement {
    /// Slightly larger than A4 so the template bleeds off every edge
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 650.0,
            height: 900.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageLayout {
    pub page: PageSize,
    pub placement: ImagePlacement,
}

impl PageLayout {
    /// Image fills the page exactly
    pub fn full_page(page: PageSize) -> Self {
        Self {
            page,
            placement: ImagePlacement {
                x: 0.0,
                y: 0.0,
                width: page.width,
                height: page.height,
            },
        }
    }

    pub fn validate(&self) -> Result<(), PdfError> {
        check_positive("page width", self.page.width)?;
        check_positive("page height", self.page.height)?;
        check_positive("image width", self.placement.width)?;
        check_positive("image height", self.placement.height)?;
        if !self.placement.x.is_finite() || !self.placement.y.is_finite() {
            return Err(PdfError::InvalidLayout(
                "image offset must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Lower-left corner of the image in PDF user space
    pub(crate) fn image_origin(&self) -> (f32, f32) {
        (
            self.placement.x,
            self.page.height - self.placement.y - self.placement.height,
        )
    }
}

fn check_positive(what: &str, value: f32) -> Result<(), PdfError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PdfError::InvalidLayout(format!(
            "{} must be a positive number, got {}",
            what, value
        )))
    }
}
