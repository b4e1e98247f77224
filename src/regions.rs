//! Coarse region detection.
//!
//! Not object recognition: the frame is blurred, thresholded, and split
//! into 8-connected foreground components. Every component large enough is
//! reported as a bounding box tagged [`RegionKind::Unknown`]. Only outermost
//! shapes count: a component sitting inside a hole of another component is
//! dropped, while disjoint shapes are kept even when one bounding box
//! encloses the other.

use image::{GrayImage, Luma};
use imageproc::{
    filter::gaussian_blur_f32,
    region_labelling::{Connectivity, connected_components},
};
use serde::Serialize;

/// Classification tag of a detected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// No classification is attempted.
    #[default]
    Unknown,
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A coarse region found in a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedRegion {
    /// Always [`RegionKind::Unknown`].
    #[serde(rename = "type")]
    pub kind: RegionKind,
    /// Bounding box of the region.
    pub position: BoundingBox,
    /// Foreground pixel count of the region.
    pub area: u32,
}

/// Tuning for [`detect_regions`].
#[derive(Debug, Clone)]
pub struct RegionOptions {
    /// Gaussian blur sigma applied before thresholding (1.1 ≈ a 5×5 kernel).
    pub blur_sigma: f32,
    /// Pixels strictly brighter than this are foreground.
    pub threshold: u8,
    /// Components with fewer foreground pixels are ignored.
    pub min_area: u32,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            threshold: 60,
            min_area: 500,
        }
    }
}

/// Find bright connected regions in a grayscale frame.
///
/// Regions are returned in raster order of their first pixel (top to
/// bottom, left to right).
pub fn detect_regions(luma: &GrayImage, options: &RegionOptions) -> Vec<DetectedRegion> {
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let blurred = if options.blur_sigma > 0.0 {
        gaussian_blur_f32(luma, options.blur_sigma)
    } else {
        luma.clone()
    };
    let mask = GrayImage::from_fn(width, height, |x, y| {
        Luma([if blurred.get_pixel(x, y).0[0] > options.threshold { 255 } else { 0 }])
    });

    // Background is labelled with the dual connectivity. Background
    // components that reach the border are open; the rest are holes.
    let shapes = connected_components(&mask, Connectivity::Eight, Luma([0u8]));
    let inverted = GrayImage::from_fn(width, height, |x, y| Luma([255 - mask.get_pixel(x, y).0[0]]));
    let gaps = connected_components(&inverted, Connectivity::Four, Luma([0u8]));

    let is_border = |x: u32, y: u32| x == 0 || y == 0 || x == width - 1 || y == height - 1;
    let gap_count = gaps.pixels().map(|label| label.0[0]).max().unwrap_or(0) as usize;
    let mut open = vec![false; gap_count + 1];
    for (x, y, label) in gaps.enumerate_pixels() {
        if is_border(x, y) {
            open[label.0[0] as usize] = true;
        }
    }
    open[0] = false;

    let touches_open_gap = |x: u32, y: u32| {
        [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
            .into_iter()
            .any(|(nx, ny)| open[gaps.get_pixel(nx, ny).0[0] as usize])
    };

    let shape_count = shapes.pixels().map(|label| label.0[0]).max().unwrap_or(0) as usize;
    let mut slots: Vec<Option<usize>> = vec![None; shape_count + 1];
    let mut components: Vec<Component> = Vec::new();

    for (x, y, label) in shapes.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        let slot = *slots[label].get_or_insert_with(|| {
            components.push(Component::new(x, y));
            components.len() - 1
        });
        let component = &mut components[slot];
        component.include(x, y);
        if !component.external && (is_border(x, y) || touches_open_gap(x, y)) {
            component.external = true;
        }
    }

    components
        .into_iter()
        .filter(|component| component.external && component.area > options.min_area)
        .map(|component| DetectedRegion {
            kind: RegionKind::Unknown,
            position: BoundingBox {
                x: component.min_x,
                y: component.min_y,
                width: component.max_x - component.min_x + 1,
                height: component.max_y - component.min_y + 1,
            },
            area: component.area,
        })
        .collect()
}

/// Running bounds of one labelled component.
struct Component {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
    external: bool,
}

impl Component {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
            external: false,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.area += 1;
    }
}
