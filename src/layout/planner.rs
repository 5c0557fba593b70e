use crate::error::GeometryError;
use crate::video::types::{PixelFormat, StreamGeometry, SurfaceKind};

/// Stacking direction, fixed by the filter variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Inputs side by side, left to right
    Horizontal,
    /// Inputs on top of each other, top to bottom
    Vertical,
}

/// Placement of one input within the output canvas
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayoutRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Constant opacity applied to the whole input (255 = opaque)
    pub global_alpha: u8,
    pub global_alpha_enabled: bool,
    pub pixel_alpha_enabled: bool,
}

impl LayoutRect {
    fn opaque(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            global_alpha: 255,
            global_alpha_enabled: true,
            pixel_alpha_enabled: false,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn intersects(&self, other: &LayoutRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Rectangles for every input plus the canvas they tile
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutPlan {
    pub orientation: Orientation,
    pub rects: Vec<LayoutRect>,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl LayoutPlan {
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

/// Compute where each input lands in the output canvas.
///
/// Horizontal stacking requires every input to share input 0's height and
/// lays inputs out left to right in index order; vertical stacking is the
/// transposed dual. All surface and format checks happen here so nothing is
/// allocated on the accelerator for an impossible configuration.
pub fn plan(
    geometries: &[StreamGeometry],
    orientation: Orientation,
) -> Result<LayoutPlan, GeometryError> {
    if geometries.len() < 2 {
        return Err(GeometryError::TooFewInputs {
            count: geometries.len(),
        });
    }

    validate_surfaces(geometries)?;

    let first = geometries[0];
    let mut rects = Vec::with_capacity(geometries.len());
    let mut offset: u32 = 0;

    for (index, geometry) in geometries.iter().enumerate() {
        if geometry.width == 0 || geometry.height == 0 {
            return Err(GeometryError::EmptyInput {
                index,
                width: geometry.width,
                height: geometry.height,
            });
        }
        // Odd sizes would put the next input's chroma inside this one's block
        let odd = geometry.width % 2 != 0 || geometry.height % 2 != 0;
        if geometry.format == PixelFormat::Nv12 && odd {
            return Err(GeometryError::UnalignedInput {
                index,
                width: geometry.width,
                height: geometry.height,
            });
        }

        let rect = match orientation {
            Orientation::Horizontal => {
                if geometry.height != first.height {
                    return Err(GeometryError::HeightMismatch {
                        index,
                        height: geometry.height,
                        expected: first.height,
                    });
                }
                LayoutRect::opaque(offset, 0, geometry.width, geometry.height)
            }
            Orientation::Vertical => {
                if geometry.width != first.width {
                    return Err(GeometryError::WidthMismatch {
                        index,
                        width: geometry.width,
                        expected: first.width,
                    });
                }
                LayoutRect::opaque(0, offset, geometry.width, geometry.height)
            }
        };

        let extent = match orientation {
            Orientation::Horizontal => geometry.width,
            Orientation::Vertical => geometry.height,
        };
        offset = offset
            .checked_add(extent)
            .ok_or(GeometryError::CanvasOverflow { index })?;

        rects.push(rect);
    }

    let (canvas_width, canvas_height) = match orientation {
        Orientation::Horizontal => (offset, first.height),
        Orientation::Vertical => (first.width, offset),
    };

    Ok(LayoutPlan {
        orientation,
        rects,
        canvas_width,
        canvas_height,
    })
}

fn validate_surfaces(geometries: &[StreamGeometry]) -> Result<(), GeometryError> {
    let first = geometries[0].surface;

    for (index, geometry) in geometries.iter().enumerate() {
        match (first, geometry.surface) {
            (SurfaceKind::Hardware { device: expected }, SurfaceKind::Hardware { device }) => {
                if device != expected {
                    return Err(GeometryError::DeviceMismatch { index });
                }
            }
            (SurfaceKind::Software, SurfaceKind::Software) => {
                if geometry.format != PixelFormat::Nv12 {
                    return Err(GeometryError::UnsupportedFormat {
                        index,
                        format: geometry.format.to_string(),
                    });
                }
            }
            _ => return Err(GeometryError::MixedSurfaceKinds { index }),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::types::DeviceId;

    fn assert_tiles_canvas(plan: &LayoutPlan) {
        let covered: u64 = plan.rects.iter().map(LayoutRect::area).sum();
        assert_eq!(covered, plan.canvas_width as u64 * plan.canvas_height as u64);

        for (i, a) in plan.rects.iter().enumerate() {
            assert!(a.right() <= plan.canvas_width);
            assert!(a.bottom() <= plan.canvas_height);
            for b in &plan.rects[i + 1..] {
                assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_every_valid_count_tiles_exactly() {
        for count in 2..=64usize {
            let geometries: Vec<_> = (0..count)
                .map(|i| StreamGeometry::nv12(16 + 2 * i as u32, 48))
                .collect();

            let horizontal = plan(&geometries, Orientation::Horizontal).unwrap();
            assert_eq!(horizontal.len(), count);
            assert_tiles_canvas(&horizontal);

            let square: Vec<_> = (0..count).map(|_| StreamGeometry::nv12(32, 24)).collect();
            let vertical = plan(&square, Orientation::Vertical).unwrap();
            assert_eq!(vertical.len(), count);
            assert_eq!(vertical.canvas_height, 24 * count as u32);
            assert_tiles_canvas(&vertical);
        }
    }

    #[test]
    fn test_horizontal_offsets_are_running_sums() {
        let geometries = [
            StreamGeometry::nv12(320, 240),
            StreamGeometry::nv12(160, 240),
            StreamGeometry::nv12(64, 240),
        ];
        let plan = plan(&geometries, Orientation::Horizontal).unwrap();

        let xs: Vec<u32> = plan.rects.iter().map(|r| r.x).collect();
        assert_eq!(xs, vec![0, 320, 480]);
        assert!(plan.rects.iter().all(|r| r.y == 0 && r.height == 240));
        assert_eq!((plan.canvas_width, plan.canvas_height), (544, 240));

        let rect = plan.rects[1];
        assert_eq!(rect.global_alpha, 255);
        assert!(rect.global_alpha_enabled);
        assert!(!rect.pixel_alpha_enabled);
    }

    #[test]
    fn test_vertical_is_transposed_dual() {
        let geometries = [StreamGeometry::nv12(128, 72), StreamGeometry::nv12(128, 36)];
        let plan = plan(&geometries, Orientation::Vertical).unwrap();

        assert_eq!(plan.rects[1].y, 72);
        assert_eq!(plan.rects[1].x, 0);
        assert_eq!((plan.canvas_width, plan.canvas_height), (128, 108));
    }

    #[test]
    fn test_height_mismatch_names_offending_input() {
        let geometries = [
            StreamGeometry::nv12(320, 240),
            StreamGeometry::nv12(320, 240),
            StreamGeometry::nv12(320, 200),
        ];
        let err = plan(&geometries, Orientation::Horizontal).unwrap_err();
        assert_eq!(
            err,
            GeometryError::HeightMismatch {
                index: 2,
                height: 200,
                expected: 240
            }
        );

        // Same inputs are fine stacked vertically
        assert!(plan(&geometries, Orientation::Vertical).is_ok());
    }

    #[test]
    fn test_width_mismatch_in_vertical() {
        let geometries = [StreamGeometry::nv12(320, 240), StreamGeometry::nv12(300, 240)];
        let err = plan(&geometries, Orientation::Vertical).unwrap_err();
        assert!(matches!(err, GeometryError::WidthMismatch { index: 1, .. }));
    }

    #[test]
    fn test_surface_validation() {
        let mixed = [
            StreamGeometry::hardware(64, 64, DeviceId(0)),
            StreamGeometry::nv12(64, 64),
        ];
        assert_eq!(
            plan(&mixed, Orientation::Horizontal).unwrap_err(),
            GeometryError::MixedSurfaceKinds { index: 1 }
        );

        let devices = [
            StreamGeometry::hardware(64, 64, DeviceId(0)),
            StreamGeometry::hardware(64, 64, DeviceId(1)),
        ];
        assert_eq!(
            plan(&devices, Orientation::Horizontal).unwrap_err(),
            GeometryError::DeviceMismatch { index: 1 }
        );

        let mut bgra = StreamGeometry::nv12(64, 64);
        bgra.format = PixelFormat::Bgra;
        let formats = [StreamGeometry::nv12(64, 64), bgra];
        assert!(matches!(
            plan(&formats, Orientation::Horizontal).unwrap_err(),
            GeometryError::UnsupportedFormat { index: 1, .. }
        ));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(
            plan(&[StreamGeometry::nv12(64, 64)], Orientation::Horizontal).unwrap_err(),
            GeometryError::TooFewInputs { count: 1 }
        );

        let empty = [StreamGeometry::nv12(64, 64), StreamGeometry::nv12(0, 64)];
        assert!(matches!(
            plan(&empty, Orientation::Horizontal).unwrap_err(),
            GeometryError::EmptyInput { index: 1, .. }
        ));

        let huge = [
            StreamGeometry::nv12(u32::MAX - 1, 2),
            StreamGeometry::nv12(16, 2),
        ];
        assert_eq!(
            plan(&huge, Orientation::Horizontal).unwrap_err(),
            GeometryError::CanvasOverflow { index: 1 }
        );
    }

    #[test]
    fn test_odd_nv12_sizes_are_rejected() {
        let narrow = [StreamGeometry::nv12(3, 2), StreamGeometry::nv12(3, 2)];
        assert_eq!(
            plan(&narrow, Orientation::Horizontal).unwrap_err(),
            GeometryError::UnalignedInput { index: 0, width: 3, height: 2 }
        );

        let short = [StreamGeometry::nv12(4, 4), StreamGeometry::nv12(4, 3)];
        assert_eq!(
            plan(&short, Orientation::Vertical).unwrap_err(),
            GeometryError::UnalignedInput { index: 1, width: 4, height: 3 }
        );
    }

    #[test]
    fn test_plan_is_deterministic() {
        let geometries = [StreamGeometry::nv12(100, 50), StreamGeometry::nv12(60, 50)];
        assert_eq!(
            plan(&geometries, Orientation::Horizontal),
            plan(&geometries, Orientation::Horizontal)
        );
    }
}
