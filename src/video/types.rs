use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::error::Result;
use crate::video::time::{FrameRate, TimeBase};

/// Pixel layouts a stream can declare
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit Y plane followed by an interleaved half-resolution UV plane
    Nv12,
    Yuv420p,
    Bgra,
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Nv12 => "nv12",
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Bgra => "bgra",
        };
        f.write_str(name)
    }
}

/// Identifies the accelerator device a hardware surface lives on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

/// Opaque handle to a surface allocated by an accelerator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// Where a stream's pixels live
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Software,
    Hardware { device: DeviceId },
}

impl SurfaceKind {
    pub fn is_hardware(&self) -> bool {
        matches!(self, SurfaceKind::Hardware { .. })
    }
}

/// Declared frame geometry of a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamGeometry {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub surface: SurfaceKind,
}

impl StreamGeometry {
    /// Software NV12 geometry of the given size
    pub fn nv12(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Nv12,
            surface: SurfaceKind::Software,
        }
    }

    /// Hardware-surface geometry on `device`
    pub fn hardware(width: u32, height: u32, device: DeviceId) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Nv12,
            surface: SurfaceKind::Hardware { device },
        }
    }
}

/// Everything a stream must declare before the output can be configured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub geometry: StreamGeometry,
    pub time_base: TimeBase,
    pub frame_rate: Option<FrameRate>,
}

impl StreamInfo {
    pub fn new(geometry: StreamGeometry, time_base: TimeBase) -> Self {
        Self {
            geometry,
            time_base,
            frame_rate: None,
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }
}

/// NV12 pixel storage for software frames
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nv12Planes {
    width: u32,
    height: u32,
    y: Vec<u8>,
    uv: Vec<u8>,
}

impl Nv12Planes {
    /// Planes of the given size filled with one YUV colour
    pub fn filled(width: u32, height: u32, yuv: [u8; 3]) -> Self {
        let (cw, ch) = chroma_size(width, height);
        let chroma_samples = cw as usize * ch as usize;
        let mut uv = Vec::with_capacity(chroma_samples * 2);
        for _ in 0..chroma_samples {
            uv.push(yuv[1]);
            uv.push(yuv[2]);
        }
        Self {
            width,
            height,
            y: vec![yuv[0]; width as usize * height as usize],
            uv,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn y_plane(&self) -> &[u8] {
        &self.y
    }

    pub fn uv_plane(&self) -> &[u8] {
        &self.uv
    }

    /// YUV sample at a luma coordinate
    pub fn sample(&self, x: u32, y: u32) -> [u8; 3] {
        let (cw, _) = chroma_size(self.width, self.height);
        let luma = self.y[y as usize * self.width as usize + x as usize];
        let c = ((y / 2) as usize * cw as usize + (x / 2) as usize) * 2;
        [luma, self.uv[c], self.uv[c + 1]]
    }

    /// Copy `src` into these planes with its top-left corner at (`x`, `y`).
    ///
    /// Anything falling outside the destination is clipped. Chroma lands on
    /// the 2x2 block containing the luma offset, so placements at odd
    /// offsets share a chroma column with their left or upper neighbour.
    pub fn blit(&mut self, src: &Nv12Planes, x: u32, y: u32) {
        let copy_w = src.width.min(self.width.saturating_sub(x)) as usize;
        let copy_h = src.height.min(self.height.saturating_sub(y)) as usize;
        let (x, y) = (x as usize, y as usize);
        let (src_w, dst_w) = (src.width as usize, self.width as usize);
        for row in 0..copy_h {
            let s = row * src_w;
            let d = (y + row) * dst_w + x;
            self.y[d..d + copy_w].copy_from_slice(&src.y[s..s + copy_w]);
        }

        let (src_cw, src_ch) = chroma_size(src.width, src.height);
        let (dst_cw, dst_ch) = chroma_size(self.width, self.height);
        let (src_cw, src_ch) = (src_cw as usize, src_ch as usize);
        let (dst_cw, dst_ch) = (dst_cw as usize, dst_ch as usize);
        let (cx, cy) = (x / 2, y / 2);
        let copy_cw = src_cw.min(dst_cw.saturating_sub(cx));
        let copy_ch = src_ch.min(dst_ch.saturating_sub(cy));
        for row in 0..copy_ch {
            let s = row * src_cw * 2;
            let d = (cy + row) * dst_cw * 2 + cx * 2;
            let n = copy_cw * 2;
            self.uv[d..d + n].copy_from_slice(&src.uv[s..s + n]);
        }
    }

    /// Convert to RGB using BT.601 limited-range coefficients
    pub fn to_rgb_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let [luma, u, v] = self.sample(x, y);
            let c = 1.164 * (luma as f32 - 16.0);
            let d = u as f32 - 128.0;
            let e = v as f32 - 128.0;
            let r = c + 1.596 * e;
            let g = c - 0.392 * d - 0.813 * e;
            let b = c + 2.017 * d;
            Rgb([clamp_u8(r), clamp_u8(g), clamp_u8(b)])
        })
    }
}

fn chroma_size(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(2), height.div_ceil(2))
}

fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[derive(Debug)]
enum FrameData {
    Nv12(Nv12Planes),
    Surface(SurfaceId),
}

/// Handle to one video frame.
///
/// Cloning is cheap: the pixel payload is shared, only the timestamp is
/// per-handle. The timestamp is in the time base of whatever link carries
/// the frame and is `None` when unset.
#[derive(Clone, Debug)]
pub struct Frame {
    pts: Option<i64>,
    geometry: StreamGeometry,
    data: Arc<FrameData>,
}

impl Frame {
    /// Software frame backed by NV12 planes
    pub fn from_planes(planes: Nv12Planes, pts: Option<i64>) -> Self {
        Self {
            pts,
            geometry: StreamGeometry::nv12(planes.width, planes.height),
            data: Arc::new(FrameData::Nv12(planes)),
        }
    }

    /// Software NV12 frame filled with one colour
    pub fn new_filled(width: u32, height: u32, yuv: [u8; 3], pts: Option<i64>) -> Self {
        Self::from_planes(Nv12Planes::filled(width, height, yuv), pts)
    }

    /// Frame referring to an accelerator surface
    pub fn from_surface(geometry: StreamGeometry, surface: SurfaceId, pts: Option<i64>) -> Self {
        Self {
            pts,
            geometry,
            data: Arc::new(FrameData::Surface(surface)),
        }
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }

    pub fn with_pts(mut self, pts: Option<i64>) -> Self {
        self.pts = pts;
        self
    }

    pub fn geometry(&self) -> &StreamGeometry {
        &self.geometry
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    /// NV12 planes of a software frame
    pub fn planes(&self) -> Option<&Nv12Planes> {
        match self.data.as_ref() {
            FrameData::Nv12(planes) => Some(planes),
            FrameData::Surface(_) => None,
        }
    }

    /// Surface handle of a hardware frame
    pub fn surface(&self) -> Option<SurfaceId> {
        match self.data.as_ref() {
            FrameData::Surface(id) => Some(*id),
            FrameData::Nv12(_) => None,
        }
    }

    /// Whether two handles share the same pixel payload
    pub fn shares_payload(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// RGB rendition of a software frame
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        self.planes().map(Nv12Planes::to_rgb_image)
    }

    /// Save a software frame as a PNG file.
    ///
    /// Hardware frames have nothing to download and are reported as an
    /// invalid argument.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let rgb = self.to_rgb_image().ok_or_else(|| {
            crate::error::StackError::invalid_argument("cannot save a hardware surface as PNG")
        })?;
        rgb.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_planes_have_nv12_sizes() {
        let planes = Nv12Planes::filled(5, 3, [16, 128, 128]);
        assert_eq!(planes.y_plane().len(), 15);
        // 3x2 chroma samples, two bytes each
        assert_eq!(planes.uv_plane().len(), 12);
    }

    #[test]
    fn test_blit_places_luma_and_chroma() {
        let mut canvas = Nv12Planes::filled(8, 4, [0, 0, 0]);
        let tile = Nv12Planes::filled(4, 4, [200, 90, 160]);
        canvas.blit(&tile, 4, 0);

        assert_eq!(canvas.sample(3, 0), [0, 0, 0]);
        assert_eq!(canvas.sample(4, 0), [200, 90, 160]);
        assert_eq!(canvas.sample(7, 3), [200, 90, 160]);
    }

    #[test]
    fn test_blit_clips_to_destination() {
        let mut canvas = Nv12Planes::filled(4, 4, [0, 0, 0]);
        let tile = Nv12Planes::filled(4, 4, [50, 60, 70]);
        canvas.blit(&tile, 2, 2);
        assert_eq!(canvas.sample(3, 3), [50, 60, 70]);
        assert_eq!(canvas.sample(1, 1), [0, 0, 0]);
    }

    #[test]
    fn test_clone_shares_payload_but_not_pts() {
        let frame = Frame::new_filled(4, 4, [16, 128, 128], Some(3));
        let mut copy = frame.clone();
        copy.set_pts(None);

        assert!(frame.shares_payload(&copy));
        assert_eq!(frame.pts(), Some(3));
        assert_eq!(copy.pts(), None);
    }

    #[test]
    fn test_grey_converts_to_grey() {
        let frame = Frame::new_filled(2, 2, [126, 128, 128], None);
        let rgb = frame.to_rgb_image().unwrap();
        let px = rgb.get_pixel(1, 1);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }

    #[test]
    fn test_hardware_frame_has_no_planes() {
        let geometry = StreamGeometry::hardware(64, 32, DeviceId(0));
        let frame = Frame::from_surface(geometry, SurfaceId(7), Some(0));
        assert!(frame.planes().is_none());
        assert_eq!(frame.surface(), Some(SurfaceId(7)));
        assert!(frame.save_png("unused.png").is_err());
    }
}
