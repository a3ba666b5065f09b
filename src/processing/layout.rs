use crate::media::CanvasSize;

/// Largest size with the source's aspect ratio that fits inside `canvas`,
/// never scaling up by more than `max_upscale`.
pub fn contain_size(canvas: CanvasSize, source: CanvasSize, max_upscale: f32) -> CanvasSize {
    let iw = source.width.max(1) as f32;
    let ih = source.height.max(1) as f32;
    let cw = canvas.width.max(1) as f32;
    let ch = canvas.height.max(1) as f32;
    let scale = (cw / iw).min(ch / ih).min(max_upscale.max(1.0));
    let scale = if scale.is_finite() { scale } else { 1.0 };
    let w = (iw * scale).round().clamp(1.0, cw);
    let h = (ih * scale).round().clamp(1.0, ch);
    CanvasSize::new(w as u32, h as u32)
}

/// Region of the source, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn full(source: CanvasSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: source.width,
            height: source.height,
        }
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }
}

/// Largest centred region of `source` with the aspect ratio of `canvas`.
///
/// Scaling this region to `canvas` covers it completely; the region never
/// exceeds the source, so the work stays bounded by the source size.
pub fn fill_crop(canvas: CanvasSize, source: CanvasSize) -> CropRect {
    let sw = source.width.max(1);
    let sh = source.height.max(1);
    let canvas_aspect = f64::from(canvas.width.max(1)) / f64::from(canvas.height.max(1));
    let source_aspect = f64::from(sw) / f64::from(sh);

    let (width, height) = if source_aspect > canvas_aspect {
        let w = (f64::from(sh) * canvas_aspect).round().clamp(1.0, f64::from(sw));
        (w as u32, sh)
    } else {
        let h = (f64::from(sw) / canvas_aspect).round().clamp(1.0, f64::from(sh));
        (sw, h as u32)
    };
    CropRect {
        x: (sw - width) / 2,
        y: (sh - height) / 2,
        width,
        height,
    }
}

/// Top-left offset that centers `inner` within `outer`.
pub fn center_offset(inner: CanvasSize, outer: CanvasSize) -> (u32, u32) {
    let ox = outer.width.saturating_sub(inner.width) / 2;
    let oy = outer.height.saturating_sub(inner.height) / 2;
    (ox, oy)
}
