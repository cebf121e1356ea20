//! Software framebuffer render target.
//!
//! Draws into an in-memory RGBA buffer with nearest-neighbor scaling and
//! straight alpha blending. The effects hook routes draws into a second
//! offscreen buffer; `composite` blends that buffer back onto the frame at
//! half strength for a cheap ghosting look. Frames can be snapshotted to
//! PNG for eyeballing the output of a headless run.

use std::path::PathBuf;

use dae_core::geometry::Rect;
use dae_scene::{Pixmap, RenderTarget};

pub struct Framebuffer {
    width: u32,
    height: u32,
    frame: Vec<u8>,
    offscreen: Vec<u8>,
    drawing_offscreen: bool,
    frames_presented: u64,
    snapshot_at: Option<(u64, PathBuf)>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let bytes = width as usize * height as usize * 4;
        Self {
            width,
            height,
            frame: vec![0; bytes],
            offscreen: vec![0; bytes],
            drawing_offscreen: false,
            frames_presented: 0,
            snapshot_at: None,
        }
    }

    /// Writes one PNG of the frame buffer when the given frame number is
    /// presented.
    pub fn with_snapshot(mut self, frame: u64, path: PathBuf) -> Self {
        self.snapshot_at = Some((frame, path));
        self
    }

    fn blend_pixel(buffer: &mut [u8], offset: usize, rgba: [u8; 4]) {
        let alpha = rgba[3] as u32;
        if alpha == 0 {
            return;
        }
        let inverse = 255 - alpha;
        for channel in 0..3 {
            let src = rgba[channel] as u32;
            let dst = buffer[offset + channel] as u32;
            buffer[offset + channel] = ((src * alpha + dst * inverse) / 255) as u8;
        }
        buffer[offset + 3] = 255;
    }

    fn save_snapshot(&self, path: &PathBuf) {
        let result = image::save_buffer(
            path,
            &self.frame,
            self.width,
            self.height,
            image::ColorType::Rgba8,
        );
        match result {
            Ok(()) => log::info!("frame snapshot written to {}", path.display()),
            Err(err) => log::warn!("frame snapshot failed: {err}"),
        }
    }
}

impl RenderTarget for Framebuffer {
    fn acquire(&mut self) -> bool {
        true
    }

    fn clear(&mut self) {
        self.frame.fill(0);
        self.offscreen.fill(0);
    }

    fn route_offscreen(&mut self, enabled: bool) {
        self.drawing_offscreen = enabled;
    }

    fn composite(&mut self) {
        // Half-strength blend of the offscreen pass onto the frame.
        for i in (0..self.frame.len()).step_by(4) {
            let mut rgba = [
                self.offscreen[i],
                self.offscreen[i + 1],
                self.offscreen[i + 2],
                self.offscreen[i + 3],
            ];
            rgba[3] /= 2;
            Self::blend_pixel(&mut self.frame, i, rgba);
        }
    }

    fn draw_image(
        &mut self,
        pixmap: &Pixmap,
        x: f32,
        y: f32,
        centered: bool,
        scale: f32,
        src: Option<Rect>,
    ) {
        if scale <= 0.0 {
            return;
        }
        let src = src.unwrap_or_else(|| Rect::new(0, 0, pixmap.width as i32, pixmap.height as i32));
        let dst_w = (src.w as f32 * scale).round() as i32;
        let dst_h = (src.h as f32 * scale).round() as i32;
        if dst_w <= 0 || dst_h <= 0 {
            return;
        }
        let mut dst_x = x.round() as i32;
        let mut dst_y = y.round() as i32;
        if centered {
            dst_x -= dst_w / 2;
            dst_y -= dst_h / 2;
        }

        let (fb_w, fb_h) = (self.width as i32, self.height as i32);
        let row_stride = pixmap.width as usize * 4;
        let buffer = if self.drawing_offscreen {
            &mut self.offscreen
        } else {
            &mut self.frame
        };
        for out_y in 0..dst_h {
            let fy = dst_y + out_y;
            if fy < 0 || fy >= fb_h {
                continue;
            }
            let sample_y = src.y + (out_y as f32 / scale) as i32;
            if sample_y < 0 || sample_y >= pixmap.height as i32 {
                continue;
            }
            for out_x in 0..dst_w {
                let fx = dst_x + out_x;
                if fx < 0 || fx >= fb_w {
                    continue;
                }
                let sample_x = src.x + (out_x as f32 / scale) as i32;
                if sample_x < 0 || sample_x >= pixmap.width as i32 {
                    continue;
                }
                let src_off = sample_y as usize * row_stride + sample_x as usize * 4;
                let rgba = [
                    pixmap.pixels[src_off],
                    pixmap.pixels[src_off + 1],
                    pixmap.pixels[src_off + 2],
                    pixmap.pixels[src_off + 3],
                ];
                let dst_off = (fy as usize * fb_w as usize + fx as usize) * 4;
                Self::blend_pixel(buffer, dst_off, rgba);
            }
        }
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32) {
        // No font rasterizer here; mark the anchor so text elements are at
        // least visible in snapshots.
        let marker = Pixmap::solid(4, 4, [255, 255, 255, 255]);
        self.draw_image(&marker, x, y, false, 1.0, None);
        log::trace!("text at ({x:.0}, {y:.0}): {text}");
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        if let Some((frame, path)) = self.snapshot_at.take() {
            if self.frames_presented >= frame {
                self.save_snapshot(&path);
            } else {
                self.snapshot_at = Some((frame, path));
            }
        }
    }
}
