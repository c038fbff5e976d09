//! Procedural status glyphs.
//!
//! Shapes are described in a 24x24 view box and sampled at pixel centers,
//! one glyph family per icon theme.

use super::ImageBuffer;
use crate::db::ConnectivityState;
use crate::settings::IconTheme;

pub const ICON_SIZE: u32 = 128;

const VIEW_BOX: f32 = 24.0;

const GREEN: [u8; 3] = [0x10, 0xB9, 0x81];
const AMBER: [u8; 3] = [0xF5, 0x9E, 0x0B];
const RED: [u8; 3] = [0xEF, 0x44, 0x44];
const SLATE: [u8; 3] = [0x1F, 0x29, 0x37];

struct Canvas {
    size: u32,
    data: Vec<u8>,
}

impl Canvas {
    fn new(size: u32) -> Self {
        Self {
            size,
            data: vec![0; (size * size * 4) as usize],
        }
    }

    /// Paint every pixel whose center (in view box units) satisfies `inside`.
    fn fill(&mut self, rgb: [u8; 3], inside: impl Fn(f32, f32) -> bool) {
        let scale = VIEW_BOX / self.size as f32;
        for py in 0..self.size {
            for px in 0..self.size {
                let x = (px as f32 + 0.5) * scale;
                let y = (py as f32 + 0.5) * scale;
                if inside(x, y) {
                    let i = ((py * self.size + px) * 4) as usize;
                    self.data[i..i + 3].copy_from_slice(&rgb);
                    self.data[i + 3] = 0xFF;
                }
            }
        }
    }

    fn into_image(self) -> ImageBuffer {
        ImageBuffer {
            width: self.size,
            height: self.size,
            data: self.data,
        }
    }
}

fn disc(cx: f32, cy: f32, r: f32) -> impl Fn(f32, f32) -> bool {
    move |x, y| (x - cx).powi(2) + (y - cy).powi(2) <= r * r
}

fn ring(cx: f32, cy: f32, r: f32, width: f32) -> impl Fn(f32, f32) -> bool {
    move |x, y| (((x - cx).powi(2) + (y - cy).powi(2)).sqrt() - r).abs() <= width / 2.0
}

/// Stroke of the given width along the segment (x1,y1)-(x2,y2), round caps.
fn segment(x1: f32, y1: f32, x2: f32, y2: f32, width: f32) -> impl Fn(f32, f32) -> bool {
    move |x, y| {
        let (dx, dy) = (x2 - x1, y2 - y1);
        let len2 = dx * dx + dy * dy;
        let t = if len2 == 0.0 {
            0.0
        } else {
            (((x - x1) * dx + (y - y1) * dy) / len2).clamp(0.0, 1.0)
        };
        let (nx, ny) = (x1 + t * dx, y1 + t * dy);
        (x - nx).powi(2) + (y - ny).powi(2) <= (width / 2.0).powi(2)
    }
}

fn rounded_rect(x0: f32, y0: f32, x1: f32, y1: f32, r: f32) -> impl Fn(f32, f32) -> bool {
    move |x, y| {
        let cx = x.clamp(x0 + r, x1 - r);
        let cy = y.clamp(y0 + r, y1 - r);
        x >= x0 && x <= x1 && y >= y0 && y <= y1 && (x - cx).powi(2) + (y - cy).powi(2) <= r * r
    }
}

/// Upper arc of a wifi glyph centered on (12, 20).
fn wifi_arc(r: f32, width: f32) -> impl Fn(f32, f32) -> bool {
    let band = ring(12.0, 20.0, r, width);
    move |x, y| y < 20.0 && (x - 12.0).abs() <= (20.0 - y) * 1.4 && band(x, y)
}

fn house(x: f32, y: f32) -> bool {
    let roof = y >= 2.0 && y <= 9.0 && (x - 12.0).abs() <= (y - 2.0) * 9.0 / 7.0;
    let body = (3.0..=21.0).contains(&x) && (9.0..=21.0).contains(&y);
    roof || body
}

pub fn render_icon(theme: IconTheme, status: ConnectivityState) -> ImageBuffer {
    let color = match status {
        ConnectivityState::Online => GREEN,
        ConnectivityState::LanNoInternet => AMBER,
        ConnectivityState::Offline => RED,
    };

    let mut canvas = Canvas::new(ICON_SIZE);

    match theme {
        IconTheme::Standard => {
            canvas.fill(color, ring(12.0, 12.0, 10.0, 2.0));
            match status {
                ConnectivityState::Online => {
                    canvas.fill(color, segment(8.0, 12.0, 11.0, 15.0, 2.0));
                    canvas.fill(color, segment(11.0, 15.0, 16.5, 9.0, 2.0));
                }
                ConnectivityState::LanNoInternet => {
                    canvas.fill(color, segment(12.0, 7.0, 12.0, 13.0, 2.0));
                    canvas.fill(color, disc(12.0, 16.5, 1.2));
                }
                ConnectivityState::Offline => {
                    canvas.fill(color, segment(15.0, 9.0, 9.0, 15.0, 2.0));
                    canvas.fill(color, segment(9.0, 9.0, 15.0, 15.0, 2.0));
                }
            }
        }
        IconTheme::Flat => canvas.fill(color, disc(12.0, 12.0, 10.0)),
        IconTheme::House => canvas.fill(color, house),
        IconTheme::WifiLine | IconTheme::WifiSolid => {
            let stroke = if theme == IconTheme::WifiSolid { 3.0 } else { 2.0 };
            canvas.fill(color, wifi_arc(5.0, stroke));
            canvas.fill(color, wifi_arc(10.0, stroke));
            canvas.fill(color, wifi_arc(15.0, stroke));
            canvas.fill(color, disc(12.0, 20.0, 1.5));
            if status == ConnectivityState::Offline {
                canvas.fill(color, segment(2.0, 2.0, 22.0, 22.0, stroke));
            }
        }
        IconTheme::Traffic => {
            canvas.fill(SLATE, rounded_rect(2.0, 2.0, 22.0, 22.0, 6.0));
            canvas.fill(color, disc(12.0, 12.0, 6.0));
        }
        IconTheme::Minimal => match status {
            ConnectivityState::Online => canvas.fill(color, segment(2.0, 12.0, 22.0, 12.0, 4.0)),
            ConnectivityState::LanNoInternet => {
                let bar = segment(2.0, 12.0, 22.0, 12.0, 4.0);
                canvas.fill(color, move |x, y| ((x - 2.0) / 4.0).floor() as i32 % 2 == 0 && bar(x, y));
            }
            ConnectivityState::Offline => canvas.fill(color, disc(12.0, 12.0, 2.5)),
        },
    }

    canvas.into_image()
}
