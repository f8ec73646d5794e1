//! Annotated frame rendering.
//!
//! Draws PPE boxes, person boxes colored by verdict, a status panel per
//! person and a counter panel in the top-left corner. Captions need a
//! TTF/OTF font; without one the boxes and panels are still drawn.

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::compliance::{FrameReport, PersonReport, Verdict};
use crate::config::RenderSettings;
use crate::detect::{BBox, Category, Detection};

pub const SAFE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const PARTIAL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const UNSAFE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

const PPE_BOX_THICKNESS: i32 = 2;
const PERSON_BOX_THICKNESS: i32 = 4;
const STATUS_PANEL: (u32, u32) = (200, 90);
const STATUS_PANEL_GAP: i32 = 10;
const COUNTER_PANEL: (u32, u32) = (400, 80);
// Pixel coordinates are clamped to this magnitude before any offset math.
const PX_LIMIT: f32 = 1_048_576.0;

pub fn verdict_color(verdict: Verdict) -> Rgb<u8> {
    match verdict {
        Verdict::Safe => SAFE_COLOR,
        Verdict::Partial => PARTIAL_COLOR,
        Verdict::Unsafe => UNSAFE_COLOR,
    }
}

pub fn category_color(category: Category) -> Rgb<u8> {
    match category {
        Category::Helmet => Rgb([255, 255, 0]),
        Category::Vest => Rgb([255, 165, 0]),
        Category::Goggles => Rgb([255, 0, 255]),
        Category::EarProtection => Rgb([255, 100, 255]),
        Category::Person | Category::Other => Rgb([0, 255, 255]),
    }
}

pub struct OverlayRenderer {
    font: Option<FontVec>,
}

impl OverlayRenderer {
    /// Renderer that draws boxes and panels only.
    pub fn without_text() -> Self {
        Self { font: None }
    }

    pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|err| anyhow!("invalid font {}: {}", path.display(), err))?;
        Ok(Self { font: Some(font) })
    }

    pub fn from_settings(settings: &RenderSettings) -> Result<Self> {
        match &settings.font_path {
            Some(path) => Self::with_font_file(path),
            None => {
                log::warn!("no render font configured; overlay captions are disabled");
                Ok(Self::without_text())
            }
        }
    }

    pub fn has_text(&self) -> bool {
        self.font.is_some()
    }

    /// Draw the full overlay for one frame in place.
    pub fn draw(&self, image: &mut RgbImage, detections: &[Detection], report: &FrameReport) {
        for det in detections {
            let category = Category::from_label(&det.label);
            if category == Category::Person || !det.bbox.is_well_formed() {
                continue;
            }
            let color = category_color(category);
            draw_box(image, &det.bbox, color, PPE_BOX_THICKNESS);
            let name = match category {
                Category::Other => det.label.as_str(),
                known => known.display_name(),
            };
            let x = clamp_to_span(det.bbox.x1, image.width(), 0);
            let y = clamp_to_span(det.bbox.y1, image.height(), 0);
            self.caption(
                image,
                &format!("{} {:.2}", name, det.confidence),
                x,
                y.saturating_sub(18),
                14.0,
                color,
            );
        }

        for person in &report.people {
            self.draw_person(image, person);
        }

        self.draw_counters(image, report);
    }

    fn draw_person(&self, image: &mut RgbImage, person: &PersonReport) {
        let color = verdict_color(person.verdict);
        draw_box(image, &person.bbox, color, PERSON_BOX_THICKNESS);

        let (x, y) = status_panel_origin(&person.bbox);
        let (w, h) = STATUS_PANEL;
        draw_filled_rect_mut(image, Rect::at(x, y).of_size(w, h), BLACK);
        draw_rect_outline(image, x, y, w, h, color, 2);

        self.caption(
            image,
            &format!("Status: {}", person.verdict),
            x + 5,
            y + 6,
            16.0,
            WHITE,
        );
        let mut line_y = y + 28;
        for (category, present) in person.ppe.items() {
            let (mark, line_color) = if present {
                ("OK", SAFE_COLOR)
            } else {
                ("MISSING", UNSAFE_COLOR)
            };
            self.caption(
                image,
                &format!("{}: {}", category.display_name(), mark),
                x + 5,
                line_y,
                14.0,
                line_color,
            );
            line_y += 18;
        }
    }

    fn draw_counters(&self, image: &mut RgbImage, report: &FrameReport) {
        let (w, h) = COUNTER_PANEL;
        draw_filled_rect_mut(image, Rect::at(0, 0).of_size(w, h), BLACK);
        let counts = &report.counts;
        let lines = [
            format!("People: {}", counts.persons),
            format!("Helmets: {} | Goggles: {}", counts.helmets, counts.goggles),
            format!("Ear protection: {}", counts.ear_protection),
        ];
        for (row, line) in lines.iter().enumerate() {
            self.caption(image, line, 10, 8 + 25 * row as i32, 20.0, WHITE);
        }
    }

    fn caption(&self, image: &mut RgbImage, text: &str, x: i32, y: i32, size: f32, color: Rgb<u8>) {
        if let Some(font) = &self.font {
            draw_text_mut(image, color, x, y.max(0), PxScale::from(size), font, text);
        }
    }
}

/// Top-left corner of a person's status panel: above the box, or below it
/// when the panel would leave the top edge.
pub fn status_panel_origin(person: &BBox) -> (i32, i32) {
    let x = to_px(person.x1);
    let above = to_px(person.y1)
        .saturating_sub(STATUS_PANEL.1 as i32)
        .saturating_sub(STATUS_PANEL_GAP);
    if above < 0 {
        (x, to_px(person.y2).saturating_add(STATUS_PANEL_GAP))
    } else {
        (x, above)
    }
}

fn to_px(v: f32) -> i32 {
    v.round().clamp(-PX_LIMIT, PX_LIMIT) as i32
}

/// Round into `[-margin, limit + margin]`. Edges beyond the image stay
/// beyond it, so the visible part of the outline is unchanged.
fn clamp_to_span(v: f32, limit: u32, margin: i32) -> i32 {
    let lo = -(margin as f32);
    let hi = limit as f32 + margin as f32;
    v.round().clamp(lo, hi) as i32
}

fn draw_box(image: &mut RgbImage, bbox: &BBox, color: Rgb<u8>, thickness: i32) {
    let margin = thickness + 1;
    let x = clamp_to_span(bbox.x1, image.width(), margin);
    let y = clamp_to_span(bbox.y1, image.height(), margin);
    let x2 = clamp_to_span(bbox.x2, image.width(), margin);
    let y2 = clamp_to_span(bbox.y2, image.height(), margin);
    let w = (x2 - x).max(1) as u32;
    let h = (y2 - y).max(1) as u32;
    draw_rect_outline(image, x, y, w, h, color, thickness);
}

fn draw_rect_outline(
    image: &mut RgbImage,
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    color: Rgb<u8>,
    thickness: i32,
) {
    for inset in 0..thickness {
        let w = w as i32 - 2 * inset;
        let h = h as i32 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x + inset, y + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}
