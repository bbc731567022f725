//! Content-stream generation for stamped text and images.

use std::fmt::Write;

use lopdf::ObjectId;

use super::document::TextStyle;
use super::font::{self, FontHandle};

/// Line height as a multiple of font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Fill color for stamped text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::black()
    }
}

#[derive(Debug, Clone)]
enum DrawOp {
    Text {
        lines: Vec<Vec<u8>>,
        x: f32,
        y: f32,
        size: f32,
        line_height: f32,
        color: TextColor,
    },
    Image {
        name: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Drawing operations buffered for one page, in call order.
#[derive(Debug, Clone, Default)]
pub struct PageOverlay {
    ops: Vec<DrawOp>,
    font: Option<ObjectId>,
    images: Vec<(String, ObjectId)>,
}

impl PageOverlay {
    pub fn push_text(&mut self, font: &FontHandle, text: &str, style: &TextStyle) {
        self.font = Some(font.object_id);

        let lines = font::wrap_text(text, style.size, style.max_width)
            .iter()
            .map(|line| font::encode_win_ansi(line))
            .collect();

        self.ops.push(DrawOp::Text {
            lines,
            x: style.x,
            y: style.y,
            size: style.size,
            line_height: style.size * LINE_HEIGHT_FACTOR,
            color: style.color,
        });
    }

    pub fn push_image(
        &mut self,
        name: String,
        object_id: ObjectId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) {
        if !self.images.iter().any(|(existing, _)| *existing == name) {
            self.images.push((name.clone(), object_id));
        }
        self.ops.push(DrawOp::Image {
            name,
            x,
            y,
            width,
            height,
        });
    }

    /// Font object referenced by this overlay, if any text was drawn.
    pub const fn font(&self) -> Option<ObjectId> {
        self.font
    }

    /// `(resource name, object id)` of every image drawn.
    pub fn images(&self) -> &[(String, ObjectId)] {
        &self.images
    }

    /// Render all buffered operations into a self-contained content stream.
    ///
    /// The stream first closes the `q` opened ahead of the page's original
    /// content, then draws inside its own `q … Q` pair.
    pub fn content_stream(&self) -> String {
        let mut content = String::from("\nQ\nq\n");

        for op in &self.ops {
            match op {
                DrawOp::Image {
                    name,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let _ = writeln!(content, "q\n{width} 0 0 {height} {x} {y} cm\n/{name} Do\nQ");
                }
                DrawOp::Text {
                    lines,
                    x,
                    y,
                    size,
                    line_height,
                    color,
                } => {
                    let _ = writeln!(content, "{} {} {} rg", color.r, color.g, color.b);
                    #[allow(clippy::cast_precision_loss)]
                    for (i, line) in lines.iter().enumerate() {
                        let line_y = y - (i as f32 * line_height);
                        content.push_str("BT\n");
                        let _ = writeln!(content, "/{} {size} Tf", font::FONT_RESOURCE_NAME);
                        let _ = writeln!(content, "{x} {line_y} Td");
                        let _ = writeln!(content, "<{}> Tj", hex(line));
                        content.push_str("ET\n");
                    }
                }
            }
        }

        content.push_str("Q\n");
        content
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
        let _ = write!(acc, "{b:02X}");
        acc
    })
}
