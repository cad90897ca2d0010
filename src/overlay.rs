// src/overlay.rs - Skeleton and label drawing onto captured frames
use std::convert::Infallible;

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoFont, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::tracking::{HandLandmarks, LandmarkPoint, HAND_CONNECTIONS};
use crate::video::Frame;

/// Drawing operations the frame pipeline needs.
pub trait OverlayRenderer {
    /// Draws the bones and joints of `hand` into `frame`.
    fn draw_skeleton(&mut self, frame: &mut Frame, hand: &HandLandmarks);

    fn draw_text(&mut self, frame: &mut Frame, text: &str, style: &LabelStyle);
}

/// Placement and look of the action label.
#[derive(Clone, Copy)]
pub struct LabelStyle {
    /// Left end of the text baseline.
    pub origin: Point,
    pub font: &'static MonoFont<'static>,
    pub color: Rgb888,
    /// Number of one-pixel horizontal passes.
    pub thickness: u32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            origin: Point::new(10, 50),
            font: &FONT_10X20,
            color: Rgb888::new(0, 255, 0),
            thickness: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SkeletonStyle {
    pub connection_color: Rgb888,
    pub connection_width: u32,
    pub joint_color: Rgb888,
    pub joint_radius: u32,
}

impl Default for SkeletonStyle {
    fn default() -> Self {
        Self {
            connection_color: Rgb888::new(224, 224, 224),
            connection_width: 2,
            joint_color: Rgb888::new(255, 0, 0),
            joint_radius: 2,
        }
    }
}

/// Draws straight into the frame's pixel buffer.
#[derive(Debug, Clone, Default)]
pub struct SkeletonRenderer {
    style: SkeletonStyle,
}

impl OverlayRenderer for SkeletonRenderer {
    fn draw_skeleton(&mut self, frame: &mut Frame, hand: &HandLandmarks) {
        let pixels = hand.to_pixel_hand(frame.width(), frame.height());
        let points = pixels.points().map(to_point);

        let bone = PrimitiveStyle::with_stroke(
            self.style.connection_color,
            self.style.connection_width,
        );
        for (a, b) in HAND_CONNECTIONS {
            paint(frame, &Line::new(points[a], points[b]).into_styled(bone));
        }

        let joint = PrimitiveStyle::with_fill(self.style.joint_color);
        let diameter = self.style.joint_radius * 2 + 1;
        for center in points {
            paint(frame, &Circle::with_center(center, diameter).into_styled(joint));
        }
    }

    fn draw_text(&mut self, frame: &mut Frame, text: &str, style: &LabelStyle) {
        let character_style = MonoTextStyle::new(style.font, style.color);
        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Left)
            .baseline(Baseline::Alphabetic)
            .build();

        for pass in 0..style.thickness.max(1) {
            let origin = style.origin + Point::new(pass as i32, 0);
            paint(
                frame,
                &Text::with_text_style(text, origin, character_style, text_style),
            );
        }
    }
}

fn to_point(p: LandmarkPoint) -> Point {
    Point::new(p.x, p.y)
}

fn paint<D>(frame: &mut Frame, drawable: &D)
where
    D: Drawable<Color = Rgb888>,
{
    match drawable.draw(&mut Canvas(frame)) {
        Ok(_) => {}
        Err(infallible) => match infallible {},
    }
}

struct Canvas<'a>(&'a mut Frame);

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Rgb888;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.0.dimensions();
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && (point.x as u32) < width
                && point.y >= 0
                && (point.y as u32) < height
            {
                self.0.put_pixel(
                    point.x as u32,
                    point.y as u32,
                    image::Rgb([color.r(), color.g(), color.b()]),
                );
            }
        }

        Ok(())
    }
}
