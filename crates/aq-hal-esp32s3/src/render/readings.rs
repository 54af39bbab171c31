use aq_core::render::Screen;
use embedded_graphics::{
    mono_font::{
        MonoFont, MonoTextStyle,
        ascii::{FONT_5X8, FONT_6X10, FONT_10X20},
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use il0373::FrameBuffer;

use super::FrameRenderer;

const COLUMN_CENTERS: [i32; 3] = [53, 148, 243];
const COLUMN_LABELS: [&str; 3] = ["PM 1.0", "PM 2.5", "PM 10"];
const VALUE_Y: i32 = 35;
const LABEL_Y: i32 = 70;
const STATS_X: i32 = 12;
const STATS_Y: i32 = 96;
const STATS_LINE_HEIGHT: i32 = 11;
const BATTERY_X: i32 = 290;
const BATTERY_Y: i32 = 4;

/// Landscape layout: three concentration columns, two rows of particle
/// counts underneath and the battery voltage in the top-right corner.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadingsRenderer;

impl FrameRenderer for ReadingsRenderer {
    fn render(&mut self, screen: &Screen, frame: &mut FrameBuffer) {
        match screen {
            Screen::Placeholder { shade } => frame.fill_shade(*shade),
            Screen::Readings {
                pm10,
                pm25,
                pm100,
                stats_line1,
                stats_line2,
                battery,
            } => {
                frame.clear(false);

                for ((x, value), label) in COLUMN_CENTERS
                    .into_iter()
                    .zip([pm10, pm25, pm100])
                    .zip(COLUMN_LABELS)
                {
                    draw_centered(frame, value, &FONT_10X20, Point::new(x, VALUE_Y));
                    draw_centered(frame, label, &FONT_6X10, Point::new(x, LABEL_Y));
                }

                let style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
                for (row, line) in [stats_line1, stats_line2].into_iter().enumerate() {
                    let origin = Point::new(STATS_X, STATS_Y + row as i32 * STATS_LINE_HEIGHT);
                    let _ = Text::with_baseline(line, origin, style, Baseline::Top).draw(frame);
                }

                let right_top = TextStyleBuilder::new()
                    .alignment(Alignment::Right)
                    .baseline(Baseline::Top)
                    .build();
                let _ = Text::with_text_style(
                    battery,
                    Point::new(BATTERY_X, BATTERY_Y),
                    style,
                    right_top,
                )
                .draw(frame);
            }
        }
    }
}

fn draw_centered(frame: &mut FrameBuffer, text: &str, font: &MonoFont<'_>, at: Point) {
    let centered = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    let style = MonoTextStyle::new(font, BinaryColor::On);
    let _ = Text::with_text_style(text, at, style, centered).draw(frame);
}
