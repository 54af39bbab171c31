//! Display view models.

use core::fmt::Write as _;

use heapless::String;

use crate::{
    aggregate::{AggregateResult, aggregate},
    particles::{ParticleField, ParticleReading},
};

/// Background shade of the cold-boot placeholder, 0 = black, 255 = white.
pub const PLACEHOLDER_SHADE: u8 = 0x66;

pub type ValueText = String<8>;
pub type StatsLine = String<64>;

#[derive(Clone, Debug, PartialEq)]
pub enum Screen {
    /// Neutral background shown before the first readings exist.
    Placeholder { shade: u8 },
    Readings {
        pm10: ValueText,
        pm25: ValueText,
        pm100: ValueText,
        stats_line1: StatsLine,
        stats_line2: StatsLine,
        battery: ValueText,
    },
}

const STATS_LINE1: [(&str, ParticleField); 3] = [
    ("0.3um/0.1L", ParticleField::Particles03um),
    ("0.5um/0.1L", ParticleField::Particles05um),
    ("1.0um/0.1L", ParticleField::Particles10um),
];
const STATS_LINE2: [(&str, ParticleField); 3] = [
    ("2.5um/0.1L", ParticleField::Particles25um),
    ("5.0um/0.1L", ParticleField::Particles50um),
    ("10um/0.1L", ParticleField::Particles100um),
];

impl Screen {
    /// Builds the readings screen. `None` if a displayed field is missing.
    pub fn readings(result: &AggregateResult, battery_volts: f32) -> Option<Self> {
        Some(Self::Readings {
            pm10: whole(result.get(ParticleField::Pm10Standard)?)?,
            pm25: whole(result.get(ParticleField::Pm25Standard)?)?,
            pm100: whole(result.get(ParticleField::Pm100Standard)?)?,
            stats_line1: stats(result, &STATS_LINE1)?,
            stats_line2: stats(result, &STATS_LINE2)?,
            battery: volts(battery_volts)?,
        })
    }

    /// Fixed sample readings for checking the panel layout on the bench.
    pub fn layout_preview() -> Option<Self> {
        let mut reading = ParticleReading::uniform(4);
        reading.set(ParticleField::Pm10Standard, 300);
        reading.set(ParticleField::Pm25Standard, 14);
        reading.set(ParticleField::Pm100Standard, 4);
        reading.set(ParticleField::Particles03um, 500);
        Self::readings(&aggregate(&[reading]), 4.2)
    }
}

fn whole(value: f32) -> Option<ValueText> {
    let mut text = ValueText::new();
    write!(text, "{value:.0}").ok()?;
    Some(text)
}

fn volts(value: f32) -> Option<ValueText> {
    let mut text = ValueText::new();
    write!(text, "{value:.2}V").ok()?;
    Some(text)
}

fn stats(result: &AggregateResult, columns: &[(&str, ParticleField)]) -> Option<StatsLine> {
    let mut line = StatsLine::new();
    for (i, (label, field)) in columns.iter().enumerate() {
        if i > 0 {
            line.push_str(", ").ok()?;
        }
        write!(line, "{label}: {:.1}", result.get(*field)?).ok()?;
    }
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_screen_formats_each_value() {
        let mut reading = ParticleReading::uniform(3);
        reading.set(ParticleField::Pm25Standard, 12);
        reading.set(ParticleField::Particles03um, 1_234);
        let result = aggregate(&[reading]);

        let Some(Screen::Readings {
            pm10,
            pm25,
            stats_line1,
            stats_line2,
            battery,
            ..
        }) = Screen::readings(&result, 3.918)
        else {
            panic!("expected readings screen");
        };

        assert_eq!(pm10.as_str(), "3");
        assert_eq!(pm25.as_str(), "12");
        assert_eq!(
            stats_line1.as_str(),
            "0.3um/0.1L: 1234.0, 0.5um/0.1L: 3.0, 1.0um/0.1L: 3.0"
        );
        assert_eq!(
            stats_line2.as_str(),
            "2.5um/0.1L: 3.0, 5.0um/0.1L: 3.0, 10um/0.1L: 3.0"
        );
        assert_eq!(battery.as_str(), "3.92V");
    }

    #[test]
    fn empty_aggregate_has_no_readings_screen() {
        assert_eq!(Screen::readings(&aggregate(&[]), 4.0), None);
    }

    #[test]
    fn layout_preview_fills_every_slot() {
        let Some(Screen::Readings {
            pm10,
            pm25,
            pm100,
            stats_line1,
            battery,
            ..
        }) = Screen::layout_preview()
        else {
            panic!("expected readings screen");
        };

        assert_eq!(
            (pm10.as_str(), pm25.as_str(), pm100.as_str()),
            ("300", "14", "4")
        );
        assert!(stats_line1.starts_with("0.3um/0.1L: 500.0, "));
        assert_eq!(battery.as_str(), "4.20V");
    }
}
