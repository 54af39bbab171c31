//! Per-field arithmetic means over a sample batch.

use heapless::Vec;
use log::debug;

use crate::particles::{FIELD_COUNT, ParticleField, ParticleReading};

/// Averaged value for every field present in the batch. Empty for an empty
/// batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateResult {
    values: Vec<(ParticleField, f32), FIELD_COUNT>,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, field: ParticleField) -> Option<f32> {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticleField, f32)> + '_ {
        self.values.iter().copied()
    }
}

pub fn aggregate(batch: &[ParticleReading]) -> AggregateResult {
    let mut result = AggregateResult::default();
    if batch.is_empty() {
        return result;
    }

    let count = batch.len() as f32;
    for field in ParticleField::ALL {
        let sum: u32 = batch.iter().map(|reading| reading.get(field) as u32).sum();
        // One slot per field; cannot overflow.
        let _ = result.values.push((field, sum as f32 / count));
    }
    result
}

/// Dumps the averaged particle table at debug level.
pub fn log_particle_table(result: &AggregateResult) {
    let value = |field| result.get(field).unwrap_or(0.0);

    debug!("concentration units (standard)");
    debug!(
        "PM 1.0: {:.0}\tPM 2.5: {:.0}\tPM 10: {:.0}",
        value(ParticleField::Pm10Standard),
        value(ParticleField::Pm25Standard),
        value(ParticleField::Pm100Standard)
    );
    debug!("concentration units (environmental)");
    debug!(
        "PM 1.0: {:.0}\tPM 2.5: {:.0}\tPM 10: {:.0}",
        value(ParticleField::Pm10Env),
        value(ParticleField::Pm25Env),
        value(ParticleField::Pm100Env)
    );
    for (label, field) in [
        ("0.3", ParticleField::Particles03um),
        ("0.5", ParticleField::Particles05um),
        ("1.0", ParticleField::Particles10um),
        ("2.5", ParticleField::Particles25um),
        ("5.0", ParticleField::Particles50um),
        ("10 ", ParticleField::Particles100um),
    ] {
        debug!("particles > {}um / 0.1L air: {:.1}", label, value(field));
    }
}
