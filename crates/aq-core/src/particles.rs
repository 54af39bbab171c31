//! Particulate and environmental reading types plus the PM sensor frame codec.

/// I2C address of the PMSA003I-class particulate sensor.
pub const PM_SENSOR_I2C_ADDR: u8 = 0x12;
/// Size of one sensor frame in bytes.
pub const FRAME_LEN: usize = 32;
/// Number of numeric fields in one reading.
pub const FIELD_COUNT: usize = 12;

const FRAME_HEADER: [u8; 2] = [0x42, 0x4D];
const FRAME_DATA_OFFSET: usize = 4;
const CHECKSUM_OFFSET: usize = FRAME_LEN - 2;

/// One named field of a particulate reading.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ParticleField {
    Pm10Standard,
    Pm25Standard,
    Pm100Standard,
    Pm10Env,
    Pm25Env,
    Pm100Env,
    Particles03um,
    Particles05um,
    Particles10um,
    Particles25um,
    Particles50um,
    Particles100um,
}

impl ParticleField {
    /// All fields in frame order.
    pub const ALL: [Self; FIELD_COUNT] = [
        Self::Pm10Standard,
        Self::Pm25Standard,
        Self::Pm100Standard,
        Self::Pm10Env,
        Self::Pm25Env,
        Self::Pm100Env,
        Self::Particles03um,
        Self::Particles05um,
        Self::Particles10um,
        Self::Particles25um,
        Self::Particles50um,
        Self::Particles100um,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Field name, also used as the feed key suffix.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pm10Standard => "pm10-standard",
            Self::Pm25Standard => "pm25-standard",
            Self::Pm100Standard => "pm100-standard",
            Self::Pm10Env => "pm10-env",
            Self::Pm25Env => "pm25-env",
            Self::Pm100Env => "pm100-env",
            Self::Particles03um => "particles-03um",
            Self::Particles05um => "particles-05um",
            Self::Particles10um => "particles-10um",
            Self::Particles25um => "particles-25um",
            Self::Particles50um => "particles-50um",
            Self::Particles100um => "particles-100um",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

/// One raw particulate reading. Every reading carries the full field set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ParticleReading {
    values: [u16; FIELD_COUNT],
}

impl ParticleReading {
    pub const fn new(values: [u16; FIELD_COUNT]) -> Self {
        Self { values }
    }

    /// Reading with every field set to `value`.
    pub const fn uniform(value: u16) -> Self {
        Self {
            values: [value; FIELD_COUNT],
        }
    }

    pub const fn get(&self, field: ParticleField) -> u16 {
        self.values[field.index()]
    }

    pub fn set(&mut self, field: ParticleField, value: u16) {
        self.values[field.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticleField, u16)> + '_ {
        ParticleField::ALL
            .into_iter()
            .map(|field| (field, self.values[field.index()]))
    }
}

/// Temperature and humidity from the environmental sensor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvironmentReading {
    pub temperature_c: f32,
    pub relative_humidity: f32,
}

/// Frame decoding failures. All of them are transient.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameError {
    TooShort,
    BadHeader,
    Checksum { expected: u16, computed: u16 },
}

/// Decodes one 32-byte sensor frame.
pub fn parse_frame(buffer: &[u8]) -> Result<ParticleReading, FrameError> {
    if buffer.len() < FRAME_LEN {
        return Err(FrameError::TooShort);
    }
    if buffer[0..2] != FRAME_HEADER {
        return Err(FrameError::BadHeader);
    }

    let expected = u16::from_be_bytes([buffer[CHECKSUM_OFFSET], buffer[CHECKSUM_OFFSET + 1]]);
    let computed = buffer[..CHECKSUM_OFFSET]
        .iter()
        .fold(0u16, |sum, b| sum.wrapping_add(*b as u16));
    if expected != computed {
        return Err(FrameError::Checksum { expected, computed });
    }

    let mut values = [0u16; FIELD_COUNT];
    for (i, value) in values.iter_mut().enumerate() {
        let at = FRAME_DATA_OFFSET + i * 2;
        *value = u16::from_be_bytes([buffer[at], buffer[at + 1]]);
    }
    Ok(ParticleReading::new(values))
}

#[cfg(test)]
pub(crate) fn encode_frame(reading: &ParticleReading) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0..2].copy_from_slice(&FRAME_HEADER);
    frame[2..4].copy_from_slice(&28u16.to_be_bytes());
    for (field, value) in reading.iter() {
        let at = FRAME_DATA_OFFSET + field.index() * 2;
        frame[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }
    let checksum = frame[..CHECKSUM_OFFSET]
        .iter()
        .fold(0u16, |sum, b| sum.wrapping_add(*b as u16));
    frame[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_be_bytes());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_resolve_both_ways() {
        for field in ParticleField::ALL {
            assert_eq!(ParticleField::from_name(field.name()), Some(field));
        }
        assert_eq!(ParticleField::from_name("pm2.5"), None);
    }

    #[test]
    fn frame_fields_are_big_endian_in_order() {
        let mut reading = ParticleReading::default();
        reading.set(ParticleField::Pm25Env, 0x0102);
        reading.set(ParticleField::Particles03um, 1_234);

        let frame = encode_frame(&reading);
        assert_eq!(frame[16], 0x04);
        assert_eq!(frame[17], 0xD2);

        let decoded = parse_frame(&frame).unwrap();
        assert_eq!(decoded.get(ParticleField::Pm25Env), 0x0102);
        assert_eq!(decoded.get(ParticleField::Particles03um), 1_234);
        assert_eq!(decoded.get(ParticleField::Pm10Standard), 0);
    }

    #[test]
    fn corrupted_frames_are_rejected() {
        let mut frame = encode_frame(&ParticleReading::uniform(7));
        assert_eq!(parse_frame(&frame[..31]), Err(FrameError::TooShort));

        frame[5] ^= 0x01;
        assert!(matches!(
            parse_frame(&frame),
            Err(FrameError::Checksum { .. })
        ));

        frame[0] = 0x00;
        assert_eq!(parse_frame(&frame), Err(FrameError::BadHeader));
    }
}
