//! Public enumerations and the decoded message shape handed back to callers.

use crate::grid::Grid;

/// Reference time carried by section 1, decoded as big-endian year/month/.../second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Datetime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Product discipline (section 0, octet 7). Unknown codes are preserved
/// rather than rejected, per the decoder spec's enumeration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Meteorological,
    Hydrologic,
    LandSurface,
    Space,
    Oceanographic,
    Unknown(u8),
}

impl Discipline {
    /// The numeric code this variant was parsed from (or would compose
    /// with), used to build `Category = 1000*discipline + local`.
    pub fn raw_value(&self) -> i32 {
        match *self {
            Discipline::Meteorological => 0,
            Discipline::Hydrologic => 1,
            Discipline::LandSurface => 2,
            Discipline::Space => 3,
            Discipline::Oceanographic => 10,
            Discipline::Unknown(v) => v as i32,
        }
    }
}

impl From<u8> for Discipline {
    fn from(v: u8) -> Self {
        match v {
            0 => Discipline::Meteorological,
            1 => Discipline::Hydrologic,
            2 => Discipline::LandSurface,
            3 => Discipline::Space,
            10 => Discipline::Oceanographic,
            other => Discipline::Unknown(other),
        }
    }
}

/// Parameter category: `1000 * discipline + local category byte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Temperature,
    Moisture,
    Momentum,
    Mass,
    ShortWaveRadiation,
    LongWaveRadiation,
    Cloud,
    ThermodynamicStabilityIndices,
    Aerosols,
    TraceGases,
    Radar,
    Nuclear,
    PhysicalAtmospheric,
    AsciiString,
    HydrologyBasicProducts,
    HydrologyProbabilities,
    Vegetation,
    SoilProducts,
    ImageFormat,
    Quantitative,
    Waves,
    Currents,
    Ice,
    SurfaceProperties,
    SubSurfaceProperties,
    Unknown(i32),
}

impl Category {
    pub fn raw_value(&self) -> i32 {
        use Category::*;
        match *self {
            Temperature => 0,
            Moisture => 1,
            Momentum => 2,
            Mass => 3,
            ShortWaveRadiation => 4,
            LongWaveRadiation => 5,
            Cloud => 6,
            ThermodynamicStabilityIndices => 7,
            Aerosols => 13,
            TraceGases => 14,
            Radar => 15,
            Nuclear => 18,
            PhysicalAtmospheric => 19,
            AsciiString => 253,
            HydrologyBasicProducts => 1000,
            HydrologyProbabilities => 1001,
            Vegetation => 2000,
            SoilProducts => 2003,
            ImageFormat => 3000,
            Quantitative => 3001,
            Waves => 10000,
            Currents => 10001,
            Ice => 10002,
            SurfaceProperties => 10003,
            SubSurfaceProperties => 10004,
            Unknown(v) => v,
        }
    }
}

impl From<i32> for Category {
    fn from(v: i32) -> Self {
        use Category::*;
        match v {
            0 => Temperature,
            1 => Moisture,
            2 => Momentum,
            3 => Mass,
            4 => ShortWaveRadiation,
            5 => LongWaveRadiation,
            6 => Cloud,
            7 => ThermodynamicStabilityIndices,
            13 => Aerosols,
            14 => TraceGases,
            15 => Radar,
            18 => Nuclear,
            19 => PhysicalAtmospheric,
            253 => AsciiString,
            1000 => HydrologyBasicProducts,
            1001 => HydrologyProbabilities,
            2000 => Vegetation,
            2003 => SoilProducts,
            3000 => ImageFormat,
            3001 => Quantitative,
            10000 => Waves,
            10001 => Currents,
            10002 => Ice,
            10003 => SurfaceProperties,
            10004 => SubSurfaceProperties,
            other => Unknown(other),
        }
    }
}

/// Parameter: `1000 * category + local parameter byte`. Only the two
/// wind-component parameters the core decoder's consumers need are named;
/// everything else round-trips through `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    WindU,
    WindV,
    Unknown(i32),
}

impl Parameter {
    pub fn raw_value(&self) -> i32 {
        match *self {
            Parameter::WindU => 2002,
            Parameter::WindV => 2003,
            Parameter::Unknown(v) => v,
        }
    }
}

impl From<i32> for Parameter {
    fn from(v: i32) -> Self {
        match v {
            2002 => Parameter::WindU,
            2003 => Parameter::WindV,
            other => Parameter::Unknown(other),
        }
    }
}

/// One decoded GRIB2 message: a gridded field of one parameter, trimmed to
/// the decoder's spatial filter if one was set.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub datetime: Datetime,
    pub discipline: Discipline,
    pub category: Category,
    pub parameter: Parameter,
    pub grid: Grid,
    pub values: Vec<f64>,
}

impl Message {
    pub fn values_length(&self) -> usize {
        self.values.len()
    }
}
