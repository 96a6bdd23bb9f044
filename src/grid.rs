//! Grid-definition parsing (section 3): equidistant lat/lon grids, grid
//! templates 0-3.

use crate::bitio::SectionBuf;
use crate::error::Grib2Error;
use crate::filter::{trim_grid, FilterSkip, SpatialFilter};

/// Canonical descriptor of an equidistant lat/lon grid, after any spatial
/// filter has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub earth_radius: f64,
    pub ni: u32,
    pub nj: u32,
    pub lon1: f64,
    pub lon2: f64,
    pub lat1: f64,
    pub lat2: f64,
    pub lon_inc: f64,
    pub lat_inc: f64,
}

fn earth_radius(buf: &mut SectionBuf) -> Result<f64, Grib2Error> {
    let shape = buf.byte()?;
    let factor = buf.byte()?;
    let scaled = buf.len32()?;

    match shape {
        0 => Ok(6_367_470.0),
        6 => Ok(6_371_229.0),
        1 => Ok(scaled as f64 / factor as f64),
        other => Err(Grib2Error::UnsupportedEarthShape(other)),
    }
}

/// Parses grid definition templates 0-3 (the only ones this decoder
/// handles) and applies the spatial filter in place, as the original
/// decoder does immediately after parsing the grid.
fn read_grid_template_0_to_3(buf: &mut SectionBuf, filter: Option<&SpatialFilter>) -> Result<(Grid, FilterSkip, u32, u32), Grib2Error> {
    let radius = earth_radius(buf)?;

    // scale factor/scaled value of the major and minor axes: unused for
    // spherical earths, always present and always skipped.
    buf.skip(10)?;

    let ni = buf.len32()?;
    let nj = buf.len32()?;

    let basic_angle = buf.len32()?;
    let sub_angle_raw = buf.len32()?;

    let _basic_angle = if basic_angle == 0 { 1 } else { basic_angle };
    let sub_angle: f64 = if sub_angle_raw == u32::MAX { 1_000_000.0 } else { sub_angle_raw as f64 };

    let lat1 = buf.mag_signed32()? as f64 / sub_angle;
    let lon1 = buf.mag_signed32()? as f64 / sub_angle;

    // component flag: accepted unconditionally, scanning mode is what is
    // actually validated below.
    buf.skip(1)?;

    let lat2 = buf.mag_signed32()? as f64 / sub_angle;
    let lon2 = buf.mag_signed32()? as f64 / sub_angle;

    let mut inc_i = buf.mag_signed32()?.abs();
    let mut inc_j = buf.mag_signed32()?.abs();

    if lon2 < lon1 {
        inc_i = -inc_i;
    }
    if lat2 < lat1 {
        inc_j = -inc_j;
    }

    let lon_inc = inc_i as f64 / sub_angle;
    let lat_inc = inc_j as f64 / sub_angle;

    let scanning_mode = buf.byte()?;
    if scanning_mode & 0xfc != 0 {
        return Err(Grib2Error::BadScanMode(scanning_mode));
    }

    let mut grid = Grid {
        earth_radius: radius,
        ni,
        nj,
        lon1,
        lon2,
        lat1,
        lat2,
        lon_inc,
        lat_inc,
    };

    let (original_ni, original_nj) = (ni, nj);
    let skip = trim_grid(&mut grid, filter);

    Ok((grid, skip, original_ni, original_nj))
}

/// Parses section 3 in full: the grid-definition-template dispatch plus the
/// template 0-3 body. Returns the filtered grid, the filter's skip counts,
/// and the pre-filter `(ni, nj)` the data section's point count must match.
pub(crate) fn read_grid_definition(buf: &mut SectionBuf, filter: Option<&SpatialFilter>) -> Result<(Grid, FilterSkip, u32, u32), Grib2Error> {
    let source = buf.byte()?;
    if source != 0 {
        return Err(Grib2Error::UnsupportedGridSource(source));
    }

    // number of data points: already implied by ni*nj, checked against
    // section 5 instead.
    buf.skip(4)?;
    // octets for optional list of numbers
    buf.skip(1)?;
    // interpretation of number of points
    buf.skip(1)?;

    let template = buf.len16()?;
    match template {
        0..=3 => read_grid_template_0_to_3(buf, filter),
        other => Err(Grib2Error::UnsupportedGridTemplate(other)),
    }
}
