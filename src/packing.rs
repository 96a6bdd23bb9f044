//! Data representation parsing (section 5) and the bit-packed sample
//! unpacker (section 7): simple packing (template 5.0) and complex packing
//! with optional spatial differencing (templates 5.2, 5.3).

use std::io::Cursor;

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::bitio::SectionBuf;
use crate::error::Grib2Error;
use crate::filter::{AcceptOracle, FilterSkip};
use crate::grid::Grid;

/// Parsed fields of data representation templates 5.0, 5.2 and 5.3. These
/// three templates share a common prefix; the struct holds the union of
/// all of their fields, with the complex/spatial-differencing-only ones
/// left at their default (0) for template 5.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Packing {
    pub tpl: u16,
    pub nb_values: u32,
    pub r: f32,
    pub e: i32,
    pub d: i32,
    pub sample_bits: u32,
    pub ng: u32,
    pub group_width_bits: u32,
    pub group_length_ref: u32,
    pub group_length_inc: u32,
    pub scaled_group_length_bits: u32,
    pub spatial_order: u8,
    pub extra_bytes: usize,
}

/// Parses section 5: `nbValues` is checked against the grid's pre-filter
/// point count, then the data representation template is dispatched.
pub(crate) fn read_data_representation(buf: &mut SectionBuf, original_ni: u32, original_nj: u32) -> Result<Packing, Grib2Error> {
    let nb_values = buf.len32()?;
    let ni_nj = original_ni as u64 * original_nj as u64;
    if nb_values as u64 != ni_nj {
        return Err(Grib2Error::PointCountMismatch { nb_values, ni_nj });
    }

    let tpl = buf.len16()?;
    match tpl {
        0 | 2 | 3 => read_template_0_2_3(buf, tpl, nb_values),
        other => Err(Grib2Error::UnsupportedDataTemplate(other)),
    }
}

fn read_template_0_2_3(buf: &mut SectionBuf, tpl: u16, nb_values: u32) -> Result<Packing, Grib2Error> {
    let r = buf.floating_point_number()?;
    let e = buf.mag_signed16()?;
    let d = buf.mag_signed16()?;
    let sample_bits = buf.byte()? as u32;
    let _value_type = buf.byte()?;

    let mut packing = Packing {
        tpl,
        nb_values,
        r,
        e,
        d,
        sample_bits,
        ng: 0,
        group_width_bits: 0,
        group_length_ref: 0,
        group_length_inc: 0,
        scaled_group_length_bits: 0,
        spatial_order: 0,
        extra_bytes: 0,
    };

    if buf.remaining() == 0 {
        return Ok(packing); // template 5.0
    }

    // templates 5.2 and 5.3
    buf.skip(1)?; // group splitting method
    let missing_value_management = buf.byte()?;
    if missing_value_management != 0 {
        return Err(Grib2Error::UnsupportedMissingValueManagement(missing_value_management));
    }
    buf.skip(8)?; // primary/secondary missing value substitutes

    packing.ng = buf.len32()?;
    buf.skip(1)?; // reference for group widths: parsed but never applied, as upstream
    packing.group_width_bits = buf.byte()? as u32;
    packing.group_length_ref = buf.len32()?;
    packing.group_length_inc = buf.byte()? as u32;
    buf.skip(4)?; // true length of last group: redundant with the decoded group lengths
    packing.scaled_group_length_bits = buf.byte()? as u32;

    if buf.remaining() == 0 {
        return Ok(packing); // template 5.2
    }

    // template 5.3
    let spatial_order = buf.byte()?;
    if spatial_order != 1 && spatial_order != 2 {
        return Err(Grib2Error::BadSpatialOrder(spatial_order));
    }
    packing.spatial_order = spatial_order;
    packing.extra_bytes = buf.byte()? as usize;

    Ok(packing)
}

fn scale_parameters(pack: &Packing) -> (f64, f64) {
    let dscale = 10f64.powi(-pack.d);
    let r#ref = pack.r as f64 * dscale;
    let scale = 2f64.powi(pack.e) * dscale;
    (r#ref, scale)
}

/// Unpacks section 7's payload (everything after the 5-byte section
/// header) into the filtered sample sequence, consulting `oracle` for
/// every one of the grid's `original_ni * original_nj` raw samples.
pub(crate) fn unpack_data(
    pack: &Packing,
    payload: &[u8],
    original_ni: u32,
    skip: &FilterSkip,
    filtered: &Grid,
) -> Result<Vec<f64>, Grib2Error> {
    let mut oracle = AcceptOracle::new(
        original_ni as u64,
        skip.i,
        skip.j,
        filtered.ni as u64,
        filtered.nj as u64,
    );
    let mut out = Vec::with_capacity((filtered.ni as usize) * (filtered.nj as usize));

    match pack.tpl {
        0 => unpack_simple(pack, payload, &mut oracle, &mut out)?,
        2 => {
            let mut bits = BitReader::endian(Cursor::new(payload), BigEndian);
            unpack_complex::<0>(&mut bits, pack, 0, 0, 0, &mut oracle, &mut out)?;
        }
        3 => {
            let mut buf = SectionBuf::new(payload);
            let h1 = buf.bytes(pack.extra_bytes)?;
            let h2 = if pack.spatial_order == 2 { buf.bytes(pack.extra_bytes)? } else { 0 };
            let hmin = buf.bytes(pack.extra_bytes)?;

            let mut bits = BitReader::endian(Cursor::new(buf.rest()), BigEndian);
            match pack.spatial_order {
                1 => unpack_complex::<1>(&mut bits, pack, h1, h2, hmin, &mut oracle, &mut out)?,
                2 => unpack_complex::<2>(&mut bits, pack, h1, h2, hmin, &mut oracle, &mut out)?,
                other => return Err(Grib2Error::BadSpatialOrder(other)),
            }
        }
        other => return Err(Grib2Error::UnsupportedDataTemplate(other)),
    }

    Ok(out)
}

fn unpack_simple(pack: &Packing, payload: &[u8], oracle: &mut AcceptOracle, out: &mut Vec<f64>) -> Result<(), Grib2Error> {
    let (r#ref, scale) = scale_parameters(pack);
    let mut bits = BitReader::endian(Cursor::new(payload), BigEndian);

    for _ in 0..pack.nb_values {
        let x: u32 = bits.read(pack.sample_bits).map_err(|_| Grib2Error::EndOfStream)?;
        let value = r#ref + scale * x as f64;
        if oracle.accept() {
            out.push(value);
        }
    }
    Ok(())
}

/// Reads `n` values of `width_bits[g]` each from `bits`, group by group,
/// realigning to a byte boundary afterward (steps 2-4 of the unpacker).
fn read_group_array<R: std::io::Read>(bits: &mut BitReader<R, BigEndian>, width_bits: u32, n: u32) -> Result<Vec<u32>, Grib2Error> {
    let mut values = Vec::with_capacity(n as usize);
    for _ in 0..n {
        values.push(bits.read(width_bits).map_err(|_| Grib2Error::EndOfStream)?);
    }
    bits.byte_align();
    Ok(values)
}

/// Unpacks template 5.2 (`ORDER == 0`) or 5.3 (`ORDER` 1 or 2) group-based
/// complex packing, monomorphized on the spatial differencing order so the
/// inner reconstruction loop has no runtime branch.
fn unpack_complex<const ORDER: u8>(
    bits: &mut BitReader<Cursor<&[u8]>, BigEndian>,
    pack: &Packing,
    h1: i64,
    h2: i64,
    hmin: i64,
    oracle: &mut AcceptOracle,
    out: &mut Vec<f64>,
) -> Result<(), Grib2Error> {
    let refs = read_group_array(bits, pack.sample_bits, pack.ng)?;
    let widths = read_group_array(bits, pack.group_width_bits, pack.ng)?;
    let lengths_raw = read_group_array(bits, pack.scaled_group_length_bits, pack.ng)?;
    let lengths: Vec<u64> = lengths_raw
        .iter()
        .map(|&v| v as u64 * pack.group_length_inc as u64 + pack.group_length_ref as u64)
        .collect();

    let (r#ref, scale) = scale_parameters(pack);

    if pack.ng == 0 {
        return Ok(());
    }

    let mut group_id = 0usize;
    let mut group_length = lengths[0];
    let mut nb_bits = widths[0];
    let mut sample_id = 0u64;
    let mut group_ref = refs[0] as i64;

    let mut advance_group = |group_id: &mut usize, sample_id: &mut u64, group_length: &mut u64, nb_bits: &mut u32, group_ref: &mut i64| -> bool {
        *sample_id += 1;
        if *sample_id == *group_length {
            *group_id += 1;
            if *group_id == pack.ng as usize {
                return false;
            }
            *sample_id = 0;
            *group_length = lengths[*group_id];
            *nb_bits = widths[*group_id];
            *group_ref = refs[*group_id] as i64;
        }
        true
    };

    let mut x_prev1 = h1;
    let mut x_prev2 = h2;

    for i in 0..ORDER {
        let _ = bits.read::<u32>(nb_bits).map_err(|_| Grib2Error::EndOfStream)?;
        let v = if i == 0 { h1 } else { h2 };
        if oracle.accept() {
            out.push(r#ref + scale * v as f64);
        }
        if !advance_group(&mut group_id, &mut sample_id, &mut group_length, &mut nb_bits, &mut group_ref) {
            return Ok(());
        }
    }

    loop {
        let raw: u32 = bits.read(nb_bits).map_err(|_| Grib2Error::EndOfStream)?;
        let mut x = raw as i64 + group_ref;

        if ORDER == 1 {
            x += hmin + x_prev1;
            x_prev1 = x;
        } else if ORDER == 2 {
            x += hmin - x_prev1 + 2 * x_prev2;
            x_prev1 = x_prev2;
            x_prev2 = x;
        }

        if oracle.accept() {
            out.push(r#ref + scale * x as f64);
        }

        if !advance_group(&mut group_id, &mut sample_id, &mut group_length, &mut nb_bits, &mut group_ref) {
            break;
        }
    }

    Ok(())
}
