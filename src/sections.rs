//! The section state machine: reads one message's sections 1-8 off an
//! async byte stream and wires each section's payload into the grid,
//! product and data-representation parsers.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::bitio::{read_u32_be, SectionBuf};
use crate::error::Grib2Error;
use crate::filter::{FilterSkip, SpatialFilter};
use crate::grid::read_grid_definition;
use crate::message::{Category, Datetime, Discipline, Message, Parameter};
use crate::packing::{read_data_representation, unpack_data};

/// Reads one section's 4-byte length + 1-byte id header, or recognises the
/// literal `"7777"` end marker as a virtual section 8 of length 4.
///
/// `max_len` is the number of bytes left in the enclosing message; a
/// declared section length is clamped to it so a corrupt or malicious
/// length field can't carry a read past this message's true boundary.
async fn read_section_header<R: AsyncRead + Unpin>(reader: &mut R, max_len: u64) -> Result<(u8, u64), Grib2Error> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(|_| Grib2Error::EndOfStream)?;

    if &len_buf == b"7777" {
        return Ok((8, 0));
    }

    let declared = read_u32_be(&len_buf) as u64;
    let length = declared.min(max_len);
    if length < 5 {
        return Err(Grib2Error::SectionTooShort(length as i64));
    }

    let mut id_buf = [0u8; 1];
    reader.read_exact(&mut id_buf).await.map_err(|_| Grib2Error::EndOfStream)?;

    Ok((id_buf[0], length - 5))
}

fn read_identification(buf: &mut SectionBuf) -> Result<Datetime, Grib2Error> {
    buf.skip(4)?; // center + subcenter
    let master_version = buf.byte()?;
    if master_version != 2 {
        return Err(Grib2Error::UnsupportedTable(master_version));
    }
    buf.skip(1)?; // local tables version
    buf.skip(1)?; // significance of reference time

    let year = buf.len16()?;
    let month = buf.byte()?;
    let day = buf.byte()?;
    let hour = buf.byte()?;
    let minute = buf.byte()?;
    let second = buf.byte()?;

    buf.skip(1)?; // production status
    let type_of_processed_data = buf.byte()?;
    if type_of_processed_data != 1 {
        return Err(Grib2Error::NotForecast(type_of_processed_data));
    }

    Ok(Datetime { year, month, day, hour, minute, second })
}

fn read_product_definition(buf: &mut SectionBuf, discipline: Discipline) -> Result<(Category, Parameter), Grib2Error> {
    buf.skip(2)?; // number of coordinate values after template
    buf.skip(2)?; // product definition template number

    let category_byte = buf.byte()?;
    let parameter_byte = buf.byte()?;

    let category = Category::from(1000 * discipline.raw_value() + category_byte as i32);
    let parameter = Parameter::from(1000 * category.raw_value() + parameter_byte as i32);

    Ok((category, parameter))
}

/// Reads sections 1 through 8 of one message (the indicator, section 0,
/// has already been consumed by the driver to learn `discipline`) and
/// assembles the public [`Message`]. Sections repeat in the wire format
/// to support multi-field messages; this decoder accepts only the first
/// production block and stops at section 8.
pub(crate) async fn read_message_body<R: AsyncRead + Unpin>(
    reader: &mut R,
    discipline: Discipline,
    filter: Option<&SpatialFilter>,
    total_len: u64,
) -> Result<Message, Grib2Error> {
    let mut last_id = 0u8;
    let mut len_read = 16u64; // section 0, already consumed by the driver
    let mut seen_identification = false;
    let mut seen_product = false;

    let mut datetime = Datetime::default();
    let mut category = Category::Unknown(0);
    let mut parameter = Parameter::Unknown(0);
    let mut grid = None;
    let mut packing = None;
    let mut skip = FilterSkip::default();
    let mut original_ni = 0u32;
    let mut original_nj = 0u32;
    let mut values = Vec::new();

    loop {
        if len_read >= total_len {
            break;
        }

        let max_len = total_len - len_read;
        let (id, remain) = read_section_header(reader, max_len).await?;
        if id == 8 {
            len_read += 4;
            break;
        }
        len_read += 5 + remain;

        if id <= last_id {
            return Err(Grib2Error::BadSectionOrder { last: last_id, found: id });
        }
        if id == 3 && !seen_identification {
            return Err(Grib2Error::BadSectionOrder { last: last_id, found: id });
        }
        if id == 5 && !seen_product {
            return Err(Grib2Error::BadSectionOrder { last: last_id, found: id });
        }
        last_id = id;

        let mut raw = vec![0u8; remain as usize];
        reader.read_exact(&mut raw).await.map_err(|_| Grib2Error::EndOfStream)?;
        let mut buf = SectionBuf::new(&raw);

        match id {
            1 => {
                datetime = read_identification(&mut buf)?;
                seen_identification = true;
            }
            2 => {} // local use, skipped
            3 => {
                let (g, s, ni, nj) = read_grid_definition(&mut buf, filter)?;
                grid = Some(g);
                skip = s;
                original_ni = ni;
                original_nj = nj;
            }
            4 => {
                let (c, p) = read_product_definition(&mut buf, discipline)?;
                category = c;
                parameter = p;
                seen_product = true;
            }
            5 => {
                packing = Some(read_data_representation(&mut buf, original_ni, original_nj)?);
            }
            6 => {} // bitmap, skipped
            7 => {
                let pack = packing.ok_or(Grib2Error::BadSectionOrder { last: last_id, found: id })?;
                let g = grid.ok_or(Grib2Error::BadSectionOrder { last: last_id, found: id })?;
                values = unpack_data(&pack, buf.rest(), original_ni, &skip, &g)?;
            }
            other => return Err(Grib2Error::UnknownSectionId(other)),
        }
    }

    let grid = grid.ok_or(Grib2Error::BadSectionOrder { last: last_id, found: 8 })?;

    Ok(Message {
        datetime,
        discipline,
        category,
        parameter,
        grid,
        values,
    })
}
