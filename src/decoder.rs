//! The decoder driver: owns the input source, tracks the offset of the
//! next message, and turns the section state machine's output into the
//! public message stream.

use std::io::SeekFrom;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, BufReader};

use crate::bitio::read_u64_be;
use crate::error::Grib2Error;
use crate::filter::SpatialFilter;
use crate::message::{Discipline, Message};
use crate::sections::read_message_body;

/// Outcome of one [`Decoder::next_message`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Message(Message),
    End,
}

fn parse_indicator(header: &[u8; 16]) -> (Result<Discipline, Grib2Error>, u64) {
    let total_len = read_u64_be(&header[8..16]);

    if &header[0..4] != b"GRIB" {
        return (Err(Grib2Error::NotGrib), 0);
    }

    let discipline = Discipline::from(header[6]);
    let edition = header[7];
    if edition != 2 {
        // mirrors readIndicatorSection: message.len is only ever assigned
        // after the edition check passes, so any indicator failure leaves it at 0
        return (Err(Grib2Error::UnsupportedEdition(edition)), 0);
    }

    (Ok(discipline), total_len)
}

/// Reads GRIB2 messages one at a time off an async, seekable input source.
/// Not safe for concurrent calls; a decoder instance is single-use.
pub struct Decoder<R> {
    reader: BufReader<R>,
    next_message_pos: u64,
    ended: bool,
    filter: Option<SpatialFilter>,
}

impl Decoder<File> {
    /// Opens a file as the decoder's input. Returns `None` if the file
    /// cannot be opened, matching the original API's null-on-open-failure
    /// contract.
    pub async fn open(path: impl AsRef<std::path::Path>) -> Option<Self> {
        let file = File::open(path).await.ok()?;
        Some(Self::from_reader(file))
    }
}

impl<R: AsyncRead + AsyncSeek + Unpin> Decoder<R> {
    /// Wraps an already-open async reader as the decoder's input.
    pub fn from_reader(reader: R) -> Self {
        Decoder {
            reader: BufReader::new(reader),
            next_message_pos: 0,
            ended: false,
            filter: None,
        }
    }

    /// Stores a lat/lon window; applied to every message decoded from
    /// this point on.
    pub fn set_spatial_filter(&mut self, filter: SpatialFilter) {
        self.filter = Some(filter);
    }

    /// Decodes the next message, or reports end of stream. A parse error
    /// on a well-formed-but-unsupported or malformed message is reported
    /// and, if the message's length was known, the decoder skips past it
    /// and remains usable for the next call.
    pub async fn next_message(&mut self) -> Result<DecodeOutcome, Grib2Error> {
        if self.ended {
            return Ok(DecodeOutcome::End);
        }

        self.reader.seek(SeekFrom::Start(self.next_message_pos)).await?;

        let mut probe = [0u8; 1];
        let n = self.reader.read(&mut probe).await?;
        if n == 0 {
            self.ended = true;
            return Ok(DecodeOutcome::End);
        }

        let mut header = [0u8; 16];
        header[0] = probe[0];
        if self.reader.read_exact(&mut header[1..]).await.is_err() {
            self.ended = true;
            return Err(Grib2Error::EndOfStream);
        }

        let (discipline_result, total_len) = parse_indicator(&header);
        let discipline = match discipline_result {
            Ok(d) => d,
            Err(e) => {
                log::warn!("malformed GRIB2 indicator at offset {}: {e}", self.next_message_pos);
                if total_len == 0 {
                    self.ended = true;
                } else {
                    self.next_message_pos += total_len;
                }
                return Err(e);
            }
        };

        match read_message_body(&mut self.reader, discipline, self.filter.as_ref(), total_len).await {
            Ok(message) => {
                self.next_message_pos += total_len;
                Ok(DecodeOutcome::Message(message))
            }
            Err(e) => {
                log::warn!("failed to decode GRIB2 message at offset {}: {e}", self.next_message_pos);
                match e {
                    Grib2Error::Io(_) | Grib2Error::EndOfStream => self.ended = true,
                    _ if total_len == 0 => self.ended = true,
                    _ => self.next_message_pos += total_len,
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn indicator(discipline: u8, edition: u8, total_len: u64) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"GRIB");
        b.extend_from_slice(&[0, 0]); // reserved
        b.push(discipline);
        b.push(edition);
        b.extend_from_slice(&total_len.to_be_bytes());
        b
    }

    fn section(id: u8, payload: &[u8]) -> Vec<u8> {
        let length = (payload.len() + 5) as u32;
        let mut b = Vec::new();
        b.extend_from_slice(&length.to_be_bytes());
        b.push(id);
        b.extend_from_slice(payload);
        b
    }

    fn identification_payload() -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&[0, 0, 0, 0]); // center + subcenter
        p.push(2); // master table version
        p.push(0); // local table version
        p.push(0); // significance of reference time
        p.extend_from_slice(&2024u16.to_be_bytes());
        p.extend_from_slice(&[1, 1, 0, 0, 0]); // month,day,hour,minute,second
        p.push(0); // production status
        p.push(1); // type of processed data: forecast
        p
    }

    fn grid_payload(ni: u32, nj: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.push(0); // grid definition source
        p.extend_from_slice(&0u32.to_be_bytes()); // number of data points
        p.push(0); // octets for optional list
        p.push(0); // interpretation
        p.extend_from_slice(&0u16.to_be_bytes()); // template 0
        p.push(6); // earth shape: sphere 6371229
        p.push(0);
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&[0; 10]);
        p.extend_from_slice(&ni.to_be_bytes());
        p.extend_from_slice(&nj.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&1_000_000u32.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes()); // lat1
        p.extend_from_slice(&0u32.to_be_bytes()); // lon1
        p.push(48);
        p.extend_from_slice(&0u32.to_be_bytes()); // lat2
        p.extend_from_slice(&1_000_000u32.to_be_bytes()); // lon2
        p.extend_from_slice(&1_000_000u32.to_be_bytes()); // inc i
        p.extend_from_slice(&1_000_000u32.to_be_bytes()); // inc j
        p.push(0); // scanning mode
        p
    }

    fn product_payload() -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&0u16.to_be_bytes());
        p.extend_from_slice(&0u16.to_be_bytes());
        p.push(2); // category
        p.push(2); // parameter local byte -> WindU
        p
    }

    fn data_representation_payload(nb_values: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&nb_values.to_be_bytes());
        p.extend_from_slice(&0u16.to_be_bytes()); // template 0
        p.extend_from_slice(&0f32.to_be_bytes()); // R
        p.extend_from_slice(&0i16.to_be_bytes()); // E
        p.extend_from_slice(&0i16.to_be_bytes()); // D
        p.push(8); // sample bits
        p.push(0); // value type
        p
    }

    fn simple_packing_message(ni: u32, nj: u32, samples: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&section(1, &identification_payload()));
        body.extend_from_slice(&section(3, &grid_payload(ni, nj)));
        body.extend_from_slice(&section(4, &product_payload()));
        body.extend_from_slice(&section(5, &data_representation_payload(ni * nj)));
        body.extend_from_slice(&section(7, samples));
        body.extend_from_slice(b"7777");

        let total_len = 16 + body.len() as u64;
        let mut msg = indicator(0, 2, total_len);
        msg.extend_from_slice(&body);
        msg
    }

    #[tokio::test]
    async fn empty_stream_returns_end() {
        let mut decoder = Decoder::from_reader(Cursor::new(Vec::new()));
        assert_eq!(decoder.next_message().await.unwrap(), DecodeOutcome::End);
    }

    #[tokio::test]
    async fn decodes_a_simple_packing_message() {
        let bytes = simple_packing_message(2, 2, &[0, 1, 2, 3]);
        let mut decoder = Decoder::from_reader(Cursor::new(bytes));

        let outcome = decoder.next_message().await.unwrap();
        match outcome {
            DecodeOutcome::Message(message) => {
                assert_eq!(message.values, vec![0.0, 1.0, 2.0, 3.0]);
                assert_eq!(message.values_length(), 4);
                assert_eq!(message.parameter, crate::message::Parameter::WindU);
            }
            DecodeOutcome::End => panic!("expected a message"),
        }

        assert_eq!(decoder.next_message().await.unwrap(), DecodeOutcome::End);
    }

    #[tokio::test]
    async fn unsupported_data_template_advances_to_next_message() {
        let _ = env_logger::try_init();

        let mut body = Vec::new();
        body.extend_from_slice(&section(1, &identification_payload()));
        body.extend_from_slice(&section(3, &grid_payload(2, 2)));
        body.extend_from_slice(&section(4, &product_payload()));

        let mut bad_drt = Vec::new();
        bad_drt.extend_from_slice(&4u32.to_be_bytes()); // nbValues
        bad_drt.extend_from_slice(&40u16.to_be_bytes()); // unsupported template
        body.extend_from_slice(&section(5, &bad_drt));
        body.extend_from_slice(b"7777");

        let total_len = 16 + body.len() as u64;
        let mut first = indicator(0, 2, total_len);
        first.extend_from_slice(&body);

        let second = simple_packing_message(2, 2, &[9, 9, 9, 9]);

        let mut bytes = first;
        bytes.extend_from_slice(&second);

        let mut decoder = Decoder::from_reader(Cursor::new(bytes));

        let err = decoder.next_message().await.unwrap_err();
        assert_eq!(err.status(), crate::error::Status::NotImplemented);

        let outcome = decoder.next_message().await.unwrap();
        assert!(matches!(outcome, DecodeOutcome::Message(_)));
    }

    #[tokio::test]
    async fn message_without_terminator_ends_via_length_budget() {
        let mut body = Vec::new();
        body.extend_from_slice(&section(1, &identification_payload()));
        body.extend_from_slice(&section(3, &grid_payload(2, 2)));
        body.extend_from_slice(&section(4, &product_payload()));
        body.extend_from_slice(&section(5, &data_representation_payload(4)));
        body.extend_from_slice(&section(7, &[0, 1, 2, 3]));
        // no "7777" terminator: the indicator's total length accounts for
        // exactly these bytes, so the section loop must stop on lenRead == len

        let total_len = 16 + body.len() as u64;
        let mut bytes = indicator(0, 2, total_len);
        bytes.extend_from_slice(&body);

        let mut decoder = Decoder::from_reader(Cursor::new(bytes));

        let outcome = decoder.next_message().await.unwrap();
        match outcome {
            DecodeOutcome::Message(message) => assert_eq!(message.values, vec![0.0, 1.0, 2.0, 3.0]),
            DecodeOutcome::End => panic!("expected a message"),
        }

        assert_eq!(decoder.next_message().await.unwrap(), DecodeOutcome::End);
    }

    #[tokio::test]
    async fn missing_identification_before_grid_is_rejected() {
        let _ = env_logger::try_init();

        let mut body = Vec::new();
        body.extend_from_slice(&section(3, &grid_payload(2, 2)));
        body.extend_from_slice(&section(4, &product_payload()));
        body.extend_from_slice(&section(5, &data_representation_payload(4)));
        body.extend_from_slice(&section(7, &[0, 1, 2, 3]));
        body.extend_from_slice(b"7777");

        let total_len = 16 + body.len() as u64;
        let mut bytes = indicator(0, 2, total_len);
        bytes.extend_from_slice(&body);

        let mut decoder = Decoder::from_reader(Cursor::new(bytes));

        let err = decoder.next_message().await.unwrap_err();
        assert_eq!(err.status(), crate::error::Status::ParseError);
        assert!(matches!(err, Grib2Error::BadSectionOrder { last: 0, found: 3 }));
    }

    #[tokio::test]
    async fn missing_product_definition_before_data_representation_is_rejected() {
        let _ = env_logger::try_init();

        let mut body = Vec::new();
        body.extend_from_slice(&section(1, &identification_payload()));
        body.extend_from_slice(&section(3, &grid_payload(2, 2)));
        body.extend_from_slice(&section(5, &data_representation_payload(4)));
        body.extend_from_slice(&section(7, &[0, 1, 2, 3]));
        body.extend_from_slice(b"7777");

        let total_len = 16 + body.len() as u64;
        let mut bytes = indicator(0, 2, total_len);
        bytes.extend_from_slice(&body);

        let mut decoder = Decoder::from_reader(Cursor::new(bytes));

        let err = decoder.next_message().await.unwrap_err();
        assert_eq!(err.status(), crate::error::Status::ParseError);
        assert!(matches!(err, Grib2Error::BadSectionOrder { last: 3, found: 5 }));
    }

    #[tokio::test]
    async fn truncated_mid_section_then_ends() {
        let _ = env_logger::try_init();

        let bytes = simple_packing_message(2, 2, &[0, 1, 2, 3]);
        let truncated = bytes[..bytes.len() - 6].to_vec();

        let mut decoder = Decoder::from_reader(Cursor::new(truncated));

        let err = decoder.next_message().await.unwrap_err();
        assert_eq!(err.status(), crate::error::Status::EndOfStreamError);

        assert_eq!(decoder.next_message().await.unwrap(), DecodeOutcome::End);
    }
}
