use thiserror::Error;

/// Coarse outcome reported by [`crate::Decoder::next_message`], mirroring the
/// language-neutral `Status` surface of the original library (section 6 of
/// the GRIB2 decoder spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    End,
    ParseError,
    EndOfStreamError,
    NotImplemented,
}

#[derive(Error, Debug)]
/// List of errors the decoder can return while reading a GRIB2 message
pub enum Grib2Error {
    #[error("I/O error")]
    /// An IO error occurred while handling the underlying input
    Io(#[from] std::io::Error),

    #[error("unexpected end of stream")]
    /// The input ended before a section or message could be fully read
    EndOfStream,

    #[error("requested read of {requested} bytes exceeds {remaining} bytes left in the section")]
    /// A field read would run past the end of the current section
    SectionOverrun { requested: usize, remaining: usize },

    #[error("cannot read a {0}-byte extra descriptor")]
    /// `bytes(n)` was asked for a width other than 1, 2, 4 or 8
    BadExtraBytes(usize),

    #[error("not a GRIB message")]
    /// Section 0's magic did not read "GRIB"
    NotGrib,

    #[error("unsupported GRIB edition {0}, only edition 2 is handled")]
    UnsupportedEdition(u8),

    #[error("master table version {0} is not supported, only version 2 is handled")]
    UnsupportedTable(u8),

    #[error("type of processed data {0} is not forecast data")]
    NotForecast(u8),

    #[error("source of grid definition {0} is not supported, only 0 is handled")]
    UnsupportedGridSource(u8),

    #[error("grid definition template {0} is not supported")]
    UnsupportedGridTemplate(u16),

    #[error("shape of the earth {0} is not supported")]
    UnsupportedEarthShape(u8),

    #[error("scanning mode {0:#010b} is not supported, only raster order is handled")]
    BadScanMode(u8),

    #[error("data representation template {0} is not supported")]
    UnsupportedDataTemplate(u16),

    #[error("missing value management {0} is not supported")]
    UnsupportedMissingValueManagement(u8),

    #[error("order of spatial differencing must be 1 or 2, got {0}")]
    BadSpatialOrder(u8),

    #[error("point count mismatch: nbValues {nb_values} != ni*nj {ni_nj}")]
    PointCountMismatch { nb_values: u32, ni_nj: u64 },

    #[error("unknown section id {0}")]
    UnknownSectionId(u8),

    #[error("section {found} arrived out of order after section {last}")]
    BadSectionOrder { last: u8, found: u8 },

    #[error("section length {0} is smaller than the minimum of 4 bytes")]
    SectionTooShort(i64),
}

impl Grib2Error {
    /// Maps an error to the coarse [`Status`] the driver reports, per the
    /// error taxonomy in the decoder spec (section 7).
    pub fn status(&self) -> Status {
        use Grib2Error::*;
        match self {
            Io(_) | EndOfStream => Status::EndOfStreamError,

            UnsupportedTable(_)
            | NotForecast(_)
            | UnsupportedGridSource(_)
            | UnsupportedGridTemplate(_)
            | UnsupportedEarthShape(_)
            | UnsupportedDataTemplate(_)
            | UnsupportedMissingValueManagement(_) => Status::NotImplemented,

            SectionOverrun { .. }
            | BadExtraBytes(_)
            | NotGrib
            | UnsupportedEdition(_)
            | BadScanMode(_)
            | BadSpatialOrder(_)
            | PointCountMismatch { .. }
            | UnknownSectionId(_)
            | BadSectionOrder { .. }
            | SectionTooShort(_) => Status::ParseError,
        }
    }
}
