//! A decoder for GRIB2 — the WMO binary format for gridded meteorological
//! data — producing a lazy sequence of decoded messages, each carrying a
//! regular latitude/longitude grid of floating-point values for one
//! meteorological parameter.
//!
//! The decoder handles grid templates 0-3 (equidistant lat/lon) and data
//! templates 5.0, 5.2 and 5.3 (simple packing, complex packing, and
//! complex packing with first- or second-order spatial differencing). A
//! caller may narrow every decoded message to a lat/lon window with
//! [`SpatialFilter`], trimming the grid and skipping samples during
//! unpacking rather than decoding the full field and cropping afterward.
//!
//! ```no_run
//! # async fn run() -> Result<(), grib2dec::Grib2Error> {
//! use grib2dec::{Decoder, DecodeOutcome};
//!
//! let mut decoder = Decoder::open("forecast.grib2").await.expect("file not found");
//! loop {
//!     match decoder.next_message().await? {
//!         DecodeOutcome::Message(message) => println!("{:?} x{}", message.parameter, message.values_length()),
//!         DecodeOutcome::End => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod bitio;
mod decoder;
mod error;
mod filter;
mod grid;
mod message;
mod packing;
mod sections;

pub use decoder::{DecodeOutcome, Decoder};
pub use error::{Grib2Error, Status};
pub use filter::SpatialFilter;
pub use grid::Grid;
pub use message::{Category, Datetime, Discipline, Message, Parameter};
