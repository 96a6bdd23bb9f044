//! Spatial filter: trims a grid to a user lat/lon window and drives an
//! incremental accept/skip oracle the unpacker consults per sample.

use crate::grid::Grid;

/// A lat/lon window to trim the grid to. A zero pair on an axis (both
/// bounds `0.0`) means that axis is unfiltered, matching the convention of
/// the original `G2DEC_SpatialFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpatialFilter {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl SpatialFilter {
    fn lon_set(&self) -> bool {
        self.lon_min != 0.0 || self.lon_max != 0.0
    }

    fn lat_set(&self) -> bool {
        self.lat_min != 0.0 || self.lat_max != 0.0
    }
}

/// Rows or columns to drop at one edge of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct AxisSkip {
    pub front: u64,
    pub back: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct FilterSkip {
    pub i: AxisSkip,
    pub j: AxisSkip,
}

/// Rewrites `grid`'s corner coordinates and `ni`/`nj` to the filtered
/// extent and returns the row/column skip counts the unpacker's accept
/// oracle needs. No-op (all-zero skip) when `filter` is `None`.
pub(crate) fn trim_grid(grid: &mut Grid, filter: Option<&SpatialFilter>) -> FilterSkip {
    let mut skip = FilterSkip::default();

    if let Some(f) = filter {
        if f.lon_set() {
            let inc = grid.lon_inc.abs();

            if grid.lon1 < f.lon_min {
                skip.i.front = ((f.lon_min - grid.lon1) / inc).ceil() as u64;
            } else if grid.lon1 > f.lon_max {
                skip.i.front = ((grid.lon1 - f.lon_max) / inc).ceil() as u64;
            }
            if skip.i.front > 0 {
                grid.lon1 += skip.i.front as f64 * grid.lon_inc;
            }

            if grid.lon2 < f.lon_min {
                skip.i.back = ((f.lon_min - grid.lon2) / inc).ceil() as u64;
            } else if grid.lon2 > f.lon_max {
                skip.i.back = ((grid.lon2 - f.lon_max) / inc).ceil() as u64;
            }
            if skip.i.back > 0 {
                grid.lon2 -= skip.i.back as f64 * grid.lon_inc;
            }
        }

        if f.lat_set() {
            let inc = grid.lat_inc.abs();

            if grid.lat1 < f.lat_min {
                skip.j.front = ((f.lat_min - grid.lat1) / inc).ceil() as u64;
            } else if grid.lat1 > f.lat_max {
                skip.j.front = ((grid.lat1 - f.lat_max) / inc).ceil() as u64;
            }
            if skip.j.front > 0 {
                grid.lat1 += skip.j.front as f64 * grid.lat_inc;
            }

            if grid.lat2 < f.lat_min {
                skip.j.back = ((f.lat_min - grid.lat2) / inc).ceil() as u64;
            } else if grid.lat2 > f.lat_max {
                skip.j.back = ((grid.lat2 - f.lat_max) / inc).ceil() as u64;
            }
            if skip.j.back > 0 {
                grid.lat2 -= skip.j.back as f64 * grid.lat_inc;
            }
        }
    }

    grid.ni -= (skip.i.front + skip.i.back) as u32;
    grid.nj -= (skip.j.front + skip.j.back) as u32;

    skip
}

/// Incremental accept/skip predicate over a row-major `original_ni *
/// original_nj` sample stream, yielding `true` exactly for samples inside
/// the filtered extent. Lets the unpacker traverse the whole stream once
/// without materializing an unfiltered copy.
pub(crate) struct AcceptOracle {
    skip: u64,
    nb: u64,
    skip_i: u64,
    nb_i: u64,
    skip_end: u64,
    nb_j: u64,
}

impl AcceptOracle {
    pub(crate) fn new(original_ni: u64, i: AxisSkip, j: AxisSkip, filtered_ni: u64, filtered_nj: u64) -> Self {
        AcceptOracle {
            skip: j.front * original_ni + i.front,
            nb: 0,
            skip_i: i.back + i.front,
            nb_i: filtered_ni,
            skip_end: i.back + j.back * original_ni,
            nb_j: filtered_nj,
        }
    }

    pub(crate) fn accept(&mut self) -> bool {
        if self.skip > 0 {
            self.skip -= 1;
            return false;
        }

        if self.nb == 0 {
            self.nb = self.nb_i;
            self.nb_j -= 1;
        }

        self.nb -= 1;
        if self.nb == 0 {
            self.skip = if self.nb_j == 0 { self.skip_end } else { self.skip_i };
        }
        true
    }
}
