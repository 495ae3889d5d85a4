//! Rotated-grid geometry.
//!
//! Maps world XY coordinates onto cell indices of a regular grid whose local
//! x axis makes an angle `rot` with world x, optionally with a reversed
//! y axis. The mapping projects the shifted point onto the grid's corner
//! vectors, classifies it against the grid edges with a small numerical
//! slack, and derives the enclosing cell plus cell-local offsets.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::surface::Surface;

/// Numerical slack applied when classifying a point against the grid edges.
/// Points whose relative axis position falls within the slack outside `[0, 1]`
/// are pulled onto the edge rather than rejected.
const REL_TOL: f64 = 1e-5;

/// How a fractional grid position is turned into a cell index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexFlag {
    /// Round to the nearest node, treating nodes as cell centres.
    CellCentred,
    /// Truncate to the node at the cell's lower-left corner.
    LowerLeftNode,
}

/// The cell enclosing a mapped point.
///
/// `i` and `j` are 1-based node indices of the cell's lower-left corner.
/// `px` and `py` are the point's offsets from that corner in grid-local
/// units, ready for interpolation within the cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellAddress {
    pub i: usize,
    pub j: usize,
    pub px: f64,
    pub py: f64,
}

/// Geometry of a regular, optionally rotated grid.
#[derive(Clone, Copy, Debug)]
pub struct CellGrid {
    pub nx: usize,
    pub ny: usize,
    pub xori: f64,
    pub yori: f64,
    pub xinc: f64,
    pub yinc: f64,
    /// Rotation of the grid x axis in degrees, counter-clockwise from world x.
    pub rot_deg: f64,
    /// `1.0` for a normal y axis, `-1.0` for a reversed one.
    pub yflip: f64,
}

impl CellGrid {
    /// Grid geometry of a decoded surface. Surfaces from the Irap Binary
    /// format always carry a normal y axis.
    pub fn from_surface(surface: &Surface) -> CellGrid {
        CellGrid {
            nx: surface.nx as usize,
            ny: surface.ny as usize,
            xori: surface.xori as f64,
            yori: surface.yori as f64,
            xinc: surface.xinc as f64,
            yinc: surface.yinc as f64,
            rot_deg: surface.rot as f64,
            yflip: 1.0,
        }
    }

    /// Node spacing along the grid y axis with the flip applied.
    pub fn signed_yinc(&self) -> f64 {
        self.yinc * self.yflip
    }

    /// Locate the cell enclosing world point `(xin, yin)`.
    ///
    /// Returns `None` when the point falls outside the grid (beyond the
    /// numerical slack) or when the grid is degenerate along either axis.
    pub fn locate(&self, xin: f64, yin: f64, flag: IndexFlag) -> Option<CellAddress> {
        let angle = self.rot_deg.to_radians();
        let x = xin - self.xori;
        let y = yin - self.yori;

        let yinc = self.signed_yinc();
        let xlen = (self.nx - 1) as f64 * self.xinc;
        let ylen = (self.ny - 1) as f64 * yinc;

        // Corner vectors spanning the grid in world coordinates.
        let (x2, y2) = (xlen * angle.cos(), xlen * angle.sin());
        let (x3, y3) = (ylen * (angle + FRAC_PI_2).cos(), ylen * (angle + FRAC_PI_2).sin());

        let relx = project_relative(x, y, x2, y2)?;
        let rely = project_relative(x, y, x3, y3)?;

        let px = relx * self.xinc * (self.nx - 1) as f64;
        let py = rely * self.yinc * (self.ny - 1) as f64;

        let (i, j) = match flag {
            IndexFlag::CellCentred => (
                ((px + self.xinc / 2.0) / self.xinc).floor() as i64 + 1,
                ((py + self.yinc / 2.0) / self.yinc).floor() as i64 + 1,
            ),
            IndexFlag::LowerLeftNode => (
                (px / self.xinc).floor() as i64 + 1,
                (py / self.yinc).floor() as i64 + 1,
            ),
        };
        if i < 1 || j < 1 {
            return None;
        }
        let (i, j) = (i as usize, j as usize);

        Some(CellAddress {
            i,
            j,
            px: px - (i - 1) as f64 * self.xinc,
            py: py - (j - 1) as f64 * self.yinc,
        })
    }
}

/// Relative position of point `(px, py)` projected onto the segment from the
/// origin to `(vx, vy)`.
///
/// Returns `None` for a zero-length segment or when the projection falls
/// outside `[-REL_TOL, 1 + REL_TOL]`; otherwise the result is clamped to
/// `[REL_TOL, 1 - REL_TOL]` so that the derived cell index stays in range.
fn project_relative(px: f64, py: f64, vx: f64, vy: f64) -> Option<f64> {
    let (segment_length, _) = vector_length_azimuth(vx, vy);
    if segment_length == 0.0 {
        return None;
    }
    let u = (px * vx + py * vy) / (segment_length * segment_length);
    if !(-REL_TOL..=1.0 + REL_TOL).contains(&u) {
        return None;
    }
    Some(u.clamp(REL_TOL, 1.0 - REL_TOL))
}

/// Length and azimuth of a 2-D vector. The azimuth is the angle from the
/// positive x axis, counter-clockwise, normalised to `[0, 2π)`.
pub fn vector_length_azimuth(x: f64, y: f64) -> (f64, f64) {
    let length = x.hypot(y);
    let mut azimuth = y.atan2(x);
    if azimuth < 0.0 {
        azimuth += 2.0 * PI;
    }
    (length, azimuth)
}

/// Linearise the 1-based node `(i, j)` of an `(nx, ny)` grid in column-major
/// order: `index = (j - 1) * nx + i`, returned zero-based for direct data
/// array access. Out-of-range nodes yield `None`; the sampler substitutes the
/// lower-left neighbour's value for such corners instead of failing.
pub fn node_index(i: usize, j: usize, nx: usize, ny: usize) -> Option<usize> {
    if i < 1 || i > nx || j < 1 || j > ny {
        return None;
    }
    Some((j - 1) * nx + i - 1)
}
