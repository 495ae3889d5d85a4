//! Surface sampling.
//!
//! Evaluates Z at arbitrary world XY points by composing the rotated-grid
//! cell location from [geometry](crate::geometry) with the in-cell
//! [interpolation](crate::interpolation). Points outside the grid yield the
//! [UNDEF](crate::surface::UNDEF) sentinel rather than an error.

use crate::error::SurfaceQueryError;
use crate::geometry::{node_index, CellGrid, IndexFlag};
use crate::interpolation;
use crate::surface::{Surface, UNDEF};

/// Interpolation algorithm used when evaluating Z within a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Bilinear,
    NearestNeighbour,
}

/// Sample a surface at a single world point.
pub fn sample(surface: &Surface, x: f64, y: f64, algorithm: Algorithm) -> f32 {
    sample_on_grid(surface, &CellGrid::from_surface(surface), x, y, algorithm)
}

/// Sample a surface at each of the supplied world points.
///
/// The coordinate arrays must have equal lengths; mismatched inputs are
/// rejected rather than padded.
pub fn sample_many(
    surface: &Surface,
    xs: &[f64],
    ys: &[f64],
    algorithm: Algorithm,
) -> Result<Vec<f32>, SurfaceQueryError> {
    if xs.len() != ys.len() {
        return Err(SurfaceQueryError::MismatchedCoordinates {
            x_len: xs.len(),
            y_len: ys.len(),
        });
    }
    let grid = CellGrid::from_surface(surface);
    Ok(xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| sample_on_grid(surface, &grid, x, y, algorithm))
        .collect())
}

fn sample_on_grid(
    surface: &Surface,
    grid: &CellGrid,
    x: f64,
    y: f64,
    algorithm: Algorithm,
) -> f32 {
    let Some(cell) = grid.locate(x, y, IndexFlag::LowerLeftNode) else {
        return UNDEF;
    };

    let Some(lower_left) = node_index(cell.i, cell.j, grid.nx, grid.ny) else {
        return UNDEF;
    };
    let z_ll = surface.values[lower_left];
    // Corners beyond the top or right edge collapse onto the lower-left
    // node, turning the edge cell into a degenerate one.
    let corner = |i: usize, j: usize| {
        node_index(i, j, grid.nx, grid.ny)
            .map(|index| surface.values[index])
            .unwrap_or(z_ll)
    };
    let zv = [
        z_ll,
        corner(cell.i + 1, cell.j),
        corner(cell.i, cell.j + 1),
        corner(cell.i + 1, cell.j + 1),
    ];

    let yinc = grid.signed_yinc();
    let xv = [0.0, grid.xinc, 0.0, grid.xinc];
    let yv = [0.0, 0.0, yinc, yinc];

    match algorithm {
        Algorithm::Bilinear => interpolation::bilinear(cell.px, cell.py, &xv, &yv, &zv),
        Algorithm::NearestNeighbour => {
            interpolation::nearest_node(cell.px, cell.py, &xv, &yv, &zv)
        }
    }
}
