//! Cell-wise statistical aggregation across aligned surfaces.
//!
//! Each operator reduces the stack of realizations one cell at a time. The
//! cell range is partitioned into contiguous disjoint slices and every
//! partition runs as its own rayon task, so no synchronisation is needed on
//! the result buffers. Percentile operators are split from the rest and
//! computed together, sorting the contributor vector once per cell.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;

use crate::error::SurfaceQueryError;
use crate::surface::{is_undefined, Surface, UNDEF};

/// Target number of contiguous cell partitions dispatched per operator.
const MAX_PARTITIONS: usize = 100;

/// Values at or above this cap are ignored by the `max` operator as clearly
/// unphysical. Note the asymmetry: `min` applies no such cap, so a stack
/// whose every cell value lies above the cap still produces a `min` result
/// while `max` yields the undefined sentinel.
const MAX_SANITY_CAP: f32 = 1e6;

/// Seed for the `max` reduction, below any value the cap admits.
const MAX_SEED: f32 = -1e20;

/// A recognised aggregation operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Mean,
    Min,
    Max,
    Std,
    /// Percentile in the domain convention: `pNN` labels what mathematics
    /// calls the `100 - NN` percentile.
    Percentile(u8),
}

impl FromStr for Operator {
    type Err = SurfaceQueryError;

    fn from_str(s: &str) -> Result<Operator, SurfaceQueryError> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "mean" => Ok(Operator::Mean),
            "min" => Ok(Operator::Min),
            "max" => Ok(Operator::Max),
            "std" => Ok(Operator::Std),
            other => {
                let unknown = || SurfaceQueryError::UnknownOperator {
                    name: s.to_string(),
                };
                match other.strip_prefix('p') {
                    Some(digits) if (1..=2).contains(&digits.len()) => digits
                        .parse()
                        .map(Operator::Percentile)
                        .map_err(|_| unknown()),
                    _ => Err(unknown()),
                }
            }
        }
    }
}

impl fmt::Display for Operator {
    /// The lower-case operator name, used as the archive entry name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Mean => write!(f, "mean"),
            Operator::Min => write!(f, "min"),
            Operator::Max => write!(f, "max"),
            Operator::Std => write!(f, "std"),
            Operator::Percentile(nn) => write!(f, "p{nn}"),
        }
    }
}

/// Parse the request's operator strings, deduplicating while preserving the
/// first occurrence's position. Fails on the first unrecognised name, before
/// any reduction work starts.
pub fn parse_operators(names: &[String]) -> Result<Vec<Operator>, SurfaceQueryError> {
    let mut operators = Vec::with_capacity(names.len());
    for name in names {
        let operator = name.parse::<Operator>()?;
        if !operators.contains(&operator) {
            operators.push(operator);
        }
    }
    Ok(operators)
}

/// Reduce the realization stack under every requested operator.
///
/// `surfaces` slots are `None` where the fetch or decode failed; those
/// realizations contribute to no cell. When `output_zero_as_nan` is set,
/// exact-zero results are replaced by the undefined sentinel in every
/// operator's output.
pub fn aggregate(
    surfaces: &[Option<Surface>],
    operators: &[Operator],
    output_zero_as_nan: bool,
) -> Result<Vec<(Operator, Vec<f32>)>, SurfaceQueryError> {
    let cell_count = validate_alignment(surfaces)?;
    let partition_len = partition_length(cell_count);

    let percentiles: Vec<u8> = operators
        .iter()
        .filter_map(|op| match op {
            Operator::Percentile(nn) => Some(*nn),
            _ => None,
        })
        .collect();

    let mut results: Vec<(Operator, Vec<f32>)> = Vec::with_capacity(operators.len());
    for operator in operators {
        match operator {
            Operator::Percentile(_) => {}
            scalar => {
                let mut output = vec![0.0_f32; cell_count];
                output
                    .par_chunks_mut(partition_len)
                    .enumerate()
                    .for_each(|(partition, cells)| {
                        let start = partition * partition_len;
                        match scalar {
                            Operator::Mean => reduce_mean(surfaces, start, cells),
                            Operator::Min => reduce_min(surfaces, start, cells),
                            Operator::Max => reduce_max(surfaces, start, cells),
                            Operator::Std => reduce_std(surfaces, start, cells),
                            Operator::Percentile(_) => unreachable!("filtered above"),
                        }
                    });
                results.push((*scalar, output));
            }
        }
    }

    if !percentiles.is_empty() {
        let mut outputs: Vec<Vec<f32>> = percentiles
            .iter()
            .map(|_| vec![0.0_f32; cell_count])
            .collect();
        let partitions = split_partitions(&mut outputs, cell_count, partition_len);
        partitions.into_par_iter().for_each(|(start, mut cells)| {
            reduce_percentiles(surfaces, start, &percentiles, &mut cells)
        });
        for (nn, output) in percentiles.iter().zip(outputs) {
            results.push((Operator::Percentile(*nn), output));
        }
    }

    if output_zero_as_nan {
        for (_, output) in &mut results {
            for cell in output {
                if *cell == 0.0 {
                    *cell = UNDEF;
                }
            }
        }
    }

    Ok(results)
}

/// Check the alignment precondition: every decodable surface has
/// `nx * ny == values.len()` and all agree on the cell count.
fn validate_alignment(surfaces: &[Option<Surface>]) -> Result<usize, SurfaceQueryError> {
    if surfaces.is_empty() {
        return Err(SurfaceQueryError::NoInput);
    }
    let mut cell_count = None;
    for surface in surfaces.iter().flatten() {
        let len = surface.values.len();
        if surface.nx as usize * surface.ny as usize != len {
            return Err(SurfaceQueryError::MisalignedSurfaces {
                reason: "nx * ny does not match the number of data values",
            });
        }
        match cell_count {
            None => cell_count = Some(len),
            Some(expected) if expected != len => {
                return Err(SurfaceQueryError::MisalignedSurfaces {
                    reason: "surfaces differ in size",
                });
            }
            Some(_) => {}
        }
    }
    // All slots failed upstream; there is nothing to reduce.
    cell_count.ok_or(SurfaceQueryError::NoInput)
}

/// Cells per partition, such that at most [MAX_PARTITIONS] contiguous ranges
/// cover the grid.
fn partition_length(cell_count: usize) -> usize {
    ((cell_count + MAX_PARTITIONS - 1) / MAX_PARTITIONS).max(1)
}

/// Split each output buffer into per-partition slices, grouped by partition.
/// The slices are disjoint, so the partitions can be reduced in parallel.
#[allow(clippy::type_complexity)]
fn split_partitions<'a>(
    outputs: &'a mut [Vec<f32>],
    cell_count: usize,
    partition_len: usize,
) -> Vec<(usize, Vec<&'a mut [f32]>)> {
    let mut tails: Vec<&mut [f32]> = outputs.iter_mut().map(|o| o.as_mut_slice()).collect();
    let mut partitions = Vec::new();
    let mut start = 0;
    while start < cell_count {
        let len = partition_len.min(cell_count - start);
        let mut slices = Vec::with_capacity(tails.len());
        for tail in tails.iter_mut() {
            let (head, rest) = std::mem::take(tail).split_at_mut(len);
            *tail = rest;
            slices.push(head);
        }
        partitions.push((start, slices));
        start += len;
    }
    partitions
}

/// Mean and valid-contributor count for one cell.
fn cell_mean(surfaces: &[Option<Surface>], index: usize) -> (f64, usize) {
    let mut total = 0.0_f64;
    let mut valid = 0_usize;
    for surface in surfaces.iter().flatten() {
        let value = surface.values[index];
        if !is_undefined(value) {
            total += value as f64;
            valid += 1;
        }
    }
    if valid == 0 {
        (0.0, 0)
    } else {
        (total / valid as f64, valid)
    }
}

fn reduce_mean(surfaces: &[Option<Surface>], start: usize, cells: &mut [f32]) {
    for (offset, cell) in cells.iter_mut().enumerate() {
        let (mean, valid) = cell_mean(surfaces, start + offset);
        *cell = if valid == 0 { UNDEF } else { mean as f32 };
    }
}

/// Minimum over the stack. Intentionally applies no upper filter beyond
/// ignoring failed realizations; undefined values saturate at the sentinel.
fn reduce_min(surfaces: &[Option<Surface>], start: usize, cells: &mut [f32]) {
    for (offset, cell) in cells.iter_mut().enumerate() {
        let index = start + offset;
        let mut min = UNDEF;
        for surface in surfaces.iter().flatten() {
            let value = surface.values[index];
            if value < min {
                min = value;
            }
        }
        *cell = min;
    }
}

/// Maximum over the stack, ignoring values at or above the sanity cap.
fn reduce_max(surfaces: &[Option<Surface>], start: usize, cells: &mut [f32]) {
    for (offset, cell) in cells.iter_mut().enumerate() {
        let index = start + offset;
        let mut max = MAX_SEED;
        for surface in surfaces.iter().flatten() {
            let value = surface.values[index];
            if value > max && value < MAX_SANITY_CAP {
                max = value;
            }
        }
        *cell = if max == MAX_SEED { UNDEF } else { max };
    }
}

/// Population standard deviation, two passes per cell: mean first, then the
/// averaged squared deviations.
fn reduce_std(surfaces: &[Option<Surface>], start: usize, cells: &mut [f32]) {
    for (offset, cell) in cells.iter_mut().enumerate() {
        let index = start + offset;
        let (mean, valid) = cell_mean(surfaces, index);
        if valid == 0 {
            *cell = UNDEF;
            continue;
        }
        let mut total = 0.0_f64;
        for surface in surfaces.iter().flatten() {
            let value = surface.values[index];
            if !is_undefined(value) {
                let deviation = value as f64 - mean;
                total += deviation * deviation;
            }
        }
        *cell = (total / valid as f64).sqrt() as f32;
    }
}

/// Every requested percentile for one partition, sorting the contributor
/// vector once per cell. `cells` holds one output slice per percentile, in
/// the same order as `percentiles`.
fn reduce_percentiles(
    surfaces: &[Option<Surface>],
    start: usize,
    percentiles: &[u8],
    cells: &mut [&mut [f32]],
) {
    let mut contributors = vec![UNDEF; surfaces.len()];
    let len = cells.first().map_or(0, |c| c.len());
    for offset in 0..len {
        let index = start + offset;
        let mut valid = 0_usize;
        for (slot, surface) in surfaces.iter().enumerate() {
            let value = surface
                .as_ref()
                .map_or(UNDEF, |surface| surface.values[index]);
            if !is_undefined(value) {
                valid += 1;
            }
            contributors[slot] = value;
        }

        if valid == 0 {
            for output in cells.iter_mut() {
                output[offset] = UNDEF;
            }
            continue;
        }

        // Undefined values sort above every contributor and are never indexed.
        contributors.sort_unstable_by(|a, b| a.total_cmp(b));
        for (output, nn) in cells.iter_mut().zip(percentiles) {
            output[offset] = percentile_of_sorted(&contributors, valid, *nn);
        }
    }
}

/// Linear-interpolated percentile over the first `valid` entries of a sorted
/// contributor vector, under the domain's inverted labelling.
fn percentile_of_sorted(sorted: &[f32], valid: usize, nn: u8) -> f32 {
    let inverted = (100 - nn as i32) as f64;
    let position = (valid - 1) as f64 * inverted / 100.0;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    let fraction = (position - low as f64) as f32;
    sorted[low] + fraction * (sorted[high] - sorted[low])
}
