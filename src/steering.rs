// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Steering vectors: unit phasors compensating each station's predicted delay
//! for every trial slowness on the grid.

use std::f64::consts::TAU;

use log::debug;
use ndarray::prelude::*;
use num_complex::Complex64 as c64;

use crate::{types::try_zeros, BeamformError, FrequencyBand};

/// Build the steering phasor table for the frequencies starting at bin
/// `low_bin` and spanning `num_bins` bins of width `df` \[Hz\].
///
/// `delays` is the station delay table with shape (station, grid x, grid y)
/// in seconds. The result has shape (grid x, grid y, frequency, station); the
/// element for station `i` at frequency index `n` is `exp(i ω τ)` with
/// `ω = 2π (low_bin + n) df`.
///
/// # Examples
///
/// ```
/// use fkbeam::steering::calc_steering;
/// use ndarray::Array3;
///
/// // 3 stations, a 5x5 grid, no delays anywhere.
/// let delays = Array3::<f64>::zeros((3, 5, 5));
/// let steer = calc_steering(delays.view(), 4, 10, 0.25).unwrap();
/// assert_eq!(steer.shape(), &[5, 5, 10, 3]);
/// assert!(steer.iter().all(|e| e.re == 1.0 && e.im == 0.0));
/// ```
pub fn calc_steering(
    delays: ArrayView3<f64>,
    low_bin: usize,
    num_bins: usize,
    df: f64,
) -> Result<Array4<c64>, BeamformError> {
    let (num_stations, grid_x, grid_y) = delays.dim();
    if num_stations == 0 || grid_x == 0 || grid_y == 0 || num_bins == 0 {
        return Err(BeamformError::InvalidShape {
            what: "steering table",
            expected: vec![grid_x.max(1), grid_y.max(1), num_bins.max(1), num_stations.max(1)],
            got: vec![grid_x, grid_y, num_bins, num_stations],
        });
    }
    debug!(
        "Building steering vectors: {num_stations} stations, {grid_x}x{grid_y} grid, {num_bins} bins from bin {low_bin}"
    );

    let mut steer: Array4<c64> = try_zeros(
        Dim([grid_x, grid_y, num_bins, num_stations]),
        "steering table",
    )?;
    for ((i, x, y), &tau) in delays.indexed_iter() {
        for (n, e) in steer.slice_mut(s![x, y, .., i]).iter_mut().enumerate() {
            let wtau = TAU * (low_bin + n) as f64 * df * tau;
            let (s, c) = wtau.sin_cos();
            *e = c64::new(c, s);
        }
    }
    Ok(steer)
}

/// [`calc_steering`] over all bins of a [`FrequencyBand`].
pub fn calc_steering_for_band(
    delays: ArrayView3<f64>,
    band: &FrequencyBand,
) -> Result<Array4<c64>, BeamformError> {
    calc_steering(delays, band.low_bin, band.num_bins(), band.df)
}
