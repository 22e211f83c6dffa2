// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Synthetic arrays and plane waves shared by tests.

use std::f64::consts::TAU;

use ndarray::prelude::*;
use num_complex::Complex64 as c64;

use crate::FrequencyBand;

/// An irregular five-station array (east, north) \[km\].
pub(crate) const STATIONS: [(f64, f64); 5] = [
    (0.0, 0.0),
    (1.0, 0.1),
    (-0.2, 1.1),
    (-0.9, -0.6),
    (0.7, -0.8),
];

/// The slowness of grid index `i` on a square grid of `num` points spanning
/// [-`s_max`, `s_max`] \[s/km\].
pub(crate) fn grid_slowness(i: usize, num: usize, s_max: f64) -> f64 {
    -s_max + 2.0 * s_max * i as f64 / (num - 1) as f64
}

/// A delay table (station, grid x, grid y) for [`STATIONS`] over a square
/// slowness grid.
pub(crate) fn slowness_grid_delays(num: usize, s_max: f64) -> Array3<f64> {
    Array3::from_shape_fn((STATIONS.len(), num, num), |(i, x, y)| {
        let (east, north) = STATIONS[i];
        grid_slowness(x, num, s_max) * east + grid_slowness(y, num, s_max) * north
    })
}

/// One-sided spectra (station, bin) of a plane wave whose delays are those of
/// grid point (`ix`, `iy`). Only bins inside `band` carry signal; bin `k` has
/// amplitude `amplitude(k)`.
pub(crate) fn plane_wave_spectra(
    delays: ArrayView3<f64>,
    ix: usize,
    iy: usize,
    band: &FrequencyBand,
    amplitude: impl Fn(usize) -> f64,
) -> Array2<c64> {
    let num_stations = delays.len_of(Axis(0));
    let mut spectra = Array2::zeros((num_stations, band.spectrum_len()));
    for ((i, k), v) in spectra.indexed_iter_mut() {
        if (band.low_bin..=band.high_bin).contains(&k) {
            let omega = TAU * k as f64 * band.df;
            *v = c64::from_polar(amplitude(k), -omega * delays[(i, ix, iy)]);
        }
    }
    spectra
}

/// The direct (no lookup table) conventional beam power of a band-limited
/// window at one grid point and bin index.
pub(crate) fn direct_beam_power(
    window: ArrayView2<c64>,
    delays: ArrayView3<f64>,
    band: &FrequencyBand,
    w: usize,
    x: usize,
    y: usize,
) -> f64 {
    let omega = band.angular_freq(w);
    window
        .column(w)
        .iter()
        .zip(delays.slice(s![.., x, y]).iter())
        .map(|(v, &tau)| v * c64::from_polar(1.0, omega * tau))
        .sum::<c64>()
        .norm_sqr()
}
