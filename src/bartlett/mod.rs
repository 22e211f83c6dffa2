// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The conventional (Bartlett) FK beamformer.
//!
//! Every station's spectrum is phase-shifted by its trial delay and summed
//! directly; no cross-spectral matrix is needed.


use log::{debug, warn};
use ndarray::prelude::*;
use num_complex::{Complex32, Complex64 as c64};

use crate::{
    sine_table::SineTable,
    types::{check_shape, find_peak, try_zeros},
    BeamformError, BeamformResult, FrequencyBand,
};

/// Beamform a window of per-station spectra with the conventional
/// beamformer.
///
/// `spectra` has shape (station, bin) and must hold the one-sided spectrum of
/// each station (`nfft / 2 + 1` bins, as given by a real FFT of length
/// `band.nfft`). `delays` is the station delay table with shape (station,
/// grid x, grid y) in seconds.
///
/// Without prewhitening, every frequency is normalised by the total power in
/// the band, and both relative and absolute powers are returned. With
/// prewhitening, every frequency is normalised by its own peak over the grid,
/// and there is no absolute power.
///
/// # Examples
///
/// ```
/// use fkbeam::{bartlett::bbfk, FrequencyBand};
/// use ndarray::{Array2, Array3};
/// use num_complex::Complex64;
///
/// let band = FrequencyBand::new(1.0, 4.0, 20.0, 64).unwrap();
/// // Two stations with identical spectra and no delays: there's nothing to
/// // steer towards, so the power surface is flat.
/// let spectra = Array2::from_elem((2, band.spectrum_len()), Complex64::new(1.0, 0.0));
/// let delays = Array3::<f64>::zeros((2, 4, 4));
/// let result = bbfk(spectra.view(), delays.view(), &band, false).unwrap();
/// assert_eq!((result.ix, result.iy), (0, 0));
/// assert!(result.rel_power_map.iter().all(|&p| (p - result.rel_power).abs() < 1e-6));
/// ```
pub fn bbfk(
    spectra: ArrayView2<c64>,
    delays: ArrayView3<f64>,
    band: &FrequencyBand,
    prewhiten: bool,
) -> Result<BeamformResult, BeamformError> {
    let (num_stations, _, _) = delays.dim();
    check_shape(
        "spectra",
        spectra.shape(),
        &[num_stations, band.spectrum_len()],
    )?;
    bbfk_band_limited(
        spectra.slice(s![.., band.low_bin..=band.high_bin]),
        delays,
        band,
        prewhiten,
    )
}

/// The same as [`bbfk`], but `window` only holds the bins of the band, i.e.
/// its shape is (station, `band.num_bins()`) and column 0 is `band.low_bin`.
pub fn bbfk_band_limited(
    window: ArrayView2<c64>,
    delays: ArrayView3<f64>,
    band: &FrequencyBand,
    prewhiten: bool,
) -> Result<BeamformResult, BeamformError> {
    let (num_stations, grid_x, grid_y) = delays.dim();
    if num_stations == 0 || grid_x == 0 || grid_y == 0 {
        return Err(BeamformError::InvalidShape {
            what: "delay table",
            expected: vec![num_stations.max(1), grid_x.max(1), grid_y.max(1)],
            got: vec![num_stations, grid_x, grid_y],
        });
    }
    let num_bins = band.num_bins();
    check_shape("window", window.shape(), &[num_stations, num_bins])?;
    debug!(
        "Conventional beamformer: bins {}..={}, {num_stations} stations, {grid_x}x{grid_y} grid, prewhiten = {prewhiten}",
        band.low_bin, band.high_bin
    );

    let sine_table = SineTable::new()?;

    let denom = if prewhiten {
        0.0
    } else {
        total_power(window) * num_stations as f32
    };

    let mut pow: Array3<f32> = try_zeros(Ix3(num_bins, grid_x, grid_y), "power volume")?;
    let mut max_pow: Array1<f32> = try_zeros(Ix1(num_bins), "per-frequency maxima")?;

    // Frequency is the outer loop so the per-frequency maxima are ready for
    // prewhitening.
    for (w, (mut pow_w, max_w)) in pow
        .outer_iter_mut()
        .zip(max_pow.iter_mut())
        .enumerate()
    {
        let omega = band.angular_freq(w) as f32;
        let spectrum = window.column(w);
        for ((x, y), p) in pow_w.indexed_iter_mut() {
            let taus = delays.slice(s![.., x, y]);
            // The station sum is single precision, like the rest of the
            // power volume.
            let mut sum = Complex32::new(0.0, 0.0);
            for (v, &tau) in spectrum.iter().zip(taus.iter()) {
                let (sin_wtau, cos_wtau) = sine_table.sin_cos(omega * tau as f32);
                sum += Complex32::new(v.re as f32, v.im as f32)
                    * Complex32::new(cos_wtau, sin_wtau);
            }
            *p = sum.norm_sqr();
            if *p >= *max_w {
                *max_w = *p;
            }
        }
    }

    let mut nomin: Array2<f32> = try_zeros(Ix2(grid_x, grid_y), "numerator map")?;
    if !prewhiten && denom == 0.0 {
        warn!("The spectra carry no power in bins {}..={}", band.low_bin, band.high_bin);
    } else {
        for (w, (pow_w, &max_w)) in pow.outer_iter().zip(max_pow.iter()).enumerate() {
            let scale = if prewhiten { max_w } else { denom };
            if scale == 0.0 {
                warn!(
                    "Skipping bin {}; it has no power anywhere on the grid",
                    band.low_bin + w
                );
                continue;
            }
            nomin.zip_mut_with(&pow_w, |n, &p| *n += p / scale);
        }
    }

    let mut rel_power_map = nomin.mapv(f64::from);
    let (ix, iy, max_in_map) = find_peak(rel_power_map.view());

    let num_bins = num_bins as f64;
    let nfft = band.nfft as f64;
    if prewhiten {
        let scale = 1.0 / (num_bins * nfft * band.sampling_rate);
        rel_power_map.mapv_inplace(|p| p * scale);
        Ok(BeamformResult {
            ix,
            iy,
            rel_power: max_in_map * scale,
            abs_power: None,
            rel_power_map,
            abs_power_map: None,
        })
    } else {
        // Undo the normalisation one factor at a time.
        let scale = f64::from(denom)
            / num_bins
            / (num_stations * num_stations) as f64
            / nfft
            / band.sampling_rate;
        let abs_power_map = rel_power_map.mapv(|p| p * scale);
        Ok(BeamformResult {
            ix,
            iy,
            rel_power: max_in_map,
            abs_power: Some(max_in_map * scale),
            rel_power_map,
            abs_power_map: Some(abs_power_map),
        })
    }
}

/// The summed power of all stations over the band.
fn total_power(window: ArrayView2<c64>) -> f32 {
    let mut denom = 0.0_f32;
    for spectrum in window.columns() {
        let dpow: f32 = spectrum
            .iter()
            // Real-FFT convention: the imaginary part is stored negated.
            .map(|v| {
                let (re, im) = (v.re, -v.im);
                (re * re + im * im) as f32
            })
            .sum();
        denom += dpow;
    }
    denom
}
