// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The generalized beamformer: steering a cross-spectral covariance matrix
//! with trial steering vectors (e.g. Kirlin & Done, 1999).
//!
//! - BF: P(f) = e^H R(f) e
//! - CAPON: P(f) = 1 / (e^H R(f)^-1 e)


use log::{debug, warn};
use ndarray::prelude::*;
use num_complex::Complex64 as c64;

use crate::{
    types::{check_shape, find_peak, try_zeros},
    BeamformError, BeamformResult,
};

/// Which estimator does the generalized beamformer use?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneralizedMethod {
    /// The plain (Bartlett) estimator over the covariance matrix.
    Bf,

    /// The minimum-variance (Capon) estimator. The covariance matrix handed
    /// to the beamformer must already be inverted (see
    /// [`CrossSpectralMatrix::capon_inverse`](crate::CrossSpectralMatrix::capon_inverse)).
    Capon,
}

impl GeneralizedMethod {
    /// The method code used over the C interface (1 for BF, 2 for CAPON).
    pub fn code(self) -> i32 {
        match self {
            GeneralizedMethod::Bf => 1,
            GeneralizedMethod::Capon => 2,
        }
    }

    /// Get the method from its C-interface code. 0 is the conventional
    /// beamformer, which is a different engine entirely.
    pub fn from_code(code: i32) -> Result<GeneralizedMethod, BeamformError> {
        match code {
            1 => Ok(GeneralizedMethod::Bf),
            2 => Ok(GeneralizedMethod::Capon),
            _ => Err(BeamformError::UnsupportedMethod(code)),
        }
    }
}

impl std::fmt::Display for GeneralizedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                GeneralizedMethod::Bf => "BF",
                GeneralizedMethod::Capon => "CAPON",
            }
        )
    }
}

/// Beamform a cross-spectral covariance matrix.
///
/// `steer` is the steering phasor table with shape (grid x, grid y,
/// frequency, station), as made by
/// [`calc_steering`](crate::steering::calc_steering). `covariance` has shape
/// (frequency, station, station) and covers the same frequencies as `steer`.
///
/// `dpow` is the reference power used to get relative powers from absolute
/// ones when not prewhitening with [`GeneralizedMethod::Bf`]; it's ignored
/// otherwise (CAPON's inversion already normalises the scale).
///
/// With prewhitening, every frequency is normalised by its largest response
/// over the grid. Only BF recovers absolute powers in this case; for CAPON,
/// the absolute power is `None`.
pub fn generalized_beamformer(
    steer: ArrayView4<c64>,
    covariance: ArrayView3<c64>,
    dpow: f64,
    prewhiten: bool,
    method: GeneralizedMethod,
) -> Result<BeamformResult, BeamformError> {
    let (grid_x, grid_y, num_freqs, num_stations) = steer.dim();
    if grid_x == 0 || grid_y == 0 || num_freqs == 0 || num_stations == 0 {
        return Err(BeamformError::InvalidShape {
            what: "steering table",
            expected: vec![grid_x.max(1), grid_y.max(1), num_freqs.max(1), num_stations.max(1)],
            got: vec![grid_x, grid_y, num_freqs, num_stations],
        });
    }
    check_shape(
        "cross-spectral matrix",
        covariance.shape(),
        &[num_freqs, num_stations, num_stations],
    )?;
    let dpow = match method {
        GeneralizedMethod::Capon => 1.0,
        GeneralizedMethod::Bf if !prewhiten && !(dpow.is_finite() && dpow > 0.0) => {
            return Err(BeamformError::InvalidReferencePower(dpow))
        }
        GeneralizedMethod::Bf => dpow,
    };
    debug!(
        "Generalized beamformer ({method}): {num_freqs} frequencies, {num_stations} stations, {grid_x}x{grid_y} grid, prewhiten = {prewhiten}"
    );

    let mut abs_power_map: Array2<f64> = try_zeros(Ix2(grid_x, grid_y), "absolute power map")?;
    let mut rel_power_map: Array2<f64> = try_zeros(Ix2(grid_x, grid_y), "relative power map")?;
    let mut white: Array1<f64> = try_zeros(Ix1(num_freqs), "whitening reference")?;
    let mut p: Option<Array3<f64>> = if prewhiten {
        Some(try_zeros(Ix3(grid_x, grid_y, num_freqs), "power volume")?)
    } else {
        None
    };

    for ((x, y), abs_power) in abs_power_map.indexed_iter_mut() {
        for (n, r) in covariance.outer_iter().enumerate() {
            let mut power = response(steer.slice(s![x, y, n, ..]), r);
            if method == GeneralizedMethod::Capon {
                if power == 0.0 {
                    return Err(BeamformError::SingularCovariance { freq_index: n });
                }
                power = 1.0 / power;
            }
            match p.as_mut() {
                Some(p) => {
                    p[(x, y, n)] = power;
                    if power > white[n] {
                        white[n] = power;
                    }
                }
                None => *abs_power += power,
            }
        }
    }

    match p {
        None => {
            rel_power_map.zip_mut_with(&abs_power_map, |rel, &abs| *rel = abs / dpow);
        }
        Some(p) => {
            for (n, _) in white.iter().enumerate().filter(|&(_, &w)| w == 0.0) {
                warn!("Skipping frequency index {n}; its response is zero everywhere on the grid");
            }
            let norm = (num_freqs * num_stations) as f64;
            for ((x, y), rel) in rel_power_map.indexed_iter_mut() {
                let p_xy = p.slice(s![x, y, ..]);
                *rel = p_xy
                    .iter()
                    .zip(white.iter())
                    .filter(|&(_, &w)| w != 0.0)
                    .map(|(&power, &w)| power / (w * norm))
                    .sum();
                if method == GeneralizedMethod::Bf {
                    abs_power_map[(x, y)] = p_xy.sum();
                }
            }
        }
    }

    let (ix, iy, rel_power) = find_peak(rel_power_map.view());
    let has_abs_power = !(prewhiten && method == GeneralizedMethod::Capon);
    let (abs_power, abs_power_map) = if has_abs_power {
        let abs_max = abs_power_map
            .iter()
            .fold(0.0, |max, &v| if v > max { v } else { max });
        (Some(abs_max), Some(abs_power_map))
    } else {
        (None, None)
    };

    Ok(BeamformResult {
        ix,
        iy,
        rel_power,
        abs_power,
        rel_power_map,
        abs_power_map,
    })
}

/// The modulus of the quadratic form of `r` with the steering vector `e`.
///
/// The steering phasors compensate the delays, so the array response to a
/// matching plane wave is `conj(e)`; the form is evaluated with that vector.
fn response(e: ArrayView1<c64>, r: ArrayView2<c64>) -> f64 {
    let mut e_h_r_e = c64::new(0.0, 0.0);
    for (e_i, r_row) in e.iter().zip(r.outer_iter()) {
        let r_e: c64 = r_row
            .iter()
            .zip(e.iter())
            .map(|(r_ij, e_j)| r_ij * e_j.conj())
            .sum();
        e_h_r_e += e_i * r_e;
    }
    e_h_r_e.norm()
}
