// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cross-spectral covariance matrices for the generalized beamformer.

use ndarray::prelude::*;
use num_complex::Complex64 as c64;

use crate::{constants::SINGULAR_RCOND, types::try_zeros, BeamformError};

/// Per-frequency cross-spectral covariances between every pair of stations,
/// with shape (frequency, station, station). Each frequency's matrix is
/// Hermitian.
#[derive(Debug, Clone)]
pub struct CrossSpectralMatrix {
    data: Array3<c64>,
}

impl CrossSpectralMatrix {
    /// Wrap an existing (frequency, station, station) array. Hermitian
    /// symmetry isn't checked.
    pub fn new(data: Array3<c64>) -> Result<CrossSpectralMatrix, BeamformError> {
        let (num_freqs, rows, cols) = data.dim();
        if num_freqs == 0 || rows == 0 || rows != cols {
            return Err(BeamformError::InvalidShape {
                what: "cross-spectral matrix",
                expected: vec![num_freqs.max(1), rows.max(1), rows.max(1)],
                got: vec![num_freqs, rows, cols],
            });
        }
        Ok(CrossSpectralMatrix { data })
    }

    /// Get the covariances of one window of spectra. `window` has shape
    /// (station, frequency) and should only hold the bins of the analysis
    /// band. Element (n, i, j) of the result is `X_i(n) conj(X_j(n))`.
    pub fn from_spectra(window: ArrayView2<c64>) -> Result<CrossSpectralMatrix, BeamformError> {
        let (num_stations, num_freqs) = window.dim();
        let mut data: Array3<c64> = try_zeros(
            Ix3(num_freqs, num_stations, num_stations),
            "cross-spectral matrix",
        )?;
        for (mut r, spectrum) in data.outer_iter_mut().zip(window.columns()) {
            for ((i, j), r_ij) in r.indexed_iter_mut() {
                *r_ij = spectrum[i] * spectrum[j].conj();
            }
        }
        CrossSpectralMatrix::new(data)
    }

    pub fn num_freqs(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn num_stations(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn view(&self) -> ArrayView3<c64> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array3<c64> {
        self.data
    }

    /// The reference power for BF relative powers: the summed auto-power of
    /// every station over the band, times the number of stations.
    pub fn reference_power(&self) -> f64 {
        let auto_power: f64 = (0..self.num_stations())
            .map(|i| self.data.slice(s![.., i, i]).sum().norm())
            .sum();
        auto_power * self.num_stations() as f64
    }

    /// Normalise every station pair by the modulus of its covariance summed
    /// over frequency. Pairs without any covariance are left alone.
    pub fn normalise(&mut self) {
        let num_stations = self.num_stations();
        for i in 0..num_stations {
            for j in 0..num_stations {
                let mut pair = self.data.slice_mut(s![.., i, j]);
                let total = pair.sum().norm();
                if total > 0.0 {
                    pair.mapv_inplace(|r| r / total);
                }
            }
        }
    }

    /// Get the per-frequency inverse needed by CAPON. Each matrix is
    /// diagonally loaded by `loading` times its mean auto-power before
    /// inversion, which keeps the rank-deficient covariance of a single
    /// window invertible. `loading` must be non-negative and finite.
    ///
    /// The loaded inverse isn't a pseudo-inverse; CAPON powers won't match
    /// reference values computed from one (e.g. with `pinv`), although peak
    /// locations generally do.
    pub fn capon_inverse(&self, loading: f64) -> Result<CrossSpectralMatrix, BeamformError> {
        if !(loading.is_finite() && loading >= 0.0) {
            return Err(BeamformError::InvalidDiagonalLoading(loading));
        }
        let num_stations = self.num_stations();
        let mut inverse: Array3<c64> = try_zeros(self.data.raw_dim(), "inverse cross-spectral matrix")?;
        for (freq_index, (r, mut r_inv)) in self
            .data
            .outer_iter()
            .zip(inverse.outer_iter_mut())
            .enumerate()
        {
            let mut loaded = r.to_owned();
            let delta = loading * r.diag().sum().re / num_stations as f64;
            loaded.diag_mut().mapv_inplace(|v| v + delta);
            match invert(loaded) {
                Some(inv) => r_inv.assign(&inv),
                None => return Err(BeamformError::SingularCovariance { freq_index }),
            }
        }
        Ok(CrossSpectralMatrix { data: inverse })
    }
}

/// Invert a square matrix with Gauss-Jordan elimination and partial pivoting.
/// `None` is returned if the matrix is (numerically) singular.
fn invert(mut m: Array2<c64>) -> Option<Array2<c64>> {
    let n = m.nrows();
    let scale = m.iter().fold(0.0, |max: f64, v| max.max(v.norm()));
    if scale == 0.0 {
        return None;
    }
    let mut inv = Array2::<c64>::eye(n);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&a, &b| m[(a, col)].norm().total_cmp(&m[(b, col)].norm()))?;
        if m[(pivot_row, col)].norm() <= SINGULAR_RCOND * scale {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                m.swap((pivot_row, k), (col, k));
                inv.swap((pivot_row, k), (col, k));
            }
        }

        let pivot = m[(col, col)];
        m.row_mut(col).mapv_inplace(|v| v / pivot);
        inv.row_mut(col).mapv_inplace(|v| v / pivot);
        let m_pivot = m.row(col).to_owned();
        let inv_pivot = inv.row(col).to_owned();
        for row in (0..n).filter(|&row| row != col) {
            let factor = m[(row, col)];
            if factor.norm() == 0.0 {
                continue;
            }
            m.row_mut(row).scaled_add(-factor, &m_pivot);
            inv.row_mut(row).scaled_add(-factor, &inv_pivot);
        }
    }

    Some(inv)
}

#[cfg(test)]
mod tests {
    use approx::*;

    use super::*;

    fn window() -> Array2<c64> {
        Array2::from_shape_fn((3, 4), |(i, n)| {
            c64::from_polar(1.0 + i as f64 * 0.5, 0.3 * (i * n) as f64 + 0.1 * n as f64)
        })
    }

    #[test]
    fn covariances_are_hermitian() {
        let csm = CrossSpectralMatrix::from_spectra(window().view()).unwrap();
        assert_eq!(csm.view().shape(), &[4, 3, 3]);
        for r in csm.view().outer_iter() {
            assert_abs_diff_eq!(r, r.t().mapv(|v| v.conj()), epsilon = 1e-12);
            for d in r.diag() {
                assert!(d.re >= 0.0);
                assert_abs_diff_eq!(d.im, 0.0);
            }
        }
    }

    #[test]
    fn reference_power_is_scaled_auto_power() {
        let w = window();
        let csm = CrossSpectralMatrix::from_spectra(w.view()).unwrap();
        let expected: f64 = w.iter().map(|v| v.norm_sqr()).sum::<f64>() * 3.0;
        assert_abs_diff_eq!(csm.reference_power(), expected, epsilon = 1e-10);
    }

    #[test]
    fn normalised_pairs_sum_to_unit_modulus() {
        let mut csm = CrossSpectralMatrix::from_spectra(window().view()).unwrap();
        csm.normalise();
        for i in 0..3 {
            for j in 0..3 {
                let total = csm.view().slice(s![.., i, j]).sum();
                assert_abs_diff_eq!(total.norm(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        // A well-conditioned Hermitian matrix.
        let a = array![
            [c64::new(4.0, 0.0), c64::new(1.0, 1.0), c64::new(0.0, -0.5)],
            [c64::new(1.0, -1.0), c64::new(3.0, 0.0), c64::new(0.2, 0.0)],
            [c64::new(0.0, 0.5), c64::new(0.2, 0.0), c64::new(2.0, 0.0)],
        ];
        let csm = CrossSpectralMatrix::new(a.clone().insert_axis(Axis(0))).unwrap();
        let inv = csm.capon_inverse(0.0).unwrap();
        let product = a.dot(&inv.view().index_axis(Axis(0), 0));
        assert_abs_diff_eq!(product, Array2::<c64>::eye(3), epsilon = 1e-12);
    }

    #[test]
    fn single_window_needs_loading() {
        // The covariance of a single window is rank 1.
        let csm = CrossSpectralMatrix::from_spectra(window().view()).unwrap();
        assert!(matches!(
            csm.capon_inverse(0.0),
            Err(BeamformError::SingularCovariance { freq_index: 0 })
        ));
        assert!(csm.capon_inverse(0.01).is_ok());
    }

    #[test]
    fn unusable_loading_is_rejected() {
        let csm = CrossSpectralMatrix::from_spectra(window().view()).unwrap();
        for loading in [f64::NAN, -1.0, f64::INFINITY] {
            assert!(matches!(
                csm.capon_inverse(loading),
                Err(BeamformError::InvalidDiagonalLoading(_))
            ));
        }
    }

    #[test]
    fn bad_shapes_are_rejected() {
        assert!(CrossSpectralMatrix::new(Array3::zeros((2, 3, 4))).is_err());
        assert!(CrossSpectralMatrix::new(Array3::zeros((0, 3, 3))).is_err());
    }
}
