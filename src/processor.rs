// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Engine selection and dispatch over analysis windows.

use log::debug;
use ndarray::prelude::*;
use num_complex::Complex64 as c64;
use rayon::prelude::*;

use crate::{
    bartlett::bbfk,
    generalized::{generalized_beamformer, GeneralizedMethod},
    steering::calc_steering_for_band,
    types::check_shape,
    BeamformError, BeamformResult, CrossSpectralMatrix, FrequencyBand,
};

/// The default diagonal loading applied to covariance matrices before they're
/// inverted for CAPON, as a fraction of the mean auto-power.
pub const DEFAULT_DIAGONAL_LOADING: f64 = 1e-2;

/// Which beamformer processes the windows?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engine {
    /// The conventional (Bartlett) beamformer; works on the spectra directly.
    Conventional,

    /// The generalized beamformer; works on the cross-spectral matrix.
    Generalized(GeneralizedMethod),
}

/// Everything needed to beamform windows of station spectra over a fixed
/// array, band and slowness grid.
///
/// Steering vectors only depend on the delay table and the band, so for the
/// generalized engine they're computed once here and reused for every window.
#[derive(Debug, Clone)]
pub struct ArrayProcessor {
    engine: Engine,
    band: FrequencyBand,
    delays: Array3<f64>,
    steer: Option<Array4<c64>>,
    prewhiten: bool,
    reference_power: Option<f64>,
    diagonal_loading: f64,
}

impl ArrayProcessor {
    /// Set up a processor. `delays` is the station delay table with shape
    /// (station, grid x, grid y) in seconds.
    pub fn new(
        engine: Engine,
        band: FrequencyBand,
        delays: Array3<f64>,
    ) -> Result<ArrayProcessor, BeamformError> {
        let steer = match engine {
            Engine::Conventional => None,
            Engine::Generalized(_) => Some(calc_steering_for_band(delays.view(), &band)?),
        };
        Ok(ArrayProcessor {
            engine,
            band,
            delays,
            steer,
            prewhiten: false,
            reference_power: None,
            diagonal_loading: DEFAULT_DIAGONAL_LOADING,
        })
    }

    /// Normalise every frequency by its own peak over the grid.
    pub fn with_prewhitening(mut self, prewhiten: bool) -> ArrayProcessor {
        self.prewhiten = prewhiten;
        self
    }

    /// Use a fixed reference power for BF relative powers, rather than the
    /// auto-power of each window.
    pub fn with_reference_power(mut self, dpow: f64) -> Result<ArrayProcessor, BeamformError> {
        if !(dpow.is_finite() && dpow > 0.0) {
            return Err(BeamformError::InvalidReferencePower(dpow));
        }
        self.reference_power = Some(dpow);
        Ok(self)
    }

    /// Set the diagonal loading used before inverting covariance matrices
    /// for CAPON. It must be non-negative and finite.
    pub fn with_diagonal_loading(mut self, loading: f64) -> Result<ArrayProcessor, BeamformError> {
        if !(loading.is_finite() && loading >= 0.0) {
            return Err(BeamformError::InvalidDiagonalLoading(loading));
        }
        self.diagonal_loading = loading;
        Ok(self)
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn band(&self) -> &FrequencyBand {
        &self.band
    }

    pub fn num_stations(&self) -> usize {
        self.delays.len_of(Axis(0))
    }

    /// Beamform one window. `spectra` has shape (station, bin) and holds the
    /// one-sided spectrum of each station (`nfft / 2 + 1` bins).
    pub fn process(&self, spectra: ArrayView2<c64>) -> Result<BeamformResult, BeamformError> {
        let (method, steer) = match (self.engine, self.steer.as_ref()) {
            (Engine::Conventional, _) => {
                return bbfk(spectra, self.delays.view(), &self.band, self.prewhiten)
            }
            (Engine::Generalized(method), Some(steer)) => (method, steer),
            (Engine::Generalized(_), None) => {
                return Err(BeamformError::InvalidShape {
                    what: "steering table",
                    expected: vec![self.band.num_bins()],
                    got: vec![0],
                })
            }
        };

        check_shape(
            "spectra",
            spectra.shape(),
            &[self.num_stations(), self.band.spectrum_len()],
        )?;
        let window = spectra.slice(s![.., self.band.low_bin..=self.band.high_bin]);
        let mut csm = CrossSpectralMatrix::from_spectra(window)?;
        match method {
            GeneralizedMethod::Bf => {
                let dpow = self
                    .reference_power
                    .unwrap_or_else(|| csm.reference_power());
                generalized_beamformer(steer.view(), csm.view(), dpow, self.prewhiten, method)
            }
            GeneralizedMethod::Capon => {
                csm.normalise();
                let inverse = csm.capon_inverse(self.diagonal_loading)?;
                generalized_beamformer(steer.view(), inverse.view(), 1.0, self.prewhiten, method)
            }
        }
    }

    /// Beamform many independent windows in parallel. Results are in the same
    /// order as `windows`; a failed window doesn't affect the others.
    pub fn process_windows(
        &self,
        windows: &[ArrayView2<c64>],
    ) -> Vec<Result<BeamformResult, BeamformError>> {
        debug!(
            "Processing {} windows with {} threads",
            windows.len(),
            rayon::current_num_threads()
        );
        windows
            .par_iter()
            .map(|spectra| self.process(spectra.view()))
            .collect()
    }
}
