// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Frequency-wavenumber (FK) beamforming for seismic and acoustic sensor arrays.

Given the spectra of every station over an analysis window and a table of
predicted station delays for each trial slowness, the beamformers here produce
relative (and, where possible, absolute) power surfaces over the slowness grid
and locate their peak. Three estimators are available:

- the conventional (Bartlett) beamformer, working on the spectra directly
  ([`bartlett::bbfk`]);
- BF and CAPON, working on a cross-spectral matrix
  ([`generalized::generalized_beamformer`]).

[`ArrayProcessor`] ties these together for a fixed array and band.
 */

pub mod band;
pub mod bartlett;
mod constants;
pub mod covariance;
pub mod errors;
mod ffi;
pub mod generalized;
pub mod processor;
mod sine_table;
pub mod steering;
pub(crate) mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use band::FrequencyBand;
pub use covariance::CrossSpectralMatrix;
pub use errors::*;
pub use generalized::GeneralizedMethod;
pub use processor::{ArrayProcessor, Engine};
pub use types::BeamformResult;

// Re-exports.
pub use ndarray;
pub use num_complex::Complex64 as c64;
