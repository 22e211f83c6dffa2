// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with all aspects of fkbeam.
 */

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeamformError {
    /// A scratch buffer couldn't be acquired. Only the current analysis window
    /// is lost; the caller can carry on with the next one.
    #[error("Couldn't allocate {what} ({num_elements} elements): {source}")]
    Allocation {
        what: &'static str,
        num_elements: usize,
        source: TryReserveError,
    },

    #[error("Invalid frequency band: {0}")]
    InvalidBand(String),

    #[error("Expected {what} to have shape {expected:?}, but got {got:?}")]
    InvalidShape {
        what: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("The reference power must be positive and finite (got {0})")]
    InvalidReferencePower(f64),

    #[error("The diagonal loading must be non-negative and finite (got {0})")]
    InvalidDiagonalLoading(f64),

    #[error("The cross-spectral matrix at frequency index {freq_index} is singular; can't invert it for CAPON")]
    SingularCovariance { freq_index: usize },

    #[error("{what} must not be negative (got {value})")]
    NegativeCount { what: &'static str, value: i32 },

    #[error("A null pointer was passed for {0}")]
    NullPointer(&'static str),

    #[error("Method code {0} isn't handled by the generalized beamformer; expected 1 (BF) or 2 (CAPON)")]
    UnsupportedMethod(i32),
}
