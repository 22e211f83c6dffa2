// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.
 */

/// The number of sine-table steps per full cycle.
pub(crate) const SINE_REF_LEN: usize = 1000;
/// A quarter cycle in sine-table steps; cos(x) = sin(x + pi/2).
pub(crate) const SINE_REF_LEN_4: usize = SINE_REF_LEN / 4;
/// One and a quarter cycles, plus the closing sample, so that cosine lookups
/// never need to wrap.
pub(crate) const SINE_TABLE_LEN: usize = SINE_REF_LEN + SINE_REF_LEN_4 + 1;

/// The smallest FFT length that leaves at least one usable bin between DC and
/// the bin next to Nyquist.
pub(crate) const MIN_NFFT: usize = 4;

/// Pivots smaller than this (relative to the largest diagonal magnitude) mark
/// a cross-spectral matrix as singular.
pub(crate) const SINGULAR_RCOND: f64 = 1e-12;
