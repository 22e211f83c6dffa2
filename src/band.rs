// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversion of a frequency band into the FFT bins used by the beamformers.

use crate::{constants::MIN_NFFT, BeamformError};

/// The FFT bins covered by a frequency band. All beamformers share this, so
/// their results are comparable.
///
/// The DC bin and the bin next to Nyquist are never used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    /// The first bin used (at least 1).
    pub low_bin: usize,
    /// The last bin used, inclusive (at most `nfft / 2 - 1`).
    pub high_bin: usize,
    /// The frequency resolution \[Hz\].
    pub df: f64,
    /// The FFT length.
    pub nfft: usize,
    /// The sampling rate \[Hz\].
    pub sampling_rate: f64,
}

impl FrequencyBand {
    /// Get the bins for the band [`freq_low_hz`, `freq_high_hz`] given the
    /// sampling rate and FFT length. Band edges are rounded to the nearest
    /// bin.
    ///
    /// # Examples
    ///
    /// ```
    /// use fkbeam::FrequencyBand;
    ///
    /// let band = FrequencyBand::new(1.0, 8.0, 100.0, 256).unwrap();
    /// assert_eq!(band.low_bin, 3);
    /// assert_eq!(band.high_bin, 20);
    /// assert_eq!(band.num_bins(), 18);
    /// ```
    pub fn new(
        freq_low_hz: f64,
        freq_high_hz: f64,
        sampling_rate_hz: f64,
        nfft: usize,
    ) -> Result<FrequencyBand, BeamformError> {
        if nfft < MIN_NFFT {
            return Err(BeamformError::InvalidBand(format!(
                "the FFT length must be at least {MIN_NFFT} (got {nfft})"
            )));
        }
        if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
            return Err(BeamformError::InvalidBand(format!(
                "the sampling rate must be positive (got {sampling_rate_hz})"
            )));
        }
        if !(freq_low_hz.is_finite() && freq_high_hz.is_finite()) {
            return Err(BeamformError::InvalidBand(format!(
                "band edges must be finite (got {freq_low_hz} to {freq_high_hz})"
            )));
        }

        let df = sampling_rate_hz / nfft as f64;
        let low_bin = to_bin(freq_low_hz, df).max(1);
        let high_bin = to_bin(freq_high_hz, df).min(nfft / 2 - 1);
        if high_bin < low_bin {
            return Err(BeamformError::InvalidBand(format!(
                "{freq_low_hz} Hz to {freq_high_hz} Hz doesn't cover any usable bins (df = {df} Hz, nfft = {nfft})"
            )));
        }

        Ok(FrequencyBand {
            low_bin,
            high_bin,
            df,
            nfft,
            sampling_rate: sampling_rate_hz,
        })
    }

    /// The number of bins used, counting both edges.
    pub fn num_bins(&self) -> usize {
        self.high_bin - self.low_bin + 1
    }

    /// The number of bins in a one-sided spectrum of this FFT length.
    pub fn spectrum_len(&self) -> usize {
        self.nfft / 2 + 1
    }

    /// The angular frequency of the `n`th bin of the band \[rad/s\].
    pub fn angular_freq(&self, n: usize) -> f64 {
        std::f64::consts::TAU * (self.low_bin + n) as f64 * self.df
    }
}

/// Round to the nearest bin; negative frequencies land on bin 0.
fn to_bin(freq_hz: f64, df: f64) -> usize {
    let bin = (freq_hz / df + 0.5).floor();
    if bin < 0.0 {
        0
    } else {
        bin as usize
    }
}

#[cfg(test)]
mod tests {
    use approx::*;

    use super::*;

    #[test]
    fn bins_are_rounded() {
        // df = 0.5 Hz.
        let band = FrequencyBand::new(1.2, 3.3, 64.0, 128).unwrap();
        assert_eq!(band.low_bin, 2);
        assert_eq!(band.high_bin, 7);
        assert_eq!(band.num_bins(), 6);
        assert_abs_diff_eq!(band.df, 0.5);
        assert_eq!(band.spectrum_len(), 65);
    }

    #[test]
    fn dc_is_never_used() {
        let band = FrequencyBand::new(0.0, 3.0, 64.0, 128).unwrap();
        assert_eq!(band.low_bin, 1);
        let band = FrequencyBand::new(-10.0, 3.0, 64.0, 128).unwrap();
        assert_eq!(band.low_bin, 1);
    }

    #[test]
    fn bin_next_to_nyquist_is_never_used() {
        let band = FrequencyBand::new(1.0, 1000.0, 64.0, 128).unwrap();
        assert_eq!(band.high_bin, 63);
        let band = FrequencyBand::new(1.0, 32.0, 64.0, 128).unwrap();
        assert_eq!(band.high_bin, 63);
    }

    #[test]
    fn single_bin_band() {
        let band = FrequencyBand::new(2.0, 2.0, 64.0, 128).unwrap();
        assert_eq!(band.low_bin, 4);
        assert_eq!(band.high_bin, 4);
        assert_eq!(band.num_bins(), 1);
        assert_abs_diff_eq!(band.angular_freq(0), std::f64::consts::TAU * 2.0);
    }

    #[test]
    fn bad_bands_are_rejected() {
        assert!(FrequencyBand::new(1.0, 2.0, 64.0, 2).is_err());
        assert!(FrequencyBand::new(1.0, 2.0, 0.0, 128).is_err());
        assert!(FrequencyBand::new(1.0, 2.0, f64::NAN, 128).is_err());
        assert!(FrequencyBand::new(5.0, 2.0, 64.0, 128).is_err());
        assert!(FrequencyBand::new(f64::INFINITY, 2.0, 64.0, 128).is_err());
    }
}
