// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A single-precision sine/cosine lookup table with linear interpolation.
//!
//! The table has [`SINE_REF_LEN`] steps per cycle and spans one and a quarter
//! cycles, so a cosine is read as the sine a quarter cycle further along
//! without wrapping.

use std::f32::consts::TAU;

use ndarray::prelude::*;

use crate::{
    constants::{SINE_REF_LEN, SINE_REF_LEN_4, SINE_TABLE_LEN},
    types::try_zeros,
    BeamformError,
};

pub(crate) struct SineTable {
    table: Array1<f32>,
    /// Table steps per radian.
    step_inv: f32,
}

impl SineTable {
    pub(crate) fn new() -> Result<SineTable, BeamformError> {
        let mut table: Array1<f32> = try_zeros(Ix1(SINE_TABLE_LEN), "sine table")?;
        // The last sample sits at 2.5 pi.
        let span = std::f64::consts::TAU + std::f64::consts::FRAC_PI_2;
        table.iter_mut().enumerate().for_each(|(j, s)| {
            *s = (j as f64 / (SINE_TABLE_LEN - 1) as f64 * span).sin() as f32;
        });
        Ok(SineTable {
            table,
            step_inv: SINE_REF_LEN as f32 / TAU,
        })
    }

    /// Get (sin(x), cos(x)).
    #[inline]
    pub(crate) fn sin_cos(&self, x: f32) -> (f32, f32) {
        let x = x.rem_euclid(TAU);
        let fidx = x * self.step_inv;
        // rem_euclid can round up to exactly TAU.
        let idx = (fidx as usize).min(SINE_REF_LEN - 1);
        let frac = fidx - idx as f32;
        let s = self.table[idx] * (1.0 - frac) + self.table[idx + 1] * frac;
        let c = self.table[idx + SINE_REF_LEN_4] * (1.0 - frac)
            + self.table[idx + 1 + SINE_REF_LEN_4] * frac;
        (s, c)
    }
}

#[cfg(test)]
mod tests {
    use approx::*;

    use super::*;

    // Linear interpolation over 2 pi / 1000 steps has an error bound of
    // h^2 / 8 ~= 5e-6, plus single-precision rounding.
    const EPSILON: f32 = 1e-5;

    #[test]
    fn table_matches_native_trig() {
        let table = SineTable::new().unwrap();
        for i in 0..20_000 {
            let x = -20.0 + i as f32 * 0.002_003;
            let (s, c) = table.sin_cos(x);
            let (s_ref, c_ref) = (x as f64).sin_cos();
            assert_abs_diff_eq!(s, s_ref as f32, epsilon = EPSILON);
            assert_abs_diff_eq!(c, c_ref as f32, epsilon = EPSILON);
        }
    }

    #[test]
    fn table_is_exact_at_cardinal_angles() {
        let table = SineTable::new().unwrap();
        let (s, c) = table.sin_cos(0.0);
        assert_abs_diff_eq!(s, 0.0, epsilon = 1e-7);
        assert_abs_diff_eq!(c, 1.0, epsilon = 1e-7);

        let (s, c) = table.sin_cos(std::f32::consts::PI);
        assert_abs_diff_eq!(s, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(c, -1.0, epsilon = EPSILON);
    }

    #[test]
    fn edge_of_cycle_does_not_overrun() {
        let table = SineTable::new().unwrap();
        for x in [TAU, -TAU, TAU - f32::EPSILON, -f32::EPSILON, 1e6 * TAU] {
            let (s, c) = table.sin_cos(x);
            assert!(s.is_finite());
            assert!(c.is_finite());
            assert!(s.abs() <= 1.0 + EPSILON);
            assert!(c.abs() <= 1.0 + EPSILON);
        }
    }
}
