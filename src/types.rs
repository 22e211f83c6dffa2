// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Generic types.

use ndarray::prelude::*;

use crate::BeamformError;

/// The outcome of beamforming a single analysis window.
#[derive(Debug, Clone)]
pub struct BeamformResult {
    /// The grid-x index of the relative-power maximum.
    pub ix: usize,
    /// The grid-y index of the relative-power maximum.
    pub iy: usize,
    /// The maximum of the relative-power surface.
    pub rel_power: f64,
    /// The maximum of the absolute-power surface. This is `None` when the
    /// engine can't recover an absolute scale (prewhitened conventional or
    /// CAPON beamforming).
    ///
    /// For the generalized beamformer, this maximum isn't necessarily at
    /// (`ix`, `iy`).
    pub abs_power: Option<f64>,
    /// The relative-power surface, indexed by (grid x, grid y).
    pub rel_power_map: Array2<f64>,
    /// The absolute-power surface, if available.
    pub abs_power_map: Option<Array2<f64>>,
}

/// Allocate a zero-filled array without aborting the process if the memory
/// isn't available.
pub(crate) fn try_zeros<A, D>(dim: D, what: &'static str) -> Result<Array<A, D>, BeamformError>
where
    A: Clone + Default,
    D: Dimension,
{
    let num_elements = dim.size_checked().ok_or_else(|| BeamformError::InvalidShape {
        what,
        expected: vec![isize::MAX as usize],
        got: dim.slice().to_vec(),
    })?;
    let mut v = Vec::new();
    v.try_reserve_exact(num_elements)
        .map_err(|source| BeamformError::Allocation {
            what,
            num_elements,
            source,
        })?;
    v.resize(num_elements, A::default());
    Array::from_shape_vec(dim.clone(), v).map_err(|_| BeamformError::InvalidShape {
        what,
        expected: dim.slice().to_vec(),
        got: vec![num_elements],
    })
}

/// Scan a surface in row-major order (x outer, y inner) and return the
/// coordinates and value of the first strict maximum. The running maximum
/// starts at 0, so a surface without any positive value yields (0, 0, 0.0).
pub(crate) fn find_peak(surface: ArrayView2<f64>) -> (usize, usize, f64) {
    let mut peak = (0, 0, 0.0);
    for ((x, y), &value) in surface.indexed_iter() {
        if value > peak.2 {
            peak = (x, y, value);
        }
    }
    peak
}

/// Check that a view has the expected shape.
pub(crate) fn check_shape(
    what: &'static str,
    got: &[usize],
    expected: &[usize],
) -> Result<(), BeamformError> {
    if got != expected {
        return Err(BeamformError::InvalidShape {
            what,
            expected: expected.to_vec(),
            got: got.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_is_first_in_row_major_order() {
        let surface = array![[0.1, 0.5, 0.2], [0.5, 0.3, 0.5]];
        let (x, y, v) = find_peak(surface.view());
        assert_eq!((x, y), (0, 1));
        assert_eq!(v, 0.5);
    }

    #[test]
    fn peak_of_flat_zero_surface_is_origin() {
        let surface = Array2::<f64>::zeros((3, 4));
        assert_eq!(find_peak(surface.view()), (0, 0, 0.0));
    }

    #[test]
    fn peak_of_flat_positive_surface_is_origin() {
        let surface = Array2::from_elem((3, 4), 2.5);
        assert_eq!(find_peak(surface.view()), (0, 0, 2.5));
    }

    #[test]
    fn zeros_have_requested_shape() {
        let a: Array3<f32> = try_zeros(Ix3(2, 3, 4), "test").unwrap();
        assert_eq!(a.shape(), &[2, 3, 4]);
        assert!(a.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn absurd_allocation_is_an_error() {
        let result: Result<Array2<f64>, _> = try_zeros(Ix2(usize::MAX / 16, 4), "huge");
        assert!(result.is_err());
    }

    #[test]
    fn shape_mismatch_is_reported() {
        assert!(check_shape("thing", &[2, 3], &[2, 3]).is_ok());
        let err = check_shape("thing", &[2, 3], &[3, 2]).unwrap_err();
        assert!(matches!(err, BeamformError::InvalidShape { what: "thing", .. }));
    }
}
