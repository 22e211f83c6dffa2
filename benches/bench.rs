// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Benchmarks. All inputs are synthetic; a plane wave crossing a 10-station array
is beamformed over a 41x41 slowness grid.
 */

use std::f64::consts::TAU;

use criterion::*;
use ndarray::prelude::*;

use fkbeam::{
    bartlett::bbfk, c64, generalized::generalized_beamformer, steering::calc_steering_for_band,
    ArrayProcessor, CrossSpectralMatrix, Engine, FrequencyBand, GeneralizedMethod,
};

const NUM_STATIONS: usize = 10;
const GRID: usize = 41;
const S_MAX: f64 = 0.5;

fn setup() -> (FrequencyBand, Array3<f64>, Array2<c64>) {
    let band = FrequencyBand::new(0.5, 5.0, 40.0, 256).unwrap();
    let stations: Vec<(f64, f64)> = (0..NUM_STATIONS)
        .map(|i| {
            let angle = TAU * i as f64 / NUM_STATIONS as f64;
            let radius = 0.5 + 0.1 * i as f64;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    let slowness = |i: usize| -S_MAX + 2.0 * S_MAX * i as f64 / (GRID - 1) as f64;
    let delays = Array3::from_shape_fn((NUM_STATIONS, GRID, GRID), |(i, x, y)| {
        slowness(x) * stations[i].0 + slowness(y) * stations[i].1
    });
    let spectra = Array2::from_shape_fn((NUM_STATIONS, band.spectrum_len()), |(i, k)| {
        let omega = TAU * k as f64 * band.df;
        c64::from_polar(1.0, -omega * delays[(i, 12, 30)])
    });
    (band, delays, spectra)
}

fn beamformers(c: &mut Criterion) {
    let (band, delays, spectra) = setup();
    let window = spectra.slice(s![.., band.low_bin..=band.high_bin]);

    c.bench_function("calc_steering", |b| {
        b.iter(|| {
            calc_steering_for_band(delays.view(), &band).unwrap();
        })
    });

    c.bench_function("bbfk", |b| {
        b.iter(|| {
            bbfk(spectra.view(), delays.view(), &band, false).unwrap();
        })
    });

    c.bench_function("bbfk prewhitened", |b| {
        b.iter(|| {
            bbfk(spectra.view(), delays.view(), &band, true).unwrap();
        })
    });

    c.bench_function("generalized BF", |b| {
        let steer = calc_steering_for_band(delays.view(), &band).unwrap();
        let csm = CrossSpectralMatrix::from_spectra(window).unwrap();
        let dpow = csm.reference_power();
        b.iter(|| {
            generalized_beamformer(steer.view(), csm.view(), dpow, false, GeneralizedMethod::Bf)
                .unwrap();
        })
    });

    c.bench_function("generalized CAPON with inversion", |b| {
        let steer = calc_steering_for_band(delays.view(), &band).unwrap();
        b.iter(|| {
            let mut csm = CrossSpectralMatrix::from_spectra(window).unwrap();
            csm.normalise();
            let inverse = csm.capon_inverse(1e-2).unwrap();
            generalized_beamformer(
                steer.view(),
                inverse.view(),
                1.0,
                false,
                GeneralizedMethod::Capon,
            )
            .unwrap();
        })
    });

    // Many independent windows, processed in parallel.
    c.bench_function("process_windows", |b| {
        let processor = ArrayProcessor::new(Engine::Conventional, band, delays.clone()).unwrap();
        let windows = vec![spectra.view(); 32];
        b.iter(|| {
            processor.process_windows(&windows);
        })
    });
}

criterion_group!(benches, beamformers);
criterion_main!(benches);
