// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Example of beamforming a synthetic plane wave with every engine.
//!
//! Build and run with something like:
//! `cargo run --release --example synthetic_wave -- 0.15 -0.2`
//!
//! The two arguments are the east and north slowness of the wave \[s/km\].

use std::f64::consts::TAU;

use fkbeam::{ndarray::prelude::*, *};

const GRID: usize = 51;
const S_MAX: f64 = 0.5;

fn main() {
    if let Err(e) = try_main() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let sx: f64 = match args.next() {
        Some(a) => a.parse()?,
        None => 0.15,
    };
    let sy: f64 = match args.next() {
        Some(a) => a.parse()?,
        None => -0.2,
    };

    // A small irregular array (east, north) [km].
    let stations = [
        (0.0, 0.0),
        (0.8, 0.1),
        (0.3, 0.9),
        (-0.6, 0.5),
        (-0.7, -0.4),
        (0.2, -0.8),
        (1.1, -0.6),
    ];
    let slowness = |i: usize| -S_MAX + 2.0 * S_MAX * i as f64 / (GRID - 1) as f64;
    let delays = Array3::from_shape_fn((stations.len(), GRID, GRID), |(i, x, y)| {
        slowness(x) * stations[i].0 + slowness(y) * stations[i].1
    });

    let band = FrequencyBand::new(1.0, 6.0, 50.0, 512)?;
    println!(
        "Using bins {} to {} ({} Hz resolution)",
        band.low_bin, band.high_bin, band.df
    );
    let spectra = Array2::from_shape_fn((stations.len(), band.spectrum_len()), |(i, k)| {
        let (east, north) = stations[i];
        let tau = sx * east + sy * north;
        c64::from_polar(1.0, -TAU * k as f64 * band.df * tau)
    });

    for engine in [
        Engine::Conventional,
        Engine::Generalized(GeneralizedMethod::Bf),
        Engine::Generalized(GeneralizedMethod::Capon),
    ] {
        let processor = ArrayProcessor::new(engine, band, delays.clone())?;
        let result = processor.process(spectra.view())?;
        println!(
            "{engine:?}: peak at slowness ({:+.3}, {:+.3}) s/km, relative power {:.4}",
            slowness(result.ix),
            slowness(result.iy),
            result.rel_power
        );
    }

    Ok(())
}
