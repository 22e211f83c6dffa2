// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code for allowing other languages to talk to this Rust library. See
//! `include/fkbeam.h` for the generated C header.
//!
//! Complex numbers can't be passed across the FFI boundary, so they're
//! unpacked into pairs of doubles (real then imaginary). All multi-dimensional
//! arrays are row major.


use std::{
    cell::RefCell,
    os::raw::{c_char, c_int},
    panic, slice,
};

use ndarray::prelude::*;
use num_complex::Complex64 as c64;

use crate::{
    bartlett::bbfk_band_limited,
    generalized::{generalized_beamformer, GeneralizedMethod},
    steering::calc_steering,
    BeamformError, FrequencyBand,
};

// Error handling taken from
// https://michael-f-bryan.github.io/rust-ffi-guide/errors/return_types.html
thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = RefCell::new(None);
}

/// Update the most recent error, clearing whatever may have been there before.
pub fn update_last_error(err: String) {
    LAST_ERROR.with(|prev| {
        *prev.borrow_mut() = Some(err);
    });
}

/// Retrieve the most recent error, clearing it in the process.
pub fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|prev| prev.borrow_mut().take())
}

/// Calculate the number of bytes in the last error's error message,
/// **including** a trailing `null` character. If there's no error, 0 is
/// returned.
#[no_mangle]
pub extern "C" fn fk_last_error_length() -> c_int {
    LAST_ERROR.with(|prev| match *prev.borrow() {
        Some(ref err) => err.len() as c_int + 1,
        None => 0,
    })
}

macro_rules! ffi_error {
    ($result:expr) => {{
        match $result {
            Ok(r) => r,
            Err(e) => {
                update_last_error(e.to_string());
                return 1;
            }
        }
    }};
}

/// Write the most recent error message into a caller-provided buffer as a UTF-8
/// string, returning the number of bytes written.
///
/// # Note
///
/// This writes a **UTF-8** string into the buffer. Windows users may need to
/// convert it to a UTF-16 "unicode" afterwards.
///
/// If there are no recent errors then this returns `0` (because we wrote 0
/// bytes). `-1` is returned if there are any errors, for example when passed a
/// null pointer or a buffer of insufficient size.
#[no_mangle]
pub unsafe extern "C" fn fk_last_error_message(buffer: *mut c_char, length: c_int) -> c_int {
    if buffer.is_null() || length < 0 {
        return -1;
    }

    let last_error = match take_last_error() {
        Some(err) => err,
        None => return 0,
    };

    let buffer = slice::from_raw_parts_mut(buffer as *mut u8, length as usize);

    if last_error.len() >= buffer.len() {
        // Put the error back so a bigger buffer can be tried.
        update_last_error(last_error);
        return -1;
    }

    std::ptr::copy_nonoverlapping(last_error.as_ptr(), buffer.as_mut_ptr(), last_error.len());

    // Add a trailing null so people using the string as a `char *` don't
    // accidentally read into garbage.
    buffer[last_error.len()] = 0;

    last_error.len() as c_int
}

/// Build the steering phasor table.
///
/// # Arguments
///
/// * `nstat` - The number of stations.
/// * `grdpts_x` - The number of slowness grid points in x.
/// * `grdpts_y` - The number of slowness grid points in y.
/// * `nf` - The number of frequency bins.
/// * `nlow` - The first frequency bin.
/// * `deltaf` - The frequency resolution \[Hz\].
/// * `stat_tshift_table` - A pointer to `nstat * grdpts_x * grdpts_y` station
///   delays \[s\], indexed (station, x, y).
/// * `steer` - A pointer to a buffer of at least `2 * grdpts_x * grdpts_y * nf
///   * nstat` doubles. The phasors are written here, indexed (x, y, frequency,
///   station).
///
/// # Returns
///
/// * An exit code integer. If this is non-zero then an error occurred; the
///   details can be obtained by (1) getting the length of the error string by
///   calling `fk_last_error_length` and (2) calling `fk_last_error_message`
///   with a string buffer with a length at least equal to the error length.
///
#[no_mangle]
pub unsafe extern "C" fn fk_calc_steer(
    nstat: c_int,
    grdpts_x: c_int,
    grdpts_y: c_int,
    nf: c_int,
    nlow: c_int,
    deltaf: f64,
    stat_tshift_table: *const f64,
    steer: *mut f64,
) -> i32 {
    let nstat = ffi_error!(to_count("nstat", nstat));
    let grdpts_x = ffi_error!(to_count("grdpts_x", grdpts_x));
    let grdpts_y = ffi_error!(to_count("grdpts_y", grdpts_y));
    let nf = ffi_error!(to_count("nf", nf));
    let nlow = ffi_error!(to_count("nlow", nlow));
    ffi_error!(check_not_null("stat_tshift_table", stat_tshift_table));
    ffi_error!(check_not_null("steer", steer));

    catch_panics(move || {
        let delays = delay_table(stat_tshift_table, nstat, grdpts_x, grdpts_y)?;
        let s = calc_steering(delays, nlow, nf, deltaf)?;
        let out = complex_slice_mut(steer, s.len());
        for (out, &e) in out.iter_mut().zip(s.iter()) {
            *out = e;
        }
        Ok(())
    })
}

/// Beamform a window with the conventional (Bartlett) beamformer.
///
/// # Arguments
///
/// * `window` - A pointer to `2 * nstat * nb` doubles, where `nb` is the number
///   of FFT bins in the band [`flow`, `fhigh`]. These are the complex spectra
///   of each station starting at the band's first bin, indexed (station,
///   bin).
/// * `_spoint` - Unused; kept so existing callers link unchanged.
/// * `_offset` - Unused; kept so existing callers link unchanged.
/// * `stat_tshift_table` - A pointer to `nstat * grdpts_x * grdpts_y` station
///   delays \[s\], indexed (station, x, y).
/// * `abs` - The absolute power at the peak is written here. It's 0 when
///   prewhitening.
/// * `rel` - The relative power at the peak is written here.
/// * `ix` - The grid-x index of the peak is written here.
/// * `iy` - The grid-y index of the peak is written here.
/// * `flow` - The lowest frequency of the band \[Hz\].
/// * `fhigh` - The highest frequency of the band \[Hz\].
/// * `digfreq` - The sampling rate \[Hz\].
/// * `_nsamp` - Unused; kept so existing callers link unchanged.
/// * `nstat` - The number of stations.
/// * `prewhiten` - 1 to normalise every frequency by its own peak, 0
///   otherwise.
/// * `grdpts_x` - The number of slowness grid points in x.
/// * `grdpts_y` - The number of slowness grid points in y.
/// * `nfft` - The FFT length.
///
/// # Returns
///
/// * An exit code integer. If this is non-zero then an error occurred; the
///   details can be obtained by (1) getting the length of the error string by
///   calling `fk_last_error_length` and (2) calling `fk_last_error_message`
///   with a string buffer with a length at least equal to the error length.
///
#[no_mangle]
pub unsafe extern "C" fn fk_bbfk(
    window: *const f64,
    _spoint: *const c_int,
    _offset: c_int,
    stat_tshift_table: *const f64,
    abs: *mut f64,
    rel: *mut f64,
    ix: *mut c_int,
    iy: *mut c_int,
    flow: f64,
    fhigh: f64,
    digfreq: f64,
    _nsamp: c_int,
    nstat: c_int,
    prewhiten: c_int,
    grdpts_x: c_int,
    grdpts_y: c_int,
    nfft: c_int,
) -> i32 {
    let prewhiten = match prewhiten {
        0 => false,
        1 => true,
        _ => {
            update_last_error("A value other than 0 or 1 was used for prewhiten".to_string());
            return 1;
        }
    };
    let nstat = ffi_error!(to_count("nstat", nstat));
    let grdpts_x = ffi_error!(to_count("grdpts_x", grdpts_x));
    let grdpts_y = ffi_error!(to_count("grdpts_y", grdpts_y));
    let nfft = ffi_error!(to_count("nfft", nfft));
    ffi_error!(check_not_null("window", window));
    ffi_error!(check_not_null("stat_tshift_table", stat_tshift_table));
    ffi_error!(check_not_null("abs", abs));
    ffi_error!(check_not_null("rel", rel));
    ffi_error!(check_not_null("ix", ix));
    ffi_error!(check_not_null("iy", iy));

    catch_panics(move || {
        let band = FrequencyBand::new(flow, fhigh, digfreq, nfft)?;
        let num_bins = band.num_bins();
        let window = ArrayView2::from_shape(
            (nstat, num_bins),
            complex_slice(window, nstat * num_bins),
        )
        .map_err(|_| BeamformError::InvalidShape {
            what: "window",
            expected: vec![nstat, num_bins],
            got: vec![nstat * num_bins],
        })?;
        let delays = delay_table(stat_tshift_table, nstat, grdpts_x, grdpts_y)?;

        let result = bbfk_band_limited(window, delays, &band, prewhiten)?;
        *abs = result.abs_power.unwrap_or(0.0);
        *rel = result.rel_power;
        *ix = result.ix as c_int;
        *iy = result.iy as c_int;
        Ok(())
    })
}

/// Beamform a cross-spectral matrix with the generalized beamformer.
///
/// # Arguments
///
/// * `steer` - A pointer to the steering phasors made by `fk_calc_steer`
///   (`2 * grdpts_x * grdpts_y * nf * nstat` doubles).
/// * `covariance` - A pointer to `2 * nf * nstat * nstat` doubles: the
///   cross-spectral matrix (or its inverse, for CAPON) of each frequency.
/// * `flow` - The lowest frequency of the band \[Hz\].
/// * `fhigh` - The highest frequency of the band \[Hz\].
/// * `digfreq` - The sampling rate \[Hz\].
/// * `_nsamp` - Unused; kept so existing callers link unchanged.
/// * `nstat` - The number of stations.
/// * `prewhiten` - 1 to normalise every frequency by its own peak, 0
///   otherwise.
/// * `grdpts_x` - The number of slowness grid points in x.
/// * `grdpts_y` - The number of slowness grid points in y.
/// * `nfft` - The FFT length.
/// * `nf` - The number of frequencies. This must match the number of FFT bins
///   in the band [`flow`, `fhigh`].
/// * `dpow` - The reference power for BF relative powers.
/// * `ix` - The grid-x index of the relative-power peak is written here.
/// * `iy` - The grid-y index of the relative-power peak is written here.
/// * `absmax` - The maximum absolute power is written here. It's 0 for CAPON
///   with prewhitening.
/// * `relmax` - The maximum relative power is written here.
/// * `method` - 1 for BF, 2 for CAPON.
///
/// # Returns
///
/// * An exit code integer. If this is non-zero then an error occurred; the
///   details can be obtained by (1) getting the length of the error string by
///   calling `fk_last_error_length` and (2) calling `fk_last_error_message`
///   with a string buffer with a length at least equal to the error length.
///
#[no_mangle]
pub unsafe extern "C" fn fk_generalized_beamformer(
    steer: *const f64,
    covariance: *const f64,
    flow: f64,
    fhigh: f64,
    digfreq: f64,
    _nsamp: c_int,
    nstat: c_int,
    prewhiten: c_int,
    grdpts_x: c_int,
    grdpts_y: c_int,
    nfft: c_int,
    nf: c_int,
    dpow: f64,
    ix: *mut c_int,
    iy: *mut c_int,
    absmax: *mut f64,
    relmax: *mut f64,
    method: c_int,
) -> i32 {
    let method = ffi_error!(GeneralizedMethod::from_code(method));
    let prewhiten = match prewhiten {
        0 => false,
        1 => true,
        _ => {
            update_last_error("A value other than 0 or 1 was used for prewhiten".to_string());
            return 1;
        }
    };
    let nstat = ffi_error!(to_count("nstat", nstat));
    let grdpts_x = ffi_error!(to_count("grdpts_x", grdpts_x));
    let grdpts_y = ffi_error!(to_count("grdpts_y", grdpts_y));
    let nfft = ffi_error!(to_count("nfft", nfft));
    let nf = ffi_error!(to_count("nf", nf));
    ffi_error!(check_not_null("steer", steer));
    ffi_error!(check_not_null("covariance", covariance));
    ffi_error!(check_not_null("ix", ix));
    ffi_error!(check_not_null("iy", iy));
    ffi_error!(check_not_null("absmax", absmax));
    ffi_error!(check_not_null("relmax", relmax));

    catch_panics(move || {
        let band = FrequencyBand::new(flow, fhigh, digfreq, nfft)?;
        if band.num_bins() != nf {
            return Err(BeamformError::InvalidShape {
                what: "number of frequencies",
                expected: vec![band.num_bins()],
                got: vec![nf],
            });
        }
        let steer_shape = (grdpts_x, grdpts_y, nf, nstat);
        let steer = ArrayView4::from_shape(
            steer_shape,
            complex_slice(steer, grdpts_x * grdpts_y * nf * nstat),
        )
        .map_err(|_| BeamformError::InvalidShape {
            what: "steering table",
            expected: vec![grdpts_x, grdpts_y, nf, nstat],
            got: vec![grdpts_x * grdpts_y * nf * nstat],
        })?;
        let covariance = ArrayView3::from_shape(
            (nf, nstat, nstat),
            complex_slice(covariance, nf * nstat * nstat),
        )
        .map_err(|_| BeamformError::InvalidShape {
            what: "cross-spectral matrix",
            expected: vec![nf, nstat, nstat],
            got: vec![nf * nstat * nstat],
        })?;

        let result = generalized_beamformer(steer, covariance, dpow, prewhiten, method)?;
        *ix = result.ix as c_int;
        *iy = result.iy as c_int;
        *absmax = result.abs_power.unwrap_or(0.0);
        *relmax = result.rel_power;
        Ok(())
    })
}

/// Run `f`, turning both errors and panics into an exit code. Panic messages
/// are captured as the last error.
fn catch_panics<F>(f: F) -> i32
where
    F: FnOnce() -> Result<(), BeamformError> + panic::UnwindSafe,
{
    panic::set_hook(Box::new(|pi| {
        update_last_error(panic_message::panic_info_message(pi).to_string());
    }));

    let result = panic::catch_unwind(f);

    let _ = panic::take_hook();

    match result {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            update_last_error(e.to_string());
            1
        }
        // For panics, the FFI error message is already updated.
        Err(_) => -1,
    }
}

fn to_count(what: &'static str, value: c_int) -> Result<usize, BeamformError> {
    usize::try_from(value).map_err(|_| BeamformError::NegativeCount { what, value })
}

fn check_not_null<T>(what: &'static str, ptr: *const T) -> Result<(), BeamformError> {
    if ptr.is_null() {
        Err(BeamformError::NullPointer(what))
    } else {
        Ok(())
    }
}

/// View the caller's delay table as (station, x, y).
unsafe fn delay_table<'a>(
    table: *const f64,
    nstat: usize,
    grdpts_x: usize,
    grdpts_y: usize,
) -> Result<ArrayView3<'a, f64>, BeamformError> {
    let len = nstat * grdpts_x * grdpts_y;
    ArrayView3::from_shape(
        (nstat, grdpts_x, grdpts_y),
        slice::from_raw_parts(table, len),
    )
    .map_err(|_| BeamformError::InvalidShape {
        what: "delay table",
        expected: vec![nstat, grdpts_x, grdpts_y],
        got: vec![len],
    })
}

// `Complex64` is `repr(C)`, so a complex number has the same memory layout as
// two doubles side by side.
unsafe fn complex_slice<'a>(ptr: *const f64, len: usize) -> &'a [c64] {
    slice::from_raw_parts(ptr as *const c64, len)
}

unsafe fn complex_slice_mut<'a>(ptr: *mut f64, len: usize) -> &'a mut [c64] {
    slice::from_raw_parts_mut(ptr as *mut c64, len)
}
