//! Pitch resolution: AST pitch values to frequency ratios, hz, and labels.

use crate::notation::ast::{Pitch, PitchValue};
use crate::notation::compile::Context;
use crate::notation::error::{limit, CompileError};
use crate::notation::primes::realize_ratio;

/// Ratio of `steps` steps of an equal division of `equave_size`.
pub fn octave_division_to_ratio(steps: f64, steps_in_equave: f64, equave_size: f64) -> f64 {
    equave_size.powf(steps / steps_in_equave)
}

/// Ratio corresponding to a cent offset.
pub fn cents_to_ratio(cents: f64) -> f64 {
    octave_division_to_ratio(cents, 1200.0, 2.0)
}

/// Cent offset corresponding to a ratio. Inverse of [`cents_to_ratio`].
pub fn ratio_to_cents(ratio: f64) -> f64 {
    1200.0 * ratio.log2()
}

/// Member ratios of `divisions`-equal-divisions of `equave_size`.
pub fn edo_ratios(divisions: u32, equave_size: f64) -> Vec<f64> {
    (0..divisions)
        .map(|i| octave_division_to_ratio(i as f64, divisions as f64, equave_size))
        .collect()
}

/// Degree labels for an equal-division scale, `i\divisions`.
pub fn edo_labels(divisions: u32) -> Vec<String> {
    (0..divisions).map(|i| format!("{i}\\{divisions}")).collect()
}

/// Wrap a scale degree into `0..scale_len`, counting the equaves crossed.
///
/// An empty scale has nothing to wrap into; the degree passes through with
/// no equave shift and the caller decides what it means.
pub fn degree_wrap(degree: i64, scale_len: usize) -> Result<(i64, i32), CompileError> {
    limit("Scale degree", degree as f64, -1000.0, 1000.0)?;

    if scale_len == 0 {
        return Ok((degree, 0));
    }

    let steps = scale_len as i64;
    let mut degree = degree;
    let mut octave = 0i32;

    while degree >= steps && octave > -20 {
        degree -= steps;
        octave += 1;
    }
    while degree < 0 && octave < 20 {
        degree += steps;
        octave -= 1;
    }

    Ok((degree, octave))
}

fn degree_to_ratio(degree: i64, scale: &[f64], equave_size: f64) -> Result<f64, CompileError> {
    limit("Equave size", equave_size, -20.0, 20.0)?;

    if scale.is_empty() {
        return Ok(1.0);
    }

    let (wrapped, octave) = degree_wrap(degree, scale.len())?;
    Ok(scale[wrapped as usize] * equave_size.powi(octave))
}

/// Resolve a pitch to a frequency ratio relative to the current root.
///
/// An absolute hz pitch becomes a ratio against `context.root_hz`.
pub(crate) fn pitch_to_ratio(pitch: &Pitch, context: &Context) -> Result<f64, CompileError> {
    limit("Equave size", context.equave_size, -20.0, 20.0)?;

    let octave_multi = context.equave_size.powi(pitch.octave);

    match &pitch.value {
        PitchValue::Ratio {
            numerator,
            denominator,
        } => {
            let ratio = realize_ratio(*numerator, *denominator, &context.primes_tuning)?;
            limit("Pitch ratio", ratio, 0.0, 100.0)?;
            Ok(ratio * octave_multi)
        }
        PitchValue::Cents { cents } => {
            limit("Cents", *cents, -12000.0, 12000.0)?;
            Ok(cents_to_ratio(*cents) * octave_multi)
        }
        PitchValue::OctaveDivision {
            numerator,
            denominator,
            equave_size,
        } => Ok(
            octave_division_to_ratio(*numerator as f64, *denominator as f64, *equave_size)
                * octave_multi,
        ),
        PitchValue::Degree { degree } => {
            let ratio = degree_to_ratio(*degree, &context.scale, context.equave_size)?;
            Ok(ratio * octave_multi)
        }
        PitchValue::Hz { hz } => {
            limit("Hz", *hz, 0.0, 20000.0)?;
            Ok(hz / context.root_hz * octave_multi)
        }
    }
}

/// Resolve a pitch to an absolute frequency.
///
/// Hz pitches stay absolute (octave modifiers still apply); everything else
/// goes through [`pitch_to_ratio`] against the current root.
pub(crate) fn pitch_to_hz(pitch: &Pitch, context: &Context) -> Result<f64, CompileError> {
    if let PitchValue::Hz { hz } = &pitch.value {
        let hz = hz * context.equave_size.powi(pitch.octave);
        limit("Hz", hz, 0.0, 20000.0)?;
        return Ok(hz);
    }
    Ok(pitch_to_ratio(pitch, context)? * context.root_hz)
}

/// A short label for a pitch, in the same notation that parses back to the
/// same frequency.
pub(crate) fn pitch_to_label(pitch: &Pitch, context: &Context) -> Result<String, CompileError> {
    match &pitch.value {
        PitchValue::Hz { hz } => Ok(format!("{hz}Hz")),
        PitchValue::Cents { cents } => Ok(format!("{cents}c")),
        PitchValue::Ratio {
            numerator,
            denominator,
        } => Ok(format!("{numerator}/{denominator}")),
        PitchValue::OctaveDivision {
            numerator,
            denominator,
            ..
        } => Ok(format!("{numerator}\\{denominator}")),
        PitchValue::Degree { degree } => {
            let (wrapped, _) = degree_wrap(*degree, context.scale.len())?;
            Ok(context
                .scale_labels
                .get(wrapped as usize)
                .cloned()
                .unwrap_or_else(|| degree.to_string()))
        }
    }
}
