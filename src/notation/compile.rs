//! Compiles a parsed AST into a beat-time score.
//!
//! Compilation is a single left-to-right fold over the sequence. The
//! [`Context`] carries the mutable tuning state (root, scale, subdivision,
//! primes tuning) and the beat cursor; notes and chords emit events at the
//! cursor, setters mutate state or emit tempo/param events, and scale and
//! root changes only affect what follows them.

use crate::notation::ast::*;
use crate::notation::error::CompileError;
use crate::notation::pitch::{
    edo_labels, edo_ratios, pitch_to_hz, pitch_to_label, pitch_to_ratio,
};
use crate::notation::primes::realize_ratio;
use crate::score::{ParamValue, Score, ScoreEvent, TempoMap};

use serde::Serialize;

/// Envelope stage values indexed by notation digit. Attack, decay and
/// release are seconds; sustain is handled separately as `digit / 9`.
const ENV_VALUES: [f64; 10] = [0.0, 0.003, 0.006, 0.01, 0.033, 0.1, 0.33, 1.0, 3.3, 10.0];

/// Mutable compiler state threaded through the fold.
pub(crate) struct Context {
    pub(crate) root_hz: f64,
    pub(crate) time: f64,
    pub(crate) subdivision: f64,
    pub(crate) scale: Vec<f64>,
    pub(crate) scale_labels: Vec<String>,
    pub(crate) equave_size: f64,
    pub(crate) primes_tuning: Vec<f64>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Self {
            root_hz: 220.0,
            time: 0.0,
            subdivision: 0.5,
            scale: edo_ratios(12, 2.0),
            scale_labels: edo_labels(12),
            equave_size: 2.0,
            primes_tuning: Vec::new(),
        }
    }
}

/// One point of a ruler plot. `ms` values here are beat-cursor positions
/// mirrored into the field the UI reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulerPoint {
    pub ms: f64,
    pub hz: f64,
    pub label: String,
}

/// Side-channel state for frequency-ruler UIs, captured during the fold.
///
/// Root and equave come from the moment the first note or ratio chord
/// sounds; the range comes from the first `rl:` setter.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RulerState {
    pub low_hz: Option<f64>,
    pub high_hz: Option<f64>,
    pub root_hz: Option<f64>,
    pub equave_size: Option<f64>,
    pub plots: Vec<Vec<RulerPoint>>,
}

impl RulerState {
    fn capture_root(&mut self, context: &Context) {
        if self.root_hz.is_none() {
            self.root_hz = Some(context.root_hz);
            self.equave_size = Some(context.equave_size);
        }
    }
}

/// Real-time extent of one sequence item, for playback highlighting.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTime {
    /// Index into the sequence's items.
    pub item: usize,
    pub span: Span,
    pub ms: f64,
    pub ms_end: f64,
}

/// Output of a successful compile.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub score: Score,
    pub ruler: RulerState,
    /// Timed items (notes, chords, rests) in sequence order.
    pub times: Vec<ItemTime>,
}

/// Compile an AST into a beat-time score.
///
/// Returns `Ok(None)` when the AST has no sequence to score, i.e. the
/// source was empty or held only a param group.
pub fn compile(ast: &Ast) -> Result<Option<Compiled>, CompileError> {
    let sequence = match &ast.sequence {
        Some(sequence) => sequence,
        None => return Ok(None),
    };

    let mut context = Context::new();
    let mut ruler = RulerState::default();
    let mut times: Vec<(usize, Span, f64, f64)> = Vec::new();

    let mut events = vec![
        ScoreEvent::Tempo {
            time: 0.0,
            bpm: 120.0,
            lerp: false,
        },
        ScoreEvent::Param {
            time: 0.0,
            value: ParamValue::Osc {
                osc: "triangle".to_string(),
            },
        },
        ScoreEvent::Param {
            time: 0.0,
            value: ParamValue::Env {
                a: ENV_VALUES[2],
                d: ENV_VALUES[8],
                s: 0.5,
                r: ENV_VALUES[6],
            },
        },
    ];

    for (index, item) in sequence.items.iter().enumerate() {
        match item {
            SequenceItem::Comment(_)
            | SequenceItem::BarLine(_)
            | SequenceItem::Whitespace(_) => {}

            SequenceItem::SetScale(set) => set_scale(&set.scale, &mut context)?,

            SequenceItem::SetRoot(set) => {
                context.root_hz = pitch_to_hz(&set.pitch, &context)?;
            }

            SequenceItem::Note(note) => {
                let (time, time_end) = advance_time(note.tail.as_ref(), &mut context);
                events.push(ScoreEvent::Note {
                    time,
                    time_end,
                    hz: pitch_to_hz(&note.pitch, &context)?,
                    label: pitch_to_label(&note.pitch, &context)?,
                });
                times.push((index, note.span, time, time_end));
                ruler.capture_root(&context);
            }

            SequenceItem::Rest(rest) => {
                let time = context.time;
                context.time += f64::from(rest.length) * context.subdivision;
                times.push((index, rest.span, time, context.time));
            }

            SequenceItem::Chord(chord) => {
                let (time, time_end) = advance_time(chord.tail.as_ref(), &mut context);
                match &chord.pitches {
                    ChordPitches::Pitches(pitches) => {
                        pitch_chord_events(pitches, time, time_end, &context, &mut events)?;
                    }
                    ChordPitches::Ratios(pitches) => {
                        ratio_chord_events(pitches, time, time_end, &context, &mut events)?;
                    }
                }
                times.push((index, chord.span, time, time_end));
            }

            SequenceItem::RatioChord(chord) => {
                let (time, time_end) = advance_time(chord.tail.as_ref(), &mut context);
                ratio_chord_events(&chord.pitches, time, time_end, &context, &mut events)?;
                times.push((index, chord.span, time, time_end));
                ruler.capture_root(&context);
            }

            SequenceItem::SetterGroup(group) => {
                for setter in &group.setters {
                    let setter = match setter {
                        SetterItem::Setter(setter) => setter,
                        SetterItem::Semicolon(_) => continue,
                    };
                    apply_setter(setter, &mut context, &mut ruler, &mut events)?;
                }
            }
        }
    }

    ruler.capture_root(&context);

    events.push(ScoreEvent::End { time: context.time });

    let score = Score {
        events,
        length: context.time,
    };

    // Resolve item extents to real time for playback highlighting.
    let map = TempoMap::from_events(&score.events);
    let times = times
        .into_iter()
        .map(|(item, span, time, time_end)| ItemTime {
            item,
            span,
            ms: map.ms_at(time),
            ms_end: map.ms_at(time_end),
        })
        .collect();

    Ok(Some(Compiled {
        score,
        ruler,
        times,
    }))
}

/// Advance the beat cursor over a note or chord, returning its extent.
/// A hold tail of length n stretches the duration to n + 1 subdivisions.
fn advance_time(tail: Option<&Hold>, context: &mut Context) -> (f64, f64) {
    let duration = match tail {
        Some(hold) => f64::from(hold.length) + 1.0,
        None => 1.0,
    };
    let time = context.time;
    context.time += duration * context.subdivision;
    (time, context.time)
}

fn pitch_chord_events(
    pitches: &[PitchGroupItem],
    time: f64,
    time_end: f64,
    context: &Context,
    events: &mut Vec<ScoreEvent>,
) -> Result<(), CompileError> {
    for item in pitches {
        let pitch = match item {
            PitchGroupItem::Pitch(pitch) => pitch,
            PitchGroupItem::Whitespace(_) => continue,
        };
        events.push(ScoreEvent::Note {
            time,
            time_end,
            hz: pitch_to_hz(pitch, context)?,
            label: pitch_to_label(pitch, context)?,
        });
    }
    Ok(())
}

/// Expand a ratio chord like `4:5:6` into one note per term, all against
/// the first term as denominator. A double colon interpolates the missing
/// harmonics: `4::7` sounds 4:5:6:7.
fn ratio_chord_events(
    pitches: &[RatioGroupItem],
    time: f64,
    time_end: f64,
    context: &Context,
    events: &mut Vec<ScoreEvent>,
) -> Result<(), CompileError> {
    let first_denominator = pitches
        .iter()
        .find_map(|item| match item {
            RatioGroupItem::Pitch(pitch) => Some(pitch.value),
            RatioGroupItem::Colon(_) => None,
        })
        .ok_or_else(|| CompileError::semantic("empty ratio chord"))?;

    if first_denominator == 0 {
        return Err(CompileError::semantic(
            "Chords cannot contain a ratio of 0",
        ));
    }

    let mut push = |numerator: u64, events: &mut Vec<ScoreEvent>| -> Result<(), CompileError> {
        events.push(ScoreEvent::Note {
            time,
            time_end,
            hz: realize_ratio(numerator, first_denominator, &context.primes_tuning)?
                * context.root_hz,
            label: format!("{numerator}/{first_denominator}"),
        });
        Ok(())
    };

    let mut colons = 0;
    let mut last_numerator: u64 = 1;
    for item in pitches {
        match item {
            RatioGroupItem::Colon(_) => colons += 1,
            RatioGroupItem::Pitch(pitch) => {
                let numerator = pitch.value;
                if numerator == 0 {
                    return Err(CompileError::semantic(
                        "Chords cannot contain a ratio of 0",
                    ));
                }
                if colons == 2 {
                    while last_numerator < numerator - 1 {
                        last_numerator += 1;
                        push(last_numerator, events)?;
                    }
                }
                push(numerator, events)?;
                last_numerator = numerator;
                colons = 0;
            }
        }
    }
    Ok(())
}

fn set_scale(scale: &ScaleDef, context: &mut Context) -> Result<(), CompileError> {
    match scale {
        ScaleDef::Edo(edo) => {
            context.scale = edo_ratios(edo.divisions, edo.equave_size);
            context.scale_labels = edo_labels(edo.divisions);
            context.equave_size = edo.equave_size;
            Ok(())
        }

        ScaleDef::PitchGroup(group) => {
            let mut pitches: Vec<Pitch> = group
                .pitches
                .iter()
                .filter_map(|item| match item {
                    PitchGroupItem::Pitch(pitch) => Some(pitch.clone()),
                    PitchGroupItem::Whitespace(_) => None,
                })
                .collect();

            if group.prefix.as_deref() == Some("m") {
                pitches = mode_scale_degrees(&pitches)?;
            }

            let ratios = pitches
                .iter()
                .map(|pitch| pitch_to_ratio(pitch, context))
                .collect::<Result<Vec<_>, _>>()?;
            context.scale = ratios;

            let labels = pitches
                .iter()
                .map(|pitch| pitch_to_label(pitch, context))
                .collect::<Result<Vec<_>, _>>()?;
            context.scale_labels = labels;

            if group.equave_marker {
                context.equave_size = context.scale.pop().unwrap_or(2.0);
                context.scale_labels.pop();
            }
            Ok(())
        }

        ScaleDef::RatioChord(chord) => {
            let mut ratios = Vec::new();
            let mut labels = Vec::new();

            let mut first_denominator: Option<u64> = None;
            let mut colons = 0;
            let mut last_numerator: u64 = 0;

            let mut add = |numerator: u64,
                           denominator: u64,
                           ratios: &mut Vec<f64>,
                           labels: &mut Vec<String>|
             -> Result<(), CompileError> {
                ratios.push(realize_ratio(
                    numerator,
                    denominator,
                    &context.primes_tuning,
                )?);
                labels.push(format!("{numerator}/{denominator}"));
                Ok(())
            };

            for item in &chord.pitches {
                let pitch = match item {
                    RatioGroupItem::Pitch(pitch) => pitch,
                    RatioGroupItem::Colon(_) => {
                        colons += 1;
                        continue;
                    }
                };
                let numerator = pitch.value;
                let denominator = *first_denominator.get_or_insert(numerator);

                if colons == 2 {
                    while last_numerator + 1 < numerator {
                        last_numerator += 1;
                        add(last_numerator, denominator, &mut ratios, &mut labels)?;
                    }
                }

                add(numerator, denominator, &mut ratios, &mut labels)?;
                last_numerator = numerator;
                colons = 0;
            }

            context.scale = ratios;
            context.scale_labels = labels;

            if chord.equave_marker {
                context.equave_size = context.scale.pop().unwrap_or(2.0);
                context.scale_labels.pop();
            }
            Ok(())
        }
    }
}

/// Expand a mode scale (`{m2 2 1 ...}`) into cumulative degrees. Degree 0
/// is implicit, and the final step is dropped since it only closes the
/// equave.
fn mode_scale_degrees(pitches: &[Pitch]) -> Result<Vec<Pitch>, CompileError> {
    let mut degrees = vec![0i64];
    let mut degree = 0i64;

    for pitch in pitches {
        let step = match pitch.value {
            PitchValue::Degree { degree } => degree,
            _ => {
                return Err(CompileError::semantic(
                    "Mode scales {m} should only contain pitch degrees (0, 1, etc), \
                     not ratios, hz or any other kind of pitch",
                ))
            }
        };
        degree += step;
        degrees.push(degree);
    }

    degrees.pop();

    Ok(degrees
        .into_iter()
        .map(|degree| Pitch {
            octave: 0,
            value: PitchValue::Degree { degree },
            span: Span::new(0, 0),
        })
        .collect())
}

fn apply_setter(
    setter: &Setter,
    context: &mut Context,
    ruler: &mut RulerState,
    events: &mut Vec<ScoreEvent>,
) -> Result<(), CompileError> {
    match &setter.kind {
        SetterKind::Bpm { bpm } => {
            if *bpm == 0.0 {
                return Err(CompileError::semantic("bpm cannot be zero"));
            }
            events.push(ScoreEvent::Tempo {
                time: context.time,
                bpm: *bpm,
                lerp: false,
            });
        }

        SetterKind::Bms { bms } => {
            if *bms == 0.0 {
                return Err(CompileError::semantic("bms cannot be zero"));
            }
            events.push(ScoreEvent::Tempo {
                time: context.time,
                bpm: 60000.0 / bms,
                lerp: false,
            });
        }

        SetterKind::Subdivision {
            numerator,
            denominator,
        } => {
            if *numerator == 0 {
                return Err(CompileError::semantic("subdivision cannot be zero"));
            }
            context.subdivision =
                f64::from(denominator.unwrap_or(1)) / f64::from(*numerator);
        }

        SetterKind::Osc { name } => {
            events.push(ScoreEvent::Param {
                time: context.time,
                value: ParamValue::Osc { osc: name.clone() },
            });
        }

        SetterKind::Env { a, d, s, r } => {
            events.push(ScoreEvent::Param {
                time: context.time,
                value: ParamValue::Env {
                    a: ENV_VALUES[*a as usize],
                    d: ENV_VALUES[*d as usize],
                    s: f64::from(*s) / 9.0,
                    r: ENV_VALUES[*r as usize],
                },
            });
        }

        SetterKind::Primes { pitches } => {
            let tuning = pitches
                .iter()
                .filter_map(|item| match item {
                    PitchGroupItem::Pitch(pitch) => Some(pitch),
                    PitchGroupItem::Whitespace(_) => None,
                })
                .map(|pitch| pitch_to_ratio(pitch, context))
                .collect::<Result<Vec<_>, _>>()?;
            context.primes_tuning = tuning;
        }

        SetterKind::RulerRange { low, high } => {
            if ruler.low_hz.is_none() {
                ruler.low_hz = Some(pitch_to_hz(low, context)?);
                ruler.high_hz = Some(pitch_to_hz(high, context)?);
            }
        }

        SetterKind::RulerPlot => {
            let plot = context
                .scale
                .iter()
                .zip(&context.scale_labels)
                .map(|(ratio, label)| RulerPoint {
                    ms: context.time,
                    hz: ratio * context.root_hz,
                    label: label.clone(),
                })
                .collect();
            ruler.plots.push(plot);
        }
    }
    Ok(())
}
