//! Time engine — converts beat-time scores to millisecond scores.
//!
//! Tempo events partition the beat axis into segments, each with a start and
//! end bpm. Within a segment the beat rate interpolates linearly between the
//! two, so beat→ms conversion has a closed form (the harmonic mean of the
//! endpoint rates) rather than needing numeric integration.

use super::types::{RealTimeEvent, RealTimeScore, Score, ScoreEvent};

/// One span of the piecewise tempo curve.
#[derive(Debug, Clone, PartialEq)]
struct TempoSegment {
    bpm: f64,
    bpm_end: f64,
    time: f64,
    ms: f64,
}

/// Milliseconds taken to traverse `beats` while the rate moves linearly from
/// `bpm1` to `bpm2`.
fn integrate(bpm1: f64, bpm2: f64, beats: f64) -> f64 {
    let u = bpm1 / 60.0;
    let v = bpm2 / 60.0;
    if u == v {
        return beats / v * 1000.0;
    }
    2.0 * beats * (v - u) / (v * v - u * u) * 1000.0
}

/// Beat→millisecond conversion table built from a score's tempo events.
#[derive(Debug, Clone)]
pub struct TempoMap {
    segments: Vec<TempoSegment>,
}

impl TempoMap {
    /// Build a tempo map from the `Tempo` events in `events`.
    ///
    /// Events are stable-sorted by time, so when several tempo changes share
    /// a beat the one declared last wins. A `lerp` event back-propagates its
    /// bpm as the end rate of the preceding segment.
    pub fn from_events(events: &[ScoreEvent]) -> Self {
        let mut tempos: Vec<(f64, f64, bool)> = events
            .iter()
            .filter_map(|event| match event {
                ScoreEvent::Tempo { time, bpm, lerp } => Some((*time, *bpm, *lerp)),
                _ => None,
            })
            .collect();
        tempos.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("tempo time is not NaN"));

        let mut segments = vec![TempoSegment {
            bpm: 60.0,
            bpm_end: 60.0,
            time: 0.0,
            ms: 0.0,
        }];

        for (index, &(time, bpm, _)) in tempos.iter().enumerate() {
            let prev = segments.last().expect("segments start non-empty");
            let ms = integrate(prev.bpm, prev.bpm_end, time - prev.time) + prev.ms;
            let bpm_end = match tempos.get(index + 1) {
                Some(&(_, next_bpm, true)) => next_bpm,
                _ => bpm,
            };
            segments.push(TempoSegment {
                bpm,
                bpm_end,
                time,
                ms,
            });
        }

        Self { segments }
    }

    /// Convert a beat time to milliseconds.
    pub fn ms_at(&self, time: f64) -> f64 {
        let segment = self
            .segments
            .iter()
            .rev()
            .find(|segment| time >= segment.time)
            .unwrap_or(&self.segments[0]);
        integrate(segment.bpm, segment.bpm_end, time - segment.time) + segment.ms
    }
}

/// Convert a beat-time score to real time.
///
/// Events are stable-sorted by beat time, converted through the tempo map,
/// and tempo events are dropped — tempo is consumed here, not re-exposed.
pub fn to_real_time(score: &Score) -> RealTimeScore {
    let map = TempoMap::from_events(&score.events);

    let mut ordered: Vec<&ScoreEvent> = score.events.iter().collect();
    ordered.sort_by(|a, b| a.time().partial_cmp(&b.time()).expect("event time is not NaN"));

    let events = ordered
        .into_iter()
        .filter_map(|event| match event {
            ScoreEvent::Note {
                time,
                time_end,
                hz,
                label,
            } => Some(RealTimeEvent::Note {
                ms: map.ms_at(*time),
                ms_end: map.ms_at(*time_end),
                hz: *hz,
                label: label.clone(),
            }),
            ScoreEvent::Param { time, value } => Some(RealTimeEvent::Param {
                ms: map.ms_at(*time),
                value: value.clone(),
            }),
            ScoreEvent::End { time } => Some(RealTimeEvent::End { ms: map.ms_at(*time) }),
            ScoreEvent::Tempo { .. } => None,
        })
        .collect();

    RealTimeScore {
        events,
        length_ms: map.ms_at(score.length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::types::ParamValue;

    fn note(time: f64, time_end: f64, hz: f64) -> ScoreEvent {
        ScoreEvent::Note {
            time,
            time_end,
            hz,
            label: String::new(),
        }
    }

    fn tempo(time: f64, bpm: f64, lerp: bool) -> ScoreEvent {
        ScoreEvent::Tempo { time, bpm, lerp }
    }

    #[test]
    fn integrate_constant_tempo() {
        // 120 bpm = 2 beats/sec
        assert_eq!(integrate(120.0, 120.0, 1.0), 500.0);
        assert_eq!(integrate(60.0, 60.0, 3.0), 3000.0);
    }

    #[test]
    fn integrate_ramp_uses_harmonic_mean() {
        // 120→60 over 3 beats: mean rate (2+1)/2 beats/sec → 2000 ms
        assert_eq!(integrate(120.0, 60.0, 3.0), 2000.0);
    }

    #[test]
    fn default_tempo_is_60_bpm() {
        let map = TempoMap::from_events(&[]);
        assert_eq!(map.ms_at(1.0), 1000.0);
        assert_eq!(map.ms_at(4.0), 4000.0);
    }

    #[test]
    fn constant_tempo_regression() {
        // The canonical fixed-tempo scenario: 120 bpm, then 90 at beat 2,
        // then 1 bpm at beat 5, with a param at beat 4 and length 6.
        let score = Score {
            events: vec![
                tempo(0.0, 120.0, false),
                note(0.0, 1.0, 440.0),
                note(1.0, 2.0, 550.0),
                tempo(2.0, 90.0, false),
                note(2.0, 3.0, 660.0),
                ScoreEvent::Param {
                    time: 4.0,
                    value: ParamValue::Osc {
                        osc: "sine".to_string(),
                    },
                },
                tempo(5.0, 1.0, false),
            ],
            length: 6.0,
        };

        let real = to_real_time(&score);
        assert_eq!(
            real.events,
            vec![
                RealTimeEvent::Note {
                    ms: 0.0,
                    ms_end: 500.0,
                    hz: 440.0,
                    label: String::new(),
                },
                RealTimeEvent::Note {
                    ms: 500.0,
                    ms_end: 1000.0,
                    hz: 550.0,
                    label: String::new(),
                },
                RealTimeEvent::Note {
                    ms: 1000.0,
                    ms_end: 1666.6666666666665,
                    hz: 660.0,
                    label: String::new(),
                },
                RealTimeEvent::Param {
                    ms: 2333.333333333333,
                    value: ParamValue::Osc {
                        osc: "sine".to_string(),
                    },
                },
            ]
        );
        assert_eq!(real.length_ms, 63000.0);
    }

    #[test]
    fn lerp_tempo_regression() {
        // 120 bpm at beat 1 ramping linearly down to 60 bpm at beat 4.
        let score = Score {
            events: vec![
                tempo(0.0, 120.0, false),
                tempo(1.0, 120.0, false),
                tempo(4.0, 60.0, true),
                note(1.0, 1.0, 440.0),
                note(2.0, 2.0, 550.0),
                note(3.0, 3.0, 660.0),
                note(4.0, 4.0, 770.0),
                note(5.0, 5.0, 880.0),
            ],
            length: 5.0,
        };

        let real = to_real_time(&score);
        let times: Vec<f64> = real
            .events
            .iter()
            .filter_map(|event| match event {
                RealTimeEvent::Note { ms, .. } => Some(*ms),
                _ => None,
            })
            .collect();
        assert_eq!(
            times,
            vec![
                500.0,
                1166.6666666666665,
                1833.3333333333333,
                2500.0,
                3500.0
            ]
        );
        assert_eq!(real.length_ms, 3500.0);
    }

    #[test]
    fn sort_is_stable_for_tied_times() {
        let score = Score {
            events: vec![
                note(0.0, 1.0, 111.0),
                note(0.0, 1.0, 222.0),
                note(0.0, 1.0, 333.0),
            ],
            length: 1.0,
        };
        let real = to_real_time(&score);
        let hz: Vec<f64> = real
            .events
            .iter()
            .filter_map(|event| match event {
                RealTimeEvent::Note { hz, .. } => Some(*hz),
                _ => None,
            })
            .collect();
        assert_eq!(hz, vec![111.0, 222.0, 333.0]);
    }

    #[test]
    fn later_tempo_wins_at_tied_beat() {
        let score = Score {
            events: vec![
                tempo(0.0, 120.0, false),
                tempo(0.0, 60.0, false),
                note(0.0, 1.0, 440.0),
            ],
            length: 1.0,
        };
        let real = to_real_time(&score);
        match &real.events[0] {
            RealTimeEvent::Note { ms_end, .. } => assert_eq!(*ms_end, 1000.0),
            other => panic!("expected note, got {other:?}"),
        }
    }

    #[test]
    fn time_before_first_segment_uses_first() {
        let map = TempoMap::from_events(&[tempo(2.0, 120.0, false)]);
        // Before beat 2 the implicit 60 bpm segment applies.
        assert_eq!(map.ms_at(1.0), 1000.0);
        assert_eq!(map.ms_at(3.0), 2000.0 + 500.0);
    }

    #[test]
    fn tempo_events_dropped_from_output() {
        let score = Score {
            events: vec![tempo(0.0, 120.0, false), ScoreEvent::End { time: 2.0 }],
            length: 2.0,
        };
        let real = to_real_time(&score);
        assert_eq!(real.events, vec![RealTimeEvent::End { ms: 1000.0 }]);
    }
}
