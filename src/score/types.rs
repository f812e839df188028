//! Score data model — the output of the notation compiler.
//!
//! A [`Score`] is an ordered list of events in abstract beat time. The time
//! engine ([`crate::score::timing`]) converts it to a [`RealTimeScore`] with
//! millisecond coordinates, at which point tempo events have been consumed
//! and no longer appear.

use serde::Serialize;

/// Sound-parameter payload carried by a [`ScoreEvent::Param`] event.
///
/// Opaque to the pipeline — produced by setters, forwarded verbatim to
/// whatever plays the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamValue {
    /// Oscillator choice, e.g. "triangle", "sine", "saw4".
    Osc { osc: String },
    /// Envelope in seconds (attack, decay, release) and level (sustain).
    Env { a: f64, d: f64, s: f64, r: f64 },
}

/// A single event in beat time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreEvent {
    /// Tempo change. `lerp` marks the arriving end of a ramp: the previous
    /// tempo interpolates toward this one across the intervening beats.
    Tempo { time: f64, bpm: f64, lerp: bool },
    /// A pitched note spanning `time..time_end`.
    Note {
        time: f64,
        time_end: f64,
        hz: f64,
        label: String,
    },
    /// Sound-parameter change.
    Param { time: f64, value: ParamValue },
    /// Total sequence length marker; always last, exactly one per score.
    End { time: f64 },
}

impl ScoreEvent {
    /// Beat time at which this event occurs.
    pub fn time(&self) -> f64 {
        match self {
            ScoreEvent::Tempo { time, .. }
            | ScoreEvent::Note { time, .. }
            | ScoreEvent::Param { time, .. }
            | ScoreEvent::End { time } => *time,
        }
    }
}

/// An ordered beat-time score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub events: Vec<ScoreEvent>,
    /// Total length in beats (mirrors the `End` event).
    pub length: f64,
}

/// A single event in real (wall-clock) time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealTimeEvent {
    Note {
        ms: f64,
        ms_end: f64,
        hz: f64,
        label: String,
    },
    Param { ms: f64, value: ParamValue },
    End { ms: f64 },
}

impl RealTimeEvent {
    pub fn ms(&self) -> f64 {
        match self {
            RealTimeEvent::Note { ms, .. }
            | RealTimeEvent::Param { ms, .. }
            | RealTimeEvent::End { ms } => *ms,
        }
    }
}

/// A score resolved to millisecond coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealTimeScore {
    pub events: Vec<RealTimeEvent>,
    pub length_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_time_accessor() {
        let tempo = ScoreEvent::Tempo {
            time: 2.0,
            bpm: 120.0,
            lerp: false,
        };
        assert_eq!(tempo.time(), 2.0);

        let note = ScoreEvent::Note {
            time: 1.5,
            time_end: 2.0,
            hz: 440.0,
            label: "0\\12".to_string(),
        };
        assert_eq!(note.time(), 1.5);

        let end = ScoreEvent::End { time: 8.0 };
        assert_eq!(end.time(), 8.0);
    }

    #[test]
    fn param_value_serializes_tagged() {
        let osc = ParamValue::Osc {
            osc: "triangle".to_string(),
        };
        let json = serde_json::to_string(&osc).unwrap();
        assert_eq!(json, r#"{"type":"osc","osc":"triangle"}"#);

        let env = ParamValue::Env {
            a: 0.006,
            d: 3.3,
            s: 0.5,
            r: 0.33,
        };
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.starts_with(r#"{"type":"env""#));
    }

    #[test]
    fn note_event_serializes_with_type_tag() {
        let note = RealTimeEvent::Note {
            ms: 0.0,
            ms_end: 500.0,
            hz: 440.0,
            label: "1/1".to_string(),
        };
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains(r#""type":"note""#));
        assert!(json.contains(r#""ms_end":500.0"#));
    }
}
