//! Full pipeline integration tests — notation text → parse → compile →
//! real-time score.

use assert_approx_eq::assert_approx_eq;
use xenpaper::notation::{Compiler, Error, SequenceItem};
use xenpaper::score::{ParamValue, RealTimeEvent, RealTimeScore};

/// Helper: render source and return only the note events.
fn render_notes(source: &str) -> Vec<(f64, f64, f64, String)> {
    let (score, _) = Compiler::render(source)
        .expect("render failed")
        .expect("nothing to score");
    score
        .events
        .iter()
        .filter_map(|event| match event {
            RealTimeEvent::Note {
                ms,
                ms_end,
                hz,
                label,
            } => Some((*ms, *ms_end, *hz, label.clone())),
            _ => None,
        })
        .collect()
}

fn render(source: &str) -> RealTimeScore {
    Compiler::render(source)
        .expect("render failed")
        .expect("nothing to score")
        .0
}

#[test]
fn timeline_with_tempo_changes() {
    // Whole-beat steps at the seeded 120 bpm, dropping to 90 and then
    // crawling at 1 bpm for the final beat.
    let source = "(1)0 0 (bpm:90)0 . (osc:sine) . (bpm:1) .";
    let score = render(source);

    let notes = render_notes(source);
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[0].0, 0.0);
    assert_eq!(notes[0].1, 500.0);
    assert_eq!(notes[1].0, 500.0);
    assert_eq!(notes[1].1, 1000.0);
    assert_eq!(notes[2].0, 1000.0);
    assert_eq!(notes[2].1, 1666.6666666666665);

    let sine_ms = score
        .events
        .iter()
        .find_map(|event| match event {
            RealTimeEvent::Param {
                ms,
                value: ParamValue::Osc { osc },
            } if osc == "sine" => Some(*ms),
            _ => None,
        })
        .expect("sine param missing");
    assert_eq!(sine_ms, 2333.333333333333);

    assert_eq!(score.length_ms, 63000.0);
}

#[test]
fn default_subdivision_is_an_eighth() {
    // 120 bpm and half-beat steps: 250 ms per note.
    let notes = render_notes("0 0 0 0");
    assert_eq!(notes.len(), 4);
    for (i, (ms, ms_end, _, _)) in notes.iter().enumerate() {
        assert_eq!(*ms, i as f64 * 250.0);
        assert_eq!(*ms_end, (i as f64 + 1.0) * 250.0);
    }
}

#[test]
fn chords_and_scales_compose() {
    let notes = render_notes("{19edo}(bpm:90)[0 6 11]-");
    assert_eq!(notes.len(), 3);
    for (ms, ms_end, _, _) in &notes {
        assert_eq!(*ms, 0.0);
        // two subdivisions at 90 bpm
        assert_approx_eq!(*ms_end, 60000.0 / 90.0);
    }
    assert_approx_eq!(notes[0].2, 220.0);
    assert_approx_eq!(notes[1].2, 220.0 * 2f64.powf(6.0 / 19.0));
    assert_approx_eq!(notes[2].2, 220.0 * 2f64.powf(11.0 / 19.0));
}

#[test]
fn harmonic_interpolation_end_to_end() {
    let notes = render_notes("4::7");
    let labels: Vec<&str> = notes.iter().map(|(_, _, _, label)| label.as_str()).collect();
    assert_eq!(labels, vec!["4/4", "5/4", "6/4", "7/4"]);
}

#[test]
fn note_labels_reparse_to_the_same_frequencies() {
    // Every label a note carries must resolve back to the same hz when fed
    // through the pitch grammar in the same (default) context.
    let source = "1/1 5/4 3/2 702c 440hz 7\\12 4 4:5:6";
    let notes = render_notes(source);
    assert!(!notes.is_empty());

    let relabeled: String = notes
        .iter()
        .map(|(_, _, _, label)| label.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let reparsed = render_notes(&relabeled);

    assert_eq!(notes.len(), reparsed.len());
    for ((_, _, hz, label), (_, _, hz2, _)) in notes.iter().zip(&reparsed) {
        assert_approx_eq!(*hz, *hz2, 1e-9);
        assert!(!label.is_empty());
    }
}

#[test]
fn item_spans_cover_every_character_once() {
    let source = "embed:{7ed3}(bpm:90; osc:pulse) 0 4 '2--|[4:5:6]-- .. # end\n5/4";
    let ast = Compiler::parse(source).expect("parse failed");

    let mut pos = ast
        .param_group
        .as_ref()
        .map(|p| p.span.len as usize)
        .unwrap_or(0);
    let sequence = ast.sequence.as_ref().expect("sequence missing");
    for item in &sequence.items {
        let span = item.span();
        assert_eq!(span.offset as usize, pos, "gap before item {item:?}");
        pos += span.len as usize;
    }
    assert_eq!(pos, source.chars().count());

    // Delimiters are explicit items rather than holes.
    assert!(sequence
        .items
        .iter()
        .any(|item| matches!(item, SequenceItem::Whitespace(_))));
}

#[test]
fn item_times_follow_the_tempo() {
    let compiled = Compiler::compile("(bpm:60)0 4")
        .expect("compile failed")
        .expect("nothing to score");
    assert_eq!(compiled.times.len(), 2);
    assert_eq!(compiled.times[0].ms, 0.0);
    assert_eq!(compiled.times[0].ms_end, 500.0);
    assert_eq!(compiled.times[1].ms, 500.0);
    assert_eq!(compiled.times[1].ms_end, 1000.0);
}

#[test]
fn ruler_state_comes_back_with_the_score() {
    let (_, ruler) = Compiler::render("(rl:110hz,880hz){r5/4}0")
        .expect("render failed")
        .expect("nothing to score");
    assert_eq!(ruler.low_hz, Some(110.0));
    assert_eq!(ruler.high_hz, Some(880.0));
    assert_eq!(ruler.root_hz, Some(275.0));
    assert_eq!(ruler.equave_size, Some(2.0));
}

#[test]
fn parse_errors_carry_position() {
    match Compiler::compile("0 4\n7 %") {
        Err(Error::Parse(err)) => {
            assert_eq!(err.line, 2);
            assert_eq!(err.col, 3);
            assert!(err.to_string().starts_with("[2:3]"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn compile_errors_are_not_parse_errors() {
    match Compiler::compile("{m2 5/4}") {
        Err(Error::Compile(err)) => {
            assert!(err.to_string().contains("Mode scales"));
        }
        other => panic!("expected compile error, got {other:?}"),
    }

    match Compiler::compile("25000hz") {
        Err(Error::Compile(err)) => {
            assert!(err.to_string().contains("Hz"));
        }
        other => panic!("expected compile error, got {other:?}"),
    }
}

#[test]
fn failed_compiles_return_no_score() {
    assert!(Compiler::render("0 4 99999hz").is_err());
}

#[test]
fn empty_and_param_only_sources_yield_no_score() {
    assert!(Compiler::render("").expect("render failed").is_none());
    assert!(Compiler::render("embed:").expect("render failed").is_none());
}

#[test]
fn comment_only_sources_render_an_empty_score() {
    let score = render("# just a comment\n");
    assert_eq!(score.length_ms, 0.0);
    assert!(matches!(score.events.last(), Some(RealTimeEvent::End { ms }) if *ms == 0.0));
}
