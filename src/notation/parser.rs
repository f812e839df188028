//! Recursive-descent parser for Xenpaper notation.
//!
//! Works directly over characters. Alternatives are tried in a fixed order
//! with backtracking, so the first grammar rule that matches at a position
//! wins. All delimiters are kept as nodes and every node records its span,
//! which keeps the sequence's item spans tiling the whole source.

use super::ast::*;
use super::error::ParseError;

pub struct Parser {
    chars: Vec<char>,
    pos: usize,
}

/// Parse a complete notation document.
///
/// Fails if any input remains after the sequence, reporting the line and
/// column of the first character nothing could match. Empty and param-only
/// input yields an AST with no sequence.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    let mut parser = Parser::new(source);

    let param_group = parser.try_param_group();
    let sequence = parser.parse_sequence();

    if parser.pos < parser.chars.len() {
        let (line, col) = parser.line_col(parser.pos);
        let ch = parser.chars[parser.pos];
        return Err(ParseError::new(
            format!("unexpected character {ch:?}"),
            parser.pos,
            line,
            col,
        ));
    }

    Ok(Ast {
        param_group,
        sequence: (!sequence.items.is_empty()).then_some(sequence),
    })
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn line_col(&self, pos: usize) -> (usize, usize) {
        let mut line = 1;
        let mut line_start = 0;
        for (i, &c) in self.chars.iter().enumerate().take(pos) {
            if c == '\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        (line, pos - line_start + 1)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let start = self.pos;
        for c in s.chars() {
            if !self.eat(c) {
                self.pos = start;
                return false;
            }
        }
        true
    }

    fn eat_str_ci(&mut self, s: &str) -> bool {
        let start = self.pos;
        for c in s.chars() {
            match self.peek() {
                Some(got) if got.eq_ignore_ascii_case(&c) => self.pos += 1,
                _ => {
                    self.pos = start;
                    return false;
                }
            }
        }
        true
    }

    fn eat_spaces(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn try_digits(&mut self) -> Option<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    fn try_integer(&mut self) -> Option<u64> {
        let start = self.pos;
        match self.try_digits()?.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    fn try_single_digit(&mut self) -> Option<u32> {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => {
                self.pos += 1;
                c.to_digit(10)
            }
            _ => None,
        }
    }

    /// An unsigned decimal number. When `bare_dot` is set a trailing dot
    /// with no fraction digits is accepted (`1.` reads as 1).
    fn try_decimal(&mut self, bare_dot: bool) -> Option<f64> {
        let start = self.pos;
        let mut text = self.try_digits()?;
        let after_int = self.pos;
        if self.eat('.') {
            match self.try_digits() {
                Some(frac) => {
                    text.push('.');
                    text.push_str(&frac);
                }
                None if bare_dot => text.push('.'),
                None => self.pos = after_int,
            }
        }
        match text.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    //
    // delimiters
    //

    /// Whitespace and commas are interchangeable separators.
    fn try_whitespace(&mut self) -> Option<Span> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c == ',' || c.is_whitespace()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(Span::new(start, self.pos - start))
    }

    /// A colon plus any trailing whitespace.
    fn try_colon(&mut self) -> Option<Span> {
        let start = self.pos;
        if !self.eat(':') {
            return None;
        }
        self.eat_spaces();
        Some(Span::new(start, self.pos - start))
    }

    /// A semicolon plus any trailing whitespace.
    fn try_semicolon(&mut self) -> Option<Span> {
        let start = self.pos;
        if !self.eat(';') {
            return None;
        }
        self.eat_spaces();
        Some(Span::new(start, self.pos - start))
    }

    //
    // pitches
    //

    /// `'` up an octave, `"` up two, backtick down one. Quotes may run
    /// together; backticks form their own run.
    fn try_octave_modifier(&mut self) -> Option<i32> {
        let mut octave = 0i32;
        match self.peek() {
            Some('\'') | Some('"') => {
                while let Some(c) = self.peek() {
                    match c {
                        '\'' => octave += 1,
                        '"' => octave += 2,
                        _ => break,
                    }
                    self.pos += 1;
                }
                Some(octave)
            }
            Some('`') => {
                while self.eat('`') {
                    octave -= 1;
                }
                Some(octave)
            }
            _ => None,
        }
    }

    fn try_pitch_value(&mut self) -> Option<PitchValue> {
        let start = self.pos;

        // cents, e.g. 702c or 386.3c
        if let Some(cents) = self.try_decimal(true) {
            if self.eat('c') {
                return Some(PitchValue::Cents { cents });
            }
            self.pos = start;
        }

        // hz, e.g. 440hz / 440Hz
        if let Some(hz) = self.try_decimal(true) {
            if self.eat_str_ci("hz") {
                return Some(PitchValue::Hz { hz });
            }
            self.pos = start;
        }

        // octave division with explicit equave, e.g. 11\19o3 or 3/13o3/2
        if let Some(value) = self.try_octave_division_with_equave() {
            return Some(value);
        }

        // octave division, e.g. 7\12
        if let Some((numerator, denominator)) = self.try_backslash_fraction() {
            return Some(PitchValue::OctaveDivision {
                numerator,
                denominator,
                equave_size: 2.0,
            });
        }

        // ratio, e.g. 5/4
        if let Some(numerator) = self.try_integer() {
            if self.eat('/') {
                if let Some(denominator) = self.try_integer() {
                    return Some(PitchValue::Ratio {
                        numerator,
                        denominator,
                    });
                }
            }
            self.pos = start;
        }

        // scale degree, e.g. 4
        let degree = self.try_integer()?;
        Some(PitchValue::Degree {
            degree: degree as i64,
        })
    }

    fn try_octave_division_with_equave(&mut self) -> Option<PitchValue> {
        let start = self.pos;
        let numerator = self.try_integer()?;
        if !self.eat('\\') && !self.eat('/') {
            self.pos = start;
            return None;
        }
        let denominator = match self.try_integer() {
            Some(n) => n,
            None => {
                self.pos = start;
                return None;
            }
        };
        if !self.eat('o') {
            self.pos = start;
            return None;
        }
        let size = self.try_single_digit().map(f64::from).unwrap_or(2.0);
        let denom = {
            let mark = self.pos;
            if self.eat('/') {
                match self.try_single_digit() {
                    Some(d) => f64::from(d),
                    None => {
                        self.pos = mark;
                        1.0
                    }
                }
            } else {
                1.0
            }
        };
        Some(PitchValue::OctaveDivision {
            numerator,
            denominator,
            equave_size: size / denom,
        })
    }

    fn try_backslash_fraction(&mut self) -> Option<(u64, u64)> {
        let start = self.pos;
        let numerator = self.try_integer()?;
        if !self.eat('\\') {
            self.pos = start;
            return None;
        }
        match self.try_integer() {
            Some(denominator) => Some((numerator, denominator)),
            None => {
                self.pos = start;
                None
            }
        }
    }

    fn try_pitch(&mut self) -> Option<Pitch> {
        let start = self.pos;
        let octave = self.try_octave_modifier().unwrap_or(0);
        match self.try_pitch_value() {
            Some(value) => Some(Pitch {
                octave,
                value,
                span: Span::new(start, self.pos - start),
            }),
            None => {
                self.pos = start;
                None
            }
        }
    }

    //
    // notes and rests
    //

    /// One or more dashes, each optionally preceded by a bar line.
    fn try_hold(&mut self) -> Option<Hold> {
        let start = self.pos;
        let mut length = 0u32;
        loop {
            let mark = self.pos;
            if self.eat('|') {
                if self.eat('-') {
                    length += 1;
                } else {
                    self.pos = mark;
                    break;
                }
            } else if self.eat('-') {
                length += 1;
            } else {
                break;
            }
        }
        if length == 0 {
            return None;
        }
        Some(Hold {
            length,
            span: Span::new(start, self.pos - start),
        })
    }

    fn try_note(&mut self) -> Option<Note> {
        let start = self.pos;
        let pitch = self.try_pitch()?;
        let tail = self.try_hold();
        Some(Note {
            pitch,
            tail,
            span: Span::new(start, self.pos - start),
        })
    }

    fn try_rest(&mut self) -> Option<Rest> {
        let start = self.pos;
        if !self.eat('.') {
            return None;
        }
        Some(Rest {
            length: 1,
            span: Span::new(start, 1),
        })
    }

    //
    // chords
    //

    fn try_ratio_pitch(&mut self) -> Option<RatioPitch> {
        let start = self.pos;
        let value = self.try_integer()?;
        Some(RatioPitch {
            value,
            span: Span::new(start, self.pos - start),
        })
    }

    /// Colon-separated integers, e.g. `4:5:6`. Colon runs like `4::7` are
    /// legal and kept verbatim for the compiler's interpolation pass.
    fn try_ratio_group(&mut self) -> Option<Vec<RatioGroupItem>> {
        let start = self.pos;
        let mut items = vec![RatioGroupItem::Pitch(self.try_ratio_pitch()?)];

        loop {
            let mark = self.pos;
            let mut colons = Vec::new();
            while let Some(span) = self.try_colon() {
                colons.push(RatioGroupItem::Colon(span));
            }
            if colons.is_empty() {
                break;
            }
            match self.try_ratio_pitch() {
                Some(pitch) => {
                    items.extend(colons);
                    items.push(RatioGroupItem::Pitch(pitch));
                }
                None => {
                    self.pos = mark;
                    break;
                }
            }
        }

        if items.len() == 1 {
            self.pos = start;
            return None;
        }
        Some(items)
    }

    /// Whitespace-separated pitches, e.g. `0 4 7`.
    fn try_pitch_group(&mut self) -> Option<Vec<PitchGroupItem>> {
        let mut items = vec![PitchGroupItem::Pitch(self.try_pitch()?)];
        loop {
            let mark = self.pos;
            let whitespace = match self.try_whitespace() {
                Some(span) => span,
                None => break,
            };
            match self.try_pitch() {
                Some(pitch) => {
                    items.push(PitchGroupItem::Whitespace(whitespace));
                    items.push(PitchGroupItem::Pitch(pitch));
                }
                None => {
                    self.pos = mark;
                    break;
                }
            }
        }
        Some(items)
    }

    fn try_chord(&mut self) -> Option<Chord> {
        let start = self.pos;
        if !self.eat('[') {
            return None;
        }
        let pitches = match self.try_ratio_group() {
            Some(ratios) => ChordPitches::Ratios(ratios),
            None => match self.try_pitch_group() {
                Some(pitches) => ChordPitches::Pitches(pitches),
                None => {
                    self.pos = start;
                    return None;
                }
            },
        };
        if !self.eat(']') {
            self.pos = start;
            return None;
        }
        let tail = self.try_hold();
        Some(Chord {
            pitches,
            tail,
            span: Span::new(start, self.pos - start),
        })
    }

    fn try_ratio_chord(&mut self) -> Option<RatioChord> {
        let start = self.pos;
        let pitches = self.try_ratio_group()?;
        let tail = self.try_hold();
        Some(RatioChord {
            pitches,
            tail,
            span: Span::new(start, self.pos - start),
        })
    }

    //
    // scales
    //

    fn try_edo_scale(&mut self) -> Option<EdoScale> {
        let start = self.pos;
        let divisions = match self.try_integer() {
            Some(n) => n as u32,
            None => return None,
        };
        if !self.eat_str_ci("ed") {
            self.pos = start;
            return None;
        }
        let equave_size = if self.eat('o') || self.eat('O') {
            // a /digit after the o form is accepted and ignored
            let mark = self.pos;
            if self.eat('/') && self.try_single_digit().is_none() {
                self.pos = mark;
            }
            2.0
        } else {
            match self.try_single_digit() {
                Some(d) => {
                    let mark = self.pos;
                    let denom = if self.eat('/') {
                        match self.try_single_digit() {
                            Some(d) => f64::from(d),
                            None => {
                                self.pos = mark;
                                1.0
                            }
                        }
                    } else {
                        1.0
                    };
                    f64::from(d) / denom
                }
                None => {
                    self.pos = start;
                    return None;
                }
            }
        };
        Some(EdoScale {
            divisions,
            equave_size,
            span: Span::new(start, self.pos - start),
        })
    }

    fn try_scale(&mut self) -> Option<ScaleDef> {
        if let Some(edo) = self.try_edo_scale() {
            return Some(ScaleDef::Edo(edo));
        }

        let start = self.pos;
        if let Some(pitches) = self.try_ratio_group() {
            let equave_marker = self.eat('\'');
            return Some(ScaleDef::RatioChord(RatioChordScale {
                pitches,
                equave_marker,
                span: Span::new(start, self.pos - start),
            }));
        }

        let prefix = if self.eat('m') {
            self.eat_spaces();
            Some("m".to_string())
        } else {
            None
        };
        match self.try_pitch_group() {
            Some(pitches) => {
                let equave_marker = self.eat('\'');
                Some(ScaleDef::PitchGroup(PitchGroupScale {
                    prefix,
                    pitches,
                    equave_marker,
                    span: Span::new(start, self.pos - start),
                }))
            }
            None => {
                self.pos = start;
                None
            }
        }
    }

    fn try_set_scale(&mut self) -> Option<SetScale> {
        let start = self.pos;
        if !self.eat('{') {
            return None;
        }
        let scale = match self.try_scale() {
            Some(scale) => scale,
            None => {
                self.pos = start;
                return None;
            }
        };
        if !self.eat('}') {
            self.pos = start;
            return None;
        }
        Some(SetScale {
            scale,
            span: Span::new(start, self.pos - start),
        })
    }

    fn try_set_root(&mut self) -> Option<SetRoot> {
        let start = self.pos;
        if !self.eat_str("{r") {
            return None;
        }
        let pitch = match self.try_pitch() {
            Some(pitch) => pitch,
            None => {
                self.pos = start;
                return None;
            }
        };
        if !self.eat('}') {
            self.pos = start;
            return None;
        }
        Some(SetRoot {
            pitch,
            span: Span::new(start, self.pos - start),
        })
    }

    //
    // setters
    //

    fn try_setter_kind(&mut self) -> Option<SetterKind> {
        let start = self.pos;

        if self.eat_str("bpm:") {
            self.eat_spaces();
            if let Some(bpm) = self.try_decimal(false) {
                return Some(SetterKind::Bpm { bpm });
            }
            self.pos = start;
        }

        if self.eat_str("bms:") {
            self.eat_spaces();
            if let Some(bms) = self.try_decimal(false) {
                return Some(SetterKind::Bms { bms });
            }
            self.pos = start;
        }

        // subdivision, with or without the div: prefix
        {
            self.eat_str("div:");
            self.eat_spaces();
            if let Some(numerator) = self.try_integer() {
                let mark = self.pos;
                let denominator = if self.eat('/') {
                    match self.try_single_digit() {
                        Some(d) => Some(d),
                        None => {
                            self.pos = mark;
                            None
                        }
                    }
                } else {
                    None
                };
                return Some(SetterKind::Subdivision {
                    numerator: numerator as u32,
                    denominator,
                });
            }
            self.pos = start;
        }

        if self.eat_str("osc:") {
            self.eat_spaces();
            let name_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit()) {
                self.pos += 1;
            }
            let name: String = self.chars[name_start..self.pos].iter().collect();
            return Some(SetterKind::Osc { name });
        }

        if self.eat_str("env:") {
            self.eat_spaces();
            let digits = (
                self.try_single_digit(),
                self.try_single_digit(),
                self.try_single_digit(),
                self.try_single_digit(),
            );
            if let (Some(a), Some(d), Some(s), Some(r)) = digits {
                return Some(SetterKind::Env {
                    a: a as u8,
                    d: d as u8,
                    s: s as u8,
                    r: r as u8,
                });
            }
            self.pos = start;
        }

        if self.eat_str("primes:") {
            self.eat_spaces();
            if let Some(pitches) = self.try_pitch_group() {
                return Some(SetterKind::Primes { pitches });
            }
            self.pos = start;
        }

        if self.eat_str("rl:") {
            if let Some(low) = self.try_pitch() {
                if self.eat(',') {
                    if let Some(high) = self.try_pitch() {
                        return Some(SetterKind::RulerRange { low, high });
                    }
                }
            }
            self.pos = start;
        }

        if self.eat_str("plot") {
            return Some(SetterKind::RulerPlot);
        }

        None
    }

    fn try_setter(&mut self) -> Option<Setter> {
        let start = self.pos;
        let kind = self.try_setter_kind()?;
        Some(Setter {
            kind,
            span: Span::new(start, self.pos - start),
        })
    }

    fn try_setter_group(&mut self) -> Option<SetterGroup> {
        let start = self.pos;
        if !self.eat('(') {
            return None;
        }
        let mut setters = match self.try_setter() {
            Some(setter) => vec![SetterItem::Setter(setter)],
            None => {
                self.pos = start;
                return None;
            }
        };
        loop {
            let mark = self.pos;
            let semicolon = match self.try_semicolon() {
                Some(span) => span,
                None => break,
            };
            match self.try_setter() {
                Some(setter) => {
                    setters.push(SetterItem::Semicolon(semicolon));
                    setters.push(SetterItem::Setter(setter));
                }
                None => {
                    self.pos = mark;
                    break;
                }
            }
        }
        if !self.eat(')') {
            self.pos = start;
            return None;
        }
        Some(SetterGroup {
            setters,
            span: Span::new(start, self.pos - start),
        })
    }

    //
    // comments, sequence, params
    //

    fn try_comment(&mut self) -> Option<Comment> {
        let start = self.pos;
        if !self.eat('#') {
            return None;
        }
        let text_start = self.pos;
        while matches!(self.peek(), Some(c) if c != '\n') {
            self.pos += 1;
        }
        Some(Comment {
            text: self.chars[text_start..self.pos].iter().collect(),
            span: Span::new(start, self.pos - start),
        })
    }

    fn try_sequence_item(&mut self) -> Option<SequenceItem> {
        if let Some(comment) = self.try_comment() {
            return Some(SequenceItem::Comment(comment));
        }
        if let Some(chord) = self.try_ratio_chord() {
            return Some(SequenceItem::RatioChord(chord));
        }
        if let Some(note) = self.try_note() {
            return Some(SequenceItem::Note(note));
        }
        if let Some(chord) = self.try_chord() {
            return Some(SequenceItem::Chord(chord));
        }
        if let Some(rest) = self.try_rest() {
            return Some(SequenceItem::Rest(rest));
        }
        if let Some(group) = self.try_setter_group() {
            return Some(SequenceItem::SetterGroup(group));
        }
        if let Some(scale) = self.try_set_scale() {
            return Some(SequenceItem::SetScale(scale));
        }
        if let Some(root) = self.try_set_root() {
            return Some(SequenceItem::SetRoot(root));
        }
        if self.eat('|') {
            return Some(SequenceItem::BarLine(Span::new(self.pos - 1, 1)));
        }
        if let Some(span) = self.try_whitespace() {
            return Some(SequenceItem::Whitespace(span));
        }
        None
    }

    fn parse_sequence(&mut self) -> Sequence {
        let start = self.pos;
        let mut items = Vec::new();
        while let Some(item) = self.try_sequence_item() {
            items.push(item);
        }
        Sequence {
            items,
            span: Span::new(start, self.pos - start),
        }
    }

    fn try_param_group(&mut self) -> Option<ParamGroup> {
        let start = self.pos;
        if !self.eat_str("embed") {
            return None;
        }
        let mut embeds = 1;
        loop {
            let mark = self.pos;
            if self.try_semicolon().is_none() {
                break;
            }
            if self.eat_str("embed") {
                embeds += 1;
            } else {
                self.pos = mark;
                break;
            }
        }
        if !self.eat(':') {
            self.pos = start;
            return None;
        }
        Some(ParamGroup {
            embeds,
            span: Span::new(start, self.pos - start),
        })
    }
}
