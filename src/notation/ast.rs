//! Abstract syntax tree for Xenpaper notation.
//!
//! Every node carries a [`Span`] locating it in the source, so downstream
//! consumers (error reporting, highlighting) can map nodes back to
//! characters. Delimiters — whitespace, colons, semicolons — are explicit
//! nodes: the spans of a sequence's items tile its entire source range with
//! no gaps. Nodes are immutable once parsed; the compiler attaches computed
//! timing to a side table instead of writing back into the tree.

/// A source range in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: u32,
    pub len: u32,
}

impl Span {
    pub fn new(offset: usize, len: usize) -> Self {
        Self {
            offset: offset as u32,
            len: len as u32,
        }
    }
}

/// The pitch-specifying part of a [`Pitch`].
#[derive(Debug, Clone, PartialEq)]
pub enum PitchValue {
    /// A just ratio, e.g. `5/4`.
    Ratio { numerator: u64, denominator: u64 },
    /// Cents above the root, e.g. `702c`.
    Cents { cents: f64 },
    /// An absolute frequency, e.g. `440hz`.
    Hz { hz: f64 },
    /// Steps of an equal division of an equave, e.g. `7\12` or `11/19o3`.
    OctaveDivision {
        numerator: u64,
        denominator: u64,
        equave_size: f64,
    },
    /// A degree of the current scale, e.g. `4`.
    Degree { degree: i64 },
}

/// A pitch: a value plus the net octave shift from `'` / `"` / backtick
/// modifiers (0 when none are present).
#[derive(Debug, Clone, PartialEq)]
pub struct Pitch {
    pub octave: i32,
    pub value: PitchValue,
    pub span: Span,
}

/// A hold tail extending the previous note: `('|'? '-')+`.
/// `length` counts dashes; the span also covers interleaved bar lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Hold {
    pub length: u32,
    pub span: Span,
}

/// One or more rest dots.
#[derive(Debug, Clone, PartialEq)]
pub struct Rest {
    pub length: u32,
    pub span: Span,
}

/// A single pitched note with an optional hold tail.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub pitch: Pitch,
    pub tail: Option<Hold>,
    pub span: Span,
}

/// A `#`-to-end-of-line comment. `text` excludes the `#`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

/// One integer term of a ratio chord.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioPitch {
    pub value: u64,
    pub span: Span,
}

/// An element of a colon-separated ratio list. Colons are kept so the
/// compiler can count runs (`::` triggers harmonic-series interpolation).
#[derive(Debug, Clone, PartialEq)]
pub enum RatioGroupItem {
    Pitch(RatioPitch),
    Colon(Span),
}

/// An element of a whitespace-separated pitch list.
#[derive(Debug, Clone, PartialEq)]
pub enum PitchGroupItem {
    Pitch(Pitch),
    Whitespace(Span),
}

/// The bracketed contents of a chord: either a ratio list (`[4:5:6]`) or a
/// plain pitch list (`[0,4,7]`).
#[derive(Debug, Clone, PartialEq)]
pub enum ChordPitches {
    Ratios(Vec<RatioGroupItem>),
    Pitches(Vec<PitchGroupItem>),
}

/// A bracketed chord with an optional hold tail.
#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    pub pitches: ChordPitches,
    pub tail: Option<Hold>,
    pub span: Span,
}

/// An unbracketed ratio chord, e.g. `4:5:6`.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioChord {
    pub pitches: Vec<RatioGroupItem>,
    pub tail: Option<Hold>,
    pub span: Span,
}

/// An equal-division scale, e.g. `{19edo}` or `{13ed3}`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdoScale {
    pub divisions: u32,
    pub equave_size: f64,
    pub span: Span,
}

/// A scale given as a ratio chord, e.g. `{4:5:6:7:8}`. A trailing `'`
/// (equave marker) turns the last term into the equave instead of a member.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioChordScale {
    pub pitches: Vec<RatioGroupItem>,
    pub equave_marker: bool,
    pub span: Span,
}

/// A scale given as a pitch list, e.g. `{0 2 4 5 7 9 11}` or
/// `{m2 2 1 2 2 2 1}` (mode-by-steps when the prefix is `m`).
#[derive(Debug, Clone, PartialEq)]
pub struct PitchGroupScale {
    pub prefix: Option<String>,
    pub pitches: Vec<PitchGroupItem>,
    pub equave_marker: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleDef {
    Edo(EdoScale),
    RatioChord(RatioChordScale),
    PitchGroup(PitchGroupScale),
}

/// `{...}` — replace the current scale.
#[derive(Debug, Clone, PartialEq)]
pub struct SetScale {
    pub scale: ScaleDef,
    pub span: Span,
}

/// `{r...}` — move the root pitch, relative to the current root.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRoot {
    pub pitch: Pitch,
    pub span: Span,
}

/// What a single setter does.
#[derive(Debug, Clone, PartialEq)]
pub enum SetterKind {
    Bpm { bpm: f64 },
    Bms { bms: f64 },
    Subdivision { numerator: u32, denominator: Option<u32> },
    Osc { name: String },
    Env { a: u8, d: u8, s: u8, r: u8 },
    Primes { pitches: Vec<PitchGroupItem> },
    RulerRange { low: Pitch, high: Pitch },
    RulerPlot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Setter {
    pub kind: SetterKind,
    pub span: Span,
}

/// An element of a `(...)` setter group; semicolon delimiters are explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum SetterItem {
    Setter(Setter),
    Semicolon(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetterGroup {
    pub setters: Vec<SetterItem>,
    pub span: Span,
}

/// One item of the top-level sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceItem {
    Comment(Comment),
    RatioChord(RatioChord),
    Note(Note),
    Chord(Chord),
    Rest(Rest),
    SetterGroup(SetterGroup),
    SetScale(SetScale),
    SetRoot(SetRoot),
    BarLine(Span),
    Whitespace(Span),
}

impl SequenceItem {
    pub fn span(&self) -> Span {
        match self {
            SequenceItem::Comment(n) => n.span,
            SequenceItem::RatioChord(n) => n.span,
            SequenceItem::Note(n) => n.span,
            SequenceItem::Chord(n) => n.span,
            SequenceItem::Rest(n) => n.span,
            SequenceItem::SetterGroup(n) => n.span,
            SequenceItem::SetScale(n) => n.span,
            SequenceItem::SetRoot(n) => n.span,
            SequenceItem::BarLine(span) | SequenceItem::Whitespace(span) => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub items: Vec<SequenceItem>,
    pub span: Span,
}

/// The leading `embed:` group carrying URL-embed display flags.
/// Parsed for completeness; the compiler ignores it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGroup {
    pub embeds: usize,
    pub span: Span,
}

/// A parsed notation document.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub param_group: Option<ParamGroup>,
    pub sequence: Option<Sequence>,
}
