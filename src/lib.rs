//! Xenpaper — a text-based microtonal sequencing notation.
//!
//! The pipeline has three stages: [`notation::parser`] turns source text
//! into an AST, [`notation::compile`] folds the AST into a beat-time
//! [`score::Score`], and [`score::timing`] resolves beats to milliseconds.

pub mod notation;
pub mod score;
