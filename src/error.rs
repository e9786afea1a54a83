use std::fmt;

use thiserror::Error;

/// Boxed static error type, used for grammar loading and the CLI
pub type Err = Box<dyn std::error::Error + 'static>;

/// Why the chart parser could not produce a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
  EmptyInput,
  TooLong { length: usize, max: usize },
  /// No candidate tag for the word, even through the unknown-word signatures
  UnknownWord { word: String, index: usize },
  NoSpanningDerivation,
}

impl fmt::Display for FailureReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::EmptyInput => write!(f, "empty input"),
      Self::TooLong { length, max } => {
        write!(f, "sentence of {} tokens exceeds the limit of {}", length, max)
      }
      Self::UnknownWord { word, index } => write!(f, "no tag for {}-{}", word, index),
      Self::NoSpanningDerivation => write!(f, "no derivation spans the input"),
    }
  }
}

/// Errors surfaced by the parser, the normalizer and the dependency extractor.
/// All of them are terminal for the call that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("parse failure: {reason}")]
  ParseFailure { reason: FailureReason },

  #[error("invalid tree shape: {0}")]
  InvalidTreeShape(String),

  #[error("no grammatical structure for root category '{root}'")]
  NoGrammaticalStructure { root: String },
}

impl ParseError {
  pub fn failure(reason: FailureReason) -> Self {
    Self::ParseFailure { reason }
  }

  pub fn shape(msg: impl Into<String>) -> Self {
    Self::InvalidTreeShape(msg.into())
  }
}
