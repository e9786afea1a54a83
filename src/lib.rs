#[macro_use]
extern crate lazy_static;

pub mod chart;
pub mod deps;
pub mod error;
pub mod extract;
pub mod grammar;
pub mod heads;
pub mod normalize;
pub mod parse_grammar;
pub mod relations;
pub mod rules;
pub mod syntree;
pub mod token;

use std::sync::Arc;

pub use crate::chart::{Parser, ParserOptions};
pub use crate::deps::{TokenRef, TypedDependency};
pub use crate::error::{Err, FailureReason, ParseError};
pub use crate::extract::{DependencyExtractor, ExtractorOptions};
pub use crate::grammar::Grammar;
pub use crate::normalize::normalize;
pub use crate::syntree::{Label, ParseTree};
pub use crate::token::{tokenize, Token};

/// Sentence in, canonical tree and typed dependencies out.
///
/// Holds a reusable chart, so `best_parse` needs `&mut self`. The grammar
/// is shared; build one `SentenceParser` per thread from the same
/// `Arc<Grammar>`.
#[derive(Debug)]
pub struct SentenceParser {
  parser: Parser,
  extractor: DependencyExtractor,
}

impl SentenceParser {
  pub fn new(grammar: Arc<Grammar>) -> Self {
    Self::with_options(grammar, ParserOptions::default(), ExtractorOptions::default())
  }

  pub fn with_options(grammar: Arc<Grammar>, parser: ParserOptions, extractor: ExtractorOptions) -> Self {
    Self {
      parser: Parser::with_options(grammar, parser),
      extractor: DependencyExtractor::with_options(extractor),
    }
  }

  pub fn grammar(&self) -> &Arc<Grammar> {
    self.parser.grammar()
  }

  /// Tokenizes, parses, and normalizes `sentence`
  pub fn best_parse(&mut self, sentence: &str) -> Result<ParseTree, ParseError> {
    let tokens = tokenize(sentence);
    self.best_parse_tokens(&tokens)
  }

  pub fn best_parse_tokens(&mut self, tokens: &[Token]) -> Result<ParseTree, ParseError> {
    let raw = self.parser.best_parse(tokens)?;
    normalize(&raw)
  }

  /// The parser's tree before normalization, with heads and scores
  pub fn raw_parse(&mut self, sentence: &str) -> Result<ParseTree, ParseError> {
    self.parser.best_parse(&tokenize(sentence))
  }

  pub fn typed_dependencies(&self, tree: &ParseTree) -> Result<Vec<TypedDependency>, ParseError> {
    self.extractor.extract(tree)
  }
}

#[test]
fn test_sentence_parser() {
  let g: Grammar = r#"
    ROOT -> S;
    S -> NP VP*;
    NP -> DT NN*;
    VP -> VBZ* NP;
    DT -> the;
    DT -> a;
    NN -> dog;
    NN -> bone;
    VBZ -> wants;
  "#
  .parse()
  .unwrap();

  let mut parser = SentenceParser::new(Arc::new(g));
  let tree = parser.best_parse("the dog wants a bone").unwrap();
  assert_eq!(
    tree.bracketed().to_string(),
    "(ROOT (S (NP (DT the) (NN dog)) (VP (VBZ wants) (NP (DT a) (NN bone)))))"
  );

  let deps = parser
    .typed_dependencies(&tree)
    .unwrap()
    .iter()
    .map(|d| d.to_string())
    .collect::<Vec<_>>();
  assert_eq!(
    deps,
    vec![
      "det(dog-2, the-1)",
      "nsubj(wants-3, dog-2)",
      "det(bone-5, a-4)",
      "dobj(wants-3, bone-5)",
    ]
  );

  assert!(parser.raw_parse("the dog wants a bone").unwrap().label().is_some());
  assert!(matches!(
    parser.best_parse("   "),
    Err(ParseError::ParseFailure {
      reason: FailureReason::EmptyInput
    })
  ));
}
