use std::fmt;

use regex::Regex;

/// A word of the input sentence and its 1-based position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
  pub word: String,
  pub index: usize,
}

impl Token {
  pub fn new(word: impl Into<String>, index: usize) -> Self {
    Self {
      word: word.into(),
      index,
    }
  }

  /// Numbers the words left to right, starting at 1
  pub fn sequence<S: AsRef<str>>(words: &[S]) -> Vec<Token> {
    words
      .iter()
      .enumerate()
      .map(|(idx, w)| Token::new(w.as_ref(), idx + 1))
      .collect()
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.word, self.index)
  }
}

/// A small Penn-Treebank-flavoured tokenizer: splits on whitespace, then
/// detaches punctuation, possessive/contraction clitics and "n't".
/// Hyphenated words and decimal numbers stay whole.
pub fn tokenize(sentence: &str) -> Vec<Token> {
  lazy_static! {
    static ref PIECE: Regex = Regex::new(
      r"(?x)
        [0-9]+(?:[.,][0-9]+)+
      | [\p{L}\p{N}\p{M}]+(?:[-'][\p{L}\p{N}\p{M}]+)*
      | \.\.\.
      | ``|''
      | [^\s\p{L}\p{N}\p{M}]
      "
    )
    .unwrap();
  }

  let words = PIECE
    .find_iter(sentence)
    .flat_map(|m| split_clitic(m.as_str()))
    .collect::<Vec<_>>();
  Token::sequence(&words)
}

const CLITICS: [&str; 6] = ["s", "re", "ve", "ll", "d", "m"];

fn split_clitic(word: &str) -> Vec<&str> {
  let lower = word.to_ascii_lowercase();
  if lower.len() > 3 && lower.ends_with("n't") {
    let (stem, neg) = word.split_at(word.len() - 3);
    return vec![stem, neg];
  }
  if let Some(apos) = word.rfind('\'') {
    if apos > 0 && CLITICS.contains(&&lower[apos + 1..]) {
      let (stem, clitic) = word.split_at(apos);
      return vec![stem, clitic];
    }
  }
  vec![word]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(s: &str) -> Vec<String> {
    tokenize(s).into_iter().map(|t| t.word).collect()
  }

  #[test]
  fn test_tokenize_plain() {
    let toks = tokenize("some female dog bites every student");
    assert_eq!(toks.len(), 6);
    assert_eq!(toks[0], Token::new("some", 1));
    assert_eq!(toks[5].to_string(), "student-6");
  }

  #[test]
  fn test_tokenize_punctuation_and_clitics() {
    assert_eq!(
      words("The dog's bone isn't here, is it?"),
      vec!["The", "dog", "'s", "bone", "is", "n't", "here", ",", "is", "it", "?"]
    );
    assert_eq!(words("a well-known 3.5 result."), vec!["a", "well-known", "3.5", "result", "."]);
  }

  #[test]
  fn test_tokenize_non_ascii_words() {
    assert_eq!(
      words("the café serves naïve students"),
      vec!["the", "café", "serves", "naïve", "students"]
    );
    assert_eq!(words("Zoë's crème-brûlée, ça va?"), vec!["Zoë", "'s", "crème-brûlée", ",", "ça", "va", "?"]);
    // combining accents stay on their letter
    assert_eq!(words("cafe\u{301} ok"), vec!["cafe\u{301}", "ok"]);
  }
}
