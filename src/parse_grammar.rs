use regex::Regex;
/// Simple recursive-descent parsing of .pcfg grammar files
use std::str::FromStr;

use crate::grammar::{AffinityTerm, Grammar, GrammarBuilder, Signature};
use crate::rules::{Production, Symbol};
use crate::Err;

impl FromStr for Grammar {
  type Err = Err;

  /// Parses a grammar from a string. Assumes the first rule's symbol
  /// is the start symbol.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (builder, rest) = parse_statements(s)?;
    debug_assert!(rest.is_empty());
    builder.build()
  }
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  match re.find(s) {
    Some(m) if m.start() == 0 => {
      let (_, rest) = s.split_at(m.end());
      (Some(m.as_str()), rest)
    }
    _ => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", re, excerpt(s)).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", c, excerpt(s)).into())
  }
}

fn excerpt(s: &str) -> &str {
  let end = s
    .char_indices()
    .nth(40)
    .map(|(idx, _)| idx)
    .unwrap_or(s.len());
  &s[..end]
}

/// Skips whitespace and // comments
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"(?:\s+|//[^\n]*)+");
  optional_re(&WHITESPACE_OR_COMMENT, s).1
}

fn parse_keyword<'a>(kw: &str, s: &'a str) -> Infallible<'a, bool> {
  match s.strip_prefix(kw) {
    Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest),
    _ => (false, s),
  }
}

/// Categories: upper-case names (NP, PRP$, NP-TMP), bracket tags (-LRB-),
/// or runs of punctuation (. , : `` '')
fn parse_category(s: &str) -> ParseResult<'_, &str> {
  regex_static!(
    CATEGORY,
    r"-[A-Z]+-|[A-Z][A-Za-z0-9_$]*(?:-[A-Za-z0-9_$]+)*|[.,:`'#$]+"
  );
  needed_re(&CATEGORY, s).map_err(|e| format!("category: {}", e).into())
}

/// Terminals: bare lower-case words, or anything in double quotes
fn parse_terminal(s: &str) -> ParseResult<'_, String> {
  regex_static!(BARE, r#"[a-z0-9][^\s;()"*]*"#);
  regex_static!(QUOTED, r#""[^"]*""#);
  if let (Some(q), rest) = optional_re(&QUOTED, s) {
    Ok((q[1..q.len() - 1].to_string(), rest))
  } else {
    let (w, rest) = needed_re(&BARE, s).map_err(|e| -> Err { format!("terminal: {}", e).into() })?;
    Ok((w.to_string(), rest))
  }
}

fn is_terminal_start(s: &str) -> bool {
  s.starts_with('"') || s.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// `(0.25)`, defaulting to 1 when absent
fn parse_prob(s: &str) -> ParseResult<'_, f64> {
  regex_static!(NUMBER, r"[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?");
  let (open, s) = optional_char('(', s);
  if open.is_none() {
    return Ok((1.0, s));
  }
  let s = skip_whitespace(s);
  let (num, s) = needed_re(&NUMBER, s).map_err(|e| -> Err { format!("probability: {}", e).into() })?;
  let s = skip_whitespace(s);
  let (_, s) = needed_char(')', s)?;
  let prob = num
    .parse::<f64>()
    .map_err(|e| format!("probability {}: {}", num, e))?;
  Ok((prob, s))
}

/// A production with an optional head marker
fn parse_production(s: &str) -> ParseResult<'_, (Production, bool)> {
  let (prod, s) = if is_terminal_start(s) {
    let (w, s) = parse_terminal(s)?;
    (Production::Terminal(w), s)
  } else {
    let (name, s) = parse_category(s)?;
    (Production::Nonterminal(Symbol::new(name)), s)
  };
  let (star, s) = optional_char('*', s);
  Ok(((prod, star.is_some()), s))
}

/// Symbol, productions, optional probability, terminated by ;
fn parse_rule<'a>(s: &'a str, builder: &mut GrammarBuilder) -> ParseResult<'a, ()> {
  #![allow(clippy::trivial_regex)]
  regex_static!(ARROW, "->");

  let (symbol, s) = parse_category(s).map_err(|e| -> Err { format!("rule symbol: {}", e).into() })?;
  let s = skip_whitespace(s);
  let (_, s) = needed_re(&ARROW, s).map_err(|e| -> Err { format!("rule arrow: {}", e).into() })?;

  let mut productions = Vec::new();
  let mut head = None;
  let mut rem = skip_whitespace(s);
  while !rem.starts_with('(') && !rem.starts_with(';') {
    let ((prod, is_head), s) =
      parse_production(rem).map_err(|e| -> Err { format!("rule production: {}", e).into() })?;
    if is_head {
      if head.is_some() {
        return Err(format!("rule for {} marks more than one head", symbol).into());
      }
      head = Some(productions.len());
    }
    productions.push(prod);
    rem = skip_whitespace(s);
  }

  if productions.is_empty() {
    return Err(format!("rule for {} has no productions", symbol).into());
  }

  let (prob, s) = parse_prob(rem)?;
  let s = skip_whitespace(s);
  let (_, s) = needed_char(';', s)?;

  let head = head.unwrap_or(productions.len() - 1);
  builder.push(symbol, productions, head, prob)?;
  Ok(((), s))
}

/// unknown <signature> -> TAG (p);
fn parse_unknown<'a>(s: &'a str, builder: &mut GrammarBuilder) -> ParseResult<'a, ()> {
  regex_static!(SIGNATURE, "[a-z]+");
  regex_static!(ARROW, "->");

  let s = skip_whitespace(s);
  let (name, s) = needed_re(&SIGNATURE, s)?;
  let signature = Signature::from_name(name).ok_or_else(|| format!("unknown signature class {}", name))?;
  let s = skip_whitespace(s);
  let (_, s) = needed_re(&ARROW, s)?;
  let s = skip_whitespace(s);
  let (tag, s) = parse_category(s)?;
  let s = skip_whitespace(s);
  let (prob, s) = parse_prob(s)?;
  let s = skip_whitespace(s);
  let (_, s) = needed_char(';', s)?;

  builder.unknown(signature, tag, prob)?;
  Ok(((), s))
}

fn parse_affinity_term(s: &str) -> ParseResult<'_, AffinityTerm> {
  if is_terminal_start(s) {
    let (w, s) = parse_terminal(s)?;
    Ok((AffinityTerm::Word(w), s))
  } else {
    let (t, s) = parse_category(s)?;
    Ok((AffinityTerm::Tag(t.to_string()), s))
  }
}

/// affinity PARENT HEAD DEPENDENT (p);
fn parse_affinity<'a>(s: &'a str, builder: &mut GrammarBuilder) -> ParseResult<'a, ()> {
  let s = skip_whitespace(s);
  let (parent, s) = parse_category(s)?;
  let s = skip_whitespace(s);
  let (head, s) = parse_affinity_term(s)?;
  let s = skip_whitespace(s);
  let (dependent, s) = parse_affinity_term(s)?;
  let s = skip_whitespace(s);
  let (prob, s) = parse_prob(s)?;
  let s = skip_whitespace(s);
  let (_, s) = needed_char(';', s)?;

  builder.affinity(parent, head, dependent, prob)?;
  Ok(((), s))
}

fn parse_statements(s: &str) -> ParseResult<'_, GrammarBuilder> {
  let mut builder = GrammarBuilder::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok((builder, rem));
    }

    let (is_unknown, after_unknown) = parse_keyword("unknown", rem);
    let (is_affinity, after_affinity) = parse_keyword("affinity", rem);
    let (_, s) = if is_unknown {
      parse_unknown(after_unknown, &mut builder)?
    } else if is_affinity {
      parse_affinity(after_affinity, &mut builder)?
    } else {
      parse_rule(rem, &mut builder)?
    };
    rem = s;
  }
}
