use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::error::ParseError;

#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<T> {
  pub value: T,
  pub span: (usize, usize),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Word<U> {
  pub value: U,
  pub span: (usize, usize),
}

impl<U> Word<U> {
  /// 1-based position of the word in the sentence
  pub fn index(&self) -> usize {
    self.span.0 + 1
  }
}

#[derive(Debug, PartialEq, Clone)]
pub enum SynTree<T, U> {
  Branch(Constituent<T>, Vec<SynTree<T, U>>),
  Leaf(Word<U>),
}

impl<T, U> SynTree<T, U> {
  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn is_branch(&self) -> bool {
    matches!(self, Self::Branch(_, _))
  }

  pub fn get_leaf(&self) -> Option<&Word<U>> {
    match self {
      Self::Leaf(w) => Some(w),
      _ => None,
    }
  }

  pub fn get_branch(&self) -> Option<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  pub fn span(&self) -> (usize, usize) {
    match self {
      Self::Branch(c, _) => c.span,
      Self::Leaf(w) => w.span,
    }
  }

  pub fn children(&self) -> &[SynTree<T, U>] {
    match self {
      Self::Branch(_, cs) => cs,
      Self::Leaf(_) => &[],
    }
  }

  pub fn child(&self, idx: usize) -> Option<&SynTree<T, U>> {
    self.children().get(idx)
  }

  pub fn first_child(&self) -> Option<&SynTree<T, U>> {
    self.child(0)
  }

  /// A branch whose only child is a leaf
  pub fn is_preterminal(&self) -> bool {
    matches!(self, Self::Branch(_, cs) if cs.len() == 1 && cs[0].is_leaf())
  }

  /// The words of the tree, left to right
  pub fn leaves(&self) -> Vec<&Word<U>> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Word<U>>) {
    match self {
      Self::Leaf(w) => out.push(w),
      Self::Branch(_, cs) => cs.iter().for_each(|c| c.collect_leaves(out)),
    }
  }

  pub fn map<V, W>(
    &self,
    map_branch: &impl Fn(&Constituent<T>) -> V,
    map_leaf: &impl Fn(&Word<U>) -> W,
  ) -> SynTree<V, W> {
    match self {
      Self::Branch(t, children) => {
        let children = children
          .iter()
          .map(|c| c.map(map_branch, map_leaf))
          .collect::<Vec<_>>();
        SynTree::Branch(
          Constituent {
            span: t.span,
            value: map_branch(t),
          },
          children,
        )
      }
      Self::Leaf(u) => SynTree::Leaf(Word {
        span: u.span,
        value: map_leaf(u),
      }),
    }
  }

  /// Checks the structural invariants: every branch has children, leaves
  /// occupy consecutive single-word spans left to right, and every branch
  /// spans exactly its children.
  pub fn check_shape(&self) -> Result<(), ParseError> {
    let mut next = self.span().0;
    self.check_shape_from(&mut next)
  }

  fn check_shape_from(&self, next: &mut usize) -> Result<(), ParseError> {
    match self {
      Self::Leaf(w) => {
        if w.span != (*next, *next + 1) {
          return Err(ParseError::shape(format!(
            "leaf at {}..{} where {}..{} was expected",
            w.span.0,
            w.span.1,
            *next,
            *next + 1
          )));
        }
        *next += 1;
        Ok(())
      }
      Self::Branch(c, children) => {
        if children.is_empty() {
          return Err(ParseError::shape(format!(
            "branch at {}..{} has no children",
            c.span.0, c.span.1
          )));
        }
        let start = *next;
        for child in children {
          child.check_shape_from(next)?;
        }
        if c.span != (start, *next) {
          return Err(ParseError::shape(format!(
            "branch spans {}..{} but its children cover {}..{}",
            c.span.0, c.span.1, start, *next
          )));
        }
        Ok(())
      }
    }
  }
}

/// The lexical head a parser constituent was built around
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HeadWord {
  pub word: String,
  pub index: usize,
  pub tag: String,
}

/// A category annotated with parser bookkeeping
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Annotated {
  pub category: String,
  pub head: HeadWord,
  pub score: Score,
}

/// Viterbi log score; compared bitwise so trees stay `Eq`
#[derive(Debug, Copy, Clone)]
pub struct Score(pub f64);

impl PartialEq for Score {
  fn eq(&self, other: &Self) -> bool {
    self.0.to_bits() == other.0.to_bits()
  }
}

impl Eq for Score {}

/// Node labels: the parser emits `Internal` labels, consumers see plain
/// `Category` labels after normalization.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Label {
  Internal(Annotated),
  Category(String),
}

impl Label {
  pub fn category(&self) -> &str {
    match self {
      Self::Internal(a) => &a.category,
      Self::Category(c) => c,
    }
  }

  pub fn is_internal(&self) -> bool {
    matches!(self, Self::Internal(_))
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Internal(a) => write!(
        f,
        "{}[{}-{}/{}]",
        a.category, a.head.word, a.head.index, a.head.tag
      ),
      Self::Category(c) => write!(f, "{}", c),
    }
  }
}

pub type ParseTree = SynTree<Label, String>;

impl ParseTree {
  /// The label of the node, `None` for words
  pub fn label(&self) -> Option<&str> {
    self.get_branch().map(|(c, _)| c.value.category())
  }

  /// Labels of the node's children, words shown as themselves
  pub fn child_labels(&self) -> Vec<&str> {
    self
      .children()
      .iter()
      .map(|c| match c {
        SynTree::Branch(cons, _) => cons.value.category(),
        SynTree::Leaf(w) => w.value.as_str(),
      })
      .collect()
  }

  pub fn words(&self) -> Vec<&str> {
    self.leaves().into_iter().map(|w| w.value.as_str()).collect()
  }

  /// Penn Treebank bracketing on one line: `(ROOT (S (NP (DT every) ...)))`
  pub fn bracketed(&self) -> Bracketed<'_> {
    Bracketed(self)
  }
}

pub struct Bracketed<'a>(&'a ParseTree);

impl fmt::Display for Bracketed<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0 {
      SynTree::Leaf(w) => write!(f, "{}", w.value),
      SynTree::Branch(c, children) => {
        write!(f, "({}", c.value)?;
        for child in children {
          write!(f, " {}", child.bracketed())?;
        }
        write!(f, ")")
      }
    }
  }
}

/// Reads a Penn Treebank bracketing. Labels come out as `Label::Category`
/// and words are numbered left to right.
impl FromStr for ParseTree {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    lazy_static! {
      static ref TOKEN: Regex = Regex::new(r"\(|\)|[^\s()]+").unwrap();
    }

    let tokens = TOKEN.find_iter(s).map(|m| m.as_str()).collect::<Vec<_>>();
    let mut pos = 0;
    let mut words = 0;
    let tree = read_node(&tokens, &mut pos, &mut words)?;
    if pos != tokens.len() {
      return Err(ParseError::shape(format!(
        "trailing input after tree: {}",
        tokens[pos..].join(" ")
      )));
    }
    Ok(tree)
  }
}

fn read_node(tokens: &[&str], pos: &mut usize, words: &mut usize) -> Result<ParseTree, ParseError> {
  match tokens.get(*pos) {
    None => Err(ParseError::shape("unexpected end of bracketing")),
    Some(&")") => Err(ParseError::shape("unexpected ')'")),
    Some(&"(") => {
      *pos += 1;
      let label = match tokens.get(*pos) {
        Some(t) if *t != "(" && *t != ")" => {
          *pos += 1;
          t.to_string()
        }
        // "( (S ...))" style outer brackets
        _ => "ROOT".to_string(),
      };
      let start = *words;
      let mut children = Vec::new();
      loop {
        match tokens.get(*pos) {
          None => return Err(ParseError::shape(format!("unclosed bracket for {}", label))),
          Some(&")") => {
            *pos += 1;
            break;
          }
          _ => children.push(read_node(tokens, pos, words)?),
        }
      }
      if children.is_empty() {
        return Err(ParseError::shape(format!("{} has no children", label)));
      }
      Ok(SynTree::Branch(
        Constituent {
          value: Label::Category(label),
          span: (start, *words),
        },
        children,
      ))
    }
    Some(word) => {
      *pos += 1;
      *words += 1;
      Ok(SynTree::Leaf(Word {
        value: word.to_string(),
        span: (*words - 1, *words),
      }))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SVO: &str = "(ROOT (S (NP (DT every) (JJ male) (NN student)) (VP (VBP read) (NP (DT some) (NN book)))))";

  #[test]
  fn test_bracketed_round_trip() {
    let tree: ParseTree = SVO.parse().unwrap();
    assert_eq!(tree.bracketed().to_string(), SVO);
    assert_eq!(tree.label(), Some("ROOT"));
    assert_eq!(tree.first_child().unwrap().child_labels(), vec!["NP", "VP"]);
    assert_eq!(
      tree.words(),
      vec!["every", "male", "student", "read", "some", "book"]
    );
    assert_eq!(tree.leaves()[3].index(), 4);
    assert!(tree.check_shape().is_ok());
  }

  #[test]
  fn test_bracketed_errors() {
    assert!("(S (NP dog)".parse::<ParseTree>().is_err());
    assert!("(S (NP))".parse::<ParseTree>().is_err());
    assert!("(S dog))".parse::<ParseTree>().is_err());
  }

  #[test]
  fn test_check_shape() {
    let bad_span = SynTree::Branch(
      Constituent {
        value: Label::Category("NN".into()),
        span: (0, 2),
      },
      vec![SynTree::Leaf(Word {
        value: "dog".to_string(),
        span: (0, 1),
      })],
    );
    assert!(matches!(bad_span.check_shape(), Err(ParseError::InvalidTreeShape(_))));

    let empty: ParseTree = SynTree::Branch(
      Constituent {
        value: Label::Category("S".into()),
        span: (0, 0),
      },
      vec![],
    );
    assert!(empty.check_shape().is_err());
  }

  #[test]
  fn test_internal_label_display() {
    let label = Label::Internal(Annotated {
      category: "NP".into(),
      head: HeadWord {
        word: "student".into(),
        index: 3,
        tag: "NN".into(),
      },
      score: Score(-1.5),
    });
    assert_eq!(label.to_string(), "NP[student-3/NN]");
    assert_eq!(label.category(), "NP");
  }
}
