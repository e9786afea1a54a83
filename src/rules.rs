use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
  pub name: String,
}

impl Symbol {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Production {
  Terminal(String),
  Nonterminal(Symbol),
}

impl Production {
  pub fn symbol_str(&self) -> &str {
    match self {
      Self::Terminal(s) => s,
      Self::Nonterminal(s) => &s.name,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Terminal(_))
  }

  pub fn is_nonterminal(&self) -> bool {
    matches!(self, Self::Nonterminal(_))
  }
}

impl fmt::Display for Production {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Terminal(s) => write!(f, "{:?}", s),
      Self::Nonterminal(s) => write!(f, "{}", s),
    }
  }
}

/// Position of a rule in the grammar's declaration order. Lower ids win ties.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

/// A weighted phrase-structure production. `head` indexes the production
/// that supplies the lexical head of the constituent.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
  pub id: RuleId,
  pub symbol: Symbol,
  pub productions: Vec<Production>,
  pub head: usize,
  /// Natural log of the rule probability, always <= 0
  pub logprob: f64,
}

impl Rule {
  pub fn len(&self) -> usize {
    self.productions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_unary(&self) -> bool {
    self.len() == 1 && self.productions[0].is_nonterminal()
  }

  /// A preterminal rule: TAG -> word
  pub fn is_lexical(&self) -> bool {
    self.len() == 1 && self.productions[0].is_terminal()
  }

  pub fn symbol_str(&self) -> &str {
    &self.symbol.name
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ->", self.symbol)?;
    for (idx, p) in self.productions.iter().enumerate() {
      write!(f, " {}", p)?;
      if idx == self.head && self.len() > 1 {
        write!(f, "*")?;
      }
    }
    write!(f, " ({:.4})", self.logprob.exp())
  }
}
