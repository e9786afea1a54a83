use std::fmt;

/// A word of the sentence as seen by a dependency: surface form and 1-based
/// position. Position 0 is the artificial root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenRef {
  pub word: String,
  pub index: usize,
}

impl TokenRef {
  pub fn new(word: impl Into<String>, index: usize) -> Self {
    Self {
      word: word.into(),
      index,
    }
  }

  pub fn root() -> Self {
    Self::new("ROOT", 0)
  }

  pub fn is_root(&self) -> bool {
    self.index == 0
  }
}

impl fmt::Display for TokenRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.word, self.index)
  }
}

/// A labelled edge from governor to dependent, shown as `det(dog-3, some-1)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedDependency {
  pub relation: String,
  pub governor: TokenRef,
  pub dependent: TokenRef,
}

impl TypedDependency {
  pub fn new(relation: impl Into<String>, governor: TokenRef, dependent: TokenRef) -> Self {
    Self {
      relation: relation.into(),
      governor,
      dependent,
    }
  }

  /// Relation name without a collapsed word suffix: `conj_and` -> `conj`
  pub fn short_name(&self) -> &str {
    self
      .relation
      .split_once('_')
      .map(|(short, _)| short)
      .unwrap_or(&self.relation)
  }

  /// The word folded into a collapsed relation: `prep_on` -> `on`
  pub fn specific(&self) -> Option<&str> {
    self.relation.split_once('_').map(|(_, word)| word)
  }
}

impl fmt::Display for TypedDependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({}, {})", self.relation, self.governor, self.dependent)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_and_names() {
    let dep = TypedDependency::new("conj_and", TokenRef::new("read", 4), TokenRef::new("kissed", 8));
    assert_eq!(dep.to_string(), "conj_and(read-4, kissed-8)");
    assert_eq!(dep.short_name(), "conj");
    assert_eq!(dep.specific(), Some("and"));

    let det = TypedDependency::new("det", TokenRef::new("dog", 3), TokenRef::new("some", 1));
    assert_eq!(det.short_name(), "det");
    assert_eq!(det.specific(), None);
    assert!(TokenRef::root().is_root());
  }
}
