use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::rules::{Production, Rule, RuleId, Symbol};
use crate::Err;

/// Interned category name
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// The label of a chart item: either a real category, or a contiguous run
/// `lo..=hi` of a rule's children that already contains its head child.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ItemLabel {
  Category(SymbolId),
  Partial(RuleId, u16, u16),
}

/// One step of a binarized rule: `left + right => result`
#[derive(Debug, Clone)]
pub struct BinaryStep {
  pub rule: RuleId,
  pub parent: SymbolId,
  pub right: ItemLabel,
  pub result: ItemLabel,
  /// Whether the head of the result comes from the left item
  pub head_left: bool,
  /// Only the final step of a rule carries its log-probability
  pub logprob: f64,
}

/// Word shape classes used to guess tags for out-of-vocabulary words,
/// listed from most to least specific
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
  Num,
  Cap,
  Ing,
  Ed,
  Ly,
  S,
  Any,
}

impl Signature {
  pub const ALL: [Signature; 7] = [
    Self::Num,
    Self::Cap,
    Self::Ing,
    Self::Ed,
    Self::Ly,
    Self::S,
    Self::Any,
  ];

  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|s| s.name() == name)
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Num => "num",
      Self::Cap => "cap",
      Self::Ing => "ing",
      Self::Ed => "ed",
      Self::Ly => "ly",
      Self::S => "s",
      Self::Any => "any",
    }
  }

  pub fn matches(&self, word: &str) -> bool {
    lazy_static! {
      static ref NUMBER: Regex = Regex::new(r"^[+-]?[0-9][0-9.,/:\-]*$").unwrap();
    }
    match self {
      Self::Num => NUMBER.is_match(word),
      Self::Cap => word.chars().next().is_some_and(char::is_uppercase),
      Self::Ing => word.len() > 4 && word.ends_with("ing"),
      Self::Ed => word.len() > 3 && word.ends_with("ed"),
      Self::Ly => word.len() > 3 && word.ends_with("ly"),
      Self::S => word.len() > 2 && word.ends_with('s') && !word.ends_with("ss"),
      Self::Any => true,
    }
  }
}

/// One side of a head-compatibility entry: a specific word or a tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AffinityTerm {
  Word(String),
  Tag(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum AffinityKey {
  Word(String),
  Tag(SymbolId),
}

/// The lexical side of an item taking part in a combination
#[derive(Debug, Copy, Clone)]
pub struct HeadInfo<'a> {
  pub word: &'a str,
  pub tag: SymbolId,
}

fn check_prob(prob: f64) -> Result<f64, Err> {
  if prob > 0.0 && prob <= 1.0 {
    Ok(prob.ln())
  } else {
    Err(format!("probability must be in (0, 1], got {}", prob).into())
  }
}

/// Collects rules, lexical entries and smoothing tables, then freezes them
/// into a `Grammar`. The first rule's symbol is the start symbol.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
  rules: Vec<Rule>,
  unknown: Vec<(Signature, String, f64)>,
  affinities: Vec<(String, AffinityTerm, AffinityTerm, f64)>,
}

impl GrammarBuilder {
  pub fn new() -> Self {
    Default::default()
  }

  /// Adds `symbol -> children` with the head at `head`. Children are
  /// nonterminals; use `lexical` for preterminal entries.
  pub fn rule(&mut self, symbol: &str, children: &[&str], head: usize, prob: f64) -> Result<&mut Self, Err> {
    if children.is_empty() {
      return Err(format!("rule for {} has no children", symbol).into());
    }
    if head >= children.len() {
      return Err(format!("head index {} out of range for {} ({} children)", head, symbol, children.len()).into());
    }
    let productions = children
      .iter()
      .map(|c| Production::Nonterminal(Symbol::new(*c)))
      .collect();
    self.push(symbol, productions, head, prob)?;
    Ok(self)
  }

  /// Adds a preterminal entry `tag -> word`
  pub fn lexical(&mut self, tag: &str, word: &str, prob: f64) -> Result<&mut Self, Err> {
    self.push(tag, vec![Production::Terminal(word.to_string())], 0, prob)?;
    Ok(self)
  }

  pub fn unknown(&mut self, signature: Signature, tag: &str, prob: f64) -> Result<&mut Self, Err> {
    self.unknown.push((signature, tag.to_string(), check_prob(prob)?));
    Ok(self)
  }

  pub fn affinity(
    &mut self,
    parent: &str,
    head: AffinityTerm,
    dependent: AffinityTerm,
    prob: f64,
  ) -> Result<&mut Self, Err> {
    self
      .affinities
      .push((parent.to_string(), head, dependent, check_prob(prob)?));
    Ok(self)
  }

  pub(crate) fn push(
    &mut self,
    symbol: &str,
    productions: Vec<Production>,
    head: usize,
    prob: f64,
  ) -> Result<(), Err> {
    if productions.len() > 1 && productions.iter().any(Production::is_terminal) {
      return Err(format!("terminals are only allowed in lexical rules: {}", symbol).into());
    }
    let logprob = check_prob(prob)?;
    self.rules.push(Rule {
      id: RuleId(self.rules.len() as u32),
      symbol: Symbol::new(symbol),
      productions,
      head,
      logprob,
    });
    Ok(())
  }

  pub fn build(self) -> Result<Grammar, Err> {
    if self.rules.is_empty() {
      return Err("empty ruleset".into());
    }
    Ok(Grammar::new(self.rules, self.unknown, self.affinities))
  }
}

/// A read-only lexicalized PCFG. Shareable across threads once built.
#[derive(Debug)]
pub struct Grammar {
  start: SymbolId,
  symbols: Vec<String>,
  symbol_ids: HashMap<String, SymbolId>,
  rules: Vec<Rule>,
  lexicon: HashMap<String, Vec<(SymbolId, f64)>>,
  unknown: HashMap<Signature, Vec<(SymbolId, f64)>>,
  unary: HashMap<SymbolId, Vec<(SymbolId, f64)>>,
  steps: HashMap<ItemLabel, Vec<BinaryStep>>,
  by_left: HashMap<String, Vec<RuleId>>,
  by_right: HashMap<String, Vec<RuleId>>,
  affinity: HashMap<(SymbolId, AffinityKey, AffinityKey), f64>,
  lexical_affinity: bool,
}

impl Grammar {
  fn new(
    rules: Vec<Rule>,
    unknown: Vec<(Signature, String, f64)>,
    affinities: Vec<(String, AffinityTerm, AffinityTerm, f64)>,
  ) -> Self {
    let mut g = Self {
      start: SymbolId(0),
      symbols: Vec::new(),
      symbol_ids: HashMap::new(),
      rules: Vec::new(),
      lexicon: HashMap::new(),
      unknown: HashMap::new(),
      unary: HashMap::new(),
      steps: HashMap::new(),
      by_left: HashMap::new(),
      by_right: HashMap::new(),
      affinity: HashMap::new(),
      lexical_affinity: false,
    };

    g.start = g.intern(rules[0].symbol_str());

    for rule in rules.iter() {
      let parent = g.intern(rule.symbol_str());

      if rule.is_lexical() {
        let word = rule.productions[0].symbol_str().to_string();
        g.lexicon
          .entry(word)
          .or_insert_with(Vec::new)
          .push((parent, rule.logprob));
        continue;
      }

      let children = rule
        .productions
        .iter()
        .map(|p| g.intern(p.symbol_str()))
        .collect::<Vec<_>>();

      g.by_left
        .entry(rule.productions[0].symbol_str().to_string())
        .or_insert_with(Vec::new)
        .push(rule.id);
      g.by_right
        .entry(rule.productions[rule.len() - 1].symbol_str().to_string())
        .or_insert_with(Vec::new)
        .push(rule.id);

      if rule.is_unary() {
        g.unary
          .entry(children[0])
          .or_insert_with(Vec::new)
          .push((parent, rule.logprob));
        continue;
      }

      for step in Self::binarize(rule, parent, &children) {
        g.steps.entry(step.0).or_insert_with(Vec::new).push(step.1);
      }
    }

    for (signature, tag, logprob) in unknown {
      let tag = g.intern(&tag);
      g.unknown
        .entry(signature)
        .or_insert_with(Vec::new)
        .push((tag, logprob));
    }

    for (parent, head, dependent, logprob) in affinities {
      let parent = g.intern(&parent);
      let head = g.affinity_key(head);
      let dependent = g.affinity_key(dependent);
      if matches!(head, AffinityKey::Word(_)) || matches!(dependent, AffinityKey::Word(_)) {
        g.lexical_affinity = true;
      }
      // first declaration wins
      g.affinity.entry((parent, head, dependent)).or_insert(logprob);
    }

    g.rules = rules;
    g
  }

  /// Head-outward binarization. The head child is extended rightwards one
  /// sibling at a time, then leftwards, so every partial item contains the
  /// head. Returns `(left label, step)` pairs.
  fn binarize(rule: &Rule, parent: SymbolId, children: &[SymbolId]) -> Vec<(ItemLabel, BinaryStep)> {
    let k = children.len();
    let h = rule.head;
    let label = |lo: usize, hi: usize| {
      if lo == 0 && hi == k - 1 {
        ItemLabel::Category(parent)
      } else if lo == hi {
        ItemLabel::Category(children[lo])
      } else {
        ItemLabel::Partial(rule.id, lo as u16, hi as u16)
      }
    };
    let logprob = |lo: usize, hi: usize| {
      if lo == 0 && hi == k - 1 { rule.logprob } else { 0.0 }
    };

    let mut steps = Vec::with_capacity(k - 1);
    for j in h..k - 1 {
      steps.push((
        label(h, j),
        BinaryStep {
          rule: rule.id,
          parent,
          right: ItemLabel::Category(children[j + 1]),
          result: label(h, j + 1),
          head_left: true,
          logprob: logprob(h, j + 1),
        },
      ));
    }
    for i in (1..=h).rev() {
      steps.push((
        ItemLabel::Category(children[i - 1]),
        BinaryStep {
          rule: rule.id,
          parent,
          right: label(i, k - 1),
          result: label(i - 1, k - 1),
          head_left: false,
          logprob: logprob(i - 1, k - 1),
        },
      ));
    }
    steps
  }

  fn intern(&mut self, name: &str) -> SymbolId {
    if let Some(id) = self.symbol_ids.get(name) {
      return *id;
    }
    let id = SymbolId(self.symbols.len() as u32);
    self.symbols.push(name.to_string());
    self.symbol_ids.insert(name.to_string(), id);
    id
  }

  fn affinity_key(&mut self, term: AffinityTerm) -> AffinityKey {
    match term {
      AffinityTerm::Word(w) => AffinityKey::Word(w.to_lowercase()),
      AffinityTerm::Tag(t) => AffinityKey::Tag(self.intern(&t)),
    }
  }

  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let src = fs::read_to_string(path.as_ref())
      .map_err(|e| format!("reading {}: {}", path.as_ref().display(), e))?;
    src.parse()
  }

  pub fn start(&self) -> &str {
    self.symbol_name(self.start)
  }

  pub fn start_id(&self) -> SymbolId {
    self.start
  }

  pub fn symbol_name(&self, id: SymbolId) -> &str {
    &self.symbols[id.0 as usize]
  }

  pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
    self.symbol_ids.get(name).copied()
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  pub fn rule(&self, id: RuleId) -> &Rule {
    &self.rules[id.0 as usize]
  }

  /// Scored tags for a word: the lexicon entry for the exact form, then for
  /// its lowercased form, then the unknown-word table for the most specific
  /// signature that has entries. Empty if nothing applies.
  pub(crate) fn tags_for(&self, word: &str) -> &[(SymbolId, f64)] {
    if let Some(tags) = self.lexicon.get(word) {
      return tags;
    }
    if let Some(tags) = self.lexicon.get(&word.to_lowercase()) {
      return tags;
    }
    Signature::ALL
      .iter()
      .filter(|s| s.matches(word))
      .find_map(|s| self.unknown.get(s))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  /// Candidate part-of-speech tags for `word` with their log-probabilities,
  /// in declaration order
  pub fn candidate_tags(&self, word: &str) -> Vec<(&str, f64)> {
    self
      .tags_for(word)
      .iter()
      .map(|(tag, lp)| (self.symbol_name(*tag), *lp))
      .collect()
  }

  pub fn rules_with_left_child(&self, label: &str) -> Vec<&Rule> {
    self.rules_by(&self.by_left, label)
  }

  /// Rules whose last child is `label`; unary rules are listed by both
  /// this and `rules_with_left_child`
  pub fn rules_with_right_child(&self, label: &str) -> Vec<&Rule> {
    self.rules_by(&self.by_right, label)
  }

  fn rules_by<'a>(&'a self, index: &HashMap<String, Vec<RuleId>>, label: &str) -> Vec<&'a Rule> {
    index
      .get(label)
      .map(|ids| ids.iter().map(|id| self.rule(*id)).collect())
      .unwrap_or_default()
  }

  pub fn head_child_index(&self, rule: &Rule) -> usize {
    rule.head
  }

  pub(crate) fn unary_parents(&self, child: SymbolId) -> &[(SymbolId, f64)] {
    self.unary.get(&child).map(Vec::as_slice).unwrap_or(&[])
  }

  pub(crate) fn steps_from(&self, left: ItemLabel) -> &[BinaryStep] {
    self.steps.get(&left).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Head-compatibility adjustment for attaching `dependent` to `head` under
  /// `parent`. Backs off from word/word to tag/tag; 0 when nothing matches.
  pub(crate) fn affinity_ids(&self, parent: SymbolId, head: HeadInfo, dependent: HeadInfo) -> f64 {
    if self.affinity.is_empty() {
      return 0.0;
    }
    let head_tag = AffinityKey::Tag(head.tag);
    let dep_tag = AffinityKey::Tag(dependent.tag);

    if self.lexical_affinity {
      let head_word = AffinityKey::Word(head.word.to_lowercase());
      let dep_word = AffinityKey::Word(dependent.word.to_lowercase());
      let candidates = [
        (head_word.clone(), dep_word.clone()),
        (head_word, dep_tag.clone()),
        (head_tag.clone(), dep_word),
      ];
      for (h, d) in candidates {
        if let Some(lp) = self.affinity.get(&(parent, h, d)) {
          return *lp;
        }
      }
    }

    self
      .affinity
      .get(&(parent, head_tag, dep_tag))
      .copied()
      .unwrap_or(0.0)
  }

  /// String-keyed variant of the head-compatibility lookup, taking
  /// `(word, tag)` pairs
  pub fn affinity(&self, parent: &str, head: (&str, &str), dependent: (&str, &str)) -> f64 {
    let ids = (
      self.symbol_id(parent),
      self.symbol_id(head.1),
      self.symbol_id(dependent.1),
    );
    match ids {
      (Some(parent), Some(head_tag), Some(dep_tag)) => self.affinity_ids(
        parent,
        HeadInfo {
          word: head.0,
          tag: head_tag,
        },
        HeadInfo {
          word: dependent.0,
          tag: dep_tag,
        },
      ),
      _ => 0.0,
    }
  }
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "//** start: {}", self.start())?;
    for rule in self.rules.iter() {
      writeln!(f, "{};", rule)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tiny() -> Grammar {
    let mut b = GrammarBuilder::new();
    b.rule("S", &["NP", "VP"], 1, 1.0).unwrap();
    b.rule("NP", &["DT", "JJ", "NN"], 2, 0.5).unwrap();
    b.rule("NP", &["NN"], 0, 0.5).unwrap();
    b.rule("VP", &["VBZ", "NP"], 0, 1.0).unwrap();
    b.lexical("DT", "the", 1.0).unwrap();
    b.lexical("NN", "dog", 0.7).unwrap();
    b.lexical("VBZ", "dog", 0.3).unwrap();
    b.unknown(Signature::S, "NNS", 0.8).unwrap();
    b.unknown(Signature::Any, "NN", 1.0).unwrap();
    b.affinity("VP", AffinityTerm::Tag("VBZ".into()), AffinityTerm::Tag("NN".into()), 0.5)
      .unwrap();
    b.affinity(
      "VP",
      AffinityTerm::Word("bites".into()),
      AffinityTerm::Tag("NN".into()),
      0.25,
    )
    .unwrap();
    b.build().unwrap()
  }

  #[test]
  fn test_candidate_tags() {
    let g = tiny();
    assert_eq!(g.start(), "S");

    let tags = g.candidate_tags("dog");
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].0, "NN");
    assert!((tags[0].1 - 0.7f64.ln()).abs() < 1e-12);
    assert_eq!(tags[1].0, "VBZ");

    // lowercase fallback
    assert_eq!(g.candidate_tags("The")[0].0, "DT");
    // signatures
    assert_eq!(g.candidate_tags("cats")[0].0, "NNS");
    assert_eq!(g.candidate_tags("zebra")[0].0, "NN");
  }

  #[test]
  fn test_rule_indices() {
    let g = tiny();
    let left = g.rules_with_left_child("DT");
    assert_eq!(left.len(), 1);
    assert_eq!(g.head_child_index(left[0]), 2);

    let right = g.rules_with_right_child("NP");
    assert_eq!(right.len(), 1);
    assert_eq!(right[0].symbol_str(), "VP");

    // a unary rule's only child is both its leftmost and rightmost
    let left = g.rules_with_left_child("NN");
    let right = g.rules_with_right_child("NN");
    assert_eq!(left.len(), 1);
    assert_eq!(right.len(), 2);
    assert_eq!(right[0].productions.len(), 3);
    assert_eq!(right[1].id, left[0].id);
  }

  #[test]
  fn test_binarization() {
    let g = tiny();
    let dt = g.symbol_id("DT").unwrap();
    let jj = g.symbol_id("JJ").unwrap();
    let nn = g.symbol_id("NN").unwrap();
    let np = g.symbol_id("NP").unwrap();

    // NP -> DT JJ NN*: the head is extended leftwards, JJ first
    let first = g.steps_from(ItemLabel::Category(jj));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].right, ItemLabel::Category(nn));
    assert!(matches!(first[0].result, ItemLabel::Partial(_, 1, 2)));
    assert!(!first[0].head_left);
    assert_eq!(first[0].logprob, 0.0);

    let last = g.steps_from(ItemLabel::Category(dt));
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].right, first[0].result);
    assert_eq!(last[0].result, ItemLabel::Category(np));
    assert!((last[0].logprob - 0.5f64.ln()).abs() < 1e-12);

    // VP -> VBZ* NP: a single rightward step
    let vbz = g.symbol_id("VBZ").unwrap();
    let vp = g.steps_from(ItemLabel::Category(vbz));
    assert_eq!(vp.len(), 1);
    assert!(vp[0].head_left);
    assert_eq!(vp[0].right, ItemLabel::Category(np));
  }

  #[test]
  fn test_affinity_backoff() {
    let g = tiny();
    assert!((g.affinity("VP", ("likes", "VBZ"), ("dog", "NN")) - 0.5f64.ln()).abs() < 1e-12);
    assert!((g.affinity("VP", ("bites", "VBZ"), ("dog", "NN")) - 0.25f64.ln()).abs() < 1e-12);
    assert_eq!(g.affinity("S", ("bites", "VBZ"), ("dog", "NN")), 0.0);
    assert_eq!(g.affinity("VP", ("bites", "VBZ"), ("dog", "NOPE")), 0.0);
  }

  #[test]
  fn test_bad_probability() {
    let mut b = GrammarBuilder::new();
    assert!(b.rule("S", &["NP"], 0, 1.5).is_err());
    assert!(b.rule("S", &["NP"], 0, 0.0).is_err());
    assert!(b.rule("S", &["NP"], 3, 0.5).is_err());
    assert!(GrammarBuilder::new().build().is_err());
  }
}
