use tracing::debug;

use crate::deps::{TokenRef, TypedDependency};
use crate::error::ParseError;
use crate::heads::{self, HeadToken};
use crate::relations::{self, Context};
use crate::syntree::{ParseTree, SynTree};

/// Bare clause categories accepted as a tree root
const CLAUSE_ROOTS: &[&str] = &["S", "SINV", "SQ", "SBAR", "SBARQ", "FRAG"];
const SUBJECT_RELATIONS: &[&str] = &["nsubj", "nsubjpass", "csubj"];
const ADJECTIVE_TAGS: &[&str] = &["JJ", "JJR", "JJS"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorOptions {
  /// Propagate dependencies across conjuncts
  pub cc_processed: bool,
  /// Fold coordinators and prepositions into relation names
  pub collapse: bool,
  /// Emit `root(ROOT-0, head)`
  pub include_root: bool,
  pub keep_punctuation: bool,
}

impl Default for ExtractorOptions {
  fn default() -> Self {
    Self {
      cc_processed: true,
      collapse: true,
      include_root: false,
      keep_punctuation: false,
    }
  }
}

impl ExtractorOptions {
  /// Phase 1 output only: no collapsing, no propagation
  pub fn basic() -> Self {
    Self {
      cc_processed: false,
      collapse: false,
      ..Self::default()
    }
  }
}

/// A word with its tag, as the extractor tracks it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
  word: String,
  tag: String,
  index: usize,
}

impl From<HeadToken<'_>> for Node {
  fn from(t: HeadToken<'_>) -> Self {
    Self {
      word: t.word.to_string(),
      tag: t.tag.to_string(),
      index: t.index,
    }
  }
}

impl From<TokenRef> for Node {
  fn from(t: TokenRef) -> Self {
    Self {
      tag: t.word.clone(),
      word: t.word,
      index: t.index,
    }
  }
}

impl Node {
  /// Verbs and adjectives head clauses that can take a subject
  fn is_predicate(&self) -> bool {
    let tag = self.tag.as_str();
    heads::VERB_TAGS.contains(&tag) || ADJECTIVE_TAGS.contains(&tag)
  }

  fn token_ref(&self) -> TokenRef {
    TokenRef::new(self.word.clone(), self.index)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
  relation: String,
  governor: Node,
  dependent: Node,
}

impl Edge {
  fn new(relation: impl Into<String>, governor: Node, dependent: Node) -> Self {
    Self {
      relation: relation.into(),
      governor,
      dependent,
    }
  }

  fn short_name(&self) -> &str {
    self
      .relation
      .split_once('_')
      .map(|(short, _)| short)
      .unwrap_or(&self.relation)
  }

  fn is_conj(&self) -> bool {
    self.short_name() == "conj"
  }

  fn same_arc(&self, relation: &str, governor: usize, dependent: usize) -> bool {
    self.relation == relation && self.governor.index == governor && self.dependent.index == dependent
  }
}

/// Turns a normalized phrase-structure tree into typed dependencies.
/// Stateless apart from its options; safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct DependencyExtractor {
  options: ExtractorOptions,
}

impl DependencyExtractor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_options(options: ExtractorOptions) -> Self {
    Self { options }
  }

  pub fn options(&self) -> &ExtractorOptions {
    &self.options
  }

  pub fn extract(&self, tree: &ParseTree) -> Result<Vec<TypedDependency>, ParseError> {
    check_root(tree)?;
    tree.check_shape()?;
    check_preterminals(tree)?;

    let mut edges = Vec::new();
    label_constituents(tree, &mut edges);
    if !self.options.keep_punctuation {
      edges.retain(|e| e.relation != "punct");
    }
    if self.options.include_root {
      if let Some(head) = heads::head_token(tree) {
        edges.insert(0, Edge::new("root", TokenRef::root().into(), head.into()));
      }
    }
    debug!(words = tree.leaves().len(), basic = edges.len(), "labeled dependencies");

    if self.options.collapse {
      collapse(&mut edges);
    }
    if self.options.cc_processed {
      let before = edges.len();
      propagate_conjuncts(&mut edges);
      debug!(before, after = edges.len(), "propagated conjunct dependencies");
    }

    // stable, so creation order breaks the remaining ties
    edges.sort_by_key(|e| (e.dependent.index, e.governor.index));
    Ok(
      edges
        .into_iter()
        .map(|e| TypedDependency::new(e.relation, e.governor.token_ref(), e.dependent.token_ref()))
        .collect(),
    )
  }
}

fn check_root(tree: &ParseTree) -> Result<(), ParseError> {
  let label = match tree {
    SynTree::Branch(c, _) => heads::base_category(c.value.category()),
    SynTree::Leaf(w) => {
      return Err(ParseError::NoGrammaticalStructure {
        root: w.value.clone(),
      });
    }
  };
  let wrapped = label == "ROOT" && tree.children().len() == 1 && tree.children()[0].is_branch();
  if wrapped || CLAUSE_ROOTS.contains(&label) {
    Ok(())
  } else {
    Err(ParseError::NoGrammaticalStructure {
      root: label.to_string(),
    })
  }
}

/// Words may only appear as the sole child of a preterminal
fn check_preterminals(tree: &ParseTree) -> Result<(), ParseError> {
  let children = tree.children();
  if children.len() > 1 {
    if let Some(w) = children.iter().find_map(|c| c.get_leaf()) {
      return Err(ParseError::shape(format!(
        "word {} at {} is mixed with phrases under {}",
        w.value,
        w.index(),
        tree.label().unwrap_or("?")
      )));
    }
  }
  children.iter().try_for_each(check_preterminals)
}

/// Phase 1: one edge per non-head child of every phrase, pre-order,
/// children left to right
fn label_constituents(tree: &ParseTree, edges: &mut Vec<Edge>) {
  if tree.is_leaf() || tree.is_preterminal() {
    return;
  }
  let children = tree.children();
  if let (Some(head), Some(label)) = (heads::head_child(tree), tree.label()) {
    let parent = heads::base_category(label);
    if let Some(head_token) = heads::head_token(&children[head]) {
      for (idx, child) in children.iter().enumerate() {
        if idx == head {
          continue;
        }
        let Some(dependent_token) = heads::head_token(child) else {
          continue;
        };
        let ctx = Context::new(parent, children, head, idx, head_token, dependent_token);
        let relation = relations::relation_for(&ctx);
        edges.push(Edge::new(relation, head_token.into(), dependent_token.into()));
      }
    }
  }
  for child in children {
    label_constituents(child, edges);
  }
}

/// `cc(x, and)` + `conj(x, y)` -> `conj_and(x, y)`;
/// `prep(x, on)` + `pobj(on, y)` -> `prep_on(x, y)`
fn collapse(edges: &mut Vec<Edge>) {
  let mut removed = vec![false; edges.len()];

  for i in 0..edges.len() {
    if edges[i].relation != "conj" {
      continue;
    }
    let governor = edges[i].governor.index;
    let coordinator = edges
      .iter()
      .enumerate()
      .filter(|(_, e)| e.relation == "cc" && e.governor.index == governor)
      .map(|(j, e)| (j, e.dependent.word.to_lowercase()))
      .last();
    if let Some((j, word)) = coordinator {
      edges[i].relation = format!("conj_{}", word);
      removed[j] = true;
    }
  }

  for i in 0..edges.len() {
    let complement = match edges[i].relation.as_str() {
      "pobj" => "prep",
      "pcomp" => "prepc",
      _ => continue,
    };
    let preposition = edges[i].governor.index;
    let attached = edges
      .iter()
      .position(|e| e.relation == "prep" && e.dependent.index == preposition);
    if let Some(j) = attached {
      let relation = format!("{}_{}", complement, edges[j].dependent.word.to_lowercase());
      edges[i] = Edge::new(relation, edges[j].governor.clone(), edges[i].dependent.clone());
      removed[j] = true;
    }
  }

  let mut keep = removed.into_iter().map(|r| !r);
  edges.retain(|_| keep.next().unwrap_or(true));
}

/// Conjuncts share their first conjunct's governors, and a verbal or
/// adjectival conjunct without a subject shares the first conjunct's subject.
fn propagate_conjuncts(edges: &mut Vec<Edge>) {
  let conjunctions = edges
    .iter()
    .filter(|e| e.is_conj())
    .map(|e| (e.governor.clone(), e.dependent.clone()))
    .collect::<Vec<_>>();

  for (first, other) in conjunctions {
    let mut added = Vec::new();

    for e in edges.iter() {
      if e.dependent.index != first.index || e.is_conj() || e.relation == "root" {
        continue;
      }
      if e.governor.index == other.index {
        continue;
      }
      added.push(Edge::new(e.relation.clone(), e.governor.clone(), other.clone()));
    }

    let other_has_subject = edges
      .iter()
      .any(|e| e.governor.index == other.index && SUBJECT_RELATIONS.contains(&e.relation.as_str()));
    if other.is_predicate() && !other_has_subject {
      for e in edges.iter() {
        if e.governor.index == first.index && SUBJECT_RELATIONS.contains(&e.relation.as_str()) {
          added.push(Edge::new(e.relation.clone(), other.clone(), e.dependent.clone()));
        }
      }
    }

    for edge in added {
      let duplicate = edges
        .iter()
        .any(|e| e.same_arc(&edge.relation, edge.governor.index, edge.dependent.index));
      if !duplicate {
        edges.push(edge);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntree::{Constituent, Label, Word};

  const SCENARIO_B: &str =
    "(ROOT (S (NP (DT some) (JJ female) (NN dog)) (VP (VBZ bites) (NP (DT every) (NN student)))))";
  const SCENARIO_C: &str = "(ROOT (S (NP (DT every) (JJ male) (NN student)) (VP (VP (VBD read) (NP (DT some) (NN book))) (CC and) (VP (VBD kissed) (NP (DT a) (NN girl))))))";

  fn extract_with(bracketing: &str, options: ExtractorOptions) -> Vec<String> {
    let tree: ParseTree = bracketing.parse().unwrap();
    DependencyExtractor::with_options(options)
      .extract(&tree)
      .unwrap()
      .iter()
      .map(|d| d.to_string())
      .collect()
  }

  fn extract(bracketing: &str) -> Vec<String> {
    extract_with(bracketing, ExtractorOptions::default())
  }

  #[test]
  fn test_simple_clause() {
    assert_eq!(
      extract(SCENARIO_B),
      vec![
        "det(dog-3, some-1)",
        "amod(dog-3, female-2)",
        "nsubj(bites-4, dog-3)",
        "det(student-6, every-5)",
        "dobj(bites-4, student-6)",
      ]
    );
  }

  #[test]
  fn test_coordinated_verb_phrases() {
    assert_eq!(
      extract(SCENARIO_C),
      vec![
        "det(student-3, every-1)",
        "amod(student-3, male-2)",
        "nsubj(read-4, student-3)",
        "nsubj(kissed-8, student-3)",
        "det(book-6, some-5)",
        "dobj(read-4, book-6)",
        "conj_and(read-4, kissed-8)",
        "det(girl-10, a-9)",
        "dobj(kissed-8, girl-10)",
      ]
    );
  }

  #[test]
  fn test_basic_has_one_governor_per_word() {
    let deps = extract_with(SCENARIO_C, ExtractorOptions::basic());
    // every word but the head of the sentence
    assert_eq!(deps.len(), 9);
    assert!(deps.contains(&"cc(read-4, and-7)".to_string()));
    assert!(deps.contains(&"conj(read-4, kissed-8)".to_string()));
    assert!(!deps.contains(&"nsubj(kissed-8, student-3)".to_string()));
  }

  #[test]
  fn test_uncollapsed_propagation() {
    let options = ExtractorOptions {
      collapse: false,
      ..ExtractorOptions::default()
    };
    let deps = extract_with(SCENARIO_C, options);
    assert_eq!(deps.len(), 10);
    assert!(deps.contains(&"nsubj(kissed-8, student-3)".to_string()));
  }

  #[test]
  fn test_noun_conjuncts_share_governor() {
    let deps = extract("(ROOT (S (NP (NP (NNS dogs)) (CC and) (NP (NNS cats))) (VP (VBP bark))))");
    assert_eq!(
      deps,
      vec![
        "nsubj(bark-4, dogs-1)",
        "conj_and(dogs-1, cats-3)",
        "nsubj(bark-4, cats-3)",
      ]
    );
  }

  #[test]
  fn test_flat_noun_coordination() {
    assert_eq!(
      extract("(ROOT (S (NP (NNS dogs) (CC and) (NNS cats)) (VP (VBP bark))))"),
      vec![
        "nsubj(bark-4, dogs-1)",
        "conj_and(dogs-1, cats-3)",
        "nsubj(bark-4, cats-3)",
      ]
    );
    assert_eq!(
      extract("(ROOT (S (NP (PRP she)) (VP (VBD bought) (NP (NN salt) (CC and) (NN pepper)))))"),
      vec![
        "nsubj(bought-2, she-1)",
        "dobj(bought-2, salt-3)",
        "dobj(bought-2, pepper-5)",
        "conj_and(salt-3, pepper-5)",
      ]
    );
  }

  #[test]
  fn test_copular_conjuncts_share_subject() {
    assert_eq!(
      extract("(ROOT (S (NP (DT the) (NN dog)) (VP (VP (VBZ is) (ADJP (JJ big))) (CC and) (VP (VBZ barks)))))"),
      vec![
        "det(dog-2, the-1)",
        "nsubj(big-4, dog-2)",
        "nsubj(barks-6, dog-2)",
        "cop(big-4, is-3)",
        "conj_and(big-4, barks-6)",
      ]
    );
    assert_eq!(
      extract("(ROOT (S (NP (DT the) (NN dog)) (VP (VP (VBZ barks)) (CC and) (VP (VBZ is) (ADJP (JJ big))))))"),
      vec![
        "det(dog-2, the-1)",
        "nsubj(barks-3, dog-2)",
        "nsubj(big-6, dog-2)",
        "cop(big-6, is-5)",
        "conj_and(barks-3, big-6)",
      ]
    );
  }

  #[test]
  fn test_prepositions_collapse() {
    let tree = "(ROOT (S (NP (DT the) (NN cat)) (VP (VBD sat) (PP (IN on) (NP (DT the) (NN mat)))) (. .)))";
    assert_eq!(
      extract(tree),
      vec![
        "det(cat-2, the-1)",
        "nsubj(sat-3, cat-2)",
        "det(mat-6, the-5)",
        "prep_on(sat-3, mat-6)",
      ]
    );

    let basic = extract_with(
      tree,
      ExtractorOptions {
        keep_punctuation: true,
        ..ExtractorOptions::basic()
      },
    );
    assert!(basic.contains(&"prep(sat-3, on-4)".to_string()));
    assert!(basic.contains(&"pobj(on-4, mat-6)".to_string()));
    assert!(basic.contains(&"punct(sat-3, .-7)".to_string()));
  }

  #[test]
  fn test_root_dependency() {
    let options = ExtractorOptions {
      include_root: true,
      ..ExtractorOptions::default()
    };
    let deps = extract_with(SCENARIO_B, options);
    assert_eq!(deps.len(), 6);
    assert!(deps.contains(&"root(ROOT-0, bites-4)".to_string()));
  }

  #[test]
  fn test_bare_clause_root_accepted() {
    let deps = extract("(S (NP (NN dog)) (VP (VBZ barks)))");
    assert_eq!(deps, vec!["nsubj(barks-2, dog-1)"]);
  }

  #[test]
  fn test_rejects_non_sentence_root() {
    let tree: ParseTree = "(NP (DT the) (NN dog))".parse().unwrap();
    assert!(matches!(
      DependencyExtractor::new().extract(&tree),
      Err(ParseError::NoGrammaticalStructure { root }) if root == "NP"
    ));
  }

  #[test]
  fn test_rejects_mixed_leaves() {
    let tree: ParseTree = SynTree::Branch(
      Constituent {
        value: Label::Category("S".into()),
        span: (0, 2),
      },
      vec![
        SynTree::Leaf(Word {
          value: "dogs".into(),
          span: (0, 1),
        }),
        SynTree::Branch(
          Constituent {
            value: Label::Category("VBP".into()),
            span: (1, 2),
          },
          vec![SynTree::Leaf(Word {
            value: "bark".into(),
            span: (1, 2),
          })],
        ),
      ],
    );
    assert!(matches!(
      DependencyExtractor::new().extract(&tree),
      Err(ParseError::InvalidTreeShape(_))
    ));
  }
}
