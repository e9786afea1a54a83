use crate::heads::{self, HeadToken, VERB_TAGS};
use crate::syntree::{ParseTree, SynTree};

/// Which side of the head child a dependent sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
  Left,
  Right,
}

/// Everything a relation rule may look at when labeling one dependent
/// child of a constituent.
pub struct Context<'a> {
  pub parent: &'a str,
  pub children: &'a [ParseTree],
  pub labels: Vec<&'a str>,
  pub head: usize,
  pub dependent: usize,
  pub head_token: HeadToken<'a>,
  pub dependent_token: HeadToken<'a>,
}

impl<'a> Context<'a> {
  pub fn new(
    parent: &'a str,
    children: &'a [ParseTree],
    head: usize,
    dependent: usize,
    head_token: HeadToken<'a>,
    dependent_token: HeadToken<'a>,
  ) -> Self {
    let labels = children
      .iter()
      .map(|c| match c {
        SynTree::Branch(cons, _) => heads::base_category(cons.value.category()),
        SynTree::Leaf(w) => w.value.as_str(),
      })
      .collect();
    Self {
      parent,
      children,
      labels,
      head,
      dependent,
      head_token,
      dependent_token,
    }
  }

  pub fn side(&self) -> Side {
    if self.dependent < self.head {
      Side::Left
    } else {
      Side::Right
    }
  }

  pub fn head_label(&self) -> &'a str {
    self.labels[self.head]
  }

  pub fn dependent_label(&self) -> &'a str {
    self.labels[self.dependent]
  }

  fn dependent_tree(&self) -> &'a ParseTree {
    &self.children[self.dependent]
  }

  fn head_tree(&self) -> &'a ParseTree {
    &self.children[self.head]
  }

  fn labels_between(&self) -> &[&'a str] {
    let (lo, hi) = if self.head < self.dependent {
      (self.head + 1, self.dependent)
    } else {
      (self.dependent + 1, self.head)
    };
    &self.labels[lo..hi]
  }
}

type Test = fn(&Context<'_>) -> bool;

/// One entry of the labeling table. Empty pattern lists match anything.
pub struct RelationRule {
  pub relation: &'static str,
  parents: &'static [&'static str],
  heads: &'static [&'static str],
  dependents: &'static [&'static str],
  tags: &'static [&'static str],
  words: &'static [&'static str],
  side: Option<Side>,
  test: Option<Test>,
}

impl RelationRule {
  fn new(relation: &'static str) -> Self {
    Self {
      relation,
      parents: &[],
      heads: &[],
      dependents: &[],
      tags: &[],
      words: &[],
      side: None,
      test: None,
    }
  }

  fn parent(mut self, parents: &'static [&'static str]) -> Self {
    self.parents = parents;
    self
  }

  fn head(mut self, heads: &'static [&'static str]) -> Self {
    self.heads = heads;
    self
  }

  fn dependent(mut self, dependents: &'static [&'static str]) -> Self {
    self.dependents = dependents;
    self
  }

  fn tag(mut self, tags: &'static [&'static str]) -> Self {
    self.tags = tags;
    self
  }

  fn word(mut self, words: &'static [&'static str]) -> Self {
    self.words = words;
    self
  }

  fn side(mut self, side: Side) -> Self {
    self.side = Some(side);
    self
  }

  fn when(mut self, test: Test) -> Self {
    self.test = Some(test);
    self
  }

  pub fn matches(&self, ctx: &Context<'_>) -> bool {
    fn allowed(patterns: &[&str], value: &str) -> bool {
      patterns.is_empty() || patterns.contains(&value)
    }

    allowed(self.parents, ctx.parent)
      && allowed(self.heads, ctx.head_label())
      && allowed(self.dependents, ctx.dependent_label())
      && allowed(self.tags, ctx.dependent_token.tag)
      && (self.words.is_empty() || self.words.contains(&ctx.dependent_token.word.to_lowercase().as_str()))
      && self.side.is_none_or(|side| side == ctx.side())
      && self.test.is_none_or(|test| test(ctx))
  }
}

const PUNCT_TAGS: &[&str] = &[".", ",", ":", "``", "''", "-LRB-", "-RRB-", "#"];
const COORDINATORS: &[&str] = &["CC", "CONJP"];
const CLAUSES: &[&str] = &["S", "SQ", "SINV", "SBARQ"];
const NOMINALS: &[&str] = &["NP", "WHNP", "NX", "NAC"];
const NOUN_TAGS: &[&str] = &["NN", "NNS", "NNP", "NNPS"];
const ADJ_LABELS: &[&str] = &["JJ", "JJR", "JJS", "ADJP", "VBN", "VBG", "WHADJP"];
const ADV_LABELS: &[&str] = &["ADVP", "WHADVP", "RB", "RBR", "RBS", "WRB"];
const SUBJECTS: &[&str] = &["NP", "WHNP"];
const CLAUSAL: &[&str] = &["S", "SBAR", "SQ", "SBARQ", "SINV"];
const AUX_GET: &[&str] = &["get", "gets", "got", "gotten", "getting"];

/// A coordinator follows the head and the dependent looks like a conjunct
fn coordinated(ctx: &Context<'_>) -> bool {
  let coordinator_after_head = ctx.labels[ctx.head + 1..]
    .iter()
    .any(|l| COORDINATORS.contains(l));
  let dependent = ctx.dependent_tree();
  let alike = ctx.dependent_label() == ctx.head_label()
    || (dependent.is_preterminal() && ctx.head_tree().is_preterminal());
  coordinator_after_head && alike
}

fn preconjunct(ctx: &Context<'_>) -> bool {
  ctx.labels[ctx.dependent + 1..]
    .iter()
    .any(|l| COORDINATORS.contains(l))
}

fn auxiliary(ctx: &Context<'_>) -> bool {
  heads::is_auxiliary(ctx.dependent_tree())
}

fn passive_auxiliary(ctx: &Context<'_>) -> bool {
  let word = ctx.dependent_token.word.to_lowercase();
  ctx.head_token.tag == "VBN"
    && VERB_TAGS.contains(&ctx.dependent_token.tag)
    && (heads::is_be(&word) || AUX_GET.contains(&word.as_str()))
}

fn copula(ctx: &Context<'_>) -> bool {
  heads::is_copula(ctx.dependent_tree())
}

/// A VP whose head is a participle under a form of be or get, looking
/// through auxiliary chains
fn is_passive(vp: &ParseTree) -> bool {
  let children = vp.children();
  let Some(head) = heads::head_child(vp) else {
    return false;
  };
  let head_tree = &children[head];
  if heads::head_token(head_tree).is_none_or(|t| t.tag != "VBN") {
    return false;
  }
  let has_passive_aux = children[..head].iter().any(|c| match heads::preterminal(c) {
    Some((tag, word)) => {
      let lower = word.to_lowercase();
      VERB_TAGS.contains(&tag) && (heads::is_be(&lower) || AUX_GET.contains(&lower.as_str()))
    }
    None => false,
  });
  has_passive_aux || (head_tree.label() == Some("VP") && is_passive(head_tree))
}

fn passive_clause(ctx: &Context<'_>) -> bool {
  ctx.head_label() == "VP" && is_passive(ctx.head_tree())
}

fn has_subject(tree: &ParseTree) -> bool {
  let children = tree.children();
  let Some(vp) = children
    .iter()
    .position(|c| c.label().map(heads::base_category) == Some("VP"))
  else {
    return false;
  };
  children[..vp]
    .iter()
    .any(|c| c.label().map(heads::base_category).is_some_and(|l| SUBJECTS.contains(&l)))
}

fn finite_complement(ctx: &Context<'_>) -> bool {
  let dep = ctx.dependent_tree();
  match ctx.dependent_label() {
    "S" => has_subject(dep),
    _ => true,
  }
}

fn open_complement(ctx: &Context<'_>) -> bool {
  match ctx.dependent_label() {
    "S" => !has_subject(ctx.dependent_tree()),
    _ => true,
  }
}

/// Another nominal follows this one among the head's right dependents
fn first_of_two_objects(ctx: &Context<'_>) -> bool {
  ctx.labels[ctx.dependent + 1..].contains(&"NP")
}

fn possessor(ctx: &Context<'_>) -> bool {
  matches!(ctx.dependent_token.tag, "PRP$" | "WP$")
    || ctx
      .dependent_tree()
      .children()
      .last()
      .and_then(|c| c.label())
      == Some("POS")
}

fn apposition(ctx: &Context<'_>) -> bool {
  let between = ctx.labels_between();
  between.contains(&",") && !ctx.labels.iter().any(|l| COORDINATORS.contains(l))
}

fn infinitival(ctx: &Context<'_>) -> bool {
  fn starts_with_to(tree: &ParseTree) -> bool {
    match tree.first_child() {
      Some(first) if first.label() == Some("TO") => true,
      Some(first) if first.label().map(heads::base_category) == Some("VP") => starts_with_to(first),
      _ => false,
    }
  }
  let dep = ctx.dependent_tree();
  starts_with_to(dep) || dep.children().iter().any(starts_with_to)
}

fn participial(ctx: &Context<'_>) -> bool {
  matches!(ctx.dependent_token.tag, "VBN" | "VBG")
}

lazy_static! {
  /// Ordered labeling table; the first matching rule names the relation
  static ref RELATION_RULES: Vec<RelationRule> = vec![
    RelationRule::new("punct").tag(PUNCT_TAGS),
    RelationRule::new("preconj")
      .word(&["both", "either", "neither"])
      .side(Side::Left)
      .when(preconjunct),
    RelationRule::new("cc").dependent(COORDINATORS),
    RelationRule::new("conj").side(Side::Right).when(coordinated),
    RelationRule::new("neg")
      .tag(&["RB"])
      .word(&["not", "n't", "never"]),
    RelationRule::new("auxpass")
      .parent(&["VP"])
      .head(&["VP"])
      .side(Side::Left)
      .when(passive_auxiliary),
    RelationRule::new("cop")
      .parent(&["VP"])
      .head(&["NP", "ADJP"])
      .side(Side::Left)
      .when(copula),
    RelationRule::new("aux")
      .parent(&["VP", "SQ", "SINV"])
      .side(Side::Left)
      .when(auxiliary),
    RelationRule::new("expl").parent(CLAUSES).tag(&["EX"]),
    RelationRule::new("nsubjpass")
      .parent(CLAUSES)
      .dependent(SUBJECTS)
      .side(Side::Left)
      .when(passive_clause),
    RelationRule::new("nsubj")
      .parent(&["S", "SINV", "SBARQ"])
      .dependent(SUBJECTS)
      .side(Side::Left),
    RelationRule::new("nsubj").parent(&["SQ"]).dependent(SUBJECTS),
    RelationRule::new("csubj")
      .parent(&["S"])
      .dependent(&["S", "SBAR"])
      .side(Side::Left),
    RelationRule::new("iobj")
      .parent(&["VP"])
      .dependent(&["NP"])
      .side(Side::Right)
      .when(first_of_two_objects),
    RelationRule::new("dobj")
      .parent(&["VP"])
      .dependent(&["NP"])
      .side(Side::Right),
    RelationRule::new("ccomp")
      .parent(&["VP", "ADJP"])
      .dependent(CLAUSAL)
      .side(Side::Right)
      .when(finite_complement),
    RelationRule::new("xcomp")
      .parent(&["VP", "ADJP"])
      .dependent(&["S", "VP"])
      .side(Side::Right)
      .when(open_complement),
    RelationRule::new("prt").dependent(&["PRT", "RP"]),
    RelationRule::new("pobj")
      .parent(&["PP", "WHPP"])
      .dependent(&["NP", "WHNP"])
      .side(Side::Right),
    RelationRule::new("pcomp")
      .parent(&["PP", "WHPP"])
      .dependent(&["S", "SBAR", "VP", "PP"])
      .side(Side::Right),
    RelationRule::new("prep").dependent(&["PP", "WHPP"]),
    RelationRule::new("complm")
      .parent(&["SBAR"])
      .dependent(&["IN", "DT"])
      .word(&["that", "whether", "if"]),
    RelationRule::new("mark")
      .parent(&["SBAR"])
      .dependent(&["IN"]),
    RelationRule::new("possessive").tag(&["POS"]),
    RelationRule::new("poss").parent(NOMINALS).when(possessor),
    RelationRule::new("predet").dependent(&["PDT"]),
    RelationRule::new("det").dependent(&["DT", "WDT", "WP"]).side(Side::Left),
    RelationRule::new("num").dependent(&["CD", "QP"]),
    RelationRule::new("amod")
      .parent(NOMINALS)
      .dependent(ADJ_LABELS)
      .side(Side::Left),
    RelationRule::new("nn")
      .parent(NOMINALS)
      .dependent(NOUN_TAGS)
      .side(Side::Left),
    RelationRule::new("appos")
      .parent(&["NP"])
      .dependent(&["NP"])
      .side(Side::Right)
      .when(apposition),
    RelationRule::new("rcmod")
      .parent(NOMINALS)
      .dependent(&["SBAR", "RRC"])
      .side(Side::Right),
    RelationRule::new("infmod")
      .parent(NOMINALS)
      .dependent(&["VP", "S"])
      .side(Side::Right)
      .when(infinitival),
    RelationRule::new("partmod")
      .parent(NOMINALS)
      .dependent(&["VP"])
      .side(Side::Right)
      .when(participial),
    RelationRule::new("advmod").dependent(ADV_LABELS),
  ];
}

/// Label for one dependent child; `dep` when no rule applies
pub fn relation_for(ctx: &Context<'_>) -> &'static str {
  RELATION_RULES
    .iter()
    .find(|rule| rule.matches(ctx))
    .map(|rule| rule.relation)
    .unwrap_or("dep")
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Labels every non-head child of the top node of `bracketing`
  fn assert_relations(bracketing: &str, expected: &[(&str, &str)]) {
    let tree: ParseTree = bracketing.parse().unwrap();
    let head = heads::head_child(&tree).unwrap();
    let children = tree.children();
    let head_token = heads::head_token(&children[head]).unwrap();
    let parent = heads::base_category(tree.label().unwrap());
    let actual = (0..children.len())
      .filter(|&i| i != head)
      .map(|i| {
        let dependent_token = heads::head_token(&children[i]).unwrap();
        let ctx = Context::new(parent, children, head, i, head_token, dependent_token);
        (dependent_token.word, relation_for(&ctx))
      })
      .collect::<Vec<_>>();
    assert_eq!(actual, expected, "{}", bracketing);
  }

  #[test]
  fn test_noun_phrase_relations() {
    assert_relations(
      "(NP (DT some) (JJ female) (NN dog))",
      &[("some", "det"), ("female", "amod")],
    );
    assert_relations(
      "(NP (PDT all) (DT the) (CD three) (NN school) (NNS kids))",
      &[("all", "predet"), ("the", "det"), ("three", "num"), ("school", "nn")],
    );
    assert_relations("(NP (NP (NNP John) (POS 's)) (NN dog))", &[("John", "poss")]);
    assert_relations("(NP (NNP John) (POS 's))", &[("'s", "possessive")]);
    assert_relations(
      "(NP (NP (NNP Sam)) (, ,) (NP (DT my) (NN brother)))",
      &[(",", "punct"), ("brother", "appos")],
    );
  }

  #[test]
  fn test_clause_relations() {
    assert_relations(
      "(S (NP (NN dog)) (VP (VBZ bites) (NP (NN student))) (. .))",
      &[("dog", "nsubj"), (".", "punct")],
    );
    assert_relations(
      "(S (NP (NN cake)) (VP (VBD was) (VP (VBN eaten))))",
      &[("cake", "nsubjpass")],
    );
    assert_relations(
      "(S (NP (EX there)) (VP (VBZ is) (NP (NN cake))))",
      &[("there", "expl")],
    );
  }

  #[test]
  fn test_verb_phrase_relations() {
    assert_relations(
      "(VP (VBD gave) (NP (PRP her)) (NP (DT a) (NN book)))",
      &[("her", "iobj"), ("book", "dobj")],
    );
    assert_relations(
      "(VP (MD will) (RB not) (VP (VB go)))",
      &[("will", "aux"), ("not", "neg")],
    );
    assert_relations("(VP (VBD was) (VP (VBN eaten)))", &[("was", "auxpass")]);
    assert_relations("(VP (VBZ is) (ADJP (JJ happy)))", &[("is", "cop")]);
    assert_relations(
      "(VP (VBZ wants) (S (VP (TO to) (VP (VB go)))))",
      &[("go", "xcomp")],
    );
    assert_relations(
      "(VP (VBZ thinks) (SBAR (IN that) (S (NP (PRP he)) (VP (VBZ runs)))))",
      &[("runs", "ccomp")],
    );
    assert_relations(
      "(VP (VBD sat) (PP (IN on) (NP (DT the) (NN mat))))",
      &[("on", "prep")],
    );
    assert_relations("(VP (VBD gave) (PRT (RP up)))", &[("up", "prt")]);
  }

  #[test]
  fn test_prepositional_relations() {
    assert_relations("(PP (IN on) (NP (DT the) (NN mat)))", &[("mat", "pobj")]);
    assert_relations(
      "(SBAR (IN because) (S (NP (PRP he)) (VP (VBD left))))",
      &[("because", "mark")],
    );
  }

  #[test]
  fn test_coordination_relations() {
    assert_relations(
      "(VP (VP (VBD read) (NP (NN book))) (CC and) (VP (VBD kissed) (NP (NN girl))))",
      &[("and", "cc"), ("kissed", "conj")],
    );
    assert_relations(
      "(NP (DT both) (NP (NNS dogs)) (CC and) (NP (NNS cats)))",
      &[("both", "preconj"), ("and", "cc"), ("cats", "conj")],
    );
    assert_relations(
      "(NP (NNS dogs) (CC and) (NNS cats))",
      &[("and", "cc"), ("cats", "conj")],
    );
  }

  #[test]
  fn test_fallback_is_dep() {
    assert_relations("(FRAG (NP (NN dog)) (NP (NN cat)))", &[("dog", "dep")]);
  }
}
