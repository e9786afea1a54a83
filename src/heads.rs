use crate::syntree::{ParseTree, SynTree};

/// Direction a head rule scans the children in. `RightDis` tries every
/// category at each position before moving on; the plain variants try each
/// category across all positions before moving to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
  Left,
  Right,
  RightDis,
}

use Direction::*;

type HeadRule = (Direction, &'static [&'static str]);

/// Ordered head rules per category; the first rule that finds a child wins.
/// When none does, the first rule's direction picks the first or last child.
const HEAD_RULES: &[(&str, &[HeadRule])] = &[
  ("ROOT", &[(Left, &["S", "SINV", "SQ", "SBAR", "SBARQ", "FRAG"])]),
  (
    "ADJP",
    &[(
      Left,
      &[
        "NNS", "QP", "NN", "$", "ADVP", "JJ", "VBN", "VBG", "ADJP", "JJR", "NP", "JJS", "DT", "FW",
        "RBR", "RBS", "SBAR", "RB",
      ],
    )],
  ),
  (
    "ADVP",
    &[(
      Right,
      &["RB", "RBR", "RBS", "FW", "ADVP", "TO", "CD", "JJR", "JJ", "IN", "NP", "JJS", "NN"],
    )],
  ),
  ("CONJP", &[(Right, &["CC", "RB", "IN"])]),
  ("FRAG", &[(Right, &[])]),
  ("INTJ", &[(Left, &[])]),
  ("LST", &[(Right, &["LS", ":"])]),
  (
    "NAC",
    &[(
      Left,
      &[
        "NN", "NNS", "NNP", "NNPS", "NP", "NAC", "EX", "$", "CD", "QP", "PRP", "VBG", "JJ", "JJS",
        "JJR", "ADJP", "FW",
      ],
    )],
  ),
  (
    "NP",
    &[
      (RightDis, &["NN", "NNP", "NNPS", "NNS", "NX", "JJR"]),
      (Left, &["NP", "PRP"]),
      (RightDis, &["$", "ADJP", "PRN"]),
      (Right, &["CD"]),
      (RightDis, &["JJ", "JJS", "RB", "QP", "DT", "WDT", "EX"]),
    ],
  ),
  ("NX", &[(Left, &[])]),
  ("PP", &[(Right, &["IN", "TO", "VBG", "VBN", "RP", "FW"]), (Left, &["PP"])]),
  ("PRN", &[(Left, &[])]),
  ("PRT", &[(Right, &["RP"])]),
  (
    "QP",
    &[(
      Left,
      &["$", "IN", "NNS", "NN", "JJ", "RB", "DT", "CD", "NCD", "QP", "JJR", "JJS"],
    )],
  ),
  ("RRC", &[(Right, &["VP", "NP", "ADVP", "ADJP", "PP"])]),
  (
    "S",
    &[(Left, &["TO", "VP", "S", "FRAG", "SBAR", "ADJP", "UCP", "NP"])],
  ),
  (
    "SBAR",
    &[(
      Left,
      &["S", "SQ", "SINV", "SBAR", "FRAG", "WHNP", "WHPP", "WHADVP", "WHADJP", "IN", "DT"],
    )],
  ),
  ("SBARQ", &[(Left, &["SQ", "S", "SINV", "SBARQ", "FRAG"])]),
  (
    "SINV",
    &[(
      Left,
      &["VBZ", "VBD", "VBP", "VB", "MD", "VP", "S", "SINV", "ADJP", "NP"],
    )],
  ),
  ("SQ", &[(Left, &["VBZ", "VBD", "VBP", "VB", "MD", "VP", "SQ"])]),
  ("UCP", &[(Right, &[])]),
  (
    "VP",
    &[(
      Left,
      &[
        "TO", "VBD", "VBN", "MD", "VBZ", "VB", "VBG", "VBP", "VP", "ADJP", "NN", "NNS", "NP",
      ],
    )],
  ),
  ("WHADJP", &[(Left, &["CC", "WRB", "JJ", "ADJP"])]),
  ("WHADVP", &[(Right, &["CC", "WRB"])]),
  ("WHNP", &[(Left, &["WDT", "WP", "WP$", "WHADJP", "WHPP", "WHNP"])]),
  ("WHPP", &[(Right, &["IN", "TO", "FW"])]),
  ("X", &[(Right, &[])]),
];

const BE_FORMS: &[&str] = &[
  "be", "being", "been", "am", "is", "are", "was", "were", "'s", "'re", "'m",
];
const HAVE_FORMS: &[&str] = &["have", "has", "had", "having", "'ve", "'d"];
const DO_FORMS: &[&str] = &["do", "does", "did"];

pub const VERB_TAGS: &[&str] = &["VB", "VBD", "VBG", "VBN", "VBP", "VBZ"];

/// The word a constituent is headed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadToken<'a> {
  pub word: &'a str,
  pub tag: &'a str,
  pub index: usize,
}

/// Strips function tags and indices: `NP-SBJ-1` -> `NP`. Bracket tags such
/// as `-LRB-` stay as they are.
pub fn base_category(label: &str) -> &str {
  if label.starts_with('-') {
    return label;
  }
  label.split(['-', '=']).next().unwrap_or(label)
}

fn base_label(tree: &ParseTree) -> &str {
  match tree {
    SynTree::Branch(c, _) => base_category(c.value.category()),
    SynTree::Leaf(w) => &w.value,
  }
}

pub fn is_be(word: &str) -> bool {
  BE_FORMS.contains(&word.to_lowercase().as_str())
}

/// Preterminal auxiliary: `to`, a modal, or a verb-tagged form of be, have or do
pub fn is_auxiliary(tree: &ParseTree) -> bool {
  match preterminal(tree) {
    Some((tag, word)) => {
      let lower = word.to_lowercase();
      tag == "TO"
        || tag == "MD"
        || (VERB_TAGS.contains(&tag)
          && (BE_FORMS.contains(&lower.as_str())
            || HAVE_FORMS.contains(&lower.as_str())
            || DO_FORMS.contains(&lower.as_str())))
    }
    None => false,
  }
}

/// Preterminal verb-tagged form of be
pub fn is_copula(tree: &ParseTree) -> bool {
  matches!(preterminal(tree), Some((tag, word)) if VERB_TAGS.contains(&tag) && is_be(word))
}

/// `(tag, word)` of a preterminal
pub fn preterminal(tree: &ParseTree) -> Option<(&str, &str)> {
  match tree {
    SynTree::Branch(c, children) if tree.is_preterminal() => {
      let word = children[0].get_leaf()?;
      Some((c.value.category(), word.value.as_str()))
    }
    _ => None,
  }
}

/// In a VP, auxiliaries give way to their VP complement and a copula gives
/// way to a nominal or adjectival predicate.
fn semantic_vp_head(children: &[ParseTree]) -> Option<usize> {
  for (idx, child) in children.iter().enumerate() {
    if is_auxiliary(child) {
      if let Some(offset) = children[idx + 1..]
        .iter()
        .position(|c| base_label(c) == "VP")
      {
        return Some(idx + 1 + offset);
      }
    }
  }

  if children.iter().any(|c| base_label(c) == "VP") {
    return None;
  }
  let copula = children.iter().position(is_copula)?;
  children[copula + 1..]
    .iter()
    .position(|c| matches!(base_label(c), "NP" | "ADJP"))
    .map(|offset| copula + 1 + offset)
}

fn scan(dir: Direction, categories: &[&str], labels: &[&str]) -> Option<usize> {
  let n = labels.len();
  let positions = move |reverse: bool| {
    (0..n).map(move |i| if reverse { n - 1 - i } else { i })
  };
  match dir {
    Left | Right => {
      let reverse = dir == Right;
      categories
        .iter()
        .find_map(|cat| positions(reverse).find(|&i| labels[i] == *cat))
    }
    RightDis => positions(true).find(|&i| categories.contains(&labels[i])),
  }
}

/// Index of the head child of a branch, `None` for leaves and preterminals
pub fn head_child(tree: &ParseTree) -> Option<usize> {
  let (cons, children) = tree.get_branch()?;
  if tree.is_preterminal() || children.is_empty() {
    return None;
  }
  if children.len() == 1 {
    return Some(0);
  }

  let labels = children.iter().map(base_label).collect::<Vec<_>>();
  let category = base_category(cons.value.category());
  let idx = match category {
    "VP" => semantic_vp_head(children).unwrap_or_else(|| table_head(category, &labels)),
    _ => table_head(category, &labels),
  };

  // a head right after a coordinator moves to the first conjunct
  if idx >= 2 && matches!(labels[idx - 1], "CC" | "CONJP") {
    Some(idx - 2)
  } else {
    Some(idx)
  }
}

fn table_head(category: &str, labels: &[&str]) -> usize {
  let rules = HEAD_RULES
    .iter()
    .find(|(cat, _)| *cat == category)
    .map(|(_, rules)| *rules)
    .unwrap_or(&[(Left, &[])]);

  for (dir, categories) in rules {
    if let Some(idx) = scan(*dir, categories, labels) {
      return idx;
    }
  }

  match rules[0].0 {
    Left => 0,
    Right | RightDis => labels.len() - 1,
  }
}

/// Follows head children down to the word heading the constituent
pub fn head_token(tree: &ParseTree) -> Option<HeadToken<'_>> {
  if let Some((tag, _)) = preterminal(tree) {
    let word = tree.first_child()?.get_leaf()?;
    return Some(HeadToken {
      word: &word.value,
      tag,
      index: word.index(),
    });
  }
  let idx = head_child(tree)?;
  head_token(tree.child(idx)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tree(s: &str) -> ParseTree {
    s.parse().unwrap()
  }

  #[test]
  fn test_base_category() {
    assert_eq!(base_category("NP-SBJ-1"), "NP");
    assert_eq!(base_category("NP=2"), "NP");
    assert_eq!(base_category("-LRB-"), "-LRB-");
    assert_eq!(base_category("PRP$"), "PRP$");
  }

  #[test]
  fn test_collins_heads() {
    let np = tree("(NP (DT every) (JJ male) (NN student))");
    assert_eq!(head_child(&np), Some(2));

    let s = tree("(S (NP (NN dog)) (VP (VBZ bites)))");
    assert_eq!(head_child(&s), Some(1));
    assert_eq!(head_token(&s).unwrap().word, "bites");

    let pp = tree("(PP (IN on) (NP (DT the) (NN mat)))");
    assert_eq!(head_token(&pp).unwrap().word, "on");

    let coordinated = tree("(VP (VP (VBD read) (NP (NN book))) (CC and) (VP (VBD kissed) (NP (NN girl))))");
    assert_eq!(head_child(&coordinated), Some(0));
    assert_eq!(head_token(&coordinated).unwrap().index, 1);
  }

  #[test]
  fn test_coordinated_head_moves_to_first_conjunct() {
    let np = tree("(NP (NNS dogs) (CC and) (NNS cats))");
    assert_eq!(head_child(&np), Some(0));
    assert_eq!(head_token(&np).unwrap().word, "dogs");

    let object = tree("(NP (DT the) (NN salt) (CC and) (NN pepper))");
    assert_eq!(head_token(&object).unwrap().word, "salt");

    let phrase = tree("(NP (NNS dogs) (CONJP (RB rather) (IN than)) (NNS cats))");
    assert_eq!(head_child(&phrase), Some(0));

    let modified = tree("(NP (JJ big) (CC and) (JJ red) (NN dog))");
    assert_eq!(head_child(&modified), Some(3));
  }

  #[test]
  fn test_possessive_np_headed_by_owner() {
    let np = tree("(NP (NNP John) (POS 's))");
    assert_eq!(head_token(&np).unwrap().word, "John");
  }

  #[test]
  fn test_semantic_heads() {
    let modal = tree("(VP (MD will) (VP (VB go)))");
    assert_eq!(head_child(&modal), Some(1));

    let infinitive = tree("(VP (TO to) (VP (VB go)))");
    assert_eq!(head_token(&infinitive).unwrap().word, "go");

    let copula = tree("(VP (VBZ is) (ADJP (JJ happy)))");
    assert_eq!(head_token(&copula).unwrap().word, "happy");

    let possession = tree("(VP (VBZ has) (NP (DT a) (NN dog)))");
    assert_eq!(head_token(&possession).unwrap().word, "has");
  }

  #[test]
  fn test_unknown_category_defaults_left() {
    let weird = tree("(XYZ (NN a) (NN b))");
    assert_eq!(head_child(&weird), Some(0));
    assert_eq!(head_child(&tree("(NN dog)")), None);
  }
}
