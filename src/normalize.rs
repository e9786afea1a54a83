use crate::error::ParseError;
use crate::syntree::{Label, ParseTree};

/// Maps every parser-internal label to its plain category, keeping the
/// tree's shape and child order. The input is left untouched; canonical
/// labels pass through, so normalizing twice changes nothing.
pub fn normalize(tree: &ParseTree) -> Result<ParseTree, ParseError> {
  tree.check_shape()?;
  Ok(tree.map(
    &|c| Label::Category(c.value.category().to_string()),
    &|w| w.value.clone(),
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntree::{Annotated, Constituent, HeadWord, Score, SynTree, Word};

  fn annotated(category: &str, word: &str, index: usize, tag: &str) -> Label {
    Label::Internal(Annotated {
      category: category.into(),
      head: HeadWord {
        word: word.into(),
        index,
        tag: tag.into(),
      },
      score: Score(-0.5),
    })
  }

  fn raw() -> ParseTree {
    SynTree::Branch(
      Constituent {
        value: annotated("NP", "dog", 2, "NN"),
        span: (0, 2),
      },
      vec![
        SynTree::Branch(
          Constituent {
            value: annotated("DT", "the", 1, "DT"),
            span: (0, 1),
          },
          vec![SynTree::Leaf(Word {
            value: "the".into(),
            span: (0, 1),
          })],
        ),
        SynTree::Branch(
          Constituent {
            value: Label::Category("NN".into()),
            span: (1, 2),
          },
          vec![SynTree::Leaf(Word {
            value: "dog".into(),
            span: (1, 2),
          })],
        ),
      ],
    )
  }

  #[test]
  fn test_normalize_strips_annotations() {
    let tree = raw();
    let normal = normalize(&tree).unwrap();
    assert_eq!(normal.bracketed().to_string(), "(NP (DT the) (NN dog))");
    assert!(normal.leaves().iter().map(|w| w.span).eq(tree.leaves().iter().map(|w| w.span)));
    // the input still carries its annotations
    assert!(tree.get_branch().unwrap().0.value.is_internal());
  }

  #[test]
  fn test_normalize_idempotent() {
    let once = normalize(&raw()).unwrap();
    assert_eq!(normalize(&once).unwrap(), once);
  }

  #[test]
  fn test_normalize_rejects_empty_branch() {
    let tree: ParseTree = SynTree::Branch(
      Constituent {
        value: Label::Category("S".into()),
        span: (0, 0),
      },
      vec![],
    );
    assert!(matches!(normalize(&tree), Err(ParseError::InvalidTreeShape(_))));
  }
}
