use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{FailureReason, ParseError};
use crate::grammar::{Grammar, HeadInfo, ItemLabel, SymbolId};
use crate::syntree::{Annotated, Constituent, HeadWord, Label, ParseTree, Score, SynTree, Word};
use crate::token::Token;

#[derive(Debug, Clone)]
pub struct ParserOptions {
  /// Longer sentences fail instead of being parsed
  pub max_length: usize,
  /// Category the full-span item must have; the grammar's start symbol if unset
  pub root: Option<String>,
}

impl Default for ParserOptions {
  fn default() -> Self {
    Self {
      max_length: 80,
      root: None,
    }
  }
}

/// Index of an edge in the chart arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EdgeId(u32);

#[derive(Debug, Copy, Clone)]
enum Back {
  Lexical,
  Unary(EdgeId),
  Binary(EdgeId, EdgeId),
}

/// A scored item over `start..end` with lexical head token `head`
#[derive(Debug, Copy, Clone)]
struct Edge {
  start: usize,
  end: usize,
  label: ItemLabel,
  head: usize,
  tag: SymbolId,
  score: f64,
  back: Back,
}

type EdgeKey = (ItemLabel, usize, SymbolId);

#[derive(Debug, Default, Clone)]
struct Cell {
  index: HashMap<EdgeKey, EdgeId>,
  by_label: HashMap<ItemLabel, Vec<EdgeId>>,
  items: Vec<EdgeId>,
}

impl Cell {
  fn clear(&mut self) {
    self.index.clear();
    self.by_label.clear();
    self.items.clear();
  }
}

/// The dynamic-programming table. Edges live in one arena and refer to
/// their children by `EdgeId`; cells index the arena by span.
#[derive(Debug, Default)]
pub struct Chart {
  len: usize,
  edges: Vec<Edge>,
  cells: Vec<Cell>,
}

impl Chart {
  pub fn new() -> Self {
    Default::default()
  }

  /// Clears the chart for a sentence of `len` tokens, keeping allocations
  pub fn reset(&mut self, len: usize) {
    self.len = len;
    self.edges.clear();
    let wanted = (len + 1) * (len + 1);
    if self.cells.len() < wanted {
      self.cells.resize_with(wanted, Default::default);
    }
    self.cells.iter_mut().for_each(Cell::clear);
  }

  /// Number of tokens the chart was last reset for
  pub fn sentence_len(&self) -> usize {
    self.len
  }

  /// Number of edges in the arena
  pub fn len(&self) -> usize {
    self.edges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn len_at(&self, start: usize, end: usize) -> usize {
    self.cell(start, end).items.len()
  }

  fn cell_idx(&self, start: usize, end: usize) -> usize {
    start * (self.len + 1) + end
  }

  fn cell(&self, start: usize, end: usize) -> &Cell {
    &self.cells[self.cell_idx(start, end)]
  }

  fn edge(&self, id: EdgeId) -> &Edge {
    &self.edges[id.0 as usize]
  }

  /// Records a candidate. Returns the edge id if the candidate created a new
  /// edge or strictly improved an existing one.
  fn offer(&mut self, candidate: Edge) -> Option<EdgeId> {
    let cell_idx = self.cell_idx(candidate.start, candidate.end);
    let key = (candidate.label, candidate.head, candidate.tag);

    if let Some(&id) = self.cells[cell_idx].index.get(&key) {
      let existing = &mut self.edges[id.0 as usize];
      // ties keep the first derivation found
      if candidate.score > existing.score {
        existing.score = candidate.score;
        existing.back = candidate.back;
        return Some(id);
      }
      return None;
    }

    let id = EdgeId(self.edges.len() as u32);
    self.edges.push(candidate);
    let cell = &mut self.cells[cell_idx];
    cell.index.insert(key, id);
    cell.by_label.entry(candidate.label).or_default().push(id);
    cell.items.push(id);
    Some(id)
  }

  /// Resets the chart, then fills it bottom-up for `tokens`. Words are
  /// numbered by their position in `tokens`; `Token::index` is not consulted.
  pub fn fill(&mut self, g: &Grammar, tokens: &[Token]) -> Result<(), ParseError> {
    self.reset(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
      let tags = g.tags_for(&token.word);
      if tags.is_empty() {
        return Err(ParseError::failure(FailureReason::UnknownWord {
          word: token.word.clone(),
          index: i + 1,
        }));
      }
      for &(tag, logprob) in tags {
        self.offer(Edge {
          start: i,
          end: i + 1,
          label: ItemLabel::Category(tag),
          head: i,
          tag,
          score: logprob,
          back: Back::Lexical,
        });
      }
      self.unary_closure(g, i, i + 1);
    }

    let n = tokens.len();
    for width in 2..=n {
      for start in 0..=n - width {
        let end = start + width;
        for split in start + 1..end {
          self.combine(g, tokens, start, split, end);
        }
        self.unary_closure(g, start, end);
        trace!(start, end, items = self.len_at(start, end), "cell complete");
      }
    }

    Ok(())
  }

  /// All binary combinations of `start..split` with `split..end`
  fn combine(&mut self, g: &Grammar, tokens: &[Token], start: usize, split: usize, end: usize) {
    let left_ids = self.cell(start, split).items.clone();
    for left_id in left_ids {
      let left = *self.edge(left_id);
      for step in g.steps_from(left.label) {
        let right_ids = match self.cell(split, end).by_label.get(&step.right) {
          Some(ids) => ids.clone(),
          None => continue,
        };
        for right_id in right_ids {
          let right = *self.edge(right_id);
          let (head, dependent) = if step.head_left {
            (left, right)
          } else {
            (right, left)
          };
          let adjustment = g.affinity_ids(
            step.parent,
            HeadInfo {
              word: &tokens[head.head].word,
              tag: head.tag,
            },
            HeadInfo {
              word: &tokens[dependent.head].word,
              tag: dependent.tag,
            },
          );
          self.offer(Edge {
            start,
            end,
            label: step.result,
            head: head.head,
            tag: head.tag,
            score: left.score + right.score + step.logprob + adjustment,
            back: Back::Binary(left_id, right_id),
          });
        }
      }
    }
  }

  /// Applies unary rules in a cell until no item improves. Rule
  /// log-probabilities are never positive, so this terminates.
  fn unary_closure(&mut self, g: &Grammar, start: usize, end: usize) {
    let mut agenda = self
      .cell(start, end)
      .items
      .iter()
      .copied()
      .collect::<VecDeque<_>>();

    while let Some(id) = agenda.pop_front() {
      let edge = *self.edge(id);
      let ItemLabel::Category(child) = edge.label else {
        continue;
      };
      for &(parent, logprob) in g.unary_parents(child) {
        let improved = self.offer(Edge {
          label: ItemLabel::Category(parent),
          score: edge.score + logprob,
          back: Back::Unary(id),
          ..edge
        });
        if let Some(improved) = improved {
          agenda.push_back(improved);
        }
      }
    }
  }

  /// The best full-span item labelled `root`, first found on ties
  fn best_root(&self, root: SymbolId) -> Option<EdgeId> {
    let ids = self
      .cell(0, self.len)
      .by_label
      .get(&ItemLabel::Category(root))?;
    let mut best: Option<EdgeId> = None;
    for &id in ids {
      match best {
        Some(b) if self.edge(b).score >= self.edge(id).score => {}
        _ => best = Some(id),
      }
    }
    best
  }

  fn category_name(&self, g: &Grammar, label: ItemLabel) -> String {
    match label {
      ItemLabel::Category(sym) => g.symbol_name(sym).to_string(),
      // binarization intermediates never surface in a finished tree
      ItemLabel::Partial(rule, _, _) => format!("@{}", g.rule(rule).symbol_str()),
    }
  }

  fn build_tree(&self, g: &Grammar, tokens: &[Token], id: EdgeId) -> ParseTree {
    let edge = self.edge(id);
    let cons = Constituent {
      value: Label::Internal(Annotated {
        category: self.category_name(g, edge.label),
        head: HeadWord {
          word: tokens[edge.head].word.clone(),
          index: edge.head + 1,
          tag: g.symbol_name(edge.tag).to_string(),
        },
        score: Score(edge.score),
      }),
      span: (edge.start, edge.end),
    };

    let children = match edge.back {
      Back::Lexical => vec![SynTree::Leaf(Word {
        value: tokens[edge.head].word.clone(),
        span: (edge.head, edge.head + 1),
      })],
      Back::Unary(child) => vec![self.build_tree(g, tokens, child)],
      Back::Binary(left, right) => {
        let mut children = Vec::new();
        self.flatten_into(g, tokens, left, &mut children);
        self.flatten_into(g, tokens, right, &mut children);
        children
      }
    };

    SynTree::Branch(cons, children)
  }

  /// Partial items contribute their children to the enclosing constituent
  fn flatten_into(&self, g: &Grammar, tokens: &[Token], id: EdgeId, out: &mut Vec<ParseTree>) {
    let edge = self.edge(id);
    match (edge.label, edge.back) {
      (ItemLabel::Partial(..), Back::Binary(left, right)) => {
        self.flatten_into(g, tokens, left, out);
        self.flatten_into(g, tokens, right, out);
      }
      _ => out.push(self.build_tree(g, tokens, id)),
    }
  }

  /// Lists every cell's items with their labels and scores
  pub fn display<'a>(&'a self, g: &'a Grammar, tokens: &'a [Token]) -> ChartDisplay<'a> {
    ChartDisplay {
      chart: self,
      grammar: g,
      tokens,
    }
  }
}

pub struct ChartDisplay<'a> {
  chart: &'a Chart,
  grammar: &'a Grammar,
  tokens: &'a [Token],
}

impl fmt::Display for ChartDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let n = self.chart.len;
    for width in 1..=n {
      for start in 0..=n - width {
        let end = start + width;
        let cell = self.chart.cell(start, end);
        if cell.items.is_empty() {
          continue;
        }
        writeln!(f, "Span {}..{}:", start, end)?;
        for &id in cell.items.iter() {
          let edge = self.chart.edge(id);
          writeln!(
            f,
            "  {}[{}-{}/{}] {:.4}",
            self.chart.category_name(self.grammar, edge.label),
            self.tokens[edge.head].word,
            edge.head + 1,
            self.grammar.symbol_name(edge.tag),
            edge.score
          )?;
        }
      }
    }
    Ok(())
  }
}

/// Runs the whole search, reusing `chart`'s allocations
fn parse_with(
  g: &Grammar,
  options: &ParserOptions,
  chart: &mut Chart,
  tokens: &[Token],
) -> Result<ParseTree, ParseError> {
  if tokens.is_empty() {
    return Err(ParseError::failure(FailureReason::EmptyInput));
  }
  if tokens.len() > options.max_length {
    return Err(ParseError::failure(FailureReason::TooLong {
      length: tokens.len(),
      max: options.max_length,
    }));
  }

  let root = match &options.root {
    Some(name) => g
      .symbol_id(name)
      .ok_or_else(|| ParseError::failure(FailureReason::NoSpanningDerivation))?,
    None => g.start_id(),
  };

  chart.fill(g, tokens)?;

  let best = chart
    .best_root(root)
    .ok_or_else(|| ParseError::failure(FailureReason::NoSpanningDerivation))?;

  debug!(
    tokens = tokens.len(),
    edges = chart.len(),
    score = chart.edge(best).score,
    "best parse found"
  );

  Ok(chart.build_tree(g, tokens, best))
}

impl Grammar {
  /// Finds the most probable tree using a fresh chart. Safe to call from
  /// many threads on a shared grammar.
  pub fn best_parse(&self, tokens: &[Token], options: &ParserOptions) -> Result<ParseTree, ParseError> {
    let mut chart = Chart::new();
    parse_with(self, options, &mut chart, tokens)
  }
}

/// A parser bound to one grammar, reusing its chart between sentences.
/// `best_parse` takes `&mut self`, so a parser serves one sentence at a time;
/// share the `Arc<Grammar>` and give each thread its own `Parser`.
#[derive(Debug)]
pub struct Parser {
  grammar: Arc<Grammar>,
  options: ParserOptions,
  chart: Chart,
}

impl Parser {
  pub fn new(grammar: Arc<Grammar>) -> Self {
    Self::with_options(grammar, ParserOptions::default())
  }

  pub fn with_options(grammar: Arc<Grammar>, options: ParserOptions) -> Self {
    Self {
      grammar,
      options,
      chart: Chart::new(),
    }
  }

  pub fn grammar(&self) -> &Arc<Grammar> {
    &self.grammar
  }

  pub fn options(&self) -> &ParserOptions {
    &self.options
  }

  /// The chart of the most recent call
  pub fn chart(&self) -> &Chart {
    &self.chart
  }

  /// Resets the scratch chart, then parses `tokens`. Leaves are numbered
  /// by position, whatever the tokens' own indices say.
  pub fn best_parse(&mut self, tokens: &[Token]) -> Result<ParseTree, ParseError> {
    self.chart.reset(0);
    parse_with(&self.grammar, &self.options, &mut self.chart, tokens)
  }
}
