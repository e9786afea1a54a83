use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lexparser::{tokenize, Grammar, ParseTree, SentenceParser, Token};

const GRAMMAR_SRC: &str = include_str!("../grammars/english.pcfg");

fn parse(parser: &mut SentenceParser, input: &[Token]) -> ParseTree {
  parser.best_parse_tokens(input).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
  let grammar = Arc::new(GRAMMAR_SRC.parse::<Grammar>().unwrap());
  let mut parser = SentenceParser::new(Arc::clone(&grammar));
  let simple_input = tokenize("some female dog bites every student");
  let complex_input = tokenize("every male student read some book and kissed a girl");

  c.bench_function("parse simple", |b| {
    b.iter(|| parse(&mut parser, black_box(&simple_input)))
  });

  c.bench_function("parse coordination", |b| {
    b.iter(|| parse(&mut parser, black_box(&complex_input)))
  });

  let tree = parse(&mut parser, &complex_input);
  c.bench_function("extract coordination dependencies", |b| {
    b.iter(|| parser.typed_dependencies(black_box(&tree)).unwrap())
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
