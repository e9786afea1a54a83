use std::env;
use std::io;
use std::io::Write;
use std::process;
use std::sync::Arc;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use lexparser::{
  normalize, tokenize, DependencyExtractor, Err, ExtractorOptions, Grammar, Parser, ParserOptions,
};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} FILE [options]

Options:
  -h, --help             Print this message
  -t, --tree             Print the parse tree
  -d, --deps             Print the typed dependencies
                         (with neither -t nor -d, both are printed)
  -c, --chart            Print the parse chart (defaults to not printing)
  -b, --basic            Basic dependencies: no collapsing, no conjunct propagation
  -r, --root             Include the root dependency
  -m, --max-length N     Longest sentence to attempt (defaults to {})",
    prog_name,
    ParserOptions::default().max_length
  )
}

fn parse(
  parser: &mut Parser,
  extractor: &DependencyExtractor,
  sentence: &str,
  opts: &Args,
) -> Result<(), Err> {
  let tokens = tokenize(sentence);

  let raw = match parser.best_parse(&tokens) {
    Ok(raw) => raw,
    Err(e) => {
      warn!(sentence, "parse failed");
      println!("{}\n", e);
      return Ok(());
    }
  };

  if opts.print_chart {
    println!("chart:\n{}\n", parser.chart().display(parser.grammar(), &tokens));
  }

  let tree = normalize(&raw)?;
  if opts.print_tree {
    println!("{}", tree.bracketed());
  }

  if opts.print_deps {
    match extractor.extract(&tree) {
      Ok(deps) => {
        for dep in deps {
          println!("{}", dep);
        }
      }
      Err(e) => println!("{}", e),
    }
  }
  println!();

  Ok(())
}

struct Args {
  filename: String,
  print_tree: bool,
  print_deps: bool,
  print_chart: bool,
  basic: bool,
  include_root: bool,
  max_length: usize,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let Some(prog_name) = iter.next() else {
      return Err(Self::make_error_message("bad argument vector", "lexparser"));
    };

    let mut filename: Option<String> = None;
    let mut print_tree = false;
    let mut print_deps = false;
    let mut print_chart = false;
    let mut basic = false;
    let mut include_root = false;
    let mut max_length = ParserOptions::default().max_length;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-t" || o == "--tree" {
        print_tree = true;
      } else if o == "-d" || o == "--deps" {
        print_deps = true;
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-b" || o == "--basic" {
        basic = true;
      } else if o == "-r" || o == "--root" {
        include_root = true;
      } else if o == "-m" || o == "--max-length" {
        max_length = iter
          .next()
          .and_then(|n| n.parse().ok())
          .ok_or_else(|| Self::make_error_message("--max-length needs a number", &prog_name))?;
      } else if filename.is_none() {
        filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    if !print_tree && !print_deps {
      print_tree = true;
      print_deps = true;
    }

    if let Some(filename) = filename {
      Ok(Self {
        filename,
        print_tree,
        print_deps,
        print_chart,
        basic,
        include_root,
        max_length,
      })
    } else {
      Err(Self::make_error_message("missing filename", prog_name))
    }
  }

  fn parser_options(&self) -> ParserOptions {
    ParserOptions {
      max_length: self.max_length,
      ..ParserOptions::default()
    }
  }

  fn extractor_options(&self) -> ExtractorOptions {
    let base = if self.basic {
      ExtractorOptions::basic()
    } else {
      ExtractorOptions::default()
    };
    ExtractorOptions {
      include_root: self.include_root,
      ..base
    }
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let g = Arc::new(Grammar::read_from_file(&opts.filename)?);
  let mut parser = Parser::with_options(g, opts.parser_options());
  let extractor = DependencyExtractor::with_options(opts.extractor_options());

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        parse(&mut parser, &extractor, input.trim(), &opts)?;
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
