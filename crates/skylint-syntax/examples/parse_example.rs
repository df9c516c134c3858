//! Parses a Starlark file given on the command line (or a built-in sample)
//! and prints the reformatted output plus a node-count summary.
//!
//! Run with:
//!
//! ```sh
//! cargo run --example parse_example -- path/to/BUILD
//! ```

use skylint_syntax::{
    format_string, parse, prettify_error, walk_file, Expr, FileKind,
};

const SAMPLE: &str = r#"load(":defs.bzl", "my_rule")

my_rule(
    name = "sample",
    srcs = ["a.star", "b.star"],
)
"#;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let (label, source) = match args.get(1) {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("error reading {}: {}", path, e);
                std::process::exit(1);
            });
            (path.clone(), text)
        }
        None => ("<sample>".to_owned(), SAMPLE.to_owned()),
    };

    let file = match parse(&label, &source, FileKind::Default) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", prettify_error(&source, &e, &label));
            std::process::exit(1);
        }
    };

    let mut nodes = 0usize;
    let mut calls = 0usize;
    walk_file(&file, &mut |node, _| {
        nodes += 1;
        if matches!(node, Expr::Call(_)) {
            calls += 1;
        }
    });

    println!("{}", format_string(&file));
    println!("# {} statements, {} nodes, {} calls", file.stmts.len(), nodes, calls);
}
