//! Criterion benchmarks for parsing and printing.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use skylint_syntax::{format_string, parse_build, parse_bzl, tokenize};
use std::hint::black_box;

const BUILD_SRC: &str = r#"load("@rules_cc//cc:defs.bzl", "cc_binary", "cc_library")

cc_library(
    name = "base",
    srcs = ["base.cc", "util.cc"],
    hdrs = ["base.h"],
    deps = ["//common:strings"],
)

cc_binary(
    name = "main",
    srcs = ["main.cc"],
    deps = [":base"],
)
"#;

const BZL_SRC: &str = r#"def _impl(ctx):
    outputs = []
    for src in ctx.files.srcs:
        out = ctx.actions.declare_file(src.basename + ".gen")
        outputs.append(out)
    return [DefaultInfo(files = depset(outputs))]

my_rule = rule(
    implementation = _impl,
    attrs = {
        "srcs": attr.label_list(allow_files = True),
    },
)
"#;

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    group.throughput(Throughput::Bytes(BUILD_SRC.len() as u64));
    group.bench_function("build", |b| {
        b.iter(|| tokenize(black_box(BUILD_SRC)).expect("tokenize error"))
    });
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(BUILD_SRC.len() as u64));
    group.bench_function("build", |b| {
        b.iter(|| parse_build(black_box("BUILD"), black_box(BUILD_SRC)).expect("parse error"))
    });
    group.throughput(Throughput::Bytes(BZL_SRC.len() as u64));
    group.bench_function("bzl", |b| {
        b.iter(|| parse_bzl(black_box("rules.bzl"), black_box(BZL_SRC)).expect("parse error"))
    });
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let file = parse_build("BUILD", BUILD_SRC).expect("parse error");
    c.bench_function("format/build", |b| {
        b.iter(|| format_string(black_box(&file)))
    });
}

criterion_group!(benches, bench_tokenize, bench_parse, bench_roundtrip);
criterion_main!(benches);
