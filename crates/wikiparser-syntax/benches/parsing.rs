use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::sync::Arc;
use wikiparser_config::Config;
use wikiparser_syntax::{MAX_STAGE, Selector, parse};

fn generate_wikitext(size: usize) -> String {
    let base = "== Section ==\n{{Infobox|name=Example|image=[[File:A.png|thumb|A ''caption'']]}}\n\
'''Bold''' text with a [[link|label]], a [https://example.org site] and {{cite|url=http://a.org}}.\n\
{| class=\"wikitable\"\n|-\n! Head !! Other\n|-\n| a || b\n|}\n* item <ref>note</ref>\n# numbered\n----\n";
    base.repeat(size)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    group.sample_size(10);
    let config = Arc::new(Config::default());

    for size in [10, 100] {
        let content = generate_wikitext(size);
        group.bench_with_input(BenchmarkId::new("full", size), &content, |b, content| {
            b.iter(|| {
                let tree = parse(std::hint::black_box(content), false, MAX_STAGE, Arc::clone(&config));
                std::hint::black_box(tree)
            });
        });
    }

    let content = generate_wikitext(100);
    group.bench_function("braces_only", |b| {
        b.iter(|| {
            let tree = parse(std::hint::black_box(&content), false, 2, Arc::clone(&config));
            std::hint::black_box(tree)
        });
    });

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let config = Arc::new(Config::default());
    let Ok(tree) = parse(&generate_wikitext(100), false, MAX_STAGE, Arc::clone(&config)) else {
        return;
    };
    let Ok(selector) = Selector::parse("table > tr:nth-child(odd) td, template parameter link") else {
        return;
    };
    c.bench_function("query_all", |b| {
        b.iter(|| std::hint::black_box(selector.query_all(&tree, tree.root())));
    });

    let mut group = c.benchmark_group("wide_siblings");
    for size in [1000, 8000] {
        let Ok(tree) = parse(&"<!--c-->".repeat(size), false, MAX_STAGE, Arc::clone(&config)) else {
            return;
        };
        for query in ["comment:nth-child(odd)", "comment + comment"] {
            let Ok(selector) = Selector::parse(query) else {
                return;
            };
            group.bench_with_input(BenchmarkId::new(query, size), &tree, |b, tree| {
                b.iter(|| std::hint::black_box(selector.query_all(tree, tree.root())));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_query);
criterion_main!(benches);
