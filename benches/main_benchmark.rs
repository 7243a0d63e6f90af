use criterion::{Criterion, criterion_group, criterion_main};
use kbuild::kconfig::{
    ConfigState, ConfigStore, Graph, generate_build_variables, generate_definitions,
};
use std::fmt::Write;
use std::hint::black_box;

/// Chains of symbols, each depending on the previous one, with a mix of
/// types and conditional defaults.
fn mock_kconfig(count: usize) -> String {
    let mut out = String::from("mainmenu \"bench\"\n");
    for i in 0..count {
        let written = match i % 4 {
            0 => write!(out, "config SYM_{i}\n    bool \"Symbol {i}\"\n    default y\n"),
            1 => write!(out, "config SYM_{i}\n    tristate \"Symbol {i}\"\n    default m if SYM_{}\n", i - 1),
            2 => write!(out, "config SYM_{i}\n    int \"Symbol {i}\"\n    range 0 100\n    default {}\n", i % 100),
            _ => write!(out, "config SYM_{i}\n    string \"Symbol {i}\"\n    default \"value {i}\"\n"),
        };
        written.unwrap();
        if i > 0 {
            writeln!(out, "    depends on SYM_{} || SYM_0", i - if i % 4 == 3 { 3 } else { 1 }).unwrap();
        }
        out.push('\n');
    }
    out
}

fn bench_load(c: &mut Criterion) {
    let source = mock_kconfig(1000);
    c.bench_function("load_kconfig_1000", |b| {
        b.iter(|| Graph::parse(black_box(&source), "Kconfig").unwrap())
    });
}

fn bench_resolve(c: &mut Criterion) {
    let graph = Graph::parse(&mock_kconfig(1000), "Kconfig").unwrap();
    let state = graph.resolve(&ConfigState::new()).to_state();
    c.bench_function("resolve_1000", |b| {
        b.iter(|| graph.resolve(black_box(&state)).values().len())
    });
}

fn bench_generate(c: &mut Criterion) {
    let graph = Graph::parse(&mock_kconfig(1000), "Kconfig").unwrap();
    let resolved = graph.resolve(&ConfigState::new());
    c.bench_function("generate_artifacts_1000", |b| {
        b.iter(|| {
            let header = generate_definitions(black_box(&resolved), "CONFIG_");
            let vars = generate_build_variables(black_box(&resolved), "CONFIG_");
            header.len() + vars.len()
        })
    });
}

fn bench_state(c: &mut Criterion) {
    let graph = Graph::parse(&mock_kconfig(1000), "Kconfig").unwrap();
    let store = ConfigStore::default();
    let text = store.render(&graph.resolve(&ConfigState::new()).to_state(), &graph);
    c.bench_function("parse_config_1000", |b| {
        b.iter(|| store.parse(black_box(&text)).state.len())
    });
}

criterion_group!(benches, bench_load, bench_resolve, bench_generate, bench_state);
criterion_main!(benches);
