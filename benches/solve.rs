//! Micro-benchmarks for unification and clause resolution.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use hornlog::engine::{unify, Env};
use hornlog::{Engine, Term};

fn deep_term(depth: usize) -> Term {
    (0..depth).fold(Term::atom("leaf"), |acc, i| {
        Term::compound("f", [Term::Int(i as i64), acc])
    })
}

fn bench_unify(c: &mut Criterion) {
    let mut group = c.benchmark_group("unify");

    let left = deep_term(64);
    let right = deep_term(64);
    group.bench_function("ground_depth_64", |b| {
        let env = Env::new();
        b.iter(|| black_box(unify(black_box(&left), black_box(&right), &env, false)));
    });

    let vars = Term::compound("f", (0..32).map(|_| Term::var()));
    let values = Term::compound("f", (0..32i64).map(Term::Int));
    group.bench_function("bind_32_vars", |b| {
        let env = Env::new();
        b.iter(|| black_box(unify(black_box(&vars), black_box(&values), &env, false)));
    });

    group.finish();
}

fn bench_append(c: &mut Criterion) {
    let mut engine = Engine::new();
    engine
        .consult(
            "append([], L, L).
             append([X|L1], L2, [X|L3]) :- append(L1, L2, L3).",
        )
        .unwrap();

    let items: Vec<String> = (0..20).map(|i| format!("x{}", i)).collect();
    let list = format!("[{}]", items.join(", "));
    let query = format!("append(X, Y, {}).", list);

    let mut group = c.benchmark_group("solve");
    group.throughput(Throughput::Elements(21));
    group.bench_function("append_enumerate_20", |b| {
        b.iter(|| {
            let mut sols = engine.query(&query, &[]).unwrap();
            let mut n = 0;
            while sols.next() {
                n += 1;
            }
            black_box(n)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_unify, bench_append);
criterion_main!(benches);
