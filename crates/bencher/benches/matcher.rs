use std::hint::black_box;
use bencher::{templates, TestCase};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use micro_dispatch::router::RouteTable;

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("small_first_route", "/api/resource0"),
        TestCase::small("small_nested_route", "/api/resource3/42/items/7"),
        TestCase::small("small_no_match", "/missing/route"),
        TestCase::large("large_last_route", "/api/resource63/42/items/7"),
        TestCase::large("large_no_match", "/missing/route"),
    ]
}

fn route_table(case: &TestCase) -> RouteTable<usize> {
    let mut table = RouteTable::new();
    for resource in 0..case.group().resources() {
        for (index, template) in templates(resource).iter().enumerate() {
            table.register(Method::GET, template, resource * 3 + index).expect("bench templates should be valid");
        }
    }
    table
}

fn benchmark_route_matcher(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("route_matcher");

    for case in create_test_cases() {
        let table = route_table(&case);
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter(|| {
                let matched = table.at(&Method::GET, black_box(case.path())).map(|m| (*m.target(), m.into_values()));
                black_box(matched);
            });
        });
    }

    group.finish();
}

criterion_group!(matcher, benchmark_route_matcher);
criterion_main!(matcher);
