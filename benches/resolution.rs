use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use experiments::{configure_from_file, normalize, Context, Dispatcher, RawId};

fn criterion_benchmark(c: &mut Criterion) {
    let registry = configure_from_file("tests/data/config.json").unwrap();
    let sink = |_: &str| {};
    let dispatcher = Dispatcher::new(Some(&registry), &sink);

    {
        let mut group = c.benchmark_group("normalize");
        group.throughput(Throughput::Elements(1));
        let numeric = RawId::from(1_234_567);
        let text = RawId::from("owner@example.com");
        group.bench_function("integer", |b| b.iter(|| normalize(black_box(&numeric))));
        group.bench_function("string", |b| b.iter(|| normalize(black_box(&text))));
        group.finish();
    }

    {
        let mut group = c.benchmark_group("for_context");
        group.throughput(Throughput::Elements(1));
        let context = Context::new(42, Some("owner@example.com".into()));
        group.bench_function("fresh", |b| {
            b.iter(|| registry.for_context(black_box(&context), None))
        });
        let mut previous = registry.for_context(&context, None).unwrap();
        previous.mark_dirty("featureTwo");
        group.bench_function("with_dirty_features", |b| {
            b.iter(|| registry.for_context(black_box(&context), Some(previous.clone())))
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("feature");
        group.throughput(Throughput::Elements(1));
        let context = Context::new(42, Some(25.into()));
        let snapshot = registry.for_context(&context, None).unwrap();
        group.bench_function("snapshot", |b| {
            b.iter(|| dispatcher.feature(black_box("featureThree"), (&snapshot).into()))
        });
        group.bench_function("context", |b| {
            b.iter(|| dispatcher.feature(black_box("featureThree"), (&context).into()))
        });
        group.finish();
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
