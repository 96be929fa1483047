use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use trial_diff::{Record, Value, contains_values, equal_values};

fn nested(width: usize) -> Value {
    let rows = (0..width)
        .map(|row| {
            let cells = (0..width as u64).map(Value::Uint).collect();
            Value::Record(
                Record::new("Row")
                    .with_field("id", Value::Int(row as i64))
                    .with_field("label", Value::Str(format!("row-{row}")))
                    .with_field("cells", Value::Seq(cells)),
            )
        })
        .collect();
    Value::Map(vec![(Value::Str("rows".into()), Value::Seq(rows))])
}

fn keyed(size: u64, reverse: bool) -> Value {
    let mut entries: Vec<(Value, Value)> = (0..size)
        .map(|key| (Value::Uint(key), Value::Str(format!("value-{key}"))))
        .collect();
    if reverse {
        entries.reverse();
    }
    Value::Map(entries)
}

fn benchmark_map_keys(c: &mut Criterion) {
    let sizes: [u64; 3] = [256, 1024, 4096];
    let mut group = c.benchmark_group("map_keys");

    for size in sizes {
        let actual = keyed(size, false);
        let expected = keyed(size, true);
        group.throughput(Throughput::Elements(size));

        group.bench_with_input(BenchmarkId::new("equal", size), &size, |b, &_size| {
            b.iter(|| black_box(equal_values(black_box(&actual), black_box(&expected))));
        });

        group.bench_with_input(BenchmarkId::new("contains", size), &size, |b, &_size| {
            b.iter(|| black_box(contains_values(black_box(&actual), black_box(&expected))));
        });
    }

    group.finish();
}

fn benchmark_compare_paths(c: &mut Criterion) {
    let widths: [usize; 3] = [8, 32, 128];
    let mut group = c.benchmark_group("compare_paths");

    for width in widths {
        let actual = nested(width);
        let expected = nested(width);
        let subset = nested(width / 2);
        group.throughput(Throughput::Elements((width * width) as u64));

        group.bench_with_input(BenchmarkId::new("equal", width), &width, |b, &_width| {
            b.iter(|| black_box(equal_values(black_box(&actual), black_box(&expected))));
        });

        group.bench_with_input(BenchmarkId::new("contains", width), &width, |b, &_width| {
            b.iter(|| black_box(contains_values(black_box(&actual), black_box(&subset))));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_compare_paths, benchmark_map_keys);
criterion_main!(benches);
