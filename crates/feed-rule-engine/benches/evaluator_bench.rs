//! 条件评估器性能基准测试
//!
//! 针对 ConditionEvaluator 的各操作符做细粒度性能测试。

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rule_engine::{ConditionEvaluator, Operator};
use serde_json::{Value, json};
use std::hint::black_box;

/// 相等比较基准
fn bench_equality_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("equality_operations");

    let number_field = json!(1000);
    let number_expected = json!(500);

    group.bench_function("equals_numeric", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&number_field)),
                black_box(Operator::Equals),
                black_box(&number_expected),
            )
        })
    });

    group.bench_function("not_equals_numeric", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&number_field)),
                black_box(Operator::NotEquals),
                black_box(&number_expected),
            )
        })
    });

    let string_field = json!("running-shoes");
    let string_expected = json!("running-shoes");

    group.bench_function("equals_string", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&string_field)),
                black_box(Operator::Equals),
                black_box(&string_expected),
            )
        })
    });

    // 数字与数字字符串的混合比较走数值路径
    let string_number = json!("1000");
    group.bench_function("equals_mixed_numeric", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&number_field)),
                black_box(Operator::Equals),
                black_box(&string_number),
            )
        })
    });

    group.finish();
}

/// 字符串匹配基准
fn bench_string_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_operations");

    let field = json!("Acme Air Runner 2024 Limited Edition");

    let infix = json!("Runner");
    group.bench_function("contains", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&field)),
                black_box(Operator::Contains),
                black_box(&infix),
            )
        })
    });

    let prefix = json!("Acme");
    group.bench_function("starts_with", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&field)),
                black_box(Operator::StartsWith),
                black_box(&prefix),
            )
        })
    });

    let suffix = json!("Edition");
    group.bench_function("ends_with", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&field)),
                black_box(Operator::EndsWith),
                black_box(&suffix),
            )
        })
    });

    group.finish();
}

/// 数值比较基准
fn bench_numeric_comparisons(c: &mut Criterion) {
    let mut group = c.benchmark_group("numeric_comparisons");

    let field = json!(149.99);
    let threshold = json!(100);

    group.bench_function("greater_than", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&field)),
                black_box(Operator::GreaterThan),
                black_box(&threshold),
            )
        })
    });

    group.bench_function("less_than", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&field)),
                black_box(Operator::LessThan),
                black_box(&threshold),
            )
        })
    });

    // 字符串形式的数字需要先解析
    let string_field = json!("149.99");
    group.bench_function("greater_than_string_number", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&string_field)),
                black_box(Operator::GreaterThan),
                black_box(&threshold),
            )
        })
    });

    group.finish();
}

/// 正则匹配基准（含每次调用的编译开销）
fn bench_regex_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex_operations");

    let sku = json!("SKU-2024-RUN-0042");

    let simple_pattern = json!(r"^SKU-");
    group.bench_function("simple_regex", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&sku)),
                black_box(Operator::Regex),
                black_box(&simple_pattern),
            )
        })
    });

    let complex_pattern = json!(r"^SKU-\d{4}-[A-Z]{3}-\d{4}$");
    group.bench_function("complex_regex", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&sku)),
                black_box(Operator::Regex),
                black_box(&complex_pattern),
            )
        })
    });

    let invalid_pattern = json!("[");
    group.bench_function("invalid_regex", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&sku)),
                black_box(Operator::Regex),
                black_box(&invalid_pattern),
            )
        })
    });

    group.finish();
}

/// in 操作符在不同列表大小下的性能
fn bench_membership_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("membership_scaling");

    let field = json!("target");

    for size in [5, 10, 50, 100, 500].iter() {
        let list: Vec<Value> = (0..*size)
            .map(|i| {
                if i == size - 1 {
                    json!("target")
                } else {
                    json!(format!("item_{}", i))
                }
            })
            .collect();
        let list_value = Value::Array(list);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                ConditionEvaluator::evaluate(
                    black_box(Some(&field)),
                    black_box(Operator::In),
                    black_box(&list_value),
                )
            })
        });
    }

    group.finish();
}

/// 缺失字段处理基准
fn bench_missing_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("missing_field");

    let expected = json!("test");

    group.bench_function("equals_missing", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(None),
                black_box(Operator::Equals),
                black_box(&expected),
            )
        })
    });

    let threshold = json!(100);
    group.bench_function("greater_than_missing", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(None),
                black_box(Operator::GreaterThan),
                black_box(&threshold),
            )
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_equality_operations,
    bench_string_operations,
    bench_numeric_comparisons,
    bench_regex_operations,
    bench_membership_scaling,
    bench_missing_field,
);

criterion_main!(benches);
