use criterion::{black_box, criterion_group, criterion_main, Criterion};

use learnmetric_core::answer_key::{AnswerKey, AnswerKeyEntry};
use learnmetric_core::cohort::process;
use learnmetric_core::decoder::decode;
use learnmetric_core::model::{CellValue, Grade, Phase, StudentRecord, MAX_QUESTIONS};
use learnmetric_core::scorer::score;

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let quoted = CellValue::from(r#""{""value"":2}""#);
    let plain = CellValue::from(r#"{"value":2}"#);
    let garbage = CellValue::from("not an answer");
    let blank = CellValue::Empty;

    group.bench_function("quoted", |b| b.iter(|| decode(black_box(&quoted))));
    group.bench_function("plain", |b| b.iter(|| decode(black_box(&plain))));
    group.bench_function("garbage", |b| b.iter(|| decode(black_box(&garbage))));
    group.bench_function("blank", |b| b.iter(|| decode(black_box(&blank))));

    group.finish();
}

fn answer_key() -> AnswerKey {
    let entries = (1..=5u32).flat_map(|grade| {
        Phase::ALL.into_iter().flat_map(move |phase| {
            (1..=MAX_QUESTIONS).map(move |question| AnswerKeyEntry {
                grade: Grade(grade),
                phase,
                question,
                correct: ((grade + question) % 4) as i64,
            })
        })
    });
    AnswerKey::from_entries(entries).expect("generated key has no conflicts")
}

fn generate_records(count: usize) -> Vec<StudentRecord> {
    (0..count)
        .map(|i| StudentRecord {
            student_id: format!("S{i:05}"),
            state: if i % 2 == 0 { "KA" } else { "TN" }.to_string(),
            center: format!("Center {}", i % 20),
            grade: Some(Grade((i % 5) as u32 + 1)),
            answers: (1..=MAX_QUESTIONS)
                .map(|q| (q, CellValue::from(format!(r#"{{"value":{}}}"#, (i as u32 + q) % 4))))
                .collect(),
        })
        .collect()
}

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let key = answer_key();
    let records = generate_records(1);

    group.bench_function("single_student", |b| {
        b.iter(|| score(black_box(&records[0]), black_box(&key), Phase::Baseline))
    });

    for size in [100, 1_000, 10_000] {
        let baseline = generate_records(size);
        let endline = generate_records(size);
        group.bench_function(format!("cohort_{size}"), |b| {
            b.iter(|| process(black_box(baseline.clone()), black_box(endline.clone()), &key))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_scoring);
criterion_main!(benches);
