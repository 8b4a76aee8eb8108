use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use instagram_bot_detector::dataset::{DatasetAssembler, DatasetConfig};
use instagram_bot_detector::feature_engineering::{synthesize, FeatureLayout, TfidfVectorizer};
use instagram_bot_detector::profile::ProfileRecord;
use instagram_bot_detector::training::{XGBoostClassifier, XGBoostConfig};
use rand::prelude::*;

fn create_records(n_rows: usize, bot: bool) -> Vec<ProfileRecord> {
    let mut rng = StdRng::seed_from_u64(if bot { 1 } else { 2 });

    (0..n_rows)
        .map(|_| {
            let name_len = rng.gen_range(6..16u64);
            let (followers, following, digits) = if bot {
                (rng.gen_range(0..60), rng.gen_range(1000..5000), rng.gen_range(2..name_len.min(7)))
            } else {
                (rng.gen_range(300..20000), rng.gen_range(50..800), rng.gen_range(0..3))
            };
            ProfileRecord {
                follower_count: followers,
                following_count: following,
                biography_length: if bot { rng.gen_range(0..10) } else { rng.gen_range(10..150) },
                media_count: if bot { rng.gen_range(0..5) } else { rng.gen_range(20..500) },
                has_profile_picture: !bot || rng.gen_bool(0.2),
                is_private: rng.gen_bool(0.3),
                username_digit_count: digits,
                username_length: name_len,
            }
        })
        .collect()
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");

    for n_rows in [1000, 5000].iter() {
        let records = create_records(*n_rows, false);

        group.bench_with_input(BenchmarkId::new("synthesize_tfidf", n_rows), &records, |b, records| {
            b.iter(|| {
                let descriptions: Vec<String> = records.iter().map(|r| synthesize(r).description).collect();
                let mut vectorizer = TfidfVectorizer::new();
                vectorizer.fit_transform(black_box(&descriptions)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [500, 2000].iter() {
        let dataset = DatasetAssembler::new(DatasetConfig::default())
            .assemble_records(create_records(*n_rows / 2, true), create_records(*n_rows / 2, false))
            .unwrap();
        let mut vectorizer = TfidfVectorizer::new();
        let text = vectorizer.fit_transform(&dataset.train_descriptions()).unwrap();
        let layout = FeatureLayout::new(vectorizer.n_features());
        let x = layout.assemble(&text, &dataset.train_numeric()).unwrap();
        let y = dataset.train_labels();

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                let config = XGBoostConfig {
                    n_estimators: 50,
                    max_depth: 4,
                    ..XGBoostConfig::default()
                };
                let mut model = XGBoostClassifier::new(config);
                model.fit(black_box(x), black_box(y)).unwrap();
                model
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_features, bench_training);
criterion_main!(benches);
