// Performance benchmarks for encoding and cosine search
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand::rngs::StdRng;
use sommelier_core::{Catalog, IndexState, NeighborSearch, WineProfile, WineRecord};
use sommelier_encoder::{EncoderConfig, FeatureEncoder};
use sommelier_recommend::{FoodQuery, QueryRequest, Recommender, RecommenderConfig};

const COUNTRIES: [&str; 8] = ["France", "Italy", "Spain", "Portugal", "Chile", "Argentina", "Germany", "Brazil"];
const TYPES: [&str; 5] = ["Red", "White", "Rosé", "Sparkling", "Dessert"];
const BODIES: [&str; 5] = ["Very light-bodied", "Light-bodied", "Medium-bodied", "Full-bodied", "Very full-bodied"];
const ACIDITY: [&str; 3] = ["Low", "Medium", "High"];
const FOODS: [&str; 8] = ["Beef", "Lamb", "Poultry", "Shellfish", "Pasta", "Cheese", "Grilled Meat", "Lean Fish"];

fn generate_catalog(size: usize) -> Vec<WineRecord> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..size)
        .map(|i| {
            let grapes: Vec<String> = (0..rng.random_range(1..4))
                .map(|_| format!("Grape {}", rng.random_range(0..200)))
                .collect();
            let harmonize: Vec<&str> = FOODS.choose_multiple(&mut rng, 3).copied().collect();
            WineRecord::new(
                i as u64,
                format!("Wine {}", i),
                *COUNTRIES.choose(&mut rng).unwrap(),
                *TYPES.choose(&mut rng).unwrap(),
            )
            .with_grapes(grapes)
            .with_body(*BODIES.choose(&mut rng).unwrap())
            .with_acidity(*ACIDITY.choose(&mut rng).unwrap())
            .with_abv(rng.random_range(8.0..16.0))
            .with_coordinates(rng.random_range(-45.0..55.0), rng.random_range(-75.0..30.0))
            .with_harmonize(harmonize)
            .with_ratings(rng.random_range(2.5..4.8), rng.random_range(1..500), rng.random_range(0.0..1.0))
        })
        .collect()
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [1_000, 10_000, 100_000].iter() {
        let records = generate_catalog(*size);
        let state = FeatureEncoder::new(EncoderConfig::default()).fit(&records).unwrap();

        group.bench_with_input(BenchmarkId::new("fit", size), &records, |b, records| {
            b.iter(|| FeatureEncoder::new(EncoderConfig::default()).fit(black_box(records)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("transform", size), &records, |b, records| {
            b.iter(|| state.transform(black_box(records)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for size in [10_000, 100_000].iter() {
        let records = generate_catalog(*size);
        let state = FeatureEncoder::new(EncoderConfig::default()).fit(&records).unwrap();
        let index = IndexState::build(&state.transform(&records).unwrap()).unwrap();
        let query = state
            .transform_one(&WineProfile::new().with_type("Red").with_grapes(["Grape 7"]).with_abv(13.5))
            .unwrap();

        group.bench_with_input(BenchmarkId::new("knn_k20", size), &query, |b, query| {
            b.iter(|| {
                let results = index.query(black_box(query), 20).unwrap();
                black_box(results);
            });
        });
    }

    group.finish();
}

fn benchmark_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");

    let catalog = Catalog::new(generate_catalog(100_000)).unwrap();
    let engine = Recommender::fit(catalog, &EncoderConfig::default(), RecommenderConfig::default()).unwrap();

    let request = QueryRequest::new(
        WineProfile::new()
            .with_type("Red")
            .with_body("Full-bodied")
            .with_grapes(["Grape 3"]),
    )
    .with_country("Portugal")
    .with_n(5);
    group.bench_function("characteristics_country", |b| {
        b.iter(|| black_box(engine.recommend_by_characteristics(black_box(&request)).unwrap()));
    });

    let food = FoodQuery::new("meat").with_n(5);
    group.bench_function("food_loose", |b| {
        b.iter(|| black_box(engine.recommend_by_food(black_box(&food)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_query, benchmark_recommend);
criterion_main!(benches);
