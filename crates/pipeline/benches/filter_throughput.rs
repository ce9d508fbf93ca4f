//! Benchmarks for filtering passes
//!
//! Run with: cargo bench --package pipeline
//!
//! Builds a synthetic library of 20,000 items and times a cheap-only rule
//! and a rule that needs people for every surviving item.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use library::{ItemKind, LibraryIndex, MediaItem, Person, PersonRole, User};
use pipeline::{FilterPipeline, build_user_context};
use rules::{Condition, ConditionGroup, RuleCompiler, RuleDefinition};
use uuid::Uuid;

const GENRES: [&str; 5] = ["Drama", "Comedy", "Horror", "Action", "Documentary"];

fn build_library(size: usize) -> (LibraryIndex, User, Vec<MediaItem>) {
    let mut index = LibraryIndex::new();
    let owner = User {
        id: Uuid::new_v4(),
        name: "bench".to_string(),
    };
    index.insert_user(owner.clone());

    let mut items = Vec::with_capacity(size);
    for i in 0..size {
        let mut item = MediaItem::new(Uuid::new_v4(), ItemKind::Movie, format!("Movie {i}"));
        item.genres = vec![GENRES[i % GENRES.len()].to_string()];
        item.production_year = Some(1950 + (i % 75) as i32);
        item.community_rating = Some((i % 100) as f32 / 10.0);
        index.insert_item(item.clone());
        index.insert_people(
            item.id,
            vec![Person::new(format!("Actor {}", i % 500), PersonRole::Actor)],
        );
        items.push(item);
    }
    (index, owner, items)
}

fn bench_cheap_rule(c: &mut Criterion) {
    let (index, owner, items) = build_library(20_000);
    let rule = RuleDefinition::new(
        "cheap",
        vec![ConditionGroup::new(vec![
            Condition::new("Genres", "Contains", "Horror"),
            Condition::new("ProductionYear", "GreaterThan", "1990"),
        ])],
    );
    let compiled = RuleCompiler::new().compile(&rule, &owner.id.to_string());
    let context = build_user_context(&index, owner.id, compiled.requirements()).expect("Failed to build user context");

    c.bench_function("filter_cheap_rule", |b| {
        b.iter(|| {
            let result = FilterPipeline::new(&index)
                .run(black_box(items.clone()), &compiled, &context, compiled.requirements())
                .unwrap();
            black_box(result)
        })
    });
}

fn bench_people_rule(c: &mut Criterion) {
    let (index, owner, items) = build_library(20_000);
    let rule = RuleDefinition::new(
        "people",
        vec![ConditionGroup::new(vec![
            Condition::new("CommunityRating", "GreaterThanOrEqual", "5"),
            Condition::new("Actors", "Contains", "Actor 42"),
        ])],
    );
    let compiled = RuleCompiler::new().compile(&rule, &owner.id.to_string());
    let context = build_user_context(&index, owner.id, compiled.requirements()).expect("Failed to build user context");

    c.bench_function("filter_people_rule", |b| {
        b.iter(|| {
            let result = FilterPipeline::new(&index)
                .run(black_box(items.clone()), &compiled, &context, compiled.requirements())
                .unwrap();
            black_box(result)
        })
    });
}

criterion_group!(benches, bench_cheap_rule, bench_people_rule);
criterion_main!(benches);
