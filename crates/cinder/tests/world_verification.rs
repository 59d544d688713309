//! # World Verification Tests
//!
//! End-to-end checks of the world runtime contracts:
//!
//! 1. **Entity recycling**: stale handles never come back to life
//! 2. **Filter correctness**: With / Without / WithAny semantics
//! 3. **Idempotent destroy**: a second destroy never touches the slot's new owner
//!
//! Run with: cargo test --test world_verification

use std::collections::HashSet;

use cinder::{Component, Entity, Filter, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Clone, Debug, PartialEq)]
struct A;
impl Component for A {}

#[derive(Clone, Debug, PartialEq)]
struct B;
impl Component for B {}

#[derive(Clone, Debug, PartialEq)]
struct C;
impl Component for C {}

#[derive(Clone, Debug, PartialEq)]
struct D;
impl Component for D {}

// ============================================================================
// ENTITY RECYCLING
// ============================================================================

fn run_random_sequence(seed: u64) -> (Vec<Entity>, World) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut world = World::new();
    let mut alive: Vec<Entity> = Vec::new();
    let mut history = Vec::new();

    for _ in 0..200 {
        let mut commands = world.command_buffer();
        for _ in 0..rng.gen_range(0..4) {
            let entity = commands.create_entity();
            history.push(entity);
            alive.push(entity);
        }
        for _ in 0..rng.gen_range(0..3) {
            if alive.is_empty() {
                break;
            }
            let victim = alive.swap_remove(rng.gen_range(0..alive.len()));
            commands.destroy_entity(victim);
        }
        world.flush(commands).unwrap();
    }

    (history, world)
}

#[test]
fn verify_stale_handles_stay_dead() {
    let (history, world) = run_random_sequence(7);

    let live: HashSet<Entity> = world.entities().iter_alive().collect();
    for entity in &history {
        assert_eq!(world.is_alive(*entity), live.contains(entity), "{entity}");
    }

    // Reused indices always come back under a new generation.
    let mut seen = HashSet::new();
    for entity in &history {
        assert!(seen.insert((entity.index(), entity.generation())), "{entity} issued twice");
    }
}

#[test]
fn verify_recycling_is_deterministic() {
    let (first, _) = run_random_sequence(42);
    let (second, _) = run_random_sequence(42);
    assert_eq!(first, second);
}

// ============================================================================
// FILTER CORRECTNESS
// ============================================================================

fn three_entities() -> (World, Entity, Entity, Entity) {
    let mut world = World::new();
    let mut commands = world.command_buffer();
    let e1 = commands.create_entity();
    commands.add(e1, A);
    commands.add(e1, B);
    let e2 = commands.create_entity();
    commands.add(e2, A);
    let e3 = commands.create_entity();
    commands.add(e3, B);
    commands.add(e3, C);
    world.flush(commands).unwrap();
    (world, e1, e2, e3)
}

fn matching(world: &World, filter: &Filter) -> HashSet<Entity> {
    world.query_entities(filter).collect()
}

#[test]
fn verify_with_without() {
    let (world, e1, e2, _) = three_entities();
    let filter = Filter::builder().with::<A>().without::<C>().build();
    assert_eq!(matching(&world, &filter), HashSet::from([e1, e2]));
}

#[test]
fn verify_with_any() {
    let (world, e1, _, _) = three_entities();
    let filter = Filter::builder().with::<A>().with_any::<(B, C)>().build();
    assert_eq!(matching(&world, &filter), HashSet::from([e1]));
}

#[test]
fn verify_with_any_groups_are_anded() {
    let (mut world, e1, e2, e3) = three_entities();
    let mut commands = world.command_buffer();
    commands.add(e2, D);
    world.flush(commands).unwrap();

    // (A or C) and (B or D)
    let filter = Filter::builder().with_any::<(A, C)>().with_any::<(B, D)>().build();
    assert_eq!(matching(&world, &filter), HashSet::from([e1, e2, e3]));

    // (A) and (D): only e2; a flattened OR would also match e1 and e3.
    let filter = Filter::builder().with_any::<(A,)>().with_any::<(D,)>().build();
    assert_eq!(matching(&world, &filter), HashSet::from([e2]));
}

#[test]
fn verify_cached_filter_sees_later_changes() {
    let (mut world, e1, e2, _) = three_entities();
    let filter = Filter::builder().with::<A>().without::<C>().build();

    let mut commands = world.command_buffer();
    commands.add(e2, C);
    world.flush(commands).unwrap();

    assert_eq!(matching(&world, &filter), HashSet::from([e1]));
}

// ============================================================================
// IDEMPOTENT DESTROY
// ============================================================================

#[test]
fn verify_double_destroy_spares_new_owner() {
    let mut world = World::new();
    let mut commands = world.command_buffer();
    let old = commands.create_entity();
    commands.add(old, A);
    world.flush(commands).unwrap();

    let mut commands = world.command_buffer();
    commands.destroy_entity(old);
    world.flush(commands).unwrap();

    let mut commands = world.command_buffer();
    let new = commands.create_entity();
    commands.add(new, B);
    world.flush(commands).unwrap();
    assert_eq!(new.index(), old.index());

    let mut commands = world.command_buffer();
    commands.destroy_entity(old);
    world.flush(commands).unwrap();

    assert!(world.is_alive(new));
    assert!(world.has::<B>(new));
    assert!(!world.is_alive(old));
}
