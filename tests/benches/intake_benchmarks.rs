//! # Event Intake Benchmarks
//!
//! | Stage | Measured |
//! |-------|----------|
//! | Hasher | SHA-384 over event content |
//! | Signature validator | Ed25519 verification |
//! | Orphan buffer | Release of a reversed chain |
//! | Pipeline | End-to-end throughput with a flush |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qc_event_intake::test_utils::{CollectingGateway, TestNetwork};
use qc_event_intake::{
    Ed25519Verifier, EventHasher, EventIntakeApi, EventIntakeService, InMemoryMisbehaviorTracker,
    IntakeCollaborators, IntakeConfig, IntakeEventCounter, NoOpIntakeMetrics, OrphanBuffer,
    SignatureVerifier,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_types::{AncientMode, UnhashedEvent};

// ============================================================================
// STAGES
// ============================================================================

fn bench_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("event-hasher");
    let network = TestNetwork::new(4, 1);
    let hasher = EventHasher::new();
    let event = network.genesis_event(0);

    group.bench_function("hash_event", |b| {
        b.iter(|| black_box(hasher.hash_event(event.clone())))
    });
    group.finish();
}

fn bench_signature_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature-validator");
    let network = TestNetwork::new(4, 2);
    let event = network.hashed(network.genesis_event(1));
    let book = network.address_book();
    let key = book
        .get(event.creator())
        .and_then(|address| address.signing_key.clone())
        .unwrap_or_default();
    let verifier = Ed25519Verifier;

    group.bench_function("ed25519_verify", |b| {
        b.iter(|| {
            black_box(verifier.verify(event.hash().as_bytes(), event.signature(), &key))
        })
    });
    group.finish();
}

fn bench_orphan_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("orphan-buffer");
    let network = TestNetwork::new(1, 3);

    for length in [10usize, 100, 1000] {
        let mut chain = vec![network.hashed(network.genesis_event(0))];
        for _ in 1..length {
            let parent = chain[chain.len() - 1].clone();
            chain.push(network.hashed(network.child_event(0, &[&parent])));
        }
        chain.reverse();

        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(
            BenchmarkId::new("reversed_chain", length),
            &chain,
            |b, chain| {
                b.iter(|| {
                    let mut buffer = OrphanBuffer::new(
                        AncientMode::GenerationThreshold,
                        Arc::new(IntakeEventCounter::new()),
                        Arc::new(NoOpIntakeMetrics),
                    );
                    let mut released = 0;
                    for event in chain {
                        released += buffer.handle_event(event.clone()).len();
                    }
                    black_box(released)
                })
            },
        );
    }
    group.finish();
}

// ============================================================================
// PIPELINE
// ============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("intake-pipeline");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let network = TestNetwork::new(8, 4);
    let mut rng = StdRng::seed_from_u64(4);
    let events: Vec<UnhashedEvent> = network
        .random_graph(&mut rng, 500)
        .into_iter()
        .map(UnhashedEvent::from)
        .collect();

    group.throughput(Throughput::Elements(events.len() as u64));
    group.bench_function("submit_and_flush_500", |b| {
        b.iter(|| {
            let consensus = Arc::new(CollectingGateway::default());
            let service = EventIntakeService::new(
                IntakeConfig::default(),
                IntakeCollaborators {
                    verifier: Arc::new(Ed25519Verifier),
                    misbehavior: Arc::new(InMemoryMisbehaviorTracker::new()),
                    metrics: Arc::new(NoOpIntakeMetrics),
                    gossip: Arc::new(CollectingGateway::default()),
                    consensus: consensus.clone(),
                    previous_address_book: None,
                    current_address_book: network.address_book(),
                },
            )
            .unwrap();
            service.start().unwrap();
            for event in &events {
                service.submit_event(event.clone()).unwrap();
            }
            service.flush_all().unwrap();
            service.stop();
            black_box(consensus.len())
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_hasher,
    bench_signature_verification,
    bench_orphan_buffer,
    bench_pipeline
);
criterion_main!(benches);
