//! # Pipeline Properties
//!
//! Deduplication under concurrency, flush and clear guarantees, the gossip
//! echo cycle, and scheduler backpressure.

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use parking_lot::Mutex;
    use qc_event_intake::{EventIntakeApi, IntakeConfig, IntakeSchedulersConfig, IntakeStage};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use shared_types::{NodeId, UnhashedEvent};
    use shared_wiring::WiringModel;

    use crate::harness::{is_topologically_ordered, EchoGossip, Pipeline};

    fn stage_backlog(pipeline: &Pipeline) -> usize {
        IntakeStage::ALL
            .iter()
            .filter_map(|stage| pipeline.service.scheduler(stage.as_str()))
            .map(|handle| handle.unprocessed_count())
            .sum()
    }

    // =========================================================================
    // DEDUPLICATION
    // =========================================================================

    #[test]
    fn test_concurrent_duplicates_released_once() {
        let pipeline = Pipeline::start(4, 11);
        let event = pipeline.network.genesis_event(1).with_sender(NodeId(0));
        let threads = 8;
        let copies = 25;

        thread::scope(|scope| {
            for _ in 0..threads {
                let service = Arc::clone(&pipeline.service);
                let event = event.clone();
                scope.spawn(move || {
                    for _ in 0..copies {
                        service.submit_event(event.clone()).unwrap();
                    }
                });
            }
        });
        pipeline.service.flush_all().unwrap();

        assert_eq!(pipeline.released().len(), 1);
        assert_eq!(pipeline.metrics.duplicates(), threads * copies - 1);
        assert!(!pipeline
            .service
            .intake_event_counter()
            .has_unprocessed_events(NodeId(0)));
    }

    // =========================================================================
    // FLUSH AND CLEAR
    // =========================================================================

    #[test]
    fn test_flush_drains_every_stage() {
        let pipeline = Pipeline::start(5, 12);
        let mut rng = StdRng::seed_from_u64(12);
        let mut events = pipeline.network.random_graph(&mut rng, 200);
        events.shuffle(&mut rng);

        for event in events {
            pipeline.service.submit_event(event.into()).unwrap();
        }
        pipeline.service.flush_all().unwrap();

        assert_eq!(pipeline.service.unprocessed_count(), 0);
        assert_eq!(stage_backlog(&pipeline), 0);
        assert_eq!(pipeline.released().len(), 200);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(stage_backlog(&pipeline), 0);
    }

    #[test]
    fn test_clear_forgets_seen_events() {
        let pipeline = Pipeline::start(4, 13);
        let event = pipeline.network.genesis_event(2);

        pipeline.submit(event.clone());
        pipeline.service.clear_all().unwrap();
        pipeline.submit(event);

        assert_eq!(pipeline.released().len(), 2);
        assert_eq!(pipeline.metrics.duplicates(), 0);
        assert_eq!(pipeline.metrics.clears(), 1);
    }

    #[test]
    fn test_clear_drops_orphans_and_peer_counts() {
        let pipeline = Pipeline::start(4, 14);
        let parent = pipeline.network.hashed(pipeline.network.genesis_event(0));
        for creator in 1..4 {
            let orphan = pipeline
                .network
                .child_event(creator, &[&parent])
                .with_sender(NodeId(creator));
            pipeline.service.submit_event(orphan).unwrap();
        }
        pipeline.service.flush_all().unwrap();
        assert_eq!(pipeline.metrics.orphan_buffer_size(), 3);
        assert!(pipeline
            .service
            .intake_event_counter()
            .has_unprocessed_events(NodeId(1)));

        pipeline.service.clear_all().unwrap();
        assert_eq!(pipeline.metrics.orphan_buffer_size(), 0);
        assert!(!pipeline
            .service
            .intake_event_counter()
            .has_unprocessed_events(NodeId(1)));

        // The cleared orphans never come back.
        pipeline.submit(parent.into());
        assert_eq!(pipeline.released().len(), 1);
    }

    #[test]
    fn test_echo_cycle_settles() {
        let echo = Arc::new(EchoGossip::default());
        let pipeline = Pipeline::start_with(4, 15, IntakeConfig::default(), Some(echo));
        let mut rng = StdRng::seed_from_u64(15);
        let events = pipeline.network.random_graph(&mut rng, 60);

        for event in &events {
            pipeline.service.submit_event(event.clone().into()).unwrap();
        }
        // Echoes submitted while consumers drain are handled by the second flush.
        pipeline.service.flush_all().unwrap();
        pipeline.service.flush_all().unwrap();

        assert_eq!(pipeline.released().len(), events.len());
        assert_eq!(pipeline.metrics.duplicates(), events.len());
        assert!(is_topologically_ordered(&pipeline.released()));
    }

    #[test]
    fn test_clear_completes_under_echo_cycle() {
        let echo = Arc::new(EchoGossip::default());
        let pipeline = Pipeline::start_with(4, 16, IntakeConfig::default(), Some(echo));
        let mut rng = StdRng::seed_from_u64(16);
        let events = pipeline.network.random_graph(&mut rng, 300);
        for event in &events {
            pipeline.service.submit_event(event.clone().into()).unwrap();
        }

        let (done_tx, done_rx) = mpsc::channel();
        let service = Arc::clone(&pipeline.service);
        let clearer = thread::spawn(move || {
            let result = service.clear_all();
            done_tx.send(result).unwrap();
        });
        done_rx
            .recv_timeout(Duration::from_secs(30))
            .expect("clear finishes while events echo")
            .unwrap();
        clearer.join().unwrap();

        pipeline.service.flush_all().unwrap();
        pipeline.service.flush_all().unwrap();
        assert_eq!(stage_backlog(&pipeline), 0);

        let fresh = pipeline.network.child_event(0, &[]);
        let before = pipeline.released().len();
        pipeline.submit(fresh);
        assert_eq!(pipeline.released().len(), before + 1);
    }

    // =========================================================================
    // BACKPRESSURE
    // =========================================================================

    #[test]
    fn test_tiny_hashing_capacity_does_not_stall() {
        let config = IntakeConfig {
            schedulers: IntakeSchedulersConfig {
                hashing_counter_capacity: 2,
                ..IntakeSchedulersConfig::default()
            },
            worker_threads: 2,
            ..IntakeConfig::default()
        };
        let pipeline = Pipeline::start_with(4, 17, config, None);
        let mut rng = StdRng::seed_from_u64(17);
        let events: Vec<UnhashedEvent> = pipeline
            .network
            .random_graph(&mut rng, 200)
            .into_iter()
            .map(UnhashedEvent::from)
            .collect();

        thread::scope(|scope| {
            for chunk in events.chunks(50) {
                let service = Arc::clone(&pipeline.service);
                scope.spawn(move || {
                    for event in chunk {
                        service.submit_event(event.clone()).unwrap();
                    }
                });
            }
        });
        pipeline.service.flush_all().unwrap();

        assert_eq!(pipeline.released().len(), 200);
        assert!(is_topologically_ordered(&pipeline.released()));
    }

    #[test]
    fn test_full_scheduler_unblocks_one_submitter() {
        let model = WiringModel::new(2).unwrap();
        let scheduler = model
            .scheduler_builder("gated")
            .with_unhandled_capacity(1)
            .with_flushing_enabled(true)
            .build::<()>()
            .unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate_rx = Mutex::new(gate_rx);
        let input = scheduler.build_input_wire::<u32>("items");
        input
            .bind_consumer(move |_| {
                let _ = gate_rx.lock().recv_timeout(Duration::from_secs(10));
            })
            .unwrap();
        model.start().unwrap();

        let wire = input.input_wire();
        wire.put(0);

        let (submitted_tx, submitted_rx) = mpsc::channel();
        let submitters: Vec<_> = (1..=2)
            .map(|n| {
                let wire = wire.clone();
                let submitted_tx = submitted_tx.clone();
                thread::spawn(move || {
                    wire.put(n);
                    submitted_tx.send(n).unwrap();
                })
            })
            .collect();

        // Both block while the first item holds the only slot.
        assert!(submitted_rx
            .recv_timeout(Duration::from_millis(150))
            .is_err());

        // One completion admits exactly one submitter.
        gate_tx.send(()).unwrap();
        submitted_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(submitted_rx
            .recv_timeout(Duration::from_millis(150))
            .is_err());

        gate_tx.send(()).unwrap();
        submitted_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        gate_tx.send(()).unwrap();
        for submitter in submitters {
            submitter.join().unwrap();
        }

        scheduler.flush().unwrap();
        assert_eq!(scheduler.unprocessed_count(), 0);
        model.stop();
    }
}
