//! # Orphan Buffer Stress
//!
//! Seeded random hashgraphs delivered in random order, with and without
//! event window advances, must come out complete and parent-first.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use qc_event_intake::EventIntakeApi;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use shared_types::{AncientMode, EventDescriptor, EventWindow, NodeId, UnhashedEvent};

    use crate::harness::{is_topologically_ordered, Pipeline};

    #[test]
    fn test_shuffled_graphs_released_in_order() {
        for seed in [0x5eed_u64, 7, 1234] {
            let pipeline = Pipeline::start(6, seed);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut events = pipeline.network.random_graph(&mut rng, 400);
            events.shuffle(&mut rng);

            for event in &events {
                let sender = NodeId(rng.gen_range(0..6));
                let event = UnhashedEvent::from(event.clone()).with_sender(sender);
                pipeline.service.submit_event(event).unwrap();
            }
            pipeline.service.flush_all().unwrap();

            let released = pipeline.released();
            assert_eq!(released.len(), events.len(), "seed {seed}");
            assert!(is_topologically_ordered(&released), "seed {seed}");
            assert_eq!(pipeline.metrics.orphan_buffer_size(), 0);
            let counter = pipeline.service.intake_event_counter();
            assert!((0..6).all(|peer| !counter.has_unprocessed_events(NodeId(peer))));
        }
    }

    #[test]
    fn test_parents_released_or_ancient_first() {
        let pipeline = Pipeline::start(5, 21);
        let mut rng = StdRng::seed_from_u64(21);
        let events = pipeline.network.random_graph(&mut rng, 300);

        // Withhold every fifth event; its descendants stay buffered.
        let (withheld, delivered): (Vec<_>, Vec<_>) = events
            .iter()
            .cloned()
            .enumerate()
            .partition(|(index, _)| index % 5 == 0);
        let mut delivered: Vec<_> = delivered.into_iter().map(|(_, e)| e).collect();
        delivered.shuffle(&mut rng);
        for event in &delivered {
            pipeline.service.submit_event(event.clone().into()).unwrap();
        }
        pipeline.service.flush_all().unwrap();

        let released: HashSet<EventDescriptor> = pipeline
            .released()
            .iter()
            .map(|event| event.descriptor())
            .collect();
        let withheld: HashSet<EventDescriptor> =
            withheld.iter().map(|(_, event)| event.descriptor()).collect();
        for event in pipeline.released() {
            assert!(event.parents().all(|parent| !withheld.contains(parent)));
        }
        assert!(released.len() < delivered.len());
        assert!(pipeline.metrics.orphan_buffer_size() > 0);

        // Advancing the window past every generation makes the missing
        // parents ancient; the buffer must then drain completely.
        let max_generation = events.iter().map(|e| e.generation()).max().unwrap_or(0);
        pipeline.advance(EventWindow::new(
            1,
            max_generation + 1,
            AncientMode::GenerationThreshold,
        ));
        assert_eq!(pipeline.metrics.orphan_buffer_size(), 0);
        assert!(is_topologically_ordered(&pipeline.released()));
    }

    #[test]
    fn test_window_advance_mid_stream() {
        let pipeline = Pipeline::start(4, 22);
        let mut rng = StdRng::seed_from_u64(22);
        let events = pipeline.network.random_graph(&mut rng, 240);

        let (early, late) = events.split_at(120);
        let mut early = early.to_vec();
        early.shuffle(&mut rng);
        let (submitted, skipped) = early.split_at(100);
        for event in submitted {
            pipeline.service.submit_event(event.clone().into()).unwrap();
        }
        pipeline.service.flush_all().unwrap();

        // Every skipped event becomes ancient, so nothing waits on it.
        let threshold = skipped.iter().map(|e| e.generation()).max().unwrap_or(0) + 1;

        pipeline.advance(EventWindow::new(
            1,
            threshold,
            AncientMode::GenerationThreshold,
        ));
        for event in late {
            pipeline.service.submit_event(event.clone().into()).unwrap();
        }
        pipeline.service.flush_all().unwrap();

        let released = pipeline.released();
        assert!(is_topologically_ordered(&released));
        assert_eq!(pipeline.metrics.orphan_buffer_size(), 0);
        for event in late.iter().filter(|e| e.generation() >= threshold) {
            let descriptor = event.descriptor();
            assert!(released.iter().any(|r| r.descriptor() == descriptor));
        }
    }
}
