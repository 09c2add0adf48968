//! # Release Scenarios
//!
//! Small hand-built hashgraphs pushed through the full pipeline, checking
//! exactly what reaches consensus.

#[cfg(test)]
mod tests {
    use qc_event_intake::test_utils::TEST_SOFTWARE_VERSION;
    use qc_event_intake::{EventIntakeApi, IntakeStage};
    use shared_types::{
        AddressBook, AddressBookUpdate, AncientMode, EventDescriptor, EventHash, EventWindow,
        HashedEventData, NodeId,
    };

    use crate::harness::Pipeline;

    fn descriptors(pipeline: &Pipeline) -> Vec<EventDescriptor> {
        pipeline
            .released()
            .iter()
            .map(|event| event.descriptor())
            .collect()
    }

    // =========================================================================
    // RELEASE ORDER
    // =========================================================================

    #[test]
    fn test_parentless_event_released_alone() {
        let pipeline = Pipeline::start(4, 1);
        let e1 = pipeline.network.genesis_event(0);
        let expected = pipeline.network.hashed(e1.clone()).descriptor();

        pipeline.submit(e1);

        assert_eq!(descriptors(&pipeline), vec![expected]);
        assert_eq!(pipeline.gossip.len(), 1);
    }

    #[test]
    fn test_orphan_released_after_parent() {
        let pipeline = Pipeline::start(4, 2);
        let e1 = pipeline.network.hashed(pipeline.network.genesis_event(0));
        let e2 = pipeline.network.child_event(1, &[&e1]);
        let e2_descriptor = pipeline.network.hashed(e2.clone()).descriptor();

        pipeline.submit(e2);
        assert!(pipeline.released().is_empty());
        assert_eq!(pipeline.metrics.orphan_buffer_size(), 1);

        pipeline.submit(e1.clone().into());
        assert_eq!(descriptors(&pipeline), vec![e1.descriptor(), e2_descriptor]);
        assert_eq!(pipeline.metrics.orphan_buffer_size(), 0);
    }

    #[test]
    fn test_duplicate_released_once() {
        let pipeline = Pipeline::start(4, 3);
        let e1 = pipeline.network.genesis_event(2);

        pipeline.submit(e1.clone());
        pipeline.submit(e1);

        assert_eq!(pipeline.released().len(), 1);
        assert_eq!(pipeline.metrics.duplicates(), 1);
    }

    #[test]
    fn test_corrupted_parent_hash_rejected() {
        let pipeline = Pipeline::start(4, 4);
        let corrupted = pipeline.network.sign(HashedEventData {
            creator: NodeId(1),
            software_version: TEST_SOFTWARE_VERSION,
            generation: 1,
            birth_round: 1,
            other_parents: vec![EventDescriptor::new(
                EventHash::new(vec![7; 10]),
                NodeId(0),
                0,
                1,
            )],
            ..Default::default()
        });

        pipeline.submit(corrupted);

        assert!(pipeline.released().is_empty());
        assert_eq!(pipeline.metrics.dropped_by(IntakeStage::InternalValidator), 1);
        assert_eq!(pipeline.metrics.dropped_by(IntakeStage::Deduplicator), 0);
        assert_eq!(pipeline.metrics.orphan_buffer_size(), 0);

        // Later stages are untouched and still work.
        pipeline.submit(pipeline.network.genesis_event(1));
        assert_eq!(pipeline.released().len(), 1);
    }

    #[test]
    fn test_ancient_parent_not_awaited() {
        let pipeline = Pipeline::start(4, 5);
        let e1 = pipeline.network.hashed(pipeline.network.genesis_event(0));
        let e2 = pipeline.network.child_event(1, &[&e1]);

        pipeline.advance(EventWindow::new(
            1,
            e1.generation() + 1,
            AncientMode::GenerationThreshold,
        ));
        pipeline.submit(e2.clone());

        let released = pipeline.released();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].descriptor(), pipeline.network.hashed(e2).descriptor());
    }

    // =========================================================================
    // DROPS
    // =========================================================================

    #[test]
    fn test_bad_signature_escalated() {
        let pipeline = Pipeline::start(4, 6);
        let mut forged = pipeline.network.genesis_event(3).with_sender(NodeId(2));
        forged.signature[0] ^= 0xff;

        pipeline.submit(forged);

        assert!(pipeline.released().is_empty());
        assert_eq!(
            pipeline
                .metrics
                .dropped(IntakeStage::SignatureValidator, "invalid_signature"),
            1
        );
        assert_eq!(pipeline.misbehavior.invalid_signatures_from(NodeId(3)), 1);
        assert_eq!(pipeline.misbehavior.reports_against_sender(NodeId(2)), 1);
        assert!(!pipeline
            .service
            .intake_event_counter()
            .has_unprocessed_events(NodeId(2)));
    }

    #[test]
    fn test_ancient_event_dropped() {
        let pipeline = Pipeline::start(4, 7);
        let e1 = pipeline.network.hashed(pipeline.network.genesis_event(0));
        let e2 = pipeline.network.hashed(pipeline.network.child_event(0, &[&e1]));
        let e3 = pipeline.network.child_event(0, &[&e2]);

        pipeline.advance(EventWindow::new(2, 2, AncientMode::GenerationThreshold));
        pipeline.submit(e1.into());
        pipeline.submit(e3);

        assert_eq!(pipeline.released().len(), 1);
        assert_eq!(pipeline.metrics.dropped_by(IntakeStage::Deduplicator), 1);
    }

    #[test]
    fn test_address_book_update_applies() {
        let pipeline = Pipeline::start(4, 8);
        pipeline.submit(pipeline.network.genesis_event(0));
        assert_eq!(pipeline.released().len(), 1);

        pipeline
            .service
            .update_address_book(AddressBookUpdate {
                software_version: TEST_SOFTWARE_VERSION,
                previous: None,
                current: AddressBook::new(),
            })
            .unwrap();
        pipeline.submit(pipeline.network.genesis_event(1));

        assert_eq!(pipeline.released().len(), 1);
        assert_eq!(
            pipeline
                .metrics
                .dropped(IntakeStage::SignatureValidator, "unknown_creator"),
            1
        );
        assert_eq!(pipeline.misbehavior.total_reports(), 0);
    }
}
