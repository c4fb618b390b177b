//! Tests for outbound chunking and identifier allocation.

use std::num::NonZeroUsize;

use rstest::rstest;

use crate::fragment::{
    Chunker,
    FragmentBatch,
    FragmentIndex,
    FragmentationError,
    MessageId,
};

fn cap(value: usize) -> NonZeroUsize { NonZeroUsize::new(value).expect("non-zero") }

fn assert_frame(batch: &FragmentBatch, index: usize, data: &[u8]) {
    let frame = batch
        .frames()
        .get(index)
        .expect("frame missing at requested index");
    assert_eq!(frame.data(), data);
    assert_eq!(frame.header().n().get() as usize, index);
    assert_eq!(frame.header().total() as usize, batch.len());
    assert_eq!(frame.header().id(), batch.message_id());
}

#[test]
fn chunker_splits_payload_into_contiguous_frames() {
    let mut chunker = Chunker::new(cap(3));
    let payload: Vec<u8> = (0..8).collect();
    let batch = chunker.chunk(&payload).expect("chunk payload");

    assert_eq!(batch.len(), 3);
    assert!(batch.is_fragmented());
    assert_eq!(batch.message_id(), MessageId::new(0));

    assert_frame(&batch, 0, &[0, 1, 2]);
    assert_frame(&batch, 1, &[3, 4, 5]);
    assert_frame(&batch, 2, &[6, 7]);
}

#[test]
fn chunker_wraps_empty_payload_in_single_frame() {
    let mut chunker = Chunker::new(cap(8));
    let batch = chunker.chunk(&[]).expect("chunk empty payload");

    assert_eq!(batch.len(), 1);
    assert!(!batch.is_fragmented());
    let frame = batch.frames().first().expect("batch is never empty");
    assert!(frame.data().is_empty());
    assert_eq!(frame.header().n(), FragmentIndex::zero());
    assert_eq!(frame.header().total(), 1);
}

#[rstest]
#[case(1, 1)]
#[case(7, 1)]
#[case(8, 1)]
#[case(9, 2)]
#[case(16, 2)]
#[case(17, 3)]
fn chunker_uses_ceiling_division(#[case] len: usize, #[case] expected: usize) {
    let mut chunker = Chunker::new(cap(8));
    assert_eq!(chunker.fragment_count(len), expected);
    let batch = chunker.chunk(&vec![0xAB; len]).expect("chunk payload");
    assert_eq!(batch.len(), expected);
    assert!(
        batch.frames().iter().all(|frame| frame.data().len() <= 8),
        "no frame may exceed the payload cap"
    );
}

#[test]
fn chunker_allocates_monotonic_identifiers() {
    let mut chunker = Chunker::with_starting_id(cap(4), MessageId::new(7));
    assert_eq!(chunker.next_message_id(), Some(MessageId::new(7)));

    let first = chunker.chunk(&[1, 2, 3, 4, 5]).expect("chunk first");
    let second = chunker.chunk(&[9]).expect("chunk second");

    assert_eq!(first.message_id(), MessageId::new(7));
    assert_eq!(second.message_id(), MessageId::new(8));
    assert_eq!(chunker.next_message_id(), Some(MessageId::new(9)));
}

#[test]
fn chunker_reports_exhausted_identifiers() {
    let mut chunker = Chunker::with_starting_id(cap(4), MessageId::new(u64::MAX));
    chunker.chunk(&[1]).expect("last identifier is still usable");

    assert_eq!(chunker.next_message_id(), None);
    assert_eq!(
        chunker.chunk(&[2]).expect_err("no identifiers left"),
        FragmentationError::IdsExhausted
    );
}

#[test]
fn chunker_handles_fifty_megabytes_with_one_megabyte_fragments() {
    const MIB: usize = 1024 * 1024;
    let payload: Vec<u8> = (0..50 * MIB).map(|i| (i % 251) as u8).collect();
    let mut chunker = Chunker::new(cap(MIB));

    let batch = chunker.chunk(&payload).expect("chunk large payload");

    assert_eq!(batch.len(), 50);
    for (expected_n, frame) in batch.frames().iter().enumerate() {
        assert_eq!(frame.header().total(), 50);
        assert_eq!(frame.header().n().get() as usize, expected_n);
        assert_eq!(frame.data().len(), MIB);
    }

    let mut reassembler = crate::fragment::Reassembler::new();
    let mut rebuilt = None;
    for frame in batch {
        rebuilt = reassembler.push(frame).expect("valid frame");
    }
    let rebuilt = rebuilt.expect("last frame completes the message");
    assert!(rebuilt.payload() == payload.as_slice(), "payload must match bit for bit");
}
