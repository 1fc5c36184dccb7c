#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use framecode_core::framing::FramedChunk;
    use framecode_core::session::{plan_chunks, Chunker};
    use framecode_core::types::StegoError;

    fn reassemble(chunks: &[FramedChunk]) -> Vec<u8> {
        chunks.iter().flat_map(|c| c.payload().to_vec()).collect()
    }

    #[test]
    fn empty_payload_yields_one_empty_chunk() {
        let chunks: Vec<_> = Chunker::new(&[], 8).unwrap().collect();
        assert_eq!(chunks.len(), 1);

        let only = &chunks[0];
        assert_eq!(only.header.total_chunks, 1);
        assert_eq!(only.header.payload_length, 0);
        assert_eq!(only.chunk_size(), 8);
        assert!(only.verify().is_ok());
    }

    #[test]
    fn exact_multiple_has_no_padding() {
        let payload = vec![7u8; 32];
        let chunks: Vec<_> = Chunker::new(&payload, 8).unwrap().collect();

        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.header.payload_length == 8));
    }

    #[test]
    fn one_byte_over_adds_a_padded_chunk() {
        let payload = vec![7u8; 33];
        let chunks: Vec<_> = Chunker::new(&payload, 8).unwrap().collect();

        assert_eq!(chunks.len(), 5);
        let last = chunks.last().unwrap();
        assert_eq!(last.header.payload_length, 1);
        assert_eq!(&last.data[..], &[7, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(reassemble(&chunks), payload);
    }

    #[test]
    fn chunks_come_out_in_index_order() {
        let payload: Vec<u8> = (0..=255).collect();
        let chunker = Chunker::new(&payload, 10).unwrap();
        assert_eq!(chunker.len(), 26);

        for (i, chunk) in chunker.enumerate() {
            assert_eq!(chunk.sequence_index(), i as u32);
            assert_eq!(chunk.total_chunks(), 26);
            assert!(chunk.check_bounds().is_ok());
        }
    }

    #[test]
    fn zero_chunk_size_is_invalid() {
        assert!(matches!(plan_chunks(10, 0), Err(StegoError::InvalidConfig(_))));
    }

    #[test]
    fn oversize_is_reported_without_touching_bytes() {
        // 2^32 one-byte chunks do not fit the u32 index
        let err = plan_chunks(u32::MAX as usize + 1, 1).unwrap_err();
        match err {
            StegoError::OversizeInput { total_chunks, limit, .. } => {
                assert_eq!(total_chunks, u32::MAX as u64 + 1);
                assert_eq!(limit, u32::MAX as u64);
            }
            other => panic!("expected OversizeInput, got {other:?}"),
        }
        assert_eq!(plan_chunks(u32::MAX as usize, 1).unwrap(), u32::MAX);
    }

    #[test]
    fn caller_limit_lowers_the_bound() {
        let payload = vec![0u8; 100];
        assert!(Chunker::with_limit(&payload, 10, 10).is_ok());

        let err = Chunker::with_limit(&payload, 10, 9).unwrap_err();
        assert!(matches!(err, StegoError::OversizeInput { total_chunks: 10, limit: 9, .. }));
    }

    proptest! {
        #[test]
        fn chunk_count_is_ceiling_with_floor_one(len in 0usize..5_000, chunk_size in 1usize..300) {
            let expected = if len == 0 { 1 } else { len.div_ceil(chunk_size) };
            prop_assert_eq!(plan_chunks(len, chunk_size).unwrap() as usize, expected);
        }

        #[test]
        fn chunks_reassemble_to_payload(payload in proptest::collection::vec(any::<u8>(), 0..2_000), chunk_size in 1usize..128) {
            let chunks: Vec<_> = Chunker::new(&payload, chunk_size).unwrap().collect();
            prop_assert!(chunks.iter().all(|c| c.chunk_size() == chunk_size));
            prop_assert_eq!(reassemble(&chunks), payload);
        }
    }
}
