// End-to-end encode -> video -> decode through the in-memory video store.

#[cfg(test)]
mod tests {
    use image::Rgb;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    use framecode_core::code::{CodeEncoder, CodeError, GridCode};
    use framecode_core::framing::{encode_chunk, ChunkHeader};
    use framecode_core::session::{
        decode_payload, encode_payload, max_chunk_size, Chunker, ParallelismProfile, SessionConfig,
    };
    use framecode_core::stego::CarrierScanner;
    use framecode_core::telemetry::Stage;
    use framecode_core::types::StegoError;
    use framecode_core::video::{
        Frame, FrameSink, FrameSource, MemoryVideo, MemoryVideoWriter, VideoError,
    };

    /// 72x72 px frames, 122 bytes per code, 94-byte chunks.
    fn code() -> GridCode {
        GridCode::new(32, 2, 2).unwrap()
    }

    fn random_payload(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = vec![0u8; len];
        rng.fill_bytes(&mut out);
        out
    }

    fn encode(payload: &[u8], config: &SessionConfig) -> MemoryVideo {
        encode_payload(payload, &code(), MemoryVideoWriter::new(), None, config)
            .unwrap()
            .output
    }

    fn decode(video: &MemoryVideo, config: &SessionConfig) -> Result<Vec<u8>, StegoError> {
        decode_payload(video.reader(), &code(), config).map(|o| o.payload)
    }

    fn parallel() -> SessionConfig {
        SessionConfig::default().with_profile(ParallelismProfile::new(4, 3))
    }

    fn expect_missing(result: Result<Vec<u8>, StegoError>, expected: &[u32]) {
        match result {
            Err(StegoError::IncompleteRecovery { missing, .. }) => assert_eq!(missing, expected),
            other => panic!("expected IncompleteRecovery {expected:?}, got {other:?}"),
        }
    }

    /// Fails the test if anything is appended.
    struct UntouchedSink;

    impl FrameSink for UntouchedSink {
        type Output = ();

        fn append(&mut self, _frame: &Frame) -> Result<(), VideoError> {
            panic!("nothing should be rendered");
        }

        fn finish(self) -> Result<(), VideoError> {
            Ok(())
        }
    }

    /// Hides its frame count and fails after `fail_after` frames.
    struct FlakySource {
        frames: std::vec::IntoIter<Frame>,
        fail_after: Option<usize>,
        served: usize,
    }

    impl FrameSource for FlakySource {
        fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
            if Some(self.served) == self.fail_after {
                return Err(VideoError::TruncatedFrame { expected: 10, actual: 3 });
            }
            self.served += 1;
            Ok(self.frames.next())
        }
    }

    /// Rejects chunk 2 regardless of size.
    struct RejectsChunkTwo(GridCode);

    impl CodeEncoder for RejectsChunkTwo {
        fn capacity(&self) -> usize {
            self.0.capacity()
        }

        fn render(&self, bytes: &[u8]) -> Result<Frame, CodeError> {
            if bytes[0] == 2 {
                return Err(CodeError::InvalidGeometry("refusing chunk 2".into()));
            }
            self.0.render(bytes)
        }
    }

// # 1. Round trips

    #[test]
    fn round_trip_boundary_sizes() {
        let config = SessionConfig::default();
        let chunk = max_chunk_size(&code());
        assert_eq!(chunk, 94);

        for (len, frames) in [(0, 1), (1, 1), (chunk, 1), (chunk + 1, 2), (5 * chunk, 5), (1_000, 11)] {
            let payload = random_payload(len, len as u64);
            let video = encode(&payload, &config);
            assert_eq!(video.len(), frames, "payload of {len} bytes");
            assert_eq!(decode(&video, &config).unwrap(), payload, "payload of {len} bytes");
        }
    }

    #[test]
    fn custom_chunk_size_is_honoured() {
        let config = SessionConfig::default().with_chunk_size(10);
        let payload = random_payload(95, 3);
        let video = encode(&payload, &config);
        assert_eq!(video.len(), 10);
        assert_eq!(decode(&video, &config).unwrap(), payload);
    }

    #[test]
    fn chunk_size_beyond_code_capacity_is_invalid() {
        let config = SessionConfig::default().with_chunk_size(95);
        let err = encode_payload(b"abc", &code(), UntouchedSink, None, &config).unwrap_err();
        assert!(matches!(err, StegoError::InvalidConfig(_)));
    }

// # 2. Damage tolerance

    #[test]
    fn duplicated_blank_and_reordered_frames_are_tolerated() {
        let config = SessionConfig::default();
        let payload = random_payload(400, 11);
        let mut video = encode(&payload, &config);
        assert_eq!(video.len(), 5);

        video.duplicate_frame(1);
        video.duplicate_frame(4);
        video.insert_blank(0, [255, 255, 255]);
        video.insert_blank(3, [0, 0, 0]);
        video.frames.swap(2, 6);

        assert_eq!(decode(&video, &config).unwrap(), payload);
    }

    #[test]
    fn corrupted_chunk_is_reported_missing() {
        let config = SessionConfig::default();
        let payload = random_payload(400, 12);
        let mut video = encode(&payload, &config);

        let chunks: Vec<_> = Chunker::new(&payload, 94).unwrap().collect();
        let mut wire = encode_chunk(&chunks[3]);
        wire[ChunkHeader::LEN + 7] ^= 0x01;
        video.frames[3] = code().render(&wire).unwrap();

        expect_missing(decode(&video, &config), &[3]);
    }

    #[test]
    fn corrupted_copy_does_not_shadow_a_good_duplicate() {
        let config = SessionConfig::default();
        let payload = random_payload(300, 13);
        let mut video = encode(&payload, &config);

        let chunks: Vec<_> = Chunker::new(&payload, 94).unwrap().collect();
        let mut wire = encode_chunk(&chunks[1]);
        wire[ChunkHeader::LEN] ^= 0x10;
        video.frames.insert(1, code().render(&wire).unwrap());

        assert_eq!(decode(&video, &config).unwrap(), payload);
    }

    #[test]
    fn dropped_frame_is_named() {
        let config = SessionConfig::default();
        let payload = random_payload(600, 14);
        let mut video = encode(&payload, &config);
        assert_eq!(video.len(), 7);

        video.remove_frame(4);
        expect_missing(decode(&video, &config), &[4]);

        video.remove_frame(0);
        expect_missing(decode(&video, &config), &[0, 4]);
    }

    #[test]
    fn video_without_codes_is_incomplete_with_unknown_total() {
        let video = MemoryVideo::solid(4, 80, 80, [128, 128, 128]);
        let err = decode(&video, &SessionConfig::default()).unwrap_err();
        assert!(matches!(err, StegoError::IncompleteRecovery { total_chunks: None, .. }));
    }

    #[test]
    fn read_failure_keeps_what_was_scanned() {
        let config = SessionConfig::default();
        let payload = random_payload(300, 15);
        let video = encode(&payload, &config);
        assert_eq!(video.len(), 4);

        let source = FlakySource { frames: video.frames.clone().into_iter(), fail_after: Some(2), served: 0 };
        expect_missing(decode_payload(source, &code(), &config).map(|o| o.payload), &[2, 3]);
    }

// # 3. Limits

    #[test]
    fn frame_budget_is_checked_before_rendering() {
        let config = SessionConfig { max_frames: Some(2), ..SessionConfig::default() };
        let payload = random_payload(200, 16);

        let err = encode_payload(&payload, &code(), UntouchedSink, None, &config).unwrap_err();
        match &err {
            StegoError::OversizeInput { total_chunks, limit, .. } => {
                assert_eq!(*total_chunks, 3);
                assert_eq!(*limit, 2);
            }
            other => panic!("expected OversizeInput, got {other:?}"),
        }
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn encoder_failure_names_the_chunk() {
        let payload = random_payload(400, 17);
        for config in [SessionConfig::default(), parallel()] {
            let err = encode_payload(&payload, &RejectsChunkTwo(code()), MemoryVideoWriter::new(), None, &config)
                .unwrap_err();
            assert!(
                matches!(err, StegoError::EncodeFailure { sequence_index: 2, .. }),
                "got {err:?}"
            );
        }
    }

// # 4. Parallel pipelines

    #[test]
    fn parallel_encode_matches_sequential() {
        let payload = random_payload(2_000, 18);
        let sequential = encode(&payload, &SessionConfig::default());
        let parallel_video = encode(&payload, &parallel());
        assert_eq!(sequential, parallel_video);
    }

    #[test]
    fn parallel_decode_matches_sequential() {
        let payload = random_payload(2_000, 19);
        let mut video = encode(&payload, &SessionConfig::default());
        video.duplicate_frame(5);
        video.insert_blank(2, [255, 255, 255]);

        assert_eq!(decode(&video, &parallel()).unwrap(), payload);

        video.remove_frame(8);
        let seq = decode(&video, &SessionConfig::default()).unwrap_err();
        let par = decode(&video, &parallel()).unwrap_err();
        assert_eq!(seq.missing_indices(), par.missing_indices());
    }

// # 5. Carrier

    #[test]
    fn carrier_round_trip_with_passthrough_tail() {
        let payload = random_payload(250, 20);
        let config = SessionConfig::default();

        let carrier = MemoryVideo::solid(6, 120, 90, [200, 140, 40]);
        let mut reader = carrier.reader();
        let outcome =
            encode_payload(&payload, &code(), MemoryVideoWriter::new(), Some(&mut reader as &mut dyn FrameSource), &config)
                .unwrap();

        let video = outcome.output;
        assert_eq!(video.len(), 6);
        assert_eq!(outcome.snapshot.counters.frames_passthrough, 3);
        assert_eq!(video.frames[5], carrier.frames[5]);
        assert_eq!(video.frames[0].dimensions(), (120, 90));

        let scanner = CarrierScanner::new(code());
        let decoded = decode_payload(video.reader(), &scanner, &parallel()).unwrap();
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn carrier_tail_can_be_dropped() {
        let payload = random_payload(250, 21);
        let config = SessionConfig { passthrough_carrier_tail: false, ..SessionConfig::default() };

        let carrier = MemoryVideo::solid(6, 120, 90, [10, 20, 30]);
        let mut reader = carrier.reader();
        let video = encode_payload(&payload, &code(), MemoryVideoWriter::new(), Some(&mut reader as &mut dyn FrameSource), &config)
            .unwrap()
            .output;
        assert_eq!(video.len(), 3);
    }

    #[test]
    fn short_carrier_is_rejected_up_front() {
        let payload = random_payload(250, 22);
        let carrier = MemoryVideo::solid(2, 120, 90, [0, 0, 0]);
        let mut reader = carrier.reader();

        let err = encode_payload(&payload, &code(), UntouchedSink, Some(&mut reader as &mut dyn FrameSource), &SessionConfig::default())
            .unwrap_err();
        assert!(matches!(err, StegoError::InsufficientCarrierFrames { needed: 3, available: 2 }));
    }

    #[test]
    fn short_carrier_without_count_fails_when_it_runs_out() {
        let payload = random_payload(250, 23);
        let carrier = MemoryVideo::solid(2, 120, 90, [0, 0, 0]);
        let mut source = FlakySource { frames: carrier.frames.into_iter(), fail_after: None, served: 0 };

        for config in [SessionConfig::default(), parallel()] {
            let err = encode_payload(&payload, &code(), MemoryVideoWriter::new(), Some(&mut source as &mut dyn FrameSource), &config)
                .unwrap_err();
            assert!(matches!(err, StegoError::InsufficientCarrierFrames { needed: 3, .. }), "got {err:?}");
        }
    }

    #[test]
    fn carrier_smaller_than_code_is_rejected() {
        let carrier = MemoryVideo::solid(3, 40, 40, [0, 0, 0]);
        let mut reader = carrier.reader();
        let err = encode_payload(b"abc", &code(), MemoryVideoWriter::new(), Some(&mut reader as &mut dyn FrameSource), &SessionConfig::default())
            .unwrap_err();
        assert!(matches!(err, StegoError::CarrierTooSmall { .. }));
    }

// # 6. Telemetry

    #[test]
    fn snapshots_count_frames_and_candidates() {
        let payload = random_payload(500, 24);
        let config = SessionConfig::default();

        let encoded = encode_payload(&payload, &code(), MemoryVideoWriter::new(), None, &config).unwrap();
        let enc = &encoded.snapshot;
        assert_eq!(enc.total_chunks, Some(6));
        assert_eq!(enc.counters.chunks_emitted, 6);
        assert_eq!(enc.counters.frames_written, 6);
        assert_eq!(enc.counters.bytes_payload, 500);
        assert_eq!(enc.counters.bytes_padding, 6 * 94 - 500);
        assert!(enc.has_all_stages(&[Stage::Chunk, Stage::Render, Stage::Write]));

        let mut video = encoded.output;
        video.duplicate_frame(0);
        video.insert_blank(0, [255, 255, 255]);

        let decoded = decode_payload(video.reader(), &code(), &config).unwrap();
        let dec = &decoded.snapshot;
        assert_eq!(dec.counters.frames_read, 8);
        assert_eq!(dec.counters.frames_without_code, 1);
        assert_eq!(dec.counters.candidates_accepted, 6);
        assert_eq!(dec.counters.candidates_duplicate, 1);
        assert!(dec.has_all_stages(&Stage::DECODE));
        assert!(dec.sanity_check());
    }

    #[test]
    fn passthrough_frames_are_untouched() {
        let carrier = MemoryVideo::solid(3, 100, 100, [1, 2, 3]);
        let mut reader = carrier.reader();
        let video = encode_payload(b"tiny", &code(), MemoryVideoWriter::new(), Some(&mut reader as &mut dyn FrameSource), &SessionConfig::default())
            .unwrap()
            .output;

        assert_ne!(video.frames[0], carrier.frames[0]);
        assert!(video.frames[1].pixels().all(|p| *p == Rgb([1, 2, 3])));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn any_payload_round_trips(payload in proptest::collection::vec(any::<u8>(), 0..600), chunk_size in 1usize..=94) {
            let config = SessionConfig::default().with_chunk_size(chunk_size);
            let video = encode(&payload, &config);
            prop_assert_eq!(decode(&video, &config).unwrap(), payload);
        }
    }
}
