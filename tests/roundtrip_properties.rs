use roundtrip_bench::codec::FRAME_HEADER_SIZE;
use roundtrip_bench::config::{AppConfig, EncoderScenarioConfig, RandomScenarioConfig};
use roundtrip_bench::driver::{prepare_encoder, run_encoder_scenario, run_random_scenario};
use roundtrip_bench::{
    BenchError, BlobStore, Codec, CodecKind, DeterministicRandom, EncoderParams, FileStore,
    FormatError, LegacyCodec, MemoryStore, Persistable, SchemaCodec, SerializedBlob,
    SparseBinaryVector, SparseEncoder, decode_any,
};

fn random_codecs() -> [&'static dyn Codec<DeterministicRandom>; 2] {
    [&SchemaCodec, &LegacyCodec]
}

fn encoder_codecs() -> [&'static dyn Codec<SparseEncoder>; 2] {
    [&SchemaCodec, &LegacyCodec]
}

/// Encoder trained on a few shuffled inputs, plus the stream and input that drove it.
fn trained_encoder() -> (SparseEncoder, DeterministicRandom, SparseBinaryVector) {
    let mut encoder = SparseEncoder::initialize(EncoderParams::new(120, 90, 9)).unwrap();
    let mut rng = DeterministicRandom::new(10);
    let mut input = SparseBinaryVector::with_leading_ones(120, 12);
    for _ in 0..100 {
        rng.shuffle(input.as_mut_slice());
        encoder.compute(&input, true).unwrap();
    }
    (encoder, rng, input)
}

// ------------------------------------------------------------
// Stream round-trip transparency
// ------------------------------------------------------------
#[test]
fn qa_stream_round_trip_transparency() {
    for seed in [0u64, 1, 7, 42, u32::MAX as u64, u64::MAX] {
        for draws in [0usize, 1, 2, 30, 31, 97] {
            for codec in random_codecs() {
                let mut original = DeterministicRandom::new(seed);
                for _ in 0..draws {
                    original.next_u32();
                }
                let mut restored = codec
                    .decode_bytes(&codec.encode_bytes(&original).unwrap())
                    .unwrap();
                for step in 0..40 {
                    assert_eq!(
                        original.next_u32(),
                        restored.next_u32(),
                        "seed={seed} draws={draws} codec={} step={step}",
                        codec.name()
                    );
                }
            }
        }
    }
}

#[test]
fn qa_stream_chained_round_trips() {
    for codec in random_codecs() {
        let mut reference = DeterministicRandom::new(7);
        let mut chained = DeterministicRandom::new(7);
        for _ in 0..200 {
            chained = codec
                .decode_bytes(&codec.encode_bytes(&chained).unwrap())
                .unwrap();
            assert_eq!(reference.next_u32(), chained.next_u32());
        }
        assert_eq!(chained.draw_count(), 200);
    }
}

#[test]
fn qa_shuffle_after_round_trip_matches() {
    for codec in random_codecs() {
        let mut original = DeterministicRandom::new(3);
        original.next_u32();
        let mut restored = codec
            .decode_bytes(&codec.encode_bytes(&original).unwrap())
            .unwrap();

        let mut a: Vec<u32> = (0..64).collect();
        let mut b = a.clone();
        original.shuffle(&mut a);
        restored.shuffle(&mut b);
        assert_eq!(a, b);
    }
}

// ------------------------------------------------------------
// Compute determinism / idempotence / cross-codec equivalence
// ------------------------------------------------------------
#[test]
fn qa_compute_without_learning_is_repeatable() {
    let (mut encoder, mut rng, mut input) = trained_encoder();
    for _ in 0..10 {
        rng.shuffle(input.as_mut_slice());
        let first = encoder.compute(&input, false).unwrap();
        for _ in 0..5 {
            assert_eq!(encoder.compute(&input, false).unwrap(), first);
        }
    }
}

#[test]
fn qa_round_trip_idempotence_over_chained_codecs() {
    let (encoder, mut rng, mut input) = trained_encoder();
    rng.shuffle(input.as_mut_slice());
    let expected = encoder.infer(&input).unwrap();

    // Alternate codecs: schema -> legacy -> schema -> ...
    let mut current = encoder.clone();
    for round in 0..6 {
        let codec = encoder_codecs()[round % 2];
        current = codec
            .decode_bytes(&codec.encode_bytes(&current).unwrap())
            .unwrap();
        assert_eq!(current.infer(&input).unwrap(), expected, "round {round}");
    }
    assert_eq!(current, encoder);
}

#[test]
fn qa_cross_codec_equivalence() {
    let (encoder, mut rng, mut input) = trained_encoder();
    let from_schema: SparseEncoder = SchemaCodec
        .decode_bytes(&SchemaCodec.encode_bytes(&encoder).unwrap())
        .unwrap();
    let from_legacy: SparseEncoder = LegacyCodec
        .decode_bytes(&LegacyCodec.encode_bytes(&encoder).unwrap())
        .unwrap();

    for _ in 0..25 {
        rng.shuffle(input.as_mut_slice());
        let baseline = encoder.infer(&input).unwrap();
        assert_eq!(baseline.count_ones(), 9);
        assert_eq!(from_schema.infer(&input).unwrap(), baseline);
        assert_eq!(from_legacy.infer(&input).unwrap(), baseline);
    }
}

#[test]
fn qa_component_side_codec_api() {
    let (encoder, _, _) = trained_encoder();
    for codec in encoder_codecs() {
        let bytes = encoder.encode_with(codec).unwrap();
        let restored = SparseEncoder::decode_with(codec, &bytes).unwrap();
        assert_eq!(restored, encoder);
    }

    let mut rng = DeterministicRandom::new(7);
    rng.next_u32();
    let bytes = rng.encode_with(&LegacyCodec).unwrap();
    let mut restored = DeterministicRandom::decode_with(&LegacyCodec, &bytes).unwrap();
    assert_eq!(rng.next_u32(), restored.next_u32());
}

#[test]
fn qa_decoded_instances_are_independent() {
    let (encoder, mut rng, mut input) = trained_encoder();
    let bytes = SchemaCodec.encode_bytes(&encoder).unwrap();
    let mut a: SparseEncoder = SchemaCodec.decode_bytes(&bytes).unwrap();
    let b: SparseEncoder = SchemaCodec.decode_bytes(&bytes).unwrap();

    for _ in 0..10 {
        rng.shuffle(input.as_mut_slice());
        a.compute(&input, true).unwrap();
    }
    assert_ne!(a, encoder);
    assert_eq!(b, encoder, "Learning on one copy must not leak into another");
}

// ------------------------------------------------------------
// Format rejection
// ------------------------------------------------------------
#[test]
fn qa_truncated_blobs_are_rejected() {
    let (encoder, _, _) = trained_encoder();
    for codec in encoder_codecs() {
        let bytes = codec.encode_bytes(&encoder).unwrap();
        let cuts = [
            0,
            3,
            FRAME_HEADER_SIZE - 1,
            FRAME_HEADER_SIZE,
            bytes.len() / 2,
            bytes.len() - 1,
        ];
        for cut in cuts {
            let result = codec.decode_bytes(&bytes[..cut]);
            assert!(
                matches!(result, Err(FormatError::Truncated { .. })),
                "codec={} cut={cut} got {:?}",
                codec.name(),
                result.err()
            );
        }
    }
}

#[test]
fn qa_mistagged_blobs_are_rejected() {
    let rng = DeterministicRandom::new(7);
    let (encoder, _, _) = trained_encoder();

    // Each codec refuses the other's output
    let schema_rng = SchemaCodec.encode_bytes(&rng).unwrap();
    let legacy_rng = LegacyCodec.encode_bytes(&rng).unwrap();
    assert!(matches!(
        Codec::<DeterministicRandom>::decode_bytes(&LegacyCodec, &schema_rng),
        Err(FormatError::TagMismatch { .. })
    ));
    assert!(matches!(
        Codec::<DeterministicRandom>::decode_bytes(&SchemaCodec, &legacy_rng),
        Err(FormatError::TagMismatch { .. })
    ));

    // Component kinds are not interchangeable
    let schema_enc = SchemaCodec.encode_bytes(&encoder).unwrap();
    assert!(matches!(
        Codec::<DeterministicRandom>::decode_bytes(&SchemaCodec, &schema_enc),
        Err(FormatError::TagMismatch { .. })
    ));

    // Version bump is refused
    let mut blob = SerializedBlob::from_bytes(&schema_rng).unwrap();
    blob.version += 1;
    assert!(matches!(
        Codec::<DeterministicRandom>::decode(&SchemaCodec, &blob),
        Err(FormatError::VersionMismatch { .. })
    ));
}

#[test]
fn qa_corrupted_payload_is_rejected() {
    let rng = DeterministicRandom::new(7);
    for codec in random_codecs() {
        let mut bytes = codec.encode_bytes(&rng).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x55;
        assert!(matches!(
            codec.decode_bytes(&bytes),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }
}

#[test]
fn qa_structurally_invalid_state_is_rejected() {
    // Valid frame and checksum, impossible tap positions inside
    let mut state = DeterministicRandom::new(7).snapshot();
    state.rear = 9;
    let payload = bincode::serialize(&state).unwrap();
    let bytes = SerializedBlob::new(*b"SRNG", 1, payload).to_bytes();
    assert!(matches!(
        Codec::<DeterministicRandom>::decode_bytes(&SchemaCodec, &bytes),
        Err(FormatError::Corrupt(_))
    ));
}

#[test]
fn qa_extreme_counters_decode_and_keep_running() {
    let mut state = DeterministicRandom::new(7).snapshot();
    state.draw_count = u64::MAX;
    let bytes = SerializedBlob::new(*b"SRNG", 1, bincode::serialize(&state).unwrap()).to_bytes();
    for codec in random_codecs() {
        let blob = if codec.name() == "schema" {
            bytes.clone()
        } else {
            let rng = DeterministicRandom::from_snapshot(state.clone()).unwrap();
            codec.encode_bytes(&rng).unwrap()
        };
        let mut rng = codec.decode_bytes(&blob).unwrap();
        rng.next_u32();
        assert_eq!(rng.draw_count(), 0, "codec={}", codec.name());
    }

    let (encoder, mut rng, mut input) = trained_encoder();
    let mut state = encoder.state().clone();
    state.learning_iterations = u64::MAX;
    let mut restored = SparseEncoder::from_state(state).unwrap();
    rng.shuffle(input.as_mut_slice());
    assert_eq!(restored.compute(&input, true).unwrap().count_ones(), 9);
    assert_eq!(restored.learning_iterations(), 0);
}

#[test]
fn qa_schema_payload_with_trailing_bytes_is_rejected() {
    let mut payload = bincode::serialize(&DeterministicRandom::new(7).snapshot()).unwrap();
    payload.extend_from_slice(b"GARBAGE");
    let bytes = SerializedBlob::new(*b"SRNG", 1, payload).to_bytes();
    assert!(matches!(
        Codec::<DeterministicRandom>::decode_bytes(&SchemaCodec, &bytes),
        Err(FormatError::Malformed(_))
    ));
}

#[test]
fn qa_schema_reader_accepts_legacy_state() {
    let (encoder, mut rng, mut input) = trained_encoder();
    let legacy = LegacyCodec.encode_bytes(&encoder).unwrap();

    let (migrated, kind) = decode_any::<SparseEncoder>(&legacy).unwrap();
    assert_eq!(kind, CodecKind::Legacy);

    // Re-persist in the schema format and keep behaving the same
    let upgraded: SparseEncoder = SchemaCodec
        .decode_bytes(&SchemaCodec.encode_bytes(&migrated).unwrap())
        .unwrap();
    rng.shuffle(input.as_mut_slice());
    assert_eq!(upgraded.infer(&input).unwrap(), encoder.infer(&input).unwrap());
}

#[test]
fn qa_shape_error_on_wrong_input() {
    let (mut encoder, _, _) = trained_encoder();
    let err = encoder
        .compute(&SparseBinaryVector::zeros(121), false)
        .unwrap_err();
    assert_eq!(err.expected, 120);
    assert_eq!(err.actual, 121);
}

// ------------------------------------------------------------
// Scenario 1: seed 7, 1000 iterations, 5 draws per check
// ------------------------------------------------------------
#[test]
fn qa_scenario_random_stream_file_backed() {
    let temp_dir = format!("target/test_scenario_random_{}", std::process::id());
    let _ = std::fs::remove_dir_all(&temp_dir);
    let mut store = FileStore::open(&temp_dir).unwrap();
    let cfg = RandomScenarioConfig::default();
    assert_eq!((cfg.seed, cfg.iterations, cfg.draws_per_check), (7, 1000, 5));

    for codec in random_codecs() {
        let report = run_random_scenario(codec, &mut store, &cfg).unwrap();
        assert_eq!(report.iterations, 1000);
        assert_eq!(report.codecs[0].trials, 1000);
    }

    let leftovers = std::fs::read_dir(&temp_dir).unwrap().count();
    assert_eq!(leftovers, 0, "Round-trip artifacts must be deleted");

    store.close().unwrap();
    assert!(!std::path::Path::new(&temp_dir).exists());
    let _ = std::fs::remove_dir_all(&temp_dir);
}

/// Store that can no longer write.
#[derive(Default)]
struct ReadOnlyStore(MemoryStore);

impl BlobStore for ReadOnlyStore {
    fn put(&mut self, _key: &str, _bytes: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only store",
        ))
    }

    fn get(&self, key: &str) -> std::io::Result<Vec<u8>> {
        self.0.get(key)
    }

    fn delete(&mut self, key: &str) -> std::io::Result<()> {
        self.0.delete(key)
    }
}

#[test]
fn qa_store_failure_maps_to_io_exit_code() {
    for codec in random_codecs() {
        let mut store = ReadOnlyStore::default();
        let err = run_random_scenario(codec, &mut store, &RandomScenarioConfig::default())
            .unwrap_err();
        assert!(matches!(err, BenchError::Io(_)), "codec={}", codec.name());
        assert_eq!(err.exit_code(), 3);
        assert!(store.0.is_empty());
    }
}

// ------------------------------------------------------------
// Scenario 2: sparse encoder equivalence
// ------------------------------------------------------------
#[test]
fn qa_scenario_encoder_reduced() {
    let cfg = EncoderScenarioConfig {
        input_size: 200,
        column_count: 150,
        active_count: 15,
        input_active_bits: 20,
        warmup_iterations: 300,
        trials: 25,
        ..EncoderScenarioConfig::default()
    };
    let mut store = MemoryStore::new();
    let report = run_encoder_scenario(&mut store, &cfg).unwrap();
    assert_eq!(report.iterations, 25);
    assert_eq!(report.codecs.len(), 2);
    assert!(store.is_empty());

    // Same again with learning carried across trials
    let cfg = EncoderScenarioConfig {
        learn_during_trials: true,
        ..cfg
    };
    run_encoder_scenario(&mut store, &cfg).unwrap();
    assert!(store.is_empty());
}

#[test]
#[ignore = "full-size benchmark (10k warmup on 500x500); run with --ignored"]
fn qa_scenario_encoder_full_size() {
    let config = AppConfig::default();
    let cfg = &config.encoder_scenario;
    assert_eq!(
        (cfg.input_size, cfg.column_count, cfg.active_count, cfg.warmup_iterations, cfg.trials),
        (500, 500, 50, 10_000, 100)
    );

    let (mut encoder, mut rng, mut input) = prepare_encoder(cfg).unwrap();
    for trial in 0..cfg.trials {
        rng.shuffle(input.as_mut_slice());
        let baseline = encoder.compute(&input, false).unwrap().active_indices();
        for codec in encoder_codecs() {
            let decoded = codec
                .decode_bytes(&codec.encode_bytes(&encoder).unwrap())
                .unwrap();
            assert_eq!(
                decoded.infer(&input).unwrap().active_indices(),
                baseline,
                "trial {trial} codec {}",
                codec.name()
            );
        }
    }
}

#[test]
fn qa_bench_error_exit_codes() {
    let cfg = EncoderScenarioConfig {
        input_size: 10,
        input_active_bits: 11,
        ..EncoderScenarioConfig::default()
    };
    let err = run_encoder_scenario(&mut MemoryStore::new(), &cfg).unwrap_err();
    assert!(matches!(err, BenchError::Shape(_)));
    assert_eq!(err.exit_code(), 2);
}
