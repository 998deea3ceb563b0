//! Property tests for framing, raw transfers and pattern serialization.

use ecb_protocol::*;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=MAX_RESPONSE_PAYLOAD)
}

/// Garbage biased towards fragments of the response magic.
fn arb_garbage() -> impl Strategy<Value = Vec<u8>> {
    let magic = RESPONSE_MAGIC.to_be_bytes();
    prop::collection::vec(
        prop_oneof![
            any::<u8>(),
            Just(magic[0]),
            Just(magic[1]),
            Just(magic[2]),
        ],
        0..64,
    )
}

fn arb_resync() -> impl Strategy<Value = ResyncMode> {
    prop::sample::select(vec![ResyncMode::Rescan, ResyncMode::Restart])
}

fn arb_color() -> impl Strategy<Value = Color> + Clone {
    any::<u32>().prop_map(Color::from_argb)
}

fn arb_pattern() -> impl Strategy<Value = LedBorderPattern> {
    (
        prop::sample::select(PatternKind::ALL.to_vec()),
        prop::array::uniform4(arb_color()),
        prop::array::uniform4(arb_color()),
        arb_color(),
        prop::array::uniform4(any::<u8>()),
    )
        .prop_map(|(kind, start, end, plain, sizes)| {
            let pattern = LedBorderPattern::gradient(kind, start, end, sizes);
            pattern.unwrap_or_else(|| {
                let mut p = LedBorderPattern::plain(plain);
                p.start = start;
                p.end = end;
                p
            })
        })
}

/// Cut `data` at the given points.
fn split_at_points(data: &[u8], points: &[usize]) -> Vec<Vec<u8>> {
    let mut cuts: Vec<usize> = points.iter().map(|p| p % (data.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut last = 0;
    for cut in cuts {
        chunks.push(data[last..cut].to_vec());
        last = cut;
    }
    chunks.push(data[last..].to_vec());
    chunks
}

fn contains_magic(data: &[u8]) -> bool {
    data.windows(MAGIC_SIZE)
        .any(|w| w == RESPONSE_MAGIC.to_be_bytes())
}

proptest! {
    // ========================================================================
    // Request frames
    // ========================================================================

    #[test]
    fn test_request_frame_roundtrip(
        command in 0u8..=CMD_MAX,
        payload in prop::collection::vec(any::<u8>(), 0..=MAX_REQUEST_PAYLOAD),
    ) {
        let frame = RequestFrame::new(command, &payload).unwrap();
        prop_assert_eq!(frame.as_bytes().len(), REQUEST_FRAME_SIZE);

        let decoded = RequestFrame::decode(frame.as_bytes()).unwrap();
        prop_assert_eq!(decoded.command(), command);
        prop_assert_eq!(&decoded.payload()[..payload.len()], &payload[..]);
        prop_assert!(decoded.payload()[payload.len()..].iter().all(|&b| b == 0));
        prop_assert_eq!(decoded, frame);
    }

    // ========================================================================
    // Response reassembly
    // ========================================================================

    #[test]
    fn test_reassembly_ignores_split_points(
        payload in arb_payload(),
        points in prop::collection::vec(any::<usize>(), 0..16),
        mode in arb_resync(),
    ) {
        let encoded = FrameCodec::encode_response(&payload).unwrap();
        let mut codec = FrameCodec::with_resync(mode);
        let mut decoded = Vec::new();

        for chunk in split_at_points(&encoded, &points) {
            codec.push(&chunk);
            decoded.extend(std::iter::from_fn(|| codec.decode()));
        }

        prop_assert_eq!(decoded, vec![payload]);
        prop_assert_eq!(codec.phase(), ReassemblyPhase::WaitMagic);
    }

    #[test]
    fn test_reassembly_resyncs_after_garbage(
        garbage in arb_garbage(),
        payload in arb_payload(),
        points in prop::collection::vec(any::<usize>(), 0..8),
        mode in arb_resync(),
    ) {
        prop_assume!(!contains_magic(&garbage));

        let mut stream = garbage;
        if mode == ResyncMode::Restart {
            // Restart can lose a magic that begins inside a partial match.
            // A byte outside the magic puts it back at the start.
            stream.push(0x00);
        }
        stream.extend(FrameCodec::encode_response(&payload).unwrap());

        let mut codec = FrameCodec::with_resync(mode);
        for chunk in split_at_points(&stream, &points) {
            codec.push(&chunk);
        }

        prop_assert_eq!(codec.decode(), Some(payload));
        prop_assert_eq!(codec.decode(), None);
        prop_assert_eq!(codec.phase(), ReassemblyPhase::WaitMagic);
    }

    #[test]
    fn test_reassembly_back_to_back_messages(
        payloads in prop::collection::vec(arb_payload(), 1..6),
        points in prop::collection::vec(any::<usize>(), 0..16),
        mode in arb_resync(),
    ) {
        let mut stream = Vec::new();
        for payload in &payloads {
            stream.extend(FrameCodec::encode_response(payload).unwrap());
        }

        let mut codec = FrameCodec::with_resync(mode);
        let mut decoded = Vec::new();
        for chunk in split_at_points(&stream, &points) {
            codec.push(&chunk);
            decoded.extend(std::iter::from_fn(|| codec.decode()));
        }

        prop_assert_eq!(decoded, payloads);
    }

    // ========================================================================
    // Raw transfer
    // ========================================================================

    #[test]
    fn test_raw_transfer_acknowledges_every_chunk_but_last(
        data in prop::collection::vec(any::<u8>(), 1..20_000),
        chunk_size in 1usize..9000,
    ) {
        let mut rx = RawReceiver::new();
        let mut acks = 0;
        let mut result = None;

        let chunks: Vec<&[u8]> = data.chunks(chunk_size).collect();
        for (i, chunk) in chunks.iter().enumerate() {
            let mut delivery = Vec::new();
            if i == 0 {
                delivery.extend_from_slice(&(data.len() as u32).to_le_bytes());
            }
            delivery.extend_from_slice(chunk);

            match rx.push(&delivery) {
                RawProgress::Ack => acks += 1,
                RawProgress::Complete(bytes) => result = Some(bytes),
                RawProgress::NeedMore => prop_assert!(false, "header was complete"),
            }
        }

        prop_assert_eq!(acks, data.len().div_ceil(chunk_size) - 1);
        prop_assert_eq!(result, Some(data));
    }

    // ========================================================================
    // LED patterns
    // ========================================================================

    #[test]
    fn test_led_pattern_roundtrip(pattern in arb_pattern()) {
        let bytes = pattern.encode();
        prop_assert_eq!(bytes.len(), LED_PATTERN_SIZE);
        prop_assert_eq!(bytes[0], pattern.kind().code());

        let decoded = LedBorderPattern::decode(&bytes).unwrap();
        prop_assert_eq!(decoded, pattern);
        for color in decoded.start.iter().chain(decoded.end.iter()) {
            prop_assert_eq!(color.argb() >> 24, 0xFF);
        }
    }
}
