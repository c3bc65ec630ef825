#![no_main]

use libfuzzer_sys::fuzz_target;
use medisync_client::{Frame, FrameDecoder};

fuzz_target!(|data: &[u8]| {
    let Some((&split_seed, body)) = data.split_first() else {
        return;
    };

    let mut whole = FrameDecoder::new();
    let mut expected = whole.push(body);
    expected.extend(whole.finish());

    let split = if body.is_empty() {
        0
    } else {
        usize::from(split_seed) % body.len()
    };
    let mut chunked = FrameDecoder::new();
    let mut frames = chunked.push(&body[..split]);
    frames.extend(chunked.push(&body[split..]));
    frames.extend(chunked.finish());

    assert_eq!(frames, expected);
    assert_eq!(chunked.pending_len(), 0);
    for frame in &frames {
        if let Frame::Invalid(reason) = frame {
            assert!(!reason.is_empty());
        }
    }
});
