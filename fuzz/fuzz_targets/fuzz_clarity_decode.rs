#![no_main]

use libfuzzer_sys::fuzz_target;

// Decoding arbitrary bytes must never panic, and anything that decodes
// must survive an encode/decode trip unchanged.
fuzz_target!(|data: &[u8]| {
    if let Ok(value) = blaze_clarity::deserialize(data) {
        let encoded = value.serialize();
        let again = blaze_clarity::deserialize(&encoded).expect("re-encoded value must decode");
        assert_eq!(again, value);
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = blaze_clarity::deserialize_hex(text);
    }
});
