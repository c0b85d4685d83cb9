#![no_main]

use libfuzzer_sys::fuzz_target;

// Intake bodies come straight off the wire.
fuzz_target!(|data: &[u8]| {
    if let Ok(request) = serde_json::from_slice::<blaze_types::TransferRequest>(data) {
        let _ = request.to_transfer();
        let json = serde_json::to_vec(&request).expect("request serializes");
        let back: blaze_types::TransferRequest =
            serde_json::from_slice(&json).expect("serialized request parses");
        assert_eq!(back, request);
    }
});
