#![no_main]

use libfuzzer_sys::fuzz_target;

// Principal parsing must never panic, and a parsed principal must print
// back to a string that parses to the same principal.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(principal) = blaze_types::Principal::parse(text) {
        let printed = principal.to_string();
        let reparsed = blaze_types::Principal::parse(&printed).expect("printed principal parses");
        assert_eq!(reparsed, principal);
    }
    let _ = blaze_types::c32::c32_decode(text);
});
