use proptest::prelude::*;

use blaze_types::c32::{c32_decode, c32_encode, c32check_decode, c32check_encode};
use blaze_types::{MicroAmount, Principal, StandardPrincipal, Timestamp};

proptest! {
    /// c32 roundtrip: decode(encode(bytes)) == bytes, including leading zeros.
    #[test]
    fn c32_roundtrip(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let encoded = c32_encode(&bytes);
        prop_assert_eq!(c32_decode(&encoded).unwrap(), bytes);
    }

    /// c32check roundtrip for every 5-bit version.
    #[test]
    fn c32check_roundtrip(version in 0u8..32, data in prop::collection::vec(any::<u8>(), 0..40)) {
        let encoded = c32check_encode(version, &data);
        let (v, d) = c32check_decode(&encoded).unwrap();
        prop_assert_eq!(v, version);
        prop_assert_eq!(d, data);
    }

    /// Standard principals survive string formatting and parsing.
    #[test]
    fn standard_principal_roundtrip(version in 0u8..32, hash in prop::array::uniform20(any::<u8>())) {
        let p = Principal::from(StandardPrincipal::new(version, hash));
        let parsed = Principal::parse(&p.to_string()).unwrap();
        prop_assert_eq!(parsed, p);
    }

    /// Decoding arbitrary text never panics.
    #[test]
    fn principal_parse_never_panics(s in "\\PC{0,60}") {
        let _ = Principal::parse(&s);
    }

    /// Timestamp ordering: from_millis(a) <= from_millis(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::from_millis(a);
        let tb = Timestamp::from_millis(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::from_millis(base);
        prop_assert_eq!(t.elapsed_since(Timestamp::from_millis(base + offset)), offset);
        prop_assert_eq!(Timestamp::from_millis(base + offset + 1).elapsed_since(t), 0);
    }

    /// MicroAmount: from_tokens and whole_tokens are inverses for whole units.
    #[test]
    fn micro_amount_token_roundtrip(tokens in 0u128..1_000_000_000) {
        prop_assert_eq!(MicroAmount::from_tokens(tokens).whole_tokens(), tokens);
    }

    /// MicroAmount: checked_sub returns None when b > a.
    #[test]
    fn micro_amount_checked_sub(a in 0u128..1_000_000, b in 0u128..1_000_000) {
        let result = MicroAmount::new(a).checked_sub(MicroAmount::new(b));
        if b > a {
            prop_assert!(result.is_none());
        } else {
            prop_assert_eq!(result, Some(MicroAmount::new(a - b)));
        }
    }
}
