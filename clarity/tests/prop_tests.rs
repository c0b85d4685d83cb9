use proptest::prelude::*;

use blaze_clarity::{deserialize, ClarityValue};
use blaze_types::StandardPrincipal;

fn leaf() -> impl Strategy<Value = ClarityValue> {
    prop_oneof![
        any::<i128>().prop_map(ClarityValue::Int),
        any::<u128>().prop_map(ClarityValue::UInt),
        any::<bool>().prop_map(ClarityValue::Bool),
        prop::collection::vec(any::<u8>(), 0..65).prop_map(ClarityValue::Buffer),
        "[ -~]{0,24}".prop_map(ClarityValue::StringAscii),
        ((0u8..32), prop::array::uniform20(any::<u8>()))
            .prop_map(|(v, h)| ClarityValue::StandardPrincipal(StandardPrincipal::new(v, h))),
        Just(ClarityValue::OptionalNone),
    ]
}

fn value() -> impl Strategy<Value = ClarityValue> {
    leaf().prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            inner.clone().prop_map(ClarityValue::some),
            inner.clone().prop_map(ClarityValue::ok),
            prop::collection::vec(inner.clone(), 0..6).prop_map(ClarityValue::list),
            prop::collection::btree_map("[a-z][a-z0-9-]{0,8}", inner, 0..5)
                .prop_map(ClarityValue::Tuple),
        ]
    })
}

proptest! {
    /// Serialized values decode back to themselves.
    #[test]
    fn serialize_then_decode(v in value()) {
        prop_assert_eq!(deserialize(&v.serialize()).unwrap(), v);
    }

    /// Decoding arbitrary bytes never panics.
    #[test]
    fn decode_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = deserialize(&bytes);
    }
}
