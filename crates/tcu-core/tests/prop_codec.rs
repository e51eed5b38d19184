//! Property-based tests for the XML envelope codec

use proptest::prelude::*;
use tcu_core::{decode_response, encode_request, Node, ParamBlock, ParamBlocks};

/// Text the codec must carry unchanged, markup characters included
fn field_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 /._-]{0,24}",
        "[&<>\"'=; a-z]{1,24}",
        "[\\p{L}\\p{N} ]{0,16}",
    ]
}

fn field_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,11}"
}

proptest! {
    #[test]
    fn prop_field_values_survive_encoding(name in field_name(), value in field_text()) {
        let blocks: ParamBlocks = ParamBlock::new().with(name.clone(), value.clone()).into();
        let body = encode_request(&blocks, "user", "token&<>").unwrap();

        let text = String::from_utf8(body.clone()).unwrap();
        if value.contains('<') || value.contains('&') {
            let raw_element = format!(">{}</{}>", value, name);
            prop_assert!(!text.contains(&raw_element));
        }

        let tree = decode_response(&body).unwrap();
        prop_assert_eq!(tree.text(&format!("RequestParameters.{}", name)).unwrap(), value.as_str());
        prop_assert_eq!(tree.text("UsernameToken.SessionToken").unwrap(), "token&<>");
    }

    #[test]
    fn prop_repeated_values_keep_order(values in prop::collection::vec("[A-Z][0-9]{1,6}", 2..6)) {
        let blocks: ParamBlocks = ParamBlock::new().with("f4indexno", values.clone()).into();
        let tree = decode_response(&encode_request(&blocks, "u", "t").unwrap()).unwrap();

        let decoded: Vec<&str> = tree
            .path("RequestParameters.f4indexno")
            .unwrap()
            .items()
            .iter()
            .map(|n| n.as_str().unwrap())
            .collect();
        prop_assert_eq!(decoded, values.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn prop_one_block_per_record(count in 1usize..8) {
        let blocks: Vec<ParamBlock> = (0..count)
            .map(|i| ParamBlock::new().with("f4indexno", format!("S0123/{:04}/2019", i)))
            .collect();
        let body = encode_request(&ParamBlocks::from(blocks), "u", "t").unwrap();
        let tree = decode_response(&body).unwrap();

        let parameters = tree.field("RequestParameters").unwrap();
        prop_assert_eq!(parameters.items().len(), count);
        prop_assert!(matches!(tree.field("UsernameToken").unwrap(), Node::Object(_)));
        for (i, block) in parameters.items().iter().enumerate() {
            let expected = format!("S0123/{:04}/2019", i);
            prop_assert_eq!(block.text("f4indexno").unwrap(), expected.as_str());
        }
    }
}
