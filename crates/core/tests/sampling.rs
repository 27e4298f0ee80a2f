//! Tests for parameter mapping tables.

use ragllm_core::{Error, Extras, Mapping, ParamTable, ProviderId, Sampling};
use serde_json::json;
use std::collections::BTreeMap;

const TABLE: ParamTable = ParamTable {
    provider: ProviderId::Cohere,
    temperature: Mapping::Wire("temperature"),
    top_p: Mapping::Wire("p"),
    top_k: Mapping::Wire("k"),
    max_tokens: Mapping::Wire("max_tokens"),
    seed: Mapping::Drop,
    defaults: Sampling {
        max_tokens: Some(256),
        ..Sampling::NONE
    },
    options: &["region"],
    extras: Extras::Only(&["preamble"]),
};

fn sampling() -> Sampling {
    Sampling {
        temperature: Some(0.2),
        top_p: Some(0.9),
        top_k: Some(10),
        seed: Some(7),
        ..Sampling::NONE
    }
}

#[test]
fn renames_and_fills_defaults() {
    let mapped = TABLE.apply(&sampling(), &BTreeMap::new()).unwrap();
    assert_eq!(mapped.sampling["p"], json!(0.9));
    assert_eq!(mapped.sampling["k"], json!(10));
    assert_eq!(mapped.sampling["max_tokens"], json!(256));
    assert!(!mapped.sampling.contains_key("seed"));
    assert!(!mapped.sampling.contains_key("top_p"));
}

#[test]
fn configured_value_beats_default() {
    let mapped = TABLE
        .apply(
            &Sampling {
                max_tokens: Some(12),
                ..Sampling::NONE
            },
            &BTreeMap::new(),
        )
        .unwrap();
    assert_eq!(mapped.sampling["max_tokens"], json!(12));
}

#[test]
fn reject_fails_at_apply() {
    let table = ParamTable {
        top_k: Mapping::Reject,
        ..TABLE
    };
    let err = table.apply(&sampling(), &BTreeMap::new()).unwrap_err();
    assert!(
        matches!(err, Error::UnsupportedParameter { ref parameter, .. } if parameter == "top_k"),
        "{err}"
    );
}

#[test]
fn extras_allow_list() {
    let mut extra = BTreeMap::new();
    extra.insert("preamble".to_owned(), json!("be brief"));
    extra.insert("region".to_owned(), json!("eu"));
    let mapped = TABLE.apply(&Sampling::NONE, &extra).unwrap();
    assert_eq!(mapped.extra["preamble"], json!("be brief"));
    assert!(!mapped.extra.contains_key("region"));

    extra.insert("frobnicate".to_owned(), json!(true));
    let err = TABLE.apply(&Sampling::NONE, &extra).unwrap_err();
    assert!(matches!(err, Error::UnsupportedParameter { ref parameter, .. } if parameter == "frobnicate"));
}

#[test]
fn extras_any_passes_everything() {
    let table = ParamTable::passthrough(ProviderId::Vllm, Extras::Any);
    let mut extra = BTreeMap::new();
    extra.insert("use_beam_search".to_owned(), json!(true));
    let mapped = table.apply(&Sampling::NONE, &extra).unwrap();
    assert_eq!(mapped.extra["use_beam_search"], json!(true));
}

#[test]
fn merge_into_body() {
    let mapped = ParamTable::passthrough(ProviderId::OpenAi, Extras::Any)
        .apply(&sampling(), &BTreeMap::new())
        .unwrap();
    let mut body = serde_json::Map::new();
    mapped.merge_into(&mut body);
    assert_eq!(body["temperature"], json!(0.2));
    assert_eq!(body["seed"], json!(7));
}
