//! Property tests for routing precedence.

use proptest::prelude::*;

use skiff::config::DeployConfig;
use skiff::models::{EdgeFunctionVersion, FunctionEndpoint};
use skiff::topology::{CacheMode, DistributionState};

fn state() -> DistributionState {
    DistributionState::new(
        &DeployConfig::default(),
        FunctionEndpoint {
            url: "https://abc123.lambda-url.eu-west-1.on.aws/".to_string(),
        },
        EdgeFunctionVersion {
            qualified_arn: "arn:aws:lambda:us-east-1:123:function:edge:7".to_string(),
        },
    )
    .expect("default topology is valid")
}

fn request_path() -> impl Strategy<Value = String> {
    // a mix of arbitrary text and realistic-looking paths
    prop_oneof![
        "(?s).{0,64}",
        "/?[a-z0-9./_-]{0,48}",
        "/?(api|edge|assets)/[a-z0-9./_-]{0,32}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: resolution never panics, and at most one non-default rule
    /// matches any path (the prefixes are disjoint), so exactly one rule
    /// wins once the catch-all default is counted.
    #[test]
    fn property_exactly_one_rule_wins(path in request_path()) {
        let state = state();
        let matching = state.rules.iter().filter(|rule| rule.matches(&path)).count();
        prop_assert!(matching <= 1, "{matching} non-default rules match {path:?}");

        let winner = state.match_rule(&path);
        if matching == 0 {
            prop_assert_eq!(&winner.pattern, "*");
        } else {
            prop_assert_ne!(&winner.pattern, "*");
        }
    }

    /// PROPERTY: paths under the API prefix never fall through to the
    /// default rule and never get a caching-enabled policy.
    #[test]
    fn property_api_paths_never_hit_the_default(suffix in "[a-zA-Z0-9./_-]{0,40}") {
        let state = state();
        let rule = state.match_rule(&format!("api/{suffix}"));
        prop_assert_eq!(&rule.pattern, "api/*");
        prop_assert_eq!(rule.cache, CacheMode::Disabled);
    }

    /// PROPERTY: paths under the edge prefix always carry the interceptor
    /// attachment with the body included, and never a cacheable policy.
    #[test]
    fn property_edge_paths_always_carry_the_interceptor(suffix in "[a-zA-Z0-9./_-]{0,40}") {
        let state = state();
        let rule = state.match_rule(&format!("/edge/{suffix}"));
        prop_assert_eq!(&rule.pattern, "edge/*");
        prop_assert_eq!(rule.cache, CacheMode::Disabled);
        let edge = rule.edge.as_ref().expect("edge attachment");
        prop_assert!(edge.include_body);
    }
}
