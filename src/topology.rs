//! Routing/caching topology for the playground distribution
//!
//! The topology is a declarative value: an ordered rule list plus one
//! default rule, validated as a pure function before any remote call is
//! made. Three traffic classes share the distribution:
//!
//! 1. `api/*`  — synchronous function origin, caching disabled
//! 2. `edge/*` — same origin, plus the viewer-request edge interceptor
//! 3. default  — static bundle origin, cacheable, HTTPS-enforced
//!
//! Precedence is first-match-wins with prefix patterns; the API and edge
//! prefixes must be disjoint. The static origin is only ever reachable
//! through an access-control identity scoped to the distribution, never
//! as a public bucket.

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::DeployConfig;
use crate::error::{SkiffError, SkiffResult};
use crate::models::{EdgeFunctionVersion, FunctionEndpoint};

/// Managed cache policy: no caching, every request forwarded.
pub const CACHE_POLICY_DISABLED_ID: &str = "4135ea2d-6df8-44a3-9df3-4b5a84be39ad";
/// Managed cache policy: long-lived caching keyed on the normalized request.
pub const CACHE_POLICY_OPTIMIZED_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";
/// Managed origin-request policy: forward all viewer data except the host
/// header, so the function sees the true client path and headers.
pub const ORIGIN_REQUEST_ALL_VIEWER_EXCEPT_HOST_ID: &str =
    "b689b0a8-53d0-40ab-baf2-68738e2966ac";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    Disabled,
    Cached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowedMethods {
    All,
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocol {
    RedirectToHttps,
    HttpsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginRequest {
    /// Origin decides from the cache key alone
    Default,
    /// Forward everything the viewer sent except the host header
    AllViewerExceptHost,
}

/// Where a rule sends matching traffic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Origin {
    /// The static bundle, via the distribution-scoped access identity
    Static,
    /// The synchronous function's HTTPS endpoint
    Function { host: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgePhase {
    ViewerRequest,
}

/// An edge interceptor pinned to a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeAttachment {
    pub version: EdgeFunctionVersion,
    pub phase: EdgePhase,
    /// The interceptor transforms requests before the origin sees them, so
    /// it needs the body, not just headers.
    pub include_body: bool,
}

/// One path-pattern-to-origin mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingRule {
    /// Prefix pattern, e.g. `api/*`; the default rule uses `*`
    pub pattern: String,
    pub origin: Origin,
    pub cache: CacheMode,
    pub methods: AllowedMethods,
    pub viewer_protocol: ViewerProtocol,
    pub origin_request: OriginRequest,
    pub edge: Option<EdgeAttachment>,
}

impl RoutingRule {
    fn api(pattern: &str, host: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            origin: Origin::Function {
                host: host.to_string(),
            },
            cache: CacheMode::Disabled,
            methods: AllowedMethods::All,
            viewer_protocol: ViewerProtocol::HttpsOnly,
            origin_request: OriginRequest::AllViewerExceptHost,
            edge: None,
        }
    }

    fn edge_intercepted(pattern: &str, host: &str, version: &EdgeFunctionVersion) -> Self {
        let mut rule = Self::api(pattern, host);
        rule.edge = Some(EdgeAttachment {
            version: version.clone(),
            phase: EdgePhase::ViewerRequest,
            include_body: true,
        });
        rule
    }

    fn default_static() -> Self {
        Self {
            pattern: "*".to_string(),
            origin: Origin::Static,
            cache: CacheMode::Cached,
            methods: AllowedMethods::ReadOnly,
            viewer_protocol: ViewerProtocol::RedirectToHttps,
            origin_request: OriginRequest::Default,
            edge: None,
        }
    }

    /// Prefix match against a request path. Leading slashes on the path and
    /// the trailing `*` on the pattern are ignored.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        let prefix = self.pattern.trim_end_matches('*');
        path.starts_with(prefix)
    }
}

/// The deployed topology: ordered rules, one default, and the published
/// function references they point at. Mutated only by a full deploy cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionState {
    /// Non-default rules, in precedence order
    pub rules: Vec<RoutingRule>,
    pub default_rule: RoutingRule,
    pub endpoint: FunctionEndpoint,
    pub edge_version: EdgeFunctionVersion,
    pub default_root_object: String,
    pub minimum_tls: String,
    pub ipv6: bool,
    pub logging: bool,
    pub price_class: String,
}

impl DistributionState {
    /// Build and validate the topology. Pure; no I/O.
    pub fn new(
        deploy: &DeployConfig,
        endpoint: FunctionEndpoint,
        edge_version: EdgeFunctionVersion,
    ) -> SkiffResult<Self> {
        let host = endpoint.host().to_string();
        let state = Self {
            rules: vec![
                RoutingRule::api(&deploy.api_prefix, &host),
                RoutingRule::edge_intercepted(&deploy.edge_prefix, &host, &edge_version),
            ],
            default_rule: RoutingRule::default_static(),
            endpoint,
            edge_version,
            default_root_object: "index.html".to_string(),
            minimum_tls: "TLSv1.2_2021".to_string(),
            ipv6: true,
            logging: true,
            price_class: "PriceClass_All".to_string(),
        };
        state.validate()?;
        Ok(state)
    }

    /// Check the structural invariants before anything is sent remotely.
    pub fn validate(&self) -> SkiffResult<()> {
        let invalid = |reason: String| SkiffError::InvalidTopology { reason };

        for rule in &self.rules {
            let prefix = rule.pattern.trim_end_matches('*');
            if prefix.is_empty() {
                return Err(invalid(format!(
                    "rule pattern '{}' would shadow the default rule",
                    rule.pattern
                )));
            }
            if !rule.pattern.ends_with('*') {
                return Err(invalid(format!(
                    "rule pattern '{}' must end with '*'",
                    rule.pattern
                )));
            }
            if matches!(rule.origin, Origin::Static) {
                return Err(invalid(format!(
                    "rule '{}' must target the function origin",
                    rule.pattern
                )));
            }
        }

        // pairwise prefix disjointness
        for (i, a) in self.rules.iter().enumerate() {
            for b in self.rules.iter().skip(i + 1) {
                let pa = a.pattern.trim_end_matches('*');
                let pb = b.pattern.trim_end_matches('*');
                if pa.starts_with(pb) || pb.starts_with(pa) {
                    return Err(invalid(format!(
                        "rule patterns '{}' and '{}' overlap",
                        a.pattern, b.pattern
                    )));
                }
            }
        }

        if self.default_rule.pattern != "*" {
            return Err(invalid("default rule must match everything".to_string()));
        }
        if self.default_rule.origin != Origin::Static {
            return Err(invalid(
                "default rule must target the static origin".to_string(),
            ));
        }
        if self.default_rule.edge.is_some() {
            return Err(invalid(
                "default rule must not carry an edge attachment".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the single winning rule for `path`, first match wins.
    pub fn match_rule(&self, path: &str) -> &RoutingRule {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .unwrap_or(&self.default_rule)
    }
}

// ------------------------------------------------------------------------
// Rendering to the distribution API's wire shape.
//
// Only the parts a deploy owns are rendered: the renderer origin and the
// cache behaviors. The static origin and its access identity are
// provisioned once, out of band, and merged in by the caller.
// ------------------------------------------------------------------------

fn allowed_methods_json(methods: AllowedMethods) -> Value {
    match methods {
        AllowedMethods::All => json!({
            "Quantity": 7,
            "Items": ["GET", "HEAD", "OPTIONS", "PUT", "POST", "PATCH", "DELETE"],
            "CachedMethods": { "Quantity": 2, "Items": ["GET", "HEAD"] }
        }),
        AllowedMethods::ReadOnly => json!({
            "Quantity": 2,
            "Items": ["GET", "HEAD"],
            "CachedMethods": { "Quantity": 2, "Items": ["GET", "HEAD"] }
        }),
    }
}

fn viewer_protocol_json(policy: ViewerProtocol) -> Value {
    match policy {
        ViewerProtocol::RedirectToHttps => json!("redirect-to-https"),
        ViewerProtocol::HttpsOnly => json!("https-only"),
    }
}

fn cache_policy_id(cache: CacheMode) -> &'static str {
    match cache {
        CacheMode::Disabled => CACHE_POLICY_DISABLED_ID,
        CacheMode::Cached => CACHE_POLICY_OPTIMIZED_ID,
    }
}

fn behavior_json(rule: &RoutingRule, origin_id: &str) -> Value {
    let mut behavior = json!({
        "TargetOriginId": origin_id,
        "ViewerProtocolPolicy": viewer_protocol_json(rule.viewer_protocol),
        "CachePolicyId": cache_policy_id(rule.cache),
        "AllowedMethods": allowed_methods_json(rule.methods),
        "Compress": true,
    });
    if rule.origin_request == OriginRequest::AllViewerExceptHost {
        behavior["OriginRequestPolicyId"] = json!(ORIGIN_REQUEST_ALL_VIEWER_EXCEPT_HOST_ID);
    }
    if let Some(edge) = &rule.edge {
        behavior["LambdaFunctionAssociations"] = json!({
            "Quantity": 1,
            "Items": [{
                "LambdaFunctionARN": edge.version.qualified_arn,
                "EventType": "viewer-request",
                "IncludeBody": edge.include_body,
            }]
        });
    }
    behavior
}

impl DistributionState {
    /// The renderer HTTP origin entry, HTTPS-only to the function endpoint.
    pub fn render_function_origin(&self, origin_id: &str) -> Value {
        json!({
            "Id": origin_id,
            "DomainName": self.endpoint.host(),
            "CustomOriginConfig": {
                "HTTPPort": 80,
                "HTTPSPort": 443,
                "OriginProtocolPolicy": "https-only",
                "OriginSslProtocols": { "Quantity": 1, "Items": ["TLSv1.2"] },
            },
            "OriginPath": "",
            "CustomHeaders": { "Quantity": 0 },
        })
    }

    /// The default behavior, pointed at the provisioned static origin.
    pub fn render_default_behavior(&self, static_origin_id: &str) -> Value {
        behavior_json(&self.default_rule, static_origin_id)
    }

    /// The ordered non-default behaviors, pointed at the renderer origin.
    pub fn render_cache_behaviors(&self, function_origin_id: &str) -> Value {
        let items: Vec<Value> = self
            .rules
            .iter()
            .map(|rule| {
                let mut behavior = behavior_json(rule, function_origin_id);
                behavior["PathPattern"] = json!(rule.pattern);
                behavior
            })
            .collect();
        json!({ "Quantity": items.len(), "Items": items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> DistributionState {
        let endpoint = FunctionEndpoint {
            url: "https://abc123.lambda-url.eu-west-1.on.aws/".to_string(),
        };
        let version = EdgeFunctionVersion {
            qualified_arn: "arn:aws:lambda:us-east-1:123:function:edge:7".to_string(),
        };
        DistributionState::new(&DeployConfig::default(), endpoint, version).unwrap()
    }

    #[test]
    fn topology_has_exactly_three_rules() {
        let state = state();
        assert_eq!(state.rules.len(), 2);
        assert_eq!(state.rules[0].pattern, "api/*");
        assert_eq!(state.rules[1].pattern, "edge/*");
        assert_eq!(state.default_rule.pattern, "*");
    }

    #[test]
    fn api_paths_hit_the_function_with_caching_disabled() {
        let state = state();
        let rule = state.match_rule("/api/render");
        assert_eq!(rule.pattern, "api/*");
        assert_eq!(rule.cache, CacheMode::Disabled);
        assert_eq!(rule.methods, AllowedMethods::All);
        assert_eq!(rule.origin_request, OriginRequest::AllViewerExceptHost);
        assert!(rule.edge.is_none());
        assert!(matches!(rule.origin, Origin::Function { .. }));
    }

    #[test]
    fn edge_paths_carry_the_interceptor_with_body() {
        let state = state();
        let rule = state.match_rule("edge/transform");
        let edge = rule.edge.as_ref().expect("edge attachment");
        assert_eq!(edge.phase, EdgePhase::ViewerRequest);
        assert!(edge.include_body);
        assert_eq!(rule.cache, CacheMode::Disabled);
    }

    #[test]
    fn everything_else_falls_through_to_the_static_default() {
        let state = state();
        // "apix" does not start with the "api/" prefix, so it falls through
        for path in ["/", "/index.html", "/monacoeditorwork/ts.worker.bundle.js", "apix"] {
            assert_eq!(state.match_rule(path).pattern, "*", "path {path}");
        }
        assert_eq!(state.default_rule.origin, Origin::Static);
        assert_eq!(state.default_rule.cache, CacheMode::Cached);
        assert_eq!(
            state.default_rule.viewer_protocol,
            ViewerProtocol::RedirectToHttps
        );
    }

    #[test]
    fn overlapping_prefixes_are_rejected() {
        let mut deploy = DeployConfig::default();
        deploy.edge_prefix = "api/edge/*".to_string();
        let endpoint = FunctionEndpoint {
            url: "https://x.on.aws/".to_string(),
        };
        let version = EdgeFunctionVersion {
            qualified_arn: "arn:1".to_string(),
        };
        let err = DistributionState::new(&deploy, endpoint, version).unwrap_err();
        assert!(matches!(err, SkiffError::InvalidTopology { .. }));
    }

    #[test]
    fn catch_all_rule_pattern_is_rejected() {
        let mut deploy = DeployConfig::default();
        deploy.api_prefix = "*".to_string();
        let endpoint = FunctionEndpoint {
            url: "https://x.on.aws/".to_string(),
        };
        let version = EdgeFunctionVersion {
            qualified_arn: "arn:1".to_string(),
        };
        let err = DistributionState::new(&deploy, endpoint, version).unwrap_err();
        assert!(matches!(err, SkiffError::InvalidTopology { .. }));
    }

    #[test]
    fn rendered_behaviors_carry_the_published_references() {
        let state = state();
        let behaviors = state.render_cache_behaviors("renderer");
        assert_eq!(behaviors["Quantity"], 2);
        let edge_assoc = &behaviors["Items"][1]["LambdaFunctionAssociations"]["Items"][0];
        assert_eq!(
            edge_assoc["LambdaFunctionARN"],
            "arn:aws:lambda:us-east-1:123:function:edge:7"
        );
        assert_eq!(edge_assoc["IncludeBody"], true);

        let origin = state.render_function_origin("renderer");
        assert_eq!(origin["DomainName"], "abc123.lambda-url.eu-west-1.on.aws");
        assert_eq!(
            origin["CustomOriginConfig"]["OriginProtocolPolicy"],
            "https-only"
        );
    }

    #[test]
    fn rendered_default_behavior_is_cached_and_static() {
        let state = state();
        let default = state.render_default_behavior("static");
        assert_eq!(default["TargetOriginId"], "static");
        assert_eq!(default["CachePolicyId"], CACHE_POLICY_OPTIMIZED_ID);
        assert_eq!(default["ViewerProtocolPolicy"], "redirect-to-https");
        assert!(default.get("LambdaFunctionAssociations").is_none());
    }
}
