//! Request matching logic.
//!
//! Matches incoming requests against a server's declared routes, in
//! declaration order, with protocol-specific rules.

use crate::config::{MockRoute, MockServer, Protocol, RouteMatcher};
use std::collections::HashMap;

/// Transport-agnostic view of an inbound request.
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    /// HTTP method, as received
    pub method: String,
    /// Request path with any query string stripped
    pub path: String,
    /// Request headers, single-valued
    pub headers: HashMap<String, String>,
    /// Raw request body
    pub body: Vec<u8>,
}

impl MockRequest {
    /// Parse the body as JSON, if possible.
    pub fn json(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Find the first route whose matcher accepts the request.
///
/// Route order is part of the configuration contract: reordering routes can
/// change which one answers a request both accept.
pub fn match_route<'a>(server: &'a MockServer, request: &MockRequest) -> Option<&'a MockRoute> {
    server.routes.iter().find(|route| match server.protocol {
        Protocol::Rest => matches_rest(&route.matcher, request),
        Protocol::Soap => matches_soap(&route.matcher, request),
        Protocol::Rpc => matches_rpc(&route.matcher, request),
    })
}

fn matches_rest(matcher: &RouteMatcher, request: &MockRequest) -> bool {
    if let Some(path) = &matcher.path {
        if !rest_path_matches(path, &request.path) {
            return false;
        }
    }
    if let Some(method) = &matcher.method {
        if !method.eq_ignore_ascii_case(&request.method) {
            return false;
        }
    }
    true
}

fn matches_soap(matcher: &RouteMatcher, request: &MockRequest) -> bool {
    if let Some(expected) = &matcher.soap_action {
        let action = request
            .header("SOAPAction")
            .map(|value| value.trim_matches('"'))
            .unwrap_or("");
        if expected != action {
            return false;
        }
    }
    if let Some(path) = &matcher.path {
        if path != &request.path {
            return false;
        }
    }
    true
}

fn matches_rpc(matcher: &RouteMatcher, request: &MockRequest) -> bool {
    if let Some(expected) = &matcher.rpc_method {
        // A malformed or non-object body carries no method name.
        let body_method = request
            .json()
            .as_ref()
            .and_then(|value| value.get("method"))
            .and_then(|value| value.as_str())
            .map(str::to_owned);
        if body_method.as_deref() != Some(expected.as_str()) {
            return false;
        }
    }
    true
}

/// REST path comparison with `{param}` template segments.
///
/// A template segment matches any single path segment; literal segments must
/// match exactly and segment counts must agree.
fn rest_path_matches(matcher_path: &str, request_path: &str) -> bool {
    if matcher_path == request_path {
        return true;
    }
    if !matcher_path.contains('{') {
        return false;
    }
    let matcher_parts: Vec<&str> = matcher_path.trim_matches('/').split('/').collect();
    let request_parts: Vec<&str> = request_path.trim_matches('/').split('/').collect();
    if matcher_parts.len() != request_parts.len() {
        return false;
    }
    matcher_parts
        .iter()
        .zip(request_parts.iter())
        .all(|(matcher_part, request_part)| {
            (matcher_part.starts_with('{') && matcher_part.ends_with('}'))
                || matcher_part == request_part
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MockResponse, Protocol};

    fn route(operation: &str, matcher: RouteMatcher) -> MockRoute {
        MockRoute {
            operation: operation.to_string(),
            description: String::new(),
            matcher,
            response: MockResponse::default(),
            assertions: Vec::new(),
            driver_stub: None,
        }
    }

    fn server(protocol: Protocol, routes: Vec<MockRoute>) -> MockServer {
        MockServer {
            name: "test".to_string(),
            protocol,
            host: "127.0.0.1".to_string(),
            port: 0,
            routes,
        }
    }

    fn get(path: &str) -> MockRequest {
        MockRequest {
            method: "GET".to_string(),
            path: path.to_string(),
            ..MockRequest::default()
        }
    }

    #[test]
    fn test_rest_exact_path() {
        let server = server(
            Protocol::Rest,
            vec![route(
                "listPayments",
                RouteMatcher {
                    method: Some("GET".to_string()),
                    path: Some("/payments".to_string()),
                    ..RouteMatcher::default()
                },
            )],
        );

        assert!(match_route(&server, &get("/payments")).is_some());
        assert!(match_route(&server, &get("/refunds")).is_none());
    }

    #[test]
    fn test_rest_template_path() {
        let server = server(
            Protocol::Rest,
            vec![route(
                "getPayment",
                RouteMatcher {
                    path: Some("/payments/{id}".to_string()),
                    ..RouteMatcher::default()
                },
            )],
        );

        assert!(match_route(&server, &get("/payments/42")).is_some());
        assert!(match_route(&server, &get("/payments/abc")).is_some());
        assert!(match_route(&server, &get("/payments/42/extra")).is_none());
        assert!(match_route(&server, &get("/payments")).is_none());
    }

    #[test]
    fn test_rest_method_case_insensitive() {
        let matcher = RouteMatcher {
            method: Some("get".to_string()),
            path: Some("/payments".to_string()),
            ..RouteMatcher::default()
        };
        let server = server(Protocol::Rest, vec![route("listPayments", matcher)]);

        assert!(match_route(&server, &get("/payments")).is_some());

        let mut post = get("/payments");
        post.method = "POST".to_string();
        assert!(match_route(&server, &post).is_none());
    }

    #[test]
    fn test_rest_wildcard_matcher() {
        let server = server(Protocol::Rest, vec![route("any", RouteMatcher::default())]);
        assert!(match_route(&server, &get("/whatever")).is_some());
    }

    #[test]
    fn test_first_match_wins() {
        let wildcard = route("wildcard", RouteMatcher::default());
        let specific = route(
            "specific",
            RouteMatcher {
                path: Some("/payments".to_string()),
                ..RouteMatcher::default()
            },
        );
        let server = server(Protocol::Rest, vec![wildcard, specific]);

        let matched = match_route(&server, &get("/payments")).unwrap();
        assert_eq!(matched.operation, "wildcard");
    }

    #[test]
    fn test_reordering_non_overlapping_routes() {
        let payments = route(
            "payments",
            RouteMatcher {
                path: Some("/payments".to_string()),
                ..RouteMatcher::default()
            },
        );
        let refunds = route(
            "refunds",
            RouteMatcher {
                path: Some("/refunds".to_string()),
                ..RouteMatcher::default()
            },
        );

        let forward = server(Protocol::Rest, vec![payments.clone(), refunds.clone()]);
        let reversed = server(Protocol::Rest, vec![refunds, payments]);

        assert_eq!(
            match_route(&forward, &get("/refunds")).unwrap().operation,
            match_route(&reversed, &get("/refunds")).unwrap().operation,
        );
    }

    #[test]
    fn test_soap_action_with_quotes_stripped() {
        let server = server(
            Protocol::Soap,
            vec![route(
                "CreateInvoice",
                RouteMatcher {
                    soap_action: Some("urn:billing:CreateInvoice".to_string()),
                    ..RouteMatcher::default()
                },
            )],
        );

        let mut request = get("/soap");
        request.method = "POST".to_string();
        request.headers.insert(
            "SOAPAction".to_string(),
            "\"urn:billing:CreateInvoice\"".to_string(),
        );
        assert!(match_route(&server, &request).is_some());

        request
            .headers
            .insert("SOAPAction".to_string(), "urn:other".to_string());
        assert!(match_route(&server, &request).is_none());
    }

    #[test]
    fn test_soap_optional_path_check() {
        let server = server(
            Protocol::Soap,
            vec![route(
                "CreateInvoice",
                RouteMatcher {
                    soap_action: Some("urn:billing:CreateInvoice".to_string()),
                    path: Some("/billing".to_string()),
                    ..RouteMatcher::default()
                },
            )],
        );

        let mut request = get("/elsewhere");
        request
            .headers
            .insert("SOAPAction".to_string(), "urn:billing:CreateInvoice".to_string());
        assert!(match_route(&server, &request).is_none());

        request.path = "/billing".to_string();
        assert!(match_route(&server, &request).is_some());
    }

    #[test]
    fn test_rpc_method_from_body() {
        let server = server(
            Protocol::Rpc,
            vec![route(
                "invoice.create",
                RouteMatcher {
                    rpc_method: Some("invoice.create".to_string()),
                    ..RouteMatcher::default()
                },
            )],
        );

        let mut request = get("/rpc");
        request.method = "POST".to_string();
        request.body = br#"{"method": "invoice.create", "params": {}}"#.to_vec();
        assert!(match_route(&server, &request).is_some());

        request.body = br#"{"method": "invoice.delete"}"#.to_vec();
        assert!(match_route(&server, &request).is_none());
    }

    #[test]
    fn test_rpc_malformed_body_has_no_method() {
        let server = server(
            Protocol::Rpc,
            vec![route(
                "invoice.create",
                RouteMatcher {
                    rpc_method: Some("invoice.create".to_string()),
                    ..RouteMatcher::default()
                },
            )],
        );

        let mut request = get("/rpc");
        request.body = b"not json at all".to_vec();
        assert!(match_route(&server, &request).is_none());
    }

    #[test]
    fn test_rpc_wildcard_matches_malformed_body() {
        let server = server(Protocol::Rpc, vec![route("any", RouteMatcher::default())]);

        let mut request = get("/rpc");
        request.body = b"not json".to_vec();
        assert!(match_route(&server, &request).is_some());
    }
}
