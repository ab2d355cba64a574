//! End-to-end tests for the built-in HTTP source kinds against a mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use machinae_lookup::{
    Credentials, ErrorKind, Finding, LookupConfig, Orchestrator, Registry, SiteFactory,
    SiteOutcome, TargetInfo,
};
use serde_json::{json, Map, Value};
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("literal is an object"),
    }
}

fn orchestrator(sites: Value) -> Orchestrator {
    let config = LookupConfig {
        timeout_seconds: 5,
        ..Default::default()
    };
    let registry = Registry::from_map(&object(sites)).expect("valid sites");
    let factory = Arc::new(SiteFactory::new(config.timeout()));
    Orchestrator::new(registry, factory, config).expect("valid config")
}

fn results(outcome: &SiteOutcome) -> &[Finding] {
    match outcome {
        SiteOutcome::Results(site) => &site.results,
        SiteOutcome::Error(e) => panic!("{} failed: {}", e.descriptor.name, e.error),
    }
}

#[tokio::test]
async fn json_site_extracts_labelled_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip/8.8.8.8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "org": "AS15169 Google LLC",
            "geo": { "country": "US" },
            "hostnames": ["dns.google", "google-public-dns-a.google.com"]
        })))
        .mount(&server)
        .await;

    let orch = orchestrator(json!({
        "ipinfo": {
            "name": "IP Info",
            "otypes": ["ipv4"],
            "json": {
                "request": { "url": format!("{}/ip/{{target}}", server.uri()) },
                "results": [
                    { "key": "org", "pretty_name": "Organization" },
                    { "key": "geo.country", "pretty_name": "Country" },
                    { "key": "hostnames", "pretty_name": "Hostname", "multi_match": true }
                ]
            }
        }
    }));

    let set = orch.lookup(TargetInfo::new("8.8.8.8", "ipv4", true)).await;
    assert_eq!(set.entries.len(), 1);
    assert_eq!(set.entries[0].descriptor().display_name(), "IP Info");
    assert_eq!(
        results(&set.entries[0]),
        &[
            Finding::new("AS15169 Google LLC", Some("Organization".into())),
            Finding::new("US", Some("Country".into())),
            Finding::new("dns.google", Some("Hostname".into())),
            Finding::new("google-public-dns-a.google.com", Some("Hostname".into())),
        ]
    );
}

#[tokio::test]
async fn webscraper_site_scrapes_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scan"))
        .and(query_param("ip", "10.0.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<tr><td>Blacklist</td><td>spamhaus</td></tr>\
             <tr><td>Blacklist</td><td>sorbs</td></tr>",
        ))
        .mount(&server)
        .await;

    let orch = orchestrator(json!({
        "scanner": {
            "otypes": ["ipv4"],
            "webscraper": {
                "request": {
                    "url": format!("{}/scan", server.uri()),
                    "params": { "ip": "{target}" }
                },
                "results": [{ "regex": "Blacklist</td><td>(\\w+)</td>", "pretty_name": "Listed" }]
            }
        }
    }));

    let set = orch.lookup(TargetInfo::new("10.0.0.1", "ipv4", true)).await;
    let values: Vec<&str> = results(&set.entries[0])
        .iter()
        .map(|f| f.value.as_str())
        .collect();
    assert_eq!(values, vec!["spamhaus", "sorbs"]);
}

#[tokio::test]
async fn post_sends_form_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/lookup"))
        .and(body_string_contains("query=evil.example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "verdict": "malicious" })))
        .mount(&server)
        .await;

    let orch = orchestrator(json!({
        "verdicts": {
            "otypes": ["fqdn"],
            "json": {
                "request": {
                    "url": format!("{}/lookup", server.uri()),
                    "method": "post",
                    "data": { "query": "{target}" }
                },
                "results": [{ "key": "verdict", "pretty_name": "Verdict" }]
            }
        }
    }));

    let set = orch.lookup(TargetInfo::new("evil.example", "fqdn", true)).await;
    assert_eq!(
        results(&set.entries[0]),
        &[Finding::new("malicious", Some("Verdict".into()))]
    );
}

#[tokio::test]
async fn header_and_basic_credentials_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/keyed"))
        .and(header("X-Api-Key", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "score": 7 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/basic"))
        .and(basic_auth("analyst", "hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "score": 9 })))
        .mount(&server)
        .await;

    let credentials = Credentials::new(object(json!({
        "keyed": { "header": "X-Api-Key", "value": "s3cret" },
        "basic": { "username": "analyst", "password": "hunter2" }
    })));
    let orch = orchestrator(json!({
        "keyed": {
            "otypes": ["ipv4"],
            "json": {
                "request": { "url": format!("{}/keyed", server.uri()), "auth": "keyed" },
                "results": [{ "key": "score", "pretty_name": "Score" }]
            }
        },
        "basic": {
            "otypes": ["ipv4"],
            "json": {
                "request": { "url": format!("{}/basic", server.uri()), "auth": "basic" },
                "results": [{ "key": "score", "pretty_name": "Score" }]
            }
        }
    }))
    .with_credentials(credentials);

    let set = orch.lookup(TargetInfo::new("1.2.3.4", "ipv4", true)).await;
    assert_eq!(set.names(), vec!["keyed", "basic"]);
    assert_eq!(results(&set.entries[0])[0].value, "7");
    assert_eq!(results(&set.entries[1])[0].value, "9");
}

#[tokio::test]
async fn http_failures_become_error_results_in_place() {
    let server = MockServer::start().await;
    Mock::given(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;
    Mock::given(path("/up"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": "yes" })))
        .mount(&server)
        .await;

    let site = |route: &str| {
        json!({
            "otypes": ["ipv4"],
            "json": {
                "request": { "url": format!("{}{route}", server.uri()) },
                "results": [{ "key": "ok", "pretty_name": "OK" }]
            }
        })
    };
    let orch = orchestrator(json!({
        "down": site("/down"),
        "garbage": site("/garbage"),
        "up": site("/up"),
    }));

    let set = orch.lookup(TargetInfo::new("1.2.3.4", "ipv4", true)).await;
    assert_eq!(set.names(), vec!["down", "garbage", "up"]);

    let SiteOutcome::Error(down) = &set.entries[0] else {
        panic!("expected error for down");
    };
    let ErrorKind::SourceFault(message) = &down.error else {
        panic!("expected source fault");
    };
    assert!(message.contains("503"), "{message}");

    let SiteOutcome::Error(garbage) = &set.entries[1] else {
        panic!("expected error for garbage");
    };
    assert!(garbage.error.to_string().contains("invalid JSON"));

    assert_eq!(results(&set.entries[2]), &[Finding::new("yes", Some("OK".into()))]);
}

#[tokio::test]
async fn unknown_site_kind_reports_fault() {
    let orch = orchestrator(json!({
        "legacy": { "otypes": ["ipv4"], "rss": { "url": "http://127.0.0.1/feed" } }
    }));

    let set = orch.lookup(TargetInfo::new("1.2.3.4", "ipv4", true)).await;
    let SiteOutcome::Error(error) = &set.entries[0] else {
        panic!("expected error");
    };
    assert!(error.error.to_string().contains("no supported kind"));
}
