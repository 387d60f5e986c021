use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tidier_core::{RawConfig, TidierConfig};
use tidier_github_issues::{closer_for_strategy, GithubApiClient, GithubClientConfig};
use tidier_triage::{
    run_triage, ActionOutcome, NotificationOutcome, RepositoryDecision, RunExit, TriageServices,
    WebhookNotifier,
};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("fixed timestamp")
}

fn client_for(server: &MockServer) -> GithubApiClient {
    GithubApiClient::new(&GithubClientConfig {
        api_base: server.base_url(),
        graphql_url: server.url("/graphql"),
        token: "ghp_integration".to_string(),
        request_timeout_ms: 5_000,
        retry_max_attempts: 1,
        retry_base_delay_ms: 1,
    })
    .expect("client")
}

fn config(raw: RawConfig) -> TidierConfig {
    RawConfig {
        access_token: Some("ghp_integration".to_string()),
        label: Some("stale".to_string()),
        ..raw
    }
    .validate()
    .expect("config")
}

fn search_item(base: &str, repo: &str, number: u64, state: &str, updated_at: &str) -> Value {
    json!({
        "url": format!("{base}/repos/{repo}/issues/{number}"),
        "number": number,
        "title": format!("{repo} #{number}"),
        "state": state,
        "updated_at": updated_at,
        "labels": [{ "name": "stale" }]
    })
}

fn mock_search(server: &MockServer, items: Vec<Value>) {
    let body = json!({
        "total_count": items.len(),
        "incomplete_results": false,
        "items": items
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/search/issues")
            .query_param("q", "label:\"stale\"");
        then.status(200).json_body(body.clone());
    });
}

fn mock_repos(server: &MockServer, names: &[&str]) {
    let body = Value::Array(
        names
            .iter()
            .map(|name| json!({ "full_name": name }))
            .collect(),
    );
    server.mock(|when, then| {
        when.method(GET).path("/user/repos");
        then.status(200).json_body(body.clone());
    });
}

#[test]
fn integration_live_graphql_run_closes_stale_and_unlabels_closed() {
    let server = MockServer::start();
    let base = server.base_url();
    mock_search(
        &server,
        vec![
            search_item(&base, "acme/app", 1, "open", "2024-03-02T12:00:00Z"),
            search_item(&base, "acme/app", 2, "open", "2024-05-20T08:00:00Z"),
            search_item(&base, "acme/app", 3, "closed", "2024-05-30T08:00:00Z"),
            search_item(&base, "stranger/lib", 9, "open", "2020-01-01T00:00:00Z"),
        ],
    );
    mock_repos(&server, &["acme/app"]);
    let resolve = server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .body_includes("issueOrPullRequest");
        then.status(200).json_body(json!({
            "data": {
                "repository": {
                    "issueOrPullRequest": { "__typename": "Issue", "id": "I_node1" }
                }
            }
        }));
    });
    let close = server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .body_includes("closeIssue")
            .body_includes("I_node1");
        then.status(200).json_body(json!({
            "data": { "closeIssue": { "clientMutationId": null } }
        }));
    });
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/app/issues/1/comments")
            .body_includes("has not seen any activity for 90 days");
        then.status(201).json_body(json!({ "id": 11 }));
    });
    let unlabel_stale = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/acme/app/issues/1/labels/stale");
        then.status(200).json_body(json!([]));
    });
    let unlabel_closed = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/acme/app/issues/3/labels/stale");
        then.status(200).json_body(json!([]));
    });
    let stranger = server.mock(|when, then| {
        when.path_includes("/repos/stranger/lib");
        then.status(500);
    });
    let webhook = server.mock(|when, then| {
        when.method(GET).path("/ping/run");
        then.status(200).body("OK");
    });

    let client = client_for(&server);
    let run_config = config(RawConfig {
        for_real: Some("yes".to_string()),
        webhook: Some(server.url("/ping/run")),
        ..RawConfig::default()
    });
    let closer = closer_for_strategy(&client, run_config.close_strategy());
    let notifier = WebhookNotifier::new(std::time::Duration::from_secs(5)).expect("notifier");
    let services = TriageServices {
        tracker: &client,
        closer: closer.as_ref(),
        notifier: &notifier,
    };

    let report = run_triage(&services, &run_config, fixed_now()).expect("run");

    assert_eq!(report.exit, RunExit::Completed);
    let outcomes: Vec<_> = report
        .issue_reports()
        .map(|issue| (issue.issue.number, issue.age_days, issue.result.clone()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (1, 91, Ok(ActionOutcome::ClosedWithComment)),
            (2, 12, Ok(ActionOutcome::NotYetStale)),
            (3, 2, Ok(ActionOutcome::LabelRemovedFromClosed)),
        ]
    );
    assert_eq!(
        report.verdicts[1].decision,
        RepositoryDecision::ExcludedByOwnership
    );
    assert!(matches!(
        report.notification,
        Some(NotificationOutcome::Delivered { status: 200, .. })
    ));
    resolve.assert_calls(1);
    close.assert_calls(1);
    comment.assert_calls(1);
    unlabel_stale.assert_calls(1);
    unlabel_closed.assert_calls(1);
    stranger.assert_calls(0);
    webhook.assert_calls(1);
}

#[test]
fn integration_dry_run_issues_only_read_requests() {
    let server = MockServer::start();
    let base = server.base_url();
    mock_search(
        &server,
        vec![
            search_item(&base, "acme/app", 1, "open", "2023-01-01T00:00:00Z"),
            search_item(&base, "acme/app", 2, "closed", "2024-05-30T08:00:00Z"),
        ],
    );
    mock_repos(&server, &["acme/app"]);
    let posts = server.mock(|when, then| {
        when.method(POST);
        then.status(500);
    });
    let patches = server.mock(|when, then| {
        when.method(PATCH);
        then.status(500);
    });
    let deletes = server.mock(|when, then| {
        when.method(DELETE);
        then.status(500);
    });
    let webhook = server.mock(|when, then| {
        when.method(GET).path("/ping/run");
        then.status(200);
    });

    let client = client_for(&server);
    let run_config = config(RawConfig {
        webhook: Some(server.url("/ping/run")),
        ..RawConfig::default()
    });
    let closer = closer_for_strategy(&client, run_config.close_strategy());
    let notifier = WebhookNotifier::new(std::time::Duration::from_secs(5)).expect("notifier");
    let services = TriageServices {
        tracker: &client,
        closer: closer.as_ref(),
        notifier: &notifier,
    };

    let report = run_triage(&services, &run_config, fixed_now()).expect("run");

    let outcomes: Vec<_> = report
        .issue_reports()
        .map(|issue| issue.result.clone())
        .collect();
    assert_eq!(
        outcomes,
        vec![
            Ok(ActionOutcome::WouldClose),
            Ok(ActionOutcome::WouldRemoveLabel)
        ]
    );
    posts.assert_calls(0);
    patches.assert_calls(0);
    deletes.assert_calls(0);
    webhook.assert_calls(0);
}

#[test]
fn integration_rest_strategy_requires_collaborator_access() {
    let server = MockServer::start();
    let base = server.base_url();
    mock_search(
        &server,
        vec![
            search_item(&base, "acme/app", 1, "open", "2024-01-01T00:00:00Z"),
            search_item(&base, "acme/docs", 2, "open", "2024-01-01T00:00:00Z"),
        ],
    );
    mock_repos(&server, &["acme/app", "acme/docs"]);
    server.mock(|when, then| {
        when.method(GET).path("/user");
        then.status(200).json_body(json!({ "login": "tidier-bot" }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/app/collaborators/tidier-bot");
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/docs/collaborators/tidier-bot");
        then.status(404);
    });
    let edit = server.mock(|when, then| {
        when.method(PATCH)
            .path("/repos/acme/app/issues/1")
            .body_includes("\"state_reason\":\"not_planned\"");
        then.status(200).json_body(json!({ "number": 1 }));
    });
    let comment = server.mock(|when, then| {
        when.method(POST).path("/repos/acme/app/issues/1/comments");
        then.status(201).json_body(json!({ "id": 5 }));
    });
    let unlabel = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/acme/app/issues/1/labels/stale");
        then.status(200).json_body(json!([]));
    });
    let docs_writes = server.mock(|when, then| {
        when.path_includes("/repos/acme/docs/issues");
        then.status(500);
    });

    let client = client_for(&server);
    let run_config = config(RawConfig {
        for_real: Some("1".to_string()),
        close_strategy: Some("rest".to_string()),
        ..RawConfig::default()
    });
    let closer = closer_for_strategy(&client, run_config.close_strategy());
    let notifier = WebhookNotifier::new(std::time::Duration::from_secs(5)).expect("notifier");
    let services = TriageServices {
        tracker: &client,
        closer: closer.as_ref(),
        notifier: &notifier,
    };

    let report = run_triage(&services, &run_config, fixed_now()).expect("run");

    assert_eq!(report.repositories.len(), 1);
    assert_eq!(
        report.verdicts[1].decision,
        RepositoryDecision::ExcludedByCollaboration
    );
    assert_eq!(report.notification, Some(NotificationOutcome::NotConfigured));
    edit.assert_calls(1);
    comment.assert_calls(1);
    unlabel.assert_calls(1);
    docs_writes.assert_calls(0);
}

#[test]
fn integration_failed_comment_is_isolated_to_its_issue() {
    let server = MockServer::start();
    let base = server.base_url();
    mock_search(
        &server,
        vec![
            search_item(&base, "acme/app", 1, "open", "2024-01-01T00:00:00Z"),
            search_item(&base, "acme/app", 2, "closed", "2024-05-01T00:00:00Z"),
        ],
    );
    mock_repos(&server, &["acme/app"]);
    server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .body_includes("issueOrPullRequest");
        then.status(200).json_body(json!({
            "data": {
                "repository": {
                    "issueOrPullRequest": { "__typename": "Issue", "id": "I_node1" }
                }
            }
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/graphql").body_includes("closeIssue");
        then.status(200).json_body(json!({
            "data": { "closeIssue": { "clientMutationId": null } }
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/repos/acme/app/issues/1/comments");
        then.status(403).body("{\"message\":\"Resource not accessible by integration\"}");
    });
    let unlabel_first = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/acme/app/issues/1/labels/stale");
        then.status(200).json_body(json!([]));
    });
    let unlabel_second = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/acme/app/issues/2/labels/stale");
        then.status(200).json_body(json!([]));
    });

    let client = client_for(&server);
    let run_config = config(RawConfig {
        for_real: Some("1".to_string()),
        ..RawConfig::default()
    });
    let closer = closer_for_strategy(&client, run_config.close_strategy());
    let notifier = WebhookNotifier::new(std::time::Duration::from_secs(5)).expect("notifier");
    let services = TriageServices {
        tracker: &client,
        closer: closer.as_ref(),
        notifier: &notifier,
    };

    let report = run_triage(&services, &run_config, fixed_now()).expect("run");

    assert_eq!(report.failed_issue_count(), 1);
    unlabel_first.assert_calls(0);
    unlabel_second.assert_calls(1);
}
