//! Web API session against a mocked DSM endpoint

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use synotrigger::core::{Dispatcher, NasSession, TestCatalog};
use synotrigger::models::{Credentials, NasTarget, SecureString, Username};
use synotrigger::platform::{WebApiOptions, WebApiSession};
use synotrigger::utils::SessionError;

fn target(server: &ServerGuard) -> NasTarget {
    let address = server.socket_address();
    NasTarget {
        host: address.ip().to_string(),
        port: address.port(),
        secure: false,
    }
}

fn credentials() -> Credentials {
    Credentials::new(Username::new("admin").unwrap(), SecureString::new("s3cret"))
}

async fn mock_login(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/webapi/auth.cgi")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("api".into(), "SYNO.API.Auth".into()),
            Matcher::UrlEncoded("method".into(), "login".into()),
            Matcher::UrlEncoded("account".into(), "admin".into()),
            Matcher::UrlEncoded("passwd".into(), "s3cret".into()),
            Matcher::UrlEncoded("format".into(), "sid".into()),
        ]))
        .with_status(200)
        .with_body(json!({ "success": true, "data": { "sid": "SID123" } }).to_string())
        .create_async()
        .await
}

async fn login(server: &ServerGuard) -> WebApiSession {
    WebApiSession::login(&target(server), &credentials(), &WebApiOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_login_success() {
    let mut server = Server::new_async().await;
    let mock = mock_login(&mut server).await;

    let session = login(&server).await;
    assert_eq!(session.host(), "127.0.0.1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_login_sends_otp_code() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/webapi/auth.cgi")
        .match_body(Matcher::UrlEncoded("otp_code".into(), "123456".into()))
        .with_body(json!({ "success": true, "data": { "sid": "SID123" } }).to_string())
        .create_async()
        .await;

    let options = WebApiOptions {
        verify_tls: false,
        otp_code: Some("123456".into()),
    };
    WebApiSession::login(&target(&server), &credentials(), &options)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_login_bad_password() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/webapi/auth.cgi")
        .with_body(json!({ "success": false, "error": { "code": 400 } }).to_string())
        .create_async()
        .await;

    let err = WebApiSession::login(&target(&server), &credentials(), &WebApiOptions::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::Authentication(_)));
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_login_two_factor_required() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/webapi/auth.cgi")
        .with_body(json!({ "success": false, "error": { "code": 403 } }).to_string())
        .create_async()
        .await;

    let err = WebApiSession::login(&target(&server), &credentials(), &WebApiOptions::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::TwoFactorRequired));
}

#[tokio::test]
async fn test_login_server_error_is_transport_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/webapi/auth.cgi")
        .with_status(500)
        .create_async()
        .await;

    let err = WebApiSession::login(&target(&server), &credentials(), &WebApiOptions::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::Transport(_)));
}

#[tokio::test]
async fn test_dispatch_push_test_with_sid() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let push = server
        .mock("POST", "/webapi/entry.cgi")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("api".into(), "SYNO.Core.Notification.Push".into()),
            Matcher::UrlEncoded("method".into(), "send_test".into()),
            Matcher::UrlEncoded("version".into(), "1".into()),
            Matcher::UrlEncoded("_sid".into(), "SID123".into()),
        ]))
        .with_body(json!({ "success": true }).to_string())
        .create_async()
        .await;

    let session = login(&server).await;
    let catalog = TestCatalog::builtin().unwrap();
    let result = Dispatcher::new(&session)
        .dispatch(catalog.get("push").unwrap())
        .await;

    assert!(result.success, "{}", result.output);
    assert_eq!(result.name, "push");
    push.assert_async().await;
}

#[tokio::test]
async fn test_dispatch_reports_api_and_http_failures() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", "/webapi/entry.cgi")
        .match_body(Matcher::UrlEncoded(
            "api".into(),
            "SYNO.Core.Notification.Mail".into(),
        ))
        .with_body(json!({ "success": false, "error": { "code": 102 } }).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/webapi/entry.cgi")
        .match_body(Matcher::UrlEncoded(
            "api".into(),
            "SYNO.Core.Notification.SMS".into(),
        ))
        .with_status(502)
        .create_async()
        .await;

    let session = login(&server).await;
    let catalog = TestCatalog::builtin().unwrap();
    let dispatcher = Dispatcher::new(&session);

    let mail = dispatcher.dispatch(catalog.get("mail").unwrap()).await;
    assert!(!mail.success);
    assert!(mail.output.contains("error 102"), "{}", mail.output);

    let sms = dispatcher.dispatch(catalog.get("sms").unwrap()).await;
    assert!(!sms.success);
    assert!(sms.output.contains("HTTP 502"), "{}", sms.output);
}

#[tokio::test]
async fn test_discover_continues_past_failed_listing() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", "/webapi/query.cgi")
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("POST", "/webapi/entry.cgi")
        .match_body(Matcher::UrlEncoded("api".into(), "SYNO.Backup.Task".into()))
        .with_body(json!({ "success": true, "data": { "tasks": [] } }).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/webapi/entry.cgi")
        .match_body(Matcher::Regex("api=SYNO.Core.(Notification|DSMNotify|System)".into()))
        .with_body(json!({ "success": false, "error": { "code": 102 } }).to_string())
        .create_async()
        .await;

    let session = login(&server).await;
    let catalog = TestCatalog::builtin().unwrap();
    let report = Dispatcher::new(&session)
        .discover(catalog.discover_plan())
        .await;

    assert!(report.listing_error.is_some());
    assert_eq!(report.probes.len(), catalog.discover_plan().candidates.len());
    let available: Vec<&str> = report.available().map(|p| p.api.as_str()).collect();
    assert_eq!(available, vec!["SYNO.Backup.Task"]);
}

#[tokio::test]
async fn test_discover_lists_matching_apis() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", "/webapi/query.cgi")
        .match_body(Matcher::UrlEncoded("api".into(), "SYNO.API.Info".into()))
        .with_body(
            json!({
                "success": true,
                "data": {
                    "SYNO.Core.Notification.Push": { "path": "entry.cgi", "minVersion": 1, "maxVersion": 1 },
                    "SYNO.FileStation.List": { "path": "entry.cgi", "minVersion": 1, "maxVersion": 2 },
                    "SYNO.Core.Notification.Mail": { "path": "entry.cgi", "minVersion": 1, "maxVersion": 3 }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let session = login(&server).await;
    let catalog = TestCatalog::builtin().unwrap();
    let report = Dispatcher::new(&session)
        .discover(catalog.discover_plan())
        .await;

    let names: Vec<&str> = report.advertised.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["SYNO.Core.Notification.Mail", "SYNO.Core.Notification.Push"]
    );
    // Probes hit no mock and fail, but every candidate is still reported
    assert_eq!(report.probes.len(), catalog.discover_plan().candidates.len());
    assert_eq!(report.available().count(), 0);
}

#[tokio::test]
async fn test_close_logs_out() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let logout = server
        .mock("POST", "/webapi/auth.cgi")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("method".into(), "logout".into()),
            Matcher::UrlEncoded("_sid".into(), "SID123".into()),
        ]))
        .with_body(json!({ "success": true }).to_string())
        .create_async()
        .await;

    let session = login(&server).await;
    session.close().await.unwrap();
    logout.assert_async().await;
}

#[tokio::test]
async fn test_webhook_uses_listed_provider() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let listing = server
        .mock("POST", "/webapi/entry.cgi")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "api".into(),
                "SYNO.Core.Notification.Push.Webhook.Provider".into(),
            ),
            Matcher::UrlEncoded("method".into(), "list".into()),
            Matcher::UrlEncoded("version".into(), "2".into()),
        ]))
        .with_body(
            json!({
                "success": true,
                "data": { "list": [ { "profile_id": 3, "target_name": "n8n" } ] }
            })
            .to_string(),
        )
        .create_async()
        .await;
    let send = server
        .mock("POST", "/webapi/entry.cgi")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("method".into(), "send_test".into()),
            Matcher::UrlEncoded("profile_id".into(), "3".into()),
        ]))
        .with_body(json!({ "success": true }).to_string())
        .expect(1)
        .create_async()
        .await;

    let session = login(&server).await;
    let catalog = TestCatalog::builtin().unwrap();
    let summary = Dispatcher::new(&session)
        .run_one(catalog.get("webhook").unwrap())
        .await;

    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.results[0].name, "webhook:3");
    assert!(summary.results[0].success, "{}", summary.results[0].output);
    listing.assert_async().await;
    send.assert_async().await;
}

#[tokio::test]
async fn test_vendor_error_detail_reaches_result() {
    let body = json!({
        "success": false,
        "error": { "code": 3001, "errors": { "reason": "push service not paired" } }
    })
    .to_string();

    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", "/webapi/entry.cgi")
        .match_body(Matcher::UrlEncoded(
            "api".into(),
            "SYNO.Core.Notification.Push".into(),
        ))
        .with_body(&body)
        .create_async()
        .await;

    let session = login(&server).await;
    let catalog = TestCatalog::builtin().unwrap();
    let result = Dispatcher::new(&session)
        .dispatch(catalog.get("push").unwrap())
        .await;

    assert!(!result.success);
    assert!(result.output.contains("not paired"), "{}", result.output);
    assert_eq!(result.raw, body);
}
