use adsnap::{
    LifestyleTextParams, Operation, PackshotParams, PlacementParams, PollConfig, ProductOptions,
    Session, StudioClient, StudioConfig, StudioError,
};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const API_KEY: &str = "test-key";

fn client(server: &mockito::Server) -> StudioClient {
    let config = StudioConfig::new()
        .with_api_key(API_KEY)
        .with_base_url(format!("{}/v1", server.url()))
        .with_timeouts(Duration::from_secs(5), Duration::from_secs(2))
        .with_poll(
            PollConfig::new()
                .with_attempts(2)
                .with_interval(Duration::from_millis(10)),
        );
    StudioClient::new(config).unwrap()
}

fn packshot() -> Operation {
    Operation::Packshot(PackshotParams {
        image: b"fake-image".to_vec(),
        background_color: "#ffffff".into(),
        options: ProductOptions::default(),
    })
}

fn lifestyle(num_results: u32) -> Operation {
    Operation::LifestyleByText(LifestyleTextParams {
        image: b"fake-image".to_vec(),
        scene_description: "a marble kitchen counter".into(),
        placement: PlacementParams {
            placement_type: "original".into(),
            ..Default::default()
        },
        num_results,
        sync: false,
        fast: true,
        optimize_description: true,
        original_quality: false,
        exclude_elements: None,
        options: ProductOptions::default(),
    })
}

#[tokio::test]
async fn test_sync_packshot_and_download() {
    let mut server = mockito::Server::new_async().await;
    let result_url = format!("{}/out/packshot.png", server.url());

    let dispatch = server
        .mock("POST", "/v1/product/packshot")
        .match_header("api_token", API_KEY)
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({"background_color": "#FFFFFF"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"result_url": result_url}).to_string())
        .create_async()
        .await;
    let fetch = server
        .mock("GET", "/out/packshot.png")
        .with_status(200)
        .with_body(b"png-bytes".as_slice())
        .create_async()
        .await;

    let client = client(&server);
    let request = client.assemble(&packshot()).unwrap();
    let mut session = Session::new();

    let results = client
        .submit(&request, &mut session, &CancellationToken::new())
        .await
        .unwrap();
    dispatch.assert_async().await;

    let primary = results.primary().unwrap();
    assert_eq!(primary.as_url(), Some(result_url.as_str()));
    assert_eq!(session.current_result(), Some(primary));

    let bytes = client.download(primary).await.unwrap();
    assert_eq!(bytes, b"png-bytes");
    fetch.assert_async().await;
}

#[tokio::test]
async fn test_async_lifestyle_polls_until_ready() {
    let mut server = mockito::Server::new_async().await;
    let first = format!("{}/out/1.png", server.url());
    let second = format!("{}/out/2.png", server.url());

    server
        .mock("POST", "/v1/product/lifestyle_shot_by_text")
        .with_status(200)
        .with_body(json!({"result": [{"urls": [first]}, [second]]}).to_string())
        .create_async()
        .await;
    let head_first = server
        .mock("HEAD", "/out/1.png")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("HEAD", "/out/2.png")
        .with_status(200)
        .create_async()
        .await;

    let client = client(&server);
    let request = client.assemble(&lifestyle(2)).unwrap();
    let mut session = Session::new();

    let results = client
        .submit(&request, &mut session, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.primary().and_then(|r| r.as_url()), Some(first.as_str()));
    assert!(!session.has_unresolved());
    // Ready after the first round; never probed again.
    head_first.assert_async().await;
}

#[tokio::test]
async fn test_expired_jobs_survive_for_recheck() {
    let mut server = mockito::Server::new_async().await;
    let late = format!("{}/out/late.png", server.url());

    server
        .mock("POST", "/v1/product/lifestyle_shot_by_text")
        .with_status(200)
        .with_body(json!({"urls": [late]}).to_string())
        .create_async()
        .await;
    let not_yet = server
        .mock("HEAD", "/out/late.png")
        .with_status(404)
        .expect(2)
        .create_async()
        .await;

    let client = client(&server);
    let request = client.assemble(&lifestyle(1)).unwrap();
    let mut session = Session::new();
    let cancel = CancellationToken::new();

    let err = client.submit(&request, &mut session, &cancel).await.unwrap_err();
    assert!(matches!(err, StudioError::PollingExpired { pending: 1 }));
    assert_eq!(session.unresolved(), &[late.clone()]);
    not_yet.assert_async().await;
    not_yet.remove_async().await;

    server
        .mock("HEAD", "/out/late.png")
        .with_status(200)
        .create_async()
        .await;
    let results = client.recheck(&mut session, &cancel).await.unwrap();
    assert_eq!(results.primary().and_then(|r| r.as_url()), Some(late.as_str()));
    assert!(!session.has_unresolved());
}

#[tokio::test]
async fn test_content_moderation_rejection() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/product/packshot")
        .with_status(422)
        .with_body("content moderation failed")
        .create_async()
        .await;

    let client = client(&server);
    let request = client.assemble(&packshot()).unwrap();
    let err = client
        .submit(&request, &mut Session::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_content_moderation());
    assert!(err.to_string().contains("content moderation failed"));
}

#[tokio::test]
async fn test_unrecognized_response_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/product/packshot")
        .with_status(200)
        .with_body(json!({"status": "ok"}).to_string())
        .create_async()
        .await;

    let client = client(&server);
    let request = client.assemble(&packshot()).unwrap();
    let err = client
        .submit(&request, &mut Session::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::MalformedResponse(_)));
}

#[test]
fn test_missing_api_key_is_config_error() {
    let err = StudioClient::new(StudioConfig::default()).err();
    assert!(matches!(err, Some(StudioError::ConfigError(_))));
}

#[tokio::test]
async fn test_enhanced_prompt_becomes_scene_description() {
    let mut server = mockito::Server::new_async().await;
    let enhancer = server
        .mock("POST", "/v1/prompt_enhancer")
        .match_header("api_token", API_KEY)
        .match_body(Matcher::PartialJson(json!({"prompt": "kitchen"})))
        .with_status(200)
        .with_body(json!({"prompt variations": "a sunlit marble kitchen counter"}).to_string())
        .create_async()
        .await;

    let client = client(&server);
    let mut session = Session::new();
    session.set_prompt("  kitchen ");
    let enhanced = client.enhance_prompt(&mut session).await.unwrap();
    assert_eq!(enhanced, "a sunlit marble kitchen counter");
    enhancer.assert_async().await;

    let request = client.assemble_for(&lifestyle(1), &session).unwrap();
    assert_eq!(
        request.param("scene_description"),
        Some(&json!("a sunlit marble kitchen counter"))
    );
}
