//! Readiness polling against a mocked customization REST service.

use std::time::Duration;

use serde_json::json;
use watson_speech::core::customization::CustomizationStatus;
use watson_speech::core::stt::ibm_watson::AuthHeader;
use watson_speech::{
    ApiError, CustomizationApi, RestCustomizationClient, RetrySpec, WaitError,
    wait_for_corpora_analyzed, wait_for_customization_ready,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_spec(max_attempts: u32) -> RetrySpec {
    RetrySpec::new(Duration::from_millis(10), max_attempts)
}

fn client(server: &MockServer) -> RestCustomizationClient {
    RestCustomizationClient::new(&server.uri(), Some(AuthHeader::bearer("test-token"))).unwrap()
}

fn corpora_body(status: &str) -> serde_json::Value {
    json!({
        "corpora": [
            {"name": "faq", "status": status, "total_words": 1200, "out_of_vocabulary_words": 3},
            {"name": "manuals", "status": "analyzed", "total_words": 800, "out_of_vocabulary_words": 0}
        ]
    })
}

#[tokio::test]
async fn test_corpora_analyzed_after_processing() {
    let server = MockServer::start().await;

    // Pre-check plus two polls see processing
    Mock::given(method("GET"))
        .and(path("/v1/customizations/cust-1/corpora"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(corpora_body("being_processed")))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/customizations/cust-1/corpora"))
        .respond_with(ResponseTemplate::new(200).set_body_json(corpora_body("analyzed")))
        .expect(1)
        .mount(&server)
        .await;

    let corpora = wait_for_corpora_analyzed(&client(&server), "cust-1", &fast_spec(10))
        .await
        .unwrap();

    assert_eq!(corpora.len(), 2);
    assert!(corpora.iter().all(|c| c.status == "analyzed"));
    assert_eq!(corpora[0].total_words, Some(1200));
}

#[tokio::test]
async fn test_corpora_wait_without_corpora_fails_fast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/customizations/empty/corpora"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"corpora": []})))
        .expect(1)
        .mount(&server)
        .await;

    let err = wait_for_corpora_analyzed(&client(&server), "empty", &fast_spec(10))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WaitError::NoCorpora {
            customization_id: "empty".to_string()
        }
    );
}

#[tokio::test]
async fn test_corpora_wait_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/customizations/slow/corpora"))
        .respond_with(ResponseTemplate::new(200).set_body_json(corpora_body("being_processed")))
        .expect(4)
        .mount(&server)
        .await;

    let err = wait_for_corpora_analyzed(&client(&server), "slow", &fast_spec(3))
        .await
        .unwrap_err();

    match err {
        WaitError::Timeout {
            attempts,
            interval_ms,
            message,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(interval_ms, 10);
            assert!(message.contains("faq"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_customization_ready_after_training() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/customizations/cust-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customization_id": "cust-2",
            "status": "training",
            "progress": 40,
            "base_model_name": "en-US_BroadbandModel"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/customizations/cust-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customization_id": "cust-2",
            "status": "available",
            "progress": 100,
            "base_model_name": "en-US_BroadbandModel",
            "versions": ["en-US_BroadbandModel.v2020-01-16"]
        })))
        .mount(&server)
        .await;

    let model = wait_for_customization_ready(&client(&server), "cust-2", &fast_spec(10))
        .await
        .unwrap();

    assert_eq!(model.status(), CustomizationStatus::Available);
    assert_eq!(model.progress, Some(100));
    assert!(model.extra.contains_key("versions"));
}

#[tokio::test]
async fn test_customization_training_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/customizations/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customization_id": "broken",
            "status": "failed",
            "warnings": "Corpus 'faq' contains no valid words"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = wait_for_customization_ready(&client(&server), "broken", &fast_spec(10))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WaitError::TrainingFailed {
            customization_id: "broken".to_string()
        }
    );
}

#[tokio::test]
async fn test_service_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/customizations/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 404,
            "error": "Model not found: missing"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let api = client(&server);
    let direct = api.get_language_model("missing").await.unwrap_err();
    assert_eq!(direct.code(), Some(404));

    let err = wait_for_customization_ready(&api, "missing", &fast_spec(5))
        .await
        .unwrap_err();
    match err {
        WaitError::Api(ApiError::Http {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 404);
            assert_eq!(code, Some(404));
            assert_eq!(message, "Model not found: missing");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}
