use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use super::*;
use crate::predictor::{MockClassifierBackend, MockGenerativeBackend};

const TIMEOUT: Duration = Duration::from_secs(30);

fn image() -> EncodedImage {
    EncodedImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
}

fn primary(text: &str) -> PrimaryPredictor {
    PrimaryPredictor::new(
        Arc::new(MockGenerativeBackend::with_text(text)),
        "gemini-2.5-pro",
    )
}

fn secondary(backend: MockClassifierBackend) -> SecondaryPredictor {
    SecondaryPredictor::new(Arc::new(backend))
}

fn to_json(result: &ReconciledResult) -> Value {
    serde_json::to_value(result).unwrap()
}

#[tokio::test]
async fn test_invalid_primary_with_secondary_disabled() {
    let reconciler = Reconciler::new(
        primary(r#"{"validity":"Invalid","confidence":12}"#),
        SecondaryPredictor::disabled(),
        TIMEOUT,
    );

    let result = reconciler.reconcile(&image(), None).await.unwrap();

    assert_eq!(result.validity(), Validity::Invalid);
    assert_eq!(result.confidence(), 12);
    assert_eq!(result.vertex_validity(), None);
    assert_eq!(result.vertex_confidence(), None);
    assert!(!result.models_disagree());

    let body = to_json(&result);
    assert_eq!(body["vertexValidity"], Value::Null);
    assert_eq!(body["vertexConfidence"], Value::Null);
}

#[tokio::test]
async fn test_secondary_never_overrides_headline() {
    let reconciler = Reconciler::new(
        primary(r#"{"validity":"Valid","confidence":55,"denomination":"$10"}"#),
        secondary(MockClassifierBackend::with_label("fake", Some(0.99))),
        TIMEOUT,
    );

    let result = reconciler.reconcile(&image(), None).await.unwrap();

    assert_eq!(result.validity(), Validity::Valid);
    assert_eq!(result.confidence(), 55);
    assert_eq!(result.denomination(), "$10");
    assert_eq!(result.gemini_validity(), Validity::Valid);
    assert_eq!(result.gemini_confidence(), 55);
    assert_eq!(result.vertex_validity(), Some(&ClassifierVerdict::Invalid));
    assert_eq!(result.vertex_confidence(), Some(99));
    assert!(result.models_disagree());
}

#[tokio::test]
async fn test_counterfeit_label_is_reported_side_by_side() {
    let reconciler = Reconciler::new(
        primary(r#"{"validity":"Invalid","confidence":80}"#),
        secondary(MockClassifierBackend::with_label("Counterfeit", Some(0.93))),
        TIMEOUT,
    );

    let body = to_json(&reconciler.reconcile(&image(), None).await.unwrap());

    assert_eq!(body["vertexValidity"], json!("Invalid"));
    assert_eq!(body["vertexConfidence"], json!(93));
    assert_eq!(body["geminiValidity"], json!("Invalid"));
    assert_eq!(body["modelsDisagree"], json!(false));
}

#[tokio::test]
async fn test_secondary_not_found_keeps_primary_fields() {
    let text = r#"{"denomination":"$5","currency":"USD","validity":"Valid","confidence":90,"features":["Portrait"],"printQualityScore":77,"notes":"ok"}"#;
    let with_secondary = Reconciler::new(
        primary(text),
        secondary(MockClassifierBackend::not_found()),
        TIMEOUT,
    );
    let without_secondary = Reconciler::new(primary(text), SecondaryPredictor::disabled(), TIMEOUT);

    let result = with_secondary.reconcile(&image(), None).await.unwrap();
    let baseline = without_secondary.reconcile(&image(), None).await.unwrap();

    assert_eq!(result, baseline);
    assert_eq!(result.vertex_validity(), None);
    assert_eq!(result.features(), ["Portrait".to_string()]);
    assert_eq!(result.print_quality_score(), Some(77));
}

#[tokio::test]
async fn test_primary_failure_is_fatal() {
    let reconciler = Reconciler::new(
        PrimaryPredictor::new(
            Arc::new(MockGenerativeBackend::failing("quota exceeded")),
            "gemini-2.5-pro",
        ),
        secondary(MockClassifierBackend::with_label("real", Some(0.9))),
        TIMEOUT,
    );

    let err = reconciler.reconcile(&image(), None).await.unwrap_err();
    assert!(matches!(err, PredictorError::Transport(_)));
}

#[tokio::test]
async fn test_unknown_verdict_counts_as_disagreement() {
    let reconciler = Reconciler::new(
        primary(r#"{"validity":"Valid","confidence":70}"#),
        secondary(MockClassifierBackend::with_label("damaged", None)),
        TIMEOUT,
    );

    let result = reconciler.reconcile(&image(), None).await.unwrap();

    assert_eq!(
        result.vertex_validity(),
        Some(&ClassifierVerdict::Other("DAMAGED".to_string()))
    );
    assert_eq!(result.vertex_confidence(), None);
    assert!(result.models_disagree());
}

#[tokio::test(start_paused = true)]
async fn test_slow_secondary_is_dropped_at_deadline() {
    let classifier = Arc::new(
        MockClassifierBackend::with_label("real", Some(0.9)).with_delay(Duration::from_secs(60)),
    );
    let reconciler = Reconciler::new(
        primary(r#"{"validity":"Valid","confidence":70}"#),
        SecondaryPredictor::new(classifier.clone()),
        Duration::from_secs(5),
    );

    let result = reconciler.reconcile(&image(), None).await.unwrap();

    assert_eq!(classifier.call_count(), 1);
    assert_eq!(result.vertex_validity(), None);
    assert_eq!(result.confidence(), 70);
}

#[tokio::test(start_paused = true)]
async fn test_slow_primary_times_out() {
    let reconciler = Reconciler::new(
        PrimaryPredictor::new(
            Arc::new(
                MockGenerativeBackend::with_text(r#"{"validity":"Valid"}"#)
                    .with_delay(Duration::from_secs(60)),
            ),
            "gemini-2.5-pro",
        ),
        SecondaryPredictor::disabled(),
        Duration::from_secs(5),
    );

    let err = reconciler.reconcile(&image(), None).await.unwrap_err();
    assert!(matches!(err, PredictorError::Timeout(d) if d == Duration::from_secs(5)));
}

#[tokio::test]
async fn test_both_predictors_are_called_once() {
    let generative = Arc::new(MockGenerativeBackend::with_text(r#"{"validity":"Valid"}"#));
    let classifier = Arc::new(MockClassifierBackend::with_label("real", Some(0.8)));
    let reconciler = Reconciler::new(
        PrimaryPredictor::new(generative.clone(), "gemini-2.5-pro"),
        SecondaryPredictor::new(classifier.clone()),
        TIMEOUT,
    );

    reconciler
        .reconcile(&image(), Some("gemini-2.5-flash"))
        .await
        .unwrap();

    assert_eq!(generative.requested_models(), vec!["gemini-2.5-flash"]);
    assert_eq!(classifier.call_count(), 1);
}
