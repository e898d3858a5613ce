//! End-to-end classification tests against hand-built model bundles

mod common;

use common::{bundle, bundle_with_failing, constant_bundle, input_dim, vectorizer, CORPUS};
use reviewguard_classifiers::explainer::GENUINE_REASON;
use reviewguard_classifiers::features::index;
use reviewguard_classifiers::{
    DetectorConfig, EmbeddingProvider, FeatureVector, ModelBundleArtifact, ReviewClassifier,
    STATISTICAL_DIM,
};
use reviewguard_core::{BatchSummary, Error, ModelKind, RawReview, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

const SPAMMY: &str = "Amazing product! Highly recommend! Buy now!!!";
const MEASURED: &str = "Shipping was a bit slow but the product works as described.";

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn ready_classifier() -> ReviewClassifier {
    let classifier = ReviewClassifier::new(DetectorConfig::default()).unwrap();
    classifier.load(bundle("fixture-1")).unwrap();
    classifier
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_spammy_review_scores_high() {
    let classifier = ready_classifier();
    let bundle = classifier.current_bundle().unwrap();

    let features = classifier.featurize(&bundle, SPAMMY, Some(5.0)).unwrap();
    let stats = features.statistical();
    assert!(stats[index::SPAM_PHRASE_COUNT] >= 2.0);
    assert_eq!(stats[index::EXCLAMATION_COUNT], 5.0);

    let verdict = classifier.classify_review(SPAMMY, Some(5.0), None).unwrap();

    let forest = (0.9 + 0.8) / 2.0;
    let boosted = sigmoid(2.0);
    let margin = sigmoid(3.0 + 2.5 - 1.0);
    assert_close(verdict.per_model_probabilities["tree_ensemble"], forest);
    assert_close(verdict.per_model_probabilities["boosted_trees"], boosted);
    assert_close(verdict.per_model_probabilities["margin"], margin);
    assert_close(
        verdict.fake_probability,
        0.40 * forest + 0.35 * boosted + 0.25 * margin,
    );

    assert!(verdict.is_fake);
    assert_eq!(verdict.reasons[0], "Contains common spam phrases");
    assert!(verdict
        .reasons
        .iter()
        .any(|r| r == "Excessive exclamation marks"));
}

#[test]
fn test_measured_review_scores_genuine() {
    let classifier = ready_classifier();
    let bundle = classifier.current_bundle().unwrap();

    let features = classifier.featurize(&bundle, MEASURED, Some(3.0)).unwrap();
    let stats = features.statistical();
    assert_eq!(stats[index::SPAM_PHRASE_COUNT], 0.0);
    assert!(stats[index::SENTIMENT_RATING_MISMATCH] < 0.5);

    let verdict = classifier.classify_review(MEASURED, Some(3.0), None).unwrap();
    let expected = 0.40 * 0.15 + 0.35 * sigmoid(-2.0) + 0.25 * sigmoid(-1.0);

    assert_close(verdict.fake_probability, expected);
    assert!(!verdict.is_fake);
    assert_eq!(verdict.label(), "genuine");
    assert_eq!(verdict.reasons, vec![GENUINE_REASON.to_string()]);
}

#[test]
fn test_spammy_outranks_measured() {
    let classifier = ready_classifier();
    let spammy = classifier.classify_review(SPAMMY, Some(5.0), None).unwrap();
    let measured = classifier.classify_review(MEASURED, Some(3.0), None).unwrap();

    for kind in ModelKind::ALL {
        assert!(
            spammy.per_model_probabilities[kind.as_str()]
                > measured.per_model_probabilities[kind.as_str()]
        );
    }
}

#[test]
fn test_mismatched_vector_is_rejected() {
    let classifier = ready_classifier();
    let dim = input_dim(&vectorizer());

    for width in [dim - 1, dim + 1] {
        let features = FeatureVector::from_values(vec![0.0; width]).unwrap();
        assert!(matches!(
            classifier.predict(&features),
            Err(Error::FeatureDimensionMismatch { expected, actual })
                if expected == dim && actual == width
        ));
    }

    let features = FeatureVector::from_values(vec![0.0; dim]).unwrap();
    assert!(classifier.predict(&features).is_ok());
}

struct OverwideEmbedder;

impl EmbeddingProvider for OverwideEmbedder {
    fn dimension(&self) -> usize {
        4
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1; 6])
    }
}

#[test]
fn test_embedding_drift_fails_classification() {
    let config = DetectorConfig {
        use_dense_embedding: true,
        ..Default::default()
    };
    let classifier = ReviewClassifier::new(config)
        .unwrap()
        .with_embedder(Arc::new(OverwideEmbedder));

    let mut artifact = common::artifact("embedded");
    let dim = input_dim(&artifact.vectorizer) + 4;
    artifact.embedding_dim = Some(4);
    artifact.tree_ensemble = reviewguard_classifiers::models::RandomForestModel::new(
        dim,
        vec![reviewguard_classifiers::models::DecisionTree::constant(0.5)],
    )
    .unwrap();
    artifact.boosted_trees =
        reviewguard_classifiers::models::GradientBoostedModel::new(dim, 0.0, Vec::new()).unwrap();
    artifact.margin = reviewguard_classifiers::models::MarginModel::linear(
        vec![0.0; dim],
        0.0,
        Default::default(),
    )
    .unwrap();

    classifier
        .load(artifact.into_bundle(Default::default()).unwrap())
        .unwrap();

    assert!(matches!(
        classifier.classify_review("fine phone", None, None),
        Err(Error::FeatureDimensionMismatch { expected: 4, actual: 6 })
    ));
}

#[test]
fn test_embedding_enabled_against_plain_bundle() {
    let config = DetectorConfig {
        use_dense_embedding: true,
        ..Default::default()
    };
    let classifier = ReviewClassifier::new(config)
        .unwrap()
        .with_embedder(Arc::new(OverwideEmbedder));
    let plain = bundle("plain");
    let dim = plain.input_dim();

    assert!(matches!(
        classifier.load(plain),
        Err(Error::FeatureDimensionMismatch { expected, actual })
            if expected == dim && actual == dim + 4
    ));

    // the rejected bundle never serves
    assert!(matches!(
        classifier.classify_review(SPAMMY, Some(5.0), None),
        Err(Error::ModelNotLoaded)
    ));
}

#[test]
fn test_failing_member_fails_the_prediction() {
    for failing in ModelKind::ALL {
        let classifier = ReviewClassifier::new(DetectorConfig::default()).unwrap();
        classifier.load(bundle_with_failing(failing)).unwrap();

        match classifier.classify_review(SPAMMY, Some(5.0), None) {
            Err(Error::ModelScoring { model, .. }) => assert_eq!(model, failing.as_str()),
            other => panic!("expected scoring error for {}, got {:?}", failing, other),
        }
    }
}

#[test]
fn test_classification_is_idempotent() {
    let classifier = ready_classifier();
    let first = classifier.classify_review(SPAMMY, Some(5.0), None).unwrap();
    let second = classifier.classify_review(SPAMMY, Some(5.0), None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.fake_probability.to_bits(), second.fake_probability.to_bits());
}

#[test]
fn test_empty_text_is_defined() {
    let classifier = ready_classifier();
    let bundle = classifier.current_bundle().unwrap();

    let features = classifier.featurize(&bundle, "", None).unwrap();
    assert!(features.statistical().iter().all(|v| *v == 0.0));
    assert!(features.lexical().iter().all(|v| *v == 0.0));

    let verdict = classifier.classify_review("", None, None).unwrap();
    assert!((0.0..=1.0).contains(&verdict.fake_probability));
    assert_eq!(verdict.confidence, 2.0 * (verdict.fake_probability - 0.5).abs());
    assert_eq!(verdict.reasons, vec![GENUINE_REASON.to_string()]);
}

#[test]
fn test_metadata_does_not_change_verdict() {
    let classifier = ready_classifier();
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), serde_json::json!("marketplace"));

    let with = classifier
        .classify_review(MEASURED, Some(3.0), Some(&metadata))
        .unwrap();
    let without = classifier.classify_review(MEASURED, Some(3.0), None).unwrap();
    assert_eq!(with, without);
}

#[test]
fn test_not_loaded() {
    let classifier = ReviewClassifier::new(DetectorConfig::default()).unwrap();
    assert!(matches!(
        classifier.classify(&RawReview::new("hello")),
        Err(Error::ModelNotLoaded)
    ));

    let features = FeatureVector::from_values(vec![0.0; STATISTICAL_DIM]).unwrap();
    assert!(matches!(
        classifier.predict(&features),
        Err(Error::ModelNotLoaded)
    ));

    let results = classifier.classify_batch(&[RawReview::new("a"), RawReview::new("b")]);
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(Error::ModelNotLoaded))));
}

#[test]
fn test_invalid_utf8_is_an_encoding_error() {
    let classifier = ready_classifier();
    assert!(matches!(
        classifier.classify_bytes(&[b'o', b'k', 0xff, b'!'], None),
        Err(Error::Encoding { offset: 2, .. })
    ));

    let from_bytes = classifier
        .classify_bytes(MEASURED.as_bytes(), Some(3.0))
        .unwrap();
    let from_str = classifier.classify_review(MEASURED, Some(3.0), None).unwrap();
    assert_eq!(from_bytes, from_str);
}

#[test]
fn test_batch_is_index_aligned() {
    let classifier = ready_classifier();
    let reviews: Vec<RawReview> = vec![
        RawReview::new(SPAMMY).with_rating(5.0),
        RawReview::new(MEASURED).with_rating(3.0),
        RawReview::new(""),
        RawReview::new(SPAMMY).with_rating(1.0),
    ];

    let results = classifier.classify_batch(&reviews);
    assert_eq!(results.len(), reviews.len());
    for (review, result) in reviews.iter().zip(&results) {
        assert_eq!(result.as_ref().unwrap(), &classifier.classify(review).unwrap());
    }

    let verdicts: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
    let summary = BatchSummary::from_results(&verdicts);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.fake, 2);
}

#[test]
fn test_reload_swaps_bundle() {
    let classifier = ReviewClassifier::new(DetectorConfig::default()).unwrap();
    classifier.load(constant_bundle("low", 0.2)).unwrap();
    let before = classifier.classify_review(SPAMMY, None, None).unwrap();
    assert_close(before.fake_probability, 0.2);
    assert!(!before.is_fake);

    let previous = classifier.reload(constant_bundle("high", 0.8)).unwrap();
    assert_eq!(previous.unwrap().version(), "low");

    let after = classifier.classify_review(SPAMMY, None, None).unwrap();
    assert_close(after.fake_probability, 0.8);
    assert!(after.is_fake);
}

#[test]
fn test_concurrent_reload_sees_consistent_bundles() {
    let classifier = ReviewClassifier::new(DetectorConfig::default()).unwrap();
    classifier.load(constant_bundle("low", 0.2)).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let verdict = classifier.classify_review(MEASURED, None, None).unwrap();
                    let scores: Vec<f64> =
                        verdict.per_model_probabilities.values().copied().collect();
                    // all members of one bundle agree, so a mixed snapshot would show up here
                    assert!(scores.iter().all(|s| *s == scores[0]));
                }
            });
        }

        scope.spawn(|| {
            for i in 0..20 {
                let score = if i % 2 == 0 { 0.8 } else { 0.2 };
                classifier
                    .reload(constant_bundle(&format!("v{}", i), score))
                    .unwrap();
            }
        });
    });
}

#[test]
fn test_artifact_file_load_uses_artifact_weights() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.json");

    let mut artifact = common::artifact("from-disk");
    artifact.weights = Some(reviewguard_classifiers::EnsembleWeights::new(0.2, 0.3, 0.5).unwrap());
    artifact.save(&path).unwrap();

    let classifier = ReviewClassifier::new(DetectorConfig::default()).unwrap();
    assert!(classifier.load_artifact_file(&path).unwrap().is_none());

    let bundle = classifier.current_bundle().unwrap();
    assert_eq!(bundle.version(), "from-disk");
    assert_eq!(bundle.weights().margin, 0.5);

    let reread = ModelBundleArtifact::from_file(&path).unwrap();
    assert_eq!(reread.vectorizer.num_features(), vectorizer().num_features());
}

#[test]
fn test_classifier_from_config_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("detector.yaml");
    std::fs::write(&path, "threshold: 0.1\nmax_reasons: 1\n")?;

    let classifier = ReviewClassifier::from_config_file(&path)?;
    classifier.load(bundle("fixture-1"))?;

    let verdict = classifier.classify_review(MEASURED, Some(3.0), None)?;
    assert!(verdict.is_fake);
    assert_eq!(verdict.reasons.len(), 1);
    assert!(verdict.reasons[0].starts_with("Statistical pattern matches fake reviews"));

    let spammy = classifier.classify_review(SPAMMY, Some(5.0), None)?;
    assert_eq!(spammy.reasons, vec!["Contains common spam phrases".to_string()]);
    Ok(())
}

#[test]
fn test_near_duplicates_with_and_without_bundle() {
    let texts = [
        (1, "Great phone, fast shipping and a bright screen."),
        (2, "great phone fast shipping and a bright screen"),
        (3, "Battery died after two days, very disappointed."),
    ];

    let classifier = ReviewClassifier::new(DetectorConfig::default()).unwrap();
    let pairs = classifier.near_duplicates(&texts).unwrap();
    assert_eq!(pairs.into_iter().collect::<Vec<_>>(), vec![(1, 2)]);

    classifier.load(bundle("fixture-1")).unwrap();
    let pairs = classifier.near_duplicates(&texts).unwrap();
    assert_eq!(pairs.into_iter().collect::<Vec<_>>(), vec![(1, 2)]);

    let disjoint = [(1, CORPUS[0]), (2, CORPUS[1])];
    assert!(classifier.near_duplicates(&disjoint).unwrap().is_empty());
}

#[test]
fn test_evaluation_report() {
    let classifier = ready_classifier();
    let labeled = vec![
        (RawReview::new(SPAMMY).with_rating(5.0), true),
        (RawReview::new("Best product ever!!!! Five stars, must buy"), true),
        (RawReview::new(MEASURED).with_rating(3.0), false),
        (RawReview::new(CORPUS[1]).with_rating(1.0), false),
    ];

    let report = classifier.evaluate(&labeled).unwrap();
    assert_eq!(report.ensemble.support, 4);
    assert_eq!(report.ensemble.accuracy, 1.0);
    assert_eq!(report.ensemble.roc_auc, Some(1.0));
    assert_eq!(report.per_model.len(), 3);
    assert!(report.per_model.contains_key("margin"));

    assert!(matches!(classifier.evaluate(&[]), Err(Error::Config(_))));
}
