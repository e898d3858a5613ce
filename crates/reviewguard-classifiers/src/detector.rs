//! Review classification facade
//!
//! [`ReviewClassifier`] owns the stateless pipeline stages (normalizer,
//! extractor, explainer) and one swappable [`ModelBundle`]. Every call takes
//! a single snapshot of the bundle, so a reload that lands mid-call never
//! mixes members or vocabularies from two bundle versions.

use crate::bundle::{ModelBundle, ModelBundleArtifact};
use crate::config::DetectorConfig;
use crate::duplicates::DuplicateDetector;
use crate::embedding::{embed_checked, EmbeddingProvider, DEFAULT_EMBEDDING_DIM};
use crate::evaluation::{BinaryMetrics, EvaluationReport};
use crate::explainer::Explainer;
use crate::features::FeatureExtractor;
use crate::normalizer::{NormalizedText, TextNormalizer};
use crate::vector::{FeatureVector, SparseVector};
use parking_lot::RwLock;
use reviewguard_core::{ClassificationResult, Error, RawReview, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fake review classifier with an atomically swappable model bundle
pub struct ReviewClassifier {
    config: DetectorConfig,
    normalizer: TextNormalizer,
    extractor: FeatureExtractor,
    explainer: Explainer,
    duplicates: DuplicateDetector,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    bundle: RwLock<Option<Arc<ModelBundle>>>,
}

impl ReviewClassifier {
    /// Build the pipeline from a validated configuration
    ///
    /// No bundle is loaded yet; predictions fail with
    /// [`Error::ModelNotLoaded`] until [`load`](Self::load) succeeds.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;

        let embedder = configured_embedder(&config)?;
        let extractor = FeatureExtractor::with_spam_phrases(&config.spam_phrases)?;

        Ok(Self {
            normalizer: TextNormalizer::new()?,
            extractor,
            explainer: Explainer::new(config.explainer.clone(), config.max_reasons),
            duplicates: DuplicateDetector::new(config.duplicate_similarity_threshold)?,
            embedder,
            bundle: RwLock::new(None),
            config,
        })
    }

    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(DetectorConfig::from_file(path)?)
    }

    /// Use `provider` for the dense embedding block
    pub fn with_embedder(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Swap in a new bundle, returning the one it replaced
    ///
    /// In-flight calls keep the snapshot they started with.
    pub fn load(&self, bundle: ModelBundle) -> Result<Option<Arc<ModelBundle>>> {
        if let Err(e) = self.check_embedding(&bundle) {
            warn!(version = bundle.version(), error = %e, "Rejected model bundle");
            return Err(e);
        }

        let bundle = Arc::new(bundle);
        info!(
            version = bundle.version(),
            input_dim = bundle.input_dim(),
            vocabulary = bundle.vectorizer().num_features(),
            embedding_dim = ?bundle.embedding_dim(),
            "Loaded model bundle"
        );
        metrics::counter!("reviewguard_model_reloads_total").increment(1);

        Ok(self.bundle.write().replace(bundle))
    }

    /// Same as [`load`](Self::load); reads better at call sites that
    /// replace a live bundle
    pub fn reload(&self, bundle: ModelBundle) -> Result<Option<Arc<ModelBundle>>> {
        self.load(bundle)
    }

    /// Read a JSON bundle artifact and load it
    ///
    /// Weights recorded in the artifact win over the configured weights.
    pub fn load_artifact_file(&self, path: impl AsRef<Path>) -> Result<Option<Arc<ModelBundle>>> {
        let bundle =
            ModelBundleArtifact::from_file(path)?.into_bundle(self.config.ensemble_weights)?;
        self.load(bundle)
    }

    pub fn unload(&self) -> Option<Arc<ModelBundle>> {
        self.bundle.write().take()
    }

    pub fn is_ready(&self) -> bool {
        self.bundle.read().is_some()
    }

    /// Snapshot of the loaded bundle
    pub fn current_bundle(&self) -> Result<Arc<ModelBundle>> {
        self.bundle.read().clone().ok_or(Error::ModelNotLoaded)
    }

    /// Build the model input for one review against `bundle`
    pub fn featurize(
        &self,
        bundle: &ModelBundle,
        text: &str,
        rating: Option<f32>,
    ) -> Result<FeatureVector> {
        let normalized = self.normalizer.normalize(text);
        self.featurize_normalized(bundle, text, &normalized, rating)
    }

    fn featurize_normalized(
        &self,
        bundle: &ModelBundle,
        raw: &str,
        normalized: &NormalizedText,
        rating: Option<f32>,
    ) -> Result<FeatureVector> {
        let statistical = self.extractor.extract(raw, normalized, rating);
        let lexical = bundle.vectorizer().transform_lemmas(&normalized.lemmas);

        let embedding = match bundle.embedding_dim() {
            Some(_) => {
                let provider = self
                    .embedder
                    .as_deref()
                    .ok_or_else(|| Error::config("bundle needs a dense embedding provider"))?;
                Some(embed_checked(provider, &normalized.cleaned)?)
            }
            None => None,
        };

        Ok(FeatureVector::assemble(&statistical, &lexical, embedding.as_deref()))
    }

    /// Score a prebuilt feature vector against the loaded bundle
    ///
    /// A vector whose width differs from the bundle's fails with
    /// [`Error::FeatureDimensionMismatch`] before any model runs.
    pub fn predict(&self, features: &FeatureVector) -> Result<ClassificationResult> {
        let start = Instant::now();
        let result = self
            .current_bundle()
            .and_then(|bundle| self.score(&bundle, features));
        self.observe(start, &result);
        result
    }

    /// Classify one review
    ///
    /// `metadata` is accepted for callers that carry it alongside the text;
    /// it does not influence the verdict.
    pub fn classify_review(
        &self,
        text: &str,
        rating: Option<f32>,
        metadata: Option<&BTreeMap<String, Value>>,
    ) -> Result<ClassificationResult> {
        let start = Instant::now();
        let result = self.current_bundle().and_then(|bundle| {
            let normalized = self.normalizer.normalize(text);
            self.classify_with(&bundle, text, &normalized, rating)
        });

        if let Some(metadata) = metadata {
            debug!(metadata_keys = metadata.len(), "Review metadata ignored for scoring");
        }
        self.observe(start, &result);
        result
    }

    /// Classify review text supplied as raw bytes
    ///
    /// Invalid UTF-8 fails with [`Error::Encoding`].
    pub fn classify_bytes(&self, text: &[u8], rating: Option<f32>) -> Result<ClassificationResult> {
        let start = Instant::now();
        let result = self.normalizer.normalize_bytes(text).and_then(|normalized| {
            let bundle = self.current_bundle()?;
            let raw = String::from_utf8_lossy(text);
            self.classify_with(&bundle, &raw, &normalized, rating)
        });
        self.observe(start, &result);
        result
    }

    pub fn classify(&self, review: &RawReview) -> Result<ClassificationResult> {
        self.classify_review(&review.text, review.rating, review.metadata.as_ref())
    }

    /// Classify a batch; one result per review, in input order
    ///
    /// The whole batch is scored against a single bundle snapshot.
    pub fn classify_batch(&self, reviews: &[RawReview]) -> Vec<Result<ClassificationResult>> {
        let bundle = match self.current_bundle() {
            Ok(bundle) => bundle,
            Err(_) => {
                let kind = Error::ModelNotLoaded.kind();
                metrics::counter!("reviewguard_errors_total", "kind" => kind)
                    .increment(reviews.len() as u64);
                return reviews.iter().map(|_| Err(Error::ModelNotLoaded)).collect();
            }
        };

        debug!(batch_size = reviews.len(), version = bundle.version(), "Classifying batch");

        reviews
            .iter()
            .map(|review| {
                let start = Instant::now();
                let normalized = self.normalizer.normalize(&review.text);
                let result = self.classify_with(&bundle, &review.text, &normalized, review.rating);
                self.observe(start, &result);
                result
            })
            .collect()
    }

    /// Near-duplicate pairs among `texts`
    ///
    /// Uses the loaded bundle's vocabulary when there is one, and a
    /// batch-local vocabulary otherwise.
    pub fn near_duplicates<I: Clone + Ord>(&self, texts: &[(I, &str)]) -> Result<BTreeSet<(I, I)>> {
        let Some(bundle) = self.bundle.read().clone() else {
            return self.duplicates.scan_texts(&self.normalizer, texts);
        };

        let vectors: Vec<(I, SparseVector)> = texts
            .iter()
            .map(|(id, text)| (id.clone(), bundle.vectorizer().transform(&self.normalizer, text)))
            .collect();

        Ok(self.duplicates.find_near_duplicates(&vectors))
    }

    /// Per-member and ensemble metrics over a labeled set (`true` = fake)
    pub fn evaluate(&self, labeled: &[(RawReview, bool)]) -> Result<EvaluationReport> {
        if labeled.is_empty() {
            return Err(Error::config("evaluation set is empty"));
        }

        let bundle = self.current_bundle()?;
        let threshold = self.config.threshold;

        let mut labels = Vec::with_capacity(labeled.len());
        let mut ensemble_scores = Vec::with_capacity(labeled.len());
        let mut member_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for (review, is_fake) in labeled {
            let features = self.featurize(&bundle, &review.text, review.rating)?;
            let prediction = bundle.ensemble().predict(&features, threshold)?;

            labels.push(*is_fake);
            ensemble_scores.push(prediction.fake_probability);
            for member in prediction.per_model {
                member_scores
                    .entry(member.name)
                    .or_default()
                    .push(member.probability);
            }
        }

        let mut per_model = BTreeMap::new();
        for (name, scores) in member_scores {
            per_model.insert(name, BinaryMetrics::compute(&labels, &scores, threshold)?);
        }
        let ensemble = BinaryMetrics::compute(&labels, &ensemble_scores, threshold)?;

        info!(
            version = bundle.version(),
            support = ensemble.support,
            accuracy = ensemble.accuracy,
            f1 = ensemble.f1,
            roc_auc = ?ensemble.roc_auc,
            "Evaluated model bundle"
        );

        Ok(EvaluationReport { per_model, ensemble })
    }

    fn classify_with(
        &self,
        bundle: &ModelBundle,
        raw: &str,
        normalized: &NormalizedText,
        rating: Option<f32>,
    ) -> Result<ClassificationResult> {
        let features = self.featurize_normalized(bundle, raw, normalized, rating)?;
        self.score(bundle, &features)
    }

    fn score(
        &self,
        bundle: &ModelBundle,
        features: &FeatureVector,
    ) -> Result<ClassificationResult> {
        let threshold = self.config.threshold;
        let prediction = bundle.ensemble().predict(features, threshold)?;
        let per_model_probabilities = prediction.per_model_map();
        let reasons = self.explainer.explain(
            features,
            &per_model_probabilities,
            prediction.fake_probability,
            threshold,
        )?;

        Ok(ClassificationResult {
            fake_probability: prediction.fake_probability,
            is_fake: prediction.is_fake,
            confidence: prediction.confidence,
            per_model_probabilities,
            reasons,
        })
    }

    fn observe(&self, start: Instant, result: &Result<ClassificationResult>) {
        let elapsed_us = start.elapsed().as_micros() as f64;
        metrics::histogram!("reviewguard_classification_latency_us").record(elapsed_us);

        match result {
            Ok(verdict) => {
                metrics::counter!("reviewguard_classifications_total", "verdict" => verdict.label())
                    .increment(1);
                debug!(
                    fake_probability = verdict.fake_probability,
                    is_fake = verdict.is_fake,
                    reasons = verdict.reasons.len(),
                    latency_us = elapsed_us,
                    "Classified review"
                );
            }
            Err(e) => {
                metrics::counter!("reviewguard_errors_total", "kind" => e.kind()).increment(1);
                warn!(error = %e, kind = e.kind(), "Review classification failed");
            }
        }
    }

    /// Width of the embedding block this deployment would append
    fn serving_embedding_dim(&self) -> usize {
        self.embedder
            .as_deref()
            .map_or(DEFAULT_EMBEDDING_DIM, |provider| provider.dimension())
    }

    fn check_embedding(&self, bundle: &ModelBundle) -> Result<()> {
        let expected = bundle.input_dim();
        match (self.config.use_dense_embedding, bundle.embedding_dim()) {
            (false, None) => Ok(()),
            (false, Some(dim)) => Err(Error::dimension_mismatch(expected, expected - dim)),
            (true, None) => Err(Error::dimension_mismatch(
                expected,
                expected + self.serving_embedding_dim(),
            )),
            (true, Some(dim)) => match &self.embedder {
                None => Err(Error::config(
                    "use_dense_embedding is on but no embedding provider is configured",
                )),
                Some(provider) if provider.dimension() != dim => {
                    Err(Error::dimension_mismatch(dim, provider.dimension()))
                }
                Some(_) => Ok(()),
            },
        }
    }
}

impl std::fmt::Debug for ReviewClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewClassifier")
            .field("config", &self.config)
            .field("has_embedder", &self.embedder.is_some())
            .field("bundle", &*self.bundle.read())
            .finish()
    }
}

#[cfg(feature = "bert-embeddings")]
fn configured_embedder(config: &DetectorConfig) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
    match (&config.embedding, config.use_dense_embedding) {
        (Some(spec), true) => {
            let embedder = crate::embedding::BertEmbedder::from_spec(spec)?;
            Ok(Some(Arc::new(embedder)))
        }
        _ => Ok(None),
    }
}

#[cfg(not(feature = "bert-embeddings"))]
fn configured_embedder(config: &DetectorConfig) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
    if config.use_dense_embedding && config.embedding.is_some() {
        warn!("Built without bert-embeddings; supply a provider with with_embedder");
    }
    Ok(None)
}
