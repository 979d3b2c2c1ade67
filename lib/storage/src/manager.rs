use crate::persistence::{self, ArtifactHeader, MODEL_FILENAME};
use parking_lot::RwLock;
use sommelier_core::{Catalog, Error, Result};
use sommelier_encoder::EncoderConfig;
use sommelier_recommend::{Geocoder, Recommender, RecommenderConfig, TrainedModel};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Owns the live recommender and its on-disk artifact.
///
/// Readers take an `Arc` snapshot with [`current`]; a rebuild fits and saves
/// a new model off to the side, then swaps the handle. In-flight readers keep
/// the old recommender until they drop it.
///
/// [`current`]: ModelStore::current
pub struct ModelStore {
    data_dir: PathBuf,
    encoder_config: EncoderConfig,
    config: RecommenderConfig,
    geocoder: Option<Arc<dyn Geocoder>>,
    live: RwLock<Option<Arc<Recommender>>>,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(
        data_dir: P,
        encoder_config: EncoderConfig,
        config: RecommenderConfig,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        encoder_config.validate()?;
        config.validate()?;

        Ok(Self {
            data_dir,
            encoder_config,
            config,
            geocoder: None,
            live: RwLock::new(None),
        })
    }

    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the model artifact
    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(MODEL_FILENAME)
    }

    pub fn has_artifact(&self) -> bool {
        self.model_path().exists()
    }

    /// The live recommender
    #[inline]
    pub fn current(&self) -> Result<Arc<Recommender>> {
        self.live.read().clone().ok_or(Error::ModelNotLoaded)
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.live.read().is_some()
    }

    /// Replace the live recommender, returning the previous one
    pub fn swap(&self, recommender: Recommender) -> Option<Arc<Recommender>> {
        let next = Arc::new(recommender);
        let previous = self.live.write().replace(next);
        tracing::info!(replaced = previous.is_some(), "swapped live recommender");
        previous
    }

    fn assemble(&self, catalog: Catalog, model: TrainedModel) -> Result<Recommender> {
        let recommender = Recommender::new(Some(catalog), Some(model), self.config.clone())?;
        Ok(match &self.geocoder {
            Some(geocoder) => recommender.with_geocoder(Arc::clone(geocoder)),
            None => recommender,
        })
    }

    fn install(&self, catalog: Catalog, model: TrainedModel) -> Result<Arc<Recommender>> {
        self.swap(self.assemble(catalog, model)?);
        self.current()
    }

    /// Whether an artifact was fitted over exactly `catalog`. Artifacts saved
    /// without a catalog fingerprint only get the row count check.
    fn fitted_over(header: &ArtifactHeader, catalog: &Catalog) -> Result<bool> {
        match &header.catalog_fingerprint {
            Some(expected) => Ok(*expected == persistence::catalog_fingerprint(catalog)?),
            None => Ok(true),
        }
    }

    /// Load the saved artifact and pair it with `catalog`.
    ///
    /// Fails with [`Error::Persistence`] if the artifact was fitted over a
    /// different catalog.
    pub fn load(&self, catalog: Catalog) -> Result<Arc<Recommender>> {
        let path = self.model_path();
        let artifact = persistence::load_artifact(&path)?;
        if !Self::fitted_over(&artifact.header, &catalog)? {
            return Err(Error::Persistence(format!(
                "model artifact {} was fitted over a different catalog",
                path.display()
            )));
        }
        self.install(catalog, artifact.model)
    }

    /// Fit a new model over `catalog`, save it, then make it live.
    ///
    /// On failure the live recommender and the saved artifact are untouched.
    pub fn rebuild(&self, catalog: Catalog) -> Result<Arc<Recommender>> {
        let model = TrainedModel::fit(&catalog, &self.encoder_config)?;
        persistence::save_catalog_model(&model, &catalog, &self.model_path())?;
        self.install(catalog, model)
    }

    /// Load the saved artifact if it was fitted over `catalog`, otherwise rebuild
    pub fn load_or_rebuild(&self, catalog: Catalog) -> Result<Arc<Recommender>> {
        let path = self.model_path();
        if !self.has_artifact() {
            tracing::info!(path = %path.display(), "no saved model, fitting");
            return self.rebuild(catalog);
        }

        let artifact = persistence::load_artifact(&path)?;
        if Self::fitted_over(&artifact.header, &catalog)? {
            self.install(catalog, artifact.model)
        } else {
            tracing::info!(path = %path.display(), "catalog changed since the model was saved, refitting");
            self.rebuild(catalog)
        }
    }
}
