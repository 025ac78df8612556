// src/pipeline.rs

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::models::{fingerprint, AdditiveModel, FittedModel, ForecastRow, Forecaster, Series};
use crate::utils::cache;
use crate::utils::fetch::{fetch_series, PageSource};
use crate::utils::memo::Memo;

/// Outcome of the fetch step of one render.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    Loaded { rows: usize },
    Failed(String),
}

/// Everything a render needs from the fetch, load and fit stages.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub fetch: FetchStatus,
    /// Freshly fetched data; `None` when the fetch has never succeeded.
    pub fetched: Option<Arc<Series>>,
    pub series: Arc<Series>,
    pub model: Arc<FittedModel>,
}

/// Fetch → load → fit, each step memoized on its input for the life of the process.
pub struct Pipeline {
    settings: Settings,
    source: Box<dyn PageSource>,
    model: AdditiveModel,
    fetched: Memo<String, Arc<Series>>,
    loaded: Memo<(PathBuf, Option<u64>), Arc<Series>>,
    fitted: Memo<u64, Arc<FittedModel>>,
}

impl Pipeline {
    pub fn new(settings: Settings, source: Box<dyn PageSource>) -> Self {
        Pipeline {
            settings,
            source,
            model: AdditiveModel::default(),
            fetched: Memo::new("fetch"),
            loaded: Memo::new("load"),
            fitted: Memo::new("fit"),
        }
    }

    /// Runs one render's worth of pipeline. A failed fetch is reported in the
    /// snapshot and the cached file is used instead; every later failure is returned.
    pub fn refresh(&self) -> Result<Snapshot> {
        let (fetch, fetched) = match self.fetch() {
            Ok(series) => (FetchStatus::Loaded { rows: series.len() }, Some(series)),
            Err(e) => {
                warn!("Fetch from {} failed: {}", self.settings.source_url, e);
                (FetchStatus::Failed(e.to_string()), None)
            }
        };

        let series = self.load(fetched.as_deref())?;
        let model = self.fit(&series)?;

        Ok(Snapshot {
            fetch,
            fetched,
            series,
            model,
        })
    }

    pub fn fetch(&self) -> Result<Arc<Series>> {
        let url = self.settings.source_url.clone();
        self.fetched.get_or_try_insert_with(url.clone(), || {
            fetch_series(self.source.as_ref(), &url, &self.settings.cache_path).map(Arc::new)
        })
    }

    /// Data from the last successful fetch of this process, if any.
    pub fn fetched_series(&self) -> Option<Arc<Series>> {
        self.fetched.get(&self.settings.source_url)
    }

    /// Reads the cache file. The read is memoized per fetched dataset, so a file
    /// rewritten by a later successful fetch is read again.
    pub fn load(&self, fetched: Option<&Series>) -> Result<Arc<Series>> {
        let path = self.settings.cache_path.clone();
        let key = (path.clone(), fetched.map(|series| fingerprint(series)));
        self.loaded
            .get_or_try_insert_with(key, || cache::read_series(&path).map(Arc::new))
    }

    pub fn fit(&self, series: &Series) -> Result<Arc<FittedModel>> {
        self.fitted.get_or_try_insert_with(fingerprint(series), || {
            info!("Fitting model on {} observations", series.len());
            self.model.fit(series).map(Arc::new)
        })
    }

    pub fn forecast(&self, model: &FittedModel, horizon: usize) -> Result<Vec<ForecastRow>> {
        self.model.predict(model, horizon)
    }
}
