use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;

use crate::inference::{Classifier, LabelEncoder, MinMaxScaler, OnnxClassifier};

/// Locations of the three startup artifacts. Defaults point at the working
/// directory and can be overridden through the environment.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub encoder: PathBuf,
}

impl ArtifactPaths {
    pub fn from_env() -> Self {
        Self {
            model: env_path("MODEL_PATH", "model.onnx"),
            scaler: env_path("SCALER_PATH", "minmaxscaler.json"),
            encoder: env_path("ENCODER_PATH", "label_encoder.json"),
        }
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// The three pre-fit artifacts, loaded once at startup and read-only for the
/// process lifetime. Shared across request handlers without locking.
pub struct Artifacts {
    pub model: Box<dyn Classifier>,
    pub scaler: MinMaxScaler,
    pub encoder: LabelEncoder,
}

impl std::fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifacts").finish_non_exhaustive()
    }
}

impl Artifacts {
    /// Fail-fast startup load. Existence of all three files is checked before
    /// anything is deserialized; a missing file aborts startup with an error
    /// naming it. Deserialization then runs in fixed order: model, scaler,
    /// label encoder. No retry, no partial load, no hot reload.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let required = [
            ("model", &paths.model),
            ("scaler", &paths.scaler),
            ("label encoder", &paths.encoder),
        ];
        for (name, path) in required {
            if !path.exists() {
                bail!("{name} artifact {} not found", path.display());
            }
        }

        let model = OnnxClassifier::load(&paths.model)
            .with_context(|| format!("loading model from {}", paths.model.display()))?;
        let scaler = MinMaxScaler::load(&paths.scaler)?;
        let encoder = LabelEncoder::load(&paths.encoder)?;

        info!(
            "✅ Artifacts loaded: model, scaler, label encoder ({} crops)",
            encoder.class_count()
        );

        Ok(Self {
            model: Box::new(model),
            scaler,
            encoder,
        })
    }
}
