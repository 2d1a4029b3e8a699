use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tract_onnx::prelude::*;

use crate::models::FEATURE_COUNT;

/// Black-box classifier contract: normalized feature vector in, class id out.
/// The ONNX runtime lives behind this seam so tests can substitute a stub.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> anyhow::Result<usize>;
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Pre-trained crop classifier, expecting a `[1, 7]` f32 input.
pub struct OnnxClassifier {
    plan: OnnxPlan,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(model_path: P) -> TractResult<Self> {
        let plan = tract_onnx::onnx()
            .model_for_path(model_path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
            )?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> anyhow::Result<usize> {
        let input = Tensor::from_shape(&[1, FEATURE_COUNT], features)?;
        let outputs = self.plan.run(tvec!(input.into()))?;
        let output = &outputs[0];

        // Exported classifiers emit either the class id directly (i64) or a
        // per-class score row (f32), in which case the argmax is the id.
        if output.datum_type() == i64::datum_type() {
            let id = *output
                .to_array_view::<i64>()?
                .iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("model produced an empty output tensor"))?;
            usize::try_from(id)
                .map_err(|_| anyhow::anyhow!("model produced a negative class id: {id}"))
        } else {
            let scores = output.to_array_view::<f32>()?;
            let (id, _) = scores
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .ok_or_else(|| anyhow::anyhow!("model produced an empty output tensor"))?;
            Ok(id)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScalerParams {
    min: Vec<f32>,
    scale: Vec<f32>,
}

/// Pre-fit min-max scaler. Applies the fitted affine map
/// `scaled[i] = raw[i] * scale[i] + min[i]` per component.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: Vec<f32>,
    scale: Vec<f32>,
}

impl MinMaxScaler {
    pub fn new(min: Vec<f32>, scale: Vec<f32>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            min.len() == FEATURE_COUNT && scale.len() == FEATURE_COUNT,
            "scaler expects {FEATURE_COUNT} features, got min={} scale={}",
            min.len(),
            scale.len()
        );
        Ok(Self { min, scale })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening scaler file {}", path.display()))?;
        let params: ScalerParams = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing scaler file {}", path.display()))?;
        Self::new(params.min, params.scale)
    }

    pub fn transform(&self, features: &[f32; FEATURE_COUNT]) -> [f32; FEATURE_COUNT] {
        let mut scaled = [0.0f32; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            scaled[i] = features[i] * self.scale[i] + self.min[i];
        }
        scaled
    }
}

#[derive(Debug, Deserialize)]
struct EncoderParams {
    classes: Vec<String>,
}

/// Pre-fit label encoder: class ids index the fitted class list.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> anyhow::Result<Self> {
        anyhow::ensure!(!classes.is_empty(), "label encoder has no classes");
        Ok(Self { classes })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening label encoder file {}", path.display()))?;
        let params: EncoderParams = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing label encoder file {}", path.display()))?;
        Self::new(params.classes)
    }

    pub fn decode(&self, class_id: usize) -> anyhow::Result<&str> {
        self.classes.get(class_id).map(String::as_str).ok_or_else(|| {
            anyhow::anyhow!(
                "class id {class_id} is outside the {} known crops",
                self.classes.len()
            )
        })
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}
