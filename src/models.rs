use serde::Deserialize;

pub const FEATURE_COUNT: usize = 7;

/// Form payload for `POST /predict`.
///
/// Field names are the exact, case-sensitive names the form submits
/// ("Phosporus" is the historical spelling the form uses). Every field is
/// optional so that a missing field is reported as a validation message
/// instead of a framework-level deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct CropForm {
    #[serde(rename = "Nitrogen")]
    pub nitrogen: Option<String>,
    #[serde(rename = "Phosporus")]
    pub phosporus: Option<String>,
    #[serde(rename = "Potassium")]
    pub potassium: Option<String>,
    #[serde(rename = "Temperature")]
    pub temperature: Option<String>,
    #[serde(rename = "Humidity")]
    pub humidity: Option<String>,
    #[serde(rename = "pH")]
    pub ph: Option<String>,
    #[serde(rename = "Rainfall")]
    pub rainfall: Option<String>,
}

/// Input rejection, mapped one-to-one to the user-visible messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    NotNumeric,
    Negative,
}

impl FormError {
    pub fn message(&self) -> &'static str {
        match self {
            FormError::NotNumeric => "Please enter valid numbers in all fields.",
            FormError::Negative => "All values must be non-negative!",
        }
    }
}

impl CropForm {
    /// Parses the seven fields into a feature vector in the fixed order
    /// Nitrogen, Phosphorus, Potassium, Temperature, Humidity, pH, Rainfall.
    ///
    /// A missing, unparseable or non-finite field rejects the whole request;
    /// no partial computation happens. Negative values are checked only after
    /// every field parsed. There is no upper bound on any value.
    pub fn to_features(&self) -> Result<[f32; FEATURE_COUNT], FormError> {
        let fields = [
            &self.nitrogen,
            &self.phosporus,
            &self.potassium,
            &self.temperature,
            &self.humidity,
            &self.ph,
            &self.rainfall,
        ];

        let mut features = [0.0f32; FEATURE_COUNT];
        for (slot, field) in features.iter_mut().zip(fields) {
            let text = field.as_deref().ok_or(FormError::NotNumeric)?;
            let value: f32 = text.trim().parse().map_err(|_| FormError::NotNumeric)?;
            if !value.is_finite() {
                return Err(FormError::NotNumeric);
            }
            *slot = value;
        }

        if features.iter().any(|v| *v < 0.0) {
            return Err(FormError::Negative);
        }

        Ok(features)
    }
}
