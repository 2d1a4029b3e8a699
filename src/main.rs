pub mod artifacts;
pub mod inference;
pub mod models;
pub mod template;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use log::{error, info, warn};

use artifacts::{ArtifactPaths, Artifacts};
use models::CropForm;

async fn index() -> impl Responder {
    page(None)
}

async fn predict(artifacts: web::Data<Artifacts>, form: web::Form<CropForm>) -> impl Responder {
    let message = recommend(&artifacts, &form);
    page(Some(&message))
}

/// Runs the fixed pipeline: parse and validate the form, scale, predict,
/// decode. Every outcome collapses to one user-visible message; the process
/// keeps serving regardless of inference failures.
fn recommend(artifacts: &Artifacts, form: &CropForm) -> String {
    let features = match form.to_features() {
        Ok(features) => features,
        Err(rejection) => {
            warn!("Rejected prediction request: {}", rejection.message());
            return rejection.message().to_string();
        }
    };

    let scaled = artifacts.scaler.transform(&features);

    let decoded = artifacts
        .model
        .predict(&scaled)
        .and_then(|class_id| artifacts.encoder.decode(class_id).map(str::to_string));

    match decoded {
        Ok(crop) => {
            info!("🌾 Recommended crop: {crop}");
            format!("{crop} is the best crop to cultivate here!")
        }
        Err(e) => {
            error!("Inference failed: {e:#}");
            format!("Error: {e}")
        }
    }
}

fn page(result: Option<&str>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(template::render(result))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("🚀 Starting crop recommendation service");

    let paths = ArtifactPaths::from_env();
    let artifacts = match Artifacts::load(&paths) {
        Ok(artifacts) => artifacts,
        Err(e) => {
            error!("❌ {e:#}");
            return Err(e);
        }
    };
    let artifacts = web::Data::new(artifacts);

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let workers = std::env::var("WORKERS")
        .ok()
        .and_then(|w| w.parse().ok())
        .unwrap_or_else(num_cpus::get);

    let bind_address = format!("{host}:{port}");

    info!("🌐 Listening on http://{bind_address}");
    info!("👷 Workers: {workers}");
    info!("   GET  /         - input form");
    info!("   POST /predict  - crop recommendation");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(artifacts.clone())
            .route("/", web::get().to(index))
            .route("/predict", web::post().to(predict))
    })
    .workers(workers)
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use crate::inference::{Classifier, LabelEncoder, MinMaxScaler};
    use crate::models::FEATURE_COUNT;

    /// Stub standing in for the ONNX model: always the same class id.
    struct FixedClassifier(usize);

    impl Classifier for FixedClassifier {
        fn predict(&self, _features: &[f32; FEATURE_COUNT]) -> anyhow::Result<usize> {
            Ok(self.0)
        }
    }

    /// Stub simulating an internal inference failure.
    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict(&self, _features: &[f32; FEATURE_COUNT]) -> anyhow::Result<usize> {
            Err(anyhow::anyhow!("tensor shape mismatch"))
        }
    }

    fn test_artifacts(model: Box<dyn Classifier>) -> Artifacts {
        Artifacts {
            model,
            scaler: MinMaxScaler::new(vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT])
                .unwrap(),
            encoder: LabelEncoder::new(vec![
                "rice".to_string(),
                "maize".to_string(),
                "jute".to_string(),
            ])
            .unwrap(),
        }
    }

    async fn post_form(
        artifacts: Artifacts,
        fields: &[(&str, &str)],
    ) -> (StatusCode, String) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(artifacts))
                .route("/", web::get().to(index))
                .route("/predict", web::post().to(predict)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_form(fields)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body = test::read_body(resp).await;
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn valid_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Nitrogen", "90"),
            ("Phosporus", "42"),
            ("Potassium", "43"),
            ("Temperature", "20.9"),
            ("Humidity", "82.0"),
            ("pH", "6.5"),
            ("Rainfall", "202.9"),
        ]
    }

    #[actix_web::test]
    async fn valid_input_returns_the_decoded_crop() {
        let artifacts = test_artifacts(Box::new(FixedClassifier(2)));
        let (status, body) = post_form(artifacts, &valid_fields()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("jute is the best crop to cultivate here!"));
        assert!(!body.contains("must be non-negative"));
        assert!(!body.contains("valid numbers"));
    }

    #[actix_web::test]
    async fn negative_field_returns_the_non_negativity_warning() {
        let artifacts = test_artifacts(Box::new(FixedClassifier(0)));
        let mut fields = valid_fields();
        fields[0] = ("Nitrogen", "-5");
        let (status, body) = post_form(artifacts, &fields).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("All values must be non-negative!"));
        assert!(!body.contains("best crop"));
    }

    #[actix_web::test]
    async fn non_numeric_field_returns_the_parse_warning() {
        let artifacts = test_artifacts(Box::new(FixedClassifier(0)));
        let mut fields = valid_fields();
        fields[3] = ("Temperature", "warm");
        let (status, body) = post_form(artifacts, &fields).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Please enter valid numbers in all fields."));
        assert!(!body.contains("best crop"));
    }

    #[actix_web::test]
    async fn missing_field_returns_the_parse_warning() {
        let artifacts = test_artifacts(Box::new(FixedClassifier(0)));
        let fields: Vec<_> = valid_fields()
            .into_iter()
            .filter(|(name, _)| *name != "Humidity")
            .collect();
        let (status, body) = post_form(artifacts, &fields).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Please enter valid numbers in all fields."));
    }

    #[actix_web::test]
    async fn inference_failure_is_surfaced_and_survived() {
        let artifacts = test_artifacts(Box::new(FailingClassifier));
        let (status, body) = post_form(artifacts, &valid_fields()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Error: tensor shape mismatch"));
    }

    #[actix_web::test]
    async fn unknown_class_id_is_surfaced_as_a_generic_error() {
        let artifacts = test_artifacts(Box::new(FixedClassifier(99)));
        let (status, body) = post_form(artifacts, &valid_fields()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Error:"));
        assert!(body.contains("class id 99"));
    }

    #[actix_web::test]
    async fn index_serves_the_bare_form() {
        let app = test::init_service(App::new().route("/", web::get().to(index))).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("<form"));
        assert!(!body.contains("best crop"));
    }

    // `use actix_web::test` shadows the built-in `#[test]` attribute here,
    // so name it by full path.
    #[::core::prelude::v1::test]
    fn scaled_features_reach_the_model() {
        struct CapturingClassifier;
        impl Classifier for CapturingClassifier {
            fn predict(&self, features: &[f32; FEATURE_COUNT]) -> anyhow::Result<usize> {
                assert_eq!(features, &[45.0, 21.0, 21.5, 10.45, 41.0, 3.25, 101.45]);
                Ok(0)
            }
        }
        let artifacts = Artifacts {
            model: Box::new(CapturingClassifier),
            scaler: MinMaxScaler::new(vec![0.0; FEATURE_COUNT], vec![0.5; FEATURE_COUNT])
                .unwrap(),
            encoder: LabelEncoder::new(vec!["rice".to_string()]).unwrap(),
        };
        let form = CropForm {
            nitrogen: Some("90".to_string()),
            phosporus: Some("42".to_string()),
            potassium: Some("43".to_string()),
            temperature: Some("20.9".to_string()),
            humidity: Some("82.0".to_string()),
            ph: Some("6.5".to_string()),
            rainfall: Some("202.9".to_string()),
        };
        assert_eq!(
            recommend(&artifacts, &form),
            "rice is the best crop to cultivate here!"
        );
    }
}
