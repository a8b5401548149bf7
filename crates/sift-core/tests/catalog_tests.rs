use async_trait::async_trait;

use sift_core::config::Config;
use sift_core::llm::{LLMError, ModelInfo, ModelLister};
use sift_core::provider::{
    fallback_models, list_available_models, list_models, provider_info, ModelSource,
};
use sift_core::ProviderKind;

struct FailingLister;

#[async_trait]
impl ModelLister for FailingLister {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
        Err(LLMError::ApiError {
            status: 401,
            message: "invalid key".to_string(),
        })
    }
}

struct FixedLister(Vec<ModelInfo>);

#[async_trait]
impl ModelLister for FixedLister {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_failed_listing_falls_back_per_provider() {
    for kind in [
        ProviderKind::NativeGrounded,
        ProviderKind::ExternalIndexChat,
        ProviderKind::LocalInference,
    ] {
        let listing = list_models(kind, &FailingLister).await;
        assert_eq!(listing.source, ModelSource::Fallback);
        assert_eq!(listing.provider, kind);
        assert_eq!(listing.models, fallback_models(kind));
        assert!(listing.error.unwrap().contains("invalid key"));
    }
}

#[tokio::test]
async fn test_empty_listing_falls_back() {
    let listing = list_models(ProviderKind::NativeGrounded, &FixedLister(Vec::new())).await;
    assert_eq!(listing.source, ModelSource::Fallback);
    assert!(!listing.models.is_empty());
}

#[tokio::test]
async fn test_hosted_listing_is_capped() {
    let models = (0..80)
        .map(|i| ModelInfo::new(format!("vendor/model-{i}"), format!("Model {i}"), ""))
        .collect();
    let listing = list_models(ProviderKind::ExternalIndexChat, &FixedLister(models)).await;

    assert_eq!(listing.source, ModelSource::Live);
    assert_eq!(listing.models.len(), 50);
    assert!(listing.error.is_none());
}

#[tokio::test]
async fn test_local_listing_uses_ids() {
    let models = vec![ModelInfo::new("qwen2.5-7b", "", "")];
    let listing = list_models(ProviderKind::LocalInference, &FixedLister(models)).await;

    assert_eq!(listing.models[0].display_name, "qwen2.5-7b");
    assert_eq!(listing.models[0].description, "Locally running model");
}

#[tokio::test]
async fn test_missing_key_skips_network() {
    let config = Config::default().resolve().unwrap();
    let listing = list_available_models(&config).await;

    assert_eq!(listing.source, ModelSource::Fallback);
    assert_eq!(listing.error.as_deref(), Some("No API key"));
}

#[test]
fn test_provider_info() {
    let mut config = Config::default();
    config.active_provider = "openrouter".to_string();
    let mut resolved = config.resolve().unwrap();

    let info = provider_info(&resolved);
    assert_eq!(info.active_provider, "openrouter");
    assert!(!info.has_credentials);

    resolved.search_api_key = Some("exa".to_string());
    assert!(provider_info(&resolved).has_credentials);
}
