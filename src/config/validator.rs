use crate::config::Config;
use crate::error::{GemsearchError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_storage(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_search(config, &mut errors);
        Self::validate_rerank(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GemsearchError::ConfigValidation { errors })
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        if config.storage.catalog_file.is_empty() {
            errors.push(ValidationError::new(
                "storage.catalog_file",
                "Catalog file name cannot be empty",
            ));
        }

        if config.storage.index_file.is_empty() {
            errors.push(ValidationError::new(
                "storage.index_file",
                "Index file name cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.base_url.is_empty() {
            errors.push(ValidationError::new(
                "embedding.base_url",
                "Base URL cannot be empty",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "embedding.api_key_env",
                "API key environment variable name cannot be empty",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "embedding.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.search.candidate_multiplier == 0 {
            errors.push(ValidationError::new(
                "search.candidate_multiplier",
                "Candidate multiplier must be at least 1",
            ));
        }

        if config.search.vector_weight <= 0.0 {
            errors.push(ValidationError::new(
                "search.vector_weight",
                "Vector weight must be positive",
            ));
        }

        if config.search.keyword_weight <= 0.0 {
            errors.push(ValidationError::new(
                "search.keyword_weight",
                "Keyword weight must be positive",
            ));
        }

        if config.search.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "search.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.search.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "search.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.search.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "search.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_rerank(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.rerank.enabled && config.rerank.model.is_empty() {
            errors.push(ValidationError::new(
                "rerank.model",
                "Rerank model cannot be empty when reranking is enabled",
            ));
        }

        let temp = config.rerank.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "rerank.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }
    }
}
