use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] tessera_pipeline::PipelineError),

    #[error("registry error: {0}")]
    Registry(#[from] tessera_registry::RegistryError),

    #[error("tree error: {0}")]
    Tree(#[from] tessera_tree::TreeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
