use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// The failing stage, when known.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Attach a stage name to an error that does not carry one yet.
    pub(crate) fn attribute(self, stage: &str) -> Self {
        match self {
            e @ Self::Stage { .. } => e,
            other => Self::Stage {
                stage: stage.to_string(),
                source: anyhow::Error::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
