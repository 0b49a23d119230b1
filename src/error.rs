use std::fmt;

pub type Result<T> = std::result::Result<T, RlError>;

#[derive(Debug)]
pub enum RlError {
    /// The id is not present in the environment registry.
    EnvironmentResolution { env_id: String },
    /// Two tensors (or tensor sets) that must line up do not.
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    InvalidArgument(String),
    /// A policy or environment failed while a trial was running.
    Rollout(anyhow::Error),
}

impl RlError {
    pub(crate) fn shape_mismatch(context: impl Into<String>, expected: &[usize], found: &[usize]) -> Self {
        RlError::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

impl fmt::Display for RlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RlError::EnvironmentResolution { env_id } => {
                write!(f, "no environment registered under id {:?}", env_id)
            }
            RlError::ShapeMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "shape mismatch in {}: expected {:?}, found {:?}",
                context, expected, found
            ),
            RlError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            RlError::Rollout(err) => write!(f, "rollout failed: {:#}", err),
        }
    }
}

impl std::error::Error for RlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RlError::Rollout(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for RlError {
    fn from(err: anyhow::Error) -> Self {
        RlError::Rollout(err)
    }
}
