pub type SpmResult<T> = Result<T, SpmError>;

#[derive(thiserror::Error, Debug)]
pub enum SpmError {
    #[error("data access error: {0}")]
    DataAccess(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("dispatch error: {0}")]
    Dispatch(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpmError {
    pub fn data_access(msg: impl Into<String>) -> Self {
        Self::DataAccess(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SpmError::data_access("x")
                .to_string()
                .contains("data access error:")
        );
        assert!(
            SpmError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            SpmError::dispatch("x")
                .to_string()
                .contains("dispatch error:")
        );
        assert!(
            SpmError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SpmError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
