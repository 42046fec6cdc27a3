use dom_adapter::DomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("선택자({0})에 해당하는 요소를 찾을 수 없습니다")]
    RootNotFound(String),
    #[error(transparent)]
    Dom(#[from] DomError),
}

impl SnapshotError {
    pub fn root_not_found(selector: impl Into<String>) -> Self {
        Self::RootNotFound(selector.into())
    }
}
