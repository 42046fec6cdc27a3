//! Batch orchestration errors

use nice_core_types::PageType;
use page_bridge::BridgeError;
use thiserror::Error;

/// Errors that stop a batch before any record is attempted.
#[derive(Debug, Error)]
pub enum FlowError {
    /// `ensureApp` never succeeded within the retry budget
    #[error("나이스 시스템 초기화 실패. {} 페이지에서 실행 중인지 확인해주세요.", page_label(.0))]
    InitFailed(PageType),

    /// Nothing to fill
    #[error("{}", empty_message(.0))]
    EmptyBatch(PageType),

    /// Bridge failure outside the per-record loop
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A record could not be kept as JSON
    #[error("기록 직렬화 실패: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn page_label(page: &PageType) -> &'static str {
    page.label()
}

fn empty_message(page: &PageType) -> &'static str {
    match page {
        PageType::Plan => "입력할 데이터가 없습니다",
        PageType::Evaluation => "입력할 평가 데이터가 없습니다",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_page() {
        assert_eq!(
            FlowError::InitFailed(PageType::Evaluation).to_string(),
            "나이스 시스템 초기화 실패. 월별평가 페이지에서 실행 중인지 확인해주세요."
        );
        assert_eq!(
            FlowError::EmptyBatch(PageType::Plan).to_string(),
            "입력할 데이터가 없습니다"
        );
    }
}
