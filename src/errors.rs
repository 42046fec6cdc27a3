//! Error types of the control surface.
//!
//! Library crates carry their own enums; these cover what only the root
//! package does: tab messaging, record parsing and the website API.

use thiserror::Error;

/// Substrings the browser uses when a tab has no content script listening.
const RECEIVING_END_MARKERS: [&str; 2] = [
    "Could not establish connection",
    "Receiving end does not exist",
];

#[derive(Debug, Error)]
pub enum TabError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    ReceivingEndMissing,

    #[error("활성 탭을 찾을 수 없습니다")]
    NoActiveTab,

    #[error("content script injection failed: {0}")]
    Injection(String),

    /// Transport failure reported by the browser, carried verbatim.
    #[error("{0}")]
    Transport(String),

    #[error("invalid runtime message: {0}")]
    Message(#[from] serde_json::Error),
}

impl TabError {
    /// Whether the failure means nothing is listening in the tab yet.
    pub fn is_receiving_end_missing(&self) -> bool {
        let text = self.to_string();
        RECEIVING_END_MARKERS
            .iter()
            .any(|marker| text.contains(marker))
    }
}

/// Problems with pasted or fetched record data. The batch is never started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("JSON 데이터를 입력하세요")]
    EmptyInput,

    #[error("JSON 파싱 실패: {0}")]
    Syntax(String),

    #[error("올바른 JSON 형식이 아닙니다")]
    Shape,

    #[error("입력할 데이터가 없습니다")]
    NoRecords,

    #[error("{index}번째 항목: {reason}")]
    Record { index: usize, reason: String },

    #[error("월을 입력하세요")]
    MissingMonth,

    #[error("최소 하나의 항목을 입력하세요")]
    EmptyEntry,
}

impl RecordError {
    pub fn record(index: usize, reason: impl Into<String>) -> Self {
        RecordError::Record {
            index,
            reason: reason.into(),
        }
    }
}

/// Website API failures, worded the way the settings screen reports them.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("웹사이트 URL을 입력하세요")]
    MissingUrl,

    #[error("잘못된 웹사이트 URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("연결 실패")]
    Health,

    #[error("학생 목록 불러오기 실패")]
    Students,

    #[error("데이터 가져오기 실패")]
    MonthlyPlans,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}
