//! Record intake: pasted JSON, website payloads, manual entry and sample data.
//!
//! Input is loose. A document may be an array of records, an object with a
//! `plans` array (optionally naming the student), or a single record. Field
//! names are accepted in several spellings and normalized here so the
//! orchestrator only ever sees [`PlanRecord`] and [`EvalRecord`].

use action_flow::{BatchMode, StudentFilter};
use nice_core_types::{EvalRecord, MonthValue, PlanRecord};
use serde_json::{Map, Value};

use crate::errors::RecordError;

const MONTH_KEYS: [&str; 3] = ["month", "mmnt", "월"];
const GOAL_KEYS: [&str; 3] = ["goal", "educationGoals", "교육목표"];
const CONTENT_KEYS: [&str; 3] = ["content", "educationContent", "교육내용"];
const METHOD_KEYS: [&str; 3] = ["method", "educationMethod", "교육방법"];
const EVALUATION_KEYS: [&str; 3] = ["evaluation", "evaluationPlan", "평가계획"];
const EVAL_TEXT_KEYS: [&str; 4] = ["eval_text", "evaluation", "평가", "평가내용"];

/// Records plus the student named alongside them, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedRecords<R> {
    pub records: Vec<R>,
    pub filter: StudentFilter,
}

/// A record kind that can be built from one loose JSON object.
pub trait LooseRecord: Sized {
    fn from_object(object: &Map<String, Value>) -> Self;
}

impl LooseRecord for PlanRecord {
    fn from_object(object: &Map<String, Value>) -> Self {
        PlanRecord {
            month: month_of(object),
            months: months_of(object),
            goal: first_text(object, &GOAL_KEYS),
            content: first_text(object, &CONTENT_KEYS),
            method: first_text(object, &METHOD_KEYS),
            evaluation: first_text(object, &EVALUATION_KEYS),
        }
    }
}

impl LooseRecord for EvalRecord {
    fn from_object(object: &Map<String, Value>) -> Self {
        EvalRecord {
            month: month_of(object),
            months: months_of(object),
            eval_text: first_text(object, &EVAL_TEXT_KEYS),
        }
    }
}

/// Parse pasted JSON text into records.
pub fn parse_records<R: LooseRecord>(text: &str) -> Result<ParsedRecords<R>, RecordError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RecordError::EmptyInput);
    }
    let document: Value =
        serde_json::from_str(text).map_err(|err| RecordError::Syntax(err.to_string()))?;

    let (items, filter) = match document {
        Value::Array(items) => (items, StudentFilter::default()),
        Value::Object(mut object) => match object.remove("plans") {
            Some(Value::Array(items)) => {
                let filter = StudentFilter {
                    student_name: text_of(object.get("studentName")),
                    student_number: text_of(object.get("studentNumber")),
                };
                (items, filter)
            }
            Some(other) => {
                object.insert("plans".to_string(), other);
                (vec![Value::Object(object)], StudentFilter::default())
            }
            None => (vec![Value::Object(object)], StudentFilter::default()),
        },
        _ => return Err(RecordError::Shape),
    };

    Ok(ParsedRecords {
        records: records_from_values(items)?,
        filter,
    })
}

/// Normalize already decoded values, e.g. a website response.
pub fn records_from_values<R: LooseRecord>(items: Vec<Value>) -> Result<Vec<R>, RecordError> {
    if items.is_empty() {
        return Err(RecordError::NoRecords);
    }
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(object) => Ok(R::from_object(object)),
            _ => Err(RecordError::record(index + 1, "객체가 아닙니다")),
        })
        .collect()
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First key whose value is a non-empty string or a number.
fn first_text(object: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match object.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn month_of(object: &Map<String, Value>) -> Option<MonthValue> {
    MONTH_KEYS
        .iter()
        .find_map(|key| text_of(object.get(*key)))
        .map(MonthValue::new)
}

fn months_of(object: &Map<String, Value>) -> Vec<MonthValue> {
    match object.get("months") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| text_of(Some(item)))
            .map(MonthValue::new)
            .collect(),
        _ => Vec::new(),
    }
}

/// One plan typed in by hand.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManualEntry {
    pub month: String,
    pub goal: String,
    pub content: String,
    pub method: String,
    pub evaluation: String,
}

impl ManualEntry {
    pub fn into_record(self) -> Result<PlanRecord, RecordError> {
        let month = self.month.trim();
        if month.is_empty() {
            return Err(RecordError::MissingMonth);
        }
        let record = PlanRecord {
            month: Some(MonthValue::new(month)),
            months: Vec::new(),
            goal: self.goal.trim().to_string(),
            content: self.content.trim().to_string(),
            method: self.method.trim().to_string(),
            evaluation: self.evaluation.trim().to_string(),
        };
        if record.is_empty() {
            return Err(RecordError::EmptyEntry);
        }
        Ok(record)
    }
}

const SAMPLE_PLANS: [(&str, &str, &str, &str, &str); 12] = [
    ("3", "기초 학습 능력 형성", "학습 환경 적응 및 기본 규칙 익히기", "개별 지도 및 모델링", "관찰 평가 및 체크리스트"),
    ("4", "의사소통 능력 향상", "일상생활 관련 어휘 확장", "그림카드 활용 언어 지도", "수행 평가"),
    ("5", "사회성 기술 발달", "또래와 함께하는 활동 참여", "소그룹 협동 학습", "행동 관찰 기록"),
    ("6", "자조 기술 향상", "개인 위생 관리 습관 형성", "단계별 시범 및 연습", "일상생활 수행 체크"),
    ("7", "1학기 학습 정리", "학습 내용 복습 및 점검", "개별 피드백 제공", "포트폴리오 평가"),
    ("8", "방학 중 기술 유지", "가정 연계 프로그램 제공", "가정통신문 및 과제", "가정 연계 평가"),
    ("9", "2학기 학습 준비", "새 학기 적응 및 목표 설정", "개별 상담 및 목표 수립", "면담 및 관찰"),
    ("10", "인지 능력 강화", "기본 개념 학습 심화", "구체물 조작 학습", "형성 평가"),
    ("11", "표현력 향상", "자신의 생각과 감정 표현하기", "역할놀이 및 토의", "발표 및 참여도 평가"),
    ("12", "2학기 학습 마무리", "학습 성취 점검 및 정리", "종합 복습 활동", "총괄 평가"),
    ("1", "새해 목표 수립", "다음 학년 준비 활동", "개별 진로 상담", "목표 달성도 평가"),
    ("2", "학년 전환 준비", "상급 학년 적응 프로그램", "전환 교육 실시", "종합 발달 평가"),
];

const SAMPLE_EVALUATIONS: [(&str, &str); 7] = [
    ("8", "방학 중 가정에서 기본 생활습관을 잘 유지하였으며, 가정 연계 활동에 성실히 참여함."),
    ("9", "2학기 새로운 학습 목표에 대한 이해도가 높으며, 학교생활 적응이 양호함."),
    ("10", "기본 개념 학습에 적극적으로 참여하였고, 구체물 조작 능력이 향상됨."),
    ("11", "자신의 생각과 감정을 표현하는 능력이 발전하였으며, 발표 활동에 자신감을 보임."),
    ("12", "2학기 학습 목표를 대부분 달성하였으며, 전반적인 성장이 관찰됨."),
    ("1", "새해 목표를 스스로 설정하였고, 상급 학년에 대한 기대감을 표현함."),
    ("2", "한 해 동안 전반적인 발달이 이루어졌으며, 상급 학년 전환 준비가 양호함."),
];

/// A full school year of plans, March to February.
pub fn sample_plans() -> Vec<PlanRecord> {
    SAMPLE_PLANS
        .iter()
        .map(|(month, goal, content, method, evaluation)| PlanRecord {
            month: Some(MonthValue::new(*month)),
            months: Vec::new(),
            goal: goal.to_string(),
            content: content.to_string(),
            method: method.to_string(),
            evaluation: evaluation.to_string(),
        })
        .collect()
}

/// Second-semester evaluations, August to February.
pub fn sample_evaluations() -> Vec<EvalRecord> {
    SAMPLE_EVALUATIONS
        .iter()
        .map(|(month, text)| EvalRecord::new(*month, *text))
        .collect()
}

/// Sample data for `mode` as pretty JSON, ready to paste back in.
pub fn sample_json(mode: BatchMode) -> Result<String, serde_json::Error> {
    match mode {
        BatchMode::Plans => serde_json::to_string_pretty(&sample_plans()),
        BatchMode::Evaluations => serde_json::to_string_pretty(&sample_evaluations()),
    }
}
