//! Client for the companion website that stores students and monthly plans.

use std::fmt;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use url::Url;

use crate::errors::RemoteError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A number or a string; the website is not consistent about ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Text(String::new())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: Scalar,
    pub name: String,
    #[serde(default)]
    pub grade: Scalar,
    #[serde(default)]
    pub class: Scalar,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}학년 {}반)", self.name, self.grade, self.class)
    }
}

pub struct WebsiteClient {
    http: reqwest::Client,
    base: String,
    api_key: String,
}

impl WebsiteClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, RemoteError> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(RemoteError::MissingUrl);
        }
        Url::parse(base)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: base.to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        Ok(Url::parse(&format!("{}{}", self.base, path))?)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// `GET /api/health`.
    #[instrument(skip_all, fields(base = %self.base))]
    pub async fn health(&self) -> Result<(), RemoteError> {
        let response = self
            .http
            .get(self.endpoint("/api/health")?)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "health check rejected");
            return Err(RemoteError::Health);
        }
        info!("웹사이트 연결 테스트 성공");
        Ok(())
    }

    /// `GET /api/students?year=&semester=`.
    #[instrument(skip_all, fields(year = %year, semester = %semester))]
    pub async fn students(&self, year: &str, semester: &str) -> Result<Vec<Student>, RemoteError> {
        let mut url = self.endpoint("/api/students")?;
        url.query_pairs_mut()
            .append_pair("year", year)
            .append_pair("semester", semester);
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.bearer())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "student list rejected");
            return Err(RemoteError::Students);
        }
        let students: Vec<Student> = response.json().await?;
        info!(count = students.len(), "학생 목록 불러오기 성공");
        Ok(students)
    }

    /// `POST /api/monthly-plans`. Records come back as loose JSON objects.
    #[instrument(skip_all, fields(student = %student_id))]
    pub async fn monthly_plans(
        &self,
        student_id: &Scalar,
        year: &str,
        semester: &str,
    ) -> Result<Vec<Value>, RemoteError> {
        let response = self
            .http
            .post(self.endpoint("/api/monthly-plans")?)
            .header(AUTHORIZATION, self.bearer())
            .json(&json!({
                "studentId": student_id,
                "year": year,
                "semester": semester,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "monthly plans rejected");
            return Err(RemoteError::MonthlyPlans);
        }
        let plans: Vec<Value> = response.json().await?;
        info!(count = plans.len(), "데이터 가져오기 성공");
        Ok(plans)
    }
}
