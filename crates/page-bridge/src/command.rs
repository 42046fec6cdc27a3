//! Bridge actions as a closed command set.

use nice_core_types::{InputConfigPatch, MonthKeyed, MonthValue, PageType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::BridgeError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectMonthPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<MonthValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<MonthValue>,
    #[serde(default)]
    pub row_index: Option<i64>,
}

impl MonthKeyed for SelectMonthPayload {
    fn month(&self) -> Option<&MonthValue> {
        self.month.as_ref()
    }

    fn months(&self) -> &[MonthValue] {
        &self.months
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFieldsPayload {
    #[serde(default)]
    pub row_index: Option<i64>,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub evaluation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<InputConfigPatch>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SetEvalTextPayload {
    #[serde(default)]
    pub eval_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<InputConfigPatch>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRowByMonthPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<MonthValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<MonthValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<InputConfigPatch>,
    #[serde(default)]
    pub is_first: bool,
}

impl MonthKeyed for SelectRowByMonthPayload {
    fn month(&self) -> Option<&MonthValue> {
        self.month.as_ref()
    }

    fn months(&self) -> &[MonthValue] {
        &self.months
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRowByIndexPayload {
    /// Zero based; missing or negative selects nothing.
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<InputConfigPatch>,
    #[serde(default)]
    pub is_first: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsureStudentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

/// Every action the page side understands.
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeCommand {
    EnsureApp,
    DetectPageType,
    AddRow,
    SelectMonth(SelectMonthPayload),
    SetFields(SetFieldsPayload),
    SetEvalText(SetEvalTextPayload),
    SelectRowByMonth(SelectRowByMonthPayload),
    SelectRowByIndex(SelectRowByIndexPayload),
    Save,
    EnsureStudent(EnsureStudentPayload),
}

impl BridgeCommand {
    /// Wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            BridgeCommand::EnsureApp => "ensureApp",
            BridgeCommand::DetectPageType => "detectPageType",
            BridgeCommand::AddRow => "addRow",
            BridgeCommand::SelectMonth(_) => "selectMonth",
            BridgeCommand::SetFields(_) => "setFields",
            BridgeCommand::SetEvalText(_) => "setEvalText",
            BridgeCommand::SelectRowByMonth(_) => "selectRowByMonth",
            BridgeCommand::SelectRowByIndex(_) => "selectRowByIndex",
            BridgeCommand::Save => "save",
            BridgeCommand::EnsureStudent(_) => "ensureStudent",
        }
    }

    /// Payload object sent with the action; `{}` for bare actions.
    pub fn payload(&self) -> Result<Value, BridgeError> {
        let value = match self {
            BridgeCommand::EnsureApp
            | BridgeCommand::DetectPageType
            | BridgeCommand::AddRow
            | BridgeCommand::Save => json!({}),
            BridgeCommand::SelectMonth(p) => serde_json::to_value(p)?,
            BridgeCommand::SetFields(p) => serde_json::to_value(p)?,
            BridgeCommand::SetEvalText(p) => serde_json::to_value(p)?,
            BridgeCommand::SelectRowByMonth(p) => serde_json::to_value(p)?,
            BridgeCommand::SelectRowByIndex(p) => serde_json::to_value(p)?,
            BridgeCommand::EnsureStudent(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }

    /// Parse an incoming action; unknown names are [`BridgeError::Unsupported`].
    pub fn parse(action: &str, payload: Value) -> Result<Self, BridgeError> {
        let payload = if payload.is_null() { json!({}) } else { payload };
        let command = match action {
            "ensureApp" => BridgeCommand::EnsureApp,
            "detectPageType" => BridgeCommand::DetectPageType,
            "addRow" => BridgeCommand::AddRow,
            "save" => BridgeCommand::Save,
            "selectMonth" => BridgeCommand::SelectMonth(decode(action, payload)?),
            "setFields" => BridgeCommand::SetFields(decode(action, payload)?),
            "setEvalText" => BridgeCommand::SetEvalText(decode(action, payload)?),
            "selectRowByMonth" => BridgeCommand::SelectRowByMonth(decode(action, payload)?),
            "selectRowByIndex" => BridgeCommand::SelectRowByIndex(decode(action, payload)?),
            "ensureStudent" => BridgeCommand::EnsureStudent(decode(action, payload)?),
            other => return Err(BridgeError::Unsupported(other.to_string())),
        };
        Ok(command)
    }
}

fn decode<T: serde::de::DeserializeOwned>(action: &str, payload: Value) -> Result<T, BridgeError> {
    serde_json::from_value(payload).map_err(|err| BridgeError::InvalidPayload {
        action: action.to_string(),
        reason: err.to_string(),
    })
}

/// `detectPageType` result; `None` when the screen is neither page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTypeResult {
    pub page_type: Option<PageType>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedStudent {
    pub index: u64,
    pub name: String,
    pub number: String,
}

/// `ensureStudent` result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSelection {
    pub selected: Option<SelectedStudent>,
}
