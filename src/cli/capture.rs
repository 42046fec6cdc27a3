use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Args;
use dom_snapshot::SnapshotOptions;
use nice_autofill_cli::content::RuntimeMessage;
use nice_autofill_cli::tab::send_with_reinject;
use serde_json::Value;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug, Default)]
pub struct CaptureArgs {
    /// CSS selector of the subtree to capture (default: body)
    #[arg(long)]
    pub root: Option<String>,

    #[arg(long)]
    pub max_depth: Option<usize>,

    #[arg(long)]
    pub max_nodes: Option<usize>,

    /// Longest text or label kept per node, in characters
    #[arg(long)]
    pub text_max_length: Option<usize>,

    /// Skip elements hidden with display or visibility
    #[arg(long)]
    pub skip_hidden: bool,

    #[arg(long)]
    pub no_attributes: bool,

    #[arg(long)]
    pub no_labels: bool,

    #[arg(long)]
    pub no_frames: bool,

    /// Where to write the snapshot (default: nice-dom-<timestamp>.json)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl CaptureArgs {
    /// Start from the configured defaults; zero limits are ignored.
    fn options(&self, defaults: &SnapshotOptions) -> SnapshotOptions {
        let positive = |value: Option<usize>, fallback: usize| {
            value.filter(|v| *v > 0).unwrap_or(fallback)
        };
        SnapshotOptions {
            root_selector: self
                .root
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| defaults.root_selector.clone()),
            max_depth: positive(self.max_depth, defaults.max_depth),
            max_nodes: positive(self.max_nodes, defaults.max_nodes),
            text_max_length: positive(self.text_max_length, defaults.text_max_length),
            include_hidden: defaults.include_hidden && !self.skip_hidden,
            include_attributes: defaults.include_attributes && !self.no_attributes,
            include_label: defaults.include_label && !self.no_labels,
            include_frames: defaults.include_frames && !self.no_frames,
            include_text: true,
        }
    }
}

/// `nice-dom-<RFC 3339 time with ':' and '.' replaced>.json`.
fn default_file_name() -> String {
    let stamp = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(&[':', '.'][..], "-");
    format!("nice-dom-{stamp}.json")
}

pub async fn cmd_capture(args: CaptureArgs, ctx: &CliContext) -> Result<()> {
    let options = args.options(&ctx.config().capture);
    let session = ctx.connect_tab().await?;
    let reply = send_with_reinject(
        session.tab.as_ref(),
        &RuntimeMessage::CaptureDomStructure { options },
    )
    .await?;

    if reply.get("success").and_then(Value::as_bool) != Some(true) {
        let error = reply
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("DOM 캡처 실패");
        bail!("DOM 캡처 실패: {error}");
    }
    let snapshot = reply.get("data").cloned().unwrap_or(Value::Null);

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_file_name()));
    let serialized = serde_json::to_string_pretty(&snapshot)?;
    fs::write(&path, serialized)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    let total = snapshot.get("totalNodes").and_then(Value::as_u64).unwrap_or(0);
    info!(total_nodes = total, path = %path.display(), "DOM 캡처 저장 완료");
    println!("DOM 구조를 {}에 저장했습니다 ({total}개 노드)", path.display());
    if snapshot.get("exceededLimit").and_then(Value::as_bool) == Some(true) {
        println!("노드 수 제한에 도달하여 일부만 저장되었습니다");
    }
    Ok(())
}
