use std::path::PathBuf;

use action_flow::{BatchMode, BatchPayload, BatchResult, StudentFilter};
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use nice_autofill_cli::background::RelayUpdate;
use nice_autofill_cli::content::RuntimeMessage;
use nice_autofill_cli::records::{parse_records, sample_evaluations, sample_plans, LooseRecord};
use nice_autofill_cli::tab::send_with_reinject;
use nice_core_types::{EvalRecord, InputConfig, PlanRecord, Speed};
use nice_event_bus::{emit, NotifyLevel, StatusEvent};
use serde_json::Value;
use tokio::fs;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::cli::output::{emit_output, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct FillArgs {
    /// JSON file with the records
    #[arg(long, value_name = "FILE", required_unless_present = "sample", conflicts_with = "sample")]
    pub data: Option<PathBuf>,

    /// Use the built-in sample records
    #[arg(long)]
    pub sample: bool,

    /// Typing speed: fast, normal or slow
    #[arg(long)]
    pub speed: Option<Speed>,

    /// Type in small random chunks like a person
    #[arg(long, value_name = "BOOL")]
    pub human_mode: Option<bool>,

    /// Select this student before filling
    #[arg(long)]
    pub student_name: Option<String>,

    /// Class number of the student
    #[arg(long)]
    pub student_number: Option<String>,

    /// Run the page-load initialization before sending the batch
    #[arg(long)]
    pub wait_ready: bool,
}

impl FillArgs {
    fn input_config(&self, defaults: InputConfig) -> InputConfig {
        InputConfig {
            speed: self.speed.unwrap_or(defaults.speed),
            human_mode: self.human_mode.unwrap_or(defaults.human_mode),
        }
    }

    /// Names given on the command line win over the data file.
    fn filter(&self, from_file: StudentFilter) -> StudentFilter {
        StudentFilter {
            student_name: self.student_name.clone().or(from_file.student_name),
            student_number: self.student_number.clone().or(from_file.student_number),
        }
    }
}

pub async fn cmd_fill_plans(args: FillArgs, ctx: &CliContext) -> Result<()> {
    let payload = build_payload(&args, ctx, sample_plans).await?;
    run_fill(
        BatchMode::Plans,
        RuntimeMessage::FillMonthlyPlans { data: payload },
        &args,
        ctx,
    )
    .await
}

pub async fn cmd_fill_evals(args: FillArgs, ctx: &CliContext) -> Result<()> {
    let payload = build_payload(&args, ctx, sample_evaluations).await?;
    run_fill(
        BatchMode::Evaluations,
        RuntimeMessage::FillMonthlyEvaluations { data: payload },
        &args,
        ctx,
    )
    .await
}

async fn build_payload<R: LooseRecord>(
    args: &FillArgs,
    ctx: &CliContext,
    sample: fn() -> Vec<R>,
) -> Result<BatchPayload<R>> {
    let (records, file_filter) = match &args.data {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let parsed = parse_records::<R>(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            (parsed.records, parsed.filter)
        }
        None => (sample(), StudentFilter::default()),
    };
    info!(count = records.len(), "입력 데이터 준비 완료");

    let filter = args.filter(file_filter);
    let payload = BatchPayload::new(records, args.input_config(ctx.config().input));
    Ok(if filter.is_empty() {
        payload
    } else {
        payload.with_filters(filter)
    })
}

async fn run_fill(
    mode: BatchMode,
    message: RuntimeMessage,
    args: &FillArgs,
    ctx: &CliContext,
) -> Result<()> {
    let session = ctx.connect_tab().await?;

    if args.wait_ready {
        let runtime = session.tab.attach()?;
        if !runtime.on_page_load().await {
            bail!("페이지 초기화에 실패했습니다");
        }
    }

    let mut updates = session.relay.subscribe();
    let show_progress = ctx.output() == OutputFormat::Human;
    let progress = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(RelayUpdate::ProgressUpdate { data }) => {
                    if show_progress {
                        println!("진행: {}/{}", data.current, data.total);
                    }
                }
                Ok(RelayUpdate::Notification { .. }) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let reply = send_with_reinject(session.tab.as_ref(), &message).await;
    progress.abort();
    let reply = reply?;

    let outcome = match serde_json::from_value::<BatchResult>(reply.clone()) {
        Ok(result) => Ok(result),
        Err(_) => Err(error_of(&reply)),
    };

    let (level, summary) = match &outcome {
        Ok(result) if result.success => (
            NotifyLevel::Success,
            format!(
                "{} 자동입력 완료: {}/{}",
                label(mode),
                result.success_count,
                result.total_count
            ),
        ),
        Ok(result) => (
            NotifyLevel::Warning,
            format!(
                "{} 일부 실패: {}/{} 성공",
                label(mode),
                result.success_count,
                result.total_count
            ),
        ),
        Err(error) => (NotifyLevel::Error, format!("자동입력 실패: {error}")),
    };
    emit(session.bus.as_ref(), StatusEvent::notify("", summary.clone(), level)).await;

    emit_output(ctx.output(), &reply, |_| {
        println!("{summary}");
        if let Ok(result) = &outcome {
            for (index, record) in result.results.iter().enumerate() {
                if let Some(error) = &record.error {
                    println!("  {}번째 항목 실패: {}", index + 1, error);
                }
            }
        }
    })?;

    match outcome {
        Ok(result) if result.cancelled => {
            warn!("사용자가 일괄 입력을 취소했습니다");
            Ok(())
        }
        Ok(result) if result.success => Ok(()),
        Ok(_) => bail!(summary),
        Err(error) => Err(anyhow!(error)),
    }
}

fn label(mode: BatchMode) -> &'static str {
    match mode {
        BatchMode::Plans => "월별계획",
        BatchMode::Evaluations => "월별평가",
    }
}

fn error_of(reply: &Value) -> String {
    reply
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("알 수 없는 오류")
        .to_string()
}
