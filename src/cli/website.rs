use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nice_autofill_cli::records::records_from_values;
use nice_autofill_cli::remote::{Scalar, WebsiteClient};
use nice_core_types::PlanRecord;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::emit_output;

#[derive(Args, Clone, Debug)]
pub struct StudentsArgs {
    #[arg(long)]
    pub year: String,

    #[arg(long)]
    pub semester: String,
}

#[derive(Args, Clone, Debug)]
pub struct FetchArgs {
    /// Student id as listed by `students`
    #[arg(long)]
    pub student_id: String,

    #[arg(long)]
    pub year: String,

    #[arg(long)]
    pub semester: String,

    /// Write the records here, ready for `fill-plans --data`
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

fn client(ctx: &CliContext) -> Result<WebsiteClient> {
    let website = &ctx.config().website;
    Ok(WebsiteClient::new(&website.url, website.api_key.clone())?)
}

pub async fn cmd_health(ctx: &CliContext) -> Result<()> {
    client(ctx)?.health().await?;
    println!("웹사이트 연결 성공");
    Ok(())
}

pub async fn cmd_students(args: StudentsArgs, ctx: &CliContext) -> Result<()> {
    let students = client(ctx)?.students(&args.year, &args.semester).await?;
    emit_output(ctx.output(), &students, |students| {
        println!("{}명의 학생을 불러왔습니다", students.len());
        for student in students {
            println!("  [{}] {}", student.id, student);
        }
    })
}

pub async fn cmd_fetch(args: FetchArgs, ctx: &CliContext) -> Result<()> {
    // numeric ids go out as numbers, like the list returned them
    let student_id = match args.student_id.parse::<u64>() {
        Ok(n) => Scalar::Number(n.into()),
        Err(_) => Scalar::Text(args.student_id.clone()),
    };
    let values = client(ctx)?
        .monthly_plans(&student_id, &args.year, &args.semester)
        .await?;
    let records: Vec<PlanRecord> = records_from_values(values)?;

    if let Some(path) = &args.save {
        let serialized = serde_json::to_string_pretty(&records)?;
        fs::write(path, serialized)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(count = records.len(), path = %path.display(), "월별 계획 저장");
    }

    emit_output(ctx.output(), &records, |records| {
        println!("{}개의 월별 계획을 가져왔습니다", records.len());
        for record in records {
            let month = record
                .month
                .as_ref()
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {}월: {}", month, record.goal);
        }
    })
}
