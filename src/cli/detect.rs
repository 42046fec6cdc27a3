use anyhow::Result;
use nice_autofill_cli::content::RuntimeMessage;
use nice_autofill_cli::tab::send_with_reinject;
use serde_json::Value;

use crate::cli::context::CliContext;
use crate::cli::output::emit_output;

pub async fn cmd_detect(ctx: &CliContext) -> Result<()> {
    let session = ctx.connect_tab().await?;
    let reply = send_with_reinject(session.tab.as_ref(), &RuntimeMessage::GetPageType).await?;

    emit_output(ctx.output(), &reply, |reply| {
        match reply.get("pageType").and_then(Value::as_str) {
            Some("plan") => println!("페이지 유형: 월별계획"),
            Some("evaluation") => println!("페이지 유형: 월별평가"),
            _ => println!("페이지 유형을 감지할 수 없습니다"),
        }
    })
}
