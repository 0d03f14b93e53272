use super::{exit_codes, print_json, runnable_service, Session};
use crate::cli::args::{DownloadArgs, RunIdArgs, SetIdArgs};
use anyhow::Context;
use scorecard_core::report::{console, ExportFormat};
use serde_json::json;
use std::path::PathBuf;

pub async fn cmd_run(session: &Session, args: SetIdArgs) -> anyhow::Result<i32> {
    let service = runnable_service(session)?;
    let summary = service.run_test_set(args.set_id).await?;

    let rows = service.get_run_rows(summary.test_run_id)?;
    console::print_run(&summary, &rows);
    print_json(&summary)?;

    if summary.failed_count > 0 {
        Ok(exit_codes::TEST_FAILED)
    } else {
        Ok(exit_codes::OK)
    }
}

pub fn cmd_runs(session: &Session, args: SetIdArgs) -> anyhow::Result<i32> {
    let runs = session.service.list_runs_for_set(args.set_id)?;
    print_json(&runs)?;
    Ok(exit_codes::OK)
}

pub fn cmd_run_info(session: &Session, args: RunIdArgs) -> anyhow::Result<i32> {
    let run = session.service.get_run(args.run_id)?;
    print_json(&run)?;
    Ok(exit_codes::OK)
}

pub fn cmd_rows(session: &Session, args: RunIdArgs) -> anyhow::Result<i32> {
    let rows = session.service.get_run_rows(args.run_id)?;
    print_json(&rows)?;
    Ok(exit_codes::OK)
}

pub async fn cmd_download(session: &Session, args: DownloadArgs) -> anyhow::Result<i32> {
    let format = ExportFormat::parse(&args.format);
    let file = session.service.download_run_rows(args.run_id, format)?;
    let path = args.out.unwrap_or_else(|| PathBuf::from(&file.filename));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    tracing::info!(
        event = "scorecard.download",
        run_id = args.run_id,
        path = %path.display(),
        bytes = file.bytes.len(),
    );
    print_json(&json!({
        "path": path.display().to_string(),
        "filename": file.filename,
        "content_type": file.content_type,
        "bytes": file.bytes.len(),
    }))?;
    Ok(exit_codes::OK)
}
