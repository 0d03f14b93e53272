use super::{exit_codes, print_json, Session};
use crate::cli::args::{SetIdArgs, SetsArgs, UploadArgs};
use anyhow::Context;
use scorecard_core::model::TestSetFilter;

pub async fn cmd_upload(session: &Session, args: UploadArgs) -> anyhow::Result<i32> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    let summary = session.service.upload_test_set(
        &bytes,
        &filename,
        args.name.as_deref(),
        args.project.as_deref(),
    )?;
    eprintln!(
        "uploaded {} as test set #{} ({} cases)",
        summary.filename, summary.test_set_id, summary.test_case_count
    );
    print_json(&summary)?;
    Ok(exit_codes::OK)
}

pub fn cmd_sets(session: &Session, args: SetsArgs) -> anyhow::Result<i32> {
    let sets = session.service.list_test_sets(&TestSetFilter {
        keywords: args.keywords,
        offset: args.offset,
        limit: args.limit,
    })?;
    print_json(&sets)?;
    Ok(exit_codes::OK)
}

pub fn cmd_show(session: &Session, args: SetIdArgs) -> anyhow::Result<i32> {
    let detail = session.service.get_test_set(args.set_id)?;
    print_json(&detail)?;
    Ok(exit_codes::OK)
}
