use std::fmt::Write as _;

use nestbuffer_core::{PassReport, PlannedPass, PurgeReport, SyncError};
use serde_json::{json, Value};

fn failures_json(failures: &[SyncError]) -> Value {
    failures.iter().map(|f| json!({"kind": f.kind(), "message": f.to_string()})).collect()
}

fn push_failures(out: &mut String, failures: &[SyncError]) {
    for failure in failures {
        let _ = write!(out, "\n  - [{}] {failure}", failure.kind());
    }
}

/// Summary of a completed pass.
pub fn render_pass(report: &PassReport, as_json: bool) -> String {
    if as_json {
        return json!({
            "pass_id": report.pass_id.to_string(),
            "started_at": report.started_at.to_rfc3339(),
            "finished_at": report.finished_at.to_rfc3339(),
            "points_fetched": report.points_fetched,
            "buffers_fetched": report.buffers_fetched,
            "preserved": report.preserved,
            "deleted": report.deleted,
            "created": report.created,
            "failures": failures_json(&report.failures),
        })
        .to_string();
    }

    let mut out = format!(
        "pass {}: {} points, {} buffers; preserved {}, deleted {}, created {} in {} ms",
        report.pass_id,
        report.points_fetched,
        report.buffers_fetched,
        report.preserved,
        report.deleted.len(),
        report.created.len(),
        report.elapsed().num_milliseconds(),
    );
    if !report.is_clean() {
        let _ = write!(out, "\n{} failure(s):", report.failures.len());
        push_failures(&mut out, &report.failures);
    }
    out
}

/// Summary of a dry run.
pub fn render_plan(planned: &PlannedPass, as_json: bool) -> String {
    let plan = &planned.plan;
    let create: Vec<i64> = plan.to_create.iter().map(|pending| pending.orig_fid()).collect();

    if as_json {
        return json!({
            "points_fetched": planned.points_fetched,
            "buffers_fetched": planned.buffers_fetched,
            "preserve": plan.preserve,
            "delete": plan.to_delete,
            "create_for": create,
        })
        .to_string();
    }

    if plan.is_empty() {
        return format!(
            "buffer layer is in sync ({} points, {} buffers preserved)",
            planned.points_fetched,
            plan.preserve.len()
        );
    }
    format!(
        "would preserve {}, delete {} {:?}, create {} for survey points {:?}",
        plan.preserve.len(),
        plan.to_delete.len(),
        plan.to_delete,
        create.len(),
        create
    )
}

/// Summary of a purge.
pub fn render_purge(report: &PurgeReport) -> String {
    let mut out = format!("deleted {} of {} buffers", report.deleted.len(), report.buffers_fetched);
    if !report.failures.is_empty() {
        let _ = write!(out, "\n{} failure(s):", report.failures.len());
        push_failures(&mut out, &report.failures);
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use nestbuffer_core::ReconcilePlan;
    use nestbuffer_domain::NestBufferError;
    use uuid::Uuid;

    use super::*;

    fn report(failures: Vec<SyncError>) -> PassReport {
        let started_at = Utc::now();
        PassReport {
            pass_id: Uuid::nil(),
            started_at,
            finished_at: started_at + Duration::milliseconds(1500),
            points_fetched: 3,
            buffers_fetched: 4,
            preserved: 1,
            deleted: vec![20, 40],
            created: vec![1001],
            failures,
        }
    }

    #[test]
    fn clean_pass_is_one_line() {
        let text = render_pass(&report(vec![]), false);
        assert_eq!(
            text,
            "pass 00000000-0000-0000-0000-000000000000: 3 points, 4 buffers; \
             preserved 1, deleted 2, created 1 in 1500 ms"
        );
    }

    #[test]
    fn failures_are_listed_with_kind() {
        let failure = SyncError::Geometry { orig_fid: 7, source: NestBufferError::Remote("boom".into()) };
        let text = render_pass(&report(vec![failure]), false);
        assert!(text.contains("1 failure(s):"));
        assert!(text.contains("[geometry] buffer geometry failed for survey point 7"));
    }

    #[test]
    fn json_pass_report_has_counts_and_failures() {
        let failure = SyncError::CreationRecord { orig_fid: 2, reason: "rejected".into() };
        let value: Value = serde_json::from_str(&render_pass(&report(vec![failure]), true)).unwrap();

        assert_eq!(value["deleted"], json!([20, 40]));
        assert_eq!(value["failures"][0]["kind"], "creation_record");
    }

    #[test]
    fn empty_plan_reports_in_sync() {
        let planned = PlannedPass { points_fetched: 2, buffers_fetched: 2, plan: ReconcilePlan::default() };
        assert!(render_plan(&planned, false).starts_with("buffer layer is in sync"));
    }

    #[test]
    fn purge_summary_counts_deletions() {
        let report = PurgeReport { buffers_fetched: 3, deleted: vec![1, 2, 3], failures: vec![] };
        assert_eq!(render_purge(&report), "deleted 3 of 3 buffers");
    }
}
