//! Executor behavior against real files: stale-change isolation, size-policy
//! reverts, and backup bookkeeping.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use burnish::adapters::mock::MockBuildRunner;
use burnish::domain::models::{ChangeOp, ChangePlan, PlannedChange, Recommendation, SizePolicy};
use burnish::services::executor::backup_map;
use burnish::services::{ChangeExecutor, VerificationEngine};

fn low_effort_rec(title: &str) -> Recommendation {
    Recommendation {
        dimension: "color".into(),
        title: title.into(),
        description: String::new(),
        impact: 6.0,
        effort: 2.0,
        hint: None,
    }
}

fn change(file: &str, line: usize, line_content: &str, from: &str, to: &str) -> PlannedChange {
    PlannedChange {
        file: file.into(),
        line,
        line_content: line_content.into(),
        op: ChangeOp::ReplaceText {
            from: from.into(),
            to: to.into(),
        },
    }
}

async fn write_file(dir: &Path, name: &str, content: &str) {
    tokio::fs::write(dir.join(name), content)
        .await
        .expect("write file");
}

#[tokio::test]
async fn test_stale_change_is_rejected_without_blocking_others() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(dir.path(), "page.html", "<h1>Title</h1>\n<p>Body</p>\n").await;

    let plan = ChangePlan {
        recommendation: low_effort_rec("copy tweaks"),
        strategy: "text edits".into(),
        expected_impact: 0.3,
        changes: vec![
            // stale: the planner saw different content on line 1
            change("page.html", 1, "<h1>Old Title</h1>", "Old", "New"),
            // valid
            change("page.html", 2, "<p>Body</p>", "Body", "Content"),
        ],
    };

    let executor = ChangeExecutor::new(dir.path(), SizePolicy::default());
    let outcome = executor.execute(&plan).await.expect("execute");

    assert!(outcome.succeeded());
    assert_eq!(outcome.applied.len(), 1);
    assert_eq!(outcome.rejected_changes.len(), 1);
    assert_eq!(outcome.rejected_changes[0].change.line, 1);

    let content = tokio::fs::read_to_string(dir.path().join("page.html"))
        .await
        .expect("read");
    assert_eq!(content, "<h1>Title</h1>\n<p>Content</p>\n");
}

#[tokio::test]
async fn test_size_policy_violation_reverts_every_touched_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let original = "line a\nline b\nline c\n";
    write_file(dir.path(), "a.css", original).await;
    write_file(dir.path(), "b.css", original).await;

    // a tight policy: at most one changed line for low effort
    let policy = SizePolicy {
        low_effort_max_lines: 1,
        ..SizePolicy::default()
    };

    let plan = ChangePlan {
        recommendation: low_effort_rec("too many edits"),
        strategy: "bulk edit".into(),
        expected_impact: 0.3,
        changes: vec![
            change("a.css", 1, "line a", "a", "A"),
            change("b.css", 2, "line b", "b", "B"),
        ],
    };

    let executor = ChangeExecutor::new(dir.path(), policy);
    let outcome = executor.execute(&plan).await.expect("execute");

    assert!(!outcome.succeeded());
    assert!(outcome.applied.is_empty());
    let reason = outcome.plan_rejected.expect("plan should be rejected");
    assert!(reason.contains("limit"));

    // both files are byte-identical to their originals
    for name in ["a.css", "b.css"] {
        let content = tokio::fs::read_to_string(dir.path().join(name))
            .await
            .expect("read");
        assert_eq!(content, original, "{name} was not reverted");
    }
}

#[tokio::test]
async fn test_reverted_plan_does_not_taint_verification_of_applied_plan() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(dir.path(), "good.css", "line a\nline b\n").await;
    write_file(dir.path(), "big.css", "line a\nline b\nline c\n").await;

    // one changed line allowed per low-effort plan
    let policy = SizePolicy {
        low_effort_max_lines: 1,
        ..SizePolicy::default()
    };
    let executor = ChangeExecutor::new(dir.path(), policy);

    let passing = ChangePlan {
        recommendation: low_effort_rec("small win"),
        strategy: "text edit".into(),
        expected_impact: 0.3,
        changes: vec![change("good.css", 1, "line a", "a", "A")],
    };
    let oversized = ChangePlan {
        recommendation: low_effort_rec("too much"),
        strategy: "bulk edit".into(),
        expected_impact: 0.3,
        changes: vec![
            change("big.css", 1, "line a", "a", "A"),
            change("big.css", 2, "line b", "b", "B"),
        ],
    };

    let applied = executor.execute(&passing).await.expect("execute");
    let reverted = executor.execute(&oversized).await.expect("execute");
    assert!(applied.succeeded());
    assert!(!reverted.succeeded());

    // the claim set covers only the successful plan's files
    let pre_change = backup_map(&[applied, reverted]);
    assert_eq!(pre_change.len(), 1);
    assert!(pre_change.contains_key(Path::new("good.css")));

    let engine = VerificationEngine::new(
        Arc::new(MockBuildRunner::passing()),
        None,
        Duration::from_secs(5),
    );
    let result = engine.verify(dir.path(), &pre_change).await.expect("verify");
    assert!(result.files_modified);
    assert!(result.success);
}

#[tokio::test]
async fn test_backups_capture_pre_write_content_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let original = "alpha\nbeta\n";
    write_file(dir.path(), "notes.css", original).await;

    let plan = ChangePlan {
        recommendation: low_effort_rec("two edits one file"),
        strategy: "text edits".into(),
        expected_impact: 0.3,
        changes: vec![
            change("notes.css", 1, "alpha", "alpha", "ALPHA"),
            change("notes.css", 2, "beta", "beta", "BETA"),
        ],
    };

    let executor = ChangeExecutor::new(dir.path(), SizePolicy::default());
    let outcome = executor.execute(&plan).await.expect("execute");

    assert!(outcome.succeeded());
    assert_eq!(outcome.applied.len(), 2);
    // one backup entry per file, holding the content before the first write
    assert_eq!(outcome.backups.len(), 1);
    assert_eq!(outcome.backups[0].1, original);

    let content = tokio::fs::read_to_string(dir.path().join("notes.css"))
        .await
        .expect("read");
    assert_eq!(content, "ALPHA\nBETA\n");
}

#[tokio::test]
async fn test_unanchored_op_is_a_per_change_rejection() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(dir.path(), "nav.html", "<a class=\"link\">Docs</a>\n").await;

    let plan = ChangePlan {
        recommendation: low_effort_rec("focus ring"),
        strategy: "attribute edit".into(),
        expected_impact: 0.2,
        changes: vec![PlannedChange {
            file: "nav.html".into(),
            line: 1,
            line_content: "<a class=\"link\">Docs</a>".into(),
            op: ChangeOp::ReplaceAttributeValue {
                attribute: "id".into(),
                from: "nav".into(),
                to: "main-nav".into(),
            },
        }],
    };

    let executor = ChangeExecutor::new(dir.path(), SizePolicy::default());
    let outcome = executor.execute(&plan).await.expect("execute");

    assert!(!outcome.succeeded());
    assert_eq!(outcome.rejected_changes.len(), 1);
    assert!(outcome.rejected_changes[0].reason.contains("not found"));

    let content = tokio::fs::read_to_string(dir.path().join("nav.html"))
        .await
        .expect("read");
    assert_eq!(content, "<a class=\"link\">Docs</a>\n");
}
