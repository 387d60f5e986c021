use chrono::{DateTime, Utc};
use tidier_core::{classify_staleness, inactivity_days, Staleness, TidierConfig};
use tidier_github_issues::{
    IssueCloser, IssueKind, IssueRef, IssueState, IssueTracker, LabeledIssue, TrackerError,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `ActionOutcome` values.
pub enum ActionOutcome {
    ClosedWithComment,
    WouldClose,
    LabelRemovedFromClosed,
    WouldRemoveLabel,
    NotYetStale,
    /// Closed item whose label is already gone; nothing to do.
    NoOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `ActionStep` values.
pub enum ActionStep {
    Close,
    Comment,
    RemoveLabel,
}

impl ActionStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Comment => "comment",
            Self::RemoveLabel => "remove label",
        }
    }
}

/// A mutation sequence that stopped part way. Completed steps are not
/// rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub step: ActionStep,
    pub completed: Vec<ActionStep>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `IssueReport` used across Tidier components.
pub struct IssueReport {
    pub issue: IssueRef,
    pub kind: IssueKind,
    pub title: String,
    pub state: IssueState,
    pub age_days: i64,
    pub result: Result<ActionOutcome, ActionFailure>,
}

impl IssueReport {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Everything one issue action needs; `now` is fixed for the whole run.
pub struct ActionContext<'a> {
    pub tracker: &'a dyn IssueTracker,
    pub closer: &'a dyn IssueCloser,
    pub config: &'a TidierConfig,
    pub now: DateTime<Utc>,
}

pub fn execute_issue_action(ctx: &ActionContext<'_>, issue: &LabeledIssue) -> IssueReport {
    let age_days = inactivity_days(ctx.now, issue.updated_at);
    let for_real = ctx.config.for_real();
    let result = match issue.state {
        IssueState::Open => match classify_staleness(age_days, ctx.config.num_days()) {
            Staleness::Fresh => Ok(ActionOutcome::NotYetStale),
            Staleness::Stale if !for_real => Ok(ActionOutcome::WouldClose),
            Staleness::Stale => close_with_comment(ctx, &issue.issue),
        },
        IssueState::Closed if !issue.has_label(ctx.config.label()) => Ok(ActionOutcome::NoOp),
        IssueState::Closed if !for_real => Ok(ActionOutcome::WouldRemoveLabel),
        IssueState::Closed => remove_label_from_closed(ctx, &issue.issue),
    };

    match &result {
        Ok(outcome) => info!(
            issue = %issue.issue,
            age_days,
            outcome = ?outcome,
            "issue processed"
        ),
        Err(failure) => warn!(
            issue = %issue.issue,
            step = failure.step.as_str(),
            error = %failure.message,
            "issue action failed"
        ),
    }

    IssueReport {
        issue: issue.issue.clone(),
        kind: issue.kind,
        title: issue.title.clone(),
        state: issue.state,
        age_days,
        result,
    }
}

/// Close, then comment, then unlabel; stops at the first failed step.
fn close_with_comment(
    ctx: &ActionContext<'_>,
    issue: &IssueRef,
) -> Result<ActionOutcome, ActionFailure> {
    let mut completed = Vec::new();
    run_step(ActionStep::Close, &mut completed, || {
        ctx.closer.close_issue(issue)
    })?;
    run_step(ActionStep::Comment, &mut completed, || {
        ctx.tracker
            .create_comment(issue, ctx.config.comment_text())
    })?;
    run_step(ActionStep::RemoveLabel, &mut completed, || {
        ctx.tracker.remove_label(issue, ctx.config.label())
    })?;
    Ok(ActionOutcome::ClosedWithComment)
}

fn remove_label_from_closed(
    ctx: &ActionContext<'_>,
    issue: &IssueRef,
) -> Result<ActionOutcome, ActionFailure> {
    let mut completed = Vec::new();
    run_step(ActionStep::RemoveLabel, &mut completed, || {
        ctx.tracker.remove_label(issue, ctx.config.label())
    })?;
    Ok(ActionOutcome::LabelRemovedFromClosed)
}

fn run_step<F>(
    step: ActionStep,
    completed: &mut Vec<ActionStep>,
    action: F,
) -> Result<(), ActionFailure>
where
    F: FnOnce() -> Result<(), TrackerError>,
{
    match action() {
        Ok(()) => {
            completed.push(step);
            Ok(())
        }
        Err(error) => Err(ActionFailure {
            step,
            completed: completed.clone(),
            message: error.to_string(),
        }),
    }
}
