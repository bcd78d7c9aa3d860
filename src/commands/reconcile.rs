//! plan, apply, refresh and destroy

use anyhow::{Result, bail};
use declarative::{
    AutoConfirm, ConfirmCallback, ExecuteOptions, ExecuteReport, PlanOutcome, ProgressCallback,
    ReconcileContext, apply_all, plan_all,
};
use pushover::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::Context;
use crate::config::PushsyncConfig;
use crate::engine::executor::{PromptConfirm, print_failures, print_skipped, print_summary};
use crate::engine::{Mode, build_units, differ};
use crate::progress::ApplyProgress;
use crate::resource::Tracked;
use crate::state::PushsyncState;
use crate::ui;

/// Options for `apply` and `destroy`
#[derive(Debug, Clone, Default)]
pub struct ApplyArgs {
    pub target: Option<String>,
    pub dry_run: bool,
    pub yes: bool,
    pub jobs: Option<usize>,
    pub fail_fast: bool,
    pub deadline_secs: Option<u64>,
}

/// Loaded configuration, state and client for one run
pub struct Workspace {
    pub config: PushsyncConfig,
    pub state: PushsyncState,
    pub state_path: PathBuf,
    pub client: Arc<Client>,
}

impl Workspace {
    pub fn open(ctx: &Context) -> Result<Self> {
        let config_path = PushsyncConfig::path(ctx.config.as_deref())?;
        let config = PushsyncConfig::load(&config_path)?;
        let state_path = PushsyncState::default_path()?;
        let state = PushsyncState::load(&state_path)?;
        let client = Arc::new(config.client()?);
        Ok(Self {
            config,
            state,
            state_path,
            client,
        })
    }

    fn reconcile_context(&self, deadline_secs: Option<u64>) -> ReconcileContext {
        let ctx = ReconcileContext::new().with_call_timeout(self.config.call_timeout());
        match deadline_secs {
            Some(secs) => ctx.with_deadline(Instant::now() + Duration::from_secs(secs)),
            None => ctx,
        }
    }

    /// Refresh and classify every selected entity
    pub fn plan(
        &self,
        rctx: &ReconcileContext,
        mode: Mode,
        target: Option<&str>,
        jobs: usize,
    ) -> Result<Vec<PlanOutcome<Tracked>>> {
        let units = build_units(&self.config, &self.state, &self.client, mode, target);
        if units.is_empty()
            && let Some(t) = target
        {
            bail!("No entities match target '{t}'");
        }
        plan_all(&units, rctx, jobs)
    }

    /// Plan, confirm, apply and persist
    pub fn converge<P, C>(
        &mut self,
        mode: Mode,
        args: &ApplyArgs,
        progress: &P,
        confirm: &mut C,
    ) -> Result<ExecuteReport<Tracked>>
    where
        P: ProgressCallback,
        C: ConfirmCallback,
    {
        let rctx = self.reconcile_context(args.deadline_secs);
        let jobs = args.jobs.unwrap_or_else(|| self.config.jobs());
        let plans = self.plan(&rctx, mode, args.target.as_deref(), jobs)?;
        differ::display_plan(&plans);

        let opts = ExecuteOptions {
            dry_run: args.dry_run,
            jobs,
            fail_fast: args.fail_fast,
        };
        let report = apply_all(plans, &rctx, &opts, progress, confirm)?;

        if !args.dry_run {
            for outcome in &report.outcomes {
                self.state.record(&outcome.address, outcome.record.clone());
            }
            self.state.touch();
            self.state.save(&self.state_path)?;
        }
        Ok(report)
    }

    /// Re-read every tracked entity and persist what was found
    pub fn refresh(&mut self, target: Option<&str>) -> Result<Vec<PlanOutcome<Tracked>>> {
        let rctx = self.reconcile_context(None);
        let plans = self.plan(&rctx, Mode::Converge, target, self.config.jobs())?;
        for plan in &plans {
            match plan {
                PlanOutcome::Planned(unit) => {
                    self.state.record(unit.address(), unit.refreshed());
                }
                PlanOutcome::Failed { failure, .. } => {
                    log::warn!("Keeping prior record: {failure}");
                }
            }
        }
        self.state.touch();
        self.state.save(&self.state_path)?;
        Ok(plans)
    }
}

pub fn plan(ctx: &Context, target: Option<&str>) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let rctx = ws.reconcile_context(None);
    let plans = ws.plan(&rctx, Mode::Converge, target, ws.config.jobs())?;
    differ::display_plan(&plans);
    Ok(())
}

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    converge(ctx, ws, Mode::Converge, args)
}

pub fn destroy(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    if ws.state.is_empty() {
        ui::success("Nothing tracked, nothing to destroy");
        return Ok(());
    }
    converge(ctx, ws, Mode::Destroy, args)
}

fn converge(ctx: &Context, mut ws: Workspace, mode: Mode, args: &ApplyArgs) -> Result<()> {
    let progress = ApplyProgress::new(ctx.quiet);

    let report = if args.yes {
        ws.converge(mode, args, &progress, &mut AutoConfirm)?
    } else {
        ws.converge(mode, args, &progress, &mut PromptConfirm)?
    };

    print_skipped(&report.outcomes);
    print_failures(&report);
    if report.summary.total_changes() > 0 || report.summary.failed > 0 {
        print_summary(&report.summary);
    }

    if !report.summary.is_success() {
        bail!("{} entit(ies) failed", report.summary.failed);
    }
    Ok(())
}

pub fn refresh(ctx: &Context, target: Option<&str>) -> Result<()> {
    let mut ws = Workspace::open(ctx)?;
    let plans = ws.refresh(target)?;

    let mut drifted = 0;
    for plan in &plans {
        if let PlanOutcome::Planned(unit) = plan
            && let Some(drift) = unit.drift()
        {
            drifted += 1;
            ui::warn(&format!("{}: {}", unit.address(), drift.describe()));
        }
    }
    if drifted == 0 {
        ui::success(&format!("{} entit(ies) refreshed, no drift", plans.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakePushover;
    use declarative::{ApplyResult, Drift, NoProgress};

    const CONFIG: &str = r#"
[messages.deploy]
user_key = "U1"
message = "Deploy finished"

[group_members.alice]
group_key = "G1"
user_key = "U1"
memo = "lead"

[group_members.bob]
group_key = "G1"
user_key = "U2"
device = "iphone"
disabled = true
"#;

    fn converge_quietly(ws: &mut Workspace, mode: Mode, args: &ApplyArgs) -> ExecuteReport<Tracked> {
        ws.converge(mode, args, &NoProgress, &mut AutoConfirm).unwrap()
    }

    fn workspace(fake: &FakePushover, config: &str, dir: &tempfile::TempDir) -> Workspace {
        Workspace {
            config: PushsyncConfig::parse(config).unwrap(),
            state: PushsyncState::default(),
            state_path: dir.path().join("state.toml"),
            client: fake.client(),
        }
    }

    #[test]
    fn test_apply_then_reapply_is_noop() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);

        let report = converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        assert_eq!(report.summary.created, 3);
        assert_eq!(fake.members("G1").len(), 2);
        assert_eq!(ws.state.group_members["bob"].id, "G1/U2/iphone");
        assert_eq!(ws.state.messages["deploy"].request_id, "req-1");

        let saved = PushsyncState::load(&ws.state_path).unwrap();
        assert_eq!(saved.group_members.len(), 2);

        let report = converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        assert_eq!(report.summary.total_changes(), 0);
        assert_eq!(report.summary.no_change, 3);
        // No second send.
        assert_eq!(fake.transport.calls_to("/messages.json").len(), 1);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);

        let args = ApplyArgs {
            dry_run: true,
            ..ApplyArgs::default()
        };
        let report = converge_quietly(&mut ws, Mode::Converge, &args);
        assert_eq!(report.summary.skipped, 3);
        assert!(fake.members("G1").is_empty());
        assert!(!ws.state_path.exists());
    }

    #[test]
    fn test_removed_from_config_is_deleted() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);
        converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());

        ws.config.group_members.remove("bob");
        let report = converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        assert_eq!(report.summary.deleted, 1);
        assert_eq!(fake.members("G1").len(), 1);
        assert!(!ws.state.group_members.contains_key("bob"));
    }

    #[test]
    fn test_destroy_removes_tracked_members() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);
        converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());

        let report = converge_quietly(&mut ws, Mode::Destroy, &ApplyArgs::default());
        assert_eq!(report.summary.deleted, 3);
        assert!(fake.members("G1").is_empty());
        assert!(ws.state.is_empty());
    }

    #[test]
    fn test_member_removed_remotely_is_recreated() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);
        converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        fake.edit_group("G1", |members| members.retain(|m| m.user != "U1"));

        let report = converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        let alice = report
            .outcomes
            .iter()
            .find(|o| o.address == "group_members.alice")
            .unwrap();
        assert_eq!(alice.drift, Some(Drift::Vanished));
        assert_eq!(alice.result.as_ref().unwrap(), &ApplyResult::Created);
        assert_eq!(fake.members("G1").len(), 2);
    }

    #[test]
    fn test_remote_enable_is_reverted() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);
        converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        fake.edit_group("G1", |members| {
            for m in members.iter_mut() {
                m.disabled = false;
            }
        });
        fake.transport.clear_calls();

        let report = converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        assert_eq!(report.summary.updated, 1);
        assert_eq!(
            fake.transport.calls_to("/groups/G1/disable_user.json").len(),
            1
        );
        assert!(fake.transport.calls_to("/groups/G1/add_user.json").is_empty());
    }

    #[test]
    fn test_one_failure_does_not_block_others() {
        let fake = FakePushover::with_group("G1");
        fake.reject("/messages.json");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);

        let report = converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.created, 2);
        assert!(ws.state.messages.is_empty());
        assert_eq!(ws.state.group_members.len(), 2);
    }

    #[test]
    fn test_refresh_drops_vanished_and_records_drift() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);
        converge_quietly(&mut ws, Mode::Converge, &ApplyArgs::default());
        fake.edit_group("G1", |members| {
            members.retain(|m| m.user != "U2");
            members[0].memo = "edited".to_string();
        });
        fake.transport.clear_calls();

        ws.refresh(None).unwrap();
        assert!(!ws.state.group_members.contains_key("bob"));
        assert_eq!(ws.state.group_members["alice"].spec.memo, "edited");
        // Refresh never writes.
        assert!(
            fake.calls()
                .iter()
                .all(|c| c.method == pushover::Method::Get)
        );
    }

    #[test]
    fn test_unknown_target_is_error() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&fake, CONFIG, &dir);
        let rctx = ReconcileContext::new();
        assert!(
            ws.plan(&rctx, Mode::Converge, Some("group_members.zed"), 1)
                .is_err()
        );
    }

    #[test]
    fn test_expired_deadline_applies_nothing() {
        let fake = FakePushover::with_group("G1");
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(&fake, CONFIG, &dir);

        let args = ApplyArgs {
            deadline_secs: Some(0),
            ..ApplyArgs::default()
        };
        let report = converge_quietly(&mut ws, Mode::Converge, &args);
        assert_eq!(report.summary.failed, 3);
        assert!(fake.calls().is_empty());
    }
}
