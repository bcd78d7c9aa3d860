//! Ordered multi-call operations
//!
//! Some operations need more than one remote call (add a member, then
//! disable it). [`Sequence`] runs them in order, checks the context before
//! each one, and tags a failure after the first success as
//! [`ReconcileError::PartialSequence`].

use crate::context::ReconcileContext;
use crate::error::ReconcileError;
use std::time::Duration;

/// An ordered list of remote steps for one entity.
pub struct Sequence<'a> {
    ctx: &'a ReconcileContext,
    total: usize,
    completed: Vec<String>,
}

impl<'a> Sequence<'a> {
    /// Start a sequence of `total` planned steps.
    pub fn new(ctx: &'a ReconcileContext, total: usize) -> Self {
        Self {
            ctx,
            total,
            completed: Vec::new(),
        }
    }

    /// Run one step.
    ///
    /// `f` receives the timeout for its remote call. Nothing runs if the
    /// context is cancelled or past its deadline.
    pub fn step<T, F>(&mut self, name: &str, f: F) -> Result<T, ReconcileError>
    where
        F: FnOnce(Option<Duration>) -> Result<T, ReconcileError>,
    {
        if let Err(e) = self.ctx.check(name) {
            return Err(self.tag(name, e));
        }

        match f(self.ctx.call_timeout()) {
            Ok(value) => {
                log::debug!("step {name} done ({}/{})", self.completed.len() + 1, self.total);
                self.completed.push(name.to_string());
                Ok(value)
            }
            Err(e) => Err(self.tag(name, e)),
        }
    }

    /// Steps that succeeded so far.
    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    fn tag(&self, name: &str, error: ReconcileError) -> ReconcileError {
        if self.completed.is_empty() {
            return error;
        }
        log::warn!(
            "step {name} failed after {} completed step(s); remote state was partially changed",
            self.completed.len()
        );
        ReconcileError::PartialSequence {
            completed: self.completed.clone(),
            failed_step: name.to_string(),
            total: self.total,
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(call: &str) -> ReconcileError {
        ReconcileError::Transport {
            call: call.to_string(),
            message: "connection reset".to_string(),
        }
    }

    #[test]
    fn test_all_steps_succeed() {
        let ctx = ReconcileContext::new();
        let mut seq = Sequence::new(&ctx, 2);
        seq.step("a", |_| Ok(())).unwrap();
        let v = seq.step("b", |_| Ok(7)).unwrap();
        assert_eq!(v, 7);
        assert_eq!(seq.completed(), ["a", "b"]);
    }

    #[test]
    fn test_first_step_failure_is_not_partial() {
        let ctx = ReconcileContext::new();
        let mut seq = Sequence::new(&ctx, 2);
        let err = seq.step::<(), _>("a", |_| Err(transport("a"))).unwrap_err();
        assert!(matches!(err, ReconcileError::Transport { .. }));
    }

    #[test]
    fn test_second_step_failure_is_partial() {
        let ctx = ReconcileContext::new();
        let mut seq = Sequence::new(&ctx, 2);
        seq.step("add_user", |_| Ok(())).unwrap();
        let err = seq
            .step::<(), _>("disable_user", |_| Err(transport("disable_user")))
            .unwrap_err();
        match err {
            ReconcileError::PartialSequence {
                completed,
                failed_step,
                total,
                source,
            } => {
                assert_eq!(completed, vec!["add_user".to_string()]);
                assert_eq!(failed_step, "disable_user");
                assert_eq!(total, 2);
                assert!(matches!(*source, ReconcileError::Transport { .. }));
            }
            other => panic!("Expected PartialSequence, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_between_steps_skips_second() {
        let ctx = ReconcileContext::new();
        let mut seq = Sequence::new(&ctx, 2);
        let mut second_ran = false;

        seq.step("add_user", |_| {
            ctx.cancel();
            Ok(())
        })
        .unwrap();
        let err = seq
            .step("disable_user", |_| {
                second_ran = true;
                Ok(())
            })
            .unwrap_err();

        assert!(!second_ran);
        match err {
            ReconcileError::PartialSequence { source, .. } => {
                assert!(matches!(*source, ReconcileError::Cancelled { .. }));
            }
            other => panic!("Expected PartialSequence, got {other:?}"),
        }
    }

    #[test]
    fn test_step_receives_call_timeout() {
        let ctx = ReconcileContext::new().with_call_timeout(Duration::from_secs(9));
        let mut seq = Sequence::new(&ctx, 1);
        let seen = seq.step("a", Ok).unwrap();
        assert_eq!(seen, Some(Duration::from_secs(9)));
    }
}
