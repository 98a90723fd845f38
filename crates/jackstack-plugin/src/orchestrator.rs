//! Stage orchestration.
//!
//! [`Stack::wrap`] runs one stage:
//!
//! 1. bump the stage counter and record the stage,
//! 2. publish `before` then `before.<stage>`,
//! 3. run the handler, if any, and hand its deferred result to the gate,
//! 4. publish `after.<stage>` then `after`.
//!
//! An error from a subscriber or the handler stops the stage where it
//! happened; nothing later in the list runs. A stage may not start again
//! while it is still running, which stops hooks that trigger each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use jackstack_core::error::AppError;
use jackstack_core::result::AppResult;

use crate::error::StackError;
use crate::gate::Deferred;
use crate::hooks::definitions::{HookPoint, Phase, Stage, StageEvent};
use crate::stack::Stack;

/// A stage that was started during boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    /// Value of the stage counter when the stage started.
    pub ordinal: u32,
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
}

impl Stack {
    /// Runs `stage` with `handler` between its before and after events.
    pub fn wrap<F>(&mut self, stage: impl Into<Stage>, handler: F) -> AppResult<()>
    where
        F: FnOnce(&mut Stack) -> AppResult<Option<Deferred>>,
    {
        self.run_stage(stage.into(), Some(handler))
    }

    /// Runs `stage` with no handler; only its events fire.
    pub fn wrap_bare(&mut self, stage: impl Into<Stage>) -> AppResult<()> {
        self.run_stage::<fn(&mut Stack) -> AppResult<Option<Deferred>>>(stage.into(), None)
    }

    fn run_stage<F>(&mut self, stage: Stage, handler: Option<F>) -> AppResult<()>
    where
        F: FnOnce(&mut Stack) -> AppResult<Option<Deferred>>,
    {
        if self.active.contains(&stage) {
            let chain: Vec<String> = self.active.iter().map(ToString::to_string).collect();
            return Err(AppError::stage(format!(
                "Stage '{stage}' started again while running ({} -> {stage})",
                chain.join(" -> ")
            )));
        }

        self.active.push(stage.clone());
        let result = self.run_active_stage(stage, handler);
        self.active.pop();
        result
    }

    fn run_active_stage<F>(&mut self, stage: Stage, handler: Option<F>) -> AppResult<()>
    where
        F: FnOnce(&mut Stack) -> AppResult<Option<Deferred>>,
    {
        self.stage_counter += 1;
        let ordinal = self.stage_counter;
        self.history.push(StageRecord {
            ordinal,
            stage: stage.clone(),
            started_at: Utc::now(),
        });

        for point in [HookPoint::BeforeAll, HookPoint::Before(stage.clone())] {
            self.publish(&StageEvent::new(point, stage.clone(), ordinal))?;
        }

        info!(ordinal, stage = %stage, "Stage");

        if let Some(handler) = handler {
            let deferred = handler(self)?;
            self.gate.register_optional(deferred);
        }

        for point in [HookPoint::After(stage.clone()), HookPoint::AfterAll] {
            self.publish(&StageEvent::new(point, stage.clone(), ordinal))?;
        }

        Ok(())
    }

    /// Runs `handler` as the sub-stage `label` whenever `before.<target>` fires.
    pub fn use_before<F>(
        &mut self,
        target: impl Into<Stage>,
        label: &str,
        handler: F,
    ) -> Result<(), StackError>
    where
        F: Fn(&mut Stack) -> AppResult<Option<Deferred>> + Send + Sync + 'static,
    {
        self.use_hook(Phase::Before, target.into(), label, handler)
    }

    /// Runs `handler` as the sub-stage `label` whenever `after.<target>` fires.
    pub fn use_after<F>(
        &mut self,
        target: impl Into<Stage>,
        label: &str,
        handler: F,
    ) -> Result<(), StackError>
    where
        F: Fn(&mut Stack) -> AppResult<Option<Deferred>> + Send + Sync + 'static,
    {
        self.use_hook(Phase::After, target.into(), label, handler)
    }

    fn use_hook<F>(
        &mut self,
        phase: Phase,
        target: Stage,
        label: &str,
        handler: F,
    ) -> Result<(), StackError>
    where
        F: Fn(&mut Stack) -> AppResult<Option<Deferred>> + Send + Sync + 'static,
    {
        let point = phase.of(target);
        let label = label.trim();
        if label.is_empty() {
            return Err(StackError::MissingLabel(point.to_string()));
        }

        let sub_stage = Stage::named(label);
        if point.stage() == Some(&sub_stage) {
            return Err(StackError::SelfReferencingHook(label.to_string()));
        }

        self.hooks.subscribe_labeled(
            point,
            label.to_string(),
            Arc::new(move |stack: &mut Stack, _event: &StageEvent| {
                stack.wrap(sub_stage.clone(), |stack| handler(stack))
            }),
        );
        Ok(())
    }
}
