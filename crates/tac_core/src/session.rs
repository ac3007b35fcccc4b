//! A running game.
//!
//! [`Game`] ties the pieces together: player actions go through the
//! executor, objectives are checked after every step, and effects fire on
//! their triggers. Everything that changes the map is recorded as a
//! response, so the log replayed onto the initial map always reproduces the
//! current one.

use tracing::{debug, info};

use crate::action::{apply, apply_all, execute_action, Action, ActionResponse};
use crate::effects::{fire, migrate_game_end_dialogue, Effects, Trigger};
use crate::error::{GameError, Result};
use crate::map::{MapState, PlayerId};
use crate::objectives::check_objectives;
use crate::vision::{dim_response, mask_map};

/// Upper bound on objective and trigger rounds after one action.
const MAX_SETTLE_ROUNDS: usize = 16;

/// Game session state.
#[derive(Clone, Debug)]
pub struct Game {
    initial: MapState,
    map: MapState,
    effects: Effects,
    log: Vec<ActionResponse>,
    started: bool,
    finished: bool,
}

impl Game {
    /// Create a session. The map is validated and dialogue-only `GameEnd`
    /// effects are moved to `Start`; nothing fires until
    /// [`start`](Self::start).
    pub fn new(map: MapState, effects: Effects) -> Result<Self> {
        map.validate()?;
        let (effects, _) = migrate_game_end_dialogue(&effects);
        Ok(Self {
            initial: map.clone(),
            map,
            effects,
            log: Vec::new(),
            started: false,
            finished: false,
        })
    }

    /// Current map.
    #[must_use]
    pub const fn map(&self) -> &MapState {
        &self.map
    }

    /// Map the session started from.
    #[must_use]
    pub const fn initial(&self) -> &MapState {
        &self.initial
    }

    /// Remaining effects.
    #[must_use]
    pub const fn effects(&self) -> &Effects {
        &self.effects
    }

    /// Every response applied so far.
    #[must_use]
    pub fn log(&self) -> &[ActionResponse] {
        &self.log
    }

    /// Whether a `GameEnd` was applied.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Hash of the current map.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.map.state_hash()
    }

    /// The current map as `viewer` sees it.
    #[must_use]
    pub fn view(&self, viewer: PlayerId) -> MapState {
        mask_map(&self.map, viewer)
    }

    /// Responses of `responses` as `viewer` would receive them, starting
    /// from `before`.
    pub fn dim_for(
        before: &MapState,
        viewer: PlayerId,
        responses: &[ActionResponse],
    ) -> Result<Vec<ActionResponse>> {
        let mut map = before.clone();
        let mut dimmed = Vec::new();
        for response in responses {
            dimmed.extend(dim_response(&map, viewer, response));
            map = apply(&map, response)?;
        }
        Ok(dimmed)
    }

    /// Apply `Start`, fire the start trigger and settle objectives.
    pub fn start(&mut self) -> Result<Vec<ActionResponse>> {
        if self.started {
            return Err(GameError::InvalidState("game already started".into()));
        }
        let mut step = Step::new(self);
        step.push(vec![ActionResponse::Start])?;
        step.trigger(&Trigger::Start);
        step.settle()?;
        let responses = step.commit(self);
        self.started = true;
        info!(
            players = self.map.active().len(),
            responses = responses.len(),
            "game started"
        );
        Ok(responses)
    }

    /// Execute a player action and everything that follows from it.
    ///
    /// Either the whole step is applied or the session is left unchanged.
    pub fn act(&mut self, action: &Action) -> Result<Vec<ActionResponse>> {
        self.check_running()?;
        let mut step = Step::new(self);
        let responses = execute_action(&step.map, action)?;
        step.push(responses)?;
        if matches!(action, Action::EndTurn) {
            step.trigger(&Trigger::EndTurn);
        }
        step.settle()?;
        let responses = step.commit(self);
        debug!(
            action = action.name(),
            responses = responses.len(),
            hash = self.map.state_hash(),
            "action applied"
        );
        Ok(responses)
    }

    /// Apply responses decided elsewhere, such as an authoritative server.
    /// No objectives are checked and no effects fire.
    pub fn apply_remote(&mut self, responses: &[ActionResponse]) -> Result<()> {
        let next = apply_all(&self.map, responses)?;
        self.map = next;
        self.started = true;
        self.finished |= responses
            .iter()
            .any(|response| matches!(response, ActionResponse::GameEnd { .. }));
        self.log.extend_from_slice(responses);
        Ok(())
    }

    fn check_running(&self) -> Result<()> {
        if self.finished {
            return Err(GameError::GameOver);
        }
        if !self.started {
            return Err(GameError::InvalidState("game has not started".into()));
        }
        Ok(())
    }
}

/// Work in progress for one session step.
struct Step {
    map: MapState,
    effects: Effects,
    responses: Vec<ActionResponse>,
    finished: bool,
}

impl Step {
    fn new(game: &Game) -> Self {
        Self {
            map: game.map.clone(),
            effects: game.effects.clone(),
            responses: Vec::new(),
            finished: false,
        }
    }

    fn push(&mut self, responses: Vec<ActionResponse>) -> Result<()> {
        self.map = apply_all(&self.map, &responses)?;
        self.finished |= responses
            .iter()
            .any(|response| matches!(response, ActionResponse::GameEnd { .. }));
        self.responses.extend(responses);
        Ok(())
    }

    /// Fire a trigger. A rejected effect batch leaves the step as it was.
    fn trigger(&mut self, trigger: &Trigger) {
        if self.effects.get(trigger).is_empty() {
            return;
        }
        if let Ok(fired) = fire(&self.map, &self.effects, trigger) {
            self.finished |= fired
                .responses
                .iter()
                .any(|response| matches!(response, ActionResponse::GameEnd { .. }));
            self.map = fired.map;
            self.effects = fired.effects;
            self.responses.extend(fired.responses);
        }
    }

    /// Check objectives and fire the triggers they lead to until nothing
    /// changes.
    fn settle(&mut self) -> Result<()> {
        for _ in 0..MAX_SETTLE_ROUNDS {
            if self.finished {
                return Ok(());
            }
            let outcome = check_objectives(&self.map)?;
            if outcome.is_empty() {
                return Ok(());
            }
            self.push(outcome.clone())?;
            for response in &outcome {
                match response {
                    ActionResponse::OptionalObjective { objective_id, .. } => {
                        self.trigger(&Trigger::Objective(*objective_id));
                    }
                    ActionResponse::GameEnd { objective_id, .. } => {
                        if let Some(id) = objective_id {
                            self.trigger(&Trigger::Objective(*id));
                        }
                        self.trigger(&Trigger::GameEnd);
                    }
                    _ => {}
                }
            }
        }
        Err(GameError::InvalidState("objectives did not settle".into()))
    }

    fn commit(self, game: &mut Game) -> Vec<ActionResponse> {
        game.map = self.map;
        game.effects = self.effects;
        game.finished |= self.finished;
        game.log.extend_from_slice(&self.responses);
        self.responses
    }
}
