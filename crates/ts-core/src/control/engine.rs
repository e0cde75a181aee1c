//! One decision step: infer, score, sample, advance.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use ts_common::{
    Action, ArmZone, Error, Observation, Position, NUM_ACTIONS, NUM_CONTEXTS, NUM_POSITIONS,
};
use ts_math::argmax;

use crate::config::{Config, PriorMode};
use crate::decision::{evaluate_policies, sample_action, PolicyPosterior};
use crate::environment::EnvironmentModel;
use crate::inference::{infer_states, BeliefState, InferenceOutcome, InferenceSettings};
use crate::logging::{event_names, Stage};
use crate::model::{reweight, GenerativeModel, Precision};

/// Tunables of the decision path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub precision: Precision,
    pub gamma: f64,
    pub inference: InferenceSettings,
    pub prior_mode: PriorMode,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            precision: Precision::default(),
            gamma: crate::decision::DEFAULT_GAMMA,
            inference: InferenceSettings::default(),
            prior_mode: PriorMode::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        EngineSettings {
            precision: Precision {
                zeta: config.model.zeta,
                omega: config.model.omega,
                rho: config.model.rho,
            },
            gamma: config.model.gamma,
            inference: InferenceSettings {
                max_iterations: config.inference.max_iterations,
                tolerance: config.inference.tolerance,
            },
            prior_mode: config.inference.prior_mode,
        }
    }
}

/// Everything recorded for one cycle, for the plotting collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Logged inverted: 1 = touched.
    pub observation: u8,
    pub policy: [f64; NUM_ACTIONS],
    pub info_gain: [f64; NUM_ACTIONS],
    pub context: [f64; NUM_CONTEXTS],
    pub position_belief: [f64; NUM_POSITIONS],
    pub action: Action,
    pub position: Position,
    pub zone: ArmZone,
    pub iterations: usize,
    pub converged: bool,
    pub free_energy: f64,
}

/// Per-run record of every decision step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub started_at: String,
    pub start_position: Position,
    pub prior_mode: PriorMode,
    pub steps: Vec<StepRecord>,
}

/// Condensed view of a run for `--format summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub cycles: usize,
    pub touches: usize,
    pub non_converged: usize,
    pub final_position: Option<Position>,
    pub final_context: Option<[f64; NUM_CONTEXTS]>,
    pub most_likely_context: Option<usize>,
}

impl RunHistory {
    fn new(start_position: Position, prior_mode: PriorMode) -> Self {
        RunHistory {
            run_id: None,
            started_at: Utc::now().to_rfc3339(),
            start_position,
            prior_mode,
            steps: Vec::new(),
        }
    }

    /// Context belief per cycle.
    pub fn context_series(&self) -> Vec<[f64; NUM_CONTEXTS]> {
        self.steps.iter().map(|s| s.context).collect()
    }

    pub fn step(&self, cycle: u64) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.cycle == cycle)
    }

    pub fn summary(&self) -> HistorySummary {
        let last = self.steps.last();
        HistorySummary {
            cycles: self.steps.len(),
            touches: self.steps.iter().filter(|s| s.observation == 1).count(),
            non_converged: self.steps.iter().filter(|s| !s.converged).count(),
            final_position: last.map(|s| s.position),
            final_context: last.map(|s| s.context),
            most_likely_context: last.and_then(|s| argmax(&s.context)),
        }
    }
}

/// Decision path owned by the control loop.
///
/// Holds the reweighted model, the prior for the next belief update, the
/// ground-truth environment and the injected random source.
#[derive(Debug)]
pub struct DecisionEngine<R = StdRng> {
    model: GenerativeModel,
    initial: BeliefState,
    prior: BeliefState,
    environment: EnvironmentModel,
    settings: EngineSettings,
    rng: R,
    history: RunHistory,
}

impl DecisionEngine<StdRng> {
    /// Build the model from config and seed the sampler (`inference.seed`, else OS entropy).
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let base = GenerativeModel::build(config.model.start_position, &config.model.habit)?;
        let rng = match config.inference.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        DecisionEngine::new(&base, EngineSettings::from_config(config), rng)
    }
}

impl<R: Rng> DecisionEngine<R> {
    /// Reweight `base` and start the environment at its position prior.
    pub fn new(base: &GenerativeModel, settings: EngineSettings, rng: R) -> Result<Self, Error> {
        if !settings.gamma.is_finite() || settings.gamma <= 0.0 {
            return Err(Error::Configuration(format!(
                "policy precision gamma must be finite and > 0, got {}",
                settings.gamma
            )));
        }
        let inference = &settings.inference;
        if inference.max_iterations == 0
            || inference.tolerance.is_nan()
            || inference.tolerance <= 0.0
        {
            return Err(Error::Configuration(
                "inference needs max_iterations > 0 and tolerance > 0".to_string(),
            ));
        }

        let model = reweight(base, &settings.precision)?;
        let start = argmax(&model.d_position)
            .and_then(Position::new)
            .ok_or_else(|| Error::Configuration("initial position prior is empty".to_string()))?;
        let initial = BeliefState::initial(&model);

        Ok(DecisionEngine {
            environment: EnvironmentModel::new(&model, start),
            history: RunHistory::new(start, settings.prior_mode),
            model,
            initial,
            prior: initial,
            settings,
            rng,
        })
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.history.run_id = Some(run_id.into());
        self
    }

    pub fn model(&self) -> &GenerativeModel {
        &self.model
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Prior the next belief update will use.
    pub fn prior(&self) -> &BeliefState {
        &self.prior
    }

    pub fn environment(&self) -> &EnvironmentModel {
        &self.environment
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    pub fn into_history(self) -> RunHistory {
        self.history
    }

    /// Number the next step will carry.
    pub fn next_cycle(&self) -> u64 {
        self.history.steps.len() as u64 + 1
    }

    /// Belief update against the current prior.
    pub fn infer(&self, observation: Observation) -> Result<InferenceOutcome, Error> {
        let outcome = infer_states(
            &self.model,
            observation,
            &self.prior.context,
            &self.prior.position,
            &self.settings.inference,
        )?;

        match outcome.degraded() {
            None => crate::log_event!(
                DEBUG,
                event_names::INFER_FINISHED,
                Stage::Infer,
                "Belief update converged",
                iterations = outcome.iterations as u64,
                free_energy = outcome.free_energy,
            ),
            Some(warning) => crate::log_event!(
                WARN,
                event_names::INFER_NOT_CONVERGED,
                Stage::Infer,
                "Belief update hit its iteration cap; continuing with the current belief",
                iterations = outcome.iterations as u64,
                free_energy = outcome.free_energy,
                code = warning.code() as u64,
                error = tracing::field::display(&warning),
            ),
        }
        Ok(outcome)
    }

    /// Policy posterior for `belief`.
    pub fn score(&self, belief: &BeliefState) -> PolicyPosterior {
        let policy = evaluate_policies(&self.model, belief, self.settings.gamma);
        crate::log_event!(
            DEBUG,
            event_names::DECIDE_POLICIES,
            Stage::Decide,
            "Scored policies",
            q_large = policy.probs[0],
            q_small = policy.probs[1],
            info_gain_large = policy.info_gain[0],
            info_gain_small = policy.info_gain[1],
        );
        policy
    }

    /// Sample an action, advance the environment, set the next prior and
    /// record the step.
    pub fn act(
        &mut self,
        observation: Observation,
        outcome: &InferenceOutcome,
        policy: &PolicyPosterior,
    ) -> Result<StepRecord, Error> {
        let action = sample_action(&policy.probs, &mut self.rng);
        let (_, position) = self.environment.step(action)?;

        self.prior = match self.settings.prior_mode {
            PriorMode::Propagate => outcome.belief.propagate(&self.model, action),
            PriorMode::Static => self.initial,
        };

        let record = StepRecord {
            cycle: self.next_cycle(),
            observation: observation.logged_value(),
            policy: policy.probs,
            info_gain: policy.info_gain,
            context: outcome.belief.context,
            position_belief: outcome.belief.position,
            action,
            position,
            zone: position.zone(),
            iterations: outcome.iterations,
            converged: outcome.converged,
            free_energy: outcome.free_energy,
        };

        crate::log_event!(
            INFO,
            event_names::DECIDE_ACTION,
            Stage::Decide,
            "Selected action",
            cycle = record.cycle,
            action = action.name(),
            position = position.index() as u64,
            zone = position.zone().value() as u64,
            context = tracing::field::debug(record.context),
        );

        self.history.steps.push(record);
        Ok(record)
    }

    /// Full cycle for one observation.
    pub fn step(&mut self, observation: Observation) -> Result<StepRecord, Error> {
        let outcome = self.infer(observation)?;
        let policy = self.score(&outcome.belief);
        self.act(observation, &outcome, &policy)
    }
}
