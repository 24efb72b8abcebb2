//! The adaptive engine: request orchestration and its embedding surface.

use crate::circuit_breaker::{BreakerMetrics, CircuitBreaker, CircuitState};
use crate::core::{
    AttemptContext, Dependency, EngineError, HealReason, ProcessResult, Request, RetrySummary,
};
use crate::engine::config::{EngineConfig, HealingPolicy};
use crate::engine::executor::Executor;
use crate::engine::retry::{retry_with_backoff, RetryConfig, RetryOutcome};
use crate::events::{EngineEvent, EventEmitter, LogLevel};
use crate::learning::{LearnedRule, Pattern, PatternKey, PatternLearner};
use crate::metrics::{Metrics, MetricsCollector};
use crate::strategy::{
    EvolutionSkipped, EvolvedStrategy, Selection, Strategy, StrategyEvolver, StrategySelector,
    StrategyTable,
};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Everything an engine mutates while processing requests.
#[derive(Debug)]
struct EngineState {
    strategies: StrategyTable,
    breaker: CircuitBreaker,
    learner: PatternLearner,
    evolver: StrategyEvolver,
    metrics: MetricsCollector,
}

impl EngineState {
    fn snapshot(&self) -> Metrics {
        self.metrics.snapshot(
            self.learner.rules_learned(),
            self.evolver.evolved_count(),
            self.breaker.is_open(),
        )
    }

    /// Runs evolution if the request just counted makes it due.
    fn maybe_evolve(&mut self) -> Option<Result<EvolvedStrategy, EvolutionSkipped>> {
        if !self.evolver.is_due(self.metrics.total_requests()) {
            return None;
        }
        Some(self.evolver.evolve(&mut self.strategies))
    }
}

/// What a completed request changed, published once the state lock is
/// released.
#[derive(Debug, Default)]
struct Completion {
    circuit_opened: Option<u32>,
    circuit_closed: bool,
    rule: Option<LearnedRule>,
    evolution: Option<Result<EvolvedStrategy, EvolutionSkipped>>,
    metrics: Option<Metrics>,
}

/// An adaptive, self-healing request execution engine.
///
/// The engine routes each request through one of several competing
/// strategies, retries failed attempts with exponential backoff, protects
/// the dependency with a circuit breaker and answers with a healed fallback
/// when the dependency cannot serve the request. It learns which strategy
/// performs best from observed latency and success rate.
///
/// An engine is `Send + Sync`; share it through an `Arc` to process
/// requests concurrently. Instances share no state.
///
/// # Example
///
/// ```rust
/// use adaptive_engine::dependency::Scenario;
/// use adaptive_engine::engine::Engine;
/// use adaptive_engine::core::{Request, RequestType};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), adaptive_engine::core::EngineError> {
/// let engine = Engine::with_defaults()?;
/// let scenario = Scenario::new("reliable", 0.0).with_avg_latency_ms(5.0);
///
/// let result = engine
///     .process_request(&Request::new(RequestType::ApiCall), &scenario)
///     .await?;
/// assert!(result.success);
/// assert_eq!(engine.get_metrics().total_requests, 1);
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    config: EngineConfig,
    state: RwLock<EngineState>,
    selector: StrategySelector,
    rng: Mutex<StdRng>,
    executor: Executor,
    retry: RetryConfig,
    events: EventEmitter,
    shut_down: AtomicBool,
}

impl Engine {
    /// Creates an engine. The configuration is validated first.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let state = EngineState {
            strategies: config.strategy_table()?,
            breaker: CircuitBreaker::new(config.circuit_breaker()),
            learner: PatternLearner::new(config.learning_threshold),
            evolver: StrategyEvolver::new(config.evolution()),
            metrics: MetricsCollector::new(),
        };
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let selector = StrategySelector::new(config.exploration_rate);

        tracing::info!(
            strategies = state.strategies.len(),
            exploration_rate = selector.exploration_rate(),
            max_retries = config.max_retries,
            circuit_breaker_threshold = config.circuit_breaker_threshold,
            healing_policy = ?config.healing_policy,
            "Engine initialized"
        );

        Ok(Self {
            selector,
            executor: Executor::new(config.attempt_timeout()),
            retry: config.retry(),
            events: EventEmitter::new(config.event_capacity),
            state: RwLock::new(state),
            rng: Mutex::new(rng),
            shut_down: AtomicBool::new(false),
            config,
        })
    }

    /// Creates an engine with the default configuration.
    pub fn with_defaults() -> Result<Self, EngineError> {
        Self::new(EngineConfig::default())
    }

    /// Processes one request against `dependency`.
    ///
    /// Downstream failures never surface as errors: they are retried and,
    /// when retries run out, answered with a healed fallback. Errors are
    /// reserved for a torn-down engine.
    pub async fn process_request<D>(
        &self,
        request: &Request,
        dependency: &D,
    ) -> Result<ProcessResult, EngineError>
    where
        D: Dependency + ?Sized,
    {
        self.process(request, dependency, None).await
    }

    /// Processes one request, giving up at `deadline`.
    ///
    /// Returns `EngineError::Cancelled` if the deadline passes during an
    /// attempt or a backoff wait. An interrupted attempt is not counted.
    pub async fn process_request_until<D>(
        &self,
        request: &Request,
        dependency: &D,
        deadline: Instant,
    ) -> Result<ProcessResult, EngineError>
    where
        D: Dependency + ?Sized,
    {
        self.process(request, dependency, Some(deadline)).await
    }

    async fn process<D>(
        &self,
        request: &Request,
        dependency: &D,
        deadline: Option<Instant>,
    ) -> Result<ProcessResult, EngineError>
    where
        D: Dependency + ?Sized,
    {
        self.ensure_running()?;

        let circuit_open = {
            let mut state = self.write_state();
            state.metrics.record_attempt_start();
            !state.breaker.allow_request()
        };

        if circuit_open {
            return Ok(self.circuit_open_fallback(request));
        }

        let selection = self.select_strategy();
        let strategy = selection.strategy().to_string();
        self.events.log(
            LogLevel::Info,
            "Strategy selected",
            json!({
                "requestId": request.id,
                "requestType": request.request_type.as_str(),
                "strategy": strategy,
                "explored": selection.is_exploration(),
            }),
        );

        let summary = self
            .execute_with_retry(&strategy, request, dependency, deadline)
            .await?;

        if summary.success {
            Ok(self.complete_success(request, &strategy, summary))
        } else {
            Ok(self.complete_exhausted(request, &strategy))
        }
    }

    fn circuit_open_fallback(&self, request: &Request) -> ProcessResult {
        let latency_ms = self.config.fallback_latency_ms;
        let success = self.healed_success();

        let completion = {
            let mut state = self.write_state();
            state.metrics.record_outcome(success, true, latency_ms);
            let evolution = state.maybe_evolve();
            Completion {
                evolution,
                metrics: Some(state.snapshot()),
                ..Completion::default()
            }
        };

        self.events.log(
            LogLevel::Warn,
            "Circuit breaker open, using fallback",
            json!({
                "requestId": request.id,
                "requestType": request.request_type.as_str(),
            }),
        );
        self.publish(completion);

        ProcessResult::healed(success, HealReason::CircuitOpen, 0, latency_ms)
    }

    fn complete_success(
        &self,
        request: &Request,
        strategy: &str,
        summary: RetrySummary,
    ) -> ProcessResult {
        let completion = {
            let mut state = self.write_state();
            let circuit_closed = state.breaker.close();
            state.metrics.record_outcome(true, false, summary.latency_ms);
            let rule = state.learner.learn(&request.request_type, strategy, true);
            let evolution = state.maybe_evolve();
            Completion {
                circuit_closed,
                rule,
                evolution,
                metrics: Some(state.snapshot()),
                ..Completion::default()
            }
        };

        self.events.log(
            LogLevel::Info,
            "Request succeeded",
            json!({
                "requestId": request.id,
                "strategy": strategy,
                "attempts": summary.attempts,
                "latencyMs": summary.latency_ms,
            }),
        );
        self.publish(completion);

        ProcessResult::served(strategy, summary.attempts, summary.latency_ms)
    }

    fn complete_exhausted(&self, request: &Request, strategy: &str) -> ProcessResult {
        let latency_ms = self.config.healed_latency_ms;
        let success = self.healed_success();
        let attempts = self.config.max_retries;

        let completion = {
            let mut state = self.write_state();
            let opened = state.breaker.record_failure();
            let failure_count = state.breaker.state().failure_count;
            state.metrics.record_exhausted();
            state.metrics.record_outcome(success, true, latency_ms);
            let rule = state.learner.learn(&request.request_type, strategy, false);
            let evolution = state.maybe_evolve();
            Completion {
                circuit_opened: opened.then_some(failure_count),
                rule,
                evolution,
                metrics: Some(state.snapshot()),
                ..Completion::default()
            }
        };

        self.events.log(
            LogLevel::Warn,
            "Retries exhausted, healing with fallback",
            json!({
                "requestId": request.id,
                "strategy": strategy,
                "attempts": attempts,
            }),
        );
        self.publish(completion);

        ProcessResult::healed(success, HealReason::RetriesExhausted, attempts, latency_ms)
    }

    fn healed_success(&self) -> bool {
        self.config.healing_policy == HealingPolicy::MaskAsSuccess
    }

    fn publish(&self, completion: Completion) {
        if let Some(failure_count) = completion.circuit_opened {
            let open_for_ms = self.config.circuit_breaker_timeout_ms;
            self.events.log(
                LogLevel::Error,
                "Circuit breaker opened",
                json!({ "failureCount": failure_count, "openForMs": open_for_ms }),
            );
            self.events.emit(EngineEvent::CircuitOpened {
                failure_count,
                open_for_ms,
            });
        }

        if completion.circuit_closed {
            self.events
                .log(LogLevel::Info, "Circuit breaker closed", serde_json::Value::Null);
            self.events.emit(EngineEvent::CircuitClosed);
        }

        if let Some(rule) = completion.rule {
            self.events.log(
                LogLevel::Info,
                "Learned rule",
                json!({
                    "pattern": rule.pattern,
                    "dominantStrategy": rule.dominant_strategy,
                    "occurrences": rule.occurrences,
                }),
            );
            self.events.emit(EngineEvent::RuleLearned(rule));
        }

        match completion.evolution {
            Some(Ok(evolved)) => {
                self.events.log(
                    LogLevel::Info,
                    "Strategy evolved",
                    json!({
                        "name": evolved.name,
                        "parent": evolved.parent,
                        "emaLatencyMs": evolved.ema_latency_ms,
                        "evicted": evolved.evicted,
                    }),
                );
                self.events.emit(EngineEvent::StrategyEvolved(evolved));
            }
            Some(Err(skipped)) => {
                self.events.log(
                    LogLevel::Warn,
                    "Strategy evolution skipped",
                    json!({ "reason": format!("{skipped:?}") }),
                );
            }
            None => {}
        }

        if let Some(metrics) = completion.metrics {
            self.events.emit(EngineEvent::MetricsUpdate(metrics));
        }
    }

    /// Runs `strategy` against `dependency` with retries.
    ///
    /// Each attempt updates the strategy's counters (and EMA on success).
    /// Exhaustion is not an error: it returns a summary with
    /// `success = false`.
    pub async fn execute_with_retry<D>(
        &self,
        strategy: &str,
        request: &Request,
        dependency: &D,
        deadline: Option<Instant>,
    ) -> Result<RetrySummary, EngineError>
    where
        D: Dependency + ?Sized,
    {
        if !self.read_state().strategies.contains(strategy) {
            return Err(EngineError::unknown_strategy(strategy));
        }

        let alpha = self.config.ema_alpha;
        let outcome = retry_with_backoff(&self.retry, deadline, |attempt| async move {
            // An evolved strategy can be evicted mid-request; its attempts
            // then go unrecorded.
            let expected_latency_ms = self
                .read_state()
                .strategies
                .get(strategy)
                .map(|s| s.ema_latency_ms)
                .unwrap_or(0.0);

            let ctx = AttemptContext {
                request,
                strategy,
                expected_latency_ms,
                attempt,
            };
            let result = self.executor.execute(dependency, &ctx).await;

            if let Some(entry) = self.write_state().strategies.get_mut(strategy) {
                match &result {
                    Ok(outcome) => entry.record_success(outcome.latency_ms, alpha),
                    Err(_) => entry.record_failure(),
                }
            }

            if let Err(e) = &result {
                tracing::warn!(
                    request_id = %request.id,
                    dependency = dependency.name(),
                    strategy = %strategy,
                    attempt = attempt,
                    error = %e,
                    "Attempt failed"
                );
            }
            result
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded { value, attempts } => Ok(RetrySummary {
                success: true,
                attempts,
                latency_ms: value.latency_ms,
            }),
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                tracing::warn!(
                    request_id = %request.id,
                    strategy = %strategy,
                    attempts = attempts,
                    error = %last_error,
                    "All attempts failed"
                );
                Ok(RetrySummary {
                    success: false,
                    attempts,
                    latency_ms: 0.0,
                })
            }
            RetryOutcome::Cancelled { attempts } => {
                self.events.log(
                    LogLevel::Warn,
                    "Request cancelled",
                    json!({
                        "requestId": request.id,
                        "strategy": strategy,
                        "completedAttempts": attempts,
                    }),
                );
                Err(EngineError::Cancelled)
            }
        }
    }

    /// Picks a strategy with the ε-greedy policy.
    pub fn select_strategy(&self) -> Selection {
        let state = self.read_state();
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.selector.select(&state.strategies, &mut *rng)
    }

    /// Returns a snapshot of the engine's metrics. Takes no write lock.
    pub fn get_metrics(&self) -> Metrics {
        self.read_state().snapshot()
    }

    /// Returns every strategy in insertion order.
    pub fn strategies(&self) -> Vec<Strategy> {
        self.read_state().strategies.snapshot()
    }

    /// Returns the circuit breaker's state.
    pub fn circuit_state(&self) -> CircuitState {
        self.read_state().breaker.state()
    }

    /// Returns the circuit breaker's counters.
    pub fn circuit_metrics(&self) -> BreakerMetrics {
        self.read_state().breaker.metrics()
    }

    /// Returns every observed pattern, sorted by key.
    pub fn patterns(&self) -> Vec<(PatternKey, Pattern)> {
        self.read_state().learner.patterns()
    }

    /// Returns the latest learned rule for each pattern.
    pub fn learned_rules(&self) -> Vec<LearnedRule> {
        self.read_state().learner.learned_rules()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribes to the event stream.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<EngineEvent>, EngineError> {
        self.ensure_running()?;
        self.events.subscribe()
    }

    /// Shuts the engine down.
    ///
    /// Closes the event stream; later requests fail with
    /// `EngineError::ShutDown`. Requests already in flight finish normally.
    pub fn teardown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let metrics = self.get_metrics();
        tracing::info!(
            total_requests = metrics.total_requests,
            system_health = metrics.system_health,
            "Engine torn down"
        );
        self.events.close();
    }

    /// Returns `true` once [`teardown`](Self::teardown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.is_shut_down() {
            Err(EngineError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
