use crate::domain::ports::WalletGatewayBox;
use crate::domain::scenario::{self, PacingSpeed, Scenario, Step, StepKind};
use crate::domain::wallet::{DEFAULT_SUPPLIER, WalletConnection};
use crate::error::{Result, SimulatorError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Hash reported for a successful step when the wallet feed has nothing to show.
pub const PLACEHOLDER_HASH: &str = "pending";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl StepResult {
    fn succeeded(tx_hash: String) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            tx_hash: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Every step succeeded.
    Completed,
    /// A step failed and has not been retried successfully.
    Halted,
}

/// The record of one execution of a scenario.
///
/// Results are kept per step position, so a failed step can be retried in
/// place. `cursor` is the index of the first step without a successful
/// result; it never moves past a step that has not succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    scenario: Scenario,
    cursor: usize,
    results: Vec<Option<StepResult>>,
    /// Id of the last payment created in this run.
    dependency: Option<String>,
    speed: PacingSpeed,
    running: bool,
}

impl ScenarioRun {
    pub fn new(scenario: Scenario, speed: PacingSpeed) -> Self {
        let results = vec![None; scenario.steps.len()];
        Self {
            scenario,
            cursor: 0,
            results,
            dependency: None,
            speed,
            running: false,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn scenario_id(&self) -> &str {
        self.scenario.id
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn dependency(&self) -> Option<&str> {
        self.dependency.as_deref()
    }

    pub fn speed(&self) -> PacingSpeed {
        self.speed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Recorded results with their step index, in step order.
    pub fn results(&self) -> impl Iterator<Item = (usize, &StepResult)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(index, result)| result.as_ref().map(|r| (index, r)))
    }

    pub fn result(&self, index: usize) -> Option<&StepResult> {
        self.results.get(index).and_then(Option::as_ref)
    }

    pub fn has_failed(&self, index: usize) -> bool {
        self.result(index).is_some_and(|r| !r.success)
    }

    pub fn has_succeeded(&self, index: usize) -> bool {
        self.result(index).is_some_and(|r| r.success)
    }

    pub fn state(&self) -> RunState {
        if self.running {
            RunState::Running
        } else if self.cursor == self.scenario.steps.len() {
            RunState::Completed
        } else if self.results().any(|(_, r)| !r.success) {
            RunState::Halted
        } else {
            RunState::Idle
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.results = vec![None; self.scenario.steps.len()];
        self.dependency = None;
    }

    fn record(&mut self, index: usize, result: StepResult) {
        let Some(slot) = self.results.get_mut(index) else {
            return;
        };
        *slot = Some(result);
        while self.has_succeeded(self.cursor) {
            self.cursor += 1;
        }
    }
}

/// Clears the running flag when a run ends, including when its future is dropped.
struct RunningGuard<'a> {
    runner: &'a ScenarioRunner,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.runner.run().running = false;
    }
}

/// Drives catalog scenarios step by step against the wallet collaborator.
///
/// The run record lives behind a synchronous mutex that is never held across
/// an await point, so it can be inspected while a run is suspended.
pub struct ScenarioRunner {
    wallet: WalletGatewayBox,
    run: Mutex<ScenarioRun>,
}

impl ScenarioRunner {
    /// Creates a runner with the first catalog scenario selected.
    pub fn new(wallet: WalletGatewayBox) -> Self {
        let scenario = scenario::catalog().remove(0);
        Self {
            wallet,
            run: Mutex::new(ScenarioRun::new(scenario, PacingSpeed::default())),
        }
    }

    pub fn snapshot(&self) -> ScenarioRun {
        self.run().clone()
    }

    pub fn state(&self) -> RunState {
        self.run().state()
    }

    pub async fn connect(&self) -> Result<WalletConnection> {
        let connection = self.wallet.connect().await?;
        info!(account = ?connection.account, balance = %connection.balance, "Wallet connected");
        Ok(connection)
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.wallet.disconnect().await?;
        info!("Wallet disconnected");
        Ok(())
    }

    /// Switches to another catalog scenario and starts a fresh run record.
    ///
    /// Rejected while a run is in progress.
    pub fn select_scenario(&self, id: &str) -> Result<()> {
        let scenario = scenario::find(id)?;
        let mut run = self.run();
        if run.running {
            warn!(current = run.scenario_id(), requested = id, "Scenario switch rejected while running");
            return Err(SimulatorError::BusyError(
                "Cannot change scenario while a run is in progress".to_string(),
            ));
        }
        *run = ScenarioRun::new(scenario, run.speed);
        Ok(())
    }

    pub fn set_speed(&self, speed: PacingSpeed) {
        self.run().speed = speed;
    }

    /// Returns the run to `Idle`, discarding results and the dependency slot.
    pub fn reset(&self) -> Result<()> {
        let mut run = self.run();
        if run.running {
            return Err(SimulatorError::BusyError(
                "Cannot reset while a run is in progress".to_string(),
            ));
        }
        run.reset();
        Ok(())
    }

    /// Runs the selected scenario from the first step.
    pub async fn run_scenario(&self) -> Result<RunState> {
        self.ensure_connected().await?;
        let guard = self.start(true)?;
        info!(scenario = self.run().scenario_id(), "Scenario run started");
        self.drive().await;
        drop(guard);
        Ok(self.report())
    }

    /// Continues the current run from its cursor without resetting it.
    ///
    /// A step that already failed in this run is not attempted again; the run
    /// halts on it until it is retried with [`ScenarioRunner::retry_step`].
    pub async fn resume(&self) -> Result<RunState> {
        self.ensure_connected().await?;
        let guard = self.start(false)?;
        {
            let run = self.run();
            info!(scenario = run.scenario_id(), cursor = run.cursor, "Scenario run resumed");
        }
        self.drive().await;
        drop(guard);
        Ok(self.report())
    }

    /// Re-runs a single step that has not yet succeeded, while the runner is idle.
    pub async fn retry_step(&self, index: usize) -> Result<StepResult> {
        self.ensure_connected().await?;
        let step = {
            let run = self.run();
            let Some(step) = run.scenario.steps.get(index).cloned() else {
                return Err(SimulatorError::NotFoundError(format!(
                    "Scenario '{}' has no step {}",
                    run.scenario_id(),
                    index
                )));
            };
            if run.has_succeeded(index) {
                return Err(SimulatorError::ValidationError(format!(
                    "Step {} already completed",
                    index
                )));
            }
            step
        };
        let guard = self.start(false)?;
        let result = self.run_step(&step, index).await;
        drop(guard);
        Ok(result)
    }

    /// Executes one step and records its outcome at `index`.
    ///
    /// Never fails: errors are captured in the returned [`StepResult`].
    /// Does not check the running flag; outside the crate a single step is
    /// reached through [`ScenarioRunner::retry_step`].
    pub(crate) async fn run_step(&self, step: &Step, index: usize) -> StepResult {
        let dependency = self.run().dependency.clone();

        match self.execute(step, dependency).await {
            Ok(created) => {
                let hash = self.latest_hash().await;
                info!(index, kind = %step.kind, hash = %hash, "Step succeeded");
                let mut run = self.run();
                if created.is_some() {
                    run.dependency = created;
                }
                let result = StepResult::succeeded(hash);
                run.record(index, result.clone());
                result
            }
            Err(e) => {
                warn!(index, kind = %step.kind, error = %e, "Step failed");
                let result = StepResult::failed(e.to_string());
                self.run().record(index, result.clone());
                result
            }
        }
    }

    /// Performs the wallet calls for `step`. Returns the id of a payment the
    /// step created, if any, to be stored in the dependency slot.
    async fn execute(&self, step: &Step, dependency: Option<String>) -> Result<Option<String>> {
        let amount = step.amount_or_default();
        match step.kind {
            StepKind::Deposit => {
                self.wallet.deposit(amount).await?;
                Ok(None)
            }
            StepKind::CreateMilestone => {
                let payee = self.address(DEFAULT_SUPPLIER)?;
                let description = match step.milestone {
                    Some(m) => format!("Milestone {} of {}: {}", m.index, m.total, step.description),
                    None => step.description.clone(),
                };
                let id = self.wallet.create_payment(&payee, amount, &description).await?;
                Ok(Some(id))
            }
            StepKind::Fund => {
                let id = require(dependency, step)?;
                self.wallet.fund_payment(&id, amount).await?;
                Ok(None)
            }
            StepKind::ReleasePayment => {
                let id = require(dependency, step)?;
                self.wallet.release_payment(&id).await?;
                Ok(None)
            }
            StepKind::Release | StepKind::ReleaseSupplier => {
                let name = step.supplier.as_deref().unwrap_or(DEFAULT_SUPPLIER);
                let supplier = self.address(name)?;
                self.wallet.release_to_supplier(&supplier, amount).await?;
                Ok(None)
            }
            StepKind::Dispute => {
                let reason = step
                    .dispute_reason
                    .as_deref()
                    .unwrap_or(step.description.as_str());
                let id = match dependency {
                    Some(id) => id,
                    None => {
                        let payee = self.address(DEFAULT_SUPPLIER)?;
                        let id = self
                            .wallet
                            .create_payment(&payee, amount, &step.description)
                            .await?;
                        self.wallet.fund_payment(&id, amount).await?;
                        info!(payment = %id, "Created payment to dispute");
                        // Committed before the dispute call so a retry reuses the funded payment.
                        self.run().dependency = Some(id.clone());
                        id
                    }
                };
                self.wallet.create_dispute(&id, reason).await?;
                Ok(None)
            }
        }
    }

    async fn drive(&self) {
        let total = self.run().scenario.steps.len();
        let mut index = self.run().cursor;

        while index < total {
            let (step, failed) = {
                let run = self.run();
                (run.scenario.steps[index].clone(), run.has_failed(index))
            };
            if failed {
                warn!(index, "Step failed earlier in this run, halting");
                return;
            }
            if !self.run_step(&step, index).await.success {
                return;
            }

            index = self.run().cursor;
            if index < total {
                let delay = self.run().speed.delay();
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.wallet.connection().await.is_connected {
            Ok(())
        } else {
            warn!("Scenario run requested without a connected wallet");
            Err(SimulatorError::ConnectivityError(
                "Connect a wallet before running a scenario".to_string(),
            ))
        }
    }

    fn start(&self, reset: bool) -> Result<RunningGuard<'_>> {
        let mut run = self.run();
        if run.running {
            return Err(SimulatorError::BusyError(
                "A scenario run is already in progress".to_string(),
            ));
        }
        if reset {
            run.reset();
        }
        run.running = true;
        Ok(RunningGuard { runner: self })
    }

    fn report(&self) -> RunState {
        let run = self.run();
        let state = run.state();
        info!(scenario = run.scenario_id(), ?state, cursor = run.cursor, "Scenario run finished");
        state
    }

    async fn latest_hash(&self) -> String {
        if let Err(e) = self.wallet.refresh_transactions().await {
            warn!(error = %e, "Could not refresh wallet transactions");
        }
        self.wallet
            .transactions()
            .await
            .into_iter()
            .next()
            .map(|tx| tx.hash)
            .unwrap_or_else(|| PLACEHOLDER_HASH.to_string())
    }

    fn address(&self, name: &str) -> Result<String> {
        self.wallet
            .mock_addresses()
            .get(name)
            .map(str::to_string)
            .ok_or_else(|| {
                SimulatorError::CollaboratorError(format!("No mock address named '{}'", name))
            })
    }

    fn run(&self) -> MutexGuard<'_, ScenarioRun> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn require(dependency: Option<String>, step: &Step) -> Result<String> {
    dependency.ok_or_else(|| {
        SimulatorError::DependencyMissingError(format!(
            "Step '{}' needs a payment created by an earlier step",
            step.kind
        ))
    })
}
