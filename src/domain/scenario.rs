use crate::error::{Result, SimulatorError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const SIMPLE_PAYMENT: &str = "simple-payment";
pub const MILESTONE_PAYMENT: &str = "milestone-payment";
pub const DISPUTE_RESOLUTION: &str = "dispute-resolution";
pub const MULTI_SUPPLIER: &str = "multi-supplier";

/// Amount used by steps that do not carry one.
pub const DEFAULT_STEP_AMOUNT: Decimal = dec!(0.01);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Deposit,
    CreateMilestone,
    Fund,
    ReleasePayment,
    Release,
    ReleaseSupplier,
    Dispute,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Deposit => "deposit",
            StepKind::CreateMilestone => "create-milestone",
            StepKind::Fund => "fund",
            StepKind::ReleasePayment => "release-payment",
            StepKind::Release => "release",
            StepKind::ReleaseSupplier => "release-supplier",
            StepKind::Dispute => "dispute",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a milestone within a staged payment, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub index: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub kind: StepKind,
    pub description: String,
    pub amount: Option<Decimal>,
    pub milestone: Option<Milestone>,
    pub dispute_reason: Option<String>,
    /// Name of a mock counterparty address.
    pub supplier: Option<String>,
}

impl Step {
    fn new(kind: StepKind, description: &str) -> Self {
        Self {
            kind,
            description: description.to_string(),
            amount: None,
            milestone: None,
            dispute_reason: None,
            supplier: None,
        }
    }

    fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    fn milestone(mut self, index: u32, total: u32) -> Self {
        self.milestone = Some(Milestone { index, total });
        self
    }

    fn reason(mut self, reason: &str) -> Self {
        self.dispute_reason = Some(reason.to_string());
        self
    }

    fn supplier(mut self, name: &str) -> Self {
        self.supplier = Some(name.to_string());
        self
    }

    pub fn amount_or_default(&self) -> Decimal {
        self.amount.unwrap_or(DEFAULT_STEP_AMOUNT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub steps: Vec<Step>,
}

/// Delay inserted between consecutive steps of an automatic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacingSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl PacingSpeed {
    pub fn delay(&self) -> Duration {
        match self {
            PacingSpeed::Slow => Duration::from_millis(2000),
            PacingSpeed::Normal => Duration::from_millis(1000),
            PacingSpeed::Fast => Duration::from_millis(500),
        }
    }
}

impl FromStr for PacingSpeed {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "slow" => Ok(PacingSpeed::Slow),
            "normal" => Ok(PacingSpeed::Normal),
            "fast" => Ok(PacingSpeed::Fast),
            other => Err(SimulatorError::ValidationError(format!(
                "Unknown speed '{}', expected slow, normal or fast",
                other
            ))),
        }
    }
}

/// The four built-in scenarios, in display order.
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario {
            id: SIMPLE_PAYMENT,
            name: "Simple Payment",
            description: "Deposit funds and release them straight to the supplier",
            steps: vec![
                Step::new(StepKind::Deposit, "Deposit funds into escrow").amount(dec!(0.5)),
                Step::new(StepKind::Release, "Release funds to the supplier").amount(dec!(0.5)),
            ],
        },
        Scenario {
            id: MILESTONE_PAYMENT,
            name: "Milestone Payment",
            description: "Pay a supplier in two funded and released milestones",
            steps: vec![
                Step::new(StepKind::CreateMilestone, "Create milestone 1 of 2")
                    .amount(dec!(0.3))
                    .milestone(1, 2),
                Step::new(StepKind::Fund, "Fund milestone 1").amount(dec!(0.3)),
                Step::new(StepKind::ReleasePayment, "Release milestone 1 payment"),
                Step::new(StepKind::CreateMilestone, "Create milestone 2 of 2")
                    .amount(dec!(0.7))
                    .milestone(2, 2),
                Step::new(StepKind::Fund, "Fund milestone 2").amount(dec!(0.7)),
                Step::new(StepKind::ReleasePayment, "Release milestone 2 payment"),
            ],
        },
        Scenario {
            id: DISPUTE_RESOLUTION,
            name: "Dispute Resolution",
            description: "Deposit funds, then raise a dispute against the payment",
            steps: vec![
                Step::new(StepKind::Deposit, "Deposit funds into escrow").amount(dec!(0.2)),
                Step::new(StepKind::Dispute, "Raise a dispute over quality")
                    .amount(dec!(0.2))
                    .reason("Delivered goods do not match the agreed specification"),
            ],
        },
        Scenario {
            id: MULTI_SUPPLIER,
            name: "Multi-Supplier Payment",
            description: "Deposit once and split the release across three suppliers",
            steps: vec![
                Step::new(StepKind::Deposit, "Deposit funds into escrow").amount(dec!(0.6)),
                Step::new(StepKind::ReleaseSupplier, "Release share to supplier A")
                    .amount(dec!(0.2))
                    .supplier("supplierA"),
                Step::new(StepKind::ReleaseSupplier, "Release share to supplier B")
                    .amount(dec!(0.25))
                    .supplier("supplierB"),
                Step::new(StepKind::ReleaseSupplier, "Release share to supplier C")
                    .amount(dec!(0.15))
                    .supplier("supplierC"),
            ],
        },
    ]
}

pub fn find(id: &str) -> Result<Scenario> {
    catalog()
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| SimulatorError::NotFoundError(format!("Unknown scenario '{}'", id)))
}
