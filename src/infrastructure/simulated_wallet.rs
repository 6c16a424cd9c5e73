use crate::domain::fingerprint::FingerprintGenerator;
use crate::domain::ports::WalletGateway;
use crate::domain::wallet::{
    DEFAULT_SUPPLIER, MockAddresses, WalletConnection, WalletPrimitive, WalletTransaction,
};
use crate::error::{Result, SimulatorError};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Balance a freshly connected simulated account starts with.
pub const STARTING_BALANCE: Decimal = dec!(10);
/// Most recent transactions kept for the feed.
pub const FEED_LIMIT: usize = 100;
/// Most recent primitive invocations kept in the call log.
pub const CALL_LOG_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentState {
    Created,
    Funded,
    Released,
    Disputed,
}

#[derive(Debug, Clone)]
struct SimulatedPayment {
    amount: Decimal,
    state: PaymentState,
}

#[derive(Default)]
struct WalletState {
    connection: WalletConnection,
    escrowed: Decimal,
    payments: HashMap<String, SimulatedPayment>,
    next_payment: u64,
    /// Primitives that succeeded, most recent first, capped at [`FEED_LIMIT`].
    history: VecDeque<WalletTransaction>,
    /// What `transactions()` reports; only catches up with `history` on refresh.
    feed: Vec<WalletTransaction>,
    failing: HashSet<WalletPrimitive>,
    calls: VecDeque<WalletPrimitive>,
}

/// An in-process stand-in for the wallet/transaction backend.
///
/// Tracks balances and payment states just enough to reject out-of-order
/// calls, and supports failure injection per primitive. `Clone` shares state.
#[derive(Clone)]
pub struct SimulatedWallet {
    state: Arc<Mutex<WalletState>>,
    fingerprints: Arc<FingerprintGenerator>,
    addresses: MockAddresses,
}

impl SimulatedWallet {
    pub fn new() -> Self {
        Self::with_fingerprints(FingerprintGenerator::new())
    }

    pub fn with_fingerprints(fingerprints: FingerprintGenerator) -> Self {
        let addresses = MockAddresses::new()
            .with("buyer", "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
            .with(DEFAULT_SUPPLIER, "0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
            .with("supplierA", "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC")
            .with("supplierB", "0x90F79bf6EB2c4f870365E785982E1f101E93b906")
            .with("supplierC", "0x15d34AAf54267DB7D7c367839AAf71A00a2C6A65")
            .with("arbitrator", "0x9965507D1a55bcC2695C58ba16FB37d819B0A4dc");
        Self {
            state: Arc::new(Mutex::new(WalletState::default())),
            fingerprints: Arc::new(fingerprints),
            addresses,
        }
    }

    /// Makes every later call to `primitive` fail.
    pub async fn fail_on(&self, primitive: WalletPrimitive) {
        self.state.lock().await.failing.insert(primitive);
    }

    pub async fn recover(&self, primitive: WalletPrimitive) {
        self.state.lock().await.failing.remove(&primitive);
    }

    /// Recent primitive invocations in call order, including failed ones.
    pub async fn calls(&self) -> Vec<WalletPrimitive> {
        self.state.lock().await.calls.iter().copied().collect()
    }

    pub async fn payment_count(&self) -> usize {
        self.state.lock().await.payments.len()
    }

    async fn begin(&self, primitive: WalletPrimitive) -> Result<tokio::sync::MutexGuard<'_, WalletState>> {
        let mut state = self.state.lock().await;
        if state.calls.len() == CALL_LOG_LIMIT {
            state.calls.pop_front();
        }
        state.calls.push_back(primitive);
        if !state.connection.is_connected {
            return Err(SimulatorError::ConnectivityError(
                "Wallet is not connected".to_string(),
            ));
        }
        if state.failing.contains(&primitive) {
            return Err(SimulatorError::CollaboratorError(format!(
                "Simulated {:?} failure",
                primitive
            )));
        }
        Ok(state)
    }

    fn record(&self, state: &mut WalletState, primitive: WalletPrimitive, amount: Option<Decimal>) {
        let hash = self.fingerprints.generate_hash();
        debug!(?primitive, %hash, "Simulated wallet transaction");
        state.history.push_front(WalletTransaction {
            hash,
            primitive,
            amount,
            timestamp: Utc::now(),
        });
        state.history.truncate(FEED_LIMIT);
    }
}

impl Default for SimulatedWallet {
    fn default() -> Self {
        Self::new()
    }
}

fn debit(state: &mut WalletState, amount: Decimal) -> Result<()> {
    if state.connection.balance < amount {
        return Err(SimulatorError::CollaboratorError(format!(
            "Insufficient balance: need {}, have {}",
            amount, state.connection.balance
        )));
    }
    state.connection.balance -= amount;
    Ok(())
}

fn payment_in<'a>(
    state: &'a mut WalletState,
    payment_id: &str,
    expected: PaymentState,
) -> Result<&'a mut SimulatedPayment> {
    let payment = state.payments.get_mut(payment_id).ok_or_else(|| {
        SimulatorError::CollaboratorError(format!("Unknown payment {}", payment_id))
    })?;
    if payment.state != expected {
        return Err(SimulatorError::CollaboratorError(format!(
            "Payment {} is {:?}, expected {:?}",
            payment_id, payment.state, expected
        )));
    }
    Ok(payment)
}

#[async_trait]
impl WalletGateway for SimulatedWallet {
    async fn connection(&self) -> WalletConnection {
        self.state.lock().await.connection.clone()
    }

    async fn connect(&self) -> Result<WalletConnection> {
        let mut state = self.state.lock().await;
        if !state.connection.is_connected {
            state.connection = WalletConnection {
                account: self.addresses.get("buyer").map(str::to_string),
                connecting: false,
                is_connected: true,
                balance: STARTING_BALANCE,
            };
        }
        Ok(state.connection.clone())
    }

    async fn disconnect(&self) -> Result<()> {
        self.state.lock().await.connection = WalletConnection::default();
        Ok(())
    }

    async fn deposit(&self, amount: Decimal) -> Result<()> {
        let mut state = self.begin(WalletPrimitive::Deposit).await?;
        debit(&mut state, amount)?;
        state.escrowed += amount;
        self.record(&mut state, WalletPrimitive::Deposit, Some(amount));
        Ok(())
    }

    async fn create_payment(
        &self,
        _payee: &str,
        amount: Decimal,
        _description: &str,
    ) -> Result<String> {
        let mut state = self.begin(WalletPrimitive::CreatePayment).await?;
        state.next_payment += 1;
        let id = format!("payment-{}", state.next_payment);
        state.payments.insert(
            id.clone(),
            SimulatedPayment {
                amount,
                state: PaymentState::Created,
            },
        );
        self.record(&mut state, WalletPrimitive::CreatePayment, Some(amount));
        Ok(id)
    }

    async fn fund_payment(&self, payment_id: &str, amount: Decimal) -> Result<()> {
        let mut state = self.begin(WalletPrimitive::FundPayment).await?;
        let expected = payment_in(&mut state, payment_id, PaymentState::Created)?.amount;
        if amount < expected {
            return Err(SimulatorError::CollaboratorError(format!(
                "Payment {} needs {}, got {}",
                payment_id, expected, amount
            )));
        }
        debit(&mut state, amount)?;
        payment_in(&mut state, payment_id, PaymentState::Created)?.state = PaymentState::Funded;
        self.record(&mut state, WalletPrimitive::FundPayment, Some(amount));
        Ok(())
    }

    async fn release_payment(&self, payment_id: &str) -> Result<()> {
        let mut state = self.begin(WalletPrimitive::ReleasePayment).await?;
        let payment = payment_in(&mut state, payment_id, PaymentState::Funded)?;
        payment.state = PaymentState::Released;
        let amount = payment.amount;
        self.record(&mut state, WalletPrimitive::ReleasePayment, Some(amount));
        Ok(())
    }

    async fn release_to_supplier(&self, supplier: &str, amount: Decimal) -> Result<()> {
        let mut state = self.begin(WalletPrimitive::ReleaseToSupplier).await?;
        if state.escrowed < amount {
            return Err(SimulatorError::CollaboratorError(format!(
                "Cannot release {} to {}: only {} in escrow",
                amount, supplier, state.escrowed
            )));
        }
        state.escrowed -= amount;
        self.record(&mut state, WalletPrimitive::ReleaseToSupplier, Some(amount));
        Ok(())
    }

    async fn create_dispute(&self, payment_id: &str, _reason: &str) -> Result<()> {
        let mut state = self.begin(WalletPrimitive::CreateDispute).await?;
        payment_in(&mut state, payment_id, PaymentState::Funded)?.state = PaymentState::Disputed;
        self.record(&mut state, WalletPrimitive::CreateDispute, None);
        Ok(())
    }

    async fn transactions(&self) -> Vec<WalletTransaction> {
        self.state.lock().await.feed.clone()
    }

    async fn refresh_transactions(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.feed = state.history.iter().cloned().collect();
        Ok(())
    }

    fn mock_addresses(&self) -> MockAddresses {
        self.addresses.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected() -> SimulatedWallet {
        let wallet = SimulatedWallet::with_fingerprints(FingerprintGenerator::seeded(11));
        wallet.connect().await.unwrap();
        wallet
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let wallet = SimulatedWallet::new();
        assert!(matches!(
            wallet.deposit(dec!(1)).await,
            Err(SimulatorError::ConnectivityError(_))
        ));
    }

    #[tokio::test]
    async fn test_payment_lifecycle() {
        let wallet = connected().await;
        let id = wallet.create_payment("0xabc", dec!(2), "m1").await.unwrap();

        assert!(wallet.release_payment(&id).await.is_err());
        wallet.fund_payment(&id, dec!(2)).await.unwrap();
        wallet.release_payment(&id).await.unwrap();

        assert_eq!(wallet.connection().await.balance, dec!(8));
        assert!(wallet.create_dispute(&id, "late").await.is_err());
    }

    #[tokio::test]
    async fn test_feed_only_updates_on_refresh() {
        let wallet = connected().await;
        wallet.deposit(dec!(1)).await.unwrap();
        assert!(wallet.transactions().await.is_empty());

        wallet.refresh_transactions().await.unwrap();
        let feed = wallet.transactions().await;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].primitive, WalletPrimitive::Deposit);
    }

    #[tokio::test]
    async fn test_feed_keeps_only_the_latest_entries() {
        let wallet = connected().await;
        for _ in 0..FEED_LIMIT + 20 {
            wallet.deposit(dec!(0.01)).await.unwrap();
        }
        wallet.deposit(dec!(0.02)).await.unwrap();

        wallet.refresh_transactions().await.unwrap();
        let feed = wallet.transactions().await;
        assert_eq!(feed.len(), FEED_LIMIT);
        assert_eq!(feed[0].amount, Some(dec!(0.02)));
        assert_eq!(wallet.calls().await.len(), FEED_LIMIT + 21);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let wallet = connected().await;
        wallet.fail_on(WalletPrimitive::Deposit).await;
        assert!(matches!(
            wallet.deposit(dec!(1)).await,
            Err(SimulatorError::CollaboratorError(_))
        ));

        wallet.recover(WalletPrimitive::Deposit).await;
        wallet.deposit(dec!(1)).await.unwrap();
        assert_eq!(
            wallet.calls().await,
            vec![WalletPrimitive::Deposit, WalletPrimitive::Deposit]
        );
    }

    #[tokio::test]
    async fn test_release_to_supplier_needs_escrowed_funds() {
        let wallet = connected().await;
        assert!(wallet.release_to_supplier("0x1", dec!(1)).await.is_err());
        wallet.deposit(dec!(1)).await.unwrap();
        wallet.release_to_supplier("0x1", dec!(1)).await.unwrap();
    }
}
