//! Payment adapters — one per provider flow.
//!
//! `initiate` is side-effect free on order and seat state: it produces a
//! redirect target and a transaction record in the PENDING outcome, and
//! that transaction is the only record it creates. State mutation happens
//! only in the orchestrator step that consumes verification.

use opengate_types::{
    OrderId, PaymentConfig, PaymentInitiation, PaymentMethod, Result, Transaction, TransactionId,
};
use rust_decimal::Decimal;

use crate::token::{format_amount, generate_token};

/// Common contract over the provider variants.
pub trait PaymentAdapter: Send + Sync {
    /// Which provider flow this adapter drives.
    fn method(&self) -> PaymentMethod;

    /// Start a payment: mint a PENDING transaction and the redirect target
    /// the buyer's browser is sent to. No order or seat state changes.
    ///
    /// # Errors
    /// Returns a configuration error when the provider config is unusable.
    fn initiate(
        &self,
        order_id: OrderId,
        amount: Decimal,
        item_details: &str,
    ) -> Result<PaymentInitiation>;
}

/// Card flow: the redirect target is the configured static gateway URL.
/// The gateway's own return signal later feeds verification, so a PENDING
/// transaction is still minted here to reconcile against.
pub struct CardAdapter {
    config: PaymentConfig,
}

impl CardAdapter {
    #[must_use]
    pub fn new(config: PaymentConfig) -> Self {
        Self { config }
    }
}

impl PaymentAdapter for CardAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Card
    }

    fn initiate(
        &self,
        order_id: OrderId,
        amount: Decimal,
        item_details: &str,
    ) -> Result<PaymentInitiation> {
        let transaction = Transaction::new(order_id, PaymentMethod::Card, amount, item_details);
        tracing::info!(
            transaction = %transaction.id,
            order = %order_id,
            amount = %format_amount(amount),
            "Card payment initiated"
        );
        Ok(PaymentInitiation {
            transaction,
            redirect_url: self.config.gateway_redirect_url.clone(),
        })
    }
}

/// Mobile-wallet flow: the redirect carries the transaction id, the amount,
/// the merchant identity, and an integrity token binding them together.
pub struct WalletAdapter {
    config: PaymentConfig,
}

impl WalletAdapter {
    #[must_use]
    pub fn new(config: PaymentConfig) -> Self {
        Self { config }
    }

    /// The status-query URL for a transaction. The embedder performs the
    /// transport; the provider answers with `{code, message, transactionId}`
    /// plus its own token.
    #[must_use]
    pub fn status_url(&self, transaction_id: &TransactionId) -> String {
        format!("{}/{}", self.config.wallet_status_url, transaction_id)
    }
}

impl PaymentAdapter for WalletAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::MobileWallet
    }

    fn initiate(
        &self,
        order_id: OrderId,
        amount: Decimal,
        item_details: &str,
    ) -> Result<PaymentInitiation> {
        let transaction =
            Transaction::new(order_id, PaymentMethod::MobileWallet, amount, item_details);

        // The response code field is the empty string at initiation time.
        let token = generate_token(
            &transaction.id,
            amount,
            item_details,
            &self.config.merchant_secret,
            "",
        );
        let amt = format_amount(amount);
        let redirect_url = format!(
            "{}?url={}&tID={}&amt={}&cID={}&iDet={}&token={}",
            self.config.wallet_api_url,
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode(transaction.id.as_str()),
            urlencoding::encode(&amt),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(item_details),
            urlencoding::encode(&token),
        );

        tracing::info!(
            transaction = %transaction.id,
            order = %order_id,
            amount = %amt,
            "Wallet payment initiated"
        );
        Ok(PaymentInitiation {
            transaction,
            redirect_url,
        })
    }
}

/// Construct the adapter for a payment method.
#[must_use]
pub fn adapter_for(method: PaymentMethod, config: PaymentConfig) -> Box<dyn PaymentAdapter> {
    match method {
        PaymentMethod::Card => Box::new(CardAdapter::new(config)),
        PaymentMethod::MobileWallet => Box::new(WalletAdapter::new(config)),
    }
}
