#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use backend::usecases::{
    admin::AdminUseCase,
    payment_webhook::PaymentWebhookUseCase,
    purchases::{CheckoutUrls, PurchaseUseCase},
    subscriptions::SubscriptionUseCase,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use crates::domain::{
    entities::{
        payment_orders::{InsertPaymentOrderEntity, PaymentOrderEntity},
        subscription_packages::SubscriptionPackageEntity,
        user_subscriptions::UserSubscriptionEntity,
    },
    interfaces::{
        notifier::{ExtensionNotice, PurchaseConfirmation, SubscriptionNotifier},
        payment_gateway::PaymentGateway,
    },
    repositories::{
        payment_orders::PaymentOrderRepository,
        subscription_packages::SubscriptionPackageRepository,
        user_subscriptions::SubscriptionLedgerRepository,
    },
    value_objects::{
        enums::{extension_units::ExtensionUnit, payment_statuses::PaymentStatus},
        order_codes::OrderCodeGenerator,
        pagination::{Page, PageRequest},
        payments::{
            AppliedExtension, CallbackOutcome, GatewayCallback, PackageRevenue, PaymentFilter,
            PaymentHistoryItem, PaymentLink, PaymentUpdate, RevenueBucket, SettlementDecision,
        },
        subscriptions::{SubscriptionExtension, accrue_expiry},
    },
};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct StoreState {
    packages: Vec<SubscriptionPackageEntity>,
    orders: HashMap<Uuid, PaymentOrderEntity>,
    ledger: HashMap<Uuid, UserSubscriptionEntity>,
}

/// In-memory stand-in for the PostgreSQL repositories. One async mutex plays the
/// role of the row locks: every read-modify-write holds it from read to write, and
/// yields in between so a missing lock would show up as a lost update.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn with_default_packages() -> Arc<Self> {
        let store = Self::default();
        {
            let mut state = store.state.try_lock().expect("fresh store is unlocked");
            state.packages = vec![
                package("day", "Gói ngày", 1, 10_000),
                package("month", "Gói tháng", 30, 49_000),
            ];
        }
        Arc::new(store)
    }

    pub async fn package_by_code(&self, code: &str) -> SubscriptionPackageEntity {
        let state = self.state.lock().await;
        state
            .packages
            .iter()
            .find(|package| package.code == code)
            .cloned()
            .expect("package is seeded")
    }

    pub async fn order(&self, order_id: Uuid) -> PaymentOrderEntity {
        self.state.lock().await.orders[&order_id].clone()
    }

    pub async fn orders(&self) -> Vec<PaymentOrderEntity> {
        self.state.lock().await.orders.values().cloned().collect()
    }

    pub async fn expiry_of(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .await
            .ledger
            .get(&user_id)
            .and_then(|entry| entry.expired_at)
    }

    pub async fn set_expiry(&self, user_id: Uuid, expired_at: DateTime<Utc>) {
        let now = Utc::now();
        self.state.lock().await.ledger.insert(
            user_id,
            UserSubscriptionEntity {
                id: Uuid::new_v4(),
                user_id,
                expired_at: Some(expired_at),
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Backdates an order, for reports over past days.
    pub async fn set_order_created_at(&self, order_id: Uuid, created_at: DateTime<Utc>) {
        if let Some(order) = self.state.lock().await.orders.get_mut(&order_id) {
            order.created_at = created_at;
        }
    }

    pub async fn set_order_status(&self, order_id: Uuid, status: PaymentStatus) {
        if let Some(order) = self.state.lock().await.orders.get_mut(&order_id) {
            order.status = status.as_str().to_string();
        }
    }
}

fn package(code: &str, display_name: &str, duration_days: i32, price: i64) -> SubscriptionPackageEntity {
    SubscriptionPackageEntity {
        id: Uuid::new_v4(),
        code: code.to_string(),
        display_name: display_name.to_string(),
        duration_days,
        price,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn extend_entry(
    state: &mut StoreState,
    user_id: Uuid,
    extension: SubscriptionExtension,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let entry = state
        .ledger
        .entry(user_id)
        .or_insert_with(|| UserSubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            expired_at: None,
            created_at: now,
            updated_at: now,
        });

    let new_expiry = accrue_expiry(entry.expired_at, extension, now)?;
    entry.expired_at = Some(new_expiry);
    entry.updated_at = now;
    Ok(new_expiry)
}

fn start_of_day(date: chrono::NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[async_trait]
impl SubscriptionPackageRepository for MemoryStore {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<SubscriptionPackageEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .packages
            .iter()
            .find(|package| package.code == code && package.is_active)
            .cloned())
    }

    async fn find_by_id(&self, package_id: Uuid) -> Result<Option<SubscriptionPackageEntity>> {
        let state = self.state.lock().await;
        Ok(state.packages.iter().find(|package| package.id == package_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<SubscriptionPackageEntity>> {
        let state = self.state.lock().await;
        Ok(state.packages.iter().filter(|package| package.is_active).cloned().collect())
    }

    async fn deactivate(&self, code: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.packages.iter_mut().find(|package| package.code == code) {
            Some(package) => {
                package.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SubscriptionLedgerRepository for MemoryStore {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<UserSubscriptionEntity>> {
        Ok(self.state.lock().await.ledger.get(&user_id).cloned())
    }

    async fn extend(
        &self,
        user_id: Uuid,
        extension: SubscriptionExtension,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let mut state = self.state.lock().await;
        tokio::task::yield_now().await;
        extend_entry(&mut state, user_id, extension, now)
    }
}

#[async_trait]
impl PaymentOrderRepository for MemoryStore {
    async fn create_pending(
        &self,
        order: InsertPaymentOrderEntity,
    ) -> Result<Option<PaymentOrderEntity>> {
        let mut state = self.state.lock().await;
        if state
            .orders
            .values()
            .any(|existing| existing.order_code == order.order_code)
        {
            return Ok(None);
        }

        let now = Utc::now();
        let entity = PaymentOrderEntity {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            package_id: order.package_id,
            order_code: order.order_code,
            amount: order.amount,
            status: order.status,
            gateway_name: order.gateway_name,
            gateway_link_id: None,
            gateway_transaction_id: None,
            raw_callback_payload: None,
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(entity.id, entity.clone());
        Ok(Some(entity))
    }

    async fn attach_gateway_link(&self, order_id: Uuid, payment_link_id: String) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.gateway_link_id = Some(payment_link_id);
        }
        Ok(())
    }

    async fn apply_callback(
        &self,
        callback: GatewayCallback,
        now: DateTime<Utc>,
    ) -> Result<CallbackOutcome> {
        let mut state = self.state.lock().await;

        let Some(order) = state
            .orders
            .values()
            .find(|order| order.order_code == callback.order_code)
            .cloned()
        else {
            return Ok(CallbackOutcome::OrderNotFound {
                order_code: callback.order_code,
            });
        };

        tokio::task::yield_now().await;

        let status = match SettlementDecision::decide(order.payment_status()?, &callback.result_code)
        {
            SettlementDecision::Skip(current) => {
                return Ok(CallbackOutcome::AlreadyProcessed {
                    order_code: order.order_code,
                    status: current,
                });
            }
            SettlementDecision::Transition(next) => next,
        };

        let mut settled = order.clone();
        settled.status = status.as_str().to_string();
        settled.gateway_transaction_id = callback.reference.clone();
        settled.raw_callback_payload = Some(callback.raw_payload.clone());
        settled.updated_at = now;

        let extension = if status == PaymentStatus::Success {
            let package = state
                .packages
                .iter()
                .find(|package| package.id == settled.package_id)
                .cloned()
                .ok_or_else(|| anyhow!("package {} missing", settled.package_id))?;
            let new_expiry = extend_entry(
                &mut state,
                settled.user_id,
                SubscriptionExtension::from_package_days(package.duration_days)?,
                now,
            )?;
            Some(AppliedExtension {
                user_id: settled.user_id,
                package_id: package.id,
                package_name: package.display_name,
                duration_days: package.duration_days,
                amount: settled.amount,
                new_expiry,
            })
        } else {
            None
        };

        state.orders.insert(settled.id, settled.clone());

        Ok(CallbackOutcome::Settled {
            order: settled,
            status,
            extension,
        })
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<PaymentOrderEntity>> {
        Ok(self.state.lock().await.orders.get(&order_id).cloned())
    }

    async fn admin_update(
        &self,
        order_id: Uuid,
        update: PaymentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<PaymentOrderEntity>> {
        let mut state = self.state.lock().await;
        tokio::task::yield_now().await;

        let Some(order) = state.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        if let Some(status) = update.status {
            order.status = status.as_str().to_string();
        }
        if let Some(amount) = update.amount {
            order.amount = amount;
        }
        order.updated_at = now;
        Ok(Some(order.clone()))
    }

    async fn list_success_history(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PaymentHistoryItem>> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| order.user_id == user_id && order.status == "SUCCESS")
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = orders.len() as i64;
        let items = orders
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .map(|order| PaymentHistoryItem {
                payment_id: order.id,
                package_name: state
                    .packages
                    .iter()
                    .find(|package| package.id == order.package_id)
                    .map(|package| package.display_name.clone())
                    .unwrap_or_else(|| "Unknown Package".to_string()),
                amount: order.amount,
                status: PaymentStatus::Success,
                created_at: order.created_at,
            })
            .collect();

        Ok(Page::new(items, page, total))
    }

    async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<PaymentOrderEntity>> {
        let state = self.state.lock().await;
        let subscribed = |user_id: &Uuid| {
            state
                .ledger
                .get(user_id)
                .and_then(|entry| entry.expired_at)
                .is_some_and(|expired_at| expired_at > now)
        };

        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| filter.status.is_none_or(|status| order.status == status.as_str()))
            .filter(|order| filter.user_id.is_none_or(|user_id| order.user_id == user_id))
            .filter(|order| {
                filter
                    .start_date
                    .is_none_or(|date| order.created_at >= start_of_day(date))
            })
            .filter(|order| {
                filter.end_date.is_none_or(|date| {
                    order.created_at < start_of_day(date) + chrono::Duration::days(1)
                })
            })
            .filter(|order| {
                filter
                    .is_subscribed
                    .is_none_or(|wanted| subscribed(&order.user_id) == wanted)
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = orders.len() as i64;
        let items = orders
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn revenue_by_package(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PackageRevenue>> {
        let state = self.state.lock().await;
        let mut totals: HashMap<String, i64> = HashMap::new();
        for order in state.orders.values().filter(|order| {
            order.status == "SUCCESS" && order.created_at >= start && order.created_at < end
        }) {
            let name = state
                .packages
                .iter()
                .find(|package| package.id == order.package_id)
                .map(|package| package.display_name.clone())
                .unwrap_or_else(|| "Unknown Package".to_string());
            *totals.entry(name).or_default() += order.amount;
        }

        let mut revenue: Vec<_> = totals
            .into_iter()
            .map(|(package_name, amount)| PackageRevenue {
                package_name,
                amount,
            })
            .collect();
        revenue.sort_by(|a, b| b.amount.cmp(&a.amount));
        Ok(revenue)
    }

    async fn revenue_by_bucket(
        &self,
        unit: ExtensionUnit,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RevenueBucket>> {
        let state = self.state.lock().await;
        let mut totals: HashMap<NaiveDate, i64> = HashMap::new();
        for order in state.orders.values().filter(|order| {
            order.status == "SUCCESS" && order.created_at >= start && order.created_at < end
        }) {
            let day = order.created_at.date_naive();
            let bucket_start = match unit {
                ExtensionUnit::Day => day,
                ExtensionUnit::Month => day.with_day(1).unwrap_or(day),
            };
            *totals.entry(bucket_start).or_default() += order.amount;
        }

        let mut buckets: Vec<_> = totals
            .into_iter()
            .map(|(bucket_start, amount)| RevenueBucket {
                bucket_start,
                amount,
            })
            .collect();
        buckets.sort_by_key(|bucket| bucket.bucket_start);
        Ok(buckets)
    }

    async fn total_revenue(&self) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .filter(|order| order.status == "SUCCESS")
            .map(|order| order.amount)
            .sum())
    }
}

/// Gateway double. Callbacks are JSON `{orderCode, code, reference, signature}` and
/// count as authentic when `signature` equals [`FakeGateway::signature_for`].
#[derive(Default)]
pub struct FakeGateway {
    pub created_links: StdMutex<Vec<(i64, i64, String)>>,
}

impl FakeGateway {
    pub fn signature_for(order_code: i64, code: &str) -> String {
        format!("sig-{order_code}-{code}")
    }

    pub fn callback_body(order_code: i64, code: &str) -> Vec<u8> {
        Self::body_with_signature(order_code, code, &Self::signature_for(order_code, code))
    }

    pub fn body_with_signature(order_code: i64, code: &str, signature: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "orderCode": order_code,
            "code": code,
            "reference": format!("FT{order_code}"),
            "signature": signature,
        }))
        .expect("callback body serializes")
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_link(
        &self,
        order_code: i64,
        amount: i64,
        description: &str,
        _return_url: &str,
        _cancel_url: &str,
    ) -> Result<PaymentLink> {
        self.created_links
            .lock()
            .expect("links lock")
            .push((order_code, amount, description.to_string()));
        Ok(PaymentLink {
            checkout_url: format!("https://pay.payos.vn/web/{order_code}"),
            payment_link_id: Some(format!("link-{order_code}")),
        })
    }

    fn verify_and_parse_webhook(&self, raw_body: &[u8]) -> Result<GatewayCallback> {
        let body: Value = serde_json::from_slice(raw_body)?;
        let order_code = body["orderCode"]
            .as_i64()
            .ok_or_else(|| anyhow!("missing orderCode"))?;
        let code = body["code"]
            .as_str()
            .ok_or_else(|| anyhow!("missing code"))?
            .to_string();

        if body["signature"].as_str() != Some(Self::signature_for(order_code, &code).as_str()) {
            return Err(anyhow!("invalid webhook signature"));
        }

        Ok(GatewayCallback {
            order_code,
            result_code: code,
            reference: body["reference"].as_str().map(str::to_string),
            raw_payload: String::from_utf8_lossy(raw_body).into_owned(),
        })
    }

    async fn register_webhook(&self, _webhook_url: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub confirmations: StdMutex<Vec<PurchaseConfirmation>>,
    pub extensions: StdMutex<Vec<ExtensionNotice>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.lock().expect("notifier lock").len()
    }
}

impl SubscriptionNotifier for RecordingNotifier {
    fn send_confirmation(&self, confirmation: PurchaseConfirmation) -> Result<()> {
        self.confirmations
            .lock()
            .expect("notifier lock")
            .push(confirmation);
        if self.fail {
            return Err(anyhow!("notification channel down"));
        }
        Ok(())
    }

    fn send_extension(&self, notice: ExtensionNotice) -> Result<()> {
        self.extensions.lock().expect("notifier lock").push(notice);
        if self.fail {
            return Err(anyhow!("notification channel down"));
        }
        Ok(())
    }
}

pub type TestPurchases = PurchaseUseCase<MemoryStore, MemoryStore, FakeGateway>;
pub type TestWebhook = PaymentWebhookUseCase<MemoryStore, FakeGateway, RecordingNotifier>;
pub type TestSubscriptions = SubscriptionUseCase<MemoryStore, MemoryStore, MemoryStore>;
pub type TestAdmin = AdminUseCase<MemoryStore, MemoryStore, MemoryStore, FakeGateway, RecordingNotifier>;

/// The billing use cases wired against one shared in-memory store.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub purchases: TestPurchases,
    pub webhook: Arc<TestWebhook>,
    pub subscriptions: TestSubscriptions,
    pub admin: Arc<TestAdmin>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        let store = MemoryStore::with_default_packages();
        let gateway = Arc::new(FakeGateway::default());
        let notifier = Arc::new(notifier);

        let purchases = PurchaseUseCase::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&gateway),
            Arc::new(OrderCodeGenerator::new()),
            CheckoutUrls {
                return_url: "https://app.example/payment/success".to_string(),
                cancel_url: "https://app.example/payment/cancel".to_string(),
            },
            Duration::from_secs(10),
        );
        let webhook = Arc::new(PaymentWebhookUseCase::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            Arc::clone(&notifier),
        ));
        let subscriptions =
            SubscriptionUseCase::new(Arc::clone(&store), Arc::clone(&store), Arc::clone(&store));
        let admin = Arc::new(AdminUseCase::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&gateway),
            Arc::clone(&notifier),
            None,
        ));

        Self {
            store,
            gateway,
            notifier,
            purchases,
            webhook,
            subscriptions,
            admin,
        }
    }
}

/// Asserts `actual` lies in `[lower, upper]`, for expiries computed from a clock read
/// somewhere inside the operation.
pub fn assert_between(actual: DateTime<Utc>, lower: DateTime<Utc>, upper: DateTime<Utc>) {
    assert!(
        actual >= lower && actual <= upper,
        "{actual} is not within [{lower}, {upper}]"
    );
}
