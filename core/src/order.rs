//! Orders: immutable priced line items plus a status/payment lifecycle.
//!
//! An order is created once, at checkout, from a priced cart snapshot. Its
//! lines and total are frozen from then on. Only the payment reducer
//! ([`crate::payment`]) and the fulfillment reducer ([`crate::fulfillment`])
//! may change it, and they only touch the two status fields.

use crate::cart::CartSnapshot;
use crate::environment::Clock;
use crate::error::CanteenError;
use crate::money::Money;
use crate::payment::PaymentMethod;
use crate::types::{ItemId, OrderId, PickupCode, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Fulfillment status of an order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, waiting for payment
    Pending,
    /// Paid, in the kitchen
    Preparing,
    /// Waiting at the counter
    Ready,
    /// Picked up (terminal)
    Completed,
    /// Cancelled by staff (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Every status, in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Preparing,
        Self::Ready,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the order is still moving through the kitchen.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Preparing | Self::Ready)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status of an order. Moves `pending → paid` or `pending → failed`, never back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No outcome recorded yet
    Pending,
    /// Payment captured
    Paid,
    /// Payment declined
    Failed,
}

impl PaymentStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frozen copy of catalog data taken at checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Catalog item
    pub item_id: ItemId,
    /// Name at checkout
    pub name: String,
    /// Price per unit at checkout
    pub unit_price: Money,
    /// Quantity ordered
    pub quantity: u32,
}

impl OrderLine {
    /// `unit_price * quantity` (saturating; construction already checked overflow).
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price
            .checked_mul(self.quantity)
            .unwrap_or(Money::from_cents(i64::MAX))
    }
}

/// Identity assigned to a new order by the ledger.
#[derive(Clone, Debug)]
pub struct NewOrder {
    /// Generated id
    pub id: OrderId,
    /// Generated pickup code
    pub pickup_code: PickupCode,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// An order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    lines: Vec<OrderLine>,
    total_amount: Money,
    pub(crate) status: OrderStatus,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) payment_method: Option<PaymentMethod>,
    created_at: DateTime<Utc>,
    prep_time_minutes: u32,
    pickup_code: PickupCode,
}

impl Order {
    /// Freeze a priced cart snapshot into a new order.
    ///
    /// Lines copy the snapshot's current prices. The total is the exact sum of
    /// line subtotals. Prep time is the longest prep time among the items,
    /// since the kitchen prepares items in parallel.
    ///
    /// # Errors
    ///
    /// - [`CanteenError::EmptyCart`] if the snapshot has no lines
    /// - [`CanteenError::ItemUnavailable`] for the first line that cannot be ordered
    /// - [`CanteenError::InvalidState`] if the total is not positive or disagrees with the snapshot
    pub fn from_snapshot(new: NewOrder, snapshot: &CartSnapshot) -> Result<Self, CanteenError> {
        if snapshot.is_empty() {
            return Err(CanteenError::EmptyCart);
        }
        if let Some(line) = snapshot.lines.iter().find(|l| !l.available) {
            return Err(CanteenError::ItemUnavailable(line.item_id.clone()));
        }

        let lines: Vec<OrderLine> = snapshot
            .lines
            .iter()
            .map(|l| OrderLine {
                item_id: l.item_id.clone(),
                name: l.name.clone(),
                unit_price: l.unit_price,
                quantity: l.quantity,
            })
            .collect();

        let total_amount = Money::checked_sum(lines.iter().map(|l| {
            l.unit_price.checked_mul(l.quantity).unwrap_or(Money::from_cents(i64::MAX))
        }))
        .ok_or_else(|| CanteenError::InvalidState("order total overflows".into()))?;

        if total_amount != snapshot.amount {
            return Err(CanteenError::InvalidState(format!(
                "order total {total_amount} does not match cart amount {}",
                snapshot.amount
            )));
        }
        if !total_amount.is_positive() {
            return Err(CanteenError::InvalidState(format!(
                "order total must be positive, got {total_amount}"
            )));
        }

        let prep_time_minutes = snapshot
            .lines
            .iter()
            .map(|l| l.prep_time_minutes)
            .max()
            .unwrap_or(0);

        Ok(Self {
            id: new.id,
            user_id: snapshot.user_id.clone(),
            lines,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            created_at: new.created_at,
            prep_time_minutes,
            pickup_code: new.pickup_code,
        })
    }

    /// Order id
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Owner
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Lines in creation order
    #[must_use]
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Frozen total
    #[must_use]
    pub const fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Fulfillment status
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Payment status
    #[must_use]
    pub const fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Method used for the recorded payment attempt, if any
    #[must_use]
    pub const fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    /// Creation time
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Estimated preparation time (longest item)
    #[must_use]
    pub const fn prep_time_minutes(&self) -> u32 {
        self.prep_time_minutes
    }

    /// When the order should be ready, counted from creation.
    #[must_use]
    pub fn estimated_ready_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(i64::from(self.prep_time_minutes))
    }

    /// Pickup code
    #[must_use]
    pub const fn pickup_code(&self) -> &PickupCode {
        &self.pickup_code
    }

    /// Whether the order belongs in the staff queue: paid and not yet closed.
    #[must_use]
    pub const fn in_staff_queue(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Paid) && self.status.is_active()
    }

    /// Check the cross-field invariants that must hold whenever an order is persisted.
    ///
    /// # Errors
    ///
    /// [`CanteenError::InvalidState`] if the order is `pending` yet `paid`, if it
    /// advanced past `pending` without being paid, or if its total drifted from its lines.
    pub fn check_consistency(&self) -> Result<(), CanteenError> {
        match (self.status, self.payment_status) {
            (OrderStatus::Pending, PaymentStatus::Paid) => {
                return Err(CanteenError::InvalidState(format!(
                    "order {} is paid but still pending",
                    self.id
                )));
            },
            (OrderStatus::Preparing | OrderStatus::Ready | OrderStatus::Completed, p)
                if p != PaymentStatus::Paid =>
            {
                return Err(CanteenError::InvalidState(format!(
                    "order {} is {} without payment",
                    self.id, self.status
                )));
            },
            _ => {},
        }

        let sum = Money::checked_sum(self.lines.iter().map(OrderLine::subtotal));
        if sum != Some(self.total_amount) {
            return Err(CanteenError::InvalidState(format!(
                "order {} total does not match its lines",
                self.id
            )));
        }
        Ok(())
    }
}

/// What happened to an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    /// Payment captured; the order entered the kitchen.
    PaymentCaptured {
        /// Order
        order_id: OrderId,
        /// Method used
        method: PaymentMethod,
        /// When
        at: DateTime<Utc>,
    },
    /// Payment declined; the order stays pending and out of the staff queue.
    PaymentDeclined {
        /// Order
        order_id: OrderId,
        /// Method used
        method: PaymentMethod,
        /// Gateway or cashier reason
        reason: String,
        /// When
        at: DateTime<Utc>,
    },
    /// Status moved along the fulfillment graph.
    StatusChanged {
        /// Order
        order_id: OrderId,
        /// Previous status
        from: OrderStatus,
        /// New status
        to: OrderStatus,
        /// When
        at: DateTime<Utc>,
    },
}

/// Environment for order reducers
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Clock for event timestamps
    pub clock: Arc<dyn Clock>,
}

impl OrderEnvironment {
    /// Creates a new order environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl fmt::Debug for OrderEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderEnvironment").finish_non_exhaustive()
    }
}
