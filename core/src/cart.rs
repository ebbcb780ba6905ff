//! Cart engine rules.
//!
//! A cart is a per-user basket of `(item, quantity)` lines, at most one line
//! per item. Totals are never stored: [`CartSnapshot::price`] recomputes them
//! from the line list and the catalog's current prices on every read.

use crate::catalog::CatalogItem;
use crate::error::CanteenError;
use crate::money::Money;
use crate::reducer::{Events, Reducer};
use crate::types::{ItemId, UserId};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::collections::HashMap;

/// One line of a cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog item
    pub item_id: ItemId,
    /// Quantity, always at least 1
    pub quantity: u32,
}

impl CartLine {
    /// Creates a line.
    #[must_use]
    pub fn new(item_id: ItemId, quantity: u32) -> Self {
        Self { item_id, quantity }
    }
}

/// A user's cart.
///
/// Lines keep insertion order for display; lookups go by item id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart for `user_id`.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
        }
    }

    /// Owner of the cart.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Current lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity of `item_id` in the cart (0 when absent).
    #[must_use]
    pub fn quantity_of(&self, item_id: &ItemId) -> u32 {
        self.position(item_id)
            .and_then(|idx| self.lines.get(idx))
            .map_or(0, |line| line.quantity)
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    fn position(&self, item_id: &ItemId) -> Option<usize> {
        self.lines.iter().position(|l| &l.item_id == item_id)
    }

    fn set_line(&mut self, item_id: &ItemId, quantity: u32) {
        match self.position(item_id) {
            Some(idx) => {
                if let Some(line) = self.lines.get_mut(idx) {
                    line.quantity = quantity;
                }
            },
            None => self.lines.push(CartLine::new(item_id.clone(), quantity)),
        }
    }

    fn remove_line(&mut self, item_id: &ItemId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.item_id != item_id);
        self.lines.len() != before
    }
}

/// Catalog entries the engine looked up before reducing a cart action.
///
/// Any action that raises an item's quantity needs that item to be present
/// here and available. Removals never consult it.
#[derive(Clone, Debug, Default)]
pub struct CartEnvironment {
    items: HashMap<ItemId, CatalogItem>,
}

impl CartEnvironment {
    /// Builds the view from looked-up catalog items.
    #[must_use]
    pub fn new(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }

    /// A view with no catalog entries (enough for removals and clears).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    fn ensure_orderable(&self, item_id: &ItemId) -> Result<(), CanteenError> {
        match self.items.get(item_id) {
            None => Err(CanteenError::item_not_found(item_id)),
            Some(item) if !item.available => Err(CanteenError::ItemUnavailable(item_id.clone())),
            Some(_) => Ok(()),
        }
    }
}

/// Cart commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartAction {
    /// Add one unit of an item.
    AddItem {
        /// Item to add
        item_id: ItemId,
    },
    /// Add several lines at once, merging with existing ones (reorder).
    AddLines {
        /// Lines to merge in
        lines: Vec<CartLine>,
    },
    /// Set an item's quantity; zero or less removes the line.
    SetQuantity {
        /// Item to change
        item_id: ItemId,
        /// New quantity
        quantity: i64,
    },
    /// Remove an item's line. Removing an absent item is a no-op.
    RemoveItem {
        /// Item to remove
        item_id: ItemId,
    },
    /// Empty the cart.
    Clear,
}

impl CartAction {
    /// Items whose catalog entries the reducer may need.
    #[must_use]
    pub fn items_to_check(&self) -> Vec<ItemId> {
        match self {
            Self::AddItem { item_id } => vec![item_id.clone()],
            Self::SetQuantity { item_id, quantity } if *quantity > 0 => vec![item_id.clone()],
            Self::AddLines { lines } => lines.iter().map(|l| l.item_id.clone()).collect(),
            Self::SetQuantity { .. } | Self::RemoveItem { .. } | Self::Clear => Vec::new(),
        }
    }
}

/// What happened to a cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    /// A new line was inserted.
    LineAdded {
        /// Item
        item_id: ItemId,
        /// Initial quantity
        quantity: u32,
    },
    /// An existing line's quantity changed.
    QuantityChanged {
        /// Item
        item_id: ItemId,
        /// Previous quantity
        from: u32,
        /// New quantity
        to: u32,
    },
    /// A line was removed.
    LineRemoved {
        /// Item
        item_id: ItemId,
    },
    /// Every line was removed.
    Cleared {
        /// How many lines were dropped
        lines: usize,
    },
}

/// Reducer for cart actions.
#[derive(Clone, Copy, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    fn grow(
        cart: &Cart,
        item_id: &ItemId,
        by: u32,
        env: &CartEnvironment,
    ) -> Result<(u32, u32), CanteenError> {
        env.ensure_orderable(item_id)?;
        let from = cart.quantity_of(item_id);
        let to = from.checked_add(by).ok_or_else(|| {
            CanteenError::InvalidState(format!("quantity of item {item_id} overflows"))
        })?;
        Ok((from, to))
    }

    fn change_event(item_id: &ItemId, from: u32, to: u32) -> CartEvent {
        if from == 0 {
            CartEvent::LineAdded {
                item_id: item_id.clone(),
                quantity: to,
            }
        } else {
            CartEvent::QuantityChanged {
                item_id: item_id.clone(),
                from,
                to,
            }
        }
    }
}

impl Reducer for CartReducer {
    type State = Cart;
    type Action = CartAction;
    type Event = CartEvent;
    type Environment = CartEnvironment;

    fn reduce(
        &self,
        cart: &mut Cart,
        action: CartAction,
        env: &CartEnvironment,
    ) -> Result<Events<CartEvent>, CanteenError> {
        match action {
            CartAction::AddItem { item_id } => {
                let (from, to) = Self::grow(cart, &item_id, 1, env)?;
                cart.set_line(&item_id, to);
                Ok(smallvec![Self::change_event(&item_id, from, to)])
            },

            CartAction::AddLines { lines } => {
                // Validate everything against a scratch copy first.
                let mut next = cart.clone();
                let mut events = SmallVec::new();
                for line in lines.into_iter().filter(|l| l.quantity > 0) {
                    let (from, to) = Self::grow(&next, &line.item_id, line.quantity, env)?;
                    next.set_line(&line.item_id, to);
                    events.push(Self::change_event(&line.item_id, from, to));
                }
                *cart = next;
                Ok(events)
            },

            CartAction::SetQuantity { item_id, quantity } if quantity <= 0 => {
                if cart.remove_line(&item_id) {
                    Ok(smallvec![CartEvent::LineRemoved { item_id }])
                } else {
                    Ok(SmallVec::new())
                }
            },

            CartAction::SetQuantity { item_id, quantity } => {
                let to = u32::try_from(quantity).map_err(|_| {
                    CanteenError::InvalidState(format!("quantity {quantity} is too large"))
                })?;
                let from = cart.quantity_of(&item_id);
                if from == to {
                    return Ok(SmallVec::new());
                }
                if to > from {
                    env.ensure_orderable(&item_id)?;
                }
                cart.set_line(&item_id, to);
                Ok(smallvec![Self::change_event(&item_id, from, to)])
            },

            CartAction::RemoveItem { item_id } => {
                if cart.remove_line(&item_id) {
                    Ok(smallvec![CartEvent::LineRemoved { item_id }])
                } else {
                    Ok(SmallVec::new())
                }
            },

            CartAction::Clear => {
                let lines = cart.lines.len();
                cart.lines.clear();
                if lines == 0 {
                    Ok(SmallVec::new())
                } else {
                    Ok(smallvec![CartEvent::Cleared { lines }])
                }
            },
        }
    }
}

/// A cart line priced against the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    /// Item
    pub item_id: ItemId,
    /// Current catalog name
    pub name: String,
    /// Current catalog price
    pub unit_price: Money,
    /// Quantity in the cart
    pub quantity: u32,
    /// `unit_price * quantity`
    pub subtotal: Money,
    /// Whether the item can currently be ordered
    pub available: bool,
    /// Current catalog prep time
    pub prep_time_minutes: u32,
}

/// Read model of a cart: lines with live prices and computed totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Owner
    pub user_id: UserId,
    /// Priced lines in cart order
    pub lines: Vec<PricedLine>,
    /// Sum of quantities
    pub item_count: u64,
    /// Sum of subtotals at current prices
    pub amount: Money,
}

impl CartSnapshot {
    /// Price `cart` against `catalog`.
    ///
    /// # Errors
    ///
    /// [`CanteenError::NotFound`] if a line's item is no longer in the catalog,
    /// [`CanteenError::InvalidState`] if the amount overflows.
    pub fn price(
        cart: &Cart,
        catalog: &HashMap<ItemId, CatalogItem>,
    ) -> Result<Self, CanteenError> {
        let overflow = || CanteenError::InvalidState("cart amount overflows".into());

        let lines = cart
            .lines()
            .iter()
            .map(|line| {
                let item = catalog
                    .get(&line.item_id)
                    .ok_or_else(|| CanteenError::item_not_found(&line.item_id))?;
                let subtotal = item.unit_price.checked_mul(line.quantity).ok_or_else(overflow)?;
                Ok(PricedLine {
                    item_id: line.item_id.clone(),
                    name: item.name.clone(),
                    unit_price: item.unit_price,
                    quantity: line.quantity,
                    subtotal,
                    available: item.available,
                    prep_time_minutes: item.prep_time_minutes,
                })
            })
            .collect::<Result<Vec<_>, CanteenError>>()?;

        let amount = Money::checked_sum(lines.iter().map(|l| l.subtotal)).ok_or_else(overflow)?;

        Ok(Self {
            user_id: cart.user_id().clone(),
            item_count: cart.item_count(),
            lines,
            amount,
        })
    }

    /// Whether the snapshot has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    fn menu_item(id: &str, cents: i64, available: bool) -> CatalogItem {
        CatalogItem {
            id: ItemId::new(id),
            name: format!("Item {id}"),
            category: "test".into(),
            unit_price: Money::from_cents(cents),
            available,
            prep_time_minutes: 5,
            is_vegetarian: true,
        }
    }

    fn env() -> CartEnvironment {
        CartEnvironment::new([menu_item("1", 799, true), menu_item("5", 399, true), menu_item("9", 100, false)])
    }

    fn add(cart: &mut Cart, id: &str) -> Result<Events<CartEvent>, CanteenError> {
        CartReducer.reduce(cart, CartAction::AddItem { item_id: ItemId::new(id) }, &env())
    }

    #[test]
    fn adding_existing_item_increments_instead_of_duplicating() {
        let mut cart = Cart::new(UserId::new("u"));
        add(&mut cart, "1").unwrap();
        let events = add(&mut cart, "1").unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(&ItemId::new("1")), 2);
        assert_eq!(
            events.as_slice(),
            [CartEvent::QuantityChanged {
                item_id: ItemId::new("1"),
                from: 1,
                to: 2
            }]
        );
    }

    #[test]
    fn adding_unavailable_or_unknown_item_is_rejected_without_change() {
        let mut cart = Cart::new(UserId::new("u"));
        add(&mut cart, "1").unwrap();
        let before = cart.clone();

        assert_eq!(add(&mut cart, "9"), Err(CanteenError::ItemUnavailable(ItemId::new("9"))));
        assert!(matches!(add(&mut cart, "404"), Err(CanteenError::NotFound { .. })));
        assert_eq!(cart, before);
    }

    #[test]
    fn set_quantity_zero_or_negative_removes() {
        let mut cart = Cart::new(UserId::new("u"));
        add(&mut cart, "1").unwrap();
        let events = CartReducer
            .reduce(
                &mut cart,
                CartAction::SetQuantity { item_id: ItemId::new("1"), quantity: -3 },
                &CartEnvironment::empty(),
            )
            .unwrap();
        assert!(cart.is_empty());
        assert_eq!(events.as_slice(), [CartEvent::LineRemoved { item_id: ItemId::new("1") }]);
    }

    #[test]
    fn lowering_quantity_of_unavailable_item_is_allowed() {
        let mut cart = Cart::new(UserId::new("u"));
        CartReducer
            .reduce(
                &mut cart,
                CartAction::AddLines { lines: vec![CartLine::new(ItemId::new("1"), 4)] },
                &env(),
            )
            .unwrap();

        // Item went off the menu; the customer can still shrink the line.
        let off_menu = CartEnvironment::new([menu_item("1", 799, false)]);
        CartReducer
            .reduce(
                &mut cart,
                CartAction::SetQuantity { item_id: ItemId::new("1"), quantity: 2 },
                &off_menu,
            )
            .unwrap();
        assert_eq!(cart.quantity_of(&ItemId::new("1")), 2);

        let raised = CartReducer.reduce(
            &mut cart,
            CartAction::SetQuantity { item_id: ItemId::new("1"), quantity: 3 },
            &off_menu,
        );
        assert_eq!(raised, Err(CanteenError::ItemUnavailable(ItemId::new("1"))));
    }

    #[test]
    fn remove_absent_item_is_a_no_op() {
        let mut cart = Cart::new(UserId::new("u"));
        let events = CartReducer
            .reduce(&mut cart, CartAction::RemoveItem { item_id: ItemId::new("7") }, &CartEnvironment::empty())
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn add_lines_is_all_or_nothing() {
        let mut cart = Cart::new(UserId::new("u"));
        let result = CartReducer.reduce(
            &mut cart,
            CartAction::AddLines {
                lines: vec![CartLine::new(ItemId::new("1"), 2), CartLine::new(ItemId::new("9"), 1)],
            },
            &env(),
        );
        assert!(result.is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn clear_reports_dropped_lines() {
        let mut cart = Cart::new(UserId::new("u"));
        add(&mut cart, "1").unwrap();
        add(&mut cart, "5").unwrap();
        let events = CartReducer.reduce(&mut cart, CartAction::Clear, &CartEnvironment::empty()).unwrap();
        assert_eq!(events.as_slice(), [CartEvent::Cleared { lines: 2 }]);
        assert!(cart.is_empty());
    }

    #[test]
    fn snapshot_uses_current_prices() {
        let mut cart = Cart::new(UserId::new("u"));
        add(&mut cart, "1").unwrap();
        add(&mut cart, "1").unwrap();
        add(&mut cart, "5").unwrap();

        let mut catalog: HashMap<_, _> = [menu_item("1", 799, true), menu_item("5", 399, true)]
            .into_iter()
            .map(|i| (i.id.clone(), i))
            .collect();
        let snapshot = CartSnapshot::price(&cart, &catalog).unwrap();
        assert_eq!(snapshot.item_count, 3);
        assert_eq!(snapshot.amount, Money::from_cents(1997));

        catalog.insert(ItemId::new("5"), menu_item("5", 450, true));
        let snapshot = CartSnapshot::price(&cart, &catalog).unwrap();
        assert_eq!(snapshot.amount, Money::from_cents(2048));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Add(usize),
            Set(usize, i64),
            Remove(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..4).prop_map(Op::Add),
                (0usize..4, -2i64..6).prop_map(|(i, q)| Op::Set(i, q)),
                (0usize..4).prop_map(Op::Remove),
            ]
        }

        proptest! {
            #[test]
            fn amount_always_matches_lines(ops in prop::collection::vec(op(), 0..40)) {
                let prices = [799_i64, 399, 1199, 499];
                let items: Vec<CatalogItem> = prices
                    .iter()
                    .enumerate()
                    .map(|(i, p)| menu_item(&i.to_string(), *p, true))
                    .collect();
                let env = CartEnvironment::new(items.clone());
                let catalog: HashMap<_, _> = items.iter().map(|i| (i.id.clone(), i.clone())).collect();
                let mut cart = Cart::new(UserId::new("u"));

                for op in ops {
                    let action = match op {
                        Op::Add(i) => CartAction::AddItem { item_id: ItemId::new(i.to_string()) },
                        Op::Set(i, q) => CartAction::SetQuantity { item_id: ItemId::new(i.to_string()), quantity: q },
                        Op::Remove(i) => CartAction::RemoveItem { item_id: ItemId::new(i.to_string()) },
                    };
                    CartReducer.reduce(&mut cart, action, &env).unwrap();
                }

                let snapshot = CartSnapshot::price(&cart, &catalog).unwrap();
                let expected: i64 = cart
                    .lines()
                    .iter()
                    .map(|l| catalog[&l.item_id].unit_price.cents() * i64::from(l.quantity))
                    .sum();
                prop_assert_eq!(snapshot.amount.cents(), expected);
                prop_assert!(cart.lines().iter().all(|l| l.quantity >= 1));
                let mut ids: Vec<_> = cart.lines().iter().map(|l| l.item_id.clone()).collect();
                ids.sort();
                ids.dedup();
                prop_assert_eq!(ids.len(), cart.lines().len());
            }
        }
    }
}
