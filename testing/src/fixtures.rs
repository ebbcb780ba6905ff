//! Seed data: the canteen menu and a few callers.

use canteen_core::catalog::CatalogItem;
use canteen_core::money::Money;
use canteen_core::types::{Caller, ItemId};

/// Veggie Burger, $7.99, 10 min
pub const VEGGIE_BURGER: &str = "1";
/// Chicken Burger, $8.99, 12 min
pub const CHICKEN_BURGER: &str = "2";
/// Margherita Pizza, $11.99, 15 min
pub const MARGHERITA_PIZZA: &str = "3";
/// Pepperoni Pizza, $13.99, 15 min
pub const PEPPERONI_PIZZA: &str = "4";
/// French Fries, $3.99, 8 min
pub const FRENCH_FRIES: &str = "5";
/// Chocolate Milkshake, $4.99, 5 min
pub const CHOCOLATE_MILKSHAKE: &str = "6";
/// Choco Lava Cake, $5.99, 10 min
pub const CHOCO_LAVA_CAKE: &str = "7";
/// Chicken Wrap, $7.49, 8 min
pub const CHICKEN_WRAP: &str = "8";

/// Every seeded item id.
pub const MENU_IDS: [&str; 8] = [
    VEGGIE_BURGER,
    CHICKEN_BURGER,
    MARGHERITA_PIZZA,
    PEPPERONI_PIZZA,
    FRENCH_FRIES,
    CHOCOLATE_MILKSHAKE,
    CHOCO_LAVA_CAKE,
    CHICKEN_WRAP,
];

fn item(
    id: &str,
    name: &str,
    category: &str,
    cents: i64,
    prep_time_minutes: u32,
    is_vegetarian: bool,
) -> CatalogItem {
    CatalogItem {
        id: ItemId::new(id),
        name: name.to_string(),
        category: category.to_string(),
        unit_price: Money::from_cents(cents),
        available: true,
        prep_time_minutes,
        is_vegetarian,
    }
}

/// The canteen's menu, all items available.
#[must_use]
pub fn menu() -> Vec<CatalogItem> {
    vec![
        item(VEGGIE_BURGER, "Veggie Burger", "burgers", 799, 10, true),
        item(CHICKEN_BURGER, "Chicken Burger", "burgers", 899, 12, false),
        item(MARGHERITA_PIZZA, "Margherita Pizza", "pizza", 1199, 15, true),
        item(PEPPERONI_PIZZA, "Pepperoni Pizza", "pizza", 1399, 15, false),
        item(FRENCH_FRIES, "French Fries", "sides", 399, 8, true),
        item(CHOCOLATE_MILKSHAKE, "Chocolate Milkshake", "beverages", 499, 5, true),
        item(CHOCO_LAVA_CAKE, "Choco Lava Cake", "desserts", 599, 10, true),
        item(CHICKEN_WRAP, "Chicken Wrap", "wraps", 749, 8, false),
    ]
}

/// A customer.
#[must_use]
pub fn alice() -> Caller {
    Caller::customer("user-alice")
}

/// Another customer.
#[must_use]
pub fn bob() -> Caller {
    Caller::customer("user-bob")
}

/// A kitchen staff member.
#[must_use]
pub fn chef() -> Caller {
    Caller::staff("staff-chef")
}
