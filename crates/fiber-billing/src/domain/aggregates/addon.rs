//! Addon items owned by a subscriber.

use fiber_common::{EntityId, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Addon item attached to a subscriber's plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddonItem {
    id: EntityId,
    name: String,
    item_type: AddonType,
    price: Money,
    quantity: u32,
    /// Only meaningful for one-time items: billed exactly once, ever.
    is_paid: bool,
}

impl AddonItem {
    pub fn monthly(name: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            item_type: AddonType::Monthly,
            price,
            quantity: quantity.max(1),
            is_paid: false,
        }
    }

    pub fn one_time(name: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            item_type: AddonType::OneTime,
            price,
            quantity: quantity.max(1),
            is_paid: false,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn item_type(&self) -> AddonType {
        self.item_type
    }

    pub fn price(&self) -> &Money {
        &self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    /// Whether this item contributes to the next invoice.
    pub fn is_billable(&self) -> bool {
        match self.item_type {
            AddonType::Monthly => true,
            AddonType::OneTime => !self.is_paid,
        }
    }

    /// Total charge for this item (price x quantity).
    pub fn charge_total(&self) -> Money {
        self.price.multiply(Decimal::from(self.quantity))
    }

    /// Mark a one-time item as billed. Monthly items are unaffected.
    pub(crate) fn mark_billed(&mut self) {
        if self.item_type == AddonType::OneTime {
            self.is_paid = true;
        }
    }

    /// Charge line for an invoice breakdown.
    pub fn as_charge(&self) -> AddonCharge {
        AddonCharge {
            description: self.name.clone(),
            quantity: self.quantity,
            unit_price: self.price.clone(),
            amount: self.charge_total(),
        }
    }
}

/// Addon billing cadence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonType {
    OneTime,
    Monthly,
}

/// A priced line in an invoice breakdown
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddonCharge {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_always_billable() {
        let item = AddonItem::monthly("Static IP", Money::from_units(25_000), 1);
        assert!(item.is_billable());
        assert_eq!(item.charge_total(), Money::from_units(25_000));
    }

    #[test]
    fn test_one_time_billable_until_marked() {
        let mut item = AddonItem::one_time("Installation fee", Money::from_units(150_000), 1);
        assert!(item.is_billable());

        item.mark_billed();
        assert!(item.is_paid());
        assert!(!item.is_billable());
    }

    #[test]
    fn test_quantity_multiplies_charge() {
        let item = AddonItem::monthly("Mesh unit rental", Money::from_units(30_000), 3);
        assert_eq!(item.charge_total(), Money::from_units(90_000));
    }

    #[test]
    fn test_mark_billed_ignores_monthly() {
        let mut item = AddonItem::monthly("Static IP", Money::from_units(25_000), 1);
        item.mark_billed();
        assert!(!item.is_paid());
        assert!(item.is_billable());
    }
}
