//! Cart validation and server-side pricing at checkout.

use std::collections::HashMap;

use chrono::NaiveDate;
use common::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::order::{DeliveryDetails, OrderLine, PaymentMethod};

/// Reasons a checkout is refused. Any of these aborts the whole order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Invalid quantity for product {product_id}: must be at least 1")]
    InvalidQuantity { product_id: ProductId },

    #[error("Quantity for product {product_id} is too large")]
    QuantityTooLarge { product_id: ProductId },

    #[error("Product '{product_id}' not found. It may have been removed.")]
    ProductNotFound { product_id: ProductId },

    #[error("{name} is not available for order")]
    ProductUnavailable { name: String },

    #[error("Insufficient stock for {name}. Available: {available}")]
    InsufficientStock {
        name: String,
        available: u32,
        requested: u32,
    },
}

/// One product and quantity in the customer's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A validated cart: non-empty, positive quantities, one line per product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Validates raw cart lines, merging repeated products while keeping the
    /// order in which they were first added.
    pub fn new(raw: Vec<CartLine>) -> Result<Self, CheckoutError> {
        if raw.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let mut lines: Vec<CartLine> = Vec::with_capacity(raw.len());
        let mut positions: HashMap<ProductId, usize> = HashMap::new();
        for line in raw {
            if line.quantity == 0 {
                return Err(CheckoutError::InvalidQuantity {
                    product_id: line.product_id,
                });
            }
            match positions.get(&line.product_id) {
                Some(&index) => {
                    let merged = &mut lines[index];
                    merged.quantity = merged.quantity.checked_add(line.quantity).ok_or(
                        CheckoutError::QuantityTooLarge {
                            product_id: line.product_id,
                        },
                    )?;
                }
                None => {
                    positions.insert(line.product_id, lines.len());
                    lines.push(line);
                }
            }
        }
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Product ids in ascending order, the order in which rows are locked.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.lines.iter().map(|line| line.product_id).collect();
        ids.sort();
        ids
    }
}

/// Everything the customer submits at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub cart: Cart,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryDetails,
    pub requested_delivery_date: Option<NaiveDate>,
}

/// Prices the cart against current catalog rows and checks availability.
///
/// `products` must hold the current (locked) rows for the cart's products;
/// client-side prices are never trusted.
pub fn price_lines(cart: &Cart, products: &[Product]) -> Result<Vec<OrderLine>, CheckoutError> {
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    cart.lines()
        .iter()
        .map(|line| {
            let product =
                by_id
                    .get(&line.product_id)
                    .ok_or(CheckoutError::ProductNotFound {
                        product_id: line.product_id,
                    })?;
            if !product.is_purchasable() {
                return Err(CheckoutError::ProductUnavailable {
                    name: product.name.clone(),
                });
            }
            if product.stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.stock,
                    requested: line.quantity,
                });
            }
            Ok(OrderLine::new(
                product.id,
                product.name.clone(),
                line.quantity,
                product.price,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::catalog::{Category, NewProduct};
    use crate::money::Money;

    fn product(name: &str, rupees: i64, stock: u32) -> Product {
        Product::create(
            NewProduct::new(name, Category::Bedroom, Money::from_rupees(rupees), stock),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_cart_rejects_empty_and_zero_quantity() {
        assert_eq!(Cart::new(vec![]), Err(CheckoutError::EmptyCart));
        let id = ProductId::new();
        assert_eq!(
            Cart::new(vec![CartLine {
                product_id: id,
                quantity: 0
            }]),
            Err(CheckoutError::InvalidQuantity { product_id: id })
        );
    }

    #[test]
    fn test_cart_merges_duplicate_products() {
        let a = ProductId::new();
        let b = ProductId::new();
        let cart = Cart::new(vec![
            CartLine {
                product_id: a,
                quantity: 1,
            },
            CartLine {
                product_id: b,
                quantity: 2,
            },
            CartLine {
                product_id: a,
                quantity: 3,
            },
        ])
        .unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].product_id, a);
        assert_eq!(cart.lines()[0].quantity, 4);
    }

    #[test]
    fn test_cart_merge_rejects_overflowing_quantity() {
        let id = ProductId::new();
        let err = Cart::new(vec![
            CartLine {
                product_id: id,
                quantity: u32::MAX,
            },
            CartLine {
                product_id: id,
                quantity: 2,
            },
        ])
        .unwrap_err();
        assert_eq!(err, CheckoutError::QuantityTooLarge { product_id: id });
    }

    #[test]
    fn test_price_lines_uses_catalog_prices() {
        let bed = product("Teak Bed", 60000, 3);
        let lamp = product("Bedside Lamp", 2500, 10);
        let cart = Cart::new(vec![
            CartLine {
                product_id: lamp.id,
                quantity: 2,
            },
            CartLine {
                product_id: bed.id,
                quantity: 1,
            },
        ])
        .unwrap();

        let lines = price_lines(&cart, &[bed.clone(), lamp.clone()]).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_name, "Bedside Lamp");
        assert_eq!(lines[0].unit_price, Money::from_rupees(2500));
        assert_eq!(lines[1].unit_price, Money::from_rupees(60000));
    }

    #[test]
    fn test_price_lines_reports_insufficient_stock() {
        let bed = product("Teak Bed", 60000, 1);
        let cart = Cart::new(vec![CartLine {
            product_id: bed.id,
            quantity: 2,
        }])
        .unwrap();

        let err = price_lines(&cart, &[bed]).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock for Teak Bed. Available: 1");
    }

    #[test]
    fn test_price_lines_rejects_missing_and_inactive_products() {
        let mut bed = product("Teak Bed", 60000, 5);
        let cart = Cart::new(vec![CartLine {
            product_id: bed.id,
            quantity: 1,
        }])
        .unwrap();

        assert_eq!(
            price_lines(&cart, &[]),
            Err(CheckoutError::ProductNotFound { product_id: bed.id })
        );

        bed.is_active = false;
        assert_eq!(
            price_lines(&cart, &[bed]),
            Err(CheckoutError::ProductUnavailable {
                name: "Teak Bed".into()
            })
        );
    }
}
