//! Money in Nepalese rupees, stored as paisa.

use serde::{Deserialize, Serialize};

/// Money amount represented in paisa to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in paisa (e.g., 150000 = Rs. 1500.00)
    paisa: i64,
}

impl Money {
    /// Creates a new Money amount from paisa.
    pub fn from_paisa(paisa: i64) -> Self {
        Self { paisa }
    }

    /// Creates a new Money amount from whole rupees.
    pub fn from_rupees(rupees: i64) -> Self {
        Self {
            paisa: rupees * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { paisa: 0 }
    }

    /// Returns the amount in paisa.
    pub fn paisa(&self) -> i64 {
        self.paisa
    }

    /// Returns the rupee portion (whole number).
    pub fn rupees(&self) -> i64 {
        self.paisa / 100
    }

    /// Returns the paisa portion (remainder after rupees).
    pub fn paisa_part(&self) -> i64 {
        self.paisa.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.paisa > 0
    }

    pub fn is_zero(&self) -> bool {
        self.paisa == 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            paisa: self.paisa * i64::from(quantity),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.paisa < 0 {
            write!(f, "-Rs. {}.{:02}", self.rupees().abs(), self.paisa_part())
        } else {
            write!(f, "Rs. {}.{:02}", self.rupees(), self.paisa_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            paisa: self.paisa + rhs.paisa,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            paisa: self.paisa - rhs.paisa,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.paisa += rhs.paisa;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_paisa() {
        let money = Money::from_paisa(123456);
        assert_eq!(money.paisa(), 123456);
        assert_eq!(money.rupees(), 1234);
        assert_eq!(money.paisa_part(), 56);
    }

    #[test]
    fn test_money_from_rupees() {
        let money = Money::from_rupees(45000);
        assert_eq!(money.paisa(), 4_500_000);
        assert_eq!(money.paisa_part(), 0);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_paisa(123456).to_string(), "Rs. 1234.56");
        assert_eq!(Money::from_rupees(1).to_string(), "Rs. 1.00");
        assert_eq!(Money::from_paisa(5).to_string(), "Rs. 0.05");
        assert_eq!(Money::from_paisa(-250).to_string(), "-Rs. 2.50");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_rupees(10);
        let b = Money::from_rupees(4);

        assert_eq!((a + b).paisa(), 1400);
        assert_eq!((a - b).paisa(), 600);
        assert_eq!(a.multiply(3).paisa(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from_rupees(18));
    }
}
