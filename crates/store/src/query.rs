use chrono::{DateTime, Utc};
use common::UserId;
use domain::{Category, Order, OrderStatus, PaymentStatus, Product};

/// Builder for catalog listings.
///
/// Results are returned newest first.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category: Option<Category>,

    /// Case-insensitive substring of the product name.
    pub search: Option<String>,

    pub featured_only: bool,
    pub popular_only: bool,
    pub special_offers_only: bool,

    /// Hide products switched off by staff.
    pub active_only: bool,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing as shown on the storefront: active products only.
    pub fn storefront() -> Self {
        Self {
            active_only: true,
            ..Default::default()
        }
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into().trim().to_string();
        self.search = (!term.is_empty()).then_some(term);
        self
    }

    pub fn featured(mut self) -> Self {
        self.featured_only = true;
        self
    }

    pub fn popular(mut self) -> Self {
        self.popular_only = true;
        self
    }

    pub fn special_offers(mut self) -> Self {
        self.special_offers_only = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `product` passes every filter (paging aside).
    pub fn matches(&self, product: &Product) -> bool {
        if self.active_only && !product.is_active {
            return false;
        }
        if self.category.is_some_and(|c| c != product.category) {
            return false;
        }
        if self.featured_only && !product.is_featured {
            return false;
        }
        if self.popular_only && !product.is_popular {
            return false;
        }
        if self.special_offers_only && !product.is_special_offer {
            return false;
        }
        match &self.search {
            Some(term) => product
                .name
                .to_lowercase()
                .contains(&term.to_lowercase()),
            None => true,
        }
    }
}

/// Builder for order listings.
///
/// Results are returned newest first, optionally with pending orders ahead
/// of the rest. Ordering is applied before paging.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub customer_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub assigned_staff: Option<UserId>,

    /// Orders placed at or after this instant.
    pub from_date: Option<DateTime<Utc>>,

    /// Orders placed at or before this instant.
    pub to_date: Option<DateTime<Utc>>,

    pub pending_first: bool,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one customer's orders.
    pub fn for_customer(customer_id: UserId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn assigned_to(mut self, staff: UserId) -> Self {
        self.assigned_staff = Some(staff);
        self
    }

    pub fn from_date(mut self, date: DateTime<Utc>) -> Self {
        self.from_date = Some(date);
        self
    }

    pub fn to_date(mut self, date: DateTime<Utc>) -> Self {
        self.to_date = Some(date);
        self
    }

    /// Sorts Pending orders ahead of every other status.
    pub fn pending_first(mut self) -> Self {
        self.pending_first = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `order` passes every filter (paging aside).
    pub fn matches(&self, order: &Order) -> bool {
        self.customer_id.is_none_or(|id| id == order.customer_id)
            && self.status.is_none_or(|s| s == order.status)
            && self.payment_status.is_none_or(|s| s == order.payment_status)
            && self
                .assigned_staff
                .is_none_or(|id| order.assigned_staff == Some(id))
            && self.from_date.is_none_or(|from| order.order_date >= from)
            && self.to_date.is_none_or(|to| order.order_date <= to)
    }
}

/// Applies offset and limit to an already filtered and sorted list.
pub(crate) fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

#[cfg(test)]
mod tests {
    use domain::{Money, NewProduct};

    use super::*;

    fn product(name: &str) -> Product {
        Product::create(
            NewProduct::new(name, Category::Bedroom, Money::from_rupees(100), 1),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn search_is_case_insensitive() {
        let query = ProductQuery::storefront().search("oSLo");
        assert!(query.matches(&product("Oslo Sofa")));
        assert!(!query.matches(&product("Dining Chair")));
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = ProductQuery::new().search("   ");
        assert!(query.search.is_none());
    }

    #[test]
    fn storefront_hides_inactive_products() {
        let mut hidden = product("Oslo Sofa");
        hidden.toggle_active();
        assert!(!ProductQuery::storefront().matches(&hidden));
        assert!(ProductQuery::new().matches(&hidden));
    }

    #[test]
    fn category_and_flags_filter() {
        let mut featured = product("Bed Frame");
        featured.is_featured = true;
        assert!(ProductQuery::new().category(Category::Bedroom).featured().matches(&featured));
        assert!(!ProductQuery::new().category(Category::Dining).matches(&featured));
        assert!(!ProductQuery::new().popular().matches(&featured));
    }

    #[test]
    fn query_builder_chain() {
        let staff = UserId::new();
        let query = OrderQuery::new()
            .status(OrderStatus::Pending)
            .assigned_to(staff)
            .pending_first()
            .limit(20)
            .offset(40);

        assert_eq!(query.status, Some(OrderStatus::Pending));
        assert!(query.pending_first);
        assert_eq!(query.assigned_staff, Some(staff));
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(40));
    }

    #[test]
    fn paginate_skips_then_takes() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(paginate(items.clone(), Some(8), Some(5)), vec![8, 9]);
        assert_eq!(paginate(items, None, Some(3)), vec![0, 1, 2]);
    }
}
