//! Shared application state.

use payments::GatewayRegistry;
use services::{
    AccountService, CallbackUrls, CatalogService, CheckoutCoordinator, CustomerService, OrderDesk,
    ShipmentService,
};
use store::Store;

use crate::config::Config;

/// Services shared by all handlers, each over the same store.
pub struct AppState<S: Store> {
    pub checkout: CheckoutCoordinator<S>,
    pub orders: OrderDesk<S>,
    pub accounts: AccountService<S>,
    pub catalog: CatalogService<S>,
    pub customers: CustomerService<S>,
    pub shipments: ShipmentService<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, gateways: GatewayRegistry, config: &Config) -> Self {
        Self {
            checkout: CheckoutCoordinator::new(
                store.clone(),
                gateways,
                CallbackUrls::from_base(&config.public_base_url),
            ),
            orders: OrderDesk::new(store.clone()),
            accounts: AccountService::new(store.clone(), config.session_ttl()),
            catalog: CatalogService::new(store.clone()),
            customers: CustomerService::new(store.clone()),
            shipments: ShipmentService::new(store),
        }
    }
}
