use std::sync::Arc;

use farmlink_catalog::ProductService;
use farmlink_core::{AccountService, AuthConfig, TokenService};
use farmlink_order::OrderManager;
use farmlink_store::Repositories;

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderManager>,
    pub products: Arc<ProductService>,
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(repos: Repositories, auth: &AuthConfig) -> Self {
        let tokens = Arc::new(TokenService::new(auth));
        Self {
            orders: Arc::new(OrderManager::new(repos.orders, repos.catalog)),
            products: Arc::new(ProductService::new(repos.products)),
            accounts: Arc::new(AccountService::new(repos.users, tokens.clone())),
            tokens,
        }
    }
}
