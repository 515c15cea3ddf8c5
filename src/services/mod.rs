//! Business logic services

pub mod borrowers;
pub mod catalog;
pub mod credentials;
pub mod loans;
pub mod notifier;

use std::sync::Arc;

use crate::circulation::{CirculationPolicy, Clock, CredentialVerifier, LoanEngine, Notifier, Stores};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub borrowers: borrowers::BorrowersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services on top of the given storage and collaborators
    pub fn new(
        stores: Stores,
        credentials: Arc<dyn CredentialVerifier>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: CirculationPolicy,
    ) -> Self {
        let default_loan_limit = policy.default_loan_limit;
        let engine = LoanEngine::new(stores.clone(), credentials, notifier, clock, policy);

        Self {
            borrowers: borrowers::BorrowersService::new(stores.clone(), default_loan_limit),
            catalog: catalog::CatalogService::new(stores.clone()),
            loans: loans::LoansService::new(engine, stores),
        }
    }
}
