//! Borrower registration and account management

use validator::Validate;

use crate::{
    circulation::{ChangeSet, CirculationError, Missing, StoreError, Stores},
    error::{AppError, AppResult},
    models::{
        borrower::{CreateBorrower, UpdateBorrower},
        Borrower, BorrowerPage, BorrowerQuery, NewBorrower,
    },
    services::credentials::hash_secret,
};

#[derive(Clone)]
pub struct BorrowersService {
    stores: Stores,
    default_loan_limit: i32,
}

impl BorrowersService {
    pub fn new(stores: Stores, default_loan_limit: i32) -> Self {
        Self {
            stores,
            default_loan_limit,
        }
    }

    /// Register a new borrower
    pub async fn create_borrower(&self, borrower: CreateBorrower) -> AppResult<Borrower> {
        borrower.validate()?;

        if self
            .stores
            .borrowers
            .find_by_registration(&borrower.registration)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Registration number already exists".to_string()));
        }

        if self.stores.borrowers.find_by_email(&borrower.email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let new_borrower = NewBorrower {
            credential_hash: hash_secret(&borrower.secret)?,
            loan_limit: borrower.loan_limit.unwrap_or(self.default_loan_limit),
            registration: borrower.registration,
            name: borrower.name,
            email: borrower.email,
        };

        let created = self.stores.borrowers.insert(new_borrower).await.map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Conflict("Registration number or email already exists".to_string()),
            other => other.into(),
        })?;

        tracing::info!(borrower_id = created.id, registration = %created.registration, "Borrower registered");
        Ok(created)
    }

    /// Get borrower by ID
    pub async fn get_borrower(&self, id: i32) -> AppResult<Borrower> {
        self.stores
            .borrowers
            .find_by_id(id)
            .await?
            .ok_or_else(|| CirculationError::NotFound(Missing::Borrower(id.to_string())).into())
    }

    /// Search borrowers with pagination
    pub async fn search_borrowers(&self, query: &BorrowerQuery) -> AppResult<BorrowerPage> {
        let (items, total) = self.stores.borrowers.search(query).await?;
        let paging = query.paging();
        Ok(BorrowerPage {
            items,
            total,
            page: paging.page,
            per_page: paging.per_page,
        })
    }

    /// Change name, email or loan limit. Registration and secret never change here.
    pub async fn update_borrower(&self, id: i32, update: UpdateBorrower) -> AppResult<Borrower> {
        update.validate()?;

        let mut borrower = self.get_borrower(id).await?;

        if let Some(email) = &update.email {
            if let Some(other) = self.stores.borrowers.find_by_email(email).await? {
                if other.id != id {
                    return Err(AppError::Conflict("Email already exists".to_string()));
                }
            }
        }

        if let Some(limit) = update.loan_limit {
            if limit < borrower.loans_in_progress {
                return Err(AppError::BusinessRule(format!(
                    "borrower {} holds {} loans, more than a limit of {}",
                    id, borrower.loans_in_progress, limit
                )));
            }
            borrower.loan_limit = limit;
        }
        if let Some(name) = update.name {
            borrower.name = name;
        }
        if let Some(email) = update.email {
            borrower.email = email;
        }

        self.commit(&mut borrower).await?;

        tracing::info!(borrower_id = borrower.id, "Borrower updated");
        Ok(borrower)
    }

    /// Mark a borrower inactive. Loans already in progress can still be renewed
    /// and returned.
    pub async fn deactivate_borrower(&self, id: i32) -> AppResult<Borrower> {
        self.set_active(id, false).await
    }

    /// Let an inactive borrower borrow again. Blocks are left as they are.
    pub async fn reactivate_borrower(&self, id: i32) -> AppResult<Borrower> {
        self.set_active(id, true).await
    }

    async fn set_active(&self, id: i32, active: bool) -> AppResult<Borrower> {
        let mut borrower = self.get_borrower(id).await?;
        if borrower.active == active {
            return Ok(borrower);
        }

        borrower.active = active;
        self.commit(&mut borrower).await?;

        if active {
            tracing::info!(borrower_id = borrower.id, "Borrower reactivated");
        } else {
            tracing::info!(borrower_id = borrower.id, "Borrower deactivated");
        }
        Ok(borrower)
    }

    async fn commit(&self, borrower: &mut Borrower) -> AppResult<()> {
        let mut changes = ChangeSet::new();
        changes.update_borrower(borrower);
        self.stores.unit_of_work.commit(changes).await?;
        borrower.version += 1;
        Ok(())
    }
}
