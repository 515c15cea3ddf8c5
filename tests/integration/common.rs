//! Shared harness: in-memory storage, a clock the tests move by hand and a
//! notifier that remembers what it was told.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Barrier;

use library_circulation::{
    circulation::{
        BookKey, BorrowRequest, BorrowerKey, ChangeSet, CirculationPolicy, CommitReceipt, CredentialCheck,
        CredentialVerifier, FixedClock, Notifier, StoreError, StoreResult, Stores, UnitOfWork,
    },
    models::{Book, Borrower, Loan, NewBook, NewBorrower},
    repository::InMemoryStore,
    services::Services,
};

pub const SECRET: &str = "123456";

pub fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(offset)
}

/// Compares the secret with the stored hash verbatim
pub struct PlainVerifier;

impl CredentialVerifier for PlainVerifier {
    fn verify(&self, borrower: &Borrower, secret: &str) -> CredentialCheck {
        if borrower.credential_hash == secret {
            CredentialCheck::Match
        } else {
            CredentialCheck::Mismatch
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    reasons: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn report(&self, reason: &str) {
        self.reasons.lock().unwrap().push(reason.to_string());
    }
}

/// Holds the first `parties` commits at a barrier so that every racer has
/// loaded its state before any of them writes.
pub struct RacingUnitOfWork {
    inner: Arc<InMemoryStore>,
    barrier: Barrier,
    parties: usize,
    seen: AtomicUsize,
}

impl RacingUnitOfWork {
    pub fn new(inner: Arc<InMemoryStore>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            parties,
            seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl UnitOfWork for RacingUnitOfWork {
    async fn commit(&self, changes: ChangeSet) -> StoreResult<CommitReceipt> {
        if self.seen.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait().await;
        }
        self.inner.commit(changes).await
    }
}

/// Refuses every commit the way a backend that lost its disk would
pub struct FailingUnitOfWork;

#[async_trait]
impl UnitOfWork for FailingUnitOfWork {
    async fn commit(&self, _changes: ChangeSet) -> StoreResult<CommitReceipt> {
        Err(StoreError::Backend("disk full".to_string()))
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub stores: Stores,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub services: Services,
}

impl Harness {
    pub fn new(policy: CirculationPolicy) -> Self {
        Self::build(policy, Arc::new(PlainVerifier), |store| store.stores())
    }

    /// Harness whose commits are held until `parties` of them are in flight
    pub fn racing(policy: CirculationPolicy, parties: usize) -> Self {
        Self::build(policy, Arc::new(PlainVerifier), |store| {
            let mut stores = store.stores();
            stores.unit_of_work = Arc::new(RacingUnitOfWork::new(store.clone(), parties));
            stores
        })
    }

    /// Harness whose every commit fails; seeding still works since inserts
    /// bypass the unit of work
    pub fn failing(policy: CirculationPolicy) -> Self {
        Self::build(policy, Arc::new(PlainVerifier), |store| {
            let mut stores = store.stores();
            stores.unit_of_work = Arc::new(FailingUnitOfWork);
            stores
        })
    }

    pub fn with_verifier(policy: CirculationPolicy, credentials: Arc<dyn CredentialVerifier>) -> Self {
        Self::build(policy, credentials, |store| store.stores())
    }

    fn build(
        policy: CirculationPolicy,
        credentials: Arc<dyn CredentialVerifier>,
        stores: impl FnOnce(&Arc<InMemoryStore>) -> Stores,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let stores = stores(&store);
        let clock = Arc::new(FixedClock::new(day(0)));
        let notifier = Arc::new(RecordingNotifier::default());
        let services = Services::new(stores.clone(), credentials, notifier.clone(), clock.clone(), policy);

        Self {
            store,
            stores,
            clock,
            notifier,
            services,
        }
    }

    pub async fn borrower(&self, registration: &str, loan_limit: i32) -> Borrower {
        self.stores
            .borrowers
            .insert(NewBorrower {
                registration: registration.to_string(),
                name: format!("Borrower {}", registration),
                email: format!("{}@example.org", registration),
                credential_hash: SECRET.to_string(),
                loan_limit,
            })
            .await
            .unwrap()
    }

    pub async fn book(&self, catalog_code: &str, stock: i32) -> Book {
        self.stores
            .books
            .insert(NewBook {
                catalog_code: catalog_code.to_string(),
                title: format!("Title {}", catalog_code),
                author: "Author".to_string(),
                edition: None,
                publisher: "Publisher".to_string(),
                category: None,
                publication_year: None,
                stock,
            })
            .await
            .unwrap()
    }

    /// Lends a copy straight through the underlying store, so that no racing
    /// or failing unit of work gets in the way of setting up a scenario
    pub async fn loan(&self, borrower: &Borrower, book: &Book) -> Loan {
        let services = Services::new(
            self.store.stores(),
            Arc::new(PlainVerifier),
            Arc::new(RecordingNotifier::default()),
            self.clock.clone(),
            CirculationPolicy::default(),
        );
        services
            .loans
            .borrow(BorrowRequest {
                borrower: BorrowerKey::Id(borrower.id),
                book: BookKey::Id(book.id),
                secret: SECRET.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn reload_borrower(&self, id: i32) -> Borrower {
        self.stores.borrowers.find_by_id(id).await.unwrap().unwrap()
    }

    pub async fn reload_book(&self, id: i32) -> Book {
        self.stores.books.find_by_id(id).await.unwrap().unwrap()
    }
}
