//! Loan lifecycle engine: eligibility, transitions and borrower blocking

pub mod blocking;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod policy;
pub mod ports;
pub mod transitions;

pub use engine::{BookKey, BorrowRequest, BorrowerKey, LoanEngine};
pub use error::{CirculationError, CirculationResult, Denial, Missing};
pub use policy::{CirculationPolicy, LateReturnPolicy, RenewalPolicy};
pub use ports::{
    BookRepository, BorrowerRepository, ChangeSet, Clock, CommitReceipt, CredentialCheck, CredentialVerifier,
    FixedClock, LoanRepository, Notifier, StoreError, StoreResult, Stores, SystemClock, UnitOfWork,
};
