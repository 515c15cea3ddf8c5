//! Borrower accounts and catalog upkeep against the in-memory store

use library_circulation::{
    circulation::{BookKey, BorrowRequest, BorrowerKey, CirculationError, CirculationPolicy, Denial, Missing},
    models::{
        book::UpdateBook, borrower::UpdateBorrower, Book, BookQuery, Borrower, BorrowerQuery,
    },
    AppError,
};

use crate::common::{Harness, SECRET};

fn request(borrower: &Borrower, book: &Book) -> BorrowRequest {
    BorrowRequest {
        borrower: BorrowerKey::Id(borrower.id),
        book: BookKey::Id(book.id),
        secret: SECRET.to_string(),
    }
}

#[tokio::test]
async fn test_reactivated_borrower_can_borrow_again() {
    let h = Harness::new(CirculationPolicy::default());
    let borrower = h.borrower("100001", 3).await;
    let book = h.book("LIT-001", 1).await;

    let deactivated = h.services.borrowers.deactivate_borrower(borrower.id).await.unwrap();
    assert!(!deactivated.active);
    let refused = h.services.loans.borrow(request(&borrower, &book)).await;
    assert!(matches!(
        refused,
        Err(AppError::Circulation(CirculationError::Denied(Denial::BorrowerInactive)))
    ));

    let reactivated = h.services.borrowers.reactivate_borrower(borrower.id).await.unwrap();
    assert!(reactivated.active);
    assert_eq!(h.reload_borrower(borrower.id).await, reactivated);

    // already active: nothing to write
    let again = h.services.borrowers.reactivate_borrower(borrower.id).await.unwrap();
    assert_eq!(again.version, reactivated.version);

    h.services.loans.borrow(request(&borrower, &book)).await.unwrap();
}

#[tokio::test]
async fn test_update_borrower_fields_and_rules() {
    let h = Harness::new(CirculationPolicy::default());
    let borrower = h.borrower("100001", 3).await;
    h.borrower("100002", 3).await;
    let first = h.book("LIT-001", 1).await;
    let second = h.book("LIT-002", 1).await;
    h.services.loans.borrow(request(&borrower, &first)).await.unwrap();
    h.services.loans.borrow(request(&borrower, &second)).await.unwrap();

    let updated = h
        .services
        .borrowers
        .update_borrower(
            borrower.id,
            UpdateBorrower {
                name: Some("Ana Lima".to_string()),
                email: Some("ana.lima@example.org".to_string()),
                loan_limit: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Ana Lima");
    assert_eq!(updated.loan_limit, 2);
    assert_eq!(updated.registration, "100001");
    assert_eq!(h.reload_borrower(borrower.id).await, updated);

    let taken = h
        .services
        .borrowers
        .update_borrower(
            borrower.id,
            UpdateBorrower {
                email: Some("100002@example.org".to_string()),
                ..UpdateBorrower::default()
            },
        )
        .await;
    assert!(matches!(taken, Err(AppError::Conflict(_))));

    let below_held = h
        .services
        .borrowers
        .update_borrower(
            borrower.id,
            UpdateBorrower {
                loan_limit: Some(1),
                ..UpdateBorrower::default()
            },
        )
        .await;
    assert!(matches!(below_held, Err(AppError::BusinessRule(_))));
    assert_eq!(h.reload_borrower(borrower.id).await, updated);

    let missing = h.services.borrowers.update_borrower(999, UpdateBorrower::default()).await;
    assert!(matches!(
        missing,
        Err(AppError::Circulation(CirculationError::NotFound(Missing::Borrower(id)))) if id == "999"
    ));
}

#[tokio::test]
async fn test_search_borrowers() {
    let h = Harness::new(CirculationPolicy::default());
    let a = h.borrower("100001", 3).await;
    let b = h.borrower("100002", 3).await;
    let c = h.borrower("200003", 3).await;
    h.services.borrowers.deactivate_borrower(b.id).await.unwrap();

    let by_registration = h
        .services
        .borrowers
        .search_borrowers(&BorrowerQuery {
            registration: Some("200003".to_string()),
            ..BorrowerQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_registration.total, 1);
    assert_eq!(by_registration.items[0].id, c.id);

    let active = h
        .services
        .borrowers
        .search_borrowers(&BorrowerQuery {
            name: Some("borrower 1".to_string()),
            active: Some(true),
            ..BorrowerQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(active.items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![a.id]);

    let second_page = h
        .services
        .borrowers
        .search_borrowers(&BorrowerQuery {
            page: Some(2),
            per_page: Some(2),
            ..BorrowerQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(second_page.total, 3);
    assert_eq!(second_page.items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![c.id]);
}

#[tokio::test]
async fn test_update_book_while_copies_are_out() {
    let h = Harness::new(CirculationPolicy::default());
    let borrower = h.borrower("100001", 3).await;
    let book = h.book("LIT-001", 2).await;
    let loan = h.services.loans.borrow(request(&borrower, &book)).await.unwrap();

    let updated = h
        .services
        .catalog
        .update_book(
            book.id,
            UpdateBook {
                title: Some("Quincas Borba".to_string()),
                publication_year: Some(1891),
                ..UpdateBook::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.book.title, "Quincas Borba");
    assert_eq!(updated.book.publication_year, Some(1891));
    assert_eq!((updated.book.stock, updated.book.available, updated.on_loan), (2, 1, 1));

    // the return loads the book afresh, so the edit does not make it stale
    h.services.loans.return_loan(loan.id, SECRET).await.unwrap();
    let stored = h.reload_book(book.id).await;
    assert_eq!(stored.title, "Quincas Borba");
    assert_eq!(stored.available, 2);

    let invalid = h
        .services
        .catalog
        .update_book(
            book.id,
            UpdateBook {
                title: Some(String::new()),
                ..UpdateBook::default()
            },
        )
        .await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_delete_book_only_without_loans() {
    let h = Harness::new(CirculationPolicy::default());
    let borrower = h.borrower("100001", 3).await;
    let lent = h.book("LIT-001", 1).await;
    let unused = h.book("LIT-002", 1).await;

    let loan = h.services.loans.borrow(request(&borrower, &lent)).await.unwrap();
    let out = h.services.catalog.delete_book(lent.id).await;
    assert!(matches!(out, Err(AppError::BusinessRule(_))));

    h.services.loans.return_loan(loan.id, SECRET).await.unwrap();
    let with_history = h.services.catalog.delete_book(lent.id).await;
    assert!(matches!(with_history, Err(AppError::BusinessRule(_))));
    assert_eq!(h.services.loans.get_book_loans(lent.id).await.unwrap().len(), 1);

    h.services.catalog.delete_book(unused.id).await.unwrap();
    let gone = h.services.catalog.get_book(unused.id).await;
    assert!(matches!(
        gone,
        Err(AppError::Circulation(CirculationError::NotFound(Missing::Book(id)))) if id == unused.id.to_string()
    ));
}

#[tokio::test]
async fn test_search_books_by_title_and_page() {
    let h = Harness::new(CirculationPolicy::default());
    for code in ["LIT-003", "LIT-001", "POE-001", "LIT-002"] {
        h.book(code, 1).await;
    }

    let literature = h
        .services
        .catalog
        .search_books(&BookQuery {
            title: Some("title lit".to_string()),
            per_page: Some(2),
            ..BookQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(literature.total, 3);
    assert_eq!(
        literature.items.iter().map(|b| b.book.catalog_code.as_str()).collect::<Vec<_>>(),
        vec!["LIT-001", "LIT-002"]
    );

    let by_code = h
        .services
        .catalog
        .search_books(&BookQuery {
            catalog_code: Some("POE-001".to_string()),
            ..BookQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_code.total, 1);
    assert_eq!(by_code.items[0].book.title, "Title POE-001");
}
