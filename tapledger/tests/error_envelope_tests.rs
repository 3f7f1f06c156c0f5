//! Error classification as seen by the HTTP boundary

#[path = "testutils/mod.rs"]
mod testutils;

use tapledger::QueryError;
use testutils::store_fixture::StoreFixture;

#[test]
fn test_envelope_shape() {
    let err = QueryError::EmptySqlResult("category '7' not found".to_string());
    let envelope = serde_json::to_value(&err).unwrap();
    assert_eq!(envelope["error"], "EmptySQLResult");
    assert_eq!(envelope["status"], 204);
    assert_eq!(envelope["message"], "category '7' not found");
}

#[test]
fn test_duplicate_entry_message() {
    let err = QueryError::from_statement_failure("Duplicate entry 'IPA' for key 'categories.name'");
    assert!(err.is_item_already_exists());
    assert!(err.message().contains("IPA"));

    let err = QueryError::from_statement_failure("Unknown column 'nme' in 'field list'");
    assert_eq!(err.kind(), "UnexpectedSQLResult");
}

#[tokio::test]
async fn test_every_kind_reaches_the_caller_unchanged() {
    let fixture = StoreFixture::new();
    let categories = fixture.store.categories();

    fixture.executor.set_insert_duplicate(true);
    let err = categories.create_category("product").await.unwrap_err();
    assert_eq!((err.kind(), err.status()), ("ItemAlreadyExists", 403));

    fixture.executor.set_insert_duplicate(false);
    fixture.executor.set_reachable(false);
    let err = categories.get_categories().await.unwrap_err();
    assert_eq!((err.kind(), err.status()), ("GeneralServerError", 500));
}
