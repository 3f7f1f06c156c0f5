//! Store-wide properties checked against the simulated executor
//!
//! Atomicity, update classification, id/name resolution and the not-found boundary
//! hold for every entity module, so each property is exercised through more than one.

#[path = "testutils/mod.rs"]
mod testutils;

use serde_json::json;
use std::collections::HashSet;
use tapledger::db::simulated::{SELECT_NOT_FOUND, SELECT_NO_OP};
use tapledger::queries::{CustomerUpdate, ProductUpdate};
use tapledger::{Batch, EntityKey, QueryError, Statement, TransactionExecutor};
use testutils::store_fixture::StoreFixture;

fn failing_at(k: usize, len: usize) -> Batch {
    (1..=len)
        .map(|position| {
            if position == k {
                Statement::select("SELECT id, name FROM categories WHERE id = ?", vec![100.into()])
            } else {
                Statement::insert(
                    "INSERT INTO categories (name) VALUES (?)",
                    vec![format!("category-{}", position).into()],
                )
            }
        })
        .collect()
}

#[tokio::test]
async fn test_failed_statement_discards_whole_batch() {
    let fixture = StoreFixture::new();
    let executor = fixture.store.executor();

    for len in 1..=4 {
        for k in 1..=len {
            let err = executor
                .execute_transactions(&failing_at(k, len))
                .await
                .unwrap_err();
            assert!(err.is_empty_result(), "batch {}/{}: {}", k, len, err);
            assert_eq!(fixture.executor.row_count(), 2, "batch {}/{}", k, len);
        }
    }
    assert_eq!(fixture.executor.executed_batches(), 0);
}

#[tokio::test]
async fn test_insert_failure_discards_earlier_writes() {
    let fixture = StoreFixture::new();
    let executor = fixture.store.executor();
    let batch = Batch::new()
        .with(Statement::delete(
            "DELETE FROM categories WHERE id = ?",
            vec![1.into()],
        ))
        .with(Statement::insert(
            "INSERT INTO categories (name) VALUES (?)",
            vec!["IPA".into()],
        ));

    fixture.executor.set_insert_fails(true);
    let err = executor.execute_transactions(&batch).await.unwrap_err();
    assert!(matches!(err, QueryError::GeneralServerError(_)));
    assert_eq!(fixture.executor.rows()[0]["name"], "product");
}

#[tokio::test]
async fn test_repeated_update_is_classified_as_no_op() {
    let fixture = StoreFixture::with_catalog();
    let products = fixture.store.products();
    let key = EntityKey::parse("Stout");
    let update = ProductUpdate {
        price: Some(5.5),
        ..Default::default()
    };

    let product = products.update_product(&key, &update).await.unwrap();
    assert_eq!(product.id, 2);

    // The store now reports the second identical write as matched but unchanged
    fixture.executor.set_selector(SELECT_NO_OP);
    let err = products.update_product(&key, &update).await.unwrap_err();
    assert!(err.is_item_already_exists());
    assert_eq!(err.status(), 403);
}

#[tokio::test]
async fn test_id_and_name_resolve_to_same_row() {
    let fixture = StoreFixture::with_catalog();
    let products = fixture.store.products();

    for (id, name) in [(1, "Pilsner"), (2, "Stout"), (3, "Cola")] {
        let by_id = products.get_product(&EntityKey::parse(&id.to_string())).await.unwrap();
        let by_name = products.get_product(&EntityKey::parse(name)).await.unwrap();
        assert_eq!(by_id, by_name, "product {}", name);
    }
}

#[tokio::test]
async fn test_update_by_id_and_by_name_agree() {
    let fixture = StoreFixture::with_rows(vec![
        json!({"id": 1, "name": "Anna", "email": null, "phone": null, "balance": 20.0}),
        json!({"id": 2, "name": "Ben", "email": null, "phone": null, "balance": 0.0}),
    ]);
    let customers = fixture.store.customers();
    let update = CustomerUpdate {
        phone: Some("555-0199".to_string()),
        ..Default::default()
    };

    let by_id = customers
        .update_customer(&EntityKey::ById(2), &update)
        .await
        .unwrap();
    let by_name = customers
        .update_customer(&EntityKey::parse("Ben"), &update)
        .await
        .unwrap();
    assert_eq!(by_id, by_name);
}

#[tokio::test]
async fn test_past_end_is_always_empty_result() {
    let fixture = StoreFixture::new();

    for id in [3, 4, 100, 1_000_000] {
        let key = EntityKey::ById(id);
        let err = fixture.store.categories().get_category(&key).await.unwrap_err();
        assert!(err.is_empty_result(), "category {}", id);
        let err = fixture.store.hot_keys().get_hot_key(&key).await.unwrap_err();
        assert!(err.is_empty_result(), "hot key {}", id);
        let err = fixture.store.sales().get_sale(id).await.unwrap_err();
        assert!(err.is_empty_result(), "sale {}", id);
    }
}

#[tokio::test]
async fn test_missing_name_is_empty_result() {
    let fixture = StoreFixture::new();
    fixture.executor.set_selector(SELECT_NOT_FOUND);

    let err = fixture
        .store
        .event_types()
        .update_event_type_name(&EntityKey::parse("Gala"), "Ball")
        .await
        .unwrap_err();
    assert!(err.is_empty_result());
    assert_eq!(err.status(), 204);
}

#[tokio::test]
async fn test_unknown_verb_is_general_server_error() {
    let err = Statement::parse("NON-EXISTENT FROM categories", vec![]).unwrap_err();
    assert!(matches!(err, QueryError::GeneralServerError(_)));
    assert_eq!(err.status(), 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_ids() {
    let fixture = StoreFixture::new();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = fixture.store.clone();
            tokio::spawn(async move {
                store
                    .categories()
                    .create_category(&format!("category-{}", i))
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let id = handle.await.expect("task panicked").expect("create failed");
        assert!(id >= 3);
        ids.insert(id);
    }
    assert_eq!(ids.len(), 16);
    assert_eq!(fixture.executor.row_count(), 18);
    assert_eq!(fixture.executor.executed_batches(), 16);
}
