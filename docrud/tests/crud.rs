use docrud::{
    backend::DynStoreBackend,
    bson::{Binary, spec::BinarySubtype},
    memory::InMemoryStore,
    prelude::*,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

async fn connect() -> DocumentStoreClient<InMemoryStore> {
    let backend = InMemoryStore::builder().build().await.unwrap();

    DocumentStoreClient::connect(backend, "shop", "products")
        .await
        .unwrap()
}

fn produce() -> Vec<Document> {
    vec![
        doc! { "name": "Clementine", "price": 1.05, "quantity": 12, "category": "Fruit", "color": "Orange" },
        doc! { "name": "Mandarine", "price": 1.25, "quantity": 5, "category": "Fruit", "color": "Orange" },
        doc! { "name": "sweet Potato", "price": 3.05, "quantity": 2, "category": "Vegetable" },
    ]
}

async fn seeded() -> DocumentStoreClient<InMemoryStore> {
    let client = connect().await;
    client.insert_many(produce()).await.unwrap();
    client
}

#[tokio::test]
async fn inserted_document_is_found_by_id() {
    let client = connect().await;

    let result = client
        .insert_one(doc! { "name": "Kiwi", "price": 0.5 })
        .await
        .unwrap();
    let id = result.inserted_id.unwrap();

    let found = client
        .find_one(doc! { "_id": id.clone() })
        .await
        .unwrap();

    assert_eq!(found, Some(doc! { "_id": id, "name": "Kiwi", "price": 0.5 }));
}

#[tokio::test]
async fn caller_supplied_id_is_kept() {
    let client = connect().await;

    let result = client
        .insert_one(doc! { "_id": "kiwi-1", "name": "Kiwi" })
        .await
        .unwrap();

    assert_eq!(result.inserted_id, Some(Bson::from("kiwi-1")));
    assert!(client.find_one(Filter::eq(ID_FIELD, "kiwi-1")).await.unwrap().is_some());
}

#[tokio::test]
async fn duplicate_single_insert_is_an_operation_error() {
    let client = connect().await;
    client.insert_one(doc! { "_id": 1 }).await.unwrap();

    assert!(matches!(
        client.insert_one(doc! { "_id": 1 }).await,
        Err(DocumentStoreError::Operation(_))
    ));
}

#[tokio::test]
async fn distinct_binary_ids_do_not_collide() {
    let client = connect().await;
    let key = |byte: u8| Binary { subtype: BinarySubtype::Uuid, bytes: vec![byte; 16] };

    client.insert_one(doc! { "_id": key(1), "key": key(1) }).await.unwrap();
    client.insert_one(doc! { "_id": key(2), "key": key(2) }).await.unwrap();

    assert!(client.find_many(doc! { "key": key(9) }, FindOptions::default()).await.unwrap().is_empty());

    let deleted = client.delete_one(doc! { "_id": key(2) }).await.unwrap();
    assert_eq!(deleted.deleted_count, Some(1));
    assert!(client.find_one(doc! { "_id": key(1) }).await.unwrap().is_some());
}

#[tokio::test]
async fn large_integer_ids_stay_distinct() {
    let client = connect().await;

    client.insert_one(doc! { "_id": 9_007_199_254_740_992_i64 }).await.unwrap();
    client.insert_one(doc! { "_id": 9_007_199_254_740_993_i64 }).await.unwrap();

    let found = client
        .find_many(doc! { "_id": 9_007_199_254_740_993_i64 }, FindOptions::default())
        .await
        .unwrap();
    assert_eq!(found, vec![doc! { "_id": 9_007_199_254_740_993_i64 }]);
}

#[tokio::test]
async fn insert_many_then_find_all() {
    let client = seeded().await;

    let all = client
        .find_many(doc! {}, FindOptions::default())
        .await
        .unwrap();

    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|document| matches!(document.id(), Some(Bson::ObjectId(_)))));
}

#[tokio::test]
async fn insert_many_reports_ids_by_position() {
    let client = connect().await;

    let result = client.insert_many(produce()).await.unwrap();

    assert_eq!(result.inserted_ids.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(result.inserted_id.is_none());
}

#[tokio::test]
async fn duplicate_id_in_batch_stops_the_insert() {
    let client = connect().await;

    let err = client
        .insert_many(vec![
            doc! { "_id": 1, "name": "Lime" },
            doc! { "_id": 2, "name": "Lemon" },
            doc! { "_id": 1, "name": "Lime again" },
            doc! { "_id": 3, "name": "Orange" },
        ])
        .await
        .unwrap_err();

    match err {
        DocumentStoreError::PartialInsert { inserted_ids, .. } => {
            assert_eq!(
                inserted_ids.into_iter().collect::<Vec<_>>(),
                vec![(0, Bson::Int32(1)), (1, Bson::Int32(2))],
            );
        }
        other => panic!("expected a partial insert, got {other}"),
    }

    assert_eq!(client.find_many(doc! {}, FindOptions::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let client = connect().await;

    assert!(matches!(
        client.insert_many(Vec::new()).await,
        Err(DocumentStoreError::InvalidDocument(_))
    ));
}

#[tokio::test]
async fn watermelon_price_and_quantity_update() {
    let client = connect().await;
    let id = client
        .insert_one(doc! { "name": "Watermelon", "price": 2.0, "quantity": 10 })
        .await
        .unwrap()
        .inserted_id
        .unwrap();

    let result = client
        .update_one(
            doc! { "name": "Watermelon" },
            doc! { "$set": { "price": 2.3, "quantity": 20 } },
        )
        .await
        .unwrap();

    assert_eq!(result.matched_count, Some(1));
    assert_eq!(result.modified_count, Some(1));

    let watermelon = client
        .find_one(doc! { "name": "Watermelon" })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        watermelon,
        doc! { "_id": id, "name": "Watermelon", "price": 2.3, "quantity": 20 },
    );
}

#[tokio::test]
async fn find_one_without_match_is_none() {
    let client = seeded().await;

    assert_eq!(client.find_one(doc! { "name": "Durian" }).await.unwrap(), None);
    assert_eq!(
        client
            .find_one_with(
                Filter::gt("price", 100),
                FindOptions::builder().sort("price", SortDirection::Asc).build(),
            )
            .await
            .unwrap(),
        None,
    );

    let empty = connect().await;
    assert_eq!(empty.find_one(doc! {}).await.unwrap(), None);
}

#[tokio::test]
async fn pull_with_query_condition_is_rejected() {
    let client = seeded().await;

    let err = client
        .update_one(
            doc! { "name": "Clementine" },
            doc! { "$pull": { "tags": { "$in": ["fruit"] } } },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidUpdate(_)));
}

#[tokio::test]
async fn cheap_products_under_two() {
    let client = seeded().await;

    let cheap = client
        .find_many(doc! { "price": { "$lt": 2.00 } }, FindOptions::default())
        .await
        .unwrap();

    let mut names = cheap
        .iter()
        .map(|document| document.get_str("name").unwrap())
        .collect::<Vec<_>>();
    names.sort();

    assert_eq!(names, vec!["Clementine", "Mandarine"]);
}

#[tokio::test]
async fn set_and_unset_are_reflected_exactly() {
    let client = seeded().await;

    client
        .update_one(
            doc! { "name": "Clementine" },
            Update::new().set("weight", 50).unset("color"),
        )
        .await
        .unwrap();

    let clementine = client
        .find_one_with(
            doc! { "name": "Clementine" },
            FindOptions::builder()
                .projection(Projection::exclude(["price"]).exclude_id())
                .build(),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        clementine,
        doc! { "name": "Clementine", "quantity": 12, "category": "Fruit", "weight": 50 },
    );
    assert!(!clementine.contains_key("color"));
}

#[tokio::test]
async fn update_without_match_changes_nothing() {
    let client = seeded().await;

    let result = client
        .update_many(doc! { "category": "Dairy" }, Update::new().set("price", 0))
        .await
        .unwrap();

    assert_eq!((result.matched_count, result.modified_count), (Some(0), Some(0)));
    assert!(result.upserted_id.is_none());
}

#[tokio::test]
async fn update_many_counts_only_changed_documents() {
    let client = seeded().await;

    let result = client
        .update_many(doc! {}, Update::new().set("color", "Orange"))
        .await
        .unwrap();

    assert_eq!((result.matched_count, result.modified_count), (Some(3), Some(1)));
}

#[tokio::test]
async fn unset_on_every_document() {
    let client = seeded().await;

    client
        .update_many(doc! {}, doc! { "$unset": { "color": "" } })
        .await
        .unwrap();

    let colored = client
        .find_many(Filter::exists("color"), FindOptions::default())
        .await
        .unwrap();
    assert!(colored.is_empty());
}

#[tokio::test]
async fn push_then_pull_restores_the_array() {
    let client = seeded().await;
    client
        .update_many(doc! {}, Update::new().set("tags", Bson::Array(vec![])))
        .await
        .unwrap();

    let before = client.find_one(doc! { "name": "Mandarine" }).await.unwrap();

    client
        .update_one(doc! { "name": "Mandarine" }, Update::new().push("tags", "citric"))
        .await
        .unwrap();
    let pushed = client.find_one(doc! { "name": "Mandarine" }).await.unwrap().unwrap();
    assert_eq!(pushed.get_array("tags").unwrap(), &vec![Bson::from("citric")]);

    client
        .update_one(doc! { "name": "Mandarine" }, Update::new().pull("tags", "citric"))
        .await
        .unwrap();
    let pulled = client.find_one(doc! { "name": "Mandarine" }).await.unwrap();

    assert_eq!(pulled, before);
}

#[tokio::test]
async fn pull_removes_every_equal_element() {
    let client = connect().await;
    client
        .insert_one(doc! { "_id": 1, "tags": ["fruit", "citric", "fruit", "winter"] })
        .await
        .unwrap();

    client
        .update_one(doc! { "_id": 1 }, doc! { "$pull": { "tags": "fruit" } })
        .await
        .unwrap();

    assert_eq!(
        client.find_one(doc! { "_id": 1 }).await.unwrap(),
        Some(doc! { "_id": 1, "tags": ["citric", "winter"] }),
    );
}

#[tokio::test]
async fn pop_removes_last_or_first() {
    let client = connect().await;
    client
        .insert_one(doc! { "_id": 1, "tags": ["fruit", "breakfast", "citric"] })
        .await
        .unwrap();

    client
        .update_one(doc! { "_id": 1 }, doc! { "$pop": { "tags": 1 } })
        .await
        .unwrap();
    assert_eq!(
        client.find_one(doc! { "_id": 1 }).await.unwrap(),
        Some(doc! { "_id": 1, "tags": ["fruit", "breakfast"] }),
    );

    client
        .update_one(doc! { "_id": 1 }, doc! { "$pop": { "tags": -1 } })
        .await
        .unwrap();
    assert_eq!(
        client.find_one(doc! { "_id": 1 }).await.unwrap(),
        Some(doc! { "_id": 1, "tags": ["breakfast"] }),
    );
}

#[tokio::test]
async fn push_on_non_array_is_an_operation_error() {
    let client = seeded().await;

    let err = client
        .update_one(doc! { "name": "Clementine" }, Update::new().push("name", "x"))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::Operation(_)));
}

#[tokio::test]
async fn updating_the_id_is_rejected() {
    let client = seeded().await;

    assert!(matches!(
        client
            .update_one(doc! { "name": "Clementine" }, doc! { "$set": { "_id": 5 } })
            .await,
        Err(DocumentStoreError::InvalidUpdate(_))
    ));
}

#[tokio::test]
async fn upsert_creates_from_filter() {
    let client = seeded().await;

    let result = client
        .update_one_with(
            doc! { "name": "Kiwi", "category": "Fruit" },
            Update::new().set("price", 0.5),
            UpdateOptions::upsert(),
        )
        .await
        .unwrap();

    let id = result.upserted_id.unwrap();
    assert_eq!((result.matched_count, result.modified_count), (Some(0), Some(0)));

    assert_eq!(
        client.find_one(doc! { "_id": id.clone() }).await.unwrap(),
        Some(doc! { "_id": id, "name": "Kiwi", "category": "Fruit", "price": 0.5 }),
    );

    let again = client
        .update_many_with(
            doc! { "name": "Kiwi" },
            Update::new().set("price", 0.5),
            UpdateOptions::upsert(),
        )
        .await
        .unwrap();
    assert_eq!((again.matched_count, again.modified_count, again.upserted_id), (Some(1), Some(0), None));
}

#[tokio::test]
async fn delete_one_without_match_is_not_an_error() {
    let client = seeded().await;

    let result = client
        .delete_one(doc! { "name": "Durian" })
        .await
        .unwrap();

    assert_eq!(result.deleted_count, Some(0));
}

#[tokio::test]
async fn delete_by_id_and_by_attribute() {
    let client = seeded().await;
    client
        .insert_one(doc! { "name": "Broccoli", "color": "Green", "category": "Vegetable" })
        .await
        .unwrap();

    let clementine = client
        .find_one(doc! { "name": "Clementine" })
        .await
        .unwrap()
        .unwrap();
    let by_id = client
        .delete_one(doc! { "_id": clementine.id().unwrap().clone() })
        .await
        .unwrap();
    let green = client
        .delete_many(doc! { "color": "Green" })
        .await
        .unwrap();

    assert_eq!((by_id.deleted_count, green.deleted_count), (Some(1), Some(1)));
    assert_eq!(client.find_many(doc! {}, FindOptions::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn largest_quantity_via_sort_and_limit() {
    let client = seeded().await;

    let largest = client
        .find_many(
            doc! {},
            FindOptions::builder()
                .sort("quantity", SortDirection::Desc)
                .limit(1)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(largest.len(), 1);
    assert_eq!(largest[0].get_str("name").unwrap(), "Clementine");
}

#[tokio::test]
async fn projection_with_in_filter() {
    let client = seeded().await;

    let projected = client
        .find_many(
            doc! { "name": { "$in": ["Clementine", "Mandarine"] } },
            FindOptions::builder()
                .sort("price", SortDirection::Asc)
                .projection(Projection::include(["name", "category"]).exclude_id())
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(
        projected,
        vec![
            doc! { "name": "Clementine", "category": "Fruit" },
            doc! { "name": "Mandarine", "category": "Fruit" },
        ],
    );
}

#[tokio::test]
async fn malformed_filters_are_rejected() {
    let client = seeded().await;

    assert!(matches!(
        client.find_many(doc! { "price": { "$near": 1 } }, FindOptions::default()).await,
        Err(DocumentStoreError::InvalidFilter(_))
    ));
}

#[tokio::test]
async fn operations_after_close_fail() {
    let client = seeded().await;

    client.close().await.unwrap();
    client.close().await.unwrap();

    assert!(!client.is_connected().await);
    assert!(matches!(
        client.insert_one(doc! { "name": "Kiwi" }).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(
        client.update_many(doc! {}, Update::new().set("a", 1)).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(
        client.delete_many(doc! {}).await,
        Err(DocumentStoreError::NotConnected)
    ));

    // Closed wins over malformed input.
    assert!(matches!(
        client.insert_many(vec![]).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(
        client.update_one(doc! {}, Update::new()).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(
        client.find_one(doc! { "price": { "$bogus": 1 } }).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(
        client.delete_one(doc! { "$or": [] }).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(
        client.find_many(doc! {}, FindOptions::default()).await,
        Err(DocumentStoreError::NotConnected)
    ));
}

#[tokio::test]
async fn unreachable_store_fails_to_connect() {
    let backend = InMemoryStore::builder().unreachable().build().await.unwrap();

    let err = DocumentStoreClient::connect(backend, "shop", "products")
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::Connection(_)));
}

#[tokio::test]
async fn concurrent_inserts_all_land() {
    let client = connect().await;

    let results = try_join_all(
        (0..20).map(|n| client.insert_one(doc! { "name": format!("crate-{n}"), "n": n })),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 20);
    assert_eq!(
        client
            .find_many(doc! { "n": { "$gte": 0 } }, FindOptions::default())
            .await
            .unwrap()
            .len(),
        20,
    );
}

#[tokio::test]
async fn namespaces_are_isolated_and_listed() {
    let mut client = seeded().await;

    client.set_collection("orders");
    assert!(client.find_many(doc! {}, FindOptions::default()).await.unwrap().is_empty());
    client.insert_one(doc! { "item": "Clementine" }).await.unwrap();

    client.set_database("archive");
    client.insert_one(doc! { "item": "Mandarine" }).await.unwrap();

    assert_eq!(client.database_name(), "archive");
    assert_eq!(client.collection_name(), "orders");
    assert_eq!(client.list_databases().await.unwrap(), vec!["archive", "shop"]);
    assert_eq!(client.list_collections().await.unwrap(), vec!["orders"]);

    client.set_database("shop");
    assert_eq!(client.list_collections().await.unwrap(), vec!["orders", "products"]);
}

#[tokio::test]
async fn boxed_backend_works_through_the_client() {
    let backend: Box<dyn DynStoreBackend> = Box::new(InMemoryStore::builder().build().await.unwrap());
    let client = DocumentStoreClient::connect(backend, "shop", "products")
        .await
        .unwrap();

    client.insert_many(produce()).await.unwrap();

    assert_eq!(
        client
            .find_many(Filter::eq("category", "Fruit"), FindOptions::default())
            .await
            .unwrap()
            .len(),
        2,
    );
    client.close().await.unwrap();
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Product {
    name: String,
    price: f64,
    quantity: i32,
}

#[tokio::test]
async fn typed_documents_round_trip() {
    let client = connect().await;
    let watermelon = Product {
        name: "Watermelon".to_string(),
        price: 2.0,
        quantity: 10,
    };

    client
        .insert_one(to_document(&watermelon).unwrap())
        .await
        .unwrap();

    let stored = client
        .find_one_with(
            doc! { "name": "Watermelon" },
            FindOptions::builder()
                .projection(Projection::exclude(Vec::<String>::new()).exclude_id())
                .build(),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(from_document::<Product>(stored).unwrap(), watermelon);
}
