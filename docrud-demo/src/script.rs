//! The scripted walk through every client operation.

use anyhow::{Context, Result};
use docrud::prelude::*;

fn print_documents(title: &str, documents: &[Document]) -> Result<()> {
    println!("{title}:");

    for document in documents {
        println!("  {}", serde_json::to_string(document)?);
    }

    Ok(())
}

fn print_result(title: &str, result: &OperationResult) -> Result<()> {
    println!("{title}: {}", serde_json::to_string(result)?);
    Ok(())
}

fn produce() -> Vec<Document> {
    vec![
        doc! { "name": "Clementine", "price": 1.05, "quantity": 12, "category": "Fruit", "color": "Orange" },
        doc! { "name": "Mandarine", "price": 1.25, "quantity": 5, "category": "Fruit", "color": "Orange" },
        doc! { "name": "sweet Potato", "price": 3.05, "quantity": 2, "category": "Vegetable" },
        doc! { "name": "Watermelon", "price": 2.0, "quantity": 10, "category": "Fruit", "color": "Red" },
    ]
}

pub async fn run<B: StoreBackend>(client: &DocumentStoreClient<B>) -> Result<()> {
    let cleared = client.delete_many(doc! {}).await?;
    print_result("Cleared previous run", &cleared)?;

    let seeded = client.insert_many(produce()).await?;
    print_result("Seeded products", &seeded)?;

    let citrus = client
        .find_many(
            doc! { "name": { "$in": ["Clementine", "Mandarine"] } },
            FindOptions::builder()
                .sort("name", SortDirection::Asc)
                .projection(Projection::include(["name", "category"]).exclude_id())
                .build(),
        )
        .await?;
    print_documents("Citrus, name and category only", &citrus)?;

    let repriced = client
        .update_one(
            doc! { "name": "Watermelon" },
            Update::new().set("price", 2.3).set("quantity", 20),
        )
        .await?;
    print_result("Watermelon repriced", &repriced)?;

    client
        .update_one(doc! { "name": "Clementine" }, Update::new().set("weight", 0.2))
        .await?;
    client
        .update_one(doc! { "name": "Clementine" }, Update::new().unset("color"))
        .await?;
    let clementine = client.find_one(doc! { "name": "Clementine" }).await?;
    print_documents("Clementine weighed, color removed", clementine.as_slice())?;

    client
        .update_many(doc! {}, Update::new().set("tags", Bson::Array(Vec::new())))
        .await?;
    client
        .update_one(doc! { "name": "Clementine" }, Update::new().push("tags", "citric"))
        .await?;
    print_documents(
        "Clementine tagged",
        client.find_one(doc! { "name": "Clementine" }).await?.as_slice(),
    )?;

    client
        .update_one(doc! { "name": "Clementine" }, Update::new().pull("tags", "citric"))
        .await?;
    client
        .update_one(
            doc! { "name": "Clementine" },
            Update::new().set("tags", vec!["fruit", "breakfast"]),
        )
        .await?;
    client
        .update_one(doc! { "name": "Clementine" }, Update::new().pop_last("tags"))
        .await?;
    print_documents(
        "Clementine after popping its last tag",
        client.find_one(doc! { "name": "Clementine" }).await?.as_slice(),
    )?;

    let untagged = client
        .update_many(doc! {}, Update::new().unset("tags"))
        .await?;
    print_result("Tags removed everywhere", &untagged)?;

    let clementine_id = client
        .find_one(doc! { "name": "Clementine" })
        .await?
        .and_then(|document| document.id().cloned())
        .context("Clementine disappeared")?;
    let deleted = client
        .delete_one(doc! { "_id": clementine_id })
        .await?;
    print_result("Clementine deleted by id", &deleted)?;

    client
        .insert_one(doc! { "name": "Broccoli", "price": 2.10, "quantity": 3, "category": "Vegetable", "color": "Green" })
        .await?;
    let green = client
        .delete_many(doc! { "color": "Green" })
        .await?;
    print_result("Green products deleted", &green)?;

    let red = client
        .find_many(doc! { "color": "Red" }, FindOptions::default())
        .await?;
    print_documents("Red products", &red)?;

    let cheap = client
        .find_many(doc! { "price": { "$lt": 2.00 } }, FindOptions::default())
        .await?;
    print_documents("Products under 2.00", &cheap)?;

    let largest = client
        .find_many(
            doc! {},
            FindOptions::builder()
                .sort("quantity", SortDirection::Desc)
                .limit(1)
                .build(),
        )
        .await?;
    print_documents("Largest stock", &largest)?;

    println!("Collections in {}: {:?}", client.database_name(), client.list_collections().await?);

    Ok(())
}
