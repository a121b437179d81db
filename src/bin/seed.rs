// bin/seed.rs — create the initial admin account and the unique indexes.
use anyhow::Context;
use bcrypt::{hash, DEFAULT_COST};
use mongodb::bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, IndexModel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let database_name =
        std::env::var("DATABASE_NAME").unwrap_or_else(|_| "storefront_auth".to_string());

    let client = Client::with_uri_str(&database_url)
        .await
        .context("Failed to connect to MongoDB")?;
    let db = client.database(&database_name);
    let users = db.collection::<Document>("users");

    println!("Seeding database '{}'...", database_name);

    for field in ["email", "phone"] {
        let index = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users.create_index(index).await?;
        println!("Ensured unique index on users.{}", field);
    }

    let admin_email =
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@storefront.test".to_string());
    let admin_phone =
        std::env::var("ADMIN_PHONE").unwrap_or_else(|_| "01700000000".to_string());
    let admin_password =
        std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "12345678".to_string());

    if users.find_one(doc! { "email": &admin_email }).await?.is_some() {
        println!("Admin account '{}' already present, nothing to do", admin_email);
        return Ok(());
    }

    let now = DateTime::now();
    users
        .insert_one(doc! {
            "name": "Admin",
            "email": &admin_email,
            "password_hash": hash(&admin_password, DEFAULT_COST)?,
            "phone": &admin_phone,
            "role": "admin",
            "otp": "0",
            "created_at": now,
            "updated_at": now,
        })
        .await?;

    println!("Created admin account '{}'", admin_email);
    Ok(())
}
