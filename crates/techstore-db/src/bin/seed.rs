//! # Seed Data Generator
//!
//! Populates an empty database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./techstore.db
//! cargo run -p techstore-db --bin seed
//!
//! # Specify database path and admin password
//! cargo run -p techstore-db --bin seed -- --db ./data/techstore.db --admin-password s3cret-pass
//! ```
//!
//! ## Generated Data
//! - Users: `admin` (Level 1), `operator` (Level 2), `viewer` (Level 3)
//! - Categories and suppliers for a small electronics shop
//! - Products with stock
//! - Clients
//! - A few cash sales and credit sales, one credit partly paid
//!
//! Demo users share the admin password unless `--user-password` is given.

use chrono::{Duration, Utc};
use std::env;
use techstore_core::{
    NewCategory, NewClient, NewCredit, NewProduct, NewSale, NewSaleLine, NewSupplier, NewUser,
    Product, ROLE_ADMIN_ID, ROLE_OCCASIONAL_ID, ROLE_OPERATOR_ID,
};
use techstore_db::password::hash_password;
use techstore_db::{CreditRepository, Database, DbConfig, DbError, ProductRepository, SaleRepository};

/// (category, description, products as (name, purchase cents, sale cents, stock))
const CATALOG: &[(&str, &str, &[(&str, i64, i64, i64)])] = &[
    (
        "Laptops",
        "Portable computers",
        &[
            ("Lenovo IdeaPad 3 15\"", 42_000, 58_999, 8),
            ("HP Pavilion 14", 51_000, 69_900, 5),
            ("Dell Inspiron 15 3000", 39_500, 54_500, 6),
            ("ASUS VivoBook 16", 47_800, 64_999, 4),
        ],
    ),
    (
        "Phones",
        "Smartphones and feature phones",
        &[
            ("Samsung Galaxy A15", 13_900, 19_999, 15),
            ("Xiaomi Redmi Note 13", 16_500, 23_900, 12),
            ("Motorola Moto G54", 14_200, 20_500, 10),
        ],
    ),
    (
        "Monitors",
        "Desktop displays",
        &[
            ("LG 24\" IPS FHD", 9_800, 14_500, 9),
            ("Samsung 27\" Curved", 15_600, 22_900, 3),
        ],
    ),
    (
        "Accessories",
        "Peripherals and cables",
        &[
            ("Logitech M170 Mouse", 650, 1_299, 40),
            ("Redragon K552 Keyboard", 2_900, 4_999, 18),
            ("USB-C Cable 1m", 180, 499, 60),
            ("Kingston 64GB USB Drive", 520, 999, 35),
        ],
    ),
];

const SUPPLIERS: &[(&str, &str, &str)] = &[
    ("Intcomex", "022 345 678", "ventas@intcomex.example"),
    ("Tecnomega", "042 556 901", "pedidos@tecnomega.example"),
];

const CLIENTS: &[(&str, &str, &str, &str)] = &[
    ("Ana", "Perez", "1712345678", "ana.perez@example.com"),
    ("Carlos", "Mendoza", "0923456781", "cmendoza@example.com"),
    ("Lucia", "Andrade", "1109876543", "lucia.a@example.com"),
    ("Jorge", "Villacis", "1803344556", "jvillacis@example.com"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./techstore.db");
    let mut admin_password = String::from("admin12345");
    let mut user_password: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-password" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--user-password" => {
                if i + 1 < args.len() {
                    user_password = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("TechStore Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>             Database file path (default: ./techstore.db)");
                println!("      --admin-password <PW>   Password for 'admin' (default: admin12345)");
                println!("      --user-password <PW>    Password for the other demo users");
                println!("  -h, --help                  Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }
    let user_password = user_password.unwrap_or_else(|| admin_password.clone());

    println!("🌱 TechStore Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} users", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Users
    let admin = db
        .users()
        .insert(
            &new_user("Admin", "TechStore", "admin", ROLE_ADMIN_ID),
            &hash_password(&admin_password)?,
        )
        .await?;
    let operator = db
        .users()
        .insert(
            &new_user("Olga", "Ortiz", "operator", ROLE_OPERATOR_ID),
            &hash_password(&user_password)?,
        )
        .await?;
    db.users()
        .insert(
            &new_user("Victor", "Vera", "viewer", ROLE_OCCASIONAL_ID),
            &hash_password(&user_password)?,
        )
        .await?;
    println!("✓ Created 3 users (admin, operator, viewer)");

    // Suppliers
    let mut supplier_ids = Vec::new();
    for (name, phone, email) in SUPPLIERS {
        let supplier = db
            .suppliers()
            .insert(&NewSupplier {
                name: name.to_string(),
                phone: Some(phone.to_string()),
                email: Some(email.to_string()),
                address: None,
            })
            .await?;
        supplier_ids.push(supplier.id);
    }

    // Categories and products
    let mut products: Vec<Product> = Vec::new();
    for (idx, (category_name, description, items)) in CATALOG.iter().enumerate() {
        let category = db
            .categories()
            .insert(&NewCategory {
                name: category_name.to_string(),
                description: Some(description.to_string()),
            })
            .await?;

        for (name, purchase, sale, stock) in items.iter() {
            let product = db
                .products()
                .insert(&NewProduct {
                    name: name.to_string(),
                    description: None,
                    purchase_price_cents: *purchase,
                    sale_price_cents: *sale,
                    stock: *stock,
                    category_id: category.id,
                    supplier_id: supplier_ids.get(idx % supplier_ids.len()).copied(),
                })
                .await?;
            products.push(product);
        }
    }
    println!(
        "✓ Created {} categories, {} suppliers, {} products",
        CATALOG.len(),
        supplier_ids.len(),
        products.len()
    );

    // Clients
    let mut client_ids = Vec::new();
    for (first, last, document, email) in CLIENTS {
        let client = db
            .clients()
            .insert(&NewClient {
                first_name: first.to_string(),
                last_name: last.to_string(),
                document: Some(document.to_string()),
                phone: None,
                address: None,
                email: Some(email.to_string()),
            })
            .await?;
        client_ids.push(client.id);
    }
    println!("✓ Created {} clients", client_ids.len());

    // Sales: (client index, [(product index, qty)], credit due in days)
    let sales: &[(usize, &[(usize, i64)], Option<i64>)] = &[
        (0, &[(9, 2), (11, 3)], None),
        (1, &[(4, 1)], None),
        (2, &[(0, 1), (9, 1)], Some(30)),
        (3, &[(7, 1), (10, 1)], Some(15)),
        (0, &[(12, 2)], None),
    ];

    let mut credit_ids = Vec::new();
    for (client_idx, lines, due_in_days) in sales {
        let (_, credit_id) = register_sale(
            &db,
            operator.id,
            client_ids[*client_idx],
            &products,
            lines,
            *due_in_days,
        )
        .await?;
        credit_ids.extend(credit_id);
    }
    println!(
        "✓ Registered {} sales ({} on credit)",
        sales.len(),
        credit_ids.len()
    );

    // Partial payment on the first credit
    if let Some(credit_id) = credit_ids.first().copied() {
        let mut tx = db.begin().await?;
        let credit = CreditRepository::get_by_id_in(&mut tx, credit_id)
            .await?
            .ok_or_else(|| DbError::not_found("Credit", credit_id))?;
        let amount = credit.remaining_balance_cents / 4;
        let remaining = credit.remaining_balance_cents - amount;
        CreditRepository::insert_payment_in(&mut tx, credit_id, amount, remaining).await?;
        CreditRepository::update_balance_in(&mut tx, credit_id, remaining, credit.status).await?;
        tx.commit().await.map_err(DbError::transaction)?;
        println!("✓ Recorded a partial payment on credit #{}", credit_id);
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Seed complete in {:?}!", elapsed);
    println!("  Log in as '{}' (user #{})", admin.username, admin.id);

    Ok(())
}

fn new_user(first: &str, last: &str, username: &str, role_id: i64) -> NewUser {
    NewUser {
        first_name: first.to_string(),
        last_name: last.to_string(),
        username: username.to_string(),
        role_id,
    }
}

/// Registers one sale the same way the server does: header, lines and
/// stock decrements in one transaction. Returns `(sale_id, credit_id)`.
async fn register_sale(
    db: &Database,
    user_id: i64,
    client_id: i64,
    products: &[Product],
    lines: &[(usize, i64)],
    due_in_days: Option<i64>,
) -> Result<(i64, Option<i64>), DbError> {
    let total: i64 = lines
        .iter()
        .map(|(idx, qty)| products[*idx].sale_price_cents * qty)
        .sum();

    let mut tx = db.begin().await?;
    let sale_id = SaleRepository::insert_sale_in(
        &mut tx,
        &NewSale {
            user_id,
            client_id,
            total_cents: total,
            is_credit: due_in_days.is_some(),
        },
    )
    .await?;

    for (idx, qty) in lines {
        let product = &products[*idx];
        SaleRepository::insert_line_in(
            &mut tx,
            sale_id,
            &NewSaleLine {
                product_id: product.id,
                quantity: *qty,
                unit_price_cents: product.sale_price_cents,
                subtotal_cents: product.sale_price_cents * qty,
            },
        )
        .await?;
        if !ProductRepository::decrement_stock_if_available(&mut tx, product.id, *qty).await? {
            return Err(DbError::CheckViolation(format!(
                "not enough stock of {} for demo sale",
                product.name
            )));
        }
    }

    let credit_id = match due_in_days {
        Some(days) => Some(
            CreditRepository::insert_in(
                &mut tx,
                &NewCredit {
                    sale_id,
                    total_balance_cents: total,
                    due_date: (Utc::now() + Duration::days(days)).date_naive(),
                },
            )
            .await?,
        ),
        None => None,
    };

    tx.commit().await.map_err(DbError::transaction)?;
    Ok((sale_id, credit_id))
}
