//! # Seed Data Generator
//!
//! Populates a development database with role counters, wards of beds and
//! rooms, a medicine catalog, and a handful of pending invoices.
//!
//! ## Usage
//! ```bash
//! # Defaults: 12 beds per ward, 30 medicines
//! cargo run -p medledger-db --bin seed
//!
//! # Custom sizes and path
//! cargo run -p medledger-db --bin seed -- --db ./medledger_dev.db --beds 20 --medicines 60
//! ```

use std::env;

use medledger_core::Role;
use medledger_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// Wards to lay out beds in.
const WARDS: &[&str] = &["ICU", "W1", "W2", "W3"];

/// Medicine names for realistic catalog data.
const MEDICINES: &[(&str, &str)] = &[
    ("Amoxicillin 500mg", "antibiotic"),
    ("Azithromycin 250mg", "antibiotic"),
    ("Ciprofloxacin 500mg", "antibiotic"),
    ("Paracetamol 500mg", "analgesic"),
    ("Ibuprofen 200mg", "analgesic"),
    ("Tramadol 50mg", "analgesic"),
    ("Metformin 850mg", "antidiabetic"),
    ("Insulin pen", "antidiabetic"),
    ("Amlodipine 5mg", "antihypertensive"),
    ("Lisinopril 10mg", "antihypertensive"),
    ("Atorvastatin 20mg", "statin"),
    ("Omeprazole 20mg", "antacid"),
    ("Ondansetron 4mg", "antiemetic"),
    ("Salbutamol inhaler", "bronchodilator"),
    ("Prednisolone 5mg", "corticosteroid"),
];

/// Blood groups stocked by the blood bank.
const BLOOD_GROUPS: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut beds_per_ward: usize = 12;
    let mut medicine_count: usize = 30;
    let mut db_path = String::from("./medledger_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--beds" | "-b" => {
                if i + 1 < args.len() {
                    beds_per_ward = args[i + 1].parse().unwrap_or(12);
                    i += 1;
                }
            }
            "--medicines" | "-m" => {
                if i + 1 < args.len() {
                    medicine_count = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MedLedger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --beds <N>       Beds per ward (default: 12)");
                println!("  -m, --medicines <N>  Medicines to catalog (default: 30)");
                println!("  -d, --db <PATH>      Database file path (default: ./medledger_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("MedLedger Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Refuse to double-seed.
    if db.sequences().current(Role::Patient.prefix()).await.is_ok() {
        println!("⚠ Database already seeded; delete the file to regenerate.");
        return Ok(());
    }

    // Role counters
    for role in Role::ALL {
        db.sequences().register(role.prefix(), 0).await?;
    }
    println!("✓ Registered {} role counters", Role::ALL.len());

    // Beds and rooms
    let resources = db.resources();
    let mut resource_count = 0;
    for ward in WARDS {
        for n in 1..=beds_per_ward {
            resources
                .add(
                    medledger_core::ResourceCategory::Bed,
                    &format!("{}-B{}", ward, n),
                )
                .await?;
            resource_count += 1;
        }
        for n in 1..=(beds_per_ward / 4).max(1) {
            resources
                .add(
                    medledger_core::ResourceCategory::Room,
                    &format!("{}-R{}", ward, n),
                )
                .await?;
            resource_count += 1;
        }
    }
    println!("✓ Added {} beds and rooms", resource_count);

    // Medicines and blood units
    let inventory = db.inventory();
    let mut stocked = 0;
    for idx in 0..medicine_count {
        let (base_name, group) = MEDICINES[idx % MEDICINES.len()];
        let name = if idx < MEDICINES.len() {
            base_name.to_string()
        } else {
            format!("{} (lot {})", base_name, idx / MEDICINES.len() + 1)
        };
        // Deterministic but varied quantities/thresholds
        let quantity = 20 + (idx as i64 * 7) % 80;
        inventory.add(&name, Some(group), quantity, 15).await?;
        stocked += 1;
    }
    for group in BLOOD_GROUPS {
        inventory
            .add(&format!("{} blood unit", group), Some(group), 8, 3)
            .await?;
        stocked += 1;
    }
    println!("✓ Stocked {} items", stocked);

    // A few pending invoices to exercise the billing screen
    let billing = db.billing();
    for (account, description, amount) in [
        ("P0001", "Ward stay (3 nights)", 45_000),
        ("P0001", "X-ray, chest", 12_000),
        ("P0002", "Lab panel", 8_500),
        ("P0003", "Consultation", 15_000),
    ] {
        billing.add(account, description, amount).await?;
    }
    println!("✓ Added 4 pending invoices");

    println!();
    println!("Done.");
    Ok(())
}
