use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use schema_probe::{DateRepresentation, KeyCasing, SchemaConfig, SchemaGenerator};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Fixture types covering the shapes we care about: nested named objects,
// optional fields, self-recursion, unit enums, data enums, dates, and maps.

#[derive(Deserialize)]
#[allow(dead_code)]
struct Pet {
    name: String,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct Person {
    name: String,
    age: i64,
    pet: Option<Pet>,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct Category {
    title: String,
    parent: Option<Box<Category>>,
    children: Vec<Category>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(dead_code)]
enum Color {
    Red,
    Green,
    Blue,
}

#[derive(Deserialize)]
#[allow(dead_code)]
enum Figure {
    Circle { radius: f64 },
    Square(f64),
    Empty,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct Event {
    event_name: String,
    starts_at: DateTime<Utc>,
    color: Color,
    figure: Figure,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct Inventory {
    stock: HashMap<String, u32>,
    owners: HashMap<String, Person>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_writer(std::io::stderr)
        .init();

    let config = SchemaConfig::new(DateRepresentation::Iso8601, KeyCasing::CamelCase);
    let mut generator = SchemaGenerator::new(config);

    let roots = [
        ("Person", generator.schema_for::<Person>()),
        ("Category", generator.schema_for::<Category>()),
        ("Event", generator.schema_for::<Event>()),
        ("Inventory", generator.schema_for::<Inventory>()),
        ("Vec<Color>", generator.schema_for::<Vec<Color>>()),
    ];
    for (label, root) in &roots {
        info!(root = *label, "{}", serde_json::to_string(root)?);
    }

    let registry = generator.into_registry();
    info!(components = registry.len(), "done");
    let out = serde_json::to_string_pretty(&registry).context("serializing registry")?;
    println!("{out}");
    Ok(())
}
