//! Simple example exposing two resources over REST
//!
//! ```text
//! curl localhost:3000/people
//! curl -X POST localhost:3000/people -d '{"name": "Grace", "email": "grace@example.com", "age": 85}'
//! curl -X POST localhost:3000/people/1 -d '{"name": "Grace Hopper", "email": "grace@example.com", "age": 85}'
//! curl -X DELETE localhost:3000/people/1
//! ```
//!
//! Pass a YAML file as the first argument to override the defaults.

use resource_controller::prelude::*;
use tracing_subscriber::EnvFilter;

impl_resource_entity!(Person, "person", "people", {
    name: String,
    email: String,
    age: i64,
});

impl_resource_entity!(Book, "book", "books", {
    title: String,
    isbn: String,
    price: f64,
});

fn person_form() -> FormSchema<Person> {
    FormSchema::for_entity()
        .field(
            FieldDefinition::text("name")
                .filter(trim())
                .validator(not_blank())
                .validator(string_length(2, 100)),
        )
        .field(
            FieldDefinition::text("email")
                .filter(trim())
                .filter(lowercase())
                .validator(email()),
        )
        .field(FieldDefinition::integer("age").validator(positive()))
}

fn book_form() -> FormSchema<Book> {
    FormSchema::for_entity()
        .field(FieldDefinition::text("title").filter(trim()).validator(not_blank()))
        .field(FieldDefinition::text("isbn").filter(uppercase()))
        .field(
            FieldDefinition::number("price")
                .filter(round_decimals(2))
                .validator(positive()),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,resource_controller=debug")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_yaml_file(&path)?,
        None => AppConfig::default(),
    };

    // One gateway shared by every resource, like a single entity manager
    let manager = Arc::new(InMemoryEntityManager::from_config(&config.cache));

    manager.seed(Person {
        id: None,
        name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        age: 36,
    })?;

    let people: ResourceController<Person> =
        ResourceController::with_json_forms(manager.clone(), Arc::new(person_form()));
    let books: ResourceController<Book> =
        ResourceController::with_json_forms(manager, Arc::new(book_form()));

    ServerBuilder::new()
        .with_config(config)
        .register_resource(people)?
        .register_resource(books)?
        .serve_configured()
        .await
}
