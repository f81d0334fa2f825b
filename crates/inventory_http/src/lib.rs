//! HTTP endpoint layer over the core document repositories.
//!
//! # Responsibility
//! - Translate REST requests into repository calls and results into JSON.
//! - Own the shared repository handles for the process.
//!
//! # Invariants
//! - Each entity kind has its own repository and connection.
//! - Repository calls run on the blocking pool, one at a time per kind.

pub mod config;
pub mod error;
pub mod handlers;

use axum::routing::get;
use axum::Router;
use inventory_core::{
    ConnectionManager, DbLocation, DocumentRepository, Entity, Equipment, EquipmentDb, Product,
    ProductDb,
};
use std::sync::{Arc, Mutex};

pub type SharedRepository<E> = Arc<Mutex<DocumentRepository<E>>>;

/// Repositories shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub equipment: SharedRepository<Equipment>,
    pub products: SharedRepository<Product>,
}

impl AppState {
    pub fn new(equipment: EquipmentDb, products: ProductDb) -> Self {
        Self {
            equipment: Arc::new(Mutex::new(equipment)),
            products: Arc::new(Mutex::new(products)),
        }
    }

    /// One lazily opened connection per kind, all pointing at `location`.
    ///
    /// With `DbLocation::Memory` each kind gets its own private database.
    pub fn for_location(location: &DbLocation) -> Self {
        Self::new(
            EquipmentDb::new(ConnectionManager::new(location.clone())),
            ProductDb::new(ConnectionManager::new(location.clone())),
        )
    }
}

/// An entity kind exposed over HTTP.
pub trait Resource: Entity {
    fn repository(state: &AppState) -> SharedRepository<Self>;
}

impl Resource for Equipment {
    fn repository(state: &AppState) -> SharedRepository<Self> {
        Arc::clone(&state.equipment)
    }
}

impl Resource for Product {
    fn repository(state: &AppState) -> SharedRepository<Self> {
        Arc::clone(&state.products)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .merge(resource_routes::<Equipment>("/equipment"))
        .merge(resource_routes::<Product>("/products"))
        .with_state(state)
}

fn resource_routes<E: Resource>(base: &str) -> Router<AppState> {
    Router::new()
        .route(
            base,
            get(handlers::list_records::<E>).post(handlers::create_record::<E>),
        )
        .route(
            &format!("{base}/{{id}}"),
            get(handlers::get_record::<E>)
                .put(handlers::update_record::<E>)
                .delete(handlers::delete_record::<E>),
        )
}
