//! Seeding helpers and a fault-injecting store for unit tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use pharmacy_auth::{NewUser, Role, User};
use pharmacy_catalog::{Category, Product, ProductDraft};
use pharmacy_core::{
    CategoryId, Entity, EntityKind, ExpectedVersion, Filter, OrderDetailId, OrderId, ProductId,
    UserId,
};
use pharmacy_sales::{Order, OrderDetail};

use crate::entity_store::{EntityStore, InMemoryEntityStore, StoreError};

pub(crate) struct Fixture {
    pub store: Arc<InMemoryEntityStore>,
    pub now: DateTime<Utc>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryEntityStore::new()),
            now: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        }
    }

    pub fn user(&self, username: &str) -> UserId {
        let user = User::register(
            NewUser {
                username: username.to_string(),
                password_credential: "argon2$hash".to_string(),
                email: format!("{username}@example.com"),
                display_name: username.to_string(),
                role: Role::Customer,
            },
            self.now,
        )
        .unwrap();
        self.store.insert(&user).unwrap()
    }

    pub fn category(&self, name: &str) -> CategoryId {
        self.store.insert(&Category::new(name).unwrap()).unwrap()
    }

    /// Product in a fresh category.
    pub fn product(&self, name: &str, stock: i64) -> ProductId {
        let category = self.category(&format!("{name} category"));
        self.product_in(category, name, stock)
    }

    pub fn product_in(&self, category_id: CategoryId, name: &str, stock: i64) -> ProductId {
        let product = Product::new(ProductDraft {
            name: name.to_string(),
            price_cents: 499,
            stock,
            category_id,
        })
        .unwrap();
        self.store.insert(&product).unwrap()
    }

    pub fn order(&self, user_id: UserId) -> OrderId {
        self.store.insert(&Order::place(user_id, self.now)).unwrap()
    }

    pub fn detail(&self, order_id: OrderId, product_id: ProductId, quantity: i64) -> OrderDetailId {
        self.store
            .insert(&OrderDetail::new(order_id, product_id, quantity))
            .unwrap()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.store.count(kind).unwrap()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Insert,
    Update,
    Delete,
}

#[derive(Debug)]
struct Fault {
    op: Op,
    kind: EntityKind,
    error: StoreError,
    skip: u32,
    remaining: u32,
}

/// Wraps an in-memory store and fails selected operations a fixed number of
/// times before letting them through.
#[derive(Debug, Clone)]
pub(crate) struct FaultyStore {
    inner: Arc<InMemoryEntityStore>,
    faults: Arc<Mutex<Vec<Fault>>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryEntityStore>) -> Self {
        Self {
            inner,
            faults: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fail(&self, op: Op, kind: EntityKind, error: StoreError, times: u32) {
        self.fail_after(op, kind, error, 0, times);
    }

    /// Let `skip` matching calls through, then fail the next `times`.
    pub fn fail_after(&self, op: Op, kind: EntityKind, error: StoreError, skip: u32, times: u32) {
        self.faults.lock().unwrap().push(Fault {
            op,
            kind,
            error,
            skip,
            remaining: times,
        });
    }

    fn trip(&self, op: Op, kind: EntityKind) -> Result<(), StoreError> {
        let mut faults = self.faults.lock().unwrap();
        match faults
            .iter_mut()
            .find(|f| f.op == op && f.kind == kind && f.remaining > 0)
        {
            Some(fault) if fault.skip > 0 => {
                fault.skip -= 1;
                Ok(())
            }
            Some(fault) => {
                fault.remaining -= 1;
                Err(fault.error.clone())
            }
            None => Ok(()),
        }
    }
}

impl EntityStore for FaultyStore {
    fn get<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StoreError> {
        self.inner.get(id)
    }

    fn find_where<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>, StoreError> {
        self.inner.find_where(filter)
    }

    fn insert<E: Entity>(&self, entity: &E) -> Result<E::Id, StoreError> {
        self.trip(Op::Insert, E::KIND)?;
        self.inner.insert(entity)
    }

    fn update<E: Entity>(&self, entity: &E, expected: ExpectedVersion) -> Result<u64, StoreError> {
        self.trip(Op::Update, E::KIND)?;
        self.inner.update(entity, expected)
    }

    fn delete<E: Entity>(&self, id: E::Id) -> Result<(), StoreError> {
        self.trip(Op::Delete, E::KIND)?;
        self.inner.delete::<E>(id)
    }
}
