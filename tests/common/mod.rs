//! Shared fixtures: a small order-taking schema plus a three-level
//! parent/child/grandchild hierarchy, seeded into the in-memory store.
#![allow(dead_code)]

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use firestore_odm::{
    deserialize_fields, DocumentSession, DocumentSnapshot, EntityDescriptor, FieldPath,
    InMemoryStoreClient, MetadataRegistry, NavigationDescriptor, OdmResult, Record,
    RelatedEntities, SessionOptions,
};

#[derive(Debug, Default, Deserialize)]
pub struct Customer {
    pub name: String,
}

impl Record for Customer {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Customer", "customers")
    }

    fn from_snapshot(snapshot: &DocumentSnapshot, _related: &RelatedEntities) -> OdmResult<Self> {
        deserialize_fields(snapshot)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub qty: i64,
}

impl Record for OrderItem {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("OrderItem", "items")
    }

    fn from_snapshot(snapshot: &DocumentSnapshot, _related: &RelatedEntities) -> OdmResult<Self> {
        deserialize_fields(snapshot)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Order {
    pub status: String,
    pub total: f64,
    #[serde(skip)]
    pub items: Vec<Arc<OrderItem>>,
    #[serde(skip)]
    pub customer: Option<Arc<Customer>>,
}

impl Record for Order {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Order", "orders")
            .with_navigation(NavigationDescriptor::collection("items", "OrderItem", "items"))
            .with_navigation(NavigationDescriptor::reference(
                "customer",
                "Customer",
                FieldPath::from_dot_separated("customer").unwrap(),
            ))
    }

    fn from_snapshot(snapshot: &DocumentSnapshot, related: &RelatedEntities) -> OdmResult<Self> {
        let mut order: Order = deserialize_fields(snapshot)?;
        order.items = related.children_of(snapshot.key(), "items");
        order.customer = related.reference(
            snapshot,
            &FieldPath::from_dot_separated("customer").unwrap(),
        );
        Ok(order)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Parent {
    pub name: String,
    #[serde(skip)]
    pub children: Vec<Arc<Child>>,
}

impl Record for Parent {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Parent", "parents").with_navigation(
            NavigationDescriptor::collection("children", "Child", "children"),
        )
    }

    fn from_snapshot(snapshot: &DocumentSnapshot, related: &RelatedEntities) -> OdmResult<Self> {
        let mut parent: Parent = deserialize_fields(snapshot)?;
        parent.children = related.children_of(snapshot.key(), "children");
        Ok(parent)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Child {
    pub name: String,
    #[serde(skip)]
    pub grandchildren: Vec<Arc<Grandchild>>,
}

impl Record for Child {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Child", "children").with_navigation(
            NavigationDescriptor::collection("grandchildren", "Grandchild", "grandchildren"),
        )
    }

    fn from_snapshot(snapshot: &DocumentSnapshot, related: &RelatedEntities) -> OdmResult<Self> {
        let mut child: Child = deserialize_fields(snapshot)?;
        child.grandchildren = related.children_of(snapshot.key(), "grandchildren");
        Ok(child)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Grandchild {
    pub name: String,
}

impl Record for Grandchild {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Grandchild", "grandchildren")
    }

    fn from_snapshot(snapshot: &DocumentSnapshot, _related: &RelatedEntities) -> OdmResult<Self> {
        deserialize_fields(snapshot)
    }
}

pub fn registry() -> Arc<MetadataRegistry> {
    Arc::new(
        MetadataRegistry::new()
            .with::<Order>()
            .with::<OrderItem>()
            .with::<Customer>()
            .with::<Parent>()
            .with::<Child>()
            .with::<Grandchild>(),
    )
}

/// Two paid orders (shared customer, two and one items) plus one open order,
/// and a parent with two children and three grandchildren.
pub fn seeded_store() -> InMemoryStoreClient {
    let store = InMemoryStoreClient::new();

    store.insert_json("customers/c1", json!({"name": "Acme"}));
    store.insert_json(
        "orders/o1",
        json!({"status": "paid", "total": 10, "customer": "customers/c1"}),
    );
    store.insert_json("orders/o1/items/i1", json!({"sku": "widget", "qty": 2}));
    store.insert_json("orders/o1/items/i2", json!({"sku": "gadget", "qty": 1}));
    store.insert_json(
        "orders/o2",
        json!({"status": "paid", "total": 30, "customer": "customers/c1"}),
    );
    store.insert_json("orders/o2/items/i1", json!({"sku": "widget", "qty": 5}));
    store.insert_json("orders/o3", json!({"status": "open", "total": 20}));

    store.insert_json("parents/p1", json!({"name": "p1"}));
    store.insert_json("parents/p1/children/c1", json!({"name": "c1"}));
    store.insert_json(
        "parents/p1/children/c1/grandchildren/g1",
        json!({"name": "g1"}),
    );
    store.insert_json(
        "parents/p1/children/c1/grandchildren/g2",
        json!({"name": "g2"}),
    );
    store.insert_json("parents/p1/children/c2", json!({"name": "c2"}));
    store.insert_json(
        "parents/p1/children/c2/grandchildren/g3",
        json!({"name": "g3"}),
    );

    store
}

pub fn session(store: InMemoryStoreClient, options: SessionOptions) -> DocumentSession {
    DocumentSession::new(Arc::new(store), registry(), options)
}
