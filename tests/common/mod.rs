//! Shared fixtures: a small retail domain with a nullable and a required
//! relation, plus store/session helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::any::Any;

use dualstore::{
    CascadePolicy, Entity, EntityFactory, EntityHandle, EntityId, EntityMetadata, EntityRef,
    EntityValidator, RelationDescriptor, RequestSession, RequestSignals, Result, Store,
    StoreConfig, ValidationResult,
};

#[derive(Debug, Default)]
pub struct Customer {
    id: Option<EntityId>,
    name: String,
    shop: Option<EntityRef>,
    metadata: EntityMetadata,
}

impl Customer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// A copy carrying an identifier, standing in for an instance loaded
    /// elsewhere (stale or foreign-context).
    pub fn with_id(id: EntityId, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_shop(&mut self, shop: EntityRef) {
        self.shop = Some(shop);
    }
}

impl Entity for Customer {
    fn entity_type(&self) -> &'static str {
        "customer"
    }

    fn table_name(&self) -> &str {
        "customers"
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.metadata
    }

    fn state(&self) -> Result<serde_json::Value> {
        Ok(json!({ "name": self.name }))
    }

    fn load_state(&mut self, fields: &serde_json::Value) -> Result<()> {
        self.name = fields
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(())
    }

    fn relations(&self) -> &'static [RelationDescriptor] {
        const RELATIONS: &[RelationDescriptor] =
            &[RelationDescriptor::to_one("shop", true, CascadePolicy::None)];
        RELATIONS
    }

    fn relation_targets(&self, relation: &str) -> Vec<EntityRef> {
        match relation {
            "shop" => self.shop.clone().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl EntityFactory for Customer {
    fn entity_type_name() -> &'static str {
        "customer"
    }

    fn from_state(id: EntityId, fields: &serde_json::Value) -> Result<Self> {
        let mut customer = Customer::default();
        customer.load_state(fields)?;
        customer.id = Some(id);
        Ok(customer)
    }
}

#[derive(Debug, Default)]
pub struct Shop {
    id: Option<EntityId>,
    name: String,
    metadata: EntityMetadata,
}

impl Shop {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Shop {
    fn entity_type(&self) -> &'static str {
        "shop"
    }

    fn table_name(&self) -> &str {
        "shops"
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.metadata
    }

    fn state(&self) -> Result<serde_json::Value> {
        Ok(json!({ "name": self.name }))
    }

    fn load_state(&mut self, fields: &serde_json::Value) -> Result<()> {
        self.name = fields
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl EntityFactory for Shop {
    fn entity_type_name() -> &'static str {
        "shop"
    }

    fn from_state(id: EntityId, fields: &serde_json::Value) -> Result<Self> {
        let mut shop = Shop::default();
        shop.load_state(fields)?;
        shop.id = Some(id);
        Ok(shop)
    }
}

#[derive(Debug, Default)]
pub struct Order {
    id: Option<EntityId>,
    label: String,
    customer: Option<EntityRef>,
    metadata: EntityMetadata,
}

impl Order {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    pub fn for_customer(label: &str, customer: EntityRef) -> Self {
        Self {
            label: label.to_string(),
            customer: Some(customer),
            ..Self::default()
        }
    }
}

impl Entity for Order {
    fn entity_type(&self) -> &'static str {
        "order"
    }

    fn table_name(&self) -> &str {
        "orders"
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.metadata
    }

    fn state(&self) -> Result<serde_json::Value> {
        Ok(json!({ "label": self.label }))
    }

    fn load_state(&mut self, fields: &serde_json::Value) -> Result<()> {
        self.label = fields
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(())
    }

    fn relations(&self) -> &'static [RelationDescriptor] {
        const RELATIONS: &[RelationDescriptor] = &[RelationDescriptor::to_one(
            "customer",
            false,
            CascadePolicy::Persist,
        )];
        RELATIONS
    }

    fn relation_targets(&self, relation: &str) -> Vec<EntityRef> {
        match relation {
            "customer" => self.customer.clone().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl EntityFactory for Order {
    fn entity_type_name() -> &'static str {
        "order"
    }

    fn from_state(id: EntityId, fields: &serde_json::Value) -> Result<Self> {
        let mut order = Order::default();
        order.load_state(fields)?;
        order.id = Some(id);
        Ok(order)
    }
}

/// Structural validator used where tests need a rejection path.
pub struct RejectEmptyNames;

#[async_trait]
impl EntityValidator for RejectEmptyNames {
    async fn validate_for_persistence(&self, entity: &EntityHandle) -> ValidationResult {
        let guard = entity.read().await;
        if let Some(customer) = guard.as_any().downcast_ref::<Customer>() {
            if customer.name().is_empty() {
                return ValidationResult::failure("Customer name must not be empty");
            }
        }
        ValidationResult::ok()
    }
}

pub fn fixture_store() -> Store {
    Store::builder(StoreConfig::dual())
        .register_entity::<Customer>()
        .register_entity::<Shop>()
        .register_entity::<Order>()
        .build()
        .unwrap()
}

pub async fn dev_session(store: &Store) -> RequestSession {
    store.request(RequestSignals::query("dev")).await.unwrap()
}

pub async fn prod_session(store: &Store) -> RequestSession {
    store.request(RequestSignals::query("prod")).await.unwrap()
}

/// Reads the customer's name field through the handle.
pub async fn customer_name(handle: &EntityHandle) -> String {
    let guard = handle.read().await;
    guard
        .as_any()
        .downcast_ref::<Customer>()
        .map(|c| c.name().to_string())
        .unwrap_or_default()
}
