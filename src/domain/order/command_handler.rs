use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::error::Result;
use crate::event_sourcing::{wrap_events, Aggregate, DomainEvent, EventEnvelope};
use crate::metrics::Metrics;
use crate::store::Store;

use super::aggregate::OrderAggregate;
use super::commands::{CreateOrder, OrderCommand};
use super::composer::{compose_order_items, lines_from_inputs, OrderItemInput};
use super::errors::OrderError;
use super::events::OrderEvent;
use super::value_objects::{OrderItemSnapshot, OrderLineRequest, OrderStatus};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Request → Composer → Aggregate → Events → Store
//
// Loads the order, lets the aggregate decide, then saves state and events
// together against the version that was loaded.
//
// ============================================================================

/// Changes requested by an edit. At least one must be present.
///
/// Items stay in their wire shape until the order is known to be editable.
#[derive(Debug, Clone, Default)]
pub struct OrderEdit {
    pub ticket_number: Option<String>,
    pub items: Option<Vec<OrderItemInput>>,
}

pub struct OrderCommandHandler {
    store: Arc<dyn Store>,
    metrics: Arc<Metrics>,
}

impl OrderCommandHandler {
    pub fn new(store: Arc<dyn Store>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Compose items and open a new order owned by `owner_user_id`.
    pub async fn create_order(
        &self,
        ticket_number: &str,
        owner_user_id: i64,
        lines: &[OrderLineRequest],
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        let result = self
            .try_create_order(ticket_number, owner_user_id, lines, correlation_id)
            .await;
        self.observe("create", result)
    }

    async fn try_create_order(
        &self,
        ticket_number: &str,
        owner_user_id: i64,
        lines: &[OrderLineRequest],
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        if self.store.find_user(owner_user_id).await?.is_none() {
            return Err(OrderError::OwnerNotFound(owner_user_id).into());
        }

        let items = self.compose(lines).await?;

        let command = CreateOrder {
            order_id: Uuid::new_v4(),
            ticket_number: ticket_number.to_string(),
            user_id: owner_user_id,
            items,
        };

        let (order, event) = OrderAggregate::create(&command)?;
        let envelopes = wrap_events(order.id, 0, vec![event], correlation_id, Some(owner_user_id));

        self.store.save_order(&order, None, &envelopes).await?;
        self.metrics.record_order_created();

        tracing::info!(
            order_id = %order.id,
            ticket_number = %order.ticket_number,
            user_id = owner_user_id,
            items = order.items.len(),
            "Order created"
        );

        Ok(order)
    }

    /// Rename the ticket and/or replace the items in one save.
    ///
    /// The lifecycle guard runs before anything else, so a prepared order is
    /// rejected even for an empty or invalid edit.
    pub async fn edit_order(
        &self,
        order_id: Uuid,
        edit: OrderEdit,
        actor_id: i64,
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        let result = self.try_edit_order(order_id, edit, actor_id, correlation_id).await;
        self.observe("edit", result)
    }

    async fn try_edit_order(
        &self,
        order_id: Uuid,
        edit: OrderEdit,
        actor_id: i64,
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        let mut order = self.load(order_id).await?;
        order.ensure_editable()?;

        if edit.ticket_number.is_none() && edit.items.is_none() {
            return Err(OrderError::NothingToUpdate.into());
        }

        let lines = edit.items.map(lines_from_inputs).transpose()?;

        let mut commands = Vec::with_capacity(2);
        if let Some(ticket_number) = edit.ticket_number {
            commands.push(OrderCommand::RenameTicket { ticket_number });
        }
        if let Some(lines) = lines {
            let items: Vec<OrderItemSnapshot> = self.compose(&lines).await?;
            commands.push(OrderCommand::ReplaceItems { items });
        }

        let expected_version = order.version();
        let mut events = Vec::new();
        for command in &commands {
            events.extend(order.execute(command)?);
        }

        if events.is_empty() {
            tracing::debug!(order_id = %order_id, "Edit produced no change");
            return Ok(order);
        }

        let changes: Vec<&'static str> = events.iter().map(DomainEvent::event_type).collect();
        self.persist(&order, expected_version, events, actor_id, correlation_id).await?;
        for change in changes {
            self.metrics.record_edit(change);
        }

        tracing::info!(order_id = %order_id, version = order.version, "Order edited");
        Ok(order)
    }

    pub async fn rename_ticket(
        &self,
        order_id: Uuid,
        ticket_number: &str,
        actor_id: i64,
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        let edit = OrderEdit {
            ticket_number: Some(ticket_number.to_string()),
            items: None,
        };
        self.edit_order(order_id, edit, actor_id, correlation_id).await
    }

    pub async fn replace_order_items(
        &self,
        order_id: Uuid,
        lines: Vec<OrderLineRequest>,
        actor_id: i64,
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        let edit = OrderEdit {
            ticket_number: None,
            items: Some(lines.into_iter().map(OrderItemInput::from).collect()),
        };
        self.edit_order(order_id, edit, actor_id, correlation_id).await
    }

    pub async fn mark_in_preparation(&self, order_id: Uuid, actor_id: i64, correlation_id: Uuid) -> Result<OrderAggregate> {
        self.transition(order_id, OrderCommand::MarkInPreparation, actor_id, correlation_id).await
    }

    pub async fn mark_prepared(&self, order_id: Uuid, actor_id: i64, correlation_id: Uuid) -> Result<OrderAggregate> {
        self.transition(order_id, OrderCommand::MarkPrepared, actor_id, correlation_id).await
    }

    pub async fn mark_delivered(&self, order_id: Uuid, actor_id: i64, correlation_id: Uuid) -> Result<OrderAggregate> {
        self.transition(order_id, OrderCommand::MarkDelivered, actor_id, correlation_id).await
    }

    async fn transition(
        &self,
        order_id: Uuid,
        command: OrderCommand,
        actor_id: i64,
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        let result: Result<OrderAggregate> = async {
            let mut order = self.load(order_id).await?;
            let from = order.status;
            let expected_version = order.version();

            let events = order.execute(&command)?;
            self.persist(&order, expected_version, events, actor_id, correlation_id).await?;
            self.metrics.record_transition(command.name());

            tracing::info!(
                order_id = %order_id,
                from = %from,
                to = %order.status,
                "Order status changed"
            );
            Ok(order)
        }
        .await;

        self.observe(command.name(), result)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderAggregate> {
        self.load(order_id).await
    }

    /// Newest first.
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<OrderAggregate>> {
        Ok(self.store.list_orders(status).await?)
    }

    /// Every event recorded for the order, in sequence order.
    pub async fn order_history(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>> {
        self.load(order_id).await?;
        Ok(self.store.load_events(order_id).await?)
    }

    async fn load(&self, order_id: Uuid) -> Result<OrderAggregate> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound.into())
    }

    async fn compose(&self, lines: &[OrderLineRequest]) -> Result<Vec<OrderItemSnapshot>> {
        let started = Instant::now();
        let items = compose_order_items(self.store.as_ref(), lines).await?;
        self.metrics.record_composition(items.len(), started.elapsed().as_secs_f64());
        Ok(items)
    }

    async fn persist(
        &self,
        order: &OrderAggregate,
        expected_version: i64,
        events: Vec<OrderEvent>,
        actor_id: i64,
        correlation_id: Uuid,
    ) -> Result<()> {
        let envelopes = wrap_events(order.id, expected_version, events, correlation_id, Some(actor_id));
        self.store.save_order(order, Some(expected_version), &envelopes).await?;
        Ok(())
    }

    fn observe<T>(&self, command: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            let kind = e.kind();
            self.metrics.record_rejection(kind.as_str());
            tracing::warn!(command = command, kind = kind.as_str(), error = %e, "Order command rejected");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{NewMenu, NewProduct};
    use crate::domain::user::{Email, NewUserRecord, Role};
    use crate::error::{Error, ErrorKind};
    use crate::store::{CatalogStore, MemoryStore, OrderStore, UserStore};
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<MemoryStore>,
        metrics: Arc<Metrics>,
        handler: OrderCommandHandler,
        user_id: i64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(Metrics::new().unwrap());

        let user = store
            .insert_user(&NewUserRecord {
                email: Email::parse("greeter@wacdo.com").unwrap(),
                password_hash: "hash".to_string(),
                role: Role::Greeter,
            })
            .await
            .unwrap();

        store
            .insert_product(&NewProduct {
                name: "Fries".to_string(),
                description: "Salted".to_string(),
                image: String::new(),
                price: Decimal::new(250, 2),
                is_available: true,
                category_id: None,
            })
            .await
            .unwrap();
        store
            .insert_menu(&NewMenu {
                name: "Best Of".to_string(),
                description: "Burger menu".to_string(),
                image: String::new(),
                price: Decimal::new(854, 2),
                is_available: true,
                product_ids: vec![1],
            })
            .await
            .unwrap();

        let handler = OrderCommandHandler::new(store.clone(), metrics.clone());
        Fixture { store, metrics, handler, user_id: user.id }
    }

    fn default_lines() -> Vec<OrderLineRequest> {
        vec![OrderLineRequest::product(1, 2), OrderLineRequest::menu(1, 1)]
    }

    #[tokio::test]
    async fn test_create_order_persists_snapshots() {
        let fx = fixture().await;

        let order = fx
            .handler
            .create_order("A1", fx.user_id, &default_lines(), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.total(), Decimal::new(1354, 2));

        let stored = fx.store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored, order);
        assert_eq!(fx.metrics.orders_created.get(), 1);
        assert_eq!(fx.metrics.order_items_composed.get(), 2);
    }

    #[tokio::test]
    async fn test_failed_composition_creates_nothing() {
        let fx = fixture().await;
        let lines = vec![OrderLineRequest::product(1, 1), OrderLineRequest::product(9999, 1)];

        let err = fx
            .handler
            .create_order("A1", fx.user_id, &lines, Uuid::new_v4())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(fx.store.list_orders(None).await.unwrap().is_empty());
        assert_eq!(fx.metrics.order_commands_rejected.with_label_values(&["not_found"]).get(), 1);
    }

    #[tokio::test]
    async fn test_unknown_owner_rejected() {
        let fx = fixture().await;
        let err = fx
            .handler
            .create_order("A1", 404, &default_lines(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::OwnerNotFound(404))));
    }

    #[tokio::test]
    async fn test_lifecycle_through_handler() {
        let fx = fixture().await;
        let order = fx
            .handler
            .create_order("A1", fx.user_id, &default_lines(), Uuid::new_v4())
            .await
            .unwrap();

        let err = fx.handler.mark_prepared(order.id, fx.user_id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("must be in preparation"));

        fx.handler.mark_in_preparation(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();
        let err = fx
            .handler
            .mark_in_preparation(order.id, fx.user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already in preparation"));

        fx.handler.mark_prepared(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();
        let delivered = fx.handler.mark_delivered(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.delivered_at.is_some());

        let err = fx.handler.mark_delivered(order.id, fx.user_id, Uuid::new_v4()).await.unwrap_err();
        assert!(err.to_string().contains("already delivered"));

        assert_eq!(fx.metrics.order_transitions.with_label_values(&["delivered"]).get(), 1);
    }

    #[tokio::test]
    async fn test_edit_replaces_items_and_ticket() {
        let fx = fixture().await;
        let order = fx
            .handler
            .create_order("A1", fx.user_id, &default_lines(), Uuid::new_v4())
            .await
            .unwrap();

        let edit = OrderEdit {
            ticket_number: Some("B2".to_string()),
            items: Some(vec![OrderLineRequest::menu(1, 3).into()]),
        };
        let edited = fx.handler.edit_order(order.id, edit, fx.user_id, Uuid::new_v4()).await.unwrap();

        assert_eq!(edited.ticket_number, "B2");
        assert_eq!(edited.items.len(), 1);
        assert_eq!(edited.items[0].quantity, 3);
        assert_eq!(edited.version, 3);

        let stored = fx.store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items, edited.items);
    }

    #[tokio::test]
    async fn test_edit_guard_runs_before_empty_check() {
        let fx = fixture().await;
        let order = fx
            .handler
            .create_order("A1", fx.user_id, &default_lines(), Uuid::new_v4())
            .await
            .unwrap();

        let err = fx
            .handler
            .edit_order(order.id, OrderEdit::default(), fx.user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No data to update.");

        fx.handler.mark_in_preparation(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();
        fx.handler.mark_prepared(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();

        let err = fx
            .handler
            .edit_order(order.id, OrderEdit::default(), fx.user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already been prepared"));

        let err = fx
            .handler
            .rename_ticket(order.id, "C3", fx.user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::NotEditable)));
    }

    #[tokio::test]
    async fn test_edit_guard_runs_before_item_references_are_read() {
        let fx = fixture().await;
        let order = fx
            .handler
            .create_order("A1", fx.user_id, &default_lines(), Uuid::new_v4())
            .await
            .unwrap();
        fx.handler.mark_in_preparation(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();
        fx.handler.mark_prepared(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();

        let no_ref = OrderEdit {
            ticket_number: None,
            items: Some(vec![OrderItemInput { quantity: 1, ..Default::default() }]),
        };
        let err = fx.handler.edit_order(order.id, no_ref, fx.user_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::NotEditable)));

        let both_refs = OrderEdit {
            ticket_number: None,
            items: Some(vec![OrderItemInput { quantity: 1, product_id: Some(1), menu_id: Some(1) }]),
        };
        let err = fx
            .handler
            .edit_order(Uuid::new_v4(), both_refs, fx.user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::OrderNotFound)));
    }

    #[tokio::test]
    async fn test_edit_metrics_follow_emitted_events() {
        let fx = fixture().await;
        let order = fx
            .handler
            .create_order("A1", fx.user_id, &default_lines(), Uuid::new_v4())
            .await
            .unwrap();

        fx.handler.rename_ticket(order.id, "A1", fx.user_id, Uuid::new_v4()).await.unwrap();
        assert_eq!(fx.metrics.order_edits.with_label_values(&["OrderTicketRenamed"]).get(), 0);

        fx.handler.rename_ticket(order.id, "B2", fx.user_id, Uuid::new_v4()).await.unwrap();
        assert_eq!(fx.metrics.order_edits.with_label_values(&["OrderTicketRenamed"]).get(), 1);
        assert_eq!(fx.metrics.order_transitions.with_label_values(&["rename_ticket"]).get(), 0);
    }

    #[tokio::test]
    async fn test_replace_items_in_preparation() {
        let fx = fixture().await;
        let order = fx
            .handler
            .create_order("A1", fx.user_id, &default_lines(), Uuid::new_v4())
            .await
            .unwrap();
        fx.handler.mark_in_preparation(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();

        let edited = fx
            .handler
            .replace_order_items(order.id, vec![OrderLineRequest::product(1, 5)], fx.user_id, Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(edited.status, OrderStatus::InPreparation);
        assert_eq!(edited.items.len(), 1);
        assert_eq!(edited.total(), Decimal::new(1250, 2));
    }

    #[tokio::test]
    async fn test_history_replays_to_stored_state() {
        let fx = fixture().await;
        let order = fx
            .handler
            .create_order("A1", fx.user_id, &default_lines(), Uuid::new_v4())
            .await
            .unwrap();
        fx.handler.rename_ticket(order.id, "Z9", fx.user_id, Uuid::new_v4()).await.unwrap();
        fx.handler.mark_in_preparation(order.id, fx.user_id, Uuid::new_v4()).await.unwrap();

        let history = fx.handler.order_history(order.id).await.unwrap();
        let types: Vec<_> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, ["OrderCreated", "OrderTicketRenamed", "OrderMarkedInPreparation"]);
        assert!(history.iter().all(|e| e.user_id == Some(fx.user_id)));

        let replayed = OrderAggregate::load_from_events(history).unwrap();
        let stored = fx.handler.get_order(order.id).await.unwrap();
        assert_eq!(replayed, stored);
    }

    #[tokio::test]
    async fn test_missing_order() {
        let fx = fixture().await;
        let err = fx
            .handler
            .mark_delivered(Uuid::new_v4(), fx.user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Order not found.");
    }
}
