use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::event_sourcing::Aggregate;
use super::commands::{CreateOrder, OrderCommand};
use super::errors::OrderError;
use super::events::*;
use super::value_objects::{OrderItemSnapshot, OrderStatus};

// ============================================================================
// Order Aggregate - Lifecycle State Machine
// ============================================================================
//
//   Created ──► InPreparation ──► Prepared ──► Delivered
//
// Transitions only move forward, one step at a time, once each. Ticket and
// items may change only in Created or InPreparation.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAggregate {
    // Identity
    pub id: Uuid,
    pub version: i64,

    pub ticket_number: String,
    pub user_id: i64,
    pub status: OrderStatus,
    pub items: Vec<OrderItemSnapshot>,

    // Audit Trail
    pub ordered_at: DateTime<Utc>,
    pub prepared_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderAggregate {
    /// Validate a creation request and build the order with status Created.
    pub fn create(command: &CreateOrder) -> Result<(Self, OrderEvent), OrderError> {
        let ticket_number = validate_ticket_number(&command.ticket_number)?;
        validate_items(&command.items)?;

        let event = OrderEvent::Created(OrderCreated {
            ticket_number,
            user_id: command.user_id,
            items: command.items.clone(),
            ordered_at: Utc::now(),
        });

        let order = Self::apply_first_event(command.order_id, &event)?;
        Ok((order, event))
    }

    /// Guard shared by every editing command
    pub fn ensure_editable(&self) -> Result<(), OrderError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(OrderError::NotEditable)
        }
    }

    pub fn total(&self) -> Decimal {
        self.items.iter().map(OrderItemSnapshot::line_total).sum()
    }
}

fn validate_ticket_number(ticket_number: &str) -> Result<String, OrderError> {
    let ticket_number = ticket_number.trim();
    if ticket_number.is_empty() {
        return Err(OrderError::EmptyTicketNumber);
    }
    Ok(ticket_number.to_string())
}

fn validate_items(items: &[OrderItemSnapshot]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    for item in items {
        if item.quantity <= 0 {
            return Err(OrderError::NonPositiveQuantity(item.quantity));
        }
    }

    Ok(())
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderAggregate {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(aggregate_id: Uuid, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Created(e) => Ok(Self {
                id: aggregate_id,
                version: 1,
                ticket_number: e.ticket_number.clone(),
                user_id: e.user_id,
                status: OrderStatus::Created,
                items: e.items.clone(),
                ordered_at: e.ordered_at,
                prepared_at: None,
                delivered_at: None,
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Created(_) => {
                // First event already applied
                return Ok(());
            }
            OrderEvent::TicketRenamed(e) => {
                self.ticket_number = e.ticket_number.clone();
            }
            OrderEvent::ItemsReplaced(e) => {
                self.items = e.items.clone();
            }
            OrderEvent::MarkedInPreparation(_) => {
                self.status = OrderStatus::InPreparation;
            }
            OrderEvent::MarkedPrepared(e) => {
                self.status = OrderStatus::Prepared;
                self.prepared_at = Some(e.prepared_at);
            }
            OrderEvent::MarkedDelivered(e) => {
                self.status = OrderStatus::Delivered;
                self.delivered_at = Some(e.delivered_at);
            }
        }

        self.version += 1;
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::RenameTicket { ticket_number } => {
                self.ensure_editable()?;
                let ticket_number = validate_ticket_number(ticket_number)?;

                if ticket_number == self.ticket_number {
                    return Ok(vec![]);
                }

                Ok(vec![OrderEvent::TicketRenamed(OrderTicketRenamed { ticket_number })])
            }

            OrderCommand::ReplaceItems { items } => {
                self.ensure_editable()?;
                validate_items(items)?;

                Ok(vec![OrderEvent::ItemsReplaced(OrderItemsReplaced {
                    items: items.clone(),
                })])
            }

            OrderCommand::MarkInPreparation => {
                match self.status {
                    OrderStatus::Created => {}
                    OrderStatus::InPreparation => return Err(OrderError::AlreadyInPreparation),
                    OrderStatus::Prepared => return Err(OrderError::AlreadyPrepared),
                    OrderStatus::Delivered => return Err(OrderError::AlreadyDelivered),
                }

                Ok(vec![OrderEvent::MarkedInPreparation(OrderMarkedInPreparation {
                    started_at: Utc::now(),
                })])
            }

            OrderCommand::MarkPrepared => {
                match self.status {
                    OrderStatus::InPreparation => {}
                    OrderStatus::Created => return Err(OrderError::NotInPreparation),
                    OrderStatus::Prepared => return Err(OrderError::AlreadyPrepared),
                    OrderStatus::Delivered => return Err(OrderError::AlreadyDelivered),
                }

                Ok(vec![OrderEvent::MarkedPrepared(OrderMarkedPrepared {
                    prepared_at: Utc::now(),
                })])
            }

            OrderCommand::MarkDelivered => {
                match self.status {
                    OrderStatus::Prepared => {}
                    OrderStatus::Delivered => return Err(OrderError::AlreadyDelivered),
                    OrderStatus::Created | OrderStatus::InPreparation => {
                        return Err(OrderError::NotPrepared)
                    }
                }

                Ok(vec![OrderEvent::MarkedDelivered(OrderMarkedDelivered {
                    delivered_at: Utc::now(),
                })])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
