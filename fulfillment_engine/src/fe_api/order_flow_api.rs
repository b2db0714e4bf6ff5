use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{OrderId, Principal, Role},
    events::{EventProducers, OrderStatusChangedEvent, ReconciliationAnomalyEvent},
    fe_api::{
        errors::OrderFlowError,
        order_objects::{StatusUpdateRequest, TransitionOutcome},
    },
    state_machine::{transition, Actor, OrderEvent, OrderState},
    traits::{DispositionUpdate, FulfillmentDatabase},
};

/// How many times a status change is re-decided after losing a race with another writer.
pub const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// `OrderFlowApi` is the only way order and payment statuses change. Operators (vendors and admins) and the payment
/// reconciler both go through [`OrderFlowApi::apply_event`], so the same rules apply to everyone.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn producers(&self) -> &EventProducers {
        &self.producers
    }
}

impl<B> OrderFlowApi<B>
where B: FulfillmentDatabase
{
    /// Builds the [`Actor`] for a principal. Vendors are paired with the shop they own.
    pub async fn actor_for(&self, principal: &Principal) -> Result<Actor, OrderFlowError> {
        let owned_shop = match principal.role {
            Role::Vendor => self.db.fetch_shop_by_owner(&principal.user_id).await?.map(|s| s.id),
            _ => None,
        };
        Ok(Actor::new(principal.clone(), owned_shop))
    }

    /// Handles a status change request from a vendor or an administrator.
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: &OrderId,
        request: StatusUpdateRequest,
    ) -> Result<TransitionOutcome, OrderFlowError> {
        let actor = self.actor_for(principal).await?;
        let event = OrderEvent::Advance { to: request.status, payment_status: request.payment_status };
        self.apply_event(&actor, order_id, event, request.reason).await
    }

    /// Applies `event` to the order on behalf of `actor`.
    ///
    /// The decision is made by [`transition`] against the order as currently stored, and written with a guarded update
    /// that only succeeds if nobody else changed the order in the meantime. If someone did, the order is re-read and
    /// the decision made again, up to [`MAX_TRANSITION_ATTEMPTS`] times.
    ///
    /// A successful change publishes an [`OrderStatusChangedEvent`], plus a [`ReconciliationAnomalyEvent`] if the
    /// transition flagged one.
    pub async fn apply_event(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        event: OrderEvent,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, OrderFlowError> {
        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let order =
                self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
            let current =
                OrderState { status: order.status, payment_status: order.payment_status, shop_id: order.shop_id.clone() };
            let t = transition(&current, &event, actor).map_err(|e| {
                debug!("🔄️ {} cannot {event} on order {order_id} ({}): {e}", actor.user_id(), current.disposition());
                OrderFlowError::from(e)
            })?;
            let old = current.disposition();
            let update = DispositionUpdate {
                order_id: order_id.clone(),
                expected: old,
                new: t.disposition(),
                actor: actor.user_id().to_string(),
                reason: reason.clone(),
            };
            match self.db.update_order_disposition(update).await? {
                Some(updated) => {
                    info!("🔄️ Order {order_id} moved from {old} to {} by {}", t.disposition(), actor.user_id());
                    let changed = OrderStatusChangedEvent::new(updated.clone(), old, actor.user_id().to_string());
                    self.producers.publish_status_changed(changed).await;
                    if let Some(anomaly) = t.anomaly {
                        warn!("🔄️ Order {order_id}: {anomaly}. The order is now {}", t.disposition());
                        let detail = format!("{event} while order was {old}");
                        self.producers.publish_anomaly(ReconciliationAnomalyEvent::new(order_id.clone(), anomaly, detail)).await;
                    }
                    return Ok(TransitionOutcome { order: updated, transition: t });
                },
                None => {
                    debug!("🔄️ Order {order_id} changed underneath us (attempt {attempt}/{MAX_TRANSITION_ATTEMPTS})");
                },
            }
        }
        warn!("🔄️ Gave up on {event} for order {order_id} after {MAX_TRANSITION_ATTEMPTS} attempts");
        Err(OrderFlowError::ConcurrentModification(order_id.clone()))
    }
}
