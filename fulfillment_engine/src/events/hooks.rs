use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
    ReconciliationAnomalyEvent,
};

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub anomaly_producer: Vec<EventProducer<ReconciliationAnomalyEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_status_changed(&self, event: OrderStatusChangedEvent) {
        for producer in &self.status_changed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_anomaly(&self, event: ReconciliationAnomalyEvent) {
        for producer in &self.anomaly_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Vec<EventHandler<OrderCreatedEvent>>,
    pub on_status_changed: Vec<EventHandler<OrderStatusChangedEvent>>,
    pub on_anomaly: Vec<EventHandler<ReconciliationAnomalyEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created =
            hooks.on_order_created.into_iter().map(|f| EventHandler::new("OrderCreated", buffer_size, f)).collect();
        let on_status_changed = hooks
            .on_status_changed
            .into_iter()
            .map(|f| EventHandler::new("OrderStatusChanged", buffer_size, f))
            .collect();
        let on_anomaly =
            hooks.on_anomaly.into_iter().map(|f| EventHandler::new("ReconciliationAnomaly", buffer_size, f)).collect();
        Self { on_order_created, on_status_changed, on_anomaly }
    }

    pub fn producers(&self) -> EventProducers {
        EventProducers {
            order_created_producer: self.on_order_created.iter().map(|h| h.subscribe()).collect(),
            status_changed_producer: self.on_status_changed.iter().map(|h| h.subscribe()).collect(),
            anomaly_producer: self.on_anomaly.iter().map(|h| h.subscribe()).collect(),
        }
    }

    /// Spawns one task per handler. Each task ends once all producers for it have been dropped.
    pub async fn start_handlers(self) {
        for handler in self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        for handler in self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
        for handler in self.on_anomaly {
            tokio::spawn(handler.start_handler());
        }
    }
}

/// The set of async callbacks to run when engine events occur. Several callbacks may be registered for the same event;
/// each gets its own copy of the event.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Vec<Handler<OrderCreatedEvent>>,
    pub on_status_changed: Vec<Handler<OrderStatusChangedEvent>>,
    pub on_anomaly: Vec<Handler<ReconciliationAnomalyEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_order_created.push(Arc::new(f));
        self
    }

    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_status_changed.push(Arc::new(f));
        self
    }

    pub fn on_anomaly<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReconciliationAnomalyEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_anomaly.push(Arc::new(f));
        self
    }

    /// Adds all of `other`'s hooks to this set.
    pub fn merge(mut self, other: EventHooks) -> Self {
        self.on_order_created.extend(other.on_order_created);
        self.on_status_changed.extend(other.on_status_changed);
        self.on_anomaly.extend(other.on_anomaly);
        self
    }
}
