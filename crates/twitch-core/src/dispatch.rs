use crate::client::IrcClient;
use crate::protocol::{Event, JoinEvent, MessageEvent, PartEvent};
use parking_lot::RwLock;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub type Callback<C, E> = Arc<dyn Fn(C, Arc<E>) -> HandlerFuture + Send + Sync>;

/// A callback tagged with the event kind it wants.
pub enum Handler<C = IrcClient> {
    OnMessage(Callback<C, MessageEvent>),
    OnJoin(Callback<C, JoinEvent>),
    OnPart(Callback<C, PartEvent>),
}

impl<C> Handler<C> {
    pub fn on_message<F, Fut>(f: F) -> Self
    where
        F: Fn(C, Arc<MessageEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::OnMessage(Arc::new(move |ctx, ev| Box::pin(f(ctx, ev))))
    }

    pub fn on_join<F, Fut>(f: F) -> Self
    where
        F: Fn(C, Arc<JoinEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::OnJoin(Arc::new(move |ctx, ev| Box::pin(f(ctx, ev))))
    }

    pub fn on_part<F, Fut>(f: F) -> Self
    where
        F: Fn(C, Arc<PartEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::OnPart(Arc::new(move |ctx, ev| Box::pin(f(ctx, ev))))
    }
}

/// Three independently locked handler lists. Locks are held only to append
/// or to snapshot a list, never while a callback runs.
pub struct Dispatcher<C = IrcClient> {
    message: RwLock<Vec<Callback<C, MessageEvent>>>,
    join: RwLock<Vec<Callback<C, JoinEvent>>>,
    part: RwLock<Vec<Callback<C, PartEvent>>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self {
            message: RwLock::new(Vec::new()),
            join: RwLock::new(Vec::new()),
            part: RwLock::new(Vec::new()),
        }
    }
}

impl<C> Dispatcher<C>
where
    C: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&self, handler: Handler<C>) {
        match handler {
            Handler::OnMessage(cb) => self.message.write().push(cb),
            Handler::OnJoin(cb) => self.join.write().push(cb),
            Handler::OnPart(cb) => self.part.write().push(cb),
        }
    }

    /// Spawns every handler registered for the event's kind and returns
    /// without waiting. Returns the number of tasks spawned.
    pub fn dispatch(&self, ctx: &C, event: Event) -> usize {
        match event {
            Event::Message(ev) => fan_out(&self.message, ctx, ev),
            Event::Join(ev) => fan_out(&self.join, ctx, ev),
            Event::Part(ev) => fan_out(&self.part, ctx, ev),
        }
    }

    pub fn handler_counts(&self) -> (usize, usize, usize) {
        (
            self.message.read().len(),
            self.join.read().len(),
            self.part.read().len(),
        )
    }
}

fn fan_out<C, E>(list: &RwLock<Vec<Callback<C, E>>>, ctx: &C, event: E) -> usize
where
    C: Clone + Send + 'static,
    E: Send + Sync + 'static,
{
    let handlers = list.read().clone();
    let event = Arc::new(event);
    for handler in &handlers {
        tokio::spawn(handler(ctx.clone(), event.clone()));
    }
    handlers.len()
}
