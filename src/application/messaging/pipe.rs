//! Handler chain for inbound event processing
//!
//! A [`Pipe`] offers each event to its handlers in registration order and
//! stops at the first one that consumes it. Pipes are handlers themselves, so
//! they nest.

use std::sync::Arc;

/// Processes events, reporting whether the event was consumed
pub trait Handler<E>: Send + Sync {
    fn process(&self, event: &E) -> bool;
}

impl<E, F> Handler<E> for F
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn process(&self, event: &E) -> bool {
        self(event)
    }
}

/// Ordered, consume-once handler chain.
///
/// Handler panics are not caught here. Registration needs `&mut self`, so the
/// topology is fixed once the pipe is shared.
pub struct Pipe<E> {
    handlers: Vec<Arc<dyn Handler<E>>>,
}

impl<E> Pipe<E> {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Add a handler to the chain (builder form)
    pub fn with_handler<H: Handler<E> + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn register_handler(&mut self, handler: Arc<dyn Handler<E>>) -> bool {
        self.handlers.push(handler);
        true
    }

    /// Remove the first registration of this exact handler instance
    pub fn unregister_handler(&mut self, handler: &Arc<dyn Handler<E>>) -> bool {
        match self.handlers.iter().position(|h| Arc::ptr_eq(h, handler)) {
            Some(index) => {
                self.handlers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E> Default for Pipe<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Handler<E> for Pipe<E> {
    fn process(&self, event: &E) -> bool {
        self.handlers.iter().any(|handler| handler.process(event))
    }
}

/// Event filter predicate type
pub type Filter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// Passes events to the wrapped handler only when a filter accepts them
pub struct Filtered<E> {
    handler: Arc<dyn Handler<E>>,
    filters: Vec<Filter<E>>,
}

impl<E> Filtered<E> {
    pub fn new(handler: Arc<dyn Handler<E>>) -> Self {
        Self {
            handler,
            filters: Vec::new(),
        }
    }

    /// Any single accepting filter lets the event through
    pub fn with_filter<P>(mut self, filter: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }
}

impl<E> Handler<E> for Filtered<E> {
    fn process(&self, event: &E) -> bool {
        if self.filters.iter().any(|accept| accept(event)) {
            self.handler.process(event)
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_pipe_consumes_nothing() {
        let pipe: Pipe<u32> = Pipe::new();
        assert!(!pipe.process(&1));
    }

    #[test]
    fn test_stops_at_first_consumer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let pipe: Pipe<u32> = Pipe::new()
            .with_handler(move |_: &u32| {
                counted.fetch_add(1, Ordering::SeqCst);
                false
            })
            .with_handler(|_: &u32| true)
            .with_handler(|_: &u32| -> bool { panic!("event passed on after being consumed") });

        assert!(pipe.process(&7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_consumers_all_see_event() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipe: Pipe<u32> = Pipe::new();
        for _ in 0..3 {
            let counted = Arc::clone(&calls);
            pipe.register_handler(Arc::new(move |_: &u32| {
                counted.fetch_add(1, Ordering::SeqCst);
                false
            }));
        }

        assert!(!pipe.process(&7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unregister_exact_instance() {
        let mut pipe: Pipe<u32> = Pipe::new();
        let first: Arc<dyn Handler<u32>> = Arc::new(|_: &u32| true);
        let second: Arc<dyn Handler<u32>> = Arc::new(|_: &u32| true);

        assert!(pipe.register_handler(Arc::clone(&first)));
        assert!(!pipe.unregister_handler(&second));
        assert!(pipe.unregister_handler(&first));
        assert!(!pipe.unregister_handler(&first));
        assert!(pipe.is_empty());
    }

    #[test]
    fn test_pipes_nest() {
        let inner: Pipe<u32> = Pipe::new()
            .with_handler(|n: &u32| *n == 1)
            .with_handler(|n: &u32| *n == 2);
        let outer: Pipe<u32> = Pipe::new()
            .with_handler(inner)
            .with_handler(|n: &u32| *n == 3);

        assert!(outer.process(&1));
        assert!(outer.process(&2));
        assert!(outer.process(&3));
        assert!(!outer.process(&4));
    }

    #[test]
    fn test_filtered_single_predicate() {
        let filtered = Filtered::<bool>::new(Arc::new(|_: &bool| true)).with_filter(|b: &bool| *b);
        assert!(filtered.process(&true));
        assert!(!filtered.process(&false));
    }

    #[test]
    fn test_filtered_any_predicate_accepts() {
        let filtered = Filtered::<i32>::new(Arc::new(|_: &i32| true))
            .with_filter(|n: &i32| *n > 0 && n % 2 == 1)
            .with_filter(|n: &i32| n % 2 == 0);

        assert!(filtered.process(&9));
        assert!(filtered.process(&16));
        assert!(!filtered.process(&-7));
        assert!(filtered.process(&-14));
    }

    #[test]
    fn test_filtered_without_predicates_rejects() {
        let filtered = Filtered::<u32>::new(Arc::new(|_: &u32| true));
        assert!(!filtered.process(&1));
    }
}
