use crate::toplevel::ToplevelId;

use super::ToplevelEvent;

/// Handle returned by [`EventDispatcher::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

type Callback = Box<dyn FnMut(ToplevelId, ToplevelEvent)>;

/// Callback list for engine notifications
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: Vec<(SubscriptionId, Callback)>,
    next_id: u32,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(ToplevelId, ToplevelEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, toplevel: ToplevelId, event: ToplevelEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(toplevel, event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_unsubscribed_callback_is_not_called() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();

        let sink = seen.clone();
        let first = dispatcher.subscribe(move |id, event| sink.borrow_mut().push((id, event)));
        let sink = seen.clone();
        dispatcher.subscribe(move |id, event| sink.borrow_mut().push((id, event)));

        dispatcher.emit(ToplevelId(1), ToplevelEvent::Hiding);
        assert_eq!(seen.borrow().len(), 2);

        assert!(dispatcher.unsubscribe(first));
        assert!(!dispatcher.unsubscribe(first));
        dispatcher.emit(ToplevelId(1), ToplevelEvent::Unhiding);
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(seen.borrow()[2], (ToplevelId(1), ToplevelEvent::Unhiding));
    }
}
