/// Watches the progress of a long-running operation such as a build.
///
/// Every event is handed to the observer as it happens. Returning
/// `Some(action)` asks the emitter to act on it (for example to abort before
/// the next external tool runs), returning `None` lets it carry on.
///
/// Any `FnMut(&E) -> Option<A>` closure is an observer, and `()` is the
/// observer that never intervenes.
pub trait Observer<E, A> {
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive<O: Observer<u32, &'static str>>(mut observer: O) -> Vec<&'static str> {
        (0..4).filter_map(|n| observer.observe(&n)).collect()
    }

    #[test]
    fn closure_can_intervene() {
        let actions = drive(|n: &u32| (*n == 2).then_some("stop"));
        assert_eq!(actions, vec!["stop"]);
    }

    #[test]
    fn unit_never_intervenes() {
        assert!(drive(()).is_empty());
    }
}
