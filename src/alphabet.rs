//! Events and the partition of the event universe into
//! controllable/uncontrollable and observable/unobservable events.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

use fixedbitset::FixedBitSet;

use crate::error::Error;

/// An event, identified by its index in an [`EventAlphabet`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Event(usize);

impl Event {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the index of this event in its alphabet.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A set of events, stored as a bit set over event indices.
#[derive(Debug, Clone, Default)]
pub struct EventSet {
    data: FixedBitSet,
}

impl EventSet {
    /// Creates an empty event set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty event set with room for events with index below `n`.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            data: FixedBitSet::with_capacity(n),
        }
    }

    /// Adds an event, returns true if it was not yet contained.
    pub fn insert(&mut self, event: Event) -> bool {
        if event.0 >= self.data.len() {
            self.data.grow(event.0 + 1);
        }
        !self.data.put(event.0)
    }

    /// Removes an event from the set.
    pub fn remove(&mut self, event: Event) {
        if event.0 < self.data.len() {
            self.data.set(event.0, false);
        }
    }

    /// Returns true if the event is contained in this set.
    pub fn contains(&self, event: Event) -> bool {
        self.data.contains(event.0)
    }

    /// Iterates over the events in this set in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.data.ones().map(Event)
    }

    /// Returns the number of events in this set.
    pub fn len(&self) -> usize {
        self.data.count_ones(..)
    }

    /// Returns true if this set contains no events.
    pub fn is_empty(&self) -> bool {
        self.data.ones().next().is_none()
    }

    pub fn union_with(&mut self, other: &EventSet) {
        self.data.union_with(&other.data);
    }

    pub fn union(&self, other: &EventSet) -> EventSet {
        let mut set = self.clone();
        set.union_with(other);
        set
    }

    pub fn intersection(&self, other: &EventSet) -> EventSet {
        self.iter().filter(|&e| other.contains(e)).collect()
    }

    pub fn difference(&self, other: &EventSet) -> EventSet {
        self.iter().filter(|&e| !other.contains(e)).collect()
    }

    pub fn is_subset(&self, other: &EventSet) -> bool {
        self.iter().all(|e| other.contains(e))
    }
}

// the bit sets may differ in length while holding the same events
impl PartialEq for EventSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for EventSet {}

impl Hash for EventSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for event in self.iter() {
            event.hash(state);
        }
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Event> for EventSet {
    fn extend<T: IntoIterator<Item = Event>>(&mut self, iter: T) {
        for event in iter {
            self.insert(event);
        }
    }
}

/// The global event universe Σ together with its controllable subset Σc
/// and observable subset Σo.
///
/// The two partitions are independent: an event may be any combination of
/// controllable/uncontrollable and observable/unobservable. The alphabet is
/// immutable once created and is passed explicitly to every operation that
/// needs it.
#[derive(Debug, Clone)]
pub struct EventAlphabet {
    names: Vec<String>,
    mapping: HashMap<String, Event>,
    controllable: EventSet,
    observable: EventSet,
}

impl EventAlphabet {
    /// Creates an alphabet from the event universe and the names of the
    /// controllable and observable events.
    ///
    /// Duplicate names in the universe are interned once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAlphabet`] if an event name is empty, or if a
    /// controllable or observable event is not part of the universe.
    pub fn new<I, C, O>(events: I, controllable: C, observable: O) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
        O: IntoIterator,
        O::Item: AsRef<str>,
    {
        let mut names = Vec::new();
        let mut mapping = HashMap::new();
        for name in events {
            let name = name.as_ref();
            if name.is_empty() {
                return Err(Error::InvalidAlphabet("empty event name".to_owned()));
            }
            if !mapping.contains_key(name) {
                mapping.insert(name.to_owned(), Event(names.len()));
                names.push(name.to_owned());
            }
        }
        let mut alphabet = Self {
            controllable: EventSet::with_capacity(names.len()),
            observable: EventSet::with_capacity(names.len()),
            names,
            mapping,
        };
        for name in controllable {
            let event = alphabet.member(name.as_ref(), "controllable")?;
            alphabet.controllable.insert(event);
        }
        for name in observable {
            let event = alphabet.member(name.as_ref(), "observable")?;
            alphabet.observable.insert(event);
        }
        Ok(alphabet)
    }

    fn member(&self, name: &str, subset: &str) -> Result<Event, Error> {
        self.event(name).ok_or_else(|| {
            Error::InvalidAlphabet(format!(
                "{} event `{}` is not part of the alphabet",
                subset, name
            ))
        })
    }

    /// Creates an alphabet where every event is controllable and observable.
    pub fn fully_controlled<I>(events: I) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let names: Vec<String> = events.into_iter().map(|s| s.as_ref().to_owned()).collect();
        Self::new(&names, &names, &names)
    }

    /// Returns the number of events in the universe.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the event with the given name, if it exists.
    pub fn event(&self, name: &str) -> Option<Event> {
        self.mapping.get(name).copied()
    }

    /// Returns the event with the given name, or an error mentioning `context`.
    pub fn lookup(&self, name: &str, context: &str) -> Result<Event, Error> {
        self.event(name).ok_or_else(|| Error::UnknownEvent {
            event: name.to_owned(),
            context: context.to_owned(),
        })
    }

    /// Returns the name of the event.
    ///
    /// # Panics
    ///
    /// Panics if the event does not belong to this alphabet.
    pub fn name(&self, event: Event) -> &str {
        &self.names[event.0]
    }

    /// Iterates over all events of the universe.
    pub fn iter(&self) -> impl Iterator<Item = Event> {
        (0..self.names.len()).map(Event)
    }

    /// Returns Σ as a set.
    pub fn events(&self) -> EventSet {
        self.iter().collect()
    }

    /// Returns Σc.
    pub fn controllable(&self) -> &EventSet {
        &self.controllable
    }

    /// Returns Σu = Σ \ Σc.
    pub fn uncontrollable(&self) -> EventSet {
        self.iter().filter(|&e| !self.is_controllable(e)).collect()
    }

    /// Returns Σo.
    pub fn observable(&self) -> &EventSet {
        &self.observable
    }

    /// Returns Σuo = Σ \ Σo.
    pub fn unobservable(&self) -> EventSet {
        self.iter().filter(|&e| !self.is_observable(e)).collect()
    }

    pub fn is_controllable(&self, event: Event) -> bool {
        self.controllable.contains(event)
    }

    pub fn is_observable(&self, event: Event) -> bool {
        self.observable.contains(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_independent() {
        let alphabet =
            EventAlphabet::new(&["a", "b", "c", "d"], &["a", "b"], &["a", "c"]).unwrap();
        let a = alphabet.event("a").unwrap();
        let b = alphabet.event("b").unwrap();
        let c = alphabet.event("c").unwrap();
        let d = alphabet.event("d").unwrap();

        assert!(alphabet.is_controllable(a) && alphabet.is_observable(a));
        assert!(alphabet.is_controllable(b) && !alphabet.is_observable(b));
        assert!(!alphabet.is_controllable(c) && alphabet.is_observable(c));
        assert!(!alphabet.is_controllable(d) && !alphabet.is_observable(d));

        assert_eq!(alphabet.uncontrollable(), [c, d].iter().copied().collect::<EventSet>());
        assert_eq!(alphabet.unobservable(), [b, d].iter().copied().collect::<EventSet>());
    }

    #[test]
    fn test_stray_controllable_event_is_rejected() {
        let result = EventAlphabet::new(&["a"], &["b"], &["a"]);
        assert!(matches!(result, Err(Error::InvalidAlphabet(message)) if message.contains("`b`")));
    }

    #[test]
    fn test_duplicates_are_interned_once() {
        let alphabet = EventAlphabet::fully_controlled(&["a", "b", "a"]).unwrap();
        assert_eq!(alphabet.len(), 2);
        assert_eq!(alphabet.event("a"), Some(Event::new(0)));
    }

    #[test]
    fn test_event_set_equality_ignores_capacity() {
        let mut small = EventSet::new();
        small.insert(Event::new(1));
        let mut large = EventSet::with_capacity(64);
        large.insert(Event::new(1));
        assert_eq!(small, large);
        large.insert(Event::new(40));
        large.remove(Event::new(40));
        assert_eq!(small, large);
        assert_eq!(large.len(), 1);
    }
}
