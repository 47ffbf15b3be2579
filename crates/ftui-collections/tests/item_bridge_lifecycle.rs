use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use ftui_collections::{
    CollectionOptions, EventChannel, ItemChange, ItemChangeHandler, ListChangeKind, ListChanged,
    NotifyItemChanged, ObservableList, ObservableSet, PropertyId, PropertyRegistry, Subscription,
};

struct PersonState {
    name: RefCell<String>,
    changed: EventChannel<&'static str>,
}

/// Shared-identity element that reports its own property changes.
#[derive(Clone)]
struct Person(Rc<PersonState>);

impl Person {
    fn new(name: &str) -> Self {
        Self(Rc::new(PersonState {
            name: RefCell::new(name.to_owned()),
            changed: EventChannel::new(),
        }))
    }

    fn rename(&self, name: &str) {
        *self.0.name.borrow_mut() = name.to_owned();
        self.0.changed.emit(&"Name");
    }

    fn touch(&self, property: &'static str) {
        self.0.changed.emit(&property);
    }

    fn hooks(&self) -> usize {
        self.0.changed.listener_count()
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Person {}

impl Hash for Person {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl NotifyItemChanged for Person {
    fn on_change(&self, handler: ItemChangeHandler) -> Subscription {
        let me = self.clone();
        self.0
            .changed
            .subscribe(move |property: &&'static str| handler(&ItemChange::new(&me, property)))
    }
}

/// Element that keeps every handler it is given and ignores unsubscription,
/// so it can signal a container it has already left.
#[derive(Clone)]
struct Leaky {
    id: u32,
    handlers: Rc<RefCell<Vec<ItemChangeHandler>>>,
}

impl Leaky {
    fn new(id: u32) -> Self {
        Self {
            id,
            handlers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn signal(&self, property: &str) {
        let handlers = self.handlers.borrow().clone();
        for handler in handlers {
            handler(&ItemChange::new(self, property));
        }
    }
}

impl PartialEq for Leaky {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl NotifyItemChanged for Leaky {
    fn on_change(&self, handler: ItemChangeHandler) -> Subscription {
        self.handlers.borrow_mut().push(handler);
        Subscription::on_drop(|| {})
    }

    fn same_item(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handlers, &other.handlers)
    }
}

/// Element whose `PartialEq` compares labels; identity is the shared channel.
#[derive(Clone)]
struct Badge {
    label: &'static str,
    changed: Rc<EventChannel<&'static str>>,
}

impl Badge {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            changed: Rc::new(EventChannel::new()),
        }
    }

    fn touch(&self, property: &'static str) {
        self.changed.emit(&property);
    }

    fn hooks(&self) -> usize {
        self.changed.listener_count()
    }
}

impl PartialEq for Badge {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl NotifyItemChanged for Badge {
    fn on_change(&self, handler: ItemChangeHandler) -> Subscription {
        let me = self.clone();
        self.changed
            .subscribe(move |property: &&'static str| handler(&ItemChange::new(&me, property)))
    }

    fn same_item(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.changed, &other.changed)
    }
}

fn structural<T: Clone + PartialEq + 'static>(
    list: &ObservableList<T>,
) -> (Rc<RefCell<Vec<ListChanged>>>, Subscription) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = Rc::clone(&log);
    let sub = list.subscribe_list_changed(move |ev| l.borrow_mut().push(ev.clone()));
    (log, sub)
}

#[test]
fn insert_hooks_once_and_remove_unhooks() {
    let list = ObservableList::tracked();
    let ada = Person::new("Ada");

    list.add(ada.clone()).unwrap();
    assert_eq!(ada.hooks(), 1);
    assert_eq!(list.active_item_subscriptions(), 1);

    assert_eq!(list.remove(&ada), Ok(true));
    assert_eq!(ada.hooks(), 0);
    assert_eq!(list.active_item_subscriptions(), 0);
}

#[test]
fn clear_unhooks_everything_with_one_reset() {
    let people: Vec<Person> = ["a", "b", "c", "d"].into_iter().map(Person::new).collect();
    let list = ObservableList::tracked_from(people.clone(), CollectionOptions::default());
    assert!(people.iter().all(|p| p.hooks() == 1));
    let (log, _sub) = structural(&list);

    list.clear().unwrap();

    assert!(people.iter().all(|p| p.hooks() == 0));
    assert_eq!(list.active_item_subscriptions(), 0);
    assert_eq!(*log.borrow(), vec![ListChanged::reset()]);
}

#[test]
fn item_property_change_is_republished_with_position() {
    let registry = PropertyRegistry::new().with::<Person>(["Name", "Age"]);
    let list =
        ObservableList::tracked_with(CollectionOptions::default().with_descriptors(registry));
    let people: Vec<Person> = ["a", "b", "e"].into_iter().map(Person::new).collect();
    list.extend(people.iter().cloned()).unwrap();
    let (log, _sub) = structural(&list);

    people[2].rename("Eve");

    assert_eq!(
        *log.borrow(),
        vec![ListChanged::item_changed(2, Some(PropertyId::new(0, "Name")))]
    );
    assert_eq!(log.borrow()[0].property_name(), Some("Name"));
    assert_eq!(*people[2].0.name.borrow(), "Eve");
}

#[test]
fn item_changes_stay_off_coarse_and_property_channels() {
    let list = ObservableList::tracked();
    let p = Person::new("p");
    list.add(p.clone()).unwrap();

    let coarse = Rc::new(RefCell::new(0));
    let props = Rc::new(RefCell::new(0));
    let (c, q) = (Rc::clone(&coarse), Rc::clone(&props));
    let _s1 = list.subscribe_collection_changed(move |_| *c.borrow_mut() += 1);
    let _s2 = list.subscribe_property_changed(move |_| *q.borrow_mut() += 1);
    let (log, _s3) = structural(&list);

    p.touch("Name");

    assert_eq!(*coarse.borrow(), 0);
    assert_eq!(*props.borrow(), 0);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn undescribed_property_keeps_position_without_identifier() {
    let list = ObservableList::tracked();
    let p = Person::new("p");
    list.add(p.clone()).unwrap();
    let (log, _sub) = structural(&list);

    p.touch("Mood");

    assert_eq!(*log.borrow(), vec![ListChanged::item_changed(0, None)]);
}

#[test]
fn unnamed_change_resets() {
    let list = ObservableList::tracked();
    let p = Person::new("p");
    list.add(p.clone()).unwrap();
    let (log, _sub) = structural(&list);

    p.touch("");

    assert_eq!(*log.borrow(), vec![ListChanged::reset()]);
}

#[test]
fn replace_moves_the_hook_to_the_new_item() {
    let list = ObservableList::tracked();
    let old = Person::new("old");
    let new = Person::new("new");
    list.add(old.clone()).unwrap();

    list.set(0, new.clone()).unwrap();

    assert_eq!(old.hooks(), 0);
    assert_eq!(new.hooks(), 1);
    let (log, _sub) = structural(&list);
    old.touch("Name");
    assert!(log.borrow().is_empty());
}

#[test]
fn duplicate_occurrences_hold_one_hook_each() {
    let list = ObservableList::tracked();
    let p = Person::new("p");
    list.add(p.clone()).unwrap();
    list.add(p.clone()).unwrap();
    assert_eq!(p.hooks(), 2);

    list.remove_at(0).unwrap();
    assert_eq!(p.hooks(), 1);
    let (log, _sub) = structural(&list);
    p.touch("Name");
    assert_eq!(*log.borrow(), vec![ListChanged::item_changed(0, None)]);
}

#[test]
fn removing_a_value_equal_element_releases_only_its_hook() {
    let list = ObservableList::tracked();
    let (kept, gone) = (Badge::new("ops"), Badge::new("ops"));
    list.add(kept.clone()).unwrap();
    list.add(gone.clone()).unwrap();

    list.remove_at(1).unwrap();

    assert_eq!((kept.hooks(), gone.hooks()), (1, 0));
    assert_eq!(list.active_item_subscriptions(), 1);
    let (log, _sub) = structural(&list);
    kept.touch("Name");
    gone.touch("Name");
    assert_eq!(*log.borrow(), vec![ListChanged::item_changed(0, None)]);
}

#[test]
fn replacing_a_value_equal_element_moves_the_right_hook() {
    let list = ObservableList::tracked();
    let (first, second, fresh) = (Badge::new("x"), Badge::new("x"), Badge::new("y"));
    list.extend([first.clone(), second.clone()]).unwrap();

    list.set(1, fresh.clone()).unwrap();

    assert_eq!((first.hooks(), second.hooks(), fresh.hooks()), (1, 0, 1));
    let (log, _sub) = structural(&list);
    fresh.touch("Name");
    assert_eq!(*log.borrow(), vec![ListChanged::item_changed(1, None)]);
}

#[test]
fn stale_signal_from_a_value_twin_resets() {
    let list = ObservableList::tracked();
    let (ghost, twin) = (Leaky::new(3), Leaky::new(3));
    list.add(ghost.clone()).unwrap();
    list.add(twin.clone()).unwrap();
    list.remove_at(0).unwrap();
    let (log, _sub) = structural(&list);

    ghost.signal("Name");
    twin.signal("Name");

    assert_eq!(
        *log.borrow(),
        vec![ListChanged::reset(), ListChanged::item_changed(0, None)]
    );
}

#[test]
fn stale_signal_recovers_with_reset() {
    let list = ObservableList::tracked();
    let ghost = Leaky::new(7);
    list.add(ghost.clone()).unwrap();
    list.add(Leaky::new(8)).unwrap();
    list.remove(&ghost).unwrap();
    let (log, _sub) = structural(&list);

    ghost.signal("Name");

    assert_eq!(*log.borrow(), vec![ListChanged::reset()]);
    assert_eq!(list.len(), 1);
    assert_eq!(list.active_item_subscriptions(), 1);
}

#[test]
fn position_cache_serves_repeated_signals() {
    let list = ObservableList::tracked();
    let people: Vec<Person> = (0..5).map(|i| Person::new(&i.to_string())).collect();
    list.extend(people.iter().cloned()).unwrap();
    let (log, _sub) = structural(&list);

    people[3].touch("Name");
    people[3].touch("Name");
    people[3].touch("Name");

    assert_eq!(list.position_cache_hits(), 2);
    assert!(log
        .borrow()
        .iter()
        .all(|ev| ev.kind == ListChangeKind::ItemChanged && ev.index == Some(3)));

    // A structural change invalidates the slot; the next lookup walks again.
    list.remove_at(0).unwrap();
    log.borrow_mut().clear();
    people[3].touch("Name");
    assert_eq!(*log.borrow(), vec![ListChanged::item_changed(2, None)]);
    assert_eq!(list.position_cache_hits(), 2);
}

#[test]
fn dropping_the_container_releases_hooks() {
    let p = Person::new("p");
    {
        let list = ObservableList::tracked();
        list.add(p.clone()).unwrap();
        assert_eq!(p.hooks(), 1);
    }
    assert_eq!(p.hooks(), 0);
    // Signalling after the container is gone is harmless.
    p.touch("Name");
}

#[test]
fn untracked_container_never_hooks() {
    let list = ObservableList::new();
    let p = Person::new("p");
    list.add(p.clone()).unwrap();

    assert!(!list.is_tracking_items());
    assert_eq!(p.hooks(), 0);
}

#[test]
fn set_algebra_hooks_and_unhooks_each_member() {
    let a = Person::new("a");
    let b = Person::new("b");
    let c = Person::new("c");
    let set = ObservableSet::tracked();
    set.add(a.clone()).unwrap();
    set.add(b.clone()).unwrap();

    assert_eq!(set.symmetric_except_with([b.clone(), c.clone()]), Ok(true));

    assert_eq!((a.hooks(), b.hooks(), c.hooks()), (1, 0, 1));
    assert_eq!(set.active_item_subscriptions(), 2);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    let _sub = set.subscribe_list_changed(move |ev| s.borrow_mut().push(ev.clone()));
    c.touch("Name");
    assert_eq!(*seen.borrow(), vec![ListChanged::item_changed(1, None)]);
}

#[test]
fn muted_container_still_maintains_hooks() {
    let list = ObservableList::tracked_with(CollectionOptions::default().with_raise_events(false));
    let p = Person::new("p");
    let (log, _sub) = structural(&list);

    list.add(p.clone()).unwrap();
    p.touch("Name");

    assert!(log.borrow().is_empty());
    assert_eq!(p.hooks(), 1);
}
