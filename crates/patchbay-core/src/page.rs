//! The patcher: a mutable graph of boxes and links.
//!
//! A [`Page`] owns its boxes (z-ordered, back to front) and its links, each
//! collection behind its own mutex. Operations that touch both always lock
//! boxes before links. Listeners are notified after the locks are released,
//! on the calling thread.
//!
//! User-facing operations follow a null/false contract: a request that
//! cannot be honored is logged and returns `None` or `false`, leaving the
//! graph as it was.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::attribute::{Attribute, AttributeEvent, AttributeListener, AttributeManager};
use crate::beacon::{Beacon, BeaconFactory};
use crate::dico::{Dico, keys};
use crate::dsp::DspContext;
use crate::element::{ElemVector, Element};
use crate::instance::Instance;
use crate::link::{Link, endpoint_pair};
use crate::object::Object;

/// Receives page notifications. Every method defaults to a no-op.
pub trait PageListener: Send + Sync {
    /// A box was added.
    fn box_created(&self, _page: &Page, _object: &Arc<Object>) {}
    /// A box was removed.
    fn box_removed(&self, _page: &Page, _object: &Arc<Object>) {}
    /// `old` was replaced by `new`, which kept its id.
    fn box_replaced(&self, _page: &Page, _old: &Arc<Object>, _new: &Arc<Object>) {}
    /// A link was added and connected.
    fn link_created(&self, _page: &Page, _link: &Arc<Link>) {}
    /// A link was disconnected and removed.
    fn link_removed(&self, _page: &Page, _link: &Arc<Link>) {}
    /// A link was rebuilt to follow a replaced box.
    fn link_replaced(&self, _page: &Page, _old: &Arc<Link>, _new: &Arc<Link>) {}
    /// A page attribute changed value.
    fn attribute_changed(&self, _page: &Page, _attribute: &Attribute) {}
    /// DSP started or stopped.
    fn dsp_state_changed(&self, _page: &Page, _running: bool) {}
}

/// Boxes in z-order plus the id allocator.
///
/// `taken` holds every allocated id, including ids reserved by a creation
/// still in flight. Gaps stay implicit, so a large written id costs one entry.
struct BoxSet {
    boxes: Vec<Arc<Object>>,
    taken: BTreeSet<u64>,
}

impl BoxSet {
    fn new() -> Self {
        Self {
            boxes: Vec::new(),
            taken: BTreeSet::new(),
        }
    }

    /// Allocates `preferred` if it is free, else the lowest unused id.
    fn allocate(&mut self, preferred: Option<u64>) -> u64 {
        if let Some(id) = preferred.filter(|&id| id != 0 && !self.taken.contains(&id)) {
            self.taken.insert(id);
            return id;
        }
        let mut id = 1;
        for &taken in &self.taken {
            if taken != id {
                break;
            }
            id += 1;
        }
        self.taken.insert(id);
        id
    }

    fn release(&mut self, id: u64) {
        self.taken.remove(&id);
    }

    fn position(&self, object: &Arc<Object>) -> Option<usize> {
        self.boxes.iter().position(|other| Arc::ptr_eq(other, object))
    }

    fn reset(&mut self) -> Vec<Arc<Object>> {
        self.taken.clear();
        std::mem::take(&mut self.boxes)
    }
}

/// A patcher page.
pub struct Page {
    me: Weak<Page>,
    instance: Weak<Instance>,
    attributes: AttributeManager,
    boxes: Mutex<BoxSet>,
    links: Mutex<Vec<Arc<Link>>>,
    listeners: Mutex<Vec<Weak<dyn PageListener>>>,
    local_beacons: BeaconFactory,
    dsp: Mutex<Option<DspContext>>,
}

impl Page {
    /// Creates an empty page that belongs to no instance.
    pub fn new() -> Arc<Page> {
        Self::with_instance(Weak::new())
    }

    /// Creates a page from a description (`{"page": {...}}` or the bare
    /// inner dico).
    pub fn create(description: &Dico) -> Arc<Page> {
        let page = Self::new();
        page.read(description);
        page
    }

    pub(crate) fn with_instance(instance: Weak<Instance>) -> Arc<Page> {
        Arc::new_cyclic(|me: &Weak<Page>| {
            let attributes = AttributeManager::new();
            attributes.add_attribute(
                Attribute::long("gridsize", 20)
                    .with_label("Grid Size")
                    .with_category("Editing"),
            );
            attributes.add_attribute(
                Attribute::color("bgcolor", [0.88, 0.89, 0.9, 1.0])
                    .with_label("Background Color")
                    .with_category("Color"),
            );
            // Bound after the defaults: `me` cannot be upgraded yet and would be pruned.
            let listener: Weak<dyn AttributeListener> = me.clone();
            attributes.bind(listener);
            Page {
                me: me.clone(),
                instance,
                attributes,
                boxes: Mutex::new(BoxSet::new()),
                links: Mutex::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
                local_beacons: BeaconFactory::new(),
                dsp: Mutex::new(None),
            }
        })
    }

    /// Owning instance, if any.
    pub fn instance(&self) -> Option<Arc<Instance>> {
        self.instance.upgrade()
    }

    /// The page's attributes.
    pub fn attributes(&self) -> &AttributeManager {
        &self.attributes
    }

    /// The beacon named `name`: the instance's, or a page-local one when the
    /// page has no instance.
    pub fn beacon(&self, name: &str) -> Arc<Beacon> {
        match self.instance.upgrade() {
            Some(instance) => instance.beacon(name),
            None => self.local_beacons.beacon(name),
        }
    }

    /// Registers a listener. Dropped listeners are pruned lazily.
    pub fn add_listener(&self, listener: Weak<dyn PageListener>) {
        self.listeners.lock().push(listener);
    }

    /// Unregisters a listener.
    pub fn remove_listener(&self, listener: &Weak<dyn PageListener>) {
        self.listeners
            .lock()
            .retain(|bound| !Weak::ptr_eq(bound, listener));
    }

    fn notify(&self, event: impl Fn(&dyn PageListener)) {
        let listeners: Vec<Arc<dyn PageListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|listener| listener.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            event(listener.as_ref());
        }
    }

    // --- Boxes ---

    /// Creates a box from a description and appends it on top.
    ///
    /// Returns `None` (and logs) if the description names no registered
    /// prototype.
    pub fn create_box(&self, description: &Dico) -> Option<Arc<Object>> {
        self.create_box_with_id(description, None)
    }

    /// Creates a box from inline text, e.g. `"+ 5 @position 10 20"`.
    pub fn create_box_from_text(&self, text: &str) -> Option<Arc<Object>> {
        let mut description = Dico::parse_text(text);
        if !description.has(keys::NAME) {
            tracing::warn!("the description isn't valid for box creation");
            return None;
        }
        description.set_one(keys::TEXT, text.trim());
        self.create_box(&description)
    }

    fn create_box_with_id(&self, description: &Dico, preferred: Option<u64>) -> Option<Arc<Object>> {
        let id = self.boxes.lock().allocate(preferred);
        let object = match Object::create(self.me.clone(), id, description) {
            Ok(object) => object,
            Err(err) => {
                tracing::error!(id, "{err}");
                self.boxes.lock().release(id);
                return None;
            }
        };
        self.boxes.lock().boxes.push(Arc::clone(&object));
        tracing::debug!(object = %object.name(), id, "box created");
        self.notify(|listener| listener.box_created(self, &object));
        Some(object)
    }

    /// Removes a box, first tearing down every link that touches it.
    ///
    /// Returns `false` if the box is not on this page.
    pub fn remove_box(&self, object: &Arc<Object>) -> bool {
        let removed_links = {
            let mut boxes = self.boxes.lock();
            let Some(position) = boxes.position(object) else {
                return false;
            };
            let removed_links = {
                let mut links = self.links.lock();
                let (touching, kept): (Vec<_>, Vec<_>) =
                    links.drain(..).partition(|link| link.touches(object));
                *links = kept;
                for link in &touching {
                    link.disconnect();
                }
                touching
            };
            boxes.boxes.remove(position);
            boxes.release(object.id());
            removed_links
        };

        tracing::debug!(object = %object.name(), id = object.id(), links = removed_links.len(), "box removed");
        for link in &removed_links {
            self.notify(|listener| listener.link_removed(self, link));
        }
        self.notify(|listener| listener.box_removed(self, object));
        true
    }

    /// Replaces `old` with a box built from `description`, keeping its id
    /// and z-position.
    ///
    /// Every link touching `old` is rebuilt on the new box at the same socket
    /// index; links the new box cannot carry are dropped. If the description
    /// has no `position`, the old position is kept.
    pub fn replace_box(&self, old: &Arc<Object>, description: &Dico) -> Option<Arc<Object>> {
        if self.boxes.lock().position(old).is_none() {
            return None;
        }
        let mut description = description.clone();
        if !description.has("position")
            && let Some(position) = old.attribute_value("position")
        {
            description.set("position", position);
        }
        let new = match Object::create(self.me.clone(), old.id(), &description) {
            Ok(object) => object,
            Err(err) => {
                tracing::error!(id = old.id(), "{err}");
                return None;
            }
        };

        let (replaced, dropped) = {
            let mut boxes = self.boxes.lock();
            let position = boxes.position(old)?;
            boxes.boxes[position] = Arc::clone(&new);

            let mut links = self.links.lock();
            let mut replaced = Vec::new();
            let mut dropped = Vec::new();
            let mut index = 0;
            while index < links.len() {
                if !links[index].touches(old) {
                    index += 1;
                    continue;
                }
                let stale = Arc::clone(&links[index]);
                stale.disconnect();
                match Link::replaced(&stale, old, &new).filter(Link::connect) {
                    Some(fresh) => {
                        let fresh = Arc::new(fresh);
                        links[index] = Arc::clone(&fresh);
                        replaced.push((stale, fresh));
                        index += 1;
                    }
                    None => {
                        links.remove(index);
                        dropped.push(stale);
                    }
                }
            }
            (replaced, dropped)
        };

        tracing::debug!(
            object = %new.name(),
            id = new.id(),
            relinked = replaced.len(),
            dropped = dropped.len(),
            "box replaced"
        );
        self.notify(|listener| listener.box_replaced(self, old, &new));
        for (stale, fresh) in &replaced {
            self.notify(|listener| listener.link_replaced(self, stale, fresh));
        }
        for link in &dropped {
            self.notify(|listener| listener.link_removed(self, link));
        }
        Some(new)
    }

    /// Moves a box to the top of the z-order.
    pub fn bring_to_front(&self, object: &Arc<Object>) -> bool {
        let mut boxes = self.boxes.lock();
        let Some(position) = boxes.position(object) else {
            return false;
        };
        let object = boxes.boxes.remove(position);
        boxes.boxes.push(object);
        true
    }

    /// Moves a box to the bottom of the z-order.
    pub fn bring_to_back(&self, object: &Arc<Object>) -> bool {
        let mut boxes = self.boxes.lock();
        let Some(position) = boxes.position(object) else {
            return false;
        };
        let object = boxes.boxes.remove(position);
        boxes.boxes.insert(0, object);
        true
    }

    /// Boxes in z-order, back to front.
    pub fn boxes(&self) -> Vec<Arc<Object>> {
        self.boxes.lock().boxes.clone()
    }

    /// The box with `id`.
    pub fn box_by_id(&self, id: u64) -> Option<Arc<Object>> {
        self.boxes
            .lock()
            .boxes
            .iter()
            .find(|object| object.id() == id)
            .cloned()
    }

    /// Returns `true` if `object` is on this page.
    pub fn contains_box(&self, object: &Arc<Object>) -> bool {
        self.boxes.lock().position(object).is_some()
    }

    /// Number of boxes.
    pub fn box_count(&self) -> usize {
        self.boxes.lock().boxes.len()
    }

    // --- Links ---

    /// Connects `link` and adds it to the page.
    ///
    /// Both endpoints must be boxes of this page and the connection must be
    /// compatible; otherwise nothing changes.
    pub fn add_link(&self, link: Link) -> Option<Arc<Link>> {
        let link = {
            let boxes = self.boxes.lock();
            let (Some(from), Some(to)) = (link.from(), link.to()) else {
                return None;
            };
            if boxes.position(&from).is_none() || boxes.position(&to).is_none() {
                tracing::warn!(from = from.id(), to = to.id(), "link endpoints aren't on this page");
                return None;
            }
            let mut links = self.links.lock();
            if !link.connect() {
                tracing::warn!(
                    from = from.id(),
                    outlet = link.outlet(),
                    to = to.id(),
                    inlet = link.inlet(),
                    "boxes can't be connected"
                );
                return None;
            }
            let link = Arc::new(link);
            links.push(Arc::clone(&link));
            tracing::debug!(from = from.id(), outlet = link.outlet(), to = to.id(), inlet = link.inlet(), "link created");
            link
        };
        self.notify(|listener| listener.link_created(self, &link));
        Some(link)
    }

    /// Creates a link from `{"from": [id, outlet], "to": [id, inlet]}`.
    pub fn create_link(&self, description: &Dico) -> Option<Arc<Link>> {
        Link::from_dico(self, description).and_then(|link| self.add_link(link))
    }

    /// Connects `from.outlet -> to.inlet`.
    pub fn connect(
        &self,
        from: &Arc<Object>,
        outlet: usize,
        to: &Arc<Object>,
        inlet: usize,
    ) -> Option<Arc<Link>> {
        self.add_link(Link::new(from, outlet, to, inlet))
    }

    /// Disconnects and removes a link. Returns `false` if it isn't on this page.
    pub fn remove_link(&self, link: &Arc<Link>) -> bool {
        {
            let mut links = self.links.lock();
            let Some(position) = links.iter().position(|other| Arc::ptr_eq(other, link)) else {
                return false;
            };
            links.remove(position);
            link.disconnect();
        }
        tracing::debug!(outlet = link.outlet(), inlet = link.inlet(), "link removed");
        self.notify(|listener| listener.link_removed(self, link));
        true
    }

    /// Links in creation order.
    pub fn links(&self) -> Vec<Arc<Link>> {
        self.links.lock().clone()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.lock().len()
    }

    // --- Persistence ---

    /// Replaces the page content with `description`.
    ///
    /// Box ids are preserved as written.
    pub fn read(&self, description: &Dico) {
        self.clear();
        let inner = unwrap_page(description);
        self.attributes.read(inner);
        self.append(inner);
    }

    /// Writes `{"page": {attributes, "boxes": [...], "links": [...]}}`.
    pub fn write(&self, dico: &mut Dico) {
        let mut inner = Dico::new();
        self.attributes.write(&mut inner);

        let boxes: ElemVector = self
            .boxes()
            .iter()
            .map(|object| {
                let mut description = Dico::new();
                object.write(&mut description);
                let mut wrapper = Dico::new();
                wrapper.set_one(keys::BOX, description);
                Element::from(wrapper)
            })
            .collect();
        let links: ElemVector = self
            .links()
            .iter()
            .filter_map(|link| {
                let mut description = Dico::new();
                link.write(&mut description);
                if description.is_empty() {
                    return None;
                }
                let mut wrapper = Dico::new();
                wrapper.set_one(keys::LINK, description);
                Some(Element::from(wrapper))
            })
            .collect();
        inner.set(keys::BOXES, boxes);
        inner.set(keys::LINKS, links);
        dico.set_one(keys::PAGE, inner);
    }

    /// Adds the boxes and links of `description` to the page.
    ///
    /// A box whose written id is already taken gets a fresh one, and every
    /// link endpoint naming the old id is rewritten before the link is
    /// created. Links naming boxes outside `description` are skipped.
    /// Returns the new boxes.
    pub fn append(&self, description: &Dico) -> Vec<Arc<Object>> {
        let inner = unwrap_page(description);
        let mut remap: HashMap<u64, u64> = HashMap::new();
        let mut created = Vec::new();

        for element in inner.get(keys::BOXES).map_or(&[][..], Vec::as_slice) {
            let Some(description) = wrapped(element, keys::BOX) else {
                tracing::warn!("invalid box description: {element}");
                continue;
            };
            let written = description
                .get_one(keys::ID)
                .and_then(Element::as_long)
                .filter(|id| *id > 0)
                .map(|id| id as u64);
            let Some(object) = self.create_box_with_id(description, written) else {
                continue;
            };
            if let Some(written) = written {
                if written != object.id() {
                    tracing::debug!(from = written, to = object.id(), "box id remapped");
                }
                remap.insert(written, object.id());
            }
            created.push(object);
        }

        for element in inner.get(keys::LINKS).map_or(&[][..], Vec::as_slice) {
            let Some(description) = wrapped(element, keys::LINK) else {
                tracing::warn!("invalid link description: {element}");
                continue;
            };
            let (Some((from, outlet)), Some((to, inlet))) = (
                endpoint_pair(description, keys::FROM),
                endpoint_pair(description, keys::TO),
            ) else {
                tracing::warn!("invalid link description: {description}");
                continue;
            };
            let (Some(&from), Some(&to)) = (remap.get(&from), remap.get(&to)) else {
                tracing::warn!(from, to, "link refers to a box outside the description");
                continue;
            };
            let mut rewritten = Dico::new();
            rewritten.set(keys::FROM, vec![Element::from(from), Element::from(outlet)]);
            rewritten.set(keys::TO, vec![Element::from(to), Element::from(inlet)]);
            self.create_link(&rewritten);
        }
        created
    }

    /// Removes every link, then every box, and resets id allocation.
    pub fn clear(&self) {
        let (objects, links) = {
            let mut boxes = self.boxes.lock();
            let links: Vec<Arc<Link>> = std::mem::take(&mut *self.links.lock());
            for link in &links {
                link.disconnect();
            }
            (boxes.reset(), links)
        };
        for link in &links {
            self.notify(|listener| listener.link_removed(self, link));
        }
        for object in &objects {
            self.notify(|listener| listener.box_removed(self, object));
        }
    }

    // --- DSP ---

    /// Compiles the current signal graph and starts DSP.
    ///
    /// A running context is stopped and rebuilt. Returns `false` (and logs)
    /// if the graph cannot compile; the page is left untouched.
    pub fn start_dsp(&self, sample_rate: u32, block_size: usize) -> bool {
        self.stop_dsp();
        let boxes = self.boxes();
        let links = self.links();
        match DspContext::compile(sample_rate, block_size, &boxes, &links) {
            Ok(context) => {
                *self.dsp.lock() = Some(context);
                self.notify(|listener| listener.dsp_state_changed(self, true));
                true
            }
            Err(err) => {
                tracing::error!("{err}");
                false
            }
        }
    }

    /// Runs one block. Returns `false` if DSP is not running.
    pub fn tick_dsp(&self) -> bool {
        match self.dsp.lock().as_mut() {
            Some(context) => {
                context.tick();
                true
            }
            None => false,
        }
    }

    /// Stops DSP and discards the schedule.
    pub fn stop_dsp(&self) {
        let context = self.dsp.lock().take();
        if let Some(context) = context {
            context.stop();
            self.notify(|listener| listener.dsp_state_changed(self, false));
        }
    }

    /// Returns `true` while a compiled schedule exists.
    pub fn is_dsp_running(&self) -> bool {
        self.dsp.lock().is_some()
    }

    /// Runs `f` on the running DSP context.
    pub fn with_dsp<R>(&self, f: impl FnOnce(&DspContext) -> R) -> Option<R> {
        self.dsp.lock().as_ref().map(f)
    }
}

impl AttributeListener for Page {
    fn attribute_changed(&self, event: AttributeEvent, attribute: &Attribute) {
        if event == AttributeEvent::ValueChanged {
            self.notify(|listener| listener.attribute_changed(self, attribute));
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("boxes", &self.box_count())
            .field("links", &self.link_count())
            .field("dsp", &self.is_dsp_running())
            .finish_non_exhaustive()
    }
}

/// The inner dico of `{"page": {...}}`, or `description` itself.
fn unwrap_page(description: &Dico) -> &Dico {
    description.get_dico(keys::PAGE).unwrap_or(description)
}

/// The dico inside `{"box": {...}}` / `{"link": {...}}`, or the element itself.
fn wrapped<'a>(element: &'a Element, key: &str) -> Option<&'a Dico> {
    let dico = element.as_dico()?;
    Some(dico.get_dico(key).unwrap_or(dico))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(ids: &[u64]) -> BoxSet {
        let mut set = BoxSet::new();
        for &id in ids {
            assert_eq!(set.allocate(Some(id)), id);
        }
        set
    }

    #[test]
    fn ids_grow_monotonically_when_nothing_is_free() {
        let mut set = BoxSet::new();
        assert_eq!(set.allocate(None), 1);
        assert_eq!(set.allocate(None), 2);
        assert_eq!(set.allocate(None), 3);
    }

    #[test]
    fn released_ids_are_reused_lowest_first() {
        let mut set = BoxSet::new();
        for _ in 0..5 {
            set.allocate(None);
        }
        set.release(4);
        set.release(2);
        assert_eq!(set.allocate(None), 2);
        assert_eq!(set.allocate(None), 4);
        assert_eq!(set.allocate(None), 6);
    }

    #[test]
    fn preferred_ids_leave_gaps_free() {
        let mut set = set_with(&[3]);
        assert_eq!(set.allocate(None), 1);
        assert_eq!(set.allocate(None), 2);
        assert_eq!(set.allocate(None), 4);
    }

    #[test]
    fn huge_preferred_id_keeps_the_gap_implicit() {
        let mut set = set_with(&[1_000_000_000]);
        assert_eq!(set.taken.len(), 1);
        assert_eq!(set.allocate(None), 1);
        assert_eq!(set.allocate(Some(u64::MAX)), u64::MAX);
        assert_eq!(set.allocate(None), 2);
        set.release(1_000_000_000);
        assert_eq!(set.allocate(Some(1_000_000_000)), 1_000_000_000);
    }

    #[test]
    fn taken_preferred_id_falls_back_to_lowest_free() {
        let mut set = set_with(&[1, 2]);
        assert_eq!(set.allocate(Some(2)), 3);
    }

    #[test]
    fn zero_is_never_allocated() {
        let mut set = BoxSet::new();
        assert_eq!(set.allocate(Some(0)), 1);
    }

    #[test]
    fn unwrap_page_accepts_both_forms() {
        let mut inner = Dico::new();
        inner.set_one("gridsize", 10);
        let mut outer = Dico::new();
        outer.set_one(keys::PAGE, inner.clone());
        assert_eq!(unwrap_page(&outer), &inner);
        assert_eq!(unwrap_page(&inner), &inner);
    }
}
