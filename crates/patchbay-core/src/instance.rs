//! Top-level container for pages.
//!
//! An [`Instance`] owns its pages and the beacons they share, and fans DSP
//! control out to every page.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::beacon::{Beacon, BeaconFactory};
use crate::dico::Dico;
use crate::page::Page;

/// Owns pages and the beacon namespace they share.
pub struct Instance {
    me: Weak<Instance>,
    pages: Mutex<Vec<Arc<Page>>>,
    beacons: BeaconFactory,
}

impl Instance {
    /// Creates an instance with no pages.
    pub fn new() -> Arc<Instance> {
        Arc::new_cyclic(|me| Instance {
            me: me.clone(),
            pages: Mutex::new(Vec::new()),
            beacons: BeaconFactory::new(),
        })
    }

    /// Creates an empty page.
    pub fn create_page(&self) -> Arc<Page> {
        let page = Page::with_instance(self.me.clone());
        self.pages.lock().push(Arc::clone(&page));
        tracing::debug!(pages = self.page_count(), "page created");
        page
    }

    /// Creates a page from a description.
    pub fn create_page_from(&self, description: &Dico) -> Arc<Page> {
        let page = Page::with_instance(self.me.clone());
        page.read(description);
        self.pages.lock().push(Arc::clone(&page));
        page
    }

    /// Stops DSP on `page`, clears it and drops it. Returns `false` if the
    /// page doesn't belong to this instance.
    pub fn close_page(&self, page: &Arc<Page>) -> bool {
        let removed = {
            let mut pages = self.pages.lock();
            pages
                .iter()
                .position(|other| Arc::ptr_eq(other, page))
                .map(|position| pages.remove(position))
        };
        match removed {
            Some(page) => {
                page.stop_dsp();
                page.clear();
                true
            }
            None => false,
        }
    }

    /// Pages in creation order.
    pub fn pages(&self) -> Vec<Arc<Page>> {
        self.pages.lock().clone()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// The beacon named `name`.
    pub fn beacon(&self, name: &str) -> Arc<Beacon> {
        self.beacons.beacon(name)
    }

    /// The shared beacon namespace.
    pub fn beacons(&self) -> &BeaconFactory {
        &self.beacons
    }

    /// Starts DSP on every page. Returns `true` only if all pages started.
    pub fn start_dsp(&self, sample_rate: u32, block_size: usize) -> bool {
        let mut all = true;
        for page in self.pages() {
            all &= page.start_dsp(sample_rate, block_size);
        }
        all
    }

    /// Runs one block on every running page.
    pub fn tick_dsp(&self) {
        for page in self.pages() {
            page.tick_dsp();
        }
    }

    /// Stops DSP on every page.
    pub fn stop_dsp(&self) {
        for page in self.pages() {
            page.stop_dsp();
        }
    }

    /// Returns `true` if any page is running DSP.
    pub fn is_dsp_running(&self) -> bool {
        self.pages().iter().any(|page| page.is_dsp_running())
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("pages", &self.page_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_belong_to_their_instance() {
        let instance = Instance::new();
        let page = instance.create_page();
        assert_eq!(instance.page_count(), 1);
        assert!(page.instance().is_some_and(|owner| Arc::ptr_eq(&owner, &instance)));
        assert!(Arc::ptr_eq(&page.beacon("bus"), &instance.beacon("bus")));
    }

    #[test]
    fn close_page_forgets_it() {
        let instance = Instance::new();
        let page = instance.create_page();
        assert!(instance.close_page(&page));
        assert!(!instance.close_page(&page));
        assert_eq!(instance.page_count(), 0);
    }

    #[test]
    fn empty_pages_start_dsp() {
        let instance = Instance::new();
        instance.create_page();
        instance.create_page();
        assert!(instance.start_dsp(48_000, 32));
        assert!(instance.is_dsp_running());
        instance.tick_dsp();
        instance.stop_dsp();
        assert!(!instance.is_dsp_running());
    }
}
