//! `toggle`: a two-state switch.
//!
//! `bang` flips the state, a number sets it (non-zero is on). Either way the
//! new state is output as `0` or `1`. The state is saved with the patch under
//! `value`.

use std::sync::atomic::{AtomicBool, Ordering};

use patchbay_core::{Dico, Element, Inlet, IoType, Object, ObjectBuilder, ObjectKind, Outlet};

const VALUE: &str = "value";

/// State of a `toggle` box.
pub struct Toggle {
    on: AtomicBool,
}

impl Toggle {
    /// Returns `true` if the toggle is on.
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }
}

impl ObjectKind for Toggle {
    fn receive(&self, object: &Object, _inlet: usize, elements: &[Element]) -> bool {
        let Some(first) = elements.first() else {
            return false;
        };
        let on = if first.is_tag_named("bang") {
            !self.on.fetch_xor(true, Ordering::AcqRel)
        } else if let Some(value) = first.as_double() {
            let on = value != 0.0;
            self.on.store(on, Ordering::Release);
            on
        } else {
            return false;
        };
        object.send(0, &[Element::from(on)]);
        true
    }

    fn save(&self, dico: &mut Dico) {
        dico.set_one(VALUE, self.is_on());
    }
}

pub(crate) fn toggle(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    let on = builder
        .description()
        .get_one(VALUE)
        .and_then(Element::as_double)
        .is_some_and(|value| value != 0.0);
    builder
        .add_inlet(Inlet::new(IoType::Message, "bang flips, number sets"))
        .add_outlet(Outlet::new(IoType::Message, "state"));
    Box::new(Toggle {
        on: AtomicBool::new(on),
    })
}
