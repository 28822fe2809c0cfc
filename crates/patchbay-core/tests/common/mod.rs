//! Small object kinds shared by the integration and property tests.
//!
//! Every prototype is registered once under a `t.` prefix; message kinds
//! record what they receive, signal kinds implement [`Process`] with trivial
//! arithmetic.

#![allow(dead_code)]

use std::sync::Once;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use patchbay_core::{
    BoxCategory, Dico, ElemVector, Element, Inlet, IoType, Object, ObjectBuilder, ObjectKind,
    Outlet, Page, Process, PrototypeDescriptor, Sample, keys, register_prototype,
};

/// Global delivery counter, used to check ordering across receivers.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Records every message it handles. Declines messages starting with a tag,
/// which then fall through to the attribute manager.
#[derive(Default)]
pub struct Sink {
    pub received: Mutex<Vec<(usize, ElemVector)>>,
    pub sequence: Mutex<Vec<u64>>,
}

impl ObjectKind for Sink {
    fn receive(&self, _object: &Object, inlet: usize, elements: &[Element]) -> bool {
        if elements.first().is_some_and(Element::is_tag) {
            return false;
        }
        self.received.lock().push((inlet, elements.to_vec()));
        self.sequence
            .lock()
            .push(SEQUENCE.fetch_add(1, Ordering::SeqCst));
        true
    }
}

/// Counts deliveries and forwards everything to outlet 0.
#[derive(Default)]
pub struct Bouncer {
    pub count: AtomicUsize,
}

impl ObjectKind for Bouncer {
    fn receive(&self, object: &Object, _inlet: usize, elements: &[Element]) -> bool {
        self.count.fetch_add(1, Ordering::SeqCst);
        object.send(0, elements);
        true
    }
}

/// Constant signal source.
pub struct Constant {
    pub value: Sample,
}

impl Process for Constant {
    fn perform(&self, _inputs: &[Vec<Sample>], outputs: &mut [Vec<Sample>]) {
        outputs[0].fill(self.value);
    }
}

impl ObjectKind for Constant {
    fn process(&self) -> Option<&dyn Process> {
        Some(self)
    }
}

/// Sums every signal input into its single output.
#[derive(Default)]
pub struct Mix {
    pub prepared: AtomicUsize,
    pub released: AtomicUsize,
}

impl Process for Mix {
    fn prepare(&self, _info: &patchbay_core::DspInfo) {
        self.prepared.fetch_add(1, Ordering::SeqCst);
    }

    fn perform(&self, inputs: &[Vec<Sample>], outputs: &mut [Vec<Sample>]) {
        for (index, sample) in outputs[0].iter_mut().enumerate() {
            *sample = inputs.iter().map(|input| input[index]).sum();
        }
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl ObjectKind for Mix {
    fn process(&self) -> Option<&dyn Process> {
        Some(self)
    }
}

/// Keeps the first sample of the last block it saw.
#[derive(Default)]
pub struct Probe {
    pub last: Mutex<Sample>,
}

impl Process for Probe {
    fn perform(&self, inputs: &[Vec<Sample>], _outputs: &mut [Vec<Sample>]) {
        *self.last.lock() = inputs[0][0];
    }
}

impl ObjectKind for Probe {
    fn process(&self) -> Option<&dyn Process> {
        Some(self)
    }
}

fn descriptor(name: &'static str) -> PrototypeDescriptor {
    PrototypeDescriptor {
        name,
        description: "test kind",
        category: BoxCategory::Utility,
    }
}

fn source(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    builder.add_outlet(Outlet::new(IoType::Message, "output"));
    Box::new(Sink::default())
}

fn pass(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    builder
        .add_inlet(Inlet::new(IoType::Message, "input"))
        .add_outlet(Outlet::new(IoType::Message, "output"));
    Box::new(Sink::default())
}

fn sink(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    builder.add_inlet(Inlet::new(IoType::Message, "input"));
    Box::new(Sink::default())
}

fn bouncer(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    builder
        .add_inlet(Inlet::new(IoType::Message, "input"))
        .add_outlet(Outlet::new(IoType::Message, "output"));
    Box::new(Bouncer::default())
}

fn constant(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    builder.add_outlet(Outlet::new(IoType::Signal, "signal"));
    let value = builder
        .argument(0)
        .and_then(Element::as_double)
        .unwrap_or(0.0) as Sample;
    Box::new(Constant { value })
}

fn mix(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    builder
        .add_inlet(Inlet::new(IoType::Message, "control"))
        .add_inlet(Inlet::new(IoType::Signal, "left"))
        .add_inlet(Inlet::new(IoType::Signal, "right"))
        .add_outlet(Outlet::new(IoType::Signal, "sum"));
    Box::new(Mix::default())
}

fn probe(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    builder.add_inlet(Inlet::new(IoType::Signal, "signal"));
    Box::new(Probe::default())
}

/// Registers every test prototype once.
pub fn setup() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let kinds: [(&'static str, patchbay_core::ObjectFactory); 7] = [
            ("t.source", source),
            ("t.pass", pass),
            ("t.sink", sink),
            ("t.bouncer", bouncer),
            ("t.const~", constant),
            ("t.mix~", mix),
            ("t.probe~", probe),
        ];
        for (name, factory) in kinds {
            register_prototype(descriptor(name), factory).expect("test prototypes register once");
        }
    });
}

/// Creates a box from inline text, panicking if it cannot be created.
pub fn create(page: &Page, text: &str) -> std::sync::Arc<Object> {
    page.create_box_from_text(text)
        .unwrap_or_else(|| panic!("cannot create '{text}'"))
}

/// Builds `{"name": name}` with an explicit id.
pub fn named_with_id(name: &str, id: u64) -> Dico {
    let mut dico = Dico::new();
    dico.set_one(keys::NAME, name);
    dico.set_one(keys::ID, id);
    dico
}

/// Messages recorded by a [`Sink`]-backed box.
pub fn received(object: &Object) -> Vec<(usize, ElemVector)> {
    object
        .kind::<Sink>()
        .map(|sink| sink.received.lock().clone())
        .unwrap_or_default()
}

/// Delivery sequence numbers recorded by a [`Sink`]-backed box.
pub fn sequence(object: &Object) -> Vec<u64> {
    object
        .kind::<Sink>()
        .map(|sink| sink.sequence.lock().clone())
        .unwrap_or_default()
}
