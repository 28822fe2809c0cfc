//! Utility boxes: `print` and the empty editing box `newbox`.

use parking_lot::Mutex;
use patchbay_core::{
    ElemVector, Element, Inlet, IoType, Object, ObjectBuilder, ObjectKind, format_elements,
};

/// `print`: logs every message it receives, prefixed by its first argument.
pub struct Print {
    prefix: String,
    last: Mutex<Option<ElemVector>>,
}

impl Print {
    /// Prefix written before each message.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The last message printed.
    pub fn last(&self) -> Option<ElemVector> {
        self.last.lock().clone()
    }
}

impl ObjectKind for Print {
    fn receive(&self, object: &Object, _inlet: usize, elements: &[Element]) -> bool {
        tracing::info!(id = object.id(), "{}: {}", self.prefix, format_elements(elements));
        *self.last.lock() = Some(elements.to_vec());
        true
    }
}

pub(crate) fn print(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    let prefix = builder
        .argument(0)
        .map(ToString::to_string)
        .unwrap_or_else(|| "print".to_owned());
    builder.add_inlet(Inlet::new(IoType::Message, "message to print"));
    Box::new(Print {
        prefix,
        last: Mutex::new(None),
    })
}

/// `newbox`: placeholder for a box whose text has not been typed yet.
pub struct NewBox;

impl ObjectKind for NewBox {}

pub(crate) fn newbox(_builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    Box::new(NewBox)
}
