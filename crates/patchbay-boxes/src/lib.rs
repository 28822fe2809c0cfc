//! Standard box prototypes for patchbay.
//!
//! Registers the built-in boxes with the global prototype registry of
//! [`patchbay_core`]. Call [`register_standard_boxes`] once at startup,
//! before creating pages; calling it again is harmless.
//!
//! # Boxes
//!
//! | Name | Category | Description |
//! |------|----------|-------------|
//! | `+ - * /` | Math | Message arithmetic, hot left inlet |
//! | `+~ *~` | Signal | Signal arithmetic, optional scalar argument |
//! | `sig~` | Signal | Number to constant signal |
//! | `peak~` | Signal | Absolute peak meter, `bang` reports and resets |
//! | `send` `receive` | Control | Wireless messaging through beacons |
//! | `toggle` | Interface | Two-state switch, saved with the patch |
//! | `print` | Utility | Logs incoming messages |
//! | `newbox` | Utility | Empty box awaiting text |
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{Element, Page};
//! use patchbay_boxes::{Print, register_standard_boxes};
//!
//! register_standard_boxes();
//! let page = Page::new();
//! let add = page.create_box_from_text("+ 10").unwrap();
//! let print = page.create_box_from_text("print result").unwrap();
//! page.connect(&add, 0, &print, 0);
//!
//! add.deliver(0, &[Element::from(5)]);
//! let last = print.kind::<Print>().and_then(Print::last);
//! assert_eq!(last, Some(vec![Element::from(15)]));
//! ```

pub mod beacon_boxes;
pub mod math;
pub mod signal;
pub mod toggle;
pub mod utility;

use std::sync::Once;

use patchbay_core::{BoxCategory, ObjectFactory, PrototypeDescriptor, register_prototype};

pub use beacon_boxes::{Receiver, Sender};
pub use math::{Arithmetic, Operator};
pub use signal::{BinarySignal, PeakMeter, SignalOperator, ToSignal};
pub use toggle::Toggle;
pub use utility::{NewBox, Print};

const fn entry(
    name: &'static str,
    description: &'static str,
    category: BoxCategory,
    factory: ObjectFactory,
) -> (PrototypeDescriptor, ObjectFactory) {
    (
        PrototypeDescriptor {
            name,
            description,
            category,
        },
        factory,
    )
}

/// The built-in prototypes, in listing order.
fn standard_boxes() -> [(PrototypeDescriptor, ObjectFactory); 14] {
    [
        // Math
        entry("+", "Adds two numbers", BoxCategory::Math, math::add),
        entry("-", "Subtracts two numbers", BoxCategory::Math, math::subtract),
        entry("*", "Multiplies two numbers", BoxCategory::Math, math::multiply),
        entry("/", "Divides two numbers", BoxCategory::Math, math::divide),
        // Signal
        entry("+~", "Adds two signals", BoxCategory::Signal, signal::add),
        entry("*~", "Multiplies two signals", BoxCategory::Signal, signal::multiply),
        entry(
            "sig~",
            "Converts a number to a constant signal",
            BoxCategory::Signal,
            signal::to_signal,
        ),
        entry(
            "peak~",
            "Measures the absolute peak of a signal",
            BoxCategory::Signal,
            signal::peak,
        ),
        // Control
        entry(
            "send",
            "Sends messages to a named beacon",
            BoxCategory::Control,
            beacon_boxes::send,
        ),
        entry(
            "receive",
            "Outputs messages sent to a named beacon",
            BoxCategory::Control,
            beacon_boxes::receive,
        ),
        // Interface
        entry(
            "toggle",
            "Two-state switch",
            BoxCategory::Interface,
            toggle::toggle,
        ),
        // Utility
        entry(
            "print",
            "Logs incoming messages",
            BoxCategory::Utility,
            utility::print,
        ),
        entry(
            "newbox",
            "Empty box awaiting text",
            BoxCategory::Utility,
            utility::newbox,
        ),
        entry(
            "p",
            "Alias of print",
            BoxCategory::Utility,
            utility::print,
        ),
    ]
}

/// Registers every standard box.
///
/// Names already taken by an earlier registration keep their prototype.
pub fn register_standard_boxes() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        let mut count = 0usize;
        for (descriptor, factory) in standard_boxes() {
            if register_prototype(descriptor, factory).is_ok() {
                count += 1;
            }
        }
        tracing::debug!(count, "standard boxes registered");
    });
}

/// Names of the standard boxes.
pub fn standard_box_names() -> Vec<&'static str> {
    standard_boxes()
        .iter()
        .map(|(descriptor, _)| descriptor.name)
        .collect()
}
