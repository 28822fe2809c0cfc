//! Patchbay Core - object graph and dataflow engine
//!
//! This crate provides the engine of a visual dataflow patcher: boxes placed
//! on a page, connected by links that carry control messages and audio
//! signal.
//!
//! # Core Abstractions
//!
//! ## Values
//!
//! - [`Tag`] - Interned string, compared by pointer
//! - [`Element`] / [`ElemVector`] - Message atoms and payloads
//! - [`Dico`] - Nested key/value description, JSON on disk
//!
//! ## Attributes
//!
//! - [`Attribute`] - Named, typed value with behavior flags and a frozen snapshot
//! - [`AttributeManager`] - Mutex-guarded attribute map with listeners
//!
//! ## Graph
//!
//! - [`Object`] - A box: sockets, attributes and a kind-specific [`ObjectKind`]
//! - [`register_prototype`] - Name-to-factory registry used for box creation
//! - [`Link`] - Transactional edge between an outlet and an inlet
//! - [`Page`] - The patcher: box and link collections, id allocation,
//!   persistence and DSP control
//! - [`Instance`] - Pages plus a shared [`Beacon`] namespace
//!
//! ## DSP
//!
//! - [`Process`] - Signal capability of an object kind
//! - [`DspContext`] - Topologically compiled, allocation-free block schedule
//!
//! # Example
//!
//! ```rust,ignore
//! use patchbay_core::{Dico, Page};
//!
//! // Boxes come from a prototype set such as `patchbay-boxes`.
//! patchbay_boxes::register_standard_boxes();
//! let page = Page::new();
//! let a = page.create_box_from_text("+ 1").unwrap();
//! let b = page.create_box_from_text("print").unwrap();
//! page.connect(&a, 0, &b, 0);
//!
//! a.receive(0, &[2.into()]); // prints 3
//!
//! let mut saved = Dico::new();
//! page.write(&mut saved);
//! let copy = Page::create(&saved);
//! ```

pub mod attribute;
pub mod beacon;
pub mod dico;
pub mod dsp;
pub mod element;
pub mod error;
pub mod instance;
pub mod link;
pub mod object;
pub mod page;
pub mod prototype;
pub mod socket;
pub mod tag;

pub use attribute::{
    AttrKind, Attribute, AttributeEvent, AttributeListener, AttributeManager, Behavior,
};
pub use beacon::{Beacon, BeaconFactory};
pub use dico::{Dico, keys};
pub use dsp::{DspContext, DspInfo, DspStep, Process, Sample};
pub use element::{ElemVector, Element, format_elements};
pub use error::{DicoError, DspError, PrototypeError};
pub use instance::Instance;
pub use link::{Link, LinkState};
pub use object::{Object, ObjectBuilder, ObjectKind, STACK_CEILING};
pub use page::{Page, PageListener};
pub use prototype::{
    BoxCategory, ObjectFactory, PrototypeDescriptor, has_prototype, prototype, prototypes,
    prototypes_in_category, register_prototype,
};
pub use socket::{Connection, Inlet, IoType, Outlet, Polarity};
pub use tag::Tag;
