//! Signal boxes: `+~`, `*~`, `sig~` and `peak~`.

use parking_lot::Mutex;
use patchbay_core::{
    DspInfo, Element, Inlet, IoType, Object, ObjectBuilder, ObjectKind, Outlet, Process, Sample,
};

/// Operator of a binary signal box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOperator {
    /// `+~`
    Add,
    /// `*~`
    Multiply,
}

impl SignalOperator {
    #[inline]
    fn apply(self, left: Sample, right: Sample) -> Sample {
        match self {
            Self::Add => left + right,
            Self::Multiply => left * right,
        }
    }
}

/// `+~` / `*~`.
///
/// Without an argument both inlets carry signal. With an argument the right
/// inlet takes numbers instead and the argument is the initial scalar.
pub struct BinarySignal {
    operator: SignalOperator,
    scalar: Option<Mutex<Sample>>,
}

impl BinarySignal {
    /// The scalar right operand, if the box was created with one.
    pub fn scalar(&self) -> Option<Sample> {
        self.scalar.as_ref().map(|scalar| *scalar.lock())
    }
}

impl Process for BinarySignal {
    fn perform(&self, inputs: &[Vec<Sample>], outputs: &mut [Vec<Sample>]) {
        let (Some(left), Some(output)) = (inputs.first(), outputs.first_mut()) else {
            return;
        };
        match (&self.scalar, inputs.get(1)) {
            (Some(scalar), _) => {
                let right = *scalar.lock();
                for (out, l) in output.iter_mut().zip(left) {
                    *out = self.operator.apply(*l, right);
                }
            }
            (None, Some(right)) => {
                for ((out, l), r) in output.iter_mut().zip(left).zip(right) {
                    *out = self.operator.apply(*l, *r);
                }
            }
            (None, None) => output.copy_from_slice(left),
        }
    }
}

impl ObjectKind for BinarySignal {
    fn receive(&self, _object: &Object, inlet: usize, elements: &[Element]) -> bool {
        match (&self.scalar, inlet, elements.first().and_then(Element::as_double)) {
            (Some(scalar), 1, Some(value)) => {
                *scalar.lock() = value as Sample;
                true
            }
            _ => false,
        }
    }

    fn process(&self) -> Option<&dyn Process> {
        Some(self)
    }
}

fn binary(builder: &mut ObjectBuilder<'_>, operator: SignalOperator) -> Box<dyn ObjectKind> {
    let scalar = builder.argument(0).and_then(Element::as_double);
    builder.add_inlet(Inlet::new(IoType::Signal, "left signal"));
    match scalar {
        Some(_) => builder.add_inlet(Inlet::new(IoType::Message, "right operand")),
        None => builder.add_inlet(Inlet::new(IoType::Signal, "right signal")),
    };
    builder.add_outlet(Outlet::new(IoType::Signal, "result signal"));
    Box::new(BinarySignal {
        operator,
        scalar: scalar.map(|value| Mutex::new(value as Sample)),
    })
}

pub(crate) fn add(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    binary(builder, SignalOperator::Add)
}

pub(crate) fn multiply(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    binary(builder, SignalOperator::Multiply)
}

/// `sig~`: converts a number into a constant signal.
pub struct ToSignal {
    value: Mutex<Sample>,
}

impl ToSignal {
    /// The current output value.
    pub fn value(&self) -> Sample {
        *self.value.lock()
    }
}

impl Process for ToSignal {
    fn perform(&self, _inputs: &[Vec<Sample>], outputs: &mut [Vec<Sample>]) {
        let value = *self.value.lock();
        if let Some(output) = outputs.first_mut() {
            output.fill(value);
        }
    }
}

impl ObjectKind for ToSignal {
    fn receive(&self, _object: &Object, _inlet: usize, elements: &[Element]) -> bool {
        match elements.first().and_then(Element::as_double) {
            Some(value) => {
                *self.value.lock() = value as Sample;
                true
            }
            None => false,
        }
    }

    fn process(&self) -> Option<&dyn Process> {
        Some(self)
    }
}

pub(crate) fn to_signal(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    let value = builder
        .argument(0)
        .and_then(Element::as_double)
        .unwrap_or(0.0);
    builder
        .add_inlet(Inlet::new(IoType::Message, "value"))
        .add_outlet(Outlet::new(IoType::Signal, "constant signal"));
    Box::new(ToSignal {
        value: Mutex::new(value as Sample),
    })
}

/// `peak~`: tracks the absolute peak of its input.
///
/// `bang` on the inlet outputs the peak seen since the last `bang` and
/// resets it.
#[derive(Default)]
pub struct PeakMeter {
    peak: Mutex<Sample>,
    blocks: Mutex<u64>,
}

impl PeakMeter {
    /// Peak since the last reset.
    pub fn peak(&self) -> Sample {
        *self.peak.lock()
    }

    /// Number of blocks measured since DSP started.
    pub fn blocks(&self) -> u64 {
        *self.blocks.lock()
    }
}

impl Process for PeakMeter {
    fn prepare(&self, _info: &DspInfo) {
        *self.peak.lock() = 0.0;
        *self.blocks.lock() = 0;
    }

    fn perform(&self, inputs: &[Vec<Sample>], _outputs: &mut [Vec<Sample>]) {
        let block_peak = inputs
            .first()
            .map_or(0.0, |input| input.iter().fold(0.0, |peak: Sample, s| peak.max(s.abs())));
        let mut peak = self.peak.lock();
        *peak = peak.max(block_peak);
        *self.blocks.lock() += 1;
    }
}

impl ObjectKind for PeakMeter {
    fn receive(&self, object: &Object, _inlet: usize, elements: &[Element]) -> bool {
        if !elements.first().is_some_and(|first| first.is_tag_named("bang")) {
            return false;
        }
        let peak = std::mem::take(&mut *self.peak.lock());
        object.send(0, &[Element::from(peak)]);
        true
    }

    fn process(&self) -> Option<&dyn Process> {
        Some(self)
    }
}

pub(crate) fn peak(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    builder
        .add_inlet(Inlet::new(IoType::Both, "signal to measure, bang to report"))
        .add_outlet(Outlet::new(IoType::Message, "peak"));
    Box::new(PeakMeter::default())
}
