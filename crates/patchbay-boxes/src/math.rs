//! Message arithmetic: `+`, `-`, `*` and `/`.
//!
//! The left inlet is hot: a number stores the left operand and outputs the
//! result, `bang` outputs the last result again. The right inlet is cold and
//! only stores the right operand, whose initial value is the first creation
//! argument. Two longs give a long (except for `/`); anything else a double.
//! Division by zero outputs zero.

use parking_lot::Mutex;
use patchbay_core::{
    Element, Inlet, IoType, Object, ObjectBuilder, ObjectKind, Outlet, Polarity,
};

/// Binary operator of an arithmetic box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
}

impl Operator {
    /// Applies the operator.
    pub fn apply(self, left: &Element, right: &Element) -> Element {
        if let (Element::Long(l), Element::Long(r)) = (left, right) {
            match self {
                Self::Add => return Element::Long(l.wrapping_add(*r)),
                Self::Subtract => return Element::Long(l.wrapping_sub(*r)),
                Self::Multiply => return Element::Long(l.wrapping_mul(*r)),
                Self::Divide => {}
            }
        }
        let l = left.as_double().unwrap_or(0.0);
        let r = right.as_double().unwrap_or(0.0);
        Element::Double(match self {
            Self::Add => l + r,
            Self::Subtract => l - r,
            Self::Multiply => l * r,
            Self::Divide if r == 0.0 => 0.0,
            Self::Divide => l / r,
        })
    }
}

struct Operands {
    left: Element,
    right: Element,
}

/// State of an arithmetic box.
pub struct Arithmetic {
    operator: Operator,
    operands: Mutex<Operands>,
}

impl Arithmetic {
    /// Result for the current operands.
    pub fn result(&self) -> Element {
        let operands = self.operands.lock();
        self.operator.apply(&operands.left, &operands.right)
    }

    /// The operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }
}

impl ObjectKind for Arithmetic {
    fn receive(&self, object: &Object, inlet: usize, elements: &[Element]) -> bool {
        let Some(first) = elements.first() else {
            return false;
        };
        match inlet {
            0 if first.is_number() => {
                self.operands.lock().left = first.clone();
                object.send(0, &[self.result()]);
                true
            }
            0 if first.is_tag_named("bang") => {
                object.send(0, &[self.result()]);
                true
            }
            1 if first.is_number() => {
                self.operands.lock().right = first.clone();
                true
            }
            _ => false,
        }
    }
}

fn build(builder: &mut ObjectBuilder<'_>, operator: Operator) -> Box<dyn ObjectKind> {
    let neutral = match operator {
        Operator::Multiply | Operator::Divide => Element::Long(1),
        Operator::Add | Operator::Subtract => Element::Long(0),
    };
    let right = builder
        .argument(0)
        .filter(|argument| argument.is_number())
        .cloned()
        .unwrap_or(neutral);
    builder
        .add_inlet(Inlet::new(IoType::Message, "left operand, outputs the result"))
        .add_inlet(Inlet::with_polarity(
            IoType::Message,
            Polarity::Cold,
            "right operand",
        ))
        .add_outlet(Outlet::new(IoType::Message, "result"));
    Box::new(Arithmetic {
        operator,
        operands: Mutex::new(Operands {
            left: Element::Long(0),
            right,
        }),
    })
}

pub(crate) fn add(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    build(builder, Operator::Add)
}

pub(crate) fn subtract(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    build(builder, Operator::Subtract)
}

pub(crate) fn multiply(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    build(builder, Operator::Multiply)
}

pub(crate) fn divide(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    build(builder, Operator::Divide)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longs_stay_longs_except_for_division() {
        let (a, b) = (Element::Long(7), Element::Long(2));
        assert_eq!(Operator::Add.apply(&a, &b), Element::Long(9));
        assert_eq!(Operator::Subtract.apply(&a, &b), Element::Long(5));
        assert_eq!(Operator::Multiply.apply(&a, &b), Element::Long(14));
        assert_eq!(Operator::Divide.apply(&a, &b), Element::Double(3.5));
    }

    #[test]
    fn doubles_promote() {
        let result = Operator::Add.apply(&Element::Long(1), &Element::Double(0.5));
        assert_eq!(result, Element::Double(1.5));
    }

    #[test]
    fn division_by_zero_is_zero() {
        let result = Operator::Divide.apply(&Element::Long(1), &Element::Long(0));
        assert_eq!(result, Element::Double(0.0));
    }
}
