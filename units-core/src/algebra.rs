#![forbid(unsafe_code)]

//! Pure operations over [`Unit`] values.
//!
//! Every operation is total except [`divide`], which rejects an uninhabited divisor.
//! Among concrete units the lattice is flat: a concrete unit is comparable only to
//! itself, `Top` and `Bottom`. A product or quotient whose prefix or exponent
//! does not fit an `i32` is `Top`.

use crate::error::ArithmeticUnitError;
use crate::unit::{Unit, UnitVector};

/// Unit of `a * b`.
pub fn multiply(a: &Unit, b: &Unit) -> Unit {
    match (a, b) {
        // A polymorphic operand is only known once its call site is instantiated.
        (Unit::Top | Unit::Polymorphic, _) | (_, Unit::Top | Unit::Polymorphic) => Unit::Top,
        (Unit::Bottom, _) | (_, Unit::Bottom) => Unit::Bottom,
        (Unit::Concrete(x), Unit::Concrete(y)) => concrete(x.combine(y, false)),
    }
}

fn concrete(v: Option<UnitVector>) -> Unit {
    match v {
        Some(v) => Unit::Concrete(v),
        None => {
            tracing::warn!("unit exponent out of range; treating result as UnknownUnits");
            Unit::Top
        }
    }
}

/// Unit of `a / b`.
pub fn divide(a: &Unit, b: &Unit) -> Result<Unit, ArithmeticUnitError> {
    if b.is_bottom() {
        return Err(ArithmeticUnitError {
            dividend: a.clone(),
            divisor: b.clone(),
        });
    }
    Ok(match (a, b) {
        (Unit::Top | Unit::Polymorphic, _) | (_, Unit::Top | Unit::Polymorphic) => Unit::Top,
        (Unit::Bottom, _) | (_, Unit::Bottom) => Unit::Bottom,
        (Unit::Concrete(x), Unit::Concrete(y)) => concrete(x.combine(y, true)),
    })
}

/// Join used for `+`, `-` and control-flow merges.
///
/// Mismatched concrete units join to `Top` instead of failing; reporting the
/// mismatch is the caller's job.
pub fn least_upper_bound(a: &Unit, b: &Unit) -> Unit {
    match (a, b) {
        (Unit::Top, _) | (_, Unit::Top) => Unit::Top,
        (Unit::Bottom, x) | (x, Unit::Bottom) => x.clone(),
        (x, y) if x == y => x.clone(),
        _ => Unit::Top,
    }
}

/// `sub <: sup`.
///
/// `Polymorphic` is related only to `Top`, `Bottom` and itself. Whether two
/// polymorphic occurrences belong to the same call site is decided by whoever
/// created the slots, not here.
pub fn is_subtype(sub: &Unit, sup: &Unit) -> bool {
    sup.is_top() || sub.is_bottom() || sub == sup
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter() -> Unit {
        Unit::base("m")
    }

    fn second() -> Unit {
        Unit::base("s")
    }

    #[test]
    fn product_of_length_and_inverse_time_is_velocity() {
        let per_second = Unit::Concrete(UnitVector::dimensionless().with("s", -1));
        let velocity = multiply(&meter(), &per_second);
        assert_eq!(
            velocity,
            Unit::Concrete(UnitVector::base("m").with("s", -1))
        );
    }

    #[test]
    fn top_absorbs_before_bottom_in_products() {
        assert_eq!(multiply(&Unit::Top, &Unit::Bottom), Unit::Top);
        assert_eq!(multiply(&Unit::Bottom, &meter()), Unit::Bottom);
        assert_eq!(multiply(&Unit::Polymorphic, &meter()), Unit::Top);
        assert_eq!(multiply(&Unit::Polymorphic, &Unit::Bottom), Unit::Top);
    }

    #[test]
    fn division_by_bottom_is_an_error() {
        let err = divide(&meter(), &Unit::Bottom).unwrap_err();
        assert_eq!(err.divisor, Unit::Bottom);
        assert!(divide(&Unit::Top, &Unit::Bottom).is_err());
        assert_eq!(divide(&Unit::Bottom, &meter()).unwrap(), Unit::Bottom);
    }

    #[test]
    fn prefixed_quotient_keeps_the_prefix_difference() {
        let km = Unit::Concrete(UnitVector::with_prefix(3).with("m", 1));
        let q = divide(&km, &meter()).unwrap();
        assert_eq!(q, Unit::Concrete(UnitVector::with_prefix(3)));
        assert!(q.as_concrete().unwrap().is_dimensionless());

        let cube = Unit::Concrete(UnitVector::dimensionless().with("m", 3));
        assert_eq!(divide(&cube, &cube).unwrap(), Unit::dimensionless());
    }

    #[test]
    fn out_of_range_exponents_are_unknown() {
        let huge = Unit::Concrete(UnitVector::with_prefix(i32::MAX));
        let deca = Unit::Concrete(UnitVector::with_prefix(1));
        assert_eq!(multiply(&huge, &deca), Unit::Top);
        assert_eq!(divide(&deca, &huge).unwrap(), Unit::Concrete(UnitVector::with_prefix(1 - i32::MAX)));

        let tiny = Unit::Concrete(UnitVector::dimensionless().with("s", i32::MIN));
        assert_eq!(divide(&tiny, &Unit::base("s")).unwrap(), Unit::Top);
    }

    #[test]
    fn mismatched_addition_joins_to_top() {
        assert_eq!(least_upper_bound(&meter(), &second()), Unit::Top);
        assert_eq!(least_upper_bound(&Unit::Bottom, &meter()), meter());
        assert_eq!(least_upper_bound(&meter(), &meter()), meter());
        assert_eq!(least_upper_bound(&Unit::Polymorphic, &meter()), Unit::Top);
    }

    #[test]
    fn subtyping_is_flat_among_concrete_units() {
        assert!(is_subtype(&meter(), &Unit::Top));
        assert!(is_subtype(&Unit::Bottom, &meter()));
        assert!(is_subtype(&meter(), &meter()));
        assert!(!is_subtype(&meter(), &second()));
        assert!(!is_subtype(&Unit::Polymorphic, &meter()));
        assert!(is_subtype(&Unit::Polymorphic, &Unit::Polymorphic));
        assert!(!is_subtype(&Unit::Top, &meter()));
    }
}
