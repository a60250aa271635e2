use proptest::{
    prelude::{prop, Just, Strategy},
    prop_oneof,
    test_runner::{Config, TestCaseError, TestRunner},
};
use units_core::{
    divide, is_subtype, least_upper_bound, multiply, Unit, UnitVector,
};

const DIMS: [&str; 4] = ["m", "s", "g", "K"];

fn vector() -> impl Strategy<Value = UnitVector> {
    (-9i32..=9, prop::collection::vec(-3i32..=3, DIMS.len())).prop_map(|(prefix, exps)| {
        DIMS.iter()
            .zip(exps)
            .fold(UnitVector::with_prefix(prefix), |v, (d, e)| v.with(*d, e))
    })
}

fn concrete() -> impl Strategy<Value = Unit> {
    vector().prop_map(Unit::Concrete)
}

fn any_unit() -> impl Strategy<Value = Unit> {
    prop_oneof![
        Just(Unit::Top),
        Just(Unit::Bottom),
        Just(Unit::Polymorphic),
        concrete(),
        concrete(),
    ]
}

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 256,
        ..Config::default()
    })
}

fn check(cond: bool, what: String) -> Result<(), TestCaseError> {
    if cond { Ok(()) } else { Err(TestCaseError::fail(what)) }
}

#[test]
fn concrete_products_and_quotients_stay_concrete() {
    runner()
        .run(&(concrete(), concrete()), |(a, b)| {
            check(
                matches!(multiply(&a, &b), Unit::Concrete(_)),
                format!("{a} * {b}"),
            )?;
            let q = divide(&a, &b).map_err(|e| TestCaseError::fail(e.to_string()))?;
            check(matches!(q, Unit::Concrete(_)), format!("{a} / {b}"))
        })
        .unwrap();
}

#[test]
fn multiply_is_commutative_and_associative() {
    runner()
        .run(&(any_unit(), any_unit(), any_unit()), |(a, b, c)| {
            check(multiply(&a, &b) == multiply(&b, &a), format!("{a} * {b}"))?;
            let left = multiply(&multiply(&a, &b), &c);
            let right = multiply(&a, &multiply(&b, &c));
            check(left == right, format!("({a} * {b}) * {c}"))
        })
        .unwrap();
}

#[test]
fn dividing_out_a_factor_restores_the_unit() {
    runner()
        .run(&(concrete(), concrete()), |(a, b)| {
            let back = divide(&multiply(&a, &b), &b)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            check(back == a, format!("({a} * {b}) / {b} = {back}"))
        })
        .unwrap();
}

#[test]
fn top_and_bottom_bound_every_unit() {
    runner()
        .run(&any_unit(), |x| {
            check(is_subtype(&x, &Unit::Top), format!("{x} <: Top"))?;
            check(is_subtype(&Unit::Bottom, &x), format!("Bottom <: {x}"))?;
            check(least_upper_bound(&x, &x) == x, format!("lub({x}, {x})"))
        })
        .unwrap();
}

#[test]
fn distinct_concrete_units_are_incomparable() {
    runner()
        .run(&(concrete(), concrete()), |(a, b)| {
            if a == b {
                return Ok(());
            }
            check(!is_subtype(&a, &b), format!("{a} <: {b}"))?;
            check(
                least_upper_bound(&a, &b) == Unit::Top,
                format!("lub({a}, {b})"),
            )
        })
        .unwrap();
}
