use tempfile::TempDir;
use units_core::{check_solution, ConstraintModel, Unit, UnitVector};
use units_solve::{Backend, GjeSolver, SolveError, UnitsSolver};

fn backend() -> Backend {
    Backend::Gje(GjeSolver::in_process())
}

fn velocity() -> Unit {
    Unit::Concrete(UnitVector::base("m").with("s", -1))
}

#[test]
fn length_times_inverse_time_is_velocity() {
    let mut m = ConstraintModel::new();
    let dist = m.new_constant_slot(Unit::base("m"));
    let per_s = m.new_constant_slot(Unit::Concrete(UnitVector::dimensionless().with("s", -1)));
    let speed = m.new_variable_slot("Demo.java:12");
    m.arithmetic_product(dist, per_s, speed);

    let solved = backend().solve(&m).unwrap();
    assert_eq!(solved.solution.get(speed), Some(&velocity()));
    assert!(check_solution(&m, &solved.solution).is_empty());
}

#[test]
fn distance_over_time_flows_through_assignments() {
    let mut m = ConstraintModel::new();
    let dist = m.new_constant_slot(Unit::base("m"));
    let time = m.new_constant_slot(Unit::base("s"));
    let d = m.new_variable_slot("d");
    let t = m.new_variable_slot("t");
    let q = m.new_variable_slot("d / t");
    let speed = m.new_variable_slot("speed");
    m.subtype(dist, d);
    m.subtype(time, t);
    m.arithmetic_quotient(d, t, q);
    m.subtype(q, speed);

    let solved = backend().solve(&m).unwrap();
    assert_eq!(solved.solution.get(speed), Some(&velocity()));
    assert_eq!(solved.solution.get(d), Some(&Unit::base("m")));
}

#[test]
fn constant_round_trips_unchanged() {
    let newton = Unit::Concrete(
        UnitVector::with_prefix(3)
            .with("g", 1)
            .with("m", 1)
            .with("s", -2),
    );
    let mut m = ConstraintModel::new();
    let c = m.new_constant_slot(newton.clone());
    let x = m.new_variable_slot("x");
    m.equal(x, c);

    let solved = backend().solve(&m).unwrap();
    assert_eq!(solved.solution.get(x), Some(&newton));
}

#[test]
fn one_meter_is_not_two() {
    let mut m = ConstraintModel::new();
    let one = m.new_constant_slot(Unit::base("m"));
    let two = m.new_constant_slot(Unit::Concrete(UnitVector::dimensionless().with("m", 2)));
    let x = m.new_variable_slot("x");
    m.equal(x, one);
    m.equal(x, two);

    match backend().solve(&m) {
        Err(SolveError::Unsatisfiable { reasons }) => {
            assert_eq!(reasons, vec!["equations over `m` are inconsistent".to_string()]);
        }
        other => panic!("expected unsat, got {other:?}"),
    }
}

#[test]
fn kilometers_over_meters_keep_the_prefix() {
    let mut m = ConstraintModel::new();
    let km = m.new_constant_slot(Unit::Concrete(UnitVector::with_prefix(3).with("m", 1)));
    let meter = m.new_constant_slot(Unit::base("m"));
    let ratio = m.new_variable_slot("ratio");
    m.arithmetic_quotient(km, meter, ratio);

    let solved = backend().solve(&m).unwrap();
    assert_eq!(
        solved.solution.get(ratio),
        Some(&Unit::Concrete(UnitVector::with_prefix(3)))
    );
}

#[test]
fn null_flows_as_bottom() {
    let mut m = ConstraintModel::new();
    let null = m.new_constant_slot(Unit::Bottom);
    let x = m.new_variable_slot("x");
    m.equal(x, null);

    let solved = backend().solve(&m).unwrap();
    assert_eq!(solved.solution.get(x), Some(&Unit::Bottom));
}

#[test]
fn dump_dir_receives_one_file_per_group() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("dump");
    let mut m = ConstraintModel::new();
    let c = m.new_constant_slot(Unit::base("m"));
    let x = m.new_variable_slot("x");
    m.equal(x, c);

    let solver = GjeSolver::in_process().with_dump_dir(Some(dir.clone()));
    solver.solve(&m).unwrap();

    let text = std::fs::read_to_string(dir.join("gjeConstraints_m.gje")).unwrap();
    assert_eq!(text, "1\n1\n0:1 = 1\n");
    assert!(dir.join("gjeConstraints_Prefix.gje").exists());
}

#[test]
fn square_of_a_free_variable_stays_integral() {
    // t = x * x; r = t * m. Leaving x free at zero would need x = -1/2 in `m`.
    let mut m = ConstraintModel::new();
    let x = m.new_variable_slot("x");
    let t = m.new_variable_slot("t");
    let r = m.new_variable_slot("r");
    let meter = m.new_constant_slot(Unit::base("m"));
    m.arithmetic_product(x, x, t);
    m.arithmetic_product(t, meter, r);

    let solved = backend().solve(&m).unwrap();
    assert!(check_solution(&m, &solved.solution).is_empty());
    for id in [x, t, r] {
        assert!(matches!(solved.solution.get(id), Some(Unit::Concrete(_))));
    }
}

#[test]
fn odd_exponent_of_a_square_is_unsat() {
    // x * x == m has no integral exponent for x.
    let mut m = ConstraintModel::new();
    let x = m.new_variable_slot("x");
    let sq = m.new_variable_slot("x * x");
    let meter = m.new_constant_slot(Unit::base("m"));
    m.arithmetic_product(x, x, sq);
    m.equal(sq, meter);

    match backend().solve(&m) {
        Err(SolveError::Unsatisfiable { reasons }) => {
            assert_eq!(reasons, vec!["equations over `m` are inconsistent".to_string()]);
        }
        other => panic!("expected unsat, got {other:?}"),
    }
}

#[test]
fn join_that_must_be_unknown_is_not_solved_linearly() {
    let mut m = ConstraintModel::new();
    let x = m.new_variable_slot("x");
    let y = m.new_variable_slot("y");
    let sum = m.new_variable_slot("x + y");
    let top = m.new_constant_slot(Unit::Top);
    m.lub(x, y, sum);
    m.equal(sum, top);

    assert!(matches!(
        backend().solve(&m),
        Err(SolveError::Unavailable { .. })
    ));
}
