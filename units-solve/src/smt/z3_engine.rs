#![forbid(unsafe_code)]

use z3::{
    ast::{Ast, Bool, Int},
    Config, Context, Optimize, Params, SatResult, Solver,
};

use super::engine::{EngineOutcome, SmtEngine};
use super::formula::{Formula, SmtProblem, Sort, Term};
use crate::solver::SolveError;

/// Engine backed by a real Z3.
///
/// Satisfiable problems are solved with `Optimize` so the soft preferences are
/// honoured. When that reports unsat, the hard assertions are re-checked on a
/// plain solver with one tracking literal per label to extract a core.
#[derive(Default)]
pub struct Z3Engine;

impl Z3Engine {
    pub fn new() -> Self {
        Self
    }
}

fn params<'ctx>(ctx: &'ctx Context, timeout_ms: Option<u32>) -> Params<'ctx> {
    let mut params = Params::new(ctx);
    if let Some(ms) = timeout_ms {
        params.set_u32("timeout", ms);
    }
    // Deterministic models across runs.
    params.set_u32("smt.random_seed", 0);
    params.set_u32("sat.random_seed", 0);
    params
}

fn term<'ctx>(ctx: &'ctx Context, t: &Term) -> Int<'ctx> {
    match t {
        Term::Var(name) => Int::new_const(ctx, name.as_str()),
        Term::Lit(n) => Int::from_i64(ctx, *n),
        Term::Add(a, b) => Int::add(ctx, &[&term(ctx, a), &term(ctx, b)]),
        Term::Sub(a, b) => Int::sub(ctx, &[&term(ctx, a), &term(ctx, b)]),
    }
}

fn formula<'ctx>(ctx: &'ctx Context, f: &Formula) -> Bool<'ctx> {
    match f {
        Formula::True => Bool::from_bool(ctx, true),
        Formula::False => Bool::from_bool(ctx, false),
        Formula::Var(name) => Bool::new_const(ctx, name.as_str()),
        Formula::Not(inner) => formula(ctx, inner).not(),
        Formula::And(fs) => {
            let parts: Vec<Bool<'ctx>> = fs.iter().map(|x| formula(ctx, x)).collect();
            Bool::and(ctx, &parts.iter().collect::<Vec<_>>())
        }
        Formula::Or(fs) => {
            let parts: Vec<Bool<'ctx>> = fs.iter().map(|x| formula(ctx, x)).collect();
            Bool::or(ctx, &parts.iter().collect::<Vec<_>>())
        }
        Formula::Implies(a, b) => formula(ctx, a).implies(&formula(ctx, b)),
        Formula::Iff(a, b) => formula(ctx, a)._eq(&formula(ctx, b)),
        Formula::IntEq(a, b) => term(ctx, a)._eq(&term(ctx, b)),
    }
}

fn render_model<'ctx>(ctx: &'ctx Context, problem: &SmtProblem, model: &z3::Model<'ctx>) -> String {
    let mut out = String::new();
    for (name, sort) in problem.declarations() {
        let value = match sort {
            Sort::Bool => model
                .eval(&Bool::new_const(ctx, name.as_str()), true)
                .and_then(|v| v.as_bool())
                .map(|b| b.to_string()),
            Sort::Int => model
                .eval(&Int::new_const(ctx, name.as_str()), true)
                .and_then(|v| v.as_i64())
                .map(|n| n.to_string()),
        };
        if let Some(value) = value {
            out.push_str(&format!("{name} {value}\n"));
        }
    }
    out
}

fn unsat_core<'ctx>(ctx: &'ctx Context, problem: &SmtProblem, timeout_ms: Option<u32>) -> Vec<String> {
    let solver = Solver::new(ctx);
    solver.set_params(&params(ctx, timeout_ms));

    let mut tracks = Vec::new();
    for a in problem.hard() {
        let track = Bool::new_const(ctx, a.label.as_str());
        solver.assert(&track.implies(&formula(ctx, &a.formula)));
        tracks.push(track);
    }

    match solver.check_assumptions(&tracks) {
        SatResult::Unsat => solver
            .get_unsat_core()
            .into_iter()
            .map(|b| b.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

impl SmtEngine for Z3Engine {
    fn name(&self) -> &'static str {
        "z3"
    }

    fn check(
        &self,
        problem: &SmtProblem,
        timeout_ms: Option<u32>,
    ) -> Result<EngineOutcome, SolveError> {
        let mut cfg = Config::new();
        cfg.set_model_generation(true);
        let ctx = Context::new(&cfg);

        let opt = Optimize::new(&ctx);
        opt.set_params(&params(&ctx, timeout_ms));
        for a in problem.hard() {
            opt.assert(&formula(&ctx, &a.formula));
        }
        for (f, weight) in problem.soft() {
            opt.assert_soft(&formula(&ctx, f), *weight, None);
        }

        Ok(match opt.check(&[]) {
            SatResult::Sat => {
                let model = opt
                    .get_model()
                    .ok_or_else(|| SolveError::malformed("z3 reported sat without a model"))?;
                EngineOutcome::Sat {
                    model: render_model(&ctx, problem, &model),
                }
            }
            SatResult::Unsat => EngineOutcome::Unsat {
                core: unsat_core(&ctx, problem, timeout_ms),
            },
            SatResult::Unknown => EngineOutcome::Unknown {
                reason: "z3 returned unknown".to_string(),
            },
        })
    }
}
