//! Property-based tests for the compiler and the optimizer.
//!
//! Random programs must compile to circuits that reproduce direct
//! evaluation and leave every scratch qubit at 0. Random classical circuits
//! must never grow under optimization and must keep their function.

use proptest::prelude::*;
use revq_compile::{optimize, CompileOptions, ExpressionCompiler};
use revq_ir::{AppliedGate, ArgGroup, Assignment, Circuit, Expression, Program, QubitId, Symbol};
use rustc_hash::FxHashMap;

const INPUTS: [&str; 3] = ["a", "b", "c"];
const PLACEHOLDERS: usize = 8;

/// Expressions whose leaves are placeholders `#0 .. #7` or constants.
fn expr_strategy() -> impl Strategy<Value = Expression> {
    let leaf = prop_oneof![
        1 => any::<bool>().prop_map(Expression::Const),
        4 => (0..PLACEHOLDERS).prop_map(|i| Expression::symbol(format!("#{i}"))),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Expression::not),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Expression::And),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expression::or(l, r)),
            prop::collection::vec(inner, 1..4).prop_map(Expression::Xor),
        ]
    })
}

/// Expressions built from a small pool of shared sub-expressions, so the
/// same compound node shows up in several places, also wrapped in
/// single-operand and repeated-operand `And`/`Or`.
fn shared_expr_strategy() -> impl Strategy<Value = Expression> {
    let p = |i: usize| Expression::symbol(format!("#{i}"));
    let pool = vec![
        Expression::and([p(0), p(1)]),
        Expression::or(p(0), p(2)),
        Expression::not(p(1)),
        Expression::xor([p(1), p(2)]),
        Expression::and([p(0), Expression::not(p(2))]),
    ];
    let leaf = prop_oneof![
        1 => (0..3usize).prop_map(move |i| Expression::symbol(format!("#{i}"))),
        3 => prop::sample::select(pool),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Expression::not),
            inner.clone().prop_map(|e| Expression::And(vec![e])),
            inner.clone().prop_map(|e| Expression::And(vec![e.clone(), e])),
            inner.clone().prop_map(|e| Expression::or(e.clone(), e)),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Expression::And),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expression::or(l, r)),
            prop::collection::vec(inner, 1..4).prop_map(Expression::Xor),
        ]
    })
}

/// Bind placeholders to the inputs and to earlier temporaries.
fn program_strategy() -> impl Strategy<Value = Program> {
    program_from(expr_strategy())
}

fn program_from(exprs: impl Strategy<Value = Expression>) -> impl Strategy<Value = Program> {
    (prop::collection::vec(exprs, 1..4), 1..3usize).prop_map(|(exprs, num_outputs)| {
        let mut program = Program::new("random");
        for name in INPUTS {
            program = program.with_input(ArgGroup::bit(name));
        }

        let mut pool: Vec<Symbol> = INPUTS.iter().map(|n| Symbol::from(*n)).collect();
        for (i, expr) in exprs.iter().enumerate() {
            let bindings: FxHashMap<Symbol, Expression> = (0..PLACEHOLDERS)
                .map(|p| {
                    (
                        Symbol::new(format!("#{p}")),
                        Expression::Ref(pool[p % pool.len()].clone()),
                    )
                })
                .collect();
            let target = Symbol::new(format!("t{i}"));
            program
                .assignments
                .push(Assignment::new(target.clone(), expr.substitute(&bindings)));
            pool.push(target);
        }

        let first_output = exprs.len().saturating_sub(num_outputs);
        for i in first_output..exprs.len() {
            program = program.with_output(format!("t{i}"));
        }
        program
    })
}

/// Random gates from the classical basis on four qubits.
fn circuit_strategy() -> impl Strategy<Value = Circuit> {
    let gate = prop_oneof![
        (0..4u32).prop_map(|t| AppliedGate::x(QubitId(t))),
        (0..4u32, 1..4u32).prop_map(|(c, d)| AppliedGate::cx(QubitId(c), QubitId((c + d) % 4))),
        (0..4u32, 1..3u32).prop_map(|(c0, d)| {
            let c1 = (c0 + d) % 4;
            AppliedGate::ccx(QubitId(c0), QubitId(c1), QubitId((c1 + 1) % 4))
        }),
    ];
    prop::collection::vec(gate, 0..14).prop_map(|gates| {
        let base = Circuit::with_size("random", 4);
        base.with_gates(gates).unwrap()
    })
}

fn rows(k: usize) -> impl Iterator<Item = Vec<bool>> {
    (0..1_usize << k).map(move |row| (0..k).map(|i| (row >> (k - 1 - i)) & 1 == 1).collect())
}

fn check_program(program: &Program, options: CompileOptions) -> Result<(), TestCaseError> {
    let circuit = ExpressionCompiler::new(options).compile(program).unwrap();
    let outputs: Vec<QubitId> = program
        .outputs
        .iter()
        .map(|o| circuit.qubit(o.as_str()).unwrap())
        .collect();

    for bits in rows(INPUTS.len()) {
        let expected = program.evaluate(&bits).unwrap();
        let state = circuit.simulate(&bits).unwrap();
        let actual: Vec<bool> = outputs.iter().map(|q| state[q.index()]).collect();
        prop_assert_eq!(actual, expected);

        prop_assert_eq!(&state[..INPUTS.len()], bits.as_slice());
        for (idx, bit) in state.iter().enumerate().skip(INPUTS.len()) {
            if !outputs.contains(&QubitId::from(idx)) {
                prop_assert!(!bit, "qubit {} dirty", idx);
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn compiled_program_matches_evaluation(program in program_strategy()) {
        check_program(&program, CompileOptions::default())?;
    }

    #[test]
    fn compiled_program_without_memo_matches_evaluation(program in program_strategy()) {
        check_program(&program, CompileOptions::default().with_memoize(false))?;
    }

    #[test]
    fn shared_subexpressions_match_evaluation(program in program_from(shared_expr_strategy())) {
        check_program(&program, CompileOptions::default())?;
        check_program(&program, CompileOptions::default().with_memoize(false))?;
    }

    #[test]
    fn optimizer_is_monotone_and_equivalent(
        circuit in circuit_strategy(),
        mask in 0..16u32,
    ) {
        let preserve: Vec<QubitId> = (0..4u32).filter(|q| mask & (1 << q) != 0).map(QubitId).collect();
        let optimized = optimize(&circuit, Some(&preserve)).unwrap();
        prop_assert!(optimized.num_gates() <= circuit.num_gates());

        for bits in rows(preserve.len()) {
            let assignment: Vec<(QubitId, bool)> =
                preserve.iter().copied().zip(bits.iter().copied()).collect();
            prop_assert_eq!(
                optimized.simulate_with(&assignment).unwrap(),
                circuit.simulate_with(&assignment).unwrap()
            );
        }
    }

    #[test]
    fn optimizer_without_preserve_keeps_every_input(circuit in circuit_strategy()) {
        let optimized = optimize(&circuit, None).unwrap();
        prop_assert!(optimized.num_gates() <= circuit.num_gates());
        for bits in rows(4) {
            prop_assert_eq!(optimized.simulate(&bits).unwrap(), circuit.simulate(&bits).unwrap());
        }
    }
}
