use jsavrs_cp::ir::optimizer::{Pass, Sccp};
use jsavrs_cp::ir::{
    BasicBlock, Function, ImmediateValue, Instruction, InstructionKind, IrBinaryOp, IrType, Terminator, TerminatorKind, Value,
};
use jsavrs_cp::location::source_span::SourceSpan;

fn span() -> SourceSpan {
    SourceSpan::default()
}

fn imm_i32(v: i32) -> Value {
    Value::new_immediate(ImmediateValue::I32(v))
}

/// SCCP end to end over a join with one statically-known-dead predecessor: the
/// phi must resolve to the reachable arm's constant after rewriting.
#[test]
fn sccp_run_resolves_phi_through_dead_branch() {
    let mut function = Function::new("f", vec![], IrType::I32);
    let entry = function.cfg.entry_label.clone();
    function.cfg.add_block(BasicBlock::new("true_arm", span()));
    function.cfg.add_block(BasicBlock::new("false_arm", span()));
    function.cfg.add_block(BasicBlock::new("join", span()));
    function.cfg.add_edge(&entry, "true_arm");
    function.cfg.add_edge(&entry, "false_arm");
    function.cfg.add_edge("true_arm", "join");
    function.cfg.add_edge("false_arm", "join");

    let cond = Value::new_temporary("cond".into(), IrType::Bool);
    let y_t = Value::new_temporary("y.t".into(), IrType::I32);
    let y_f = Value::new_temporary("y.f".into(), IrType::I32);
    let y = Value::new_temporary("y".into(), IrType::I32);

    let entry_block = function.cfg.get_block_mut(&entry).unwrap();
    entry_block.instructions.push(
        Instruction::new(InstructionKind::Binary { op: IrBinaryOp::Equal, left: imm_i32(5), right: imm_i32(5), ty: IrType::Bool }, span())
            .with_result(cond.clone()),
    );
    entry_block.set_terminator(Terminator::new(
        TerminatorKind::ConditionalBranch {
            condition: cond.clone(),
            true_label: std::sync::Arc::from("true_arm"),
            false_label: std::sync::Arc::from("false_arm"),
        },
        span(),
    ));

    let true_block = function.cfg.get_block_mut("true_arm").unwrap();
    true_block.instructions.push(
        Instruction::new(InstructionKind::Binary { op: IrBinaryOp::Add, left: imm_i32(7), right: imm_i32(0), ty: IrType::I32 }, span())
            .with_result(y_t.clone()),
    );
    true_block.set_terminator(Terminator::new(TerminatorKind::Branch { label: std::sync::Arc::from("join") }, span()));

    let false_block = function.cfg.get_block_mut("false_arm").unwrap();
    false_block.instructions.push(
        Instruction::new(InstructionKind::Binary { op: IrBinaryOp::Add, left: imm_i32(9), right: imm_i32(0), ty: IrType::I32 }, span())
            .with_result(y_f.clone()),
    );
    false_block.set_terminator(Terminator::new(TerminatorKind::Branch { label: std::sync::Arc::from("join") }, span()));

    let join_block = function.cfg.get_block_mut("join").unwrap();
    join_block.instructions.push(
        Instruction::new(
            InstructionKind::Phi { ty: IrType::I32, incoming: vec![(y_t.clone(), "true_arm".to_string()), (y_f.clone(), "false_arm".to_string())] },
            span(),
        )
        .with_result(y.clone()),
    );
    join_block.set_terminator(Terminator::new(TerminatorKind::Return { value: y.clone(), ty: IrType::I32 }, span()));

    let mut pass = Sccp::with_default_config();
    let modified = pass.run(&mut function).unwrap();
    assert!(modified);

    let join_block = function.cfg.get_block("join").unwrap();
    assert_eq!(join_block.terminator().kind, TerminatorKind::Return { value: imm_i32(7), ty: IrType::I32 });
}
