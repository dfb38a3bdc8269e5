// SPDX-License-Identifier: Apache-2.0

//! ASCII AIGER ("aag") interchange for `XagFn`.
//!
//! Only purely combinational files are supported (L == 0). AIGER has no
//! XOR primitive, so emission first lowers every `Xor2` into its
//! three-AND form; loading therefore always yields an AND-only network.
//!
//! The parser is intentionally strict -- any structural inconsistency
//! fails fast so downstream tooling can rely on strong invariants.

use std::collections::HashMap;

use crate::gate::{XagFn, XagNode, XagOperand};
use crate::gate_builder::{BuilderOptions, XagBuilder};

/// Network I/O boundary for the standard interchange formats: the core
/// treats files behind this trait as opaque sources and sinks.
pub trait NetworkIo {
    fn read(&self, path: &std::path::Path) -> Result<XagFn, String>;
    fn write(&self, f: &XagFn, path: &std::path::Path) -> Result<(), String>;
}

/// ASCII AIGER implementation of [`NetworkIo`].
pub struct AigerIo;

impl NetworkIo for AigerIo {
    fn read(&self, path: &std::path::Path) -> Result<XagFn, String> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        load_aiger(&src, BuilderOptions::no_opt())
    }

    fn write(&self, f: &XagFn, path: &std::path::Path) -> Result<(), String> {
        let text = emit_aiger(f)?;
        std::fs::write(path, text).map_err(|e| format!("failed to write {}: {}", path.display(), e))
    }
}

/// Parses ASCII-AIGER text into an `XagFn` built with the supplied
/// builder options.
pub fn load_aiger(src: &str, opts: BuilderOptions) -> Result<XagFn, String> {
    let mut lines = src.lines().filter(|l| !l.trim().is_empty());

    let header_line = lines.next().ok_or_else(|| "empty AIGER input".to_string())?;
    let header: Vec<&str> = header_line.split_whitespace().collect();
    if header.len() != 6 {
        return Err(format!(
            "expected 6 tokens in AIGER header, got {} (\"{}\")",
            header.len(),
            header_line
        ));
    }
    if header[0] != "aag" {
        return Err(format!(
            "only ASCII-AIGER (aag) is supported; got '{}'",
            header[0]
        ));
    }
    let parse_u32 = |s: &str, field: &str| -> Result<u32, String> {
        s.parse::<u32>()
            .map_err(|e| format!("invalid {} value '{}': {}", field, s, e))
    };
    parse_u32(header[1], "M")?;
    let i = parse_u32(header[2], "I")?;
    let l = parse_u32(header[3], "L")?;
    let o = parse_u32(header[4], "O")?;
    let a = parse_u32(header[5], "A")?;
    if l != 0 {
        return Err("latch count (L) must be zero; sequential AIGER not supported".to_string());
    }

    let mut gb = XagBuilder::new("loaded_aiger".to_string(), opts);
    let mut var_to_operand: HashMap<u32, XagOperand> = HashMap::new();

    // One single-bit input bundle per AIGER input.
    for idx in 0..i {
        let line = lines
            .next()
            .ok_or_else(|| format!("expected {} input lines but found fewer", i))?;
        let lit: u32 = line
            .trim()
            .parse()
            .map_err(|e| format!("invalid input literal '{}': {}", line, e))?;
        if lit & 1 != 0 {
            return Err(format!("input literal {} must be positive (even)", lit));
        }
        let var = lit >> 1;
        if var == 0 {
            return Err("input literal refers to constant false (0)".to_string());
        }
        if var_to_operand.contains_key(&var) {
            return Err(format!("duplicate input variable index {}", var));
        }
        let bv = gb.add_input(format!("i{}", idx), 1);
        var_to_operand.insert(var, *bv.get_lsb(0));
    }

    let mut output_literals: Vec<u32> = Vec::with_capacity(o as usize);
    for _ in 0..o {
        let line = lines
            .next()
            .ok_or_else(|| format!("expected {} output lines but found fewer", o))?;
        let lit: u32 = line
            .trim()
            .parse()
            .map_err(|e| format!("invalid output literal '{}': {}", line, e))?;
        output_literals.push(lit);
    }

    let lit_to_operand = |lit: u32, var_map: &HashMap<u32, XagOperand>| -> Result<XagOperand, String> {
        let var = lit >> 1;
        let neg = lit & 1 == 1;
        let base = if var == 0 {
            XagOperand {
                node: crate::gate::XagRef { id: 0 },
                negated: false,
            }
        } else {
            var_map
                .get(&var)
                .copied()
                .ok_or_else(|| format!("referenced undefined variable {} (literal {})", var, lit))?
        };
        Ok(if neg { base.negate() } else { base })
    };

    for _ in 0..a {
        let line = lines
            .next()
            .ok_or_else(|| format!("expected {} AND lines but found fewer", a))?;
        let toks: Vec<&str> = line.split_whitespace().collect();
        if toks.len() != 3 {
            return Err(format!("AND line should have 3 fields, got '{}'", line));
        }
        let lhs: u32 = toks[0]
            .parse()
            .map_err(|e| format!("invalid AND lhs '{}': {}", toks[0], e))?;
        let rhs0: u32 = toks[1]
            .parse()
            .map_err(|e| format!("invalid AND rhs '{}': {}", toks[1], e))?;
        let rhs1: u32 = toks[2]
            .parse()
            .map_err(|e| format!("invalid AND rhs '{}': {}", toks[2], e))?;
        if lhs & 1 != 0 {
            return Err(format!("AND lhs literal {} must be positive (even)", lhs));
        }
        let lhs_var = lhs >> 1;
        if var_to_operand.contains_key(&lhs_var) {
            return Err(format!("variable {} already defined", lhs_var));
        }
        let op0 = lit_to_operand(rhs0, &var_to_operand)?;
        let op1 = lit_to_operand(rhs1, &var_to_operand)?;
        let and_op = gb.add_and_binary(op0, op1);
        var_to_operand.insert(lhs_var, and_op);
    }

    for (out_idx, lit) in output_literals.iter().enumerate() {
        let op = lit_to_operand(*lit, &var_to_operand)?;
        gb.add_output(format!("o{}", out_idx), op.into());
    }

    Ok(gb.build())
}

/// Rebuilds the network with every XOR lowered to ANDs:
/// `a ^ b = !(!(a & !b) & !(!a & b))`.
pub fn lower_xors(f: &XagFn) -> XagFn {
    let mut gb = XagBuilder::new(f.name.clone(), BuilderOptions::opt());
    let mut map: Vec<Option<XagOperand>> = vec![None; f.gates.len()];
    for input in &f.inputs {
        let bv = gb.add_input(input.name.clone(), input.get_bit_count());
        for (old, new) in input.bit_vector.iter_lsb_to_msb().zip(bv.iter_lsb_to_msb()) {
            map[old.node.id] = Some(*new);
        }
    }
    let translate = |map: &[Option<XagOperand>], op: &XagOperand| -> XagOperand {
        let m = map[op.node.id].expect("operand emitted before use");
        if op.negated {
            m.negate()
        } else {
            m
        }
    };
    for (id, node) in f.gates.iter().enumerate() {
        if map[id].is_some() {
            continue;
        }
        let mapped = match node {
            XagNode::Literal(false) => gb.get_false(),
            XagNode::Literal(true) => gb.get_true(),
            XagNode::Input { .. } => unreachable!("inputs are pre-mapped"),
            XagNode::And2 { a, b } => {
                let (ta, tb) = (translate(&map, a), translate(&map, b));
                gb.add_and_binary(ta, tb)
            }
            XagNode::Xor2 { a, b } => {
                let (ta, tb) = (translate(&map, a), translate(&map, b));
                let n1 = gb.add_and_binary(ta, tb.negate());
                let n2 = gb.add_and_binary(ta.negate(), tb);
                let n3 = gb.add_and_binary(n1.negate(), n2.negate());
                n3.negate()
            }
        };
        map[id] = Some(mapped);
    }
    for output in &f.outputs {
        let bits: Vec<XagOperand> = output
            .bit_vector
            .iter_lsb_to_msb()
            .map(|op| translate(&map, op))
            .collect();
        gb.add_output(
            output.name.clone(),
            crate::gate::XagBitVector::from_lsb_is_index_0(&bits),
        );
    }
    crate::dce::dce(&gb.build())
}

/// Emits ASCII AIGER. XORs are lowered first; constants feeding logic are
/// legal AIGER (literal 0/1).
pub fn emit_aiger(f: &XagFn) -> Result<String, String> {
    let f = lower_xors(f);

    // Assign AIGER variable indices: inputs first, then AND gates in arena
    // (already topological) order.
    let mut node_to_var: HashMap<usize, u32> = HashMap::new();
    let mut next_var = 1u32;
    let input_ops = f.input_operands();
    for op in &input_ops {
        node_to_var.insert(op.node.id, next_var);
        next_var += 1;
    }
    let mut and_ids: Vec<usize> = Vec::new();
    for (id, node) in f.gates.iter().enumerate() {
        match node {
            XagNode::And2 { .. } => {
                node_to_var.insert(id, next_var);
                next_var += 1;
                and_ids.push(id);
            }
            XagNode::Xor2 { .. } => {
                return Err("internal error: XOR survived lowering".to_string());
            }
            _ => {}
        }
    }
    let op_to_lit = |op: &XagOperand| -> Result<u32, String> {
        let base = match &f.gates[op.node.id] {
            XagNode::Literal(v) => *v as u32, // literal 0 or 1
            _ => {
                let var = node_to_var
                    .get(&op.node.id)
                    .ok_or_else(|| format!("node %{} has no AIGER variable", op.node.id))?;
                var << 1
            }
        };
        Ok(base ^ op.negated as u32)
    };

    let num_inputs = input_ops.len() as u32;
    let num_outputs = f.num_output_bits() as u32;
    let num_ands = and_ids.len() as u32;
    let max_var = next_var - 1;

    let mut out = String::new();
    out.push_str(&format!(
        "aag {} {} 0 {} {}\n",
        max_var, num_inputs, num_outputs, num_ands
    ));
    for op in &input_ops {
        out.push_str(&format!("{}\n", node_to_var[&op.node.id] << 1));
    }
    for op in f.output_operands() {
        out.push_str(&format!("{}\n", op_to_lit(&op)?));
    }
    for id in and_ids {
        let (a, b) = match &f.gates[id] {
            XagNode::And2 { a, b } => (a, b),
            _ => unreachable!(),
        };
        out.push_str(&format!(
            "{} {} {}\n",
            node_to_var[&id] << 1,
            op_to_lit(a)?,
            op_to_lit(b)?
        ));
    }
    // Symbol table: one entry per AIGER input/output bit.
    let mut sym_idx = 0usize;
    for input in &f.inputs {
        for bit in 0..input.get_bit_count() {
            out.push_str(&format!("i{} {}_{}\n", sym_idx, input.name, bit));
            sym_idx += 1;
        }
    }
    sym_idx = 0;
    for output in &f.outputs {
        for bit in 0..output.get_bit_count() {
            out.push_str(&format!("o{} {}_{}\n", sym_idx, output.name, bit));
            sym_idx += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{simulate, simulate_outputs, PatternSet};

    #[test]
    fn test_emit_load_roundtrip_preserves_function() {
        let mut gb = XagBuilder::new("rt".to_string(), BuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let c = *gb.add_input("c".to_string(), 1).get_lsb(0);
        let x = gb.add_xor_binary(a, b);
        let g = gb.add_and_binary(x, c.negate());
        gb.add_output("o".to_string(), g.negate().into());
        let f = gb.build();

        let text = emit_aiger(&f).unwrap();
        let loaded = load_aiger(&text, BuilderOptions::no_opt()).unwrap();
        assert_eq!(loaded.num_input_bits(), 3);
        assert_eq!(loaded.num_output_bits(), 1);

        let pats = PatternSet::exhaustive(3);
        let want = simulate_outputs(&f, &simulate(&f, &pats));
        let got = simulate_outputs(&loaded, &simulate(&loaded, &pats));
        assert_eq!(want, got);
    }

    #[test]
    fn test_load_rejects_malformed() {
        assert!(load_aiger("", BuilderOptions::no_opt()).is_err());
        assert!(load_aiger("aig 1 1 0 1 0\n2\n2\n", BuilderOptions::no_opt()).is_err());
        // Latches unsupported.
        assert!(load_aiger("aag 1 0 1 0 0\n2 3\n", BuilderOptions::no_opt()).is_err());
        // Negated input literal.
        assert!(load_aiger("aag 1 1 0 1 0\n3\n2\n", BuilderOptions::no_opt()).is_err());
    }

    #[test]
    fn test_constant_output() {
        // Output tied to constant true.
        let src = "aag 1 1 0 1 0\n2\n1\n";
        let f = load_aiger(src, BuilderOptions::no_opt()).unwrap();
        let pats = PatternSet::exhaustive(1);
        let outs = simulate_outputs(&f, &simulate(&f, &pats));
        assert_eq!(outs[0], crate::tt::Tt::ones(2));
    }
}
