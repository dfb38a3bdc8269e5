// SPDX-License-Identifier: Apache-2.0

//! Black-box equivalence oracle: shells out to `abc` and trusts exactly one
//! line of its output.
//!
//! Both networks are written as ASCII AIGER into a scratch directory and
//! handed to `abc -q "cec ..."`. The oracle reports success if and only if
//! some output line starts with the literal text `Networks are equivalent`;
//! everything else abc prints is ignored.

use std::io::Write;
use std::process::Command;
use std::time::Instant;

use crate::aiger::emit_aiger;
use crate::gate::XagFn;

/// Checks combinational equivalence of two networks via the external
/// `abc` binary. `Ok(false)` means abc ran but did not certify
/// equivalence; `Err` means the oracle itself could not run.
pub fn abc_cec(lhs: &XagFn, rhs: &XagFn) -> Result<bool, String> {
    let dir = tempfile::tempdir().map_err(|e| format!("tempdir failed: {}", e))?;
    let lhs_path = dir.path().join("lhs.aag");
    let rhs_path = dir.path().join("rhs.aag");

    let write_aag = |path: &std::path::Path, f: &XagFn| -> Result<(), String> {
        let text = emit_aiger(f)?;
        let mut file =
            std::fs::File::create(path).map_err(|e| format!("create {}: {}", path.display(), e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| format!("write {}: {}", path.display(), e))
    };
    write_aag(&lhs_path, lhs)?;
    write_aag(&rhs_path, rhs)?;

    let script = format!(
        "cec {} {}",
        lhs_path.to_str().unwrap(),
        rhs_path.to_str().unwrap()
    );
    let mut command = Command::new("abc");
    command.arg("-q").arg(&script);
    log::info!("abc_cec; running command: {:?}", command);
    let start = Instant::now();
    let output = command
        .output()
        .map_err(|e| format!("failed to launch abc: {}", e))?;
    let elapsed = start.elapsed();
    log::info!("abc_cec; finished in {:?}", elapsed);

    if !output.status.success() {
        return Err(format!(
            "abc exited with {}\nstdout: {:?}\nstderr: {:?}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    // Only the literal success line counts; abc's other chatter (including
    // statistics that may mention "equivalent") is not interpreted.
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if line.starts_with("Networks are equivalent") {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate_builder::{BuilderOptions, XagBuilder};

    fn have_abc() -> bool {
        Command::new("abc")
            .arg("-q")
            .arg("version")
            .output()
            .is_ok()
    }

    #[test]
    fn test_abc_cec_equivalent_networks() {
        if !have_abc() {
            eprintln!("abc not installed; skipping oracle test");
            return;
        }
        let build = |swap: bool| -> XagFn {
            let mut gb = XagBuilder::new("cec".to_string(), BuilderOptions::no_opt());
            let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
            let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
            let g = if swap {
                gb.add_and_binary(b, a)
            } else {
                gb.add_and_binary(a, b)
            };
            gb.add_output("o".to_string(), g.into());
            gb.build()
        };
        assert_eq!(abc_cec(&build(false), &build(true)), Ok(true));
    }
}
