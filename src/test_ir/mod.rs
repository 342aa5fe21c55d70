//! Test IR (TIR) parser and data structures for exercising the fence pass.
//!
//! This module provides a small textual SSA IR for writing pass tests
//! without depending on a full compiler IR. The format is designed to be:
//! - Human-readable and writable
//! - Easy to parse
//! - Expressive enough for pointer provenance (globals, stack slots,
//!   arguments, constant offsets) and for writing fenced output back out
//!
//! # TIR Format
//!
//! ```text
//! ; Comments start with semicolon
//! global @counter
//!
//! ext(%p)!
//!
//! func_name(%arg1, %arg2) {
//! entry:
//!     %g = addr @counter
//!     %v = load %g
//!     store %arg1, %v
//!     br ^next_block
//! next_block:
//!     terminate
//! }
//! ```

pub mod adaptor;
pub mod alias;
pub mod check;
pub mod driver;
pub mod parser;
pub mod provenance;

pub use adaptor::TestIRAdaptor;
pub use alias::TestAliasOracle;
pub use check::{CheckDirective, TestRunner, TestSpec};
pub use driver::{run_fence_pass, ReportOptions, TirRun};
pub use provenance::{MemBase, Provenance, TirLocation};

#[derive(Debug, Clone, PartialEq)]
pub struct TestIR {
    pub functions: Vec<Function>,
    pub blocks: Vec<Block>,
    pub values: Vec<Value>,
    pub value_operands: Vec<u32>,
    pub globals: Vec<Global>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub declaration: bool,
    pub block_begin_idx: u32,
    pub block_end_idx: u32,
    pub arg_begin_idx: u32,
    pub arg_end_idx: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub succ_begin_idx: u32,
    pub succ_end_idx: u32,
    pub inst_begin_idx: u32,
    pub phi_end_idx: u32,
    pub inst_end_idx: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub name: String,
    pub value_type: ValueType,
    pub op: Operation,
    /// For call only: called function index
    pub call_func_idx: u32,
    /// Number of value operands
    pub op_count: u32,
    /// Operand indices into value_operands array: values, then blocks, then immediates
    pub op_begin_idx: u32,
    pub op_end_idx: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Normal,
    Arg,
    Phi,
    Terminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    None,
    Any,
    Add,
    Sub,
    Alloca,
    Addr,
    Offset,
    Load,
    Store,
    Fence,
    Call,
    Terminate,
    Ret,
    Br,
    CondBr,
    Jump,
}

impl Operation {
    pub const fn info(self) -> OpInfo {
        use Operation::*;
        match self {
            None => OpInfo { name: "<none>", is_terminator: false, is_def: false, op_count: 0, succ_count: 0, imm_count: 0 },
            Any => OpInfo { name: "any", is_terminator: false, is_def: true, op_count: !0, succ_count: 0, imm_count: 0 },
            Add => OpInfo { name: "add", is_terminator: false, is_def: true, op_count: 2, succ_count: 0, imm_count: 0 },
            Sub => OpInfo { name: "sub", is_terminator: false, is_def: true, op_count: 2, succ_count: 0, imm_count: 0 },
            Alloca => OpInfo { name: "alloca", is_terminator: false, is_def: true, op_count: 0, succ_count: 0, imm_count: 2 },
            Addr => OpInfo { name: "addr", is_terminator: false, is_def: true, op_count: 0, succ_count: 0, imm_count: 1 },
            Offset => OpInfo { name: "offset", is_terminator: false, is_def: true, op_count: 1, succ_count: 0, imm_count: 1 },
            Load => OpInfo { name: "load", is_terminator: false, is_def: true, op_count: 1, succ_count: 0, imm_count: 0 },
            Store => OpInfo { name: "store", is_terminator: false, is_def: false, op_count: 2, succ_count: 0, imm_count: 0 },
            Fence => OpInfo { name: "fence", is_terminator: false, is_def: false, op_count: 0, succ_count: 0, imm_count: 0 },
            Call => OpInfo { name: "call", is_terminator: false, is_def: true, op_count: !0, succ_count: 0, imm_count: 0 },
            Terminate => OpInfo { name: "terminate", is_terminator: true, is_def: false, op_count: 0, succ_count: 0, imm_count: 0 },
            Ret => OpInfo { name: "ret", is_terminator: true, is_def: false, op_count: 1, succ_count: 0, imm_count: 0 },
            Br => OpInfo { name: "br", is_terminator: true, is_def: false, op_count: 0, succ_count: 1, imm_count: 0 },
            CondBr => OpInfo { name: "condbr", is_terminator: true, is_def: false, op_count: 1, succ_count: 2, imm_count: 0 },
            Jump => OpInfo { name: "jump", is_terminator: true, is_def: false, op_count: 0, succ_count: !0, imm_count: 0 },
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(Operation::Add),
            "sub" => Some(Operation::Sub),
            "alloca" => Some(Operation::Alloca),
            "addr" => Some(Operation::Addr),
            "offset" => Some(Operation::Offset),
            "load" => Some(Operation::Load),
            "store" => Some(Operation::Store),
            "fence" => Some(Operation::Fence),
            "call" => Some(Operation::Call),
            "terminate" => Some(Operation::Terminate),
            "ret" => Some(Operation::Ret),
            "br" => Some(Operation::Br),
            "condbr" => Some(Operation::CondBr),
            "jump" => Some(Operation::Jump),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    pub is_terminator: bool,
    pub is_def: bool,
    pub op_count: u32,
    pub succ_count: u32,
    pub imm_count: u32,
}

impl TestIR {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            blocks: Vec::new(),
            values: Vec::new(),
            value_operands: Vec::new(),
            globals: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        parser::parse_ir(text)
    }

    pub fn func_index(&self, name: &str) -> Option<u32> {
        self.functions.iter().position(|f| f.name == name).map(|i| i as u32)
    }

    pub fn global_index(&self, name: &str) -> Option<u32> {
        self.globals.iter().position(|g| g.name == name).map(|i| i as u32)
    }

    /// Value operands of an instruction (incoming values for a phi).
    pub fn operands(&self, idx: u32) -> &[u32] {
        let v = &self.values[idx as usize];
        &self.value_operands[v.op_begin_idx as usize..(v.op_begin_idx + v.op_count) as usize]
    }

    /// Block operands of a terminator (incoming blocks for a phi).
    pub fn block_operands(&self, idx: u32) -> &[u32] {
        let v = &self.values[idx as usize];
        let start = (v.op_begin_idx + v.op_count) as usize;
        match v.value_type {
            ValueType::Phi => &self.value_operands[start..start + v.op_count as usize],
            ValueType::Terminator => {
                let end = v.op_end_idx - v.op.info().imm_count;
                &self.value_operands[start..end as usize]
            }
            _ => &[],
        }
    }

    /// `i`-th immediate of an instruction.
    pub fn imm(&self, idx: u32, i: u32) -> u32 {
        let v = &self.values[idx as usize];
        let base = v.op_end_idx - v.op.info().imm_count;
        self.value_operands[(base + i) as usize]
    }

    /// Function owning a value, by index range.
    pub fn func_of_value(&self, idx: u32) -> Option<u32> {
        self.functions.iter().position(|f| {
            let args = f.arg_begin_idx <= idx && idx < f.arg_end_idx;
            let body = f.block_begin_idx < f.block_end_idx
                && self.blocks[f.block_begin_idx as usize].inst_begin_idx <= idx
                && idx < self.blocks[f.block_end_idx as usize - 1].inst_end_idx;
            args || body
        })
        .map(|i| i as u32)
    }

    fn value_ref(&self, idx: u32) -> String {
        format!("%{}", self.values[idx as usize].name)
    }

    fn block_ref(&self, idx: u32) -> String {
        format!("^{}", self.blocks[idx as usize].name)
    }

    /// TIR text of one instruction, without indentation.
    pub fn format_inst(&self, idx: u32) -> String {
        let v = &self.values[idx as usize];
        let values: Vec<String> = self.operands(idx).iter().map(|&o| self.value_ref(o)).collect();

        match v.value_type {
            ValueType::Arg => return self.value_ref(idx),
            ValueType::Phi => {
                let incoming: Vec<String> = self
                    .block_operands(idx)
                    .iter()
                    .zip(&values)
                    .map(|(&b, val)| format!("[{}, {}]", self.block_ref(b), val))
                    .collect();
                return format!("%{} = phi {}", v.name, incoming.join(", "));
            }
            _ => {}
        }

        let body = match v.op {
            Operation::Any => {
                return if values.is_empty() {
                    format!("%{} =", v.name)
                } else {
                    format!("%{} = {}", v.name, values.join(", "))
                };
            }
            Operation::Alloca => format!("alloca {}, {}", self.imm(idx, 0), self.imm(idx, 1)),
            Operation::Addr => {
                format!("addr @{}", self.globals[self.imm(idx, 0) as usize].name)
            }
            Operation::Offset => format!("offset {}, {}", values[0], self.imm(idx, 0)),
            Operation::Call => {
                let mut text = format!("call @{}", self.functions[v.call_func_idx as usize].name);
                for val in &values {
                    text.push_str(", ");
                    text.push_str(val);
                }
                text
            }
            Operation::Br | Operation::CondBr | Operation::Jump => {
                let mut parts = values.clone();
                parts.extend(self.block_operands(idx).iter().map(|&b| self.block_ref(b)));
                format!("{} {}", v.op.info().name, parts.join(", "))
            }
            op if values.is_empty() => op.info().name.to_string(),
            op => format!("{} {}", op.info().name, values.join(", ")),
        };

        if v.name.is_empty() {
            body
        } else {
            format!("%{} = {}", v.name, body)
        }
    }

    /// Write the module back out as TIR.
    ///
    /// `fence_before(idx)` requests a `fence` line in front of instruction `idx`.
    pub fn write_tir(&self, fence_before: impl Fn(u32) -> bool) -> String {
        let mut out = String::new();
        for global in &self.globals {
            out.push_str(&format!("global @{}\n", global.name));
        }
        if !self.globals.is_empty() {
            out.push('\n');
        }

        for (func_idx, func) in self.functions.iter().enumerate() {
            if func_idx > 0 {
                out.push('\n');
            }
            let args: Vec<String> =
                (func.arg_begin_idx..func.arg_end_idx).map(|a| self.value_ref(a)).collect();
            out.push_str(&format!("{}({})", func.name, args.join(", ")));
            if func.declaration {
                out.push_str("!\n");
                continue;
            }
            out.push_str(" {\n");

            for block in &self.blocks[func.block_begin_idx as usize..func.block_end_idx as usize] {
                out.push_str(&format!("{}:\n", block.name));
                for idx in block.inst_begin_idx..block.inst_end_idx {
                    if fence_before(idx) {
                        out.push_str("  fence\n");
                    }
                    out.push_str("  ");
                    out.push_str(&self.format_inst(idx));
                    out.push('\n');
                }
            }
            out.push_str("}\n");
        }
        out
    }

    pub fn print(&self) -> String {
        let mut output = String::new();
        output.push_str("Printing IR\n");

        for global in &self.globals {
            output.push_str(&format!("Global {}\n", global.name));
        }

        for func in &self.functions {
            if func.declaration {
                output.push_str(&format!("Extern function {}", func.name));
            } else {
                output.push_str(&format!("Function {}", func.name));
            }

            for arg_idx in func.arg_begin_idx..func.arg_end_idx {
                output.push_str(&format!("\nArgument {}", self.values[arg_idx as usize].name));
            }

            for block_idx in func.block_begin_idx..func.block_end_idx {
                let block = &self.blocks[block_idx as usize];
                output.push_str(&format!("\nBlock {}", block.name));

                for succ_idx in block.succ_begin_idx..block.succ_end_idx {
                    let succ = self.value_operands[succ_idx as usize];
                    output.push_str(&format!("\nSucc {}", self.blocks[succ as usize].name));
                }

                for phi_idx in block.inst_begin_idx..block.phi_end_idx {
                    output.push_str(&format!("\nPHI {}", self.values[phi_idx as usize].name));
                    let incoming = self.operands(phi_idx).iter().zip(self.block_operands(phi_idx));
                    for (&val, &from) in incoming {
                        output.push_str(&format!(
                            "\n{} from {}",
                            self.values[val as usize].name, self.blocks[from as usize].name
                        ));
                    }
                }

                for inst_idx in block.phi_end_idx..block.inst_end_idx {
                    let inst = &self.values[inst_idx as usize];
                    let info = inst.op.info();

                    if inst.name.is_empty() {
                        output.push_str(&format!("\nValue ({})", info.name));
                    } else {
                        output.push_str(&format!("\nValue {} ({})", inst.name, info.name));
                    }

                    if inst.op == Operation::Call {
                        output.push_str(&format!(
                            "\nTarget {}",
                            self.functions[inst.call_func_idx as usize].name
                        ));
                    }

                    for &operand in self.operands(inst_idx) {
                        output.push_str(&format!("\nOp {}", self.values[operand as usize].name));
                    }
                    for &target in self.block_operands(inst_idx) {
                        output.push_str(&format!("\nOp ^{}", self.blocks[target as usize].name));
                    }

                    match inst.op {
                        Operation::Addr => {
                            let global = self.imm(inst_idx, 0);
                            output.push_str(&format!("\nOp @{}", self.globals[global as usize].name));
                        }
                        _ => {
                            for i in 0..info.imm_count {
                                output.push_str(&format!("\nOp ${}", self.imm(inst_idx, i)));
                            }
                        }
                    }
                }
            }
            output.push('\n');
        }

        output
    }
}

impl Default for TestIR {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TestIR {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.write_tir(|_| false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIR: &str = r#"
global @counter

ext(%p)!

worker(%p) local {
entry:
  %g = addr @counter
  %s = alloca 4, 4
  %q = offset %s, 8
  %v = load %g
  store %q, %v
  %r = call @ext, %s
  condbr %v, ^next, ^done
next:
  %x = phi [^entry, %v]
  br ^done
done:
  terminate
}
"#;

    #[test]
    fn test_format_inst() {
        let ir = TestIR::parse(TIR).unwrap();
        let texts: Vec<String> = (0..ir.values.len() as u32).map(|i| ir.format_inst(i)).collect();

        assert!(texts.contains(&"%g = addr @counter".to_string()));
        assert!(texts.contains(&"%s = alloca 4, 4".to_string()));
        assert!(texts.contains(&"%q = offset %s, 8".to_string()));
        assert!(texts.contains(&"store %q, %v".to_string()));
        assert!(texts.contains(&"%r = call @ext, %s".to_string()));
        assert!(texts.contains(&"condbr %v, ^next, ^done".to_string()));
        assert!(texts.contains(&"%x = phi [^entry, %v]".to_string()));
    }

    #[test]
    fn test_write_reparses_identically() {
        let ir = TestIR::parse(TIR).unwrap();
        let written = ir.write_tir(|_| false);
        let again = TestIR::parse(&written).unwrap();
        assert_eq!(ir, again);
        assert_eq!(written, again.to_string());
    }

    #[test]
    fn test_write_splices_fences() {
        let ir = TestIR::parse(TIR).unwrap();
        let store = ir.values.iter().position(|v| v.op == Operation::Store).unwrap() as u32;
        let written = ir.write_tir(|idx| idx == store);
        assert!(written.contains("  %v = load %g\n  fence\n  store %q, %v\n"));

        let fenced = TestIR::parse(&written).unwrap();
        assert_eq!(fenced.values.len(), ir.values.len() + 1);
    }

    #[test]
    fn test_lookup_helpers() {
        let ir = TestIR::parse(TIR).unwrap();
        assert_eq!(ir.func_index("worker"), Some(1));
        assert_eq!(ir.func_index("missing"), None);
        assert_eq!(ir.global_index("counter"), Some(0));
        let load = ir.values.iter().position(|v| v.op == Operation::Load).unwrap() as u32;
        assert_eq!(ir.func_of_value(load), Some(1));
    }
}
