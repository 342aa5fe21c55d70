//! TIR (Test IR) parser implementation.

use super::*;
use std::collections::HashMap;

pub fn parse_ir(text: &str) -> Result<TestIR, String> {
    let parser = Parser::new(text);
    parser.parse()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    ir: TestIR,

    // Module-wide maps
    funcs: HashMap<&'a str, u32>,
    globals: HashMap<&'a str, u32>,
    call_resolves: Vec<Resolve<'a>>,
    global_resolves: Vec<Resolve<'a>>,

    // Per-function maps
    blocks: HashMap<&'a str, u32>,
    values: HashMap<&'a str, u32>,
    block_resolves: Vec<Resolve<'a>>,
    value_resolves: Vec<Resolve<'a>>,
}

#[derive(Debug)]
struct Resolve<'a> {
    name: &'a str,
    index: u32,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            ir: TestIR::new(),
            funcs: HashMap::new(),
            globals: HashMap::new(),
            call_resolves: Vec::new(),
            global_resolves: Vec::new(),
            blocks: HashMap::new(),
            values: HashMap::new(),
            block_resolves: Vec::new(),
            value_resolves: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<TestIR, String> {
        self.skip_whitespace(true);

        while !self.is_eof() {
            let result = if self.peek_global() {
                self.parse_global()
            } else {
                self.parse_function()
            };
            if let Err(e) = result {
                return Err(self.with_context(e));
            }
            self.skip_whitespace(true);
        }

        self.resolve_module_references()?;

        Ok(self.ir)
    }

    /// Attach the position and the surrounding text to an error message.
    fn with_context(&self, err: String) -> String {
        let start = floor_char_boundary(self.text, self.pos.saturating_sub(20));
        let end = floor_char_boundary(self.text, (self.pos + 20).min(self.text.len()));
        format!(
            "{} at position {}\nContext: '{}'\n          {}^",
            err,
            self.pos,
            &self.text[start..end],
            " ".repeat(self.pos - start)
        )
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self, skip_newlines: bool) {
        while let Some(ch) = self.current_char() {
            if ch == ';' {
                // Skip comment line
                while let Some(ch) = self.current_char() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if ch.is_whitespace() {
                if ch == '\n' && !skip_newlines {
                    break;
                }
                self.advance();
            } else {
                break;
            }
        }
    }

    fn try_read(&mut self, ch: char) -> bool {
        self.skip_whitespace(true);
        if self.current_char() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), String> {
        if !self.try_read(ch) {
            return Err(format!("Expected '{}' but found {:?}", ch, self.current_char()));
        }
        Ok(())
    }

    fn read_identifier(&mut self) -> Result<&'a str, String> {
        self.skip_whitespace(true);
        let start = self.pos;

        match self.current_char() {
            Some(ch) if ch.is_alphabetic() => {}
            Some(ch) => return Err(format!("Expected identifier but found '{}'", ch)),
            None => return Err("Expected identifier but found EOF".to_string()),
        }

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        Ok(&self.text[start..self.pos])
    }

    fn read_value_name(&mut self) -> Result<&'a str, String> {
        self.expect('%')?;
        self.read_identifier()
    }

    fn read_block_name(&mut self) -> Result<&'a str, String> {
        self.expect('^')?;
        self.read_identifier()
    }

    fn read_symbol_name(&mut self) -> Result<&'a str, String> {
        self.skip_whitespace(false);
        if self.current_char() != Some('@') {
            return Err(format!("Expected '@' but found {:?}", self.current_char()));
        }
        self.advance();
        self.read_identifier()
    }

    fn read_number(&mut self) -> Result<u32, String> {
        self.skip_whitespace(true);
        let start = self.pos;

        let is_hex = self.text[self.pos..].starts_with("0x") || self.text[self.pos..].starts_with("0X");
        if is_hex {
            self.pos += 2;
            while matches!(self.current_char(), Some(ch) if ch.is_ascii_hexdigit()) {
                self.advance();
            }
        } else {
            while matches!(self.current_char(), Some(ch) if ch.is_ascii_digit()) {
                self.advance();
            }
        }

        if start == self.pos || (is_hex && self.pos == start + 2) {
            return Err("Expected number".to_string());
        }

        let number_str = &self.text[start..self.pos];
        if is_hex {
            u32::from_str_radix(&number_str[2..], 16)
                .map_err(|e| format!("Failed to parse hex number: {}", e))
        } else {
            number_str
                .parse()
                .map_err(|e| format!("Failed to parse number: {}", e))
        }
    }

    /// `global` followed by `@name`.
    fn peek_global(&mut self) -> bool {
        let saved_pos = self.pos;
        let is_global = matches!(self.read_identifier(), Ok("global")) && {
            self.skip_whitespace(false);
            self.current_char() == Some('@')
        };
        self.pos = saved_pos;
        is_global
    }

    fn parse_global(&mut self) -> Result<(), String> {
        self.read_identifier()?;
        let name = self.read_symbol_name()?;
        if self.globals.contains_key(name) {
            return Err(format!("Duplicate global definition: '{}'", name));
        }
        self.globals.insert(name, self.ir.globals.len() as u32);
        self.ir.globals.push(Global { name: name.to_string() });
        Ok(())
    }

    fn parse_function(&mut self) -> Result<(), String> {
        let func_name = self.read_identifier()?;
        let func_idx = self.ir.functions.len() as u32;

        if self.funcs.contains_key(func_name) {
            return Err(format!("Duplicate function definition: '{}'", func_name));
        }

        // Reset per-function state
        self.blocks.clear();
        self.values.clear();
        self.block_resolves.clear();
        self.value_resolves.clear();

        self.expect('(')?;
        let arg_begin_idx = self.ir.values.len() as u32;

        while !self.try_read(')') {
            let arg_name = self.read_value_name()?;
            let arg_idx = self.ir.values.len() as u32;

            self.values.insert(arg_name, arg_idx);
            self.ir.values.push(Value {
                name: arg_name.to_string(),
                value_type: ValueType::Arg,
                op: Operation::None,
                call_func_idx: 0,
                op_count: 0,
                op_begin_idx: 0,
                op_end_idx: 0,
            });

            if !self.try_read(',') && self.current_char() != Some(')') {
                return Err("Expected ',' or ')' in argument list".to_string());
            }
        }

        let arg_end_idx = self.ir.values.len() as u32;
        let block_begin_idx = self.ir.blocks.len() as u32;
        self.funcs.insert(func_name, func_idx);

        // Function declaration (ends with !)
        if self.try_read('!') {
            self.ir.functions.push(Function {
                name: func_name.to_string(),
                declaration: true,
                block_begin_idx,
                block_end_idx: block_begin_idx,
                arg_begin_idx,
                arg_end_idx,
            });
            return Ok(());
        }

        self.expect('{')?;
        while !self.try_read('}') {
            if self.is_eof() {
                return Err(format!("Unterminated body of function '{}'", func_name));
            }
            self.parse_block()?;
        }
        let block_end_idx = self.ir.blocks.len() as u32;
        if block_begin_idx == block_end_idx {
            return Err(format!("Function '{}' has no blocks", func_name));
        }

        self.resolve_function_references()?;

        self.ir.functions.push(Function {
            name: func_name.to_string(),
            declaration: false,
            block_begin_idx,
            block_end_idx,
            arg_begin_idx,
            arg_end_idx,
        });

        Ok(())
    }

    fn parse_block(&mut self) -> Result<(), String> {
        let block_name = self.read_identifier()?;
        self.expect(':')?;

        let block_idx = self.ir.blocks.len() as u32;
        if self.blocks.insert(block_name, block_idx).is_some() {
            return Err(format!("Duplicate block name: '{}'", block_name));
        }

        let inst_begin_idx = self.ir.values.len() as u32;
        let mut phi_end_idx = inst_begin_idx;
        let mut successor_refs = Vec::new();

        while !self.is_at_block_end() {
            if self.is_eof() {
                break;
            }

            if self.peek_phi() {
                if self.ir.values.len() as u32 > phi_end_idx {
                    return Err("PHI nodes must be at the beginning of a block".to_string());
                }
                self.parse_phi()?;
                phi_end_idx = self.ir.values.len() as u32;
            } else {
                self.parse_instruction(&mut successor_refs)?;
            }
        }

        let inst_end_idx = self.ir.values.len() as u32;

        let succ_begin_idx = self.ir.value_operands.len() as u32;
        for succ_name in successor_refs {
            self.push_block_ref(succ_name);
        }
        let succ_end_idx = self.ir.value_operands.len() as u32;

        self.ir.blocks.push(Block {
            name: block_name.to_string(),
            succ_begin_idx,
            succ_end_idx,
            inst_begin_idx,
            phi_end_idx,
            inst_end_idx,
        });

        Ok(())
    }

    fn is_at_block_end(&mut self) -> bool {
        self.skip_whitespace(true);

        if self.current_char() == Some('}') {
            return true;
        }

        // Next block starts: identifier followed by ':'
        let saved_pos = self.pos;
        let has_label = self.read_identifier().is_ok() && {
            self.skip_whitespace(true);
            self.current_char() == Some(':')
        };
        self.pos = saved_pos;
        has_label
    }

    fn is_at_line_end(&self) -> bool {
        for ch in self.text[self.pos..].chars() {
            match ch {
                '\n' | ';' => return true,
                ' ' | '\t' | '\r' => {}
                _ => return false,
            }
        }
        true
    }

    fn peek_phi(&mut self) -> bool {
        let saved_pos = self.pos;
        let is_phi = self.read_value_name().is_ok()
            && self.try_read('=')
            && matches!(self.read_identifier(), Ok("phi"));
        self.pos = saved_pos;
        is_phi
    }

    fn push_value_ref(&mut self, name: &'a str) {
        self.value_resolves.push(Resolve {
            name,
            index: self.ir.value_operands.len() as u32,
        });
        self.ir.value_operands.push(0); // Placeholder
    }

    fn push_block_ref(&mut self, name: &'a str) {
        self.block_resolves.push(Resolve {
            name,
            index: self.ir.value_operands.len() as u32,
        });
        self.ir.value_operands.push(0); // Placeholder
    }

    fn parse_phi(&mut self) -> Result<(), String> {
        let name = self.read_value_name()?;
        self.expect('=')?;
        self.read_identifier()?;

        let val_idx = self.ir.values.len() as u32;
        self.values.insert(name, val_idx);

        // [^block, %value], ...
        let mut incoming = Vec::new();
        loop {
            self.expect('[')?;
            let block_name = self.read_block_name()?;
            self.expect(',')?;
            let val_name = self.read_value_name()?;
            self.expect(']')?;
            incoming.push((block_name, val_name));

            if !self.try_read(',') {
                break;
            }
        }

        // Values first, then blocks
        let op_begin_idx = self.ir.value_operands.len() as u32;
        for &(_, val_name) in &incoming {
            self.push_value_ref(val_name);
        }
        for &(block_name, _) in &incoming {
            self.push_block_ref(block_name);
        }

        self.ir.values.push(Value {
            name: name.to_string(),
            value_type: ValueType::Phi,
            op: Operation::None,
            call_func_idx: 0,
            op_count: incoming.len() as u32,
            op_begin_idx,
            op_end_idx: self.ir.value_operands.len() as u32,
        });

        Ok(())
    }

    /// Comma-separated `%value` list on the current line.
    fn parse_value_list(&mut self) -> Result<u32, String> {
        let mut count = 0;
        loop {
            self.skip_whitespace(false);
            if self.current_char() != Some('%') {
                break;
            }
            let val_name = self.read_value_name()?;
            self.push_value_ref(val_name);
            count += 1;

            self.skip_whitespace(false);
            if self.current_char() == Some(',') {
                self.advance();
            } else {
                break;
            }
        }
        Ok(count)
    }

    fn parse_instruction(&mut self, successors: &mut Vec<&'a str>) -> Result<(), String> {
        self.skip_whitespace(true);

        let (name, op) = if self.current_char() == Some('%') {
            let name = self.read_value_name()?;
            self.expect('=')?;
            self.skip_whitespace(false);

            // "%a =" and "%dep = %x, %y" are opaque values
            let op = if self.is_at_line_end() || self.current_char() == Some('%') {
                Operation::Any
            } else {
                let op_str = self.read_identifier()?;
                Operation::parse(op_str).ok_or_else(|| format!("Unknown operation: {}", op_str))?
            };
            (Some(name), op)
        } else {
            let op_str = self.read_identifier()?;
            let op =
                Operation::parse(op_str).ok_or_else(|| format!("Unknown operation: {}", op_str))?;
            (None, op)
        };

        let info = op.info();

        if name.is_some() && !info.is_def {
            return Err(format!("Operation '{}' does not produce a value", info.name));
        }
        if name.is_none() && info.is_def && op != Operation::Call {
            return Err(format!("Operation '{}' requires a result value", info.name));
        }

        let val_idx = self.ir.values.len() as u32;
        if let Some(name) = name {
            if self.values.insert(name, val_idx).is_some() {
                return Err(format!("Redefinition of value '%{}'", name));
            }
        }

        let op_begin_idx = self.ir.value_operands.len() as u32;
        let mut call_func_idx = 0;
        let mut op_count = info.op_count;

        match op {
            Operation::Alloca => {
                // alloca <size>, <align>
                let size = self.read_number()?;
                self.expect(',')?;
                let align = self.read_number()?;
                self.ir.value_operands.push(size);
                self.ir.value_operands.push(align);
            }
            Operation::Addr => {
                // addr @global
                let global = self.read_symbol_name()?;
                self.global_resolves.push(Resolve {
                    name: global,
                    index: self.ir.value_operands.len() as u32,
                });
                self.ir.value_operands.push(0); // Placeholder
            }
            Operation::Offset => {
                // offset %ptr, <bytes>
                let base = self.read_value_name()?;
                self.push_value_ref(base);
                self.expect(',')?;
                let bytes = self.read_number()?;
                self.ir.value_operands.push(bytes);
            }
            Operation::Load | Operation::Ret => {
                let val_name = self.read_value_name()?;
                self.push_value_ref(val_name);
            }
            Operation::Add | Operation::Sub | Operation::Store => {
                // add %a, %b / store %ptr, %value
                let a_name = self.read_value_name()?;
                self.expect(',')?;
                let b_name = self.read_value_name()?;
                self.push_value_ref(a_name);
                self.push_value_ref(b_name);
            }
            Operation::Fence | Operation::Terminate => {}
            Operation::Br => {
                let block_name = self.read_block_name()?;
                self.push_block_ref(block_name);
                successors.push(block_name);
            }
            Operation::CondBr => {
                // condbr %cond, ^true_block, ^false_block
                let cond_name = self.read_value_name()?;
                self.push_value_ref(cond_name);
                for _ in 0..2 {
                    self.expect(',')?;
                    let block_name = self.read_block_name()?;
                    self.push_block_ref(block_name);
                    successors.push(block_name);
                }
            }
            Operation::Jump => {
                // jump ^block1, ^block2, ...
                loop {
                    let block_name = self.read_block_name()?;
                    self.push_block_ref(block_name);
                    successors.push(block_name);
                    if !self.try_read(',') {
                        break;
                    }
                }
                op_count = 0;
            }
            Operation::Call => {
                // call @func_name or call @func_name, %arg1, %arg2
                let func_name = self.read_symbol_name()?;
                self.call_resolves.push(Resolve { name: func_name, index: val_idx });
                call_func_idx = 0;

                self.skip_whitespace(false);
                op_count = if self.current_char() == Some(',') {
                    self.advance();
                    self.parse_value_list()?
                } else {
                    0
                };
            }
            Operation::Any => {
                op_count = self.parse_value_list()?;
            }
            Operation::None => {
                return Err("Unexpected empty operation".to_string());
            }
        }

        self.ir.values.push(Value {
            name: name.map(|n| n.to_string()).unwrap_or_default(),
            value_type: if info.is_terminator {
                ValueType::Terminator
            } else {
                ValueType::Normal
            },
            op,
            call_func_idx,
            op_count,
            op_begin_idx,
            op_end_idx: self.ir.value_operands.len() as u32,
        });

        Ok(())
    }

    fn resolve_function_references(&mut self) -> Result<(), String> {
        for resolve in &self.value_resolves {
            let Some(&idx) = self.values.get(resolve.name) else {
                return Err(format!("Undefined value reference: %{}", resolve.name));
            };
            self.ir.value_operands[resolve.index as usize] = idx;
        }

        for resolve in &self.block_resolves {
            let Some(&idx) = self.blocks.get(resolve.name) else {
                return Err(format!("Undefined block reference: ^{}", resolve.name));
            };
            self.ir.value_operands[resolve.index as usize] = idx;
        }

        Ok(())
    }

    fn resolve_module_references(&mut self) -> Result<(), String> {
        for resolve in &self.call_resolves {
            let Some(&idx) = self.funcs.get(resolve.name) else {
                return Err(format!("Undefined function reference: @{}", resolve.name));
            };
            self.ir.values[resolve.index as usize].call_func_idx = idx;
        }

        for resolve in &self.global_resolves {
            let Some(&idx) = self.globals.get(resolve.name) else {
                return Err(format!("Undefined global reference: @{}", resolve.name));
            };
            self.ir.value_operands[resolve.index as usize] = idx;
        }

        Ok(())
    }
}

fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}
