//! FileCheck-style test validation for TIR files.
//!
//! This module provides functionality to parse CHECK directives from TIR files
//! and validate pass reports against expected patterns, in the style of LLVM's
//! FileCheck tool.

use super::driver::{run_fence_pass, ReportOptions};
use super::TestIR;
use crate::tso::{PairScope, PassConfig};
use std::collections::VecDeque;

/// A CHECK directive extracted from a TIR file
#[derive(Debug, Clone)]
pub enum CheckDirective {
    /// CHECK: pattern - Match exact pattern
    Check(String),
    /// CHECK-LABEL: pattern - Label for a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// A RUN directive specifying how to execute the test
#[derive(Debug, Clone)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
}

/// Test specification extracted from a TIR file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub tir_content: String,
}

impl TestSpec {
    /// Parse a TIR file to extract test specifications
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut tir_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = trimmed.strip_prefix("; RUN:") {
                let parts: Vec<&str> = run_cmd.split_whitespace().collect();
                if let Some((command, args)) = parts.split_first() {
                    run_directives.push(RunDirective {
                        command: command.to_string(),
                        args: args.iter().map(|s| s.to_string()).collect(),
                    });
                }
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-LABEL:") {
                check_directives.push(CheckDirective::CheckLabel(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NEXT:") {
                check_directives.push(CheckDirective::CheckNext(pattern.trim().to_string()));
            } else if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK:") {
                check_directives.push(CheckDirective::Check(pattern.trim().to_string()));
            } else if let Some(comment) = trimmed.strip_prefix("; COM:") {
                check_directives.push(CheckDirective::Comment(comment.trim().to_string()));
            } else {
                // Regular TIR content
                tir_lines.push(line);
            }
        }

        Ok(TestSpec {
            run_directives,
            check_directives,
            tir_content: tir_lines.join("\n"),
        })
    }
}

/// Test runner that executes TIR tests through the fence pass
pub struct TestRunner {
    verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run a TIR test and validate output
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), String> {
        // Parse the TIR content
        let ir = TestIR::parse(&spec.tir_content)?;

        // Execute based on run directives
        for run_dir in &spec.run_directives {
            let output = self.execute_command(&ir, run_dir)?;
            self.validate_output(&output, &spec.check_directives)?;
        }

        Ok(())
    }

    /// Execute a test command and return the output
    fn execute_command(&self, ir: &TestIR, run_dir: &RunDirective) -> Result<String, String> {
        let mut config = PassConfig::default();
        let mut options = ReportOptions::default();
        let mut no_alias_info = Vec::new();

        for arg in &run_dir.args {
            match arg.as_str() {
                "--print-ir" => options.ir = true,
                "--print-events" => options.events = true,
                "--print-hazards" => options.hazards = true,
                "--print-fences" => options.fences = true,
                "--print-fenced" => options.fenced = true,
                "--stats" => options.stats = true,
                "--no-cross-function" => config = config.with_cross_function(false),
                "--relax-read-read" => config = config.with_read_read_hazards(false),
                "--block-scope" => config = config.with_scope(PairScope::Block),
                other => {
                    if let Some(func) = other.strip_prefix("--no-alias-info=") {
                        no_alias_info.push(func.to_string());
                    }
                }
            }
        }

        let run = run_fence_pass(ir, config, &no_alias_info).map_err(|e| e.to_string())?;
        let output = run.render(&options).map_err(|e| e.to_string())?;
        if self.verbose {
            println!("{}", output);
        }
        Ok(output)
    }

    /// Validate output against CHECK directives
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), String> {
        let output_lines: VecDeque<_> = output.lines().collect();
        let mut line_idx = 0;

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::Check(pattern) => {
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern));

                    match found {
                        Some(idx) => {
                            line_idx += idx + 1; // Move to the next line after the match
                            if self.verbose {
                                println!("CHECK: '{}' found at line {}", pattern, line_idx - 1);
                            }
                        }
                        None => {
                            return Err(format!(
                                "CHECK: pattern '{}' not found in output",
                                pattern
                            ));
                        }
                    }
                }

                CheckDirective::CheckLabel(pattern) => {
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern));

                    match found {
                        Some(idx) => {
                            line_idx += idx + 1;
                            if self.verbose {
                                println!(
                                    "CHECK-LABEL: '{}' found at line {}",
                                    pattern,
                                    line_idx - 1
                                );
                            }
                        }
                        None => {
                            return Err(format!("CHECK-LABEL: pattern '{}' not found", pattern));
                        }
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    if line_idx >= output_lines.len() {
                        return Err(format!("CHECK-NEXT: no more lines, expected '{}'", pattern));
                    }

                    let line = output_lines[line_idx];
                    if !line.contains(pattern) {
                        return Err(format!(
                            "CHECK-NEXT: expected '{}' but got '{}'",
                            pattern, line
                        ));
                    }

                    if self.verbose {
                        println!("CHECK-NEXT: '{}' matches at line {}", pattern, line_idx);
                    }
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    if line_idx >= output_lines.len() {
                        continue; // End of output counts as empty
                    }

                    let line = output_lines[line_idx];
                    if !line.trim().is_empty() {
                        return Err(format!(
                            "CHECK-EMPTY: expected empty line but got '{}'",
                            line
                        ));
                    }

                    if self.verbose {
                        println!("CHECK-EMPTY: matches at line {}", line_idx);
                    }
                    line_idx += 1;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directives() {
        let content = r#"; RUN: %tsofence --print-fences --relax-read-read %s
; CHECK: Fences
; CHECK-LABEL: insert f
; CHECK-NEXT: End Fences
; COM: This is a comment
f() {
  entry:
    terminate
}"#;

        let spec = TestSpec::parse(content).unwrap();
        assert_eq!(spec.run_directives.len(), 1);
        assert_eq!(spec.run_directives[0].command, "%tsofence");
        assert_eq!(spec.run_directives[0].args.len(), 3);
        assert_eq!(spec.check_directives.len(), 4);
        assert!(spec.tir_content.contains("f()"));
        assert!(!spec.tir_content.contains("CHECK"));
    }

    #[test]
    fn test_check_matching() {
        let runner = TestRunner::new(false);
        let output = "Fences\ninsert f: store %a, %v\nEnd Fences\n";

        let directives = vec![
            CheckDirective::Check("Fences".to_string()),
            CheckDirective::CheckLabel("insert f".to_string()),
            CheckDirective::CheckNext("End Fences".to_string()),
        ];

        runner.validate_output(output, &directives).unwrap();
    }

    #[test]
    fn test_check_next_failure() {
        let runner = TestRunner::new(false);
        let output = "Line 1\nLine 2\nLine 3\n";

        let directives = vec![
            CheckDirective::Check("Line 1".to_string()),
            CheckDirective::CheckNext("Line 3".to_string()), // Should fail
        ];

        let result = runner.validate_output(output, &directives);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("CHECK-NEXT"));
    }

    #[test]
    fn test_run_flags() {
        let content = r#"; RUN: %tsofence --print-fences --relax-read-read %s
; CHECK: Fences
; CHECK-NEXT: End Fences
; CHECK-NEXT: Module not modified
global @g

reader() {
entry:
  %a = addr @g
  %x = load %a
  %y = load %a
  terminate
}
"#;
        let spec = TestSpec::parse(content).unwrap();
        TestRunner::new(false).run_test(&spec).unwrap();
    }
}
