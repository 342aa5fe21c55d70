//! Runs the fence pass on a TIR module and renders textual reports.
//!
//! Shared by the FileCheck runner and the `tsofence` binary so both print
//! exactly the same report lines.

use super::adaptor::{FuncRef, InstRef, TestIRAdaptor};
use super::TestIR;
use crate::core::{FenceError, FenceResult, FenceSession, IrAdaptor};
use crate::tso::{FenceInsertionPass, PassConfig, RunResult};
use bumpalo::Bump;
use log::debug;

/// One collected access, rendered for reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub func: String,
    pub id: u32,
    pub inst: String,
    pub process_visible: bool,
    pub resolved: bool,
}

/// Which reports to render.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub ir: bool,
    pub events: bool,
    pub hazards: bool,
    pub fences: bool,
    pub stats: bool,
    pub fenced: bool,
}

/// A finished pass run over a TIR module.
pub struct TirRun<'ir> {
    pub adaptor: TestIRAdaptor<'ir>,
    pub result: RunResult<InstRef, FuncRef>,
    pub events: Vec<EventRow>,
}

/// Run the pass over `ir`.
///
/// `no_alias_info` names functions the alias oracle must treat as unknown.
pub fn run_fence_pass<'ir>(
    ir: &'ir TestIR,
    config: PassConfig,
    no_alias_info: &[String],
) -> FenceResult<TirRun<'ir>> {
    let mut adaptor = TestIRAdaptor::new(ir);
    let mut oracle = adaptor.alias_oracle();
    for name in no_alias_info {
        oracle.disable_by_name(ir, name)?;
    }

    let arena = Bump::new();
    let session = FenceSession::new(&arena);
    let config = config.with_keep_hazards(true).with_keep_events(true);
    let result = FenceInsertionPass::with_config(&session, config).run(&mut adaptor, &oracle);
    debug!("Arena holds {} bytes after the run", arena.allocated_bytes());

    let events = result
        .events
        .iter()
        .map(|event| EventRow {
            func: adaptor.func_link_name(event.func).to_string(),
            id: event.id,
            inst: adaptor.inst_text(event.inst),
            process_visible: event.visibility.is_process_visible(),
            resolved: event.resolved,
        })
        .collect();

    Ok(TirRun { adaptor, result, events })
}

impl<'ir> TirRun<'ir> {
    fn func_name(&self, func: FuncRef) -> &str {
        self.adaptor.func_link_name(func)
    }

    pub fn render_events(&self) -> String {
        let mut out = Vec::new();
        let mut current: Option<&str> = None;
        for row in &self.events {
            if current != Some(row.func.as_str()) {
                out.push(format!("Events for {}", row.func));
                current = Some(row.func.as_str());
            }
            let visibility = if row.process_visible { "visible" } else { "local" };
            let unresolved = if row.resolved { "" } else { ", unresolved" };
            out.push(format!("{}: {} ({}{})", row.id, row.inst, visibility, unresolved));
        }
        out.push("End Events".to_string());
        out.join("\n")
    }

    pub fn render_hazards(&self) -> String {
        let mut out = vec!["Hazards".to_string()];
        for hazard in &self.result.hazards {
            out.push(format!(
                "{} {}: {} -> {}: {}",
                hazard.pair,
                self.func_name(hazard.first_func),
                self.adaptor.inst_text(hazard.first),
                self.func_name(hazard.second_func),
                self.adaptor.inst_text(hazard.second)
            ));
        }
        out.push("End Hazards".to_string());
        out.join("\n")
    }

    pub fn render_fences(&self) -> String {
        let mut out = vec!["Fences".to_string()];
        for err in &self.result.skipped {
            out.push(format!("skipped: {}", err));
        }
        let mut lines: Vec<(u32, String)> = self
            .result
            .applied
            .iter()
            .map(|d| (d.event, format!("insert {}: {}", self.func_name(d.func), self.adaptor.inst_text(d.before))))
            .chain(self.result.already_fenced.iter().map(|d| {
                (d.event, format!("present {}: {}", self.func_name(d.func), self.adaptor.inst_text(d.before)))
            }))
            .collect();
        lines.sort_by_key(|(event, _)| *event);
        out.extend(lines.into_iter().map(|(_, line)| line));
        out.push("End Fences".to_string());
        out.push(if self.result.modified() {
            "Module modified".to_string()
        } else {
            "Module not modified".to_string()
        });
        out.join("\n")
    }

    pub fn render_stats(&self) -> String {
        self.result.stats.to_string().trim_end().to_string()
    }

    pub fn render_fenced(&self) -> FenceResult<String> {
        let fenced = self
            .adaptor
            .fenced_ir()
            .map_err(|reason| FenceError::Parse { reason })?;
        Ok(fenced.to_string().trim_end().to_string())
    }

    /// All requested reports, in a fixed order.
    pub fn render(&self, options: &ReportOptions) -> FenceResult<String> {
        let mut out = Vec::new();
        if options.ir {
            out.push(self.adaptor.ir().print().trim_end().to_string());
        }
        if options.events {
            out.push(self.render_events());
        }
        if options.hazards {
            out.push(self.render_hazards());
        }
        if options.fences {
            out.push(self.render_fences());
        }
        if options.stats {
            out.push(self.render_stats());
        }
        if options.fenced {
            out.push(self.render_fenced()?);
        }
        Ok(out.join("\n"))
    }
}
