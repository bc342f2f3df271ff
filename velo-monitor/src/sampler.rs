//! Utilization sources.

use std::fs;

/// One utilization reading, in percent of capacity used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationReading {
    pub memory_used_pct: f64,
    pub cpu_used_pct: f64,
}

/// Source abstraction for utilization sampling.
///
/// Implementations must be cheap to call. `None` means the source could
/// not be read this tick. CPU accounting needs the previous counters, so
/// sampling takes `&mut self`.
pub trait IResourceSampler: Send {
    fn sample(&mut self) -> Option<UtilizationReading>;
}

#[derive(Debug, Clone, Copy)]
struct CpuCounters {
    busy: u64,
    total: u64,
}

/// Production sampler reading `/proc/meminfo` and `/proc/stat`.
#[derive(Debug, Default)]
pub struct ProcfsSampler {
    previous_cpu: Option<CpuCounters>,
}

impl ProcfsSampler {
    pub fn new() -> Self {
        Self::default()
    }

    fn memory_used_pct(&self) -> Option<f64> {
        let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
        parse_memory_used_pct(&meminfo)
    }

    fn cpu_used_pct(&mut self) -> Option<f64> {
        let stat = fs::read_to_string("/proc/stat").ok()?;
        let current = parse_cpu_counters(&stat)?;
        let pct = match self.previous_cpu {
            Some(previous) if current.total > previous.total => {
                let busy = current.busy.saturating_sub(previous.busy) as f64;
                let total = (current.total - previous.total) as f64;
                busy / total * 100.0
            }
            // First reading: fall back to the cumulative ratio since boot.
            _ => current.busy as f64 / current.total.max(1) as f64 * 100.0,
        };
        self.previous_cpu = Some(current);
        Some(pct.clamp(0.0, 100.0))
    }
}

impl IResourceSampler for ProcfsSampler {
    fn sample(&mut self) -> Option<UtilizationReading> {
        let memory_used_pct = self.memory_used_pct()?;
        let cpu_used_pct = self.cpu_used_pct()?;
        Some(UtilizationReading {
            memory_used_pct,
            cpu_used_pct,
        })
    }
}

fn parse_memory_used_pct(meminfo: &str) -> Option<f64> {
    let mut total = None;
    let mut available = None;
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = parse_kb(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = parse_kb(rest);
        }
        if total.is_some() && available.is_some() {
            break;
        }
    }
    let (total, available) = (total?, available?);
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(available) as f64;
    Some((used / total as f64 * 100.0).clamp(0.0, 100.0))
}

fn parse_kb(rest: &str) -> Option<u64> {
    rest.split_whitespace().next()?.parse().ok()
}

/// Parse the aggregate `cpu` line: user nice system idle iowait irq ...
fn parse_cpu_counters(stat: &str) -> Option<CpuCounters> {
    let line = stat.lines().next()?;
    if !line.starts_with("cpu") {
        return None;
    }
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|field| field.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total: u64 = fields.iter().sum();
    Some(CpuCounters {
        busy: total.saturating_sub(idle),
        total,
    })
}
