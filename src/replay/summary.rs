use chrono::NaiveDate;
use chrono_tz::US::Eastern;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::models::Decision;
use crate::replay::engine::ReplayTrace;

/// Per-session accounting: bar counts and the decision histogram, with the
/// skip count reported alongside so silent data loss is never invisible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_date: Option<NaiveDate>,
    pub bars_evaluated: usize,
    pub bars_skipped: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub holds: usize,
}

impl SessionSummary {
    pub fn from_trace(trace: &ReplayTrace) -> Self {
        let mut buy = 0;
        let mut sell = 0;
        let mut hold = 0;
        for state in &trace.bars {
            match state.decision {
                Decision::SignalBuy => buy += 1,
                Decision::SignalSell => sell += 1,
                Decision::Hold => hold += 1,
            }
        }

        // Equity sessions are dated in New York time.
        let session_date = trace
            .bars
            .first()
            .map(|b| b.timestamp.with_timezone(&Eastern).date_naive());

        Self {
            session_date,
            bars_evaluated: trace.bars.len(),
            bars_skipped: trace.skipped_bars,
            buy_signals: buy,
            sell_signals: sell,
            holds: hold,
        }
    }

    pub fn raw_signals(&self) -> usize {
        self.buy_signals + self.sell_signals
    }

    pub fn print_summary(&self) {
        println!("Session Summary");
        println!("===============");
        if let Some(date) = self.session_date {
            println!("  Session:   {date}");
        }
        println!("  Bars:      {} evaluated, {} skipped", self.bars_evaluated, self.bars_skipped);
        println!("  Decisions: {} buy / {} sell / {} hold", self.buy_signals, self.sell_signals, self.holds);
        println!("  Raw signal rate: {:.1}%", self.signal_rate_pct());
    }

    fn signal_rate_pct(&self) -> f64 {
        if self.bars_evaluated == 0 {
            return 0.0;
        }
        self.raw_signals() as f64 / self.bars_evaluated as f64 * 100.0
    }
}

/// Export a trace as one tabular row per bar for audit logging.
pub fn write_trace_csv<W: Write>(trace: &ReplayTrace, mut w: W) -> std::io::Result<()> {
    writeln!(
        w,
        "timestamp,price,decision,regime,volume_vs_avg,momentum,volume_ok,momentum_ok,dp_ok,\
         nearest_support,nearest_resistance,confidence,reasoning"
    )?;
    for b in &trace.bars {
        writeln!(
            w,
            "{},{:.4},{},{},{:.4},{:.4},{},{},{},{},{},{},\"{}\"",
            b.timestamp.to_rfc3339(),
            b.price,
            b.decision,
            b.regime,
            b.volume_vs_avg,
            b.momentum,
            b.flags.volume_confirmed,
            b.flags.momentum_confirmed,
            b.flags.dp_confirmed,
            b.nearest_support
                .map(|l| format!("{:.2}", l.price))
                .unwrap_or_default(),
            b.nearest_resistance
                .map(|l| format!("{:.2}", l.price))
                .unwrap_or_default(),
            b.signal_confidence,
            b.reasoning.replace('"', "'"),
        )?;
    }
    Ok(())
}
