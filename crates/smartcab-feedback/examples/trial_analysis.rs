//! Example: analyze a synthetic training run.
//!
//! Run with: cargo run -p smartcab-feedback --example trial_analysis

use smartcab_feedback::{timestamp_now, TrialAnalyzer, TrialEnd, TrialOutcome};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== smartcab: trial analysis ===\n");

    // Early trials expire with many violations, later ones arrive cleanly.
    let outcomes: Vec<TrialOutcome> = (1..=40)
        .map(|t| {
            let reached = t > 12 || t % 5 == 0;
            let penalties = if t > 25 { 0 } else { 6 - (t as u32 / 5) };
            #[allow(clippy::cast_precision_loss)]
            let epsilon = 0.3 / (1.0 + (t - 1) as f64 / 100.0);
            TrialOutcome {
                trial: t,
                ts: timestamp_now(),
                end: if reached {
                    TrialEnd::Reached
                } else {
                    TrialEnd::Expired
                },
                steps: if reached { 14 } else { 25 },
                net_reward: (if reached { 20.0 } else { 3.5 }) - f64::from(penalties),
                penalties,
                deadline_remaining: if reached { 11 } else { 0 },
                epsilon,
            }
        })
        .collect();

    let analyzer = TrialAnalyzer::default();

    println!("Learning curve:");
    for w in analyzer.learning_curve(&outcomes) {
        println!(
            "  trials {:>3}-{:<3} success {:>5.1}%  avg reward {:>6.2}  penalties/step {:.2}",
            w.first_trial,
            w.last_trial,
            w.success_rate * 100.0,
            w.average_reward,
            w.penalty_rate
        );
    }

    println!("\nPatterns:");
    let patterns = analyzer.analyze_patterns(&outcomes);
    if patterns.is_empty() {
        println!("  (none detected with current thresholds)");
    }
    for p in &patterns {
        println!("  - {p}");
    }

    println!("\nReport as JSON:");
    println!("{}", serde_json::to_string_pretty(&analyzer.report(&outcomes))?);

    Ok(())
}
