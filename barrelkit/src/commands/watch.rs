//! Watch mode command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use barrelkit_core::{BuildSession, EventResult, Outcome};

use crate::formatting::{
    print_error, print_key_value, print_section_header, print_success, print_warning,
    SectionStyle,
};

use super::{load_config, print_collect_summary, ConfigOverrides};

const PUMP_INTERVAL: Duration = Duration::from_millis(200);

pub fn cmd_watch(overrides: &ConfigOverrides, debounce_ms: Option<u64>, poll: bool) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set signal handler: {}", e))?;

    let mut config = load_config(overrides, true)?;
    if let Some(ms) = debounce_ms {
        config.debounce_ms = ms;
    }
    if poll {
        config.poll = true;
    }

    print_section_header("Watch Mode", SectionStyle::Primary);
    for root in config.roots() {
        print_key_value("Watching", &root.display().to_string());
    }
    print_key_value("Debounce", &format!("{}ms", config.debounce_ms));
    if config.poll {
        print_key_value("Backend", &format!("polling every {}ms", config.poll_interval_ms));
    }
    println!("  Press Ctrl+C to stop");
    println!();

    let mut session = BuildSession::new(config);
    session.watch_run();

    let start = Instant::now();
    let summary = session.emit();
    print_collect_summary(&summary, start.elapsed().as_secs_f64());

    session.done(false)?;

    while running.load(Ordering::SeqCst) {
        match session.pump(PUMP_INTERVAL) {
            Ok(results) => report(&results),
            Err(e) => {
                session.watch_close();
                return Err(e.into());
            }
        }
    }

    println!();
    print_warning("Stopping watch mode...");
    session.watch_close();

    Ok(())
}

fn report(results: &[EventResult]) {
    for result in results {
        match &result.outcome {
            Ok(Outcome::Written(written)) => print_success(&format!(
                "Updated {} ({} statements)",
                written.path.display(),
                written.statements
            )),
            Ok(Outcome::Unchanged { .. }) | Ok(Outcome::Ignored) => {}
            Err(e) => print_error(&e.to_string()),
        }
    }
}
