use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use structlink::engine::progress::{Progress, ProgressCallback};
use tracing::warn;

const TICK: Duration = Duration::from_millis(100);

/// Shows the network workflow on stderr: a spinner while a phase waits on the
/// viewer, and a residue counter while the selection is resolved into nodes.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
            .with_style(waiting_style());
        bar.finish_and_clear();
        Self {
            bar: Arc::new(Mutex::new(bar)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = Arc::clone(&self.bar);
        Box::new(move |event: Progress| match bar.lock() {
            Ok(bar) => show(&bar, event),
            Err(_) => warn!("Progress display lock is poisoned; dropping update."),
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn show(bar: &ProgressBar, event: Progress) {
    match event {
        Progress::PhaseStart { name } => {
            bar.reset();
            bar.set_style(waiting_style());
            bar.set_message(format!("{name}: querying viewer..."));
            bar.enable_steady_tick(TICK);
        }
        Progress::PhaseFinish { edges } => {
            bar.disable_steady_tick();
            bar.finish_with_message(match edges {
                0 => "✓ Done".to_string(),
                1 => "✓ 1 interaction added".to_string(),
                n => format!("✓ {n} interactions added"),
            });
        }
        Progress::PhaseSkipped { name, reason } => {
            bar.disable_steady_tick();
            bar.finish_with_message(format!("⚠ {name} skipped: {reason}"));
        }
        Progress::ResiduesStart { total } => {
            bar.disable_steady_tick();
            bar.reset();
            bar.set_length(total);
            bar.set_style(residue_style());
            bar.set_message("Resolving residues");
        }
        Progress::ResidueResolved => bar.inc(1),
        Progress::ResiduesFinish => {
            bar.set_position(bar.length().unwrap_or(0));
            bar.finish();
        }
    }
}

fn waiting_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn residue_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg} {wide_bar:.cyan/blue} {pos}/{len} residues")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_starts_idle() {
        let handler = CliProgressHandler::new();
        let bar = handler.bar.lock().unwrap();
        assert_eq!(bar.length(), Some(0));
        assert!(bar.is_finished());
    }

    #[test]
    fn phase_waits_on_the_viewer_then_reports_new_edges() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "Contacts" });
        {
            let bar = handler.bar.lock().unwrap();
            assert_eq!(bar.message(), "Contacts: querying viewer...");
            assert!(!bar.is_finished());
        }

        callback(Progress::PhaseFinish { edges: 4 });
        let bar = handler.bar.lock().unwrap();
        assert!(bar.is_finished());
        assert_eq!(bar.message(), "✓ 4 interactions added");
    }

    #[test]
    fn phase_without_edges_is_just_done() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();
        callback(Progress::PhaseStart { name: "Adding Hydrogens" });
        callback(Progress::PhaseFinish { edges: 0 });
        assert_eq!(handler.bar.lock().unwrap().message(), "✓ Done");
    }

    #[test]
    fn skipped_phase_reports_its_reason() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "Clashes" });
        callback(Progress::PhaseSkipped {
            name: "Clashes",
            reason: "missing table header".to_string(),
        });

        let bar = handler.bar.lock().unwrap();
        assert!(bar.is_finished());
        assert_eq!(bar.message(), "⚠ Clashes skipped: missing table header");
    }

    #[test]
    fn resolved_residues_advance_the_counter() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "Seeding" });
        callback(Progress::ResiduesStart { total: 3 });
        {
            let bar = handler.bar.lock().unwrap();
            assert_eq!(bar.length(), Some(3));
            assert_eq!(bar.position(), 0);
            assert_eq!(bar.message(), "Resolving residues");
        }

        callback(Progress::ResidueResolved);
        assert_eq!(handler.bar.lock().unwrap().position(), 1);

        callback(Progress::ResiduesFinish);
        let bar = handler.bar.lock().unwrap();
        assert!(bar.is_finished());
        assert_eq!(bar.position(), 3);
    }

    #[test]
    fn callback_can_move_to_another_thread() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart { name: "Hydrogen Bonds" });
            callback(Progress::PhaseFinish { edges: 1 });
        })
        .join()
        .unwrap();

        assert_eq!(handler.bar.lock().unwrap().message(), "✓ 1 interaction added");
    }
}
