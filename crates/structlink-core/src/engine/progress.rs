/// What a workflow tells its caller while the viewer works through a request.
///
/// Phases are sequential. Between `ResiduesStart` and `ResiduesFinish` the
/// workflow reports one `ResidueResolved` per residue turned into a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    /// `edges` counts the interactions the phase added to the network.
    PhaseFinish { edges: usize },
    /// A phase that produced nothing because its reply was unusable.
    PhaseSkipped { name: &'static str, reason: String },

    ResiduesStart { total: u64 },
    ResidueResolved,
    ResiduesFinish,
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards workflow events to an optional observer; silent without one.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    observer: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(observer: ProgressCallback<'a>) -> Self {
        Self {
            observer: Some(observer),
        }
    }

    pub fn report(&self, event: Progress) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }

    /// Reports a finished phase that added `edges` interactions.
    pub fn phase_done(&self, edges: usize) {
        self.report(Progress::PhaseFinish { edges });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn reporter_without_observer_is_silent() {
        ProgressReporter::new().report(Progress::ResidueResolved);
    }

    #[test]
    fn observer_sees_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        reporter.report(Progress::PhaseStart { name: "Contacts" });
        reporter.phase_done(3);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Progress::PhaseStart { name: "Contacts" },
                Progress::PhaseFinish { edges: 3 },
            ]
        );
    }
}
