//! Recording report sink shared by the scenario tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use slowlock::{ReportSink, WaitRecord};

/// One sink invocation, flattened for assertions.
pub struct Report {
    pub elapsed: Duration,
    pub annotation: Option<String>,
    pub caller_file: &'static str,
    pub last_annotation: Option<String>,
    pub has_last: bool,
}

#[derive(Default)]
pub struct Reports(Mutex<Vec<Report>>);

impl Reports {
    /// A sink that appends every report it receives.
    pub fn sink(self: &Arc<Self>) -> ReportSink {
        let reports = Arc::clone(self);
        Arc::new(move |record: &WaitRecord, last: Option<&WaitRecord>| {
            reports.0.lock().unwrap().push(Report {
                elapsed: record.elapsed(),
                annotation: record.annotation().map(str::to_owned),
                caller_file: record.caller().file(),
                last_annotation: last.and_then(|l| l.annotation()).map(str::to_owned),
                has_last: last.is_some(),
            });
        })
    }

    pub fn take(&self) -> Vec<Report> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn max_elapsed(&self) -> Option<Duration> {
        self.0.lock().unwrap().iter().map(|r| r.elapsed).max()
    }
}
