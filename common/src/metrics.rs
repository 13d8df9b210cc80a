use metrics::{describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "swd_pipeline_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

pub mod names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "swd_pipeline_";

    pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
    pub const RECORDINGS_PROCESSED: &str = concatcp!(METRIC_NAME_PREFIX, "recordings_processed");
    pub const CANDIDATE_EVENTS: &str = concatcp!(METRIC_NAME_PREFIX, "candidate_events");
    pub const EDGE_EXCLUDED_EVENTS: &str = concatcp!(METRIC_NAME_PREFIX, "edge_excluded_events");
    pub const SWD_EVENTS: &str = concatcp!(METRIC_NAME_PREFIX, "swd_events");
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        PoorSignalFit,
        InvalidStatistics,
        RenormalizationMismatch,
        Timeout,
        LoadFailed,
        ClassificationFailed,
        WriteFailed,
        InvalidTransition,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::PoorSignalFit => "poor_signal_fit",
                FailureKind::InvalidStatistics => "invalid_statistics",
                FailureKind::RenormalizationMismatch => "renormalization_mismatch",
                FailureKind::Timeout => "timeout",
                FailureKind::LoadFailed => "load_failed",
                FailureKind::ClassificationFailed => "classification_failed",
                FailureKind::WriteFailed => "write_failed",
                FailureKind::InvalidTransition => "invalid_transition",
            },
        )
    }
}
