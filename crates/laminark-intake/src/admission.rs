use once_cell::sync::Lazy;
use regex::Regex;

use laminark_types::ObservationSource;

use crate::noise::{self, NoiseCategory};

const LONG_CONTENT_THRESHOLD: usize = 5000;

static INDICATOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)error|failed|exception|bug|decided|chose|because|instead of")
        .expect("built-in indicator pattern compiles")
});

/// The single admission decision an event can produce (§4.2 step 4 detail
/// floor: at most one decision per event).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit,
    Reject(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    Noise(NoiseCategory),
    LongWithoutIndicator,
}

pub fn decide(source: &ObservationSource, content: &str) -> AdmissionDecision {
    if source.is_change_tool() {
        return if content.trim().is_empty() {
            AdmissionDecision::Reject(RejectReason::Empty)
        } else {
            AdmissionDecision::Admit
        };
    }

    if content.trim().is_empty() {
        return AdmissionDecision::Reject(RejectReason::Empty);
    }

    if let Some(category) = noise::classify(content) {
        return AdmissionDecision::Reject(RejectReason::Noise(category));
    }

    if content.len() > LONG_CONTENT_THRESHOLD && !INDICATOR_PATTERN.is_match(content) {
        return AdmissionDecision::Reject(RejectReason::LongWithoutIndicator);
    }

    AdmissionDecision::Admit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write() -> ObservationSource {
        ObservationSource::hook("Write")
    }

    fn bash() -> ObservationSource {
        ObservationSource::hook("Bash")
    }

    #[test]
    fn write_is_admitted_on_any_non_empty_content() {
        assert_eq!(decide(&write(), "npm WARN deprecated X"), AdmissionDecision::Admit);
    }

    #[test]
    fn write_with_empty_content_is_rejected() {
        assert_eq!(decide(&write(), "   "), AdmissionDecision::Reject(RejectReason::Empty));
    }

    #[test]
    fn bash_noise_is_rejected() {
        assert_eq!(
            decide(&bash(), "npm WARN deprecated X"),
            AdmissionDecision::Reject(RejectReason::Noise(NoiseCategory::PackageInstall))
        );
    }

    #[test]
    fn bash_informative_content_is_admitted() {
        assert_eq!(decide(&bash(), "Build failed with exit code 1"), AdmissionDecision::Admit);
    }

    #[test]
    fn long_content_without_indicator_is_rejected() {
        let content = "x".repeat(LONG_CONTENT_THRESHOLD + 1);
        assert_eq!(
            decide(&bash(), &content),
            AdmissionDecision::Reject(RejectReason::LongWithoutIndicator)
        );
    }

    #[test]
    fn long_content_with_indicator_is_admitted() {
        let mut content = "x".repeat(LONG_CONTENT_THRESHOLD + 1);
        content.push_str(" because it was the right call");
        assert_eq!(decide(&bash(), &content), AdmissionDecision::Admit);
    }
}
