/// The closed set of reasons content is filtered before admission (§4.2 step
/// 4). Checked in a fixed order, `EmptyOutput` first — the detail floor a
/// noisy tool-use event must clear before anything else is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseCategory {
    EmptyOutput,
    BuildOutput,
    PackageInstall,
    LinterWarning,
    TriviallyEmptyStatus,
}

const BUILD_MARKERS: &[&str] = &[
    "compiling ",
    "finished dev",
    "finished release",
    "warning: unused",
    "cargo:rerun-if-changed",
];

const PACKAGE_INSTALL_MARKERS: &[&str] =
    &["npm warn", "npm notice", "added ", "packages are looking for funding", "audited "];

const LINTER_MARKERS: &[&str] = &["eslint", "clippy::", "deprecation warning"];

/// Classify `content` against the noise categories, in order. Returns the
/// first category it matches, or `None` if the content is not noise.
pub fn classify(content: &str) -> Option<NoiseCategory> {
    let trimmed = content.trim();

    if trimmed.is_empty() {
        return Some(NoiseCategory::EmptyOutput);
    }

    let lower = trimmed.to_lowercase();

    if BUILD_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Some(NoiseCategory::BuildOutput);
    }

    if PACKAGE_INSTALL_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Some(NoiseCategory::PackageInstall);
    }

    if LINTER_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Some(NoiseCategory::LinterWarning);
    }

    if matches!(lower.as_str(), "ok" | "success" | "done" | "ok." | "success." | "done.") {
        return Some(NoiseCategory::TriviallyEmptyStatus);
    }

    None
}

/// True when `content` falls into any noise category.
pub fn is_noise(content: &str) -> bool {
    classify(content).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_checked_first() {
        assert_eq!(classify(""), Some(NoiseCategory::EmptyOutput));
        assert_eq!(classify("   \n  "), Some(NoiseCategory::EmptyOutput));
    }

    #[test]
    fn recognizes_build_output() {
        assert_eq!(classify("Compiling laminark-core v0.1.0"), Some(NoiseCategory::BuildOutput));
        assert_eq!(classify("Finished dev [unoptimized] target(s)"), Some(NoiseCategory::BuildOutput));
    }

    #[test]
    fn recognizes_package_install_output() {
        assert_eq!(classify("npm WARN deprecated X"), Some(NoiseCategory::PackageInstall));
        assert_eq!(classify("added 42 packages in 3s"), Some(NoiseCategory::PackageInstall));
    }

    #[test]
    fn recognizes_linter_warnings() {
        assert_eq!(classify("warning: clippy::needless_clone"), Some(NoiseCategory::LinterWarning));
    }

    #[test]
    fn recognizes_trivially_empty_status() {
        assert_eq!(classify("Done"), Some(NoiseCategory::TriviallyEmptyStatus));
        assert_eq!(classify("Success"), Some(NoiseCategory::TriviallyEmptyStatus));
    }

    #[test]
    fn informative_content_is_not_noise() {
        assert_eq!(classify("decided to use a partial unique index because of soft deletes"), None);
        assert!(!is_noise("export const X = 1"));
    }
}
