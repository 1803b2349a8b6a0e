use chrono::{DateTime, Utc};

use laminark_storage::{ObservationFilter, Store};
use laminark_types::{Classification, Observation, ObservationKind, ProjectTag, Session};

use crate::Result;

const CONTEXT_BUDGET: usize = 6000;
const RECENT_MEMORY_LIMIT: usize = 5;
const RECENT_MEMORY_SCAN: usize = 50;
const MEMORY_CONTENT_PREVIEW: usize = 120;
const PREFERRED_SOURCES: &[&str] = &["mcp:save_memory", "slash:remember"];
const PREAMBLE: &str = "# Laminark Memory";
/// Also the fixed fallback the hook entrypoint prints on any internal
/// failure — session start must never surface an error message (§7).
pub const WELCOME_LINE: &str = "Laminark: no prior memory for this project yet. Starting fresh.";

const SUMMARY_BUDGET: usize = 2000;
const SUMMARY_SECTION_CAP: usize = 8;
const SUMMARY_LINE_PREVIEW: usize = 150;

/// Assembles the token-bounded recovery context handed back to the host on
/// `SessionStart` (§4.9): last-session summary plus up to 5 high-value
/// recent observations, trimmed last-to-first to stay under budget.
pub fn assemble_context(store: &Store, project_tag: &ProjectTag) -> Result<String> {
    let mut last_session_section = None;
    if let Some(prior) = store.last_completed_with_summary(project_tag)? {
        if let Some(summary) = &prior.summary {
            let range = format_range(prior.started_at, prior.ended_at);
            last_session_section = Some(format!("## Last Session ({range})\n{summary}"));
        }
    }

    let mut recent = high_value_observations(store, project_tag)?;
    recent.truncate(RECENT_MEMORY_LIMIT);

    if last_session_section.is_none() && recent.is_empty() {
        return Ok(WELCOME_LINE.to_string());
    }

    loop {
        let assembled = render_context(&last_session_section, &recent);
        if assembled.chars().count() <= CONTEXT_BUDGET || recent.is_empty() {
            return Ok(if assembled.chars().count() > CONTEXT_BUDGET {
                assembled.chars().take(CONTEXT_BUDGET).collect()
            } else {
                assembled
            });
        }
        recent.pop();
    }
}

fn render_context(last_session_section: &Option<String>, recent: &[Observation]) -> String {
    let mut parts = vec![PREAMBLE.to_string()];
    if let Some(section) = last_session_section {
        parts.push(section.clone());
    }
    if !recent.is_empty() {
        let mut lines = vec!["## Recent Memories".to_string()];
        for obs in recent {
            lines.push(format_memory_line(obs));
        }
        parts.push(lines.join("\n"));
    }
    parts.join("\n\n")
}

fn high_value_observations(store: &Store, project_tag: &ProjectTag) -> Result<Vec<Observation>> {
    let filter = ObservationFilter { project_tag: Some(project_tag.clone()), ..Default::default() };
    let mut observations = store.list_observations(&filter, RECENT_MEMORY_SCAN)?;
    observations.retain(|obs| matches!(obs.classification, Some(c) if c != Classification::Noise));
    observations.sort_by(|a, b| {
        let priority = |obs: &Observation| {
            let source = obs.source.to_string();
            PREFERRED_SOURCES.iter().position(|p| *p == source).unwrap_or(usize::MAX)
        };
        priority(a).cmp(&priority(b)).then(b.created_at.cmp(&a.created_at))
    });
    Ok(observations)
}

fn format_memory_line(obs: &Observation) -> String {
    let preview: String = laminark_types::normalize_whitespace(&obs.content)
        .chars()
        .take(MEMORY_CONTENT_PREVIEW)
        .collect();
    format!(
        "- [{}] {} ({}, {})",
        obs.short_id(),
        preview,
        obs.source,
        relative_time(obs.created_at)
    )
}

fn format_range(started_at: DateTime<Utc>, ended_at: Option<DateTime<Utc>>) -> String {
    match ended_at {
        Some(ended) => format!(
            "{}–{}",
            started_at.format("%Y-%m-%d %H:%M"),
            ended.format("%H:%M")
        ),
        None => started_at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn relative_time(at: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(at);
    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}

/// Deterministic, no-LLM session summary (§4.9): group observations by
/// `kind`, emit fixed sections in order, progressively trim to stay within
/// budget. Always includes `Duration` and `Observations` count.
pub fn summarize_session(session: &Session, observations: &[Observation]) -> String {
    let duration = match session.ended_at {
        Some(ended) => ended.signed_duration_since(session.started_at),
        None => Utc::now().signed_duration_since(session.started_at),
    };
    let header = format!(
        "Duration: {}m\nObservations: {}",
        duration.num_minutes().max(0),
        observations.len()
    );

    let sections: Vec<(&str, ObservationKind)> = vec![
        ("Changes", ObservationKind::Change),
        ("Decisions", ObservationKind::Decision),
        ("Verifications", ObservationKind::Verification),
        ("References", ObservationKind::Reference),
        ("Findings", ObservationKind::Finding),
    ];

    let mut bodies: Vec<(String, Vec<String>)> = sections
        .into_iter()
        .filter_map(|(title, kind)| {
            let lines: Vec<String> = observations
                .iter()
                .filter(|obs| obs.kind == kind)
                .take(SUMMARY_SECTION_CAP)
                .map(|obs| {
                    let preview: String = laminark_types::normalize_whitespace(&obs.content)
                        .chars()
                        .take(SUMMARY_LINE_PREVIEW)
                        .collect();
                    format!("- {preview}")
                })
                .collect();
            if lines.is_empty() {
                None
            } else {
                Some((format!("## {title}"), lines))
            }
        })
        .collect();

    loop {
        let assembled = render_summary(&header, &bodies);
        if assembled.len() <= SUMMARY_BUDGET || bodies.is_empty() {
            return if assembled.len() > SUMMARY_BUDGET {
                assembled.chars().take(SUMMARY_BUDGET).collect()
            } else {
                assembled
            };
        }
        if let Some((_, lines)) = bodies.last_mut() {
            if lines.pop().is_none() || lines.is_empty() {
                bodies.pop();
            }
        }
    }
}

fn render_summary(header: &str, bodies: &[(String, Vec<String>)]) -> String {
    let mut parts = vec![header.to_string()];
    for (title, lines) in bodies {
        parts.push(format!("{title}\n{}", lines.join("\n")));
    }
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use laminark_types::{ObservationSource, ProjectTag};
    use uuid::Uuid;

    fn obs(kind: ObservationKind, classification: Option<Classification>, content: &str) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            project_tag: ProjectTag::new("proj"),
            session_id: None,
            content: content.to_string(),
            title: None,
            source: ObservationSource::hook("Write"),
            kind,
            classification,
            classified_at: None,
            embedding: None,
            embedding_model: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn empty_store_yields_the_welcome_line() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        let context = assemble_context(&store, &project_tag).unwrap();
        assert_eq!(context, WELCOME_LINE);
    }

    #[test]
    fn noise_classified_observations_are_excluded_from_recent_memories() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        let mut noise = obs(ObservationKind::Change, Some(Classification::Noise), "build ok");
        noise.project_tag = project_tag.clone();
        store.create_observation(&noise).unwrap();

        let recent = high_value_observations(&store, &project_tag).unwrap();
        assert!(recent.is_empty());
    }

    #[test]
    fn summary_always_includes_duration_and_count() {
        let session = Session {
            id: Uuid::new_v4(),
            project_tag: ProjectTag::new("proj"),
            started_at: Utc::now() - chrono::Duration::minutes(30),
            ended_at: Some(Utc::now()),
            summary: None,
        };
        let observations = vec![obs(ObservationKind::Decision, Some(Classification::Discovery), "chose X")];
        let summary = summarize_session(&session, &observations);
        assert!(summary.contains("Duration:"));
        assert!(summary.contains("Observations: 1"));
        assert!(summary.contains("## Decisions"));
    }

    #[test]
    fn summary_stays_within_budget_with_many_observations() {
        let session = Session {
            id: Uuid::new_v4(),
            project_tag: ProjectTag::new("proj"),
            started_at: Utc::now() - chrono::Duration::hours(2),
            ended_at: Some(Utc::now()),
            summary: None,
        };
        let observations: Vec<Observation> = (0..200)
            .map(|i| obs(ObservationKind::Finding, Some(Classification::Discovery), &"x".repeat(140 + i % 5)))
            .collect();
        let summary = summarize_session(&session, &observations);
        assert!(summary.len() <= SUMMARY_BUDGET);
        assert!(summary.contains("Observations: 200"));
    }
}
