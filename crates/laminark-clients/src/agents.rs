use laminark_types::{ClassifierOutput, EntityCandidate, RelationshipCandidate};

use crate::extract::extract_json;
use crate::ports::LlmPort;
use crate::{Error, Result};

const CLASSIFIER_INSTRUCTIONS: &str = "You classify one tool-use observation from a coding \
session. Respond with a single JSON object: \
{\"signal\": \"signal\"|\"noise\", \"classification\": \"discovery\"|\"problem\"|\"solution\"|null, \
\"reason\": string, \"debug_signal\": {\"is_error\": bool, \"is_resolution\": bool, \
\"waypoint_hint\": string|null, \"confidence\": number}|null}. Output only the object.";

const ENTITY_INSTRUCTIONS: &str = "Extract named entities from the observation below. Valid \
types are exactly: project, file, decision, problem, solution, reference. Respond with a \
single JSON array of {\"name\": string, \"type\": string, \"confidence\": number in [0,1]}. \
Output only the array.";

const RELATIONSHIP_INSTRUCTIONS: &str = "Given the observation and the entity list below, infer \
relationships between entities. Valid types are exactly: related_to, solved_by, caused_by, \
modifies, informed_by, references, verified_by, preceded_by. Respond with a single JSON array \
of {\"source\": string, \"target\": string, \"type\": string, \"confidence\": number in [0,1]}. \
Output only the array.";

/// Calls the classifier agent (§4.10) for one observation's content and source.
pub fn classify(llm: &dyn LlmPort, content: &str, source: &str) -> Result<ClassifierOutput> {
    let user = format!("source: {source}\n\nobservation:\n{content}");
    let response = llm.complete(CLASSIFIER_INSTRUCTIONS, &user)?;
    let value = extract_json(&response)?;
    serde_json::from_value(value).map_err(|e| Error::SchemaViolation(e.to_string()))
}

/// Calls the entity-extraction agent (§4.10) over one observation's content.
/// Candidates of an out-of-taxonomy type fail to deserialize and are dropped
/// rather than aborting the whole batch — the write-quality gate downstream
/// only ever sees well-typed candidates.
pub fn extract_entities(llm: &dyn LlmPort, content: &str) -> Result<Vec<EntityCandidate>> {
    let response = llm.complete(ENTITY_INSTRUCTIONS, content)?;
    let value = extract_json(&response)?;
    let raw = value
        .as_array()
        .ok_or_else(|| Error::SchemaViolation("entity extraction response is not an array".into()))?;
    Ok(raw
        .iter()
        .filter_map(|item| serde_json::from_value::<EntityCandidate>(item.clone()).ok())
        .collect())
}

/// Calls the relationship-inference agent (§4.10). Only called once at least
/// two entities have survived the write-quality gate.
pub fn infer_relationships(
    llm: &dyn LlmPort,
    content: &str,
    entities: &[EntityCandidate],
) -> Result<Vec<RelationshipCandidate>> {
    let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    let user = format!("observation:\n{content}\n\nentities: {}", names.join(", "));
    let response = llm.complete(RELATIONSHIP_INSTRUCTIONS, &user)?;
    let value = extract_json(&response)?;
    let raw = value.as_array().ok_or_else(|| {
        Error::SchemaViolation("relationship inference response is not an array".into())
    })?;
    Ok(raw
        .iter()
        .filter_map(|item| serde_json::from_value::<RelationshipCandidate>(item.clone()).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct ScriptedLlm {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<&str>) -> Self {
            Self { responses: Mutex::new(responses.into_iter().map(String::from).collect()) }
        }
    }

    impl LlmPort for ScriptedLlm {
        fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    #[test]
    fn classify_parses_a_signal_with_classification() {
        let llm = ScriptedLlm::new(vec![
            r#"{"signal": "signal", "classification": "decision", "reason": "picked approach A"}"#,
        ]);
        let result = classify(&llm, "we decided to use approach A", "hook:Write").unwrap();
        assert_eq!(result.signal, laminark_types::Signal::Signal);
        assert!(result.debug_signal.is_none());
    }

    #[test]
    fn classify_tolerates_a_fenced_response() {
        let llm = ScriptedLlm::new(vec!["```json\n{\"signal\": \"noise\", \"classification\": null, \"reason\": \"build output\"}\n```"]);
        let result = classify(&llm, "npm install done", "hook:Bash").unwrap();
        assert_eq!(result.signal, laminark_types::Signal::Noise);
        assert!(result.classification.is_none());
    }

    #[test]
    fn classify_rejects_an_unparseable_response() {
        let llm = ScriptedLlm::new(vec!["not json at all"]);
        assert!(matches!(classify(&llm, "x", "hook:Write"), Err(Error::NoJsonFound)));
    }

    #[test]
    fn extract_entities_drops_an_out_of_taxonomy_type() {
        let llm = ScriptedLlm::new(vec![
            r#"[{"name": "auth.rs", "type": "file", "confidence": 0.97}, {"name": "bogus", "type": "widget", "confidence": 0.9}]"#,
        ]);
        let entities = extract_entities(&llm, "edited auth.rs").unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "auth.rs");
    }

    #[test]
    fn infer_relationships_drops_an_out_of_taxonomy_relation_type() {
        let llm = ScriptedLlm::new(vec![
            r#"[{"source": "a", "target": "b", "type": "related_to", "confidence": 0.8}, {"source": "a", "target": "c", "type": "bogus_relation", "confidence": 0.8}]"#,
        ]);
        let entities = vec![
            EntityCandidate { name: "a".into(), entity_type: laminark_types::NodeType::Decision, confidence: 0.8 },
            EntityCandidate { name: "b".into(), entity_type: laminark_types::NodeType::Solution, confidence: 0.8 },
        ];
        let edges = infer_relationships(&llm, "text", &entities).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relation_type, laminark_types::EdgeType::RelatedTo);
    }
}
