use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

/// Type of a JSON node found by the structure scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn new(start: usize, end: usize, kind: NodeType, children: Vec<ObjCoords>) -> Self {
        Self { start, end, kind, children }
    }

    /// The slice of `text` covered by this node.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Find all JSON object/array structures in the given text. Coordinates are byte indices.
#[instrument(target = "quizsmith::json", skip(text), fields(text_len = text.len()))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let bytes = text.as_bytes();
    let mut results: Vec<ObjCoords> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let closing = match b {
            b'"' => {
                in_string = true;
                None
            }
            b'{' => {
                stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() });
                None
            }
            b'[' => {
                stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() });
                None
            }
            b'}' => Some(NodeType::Object),
            b']' => Some(NodeType::Array),
            _ => None,
        };

        let Some(kind) = closing else { continue };
        match stack.pop() {
            Some(frame) if frame.kind == kind => {
                let node = ObjCoords::new(frame.start, i, kind, frame.children);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => results.push(node),
                }
            }
            Some(frame) => {
                // Unbalanced; drop the frame but keep what it enclosed.
                trace!(start = frame.start, at = i, "mismatched closing delimiter");
                match stack.last_mut() {
                    Some(parent) => parent.children.extend(frame.children),
                    None => results.extend(frame.children),
                }
            }
            None => {}
        }
    }

    // Delimiters that never closed (an emoticon in prose, say). Completed structures
    // inside them become roots; outer frames finished their children first.
    for frame in stack {
        trace!(start = frame.start, "unclosed delimiter");
        results.extend(frame.children);
    }

    debug!(count = results.len(), "found root structures");
    results
}

/// Deserialize the first root JSON structure in `raw` that matches `T`.
///
/// Nested structures are never considered, so a wrapped payload such as
/// `{"data": {...}}` does not match.
pub fn extract_root<T: DeserializeOwned>(raw: &str) -> Option<T> {
    find_json_structures(raw).iter().find_map(|node| {
        serde_json::from_str::<T>(node.slice(raw))
            .map_err(|e| trace!(error = %e, start = node.start, "root did not match"))
            .ok()
    })
}

/// Deserialize the first JSON structure in `raw` that matches `T`.
///
/// Roots are tried in order of appearance; when a root does not match, its children
/// are tried depth-first before moving on.
pub fn extract_first<T: DeserializeOwned>(raw: &str) -> Option<T> {
    fn visit<T: DeserializeOwned>(raw: &str, node: &ObjCoords) -> Option<T> {
        match serde_json::from_str::<T>(node.slice(raw)) {
            Ok(value) => Some(value),
            Err(e) => {
                trace!(error = %e, start = node.start, "structure did not match");
                node.children.iter().find_map(|child| visit(raw, child))
            }
        }
    }

    find_json_structures(raw)
        .iter()
        .find_map(|node| visit::<T>(raw, node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Envelope {
        questions: Vec<u32>,
    }

    #[test]
    fn finds_nested_structures() {
        let text = r#"intro {"a": [1, 2], "b": {"c": "}"}} outro [3]"#;
        let roots = find_json_structures(text);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].kind, NodeType::Object);
        assert_eq!(roots[0].children.len(), 2);
        assert_eq!(roots[1].slice(text), "[3]");
    }

    #[test]
    fn extracts_from_code_fence() {
        let raw = "Here you go:\n```json\n{\"questions\": [1, 2, 3]}\n```\nGood luck!";
        let env: Envelope = extract_first(raw).unwrap();
        assert_eq!(env.questions, vec![1, 2, 3]);
    }

    #[test]
    fn falls_back_to_nested_match() {
        let raw = r#"{"result": {"questions": [7]}}"#;
        let env: Envelope = extract_first(raw).unwrap();
        assert_eq!(env.questions, vec![7]);
    }

    #[test]
    fn root_extraction_ignores_wrapped_payloads() {
        assert!(extract_root::<Envelope>(r#"{"result": {"questions": [7]}}"#).is_none());
        let env: Envelope = extract_root("note [x] then {\"questions\": [1]}").unwrap();
        assert_eq!(env.questions, vec![1]);
    }

    #[test]
    fn unclosed_prose_brace_does_not_swallow_later_json() {
        let raw = "Sure :-{\n```json\n{\"questions\": [4]}\n```";
        let roots = find_json_structures(raw);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].slice(raw), "{\"questions\": [4]}");
        assert_eq!(extract_root::<Envelope>(raw).unwrap().questions, vec![4]);
    }

    #[test]
    fn mismatched_close_keeps_enclosed_structures() {
        let raw = r#"( [ {"questions": [2]} } tail"#;
        let roots = find_json_structures(raw);
        assert_eq!(roots.len(), 1);
        assert_eq!(extract_root::<Envelope>(raw).unwrap().questions, vec![2]);
    }

    #[test]
    fn missing_key_does_not_match() {
        assert!(extract_first::<Envelope>(r#"{"items": []}"#).is_none());
        assert!(extract_first::<Envelope>("plain text").is_none());
    }
}
