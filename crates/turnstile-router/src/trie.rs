use std::collections::HashMap;

/// The routing trie. Maps request paths + methods to the value registered
/// for the matching path template.
#[derive(Debug)]
pub struct Router<T> {
    root: Node<T>,
    len: usize,
}

/// A single node in the prefix trie.
#[derive(Debug)]
struct Node<T> {
    /// Static children keyed by segment text.
    static_children: HashMap<String, Node<T>>,
    /// Single-segment parameter child (`{id}`).
    param_child: Option<Box<Node<T>>>,
    /// Greedy child (`{path+}`); always terminal.
    wildcard_child: Option<Box<Node<T>>>,
    /// Method-to-endpoint mapping at this terminal node.
    methods: HashMap<String, Endpoint<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            static_children: HashMap::new(),
            param_child: None,
            wildcard_child: None,
            methods: HashMap::new(),
        }
    }
}

/// What a template registers at its terminal node.
///
/// Parameter names live here rather than on the trie nodes, so `/pets/{id}`
/// and `/pets/{petId}/toys` can share the parameter node and still report
/// their own names.
#[derive(Debug)]
struct Endpoint<T> {
    value: T,
    param_names: Vec<String>,
}

/// The result of a route lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum RouteMatch<'a, T> {
    /// Matched a path and method.
    Found {
        value: &'a T,
        /// Captured `(name, decoded value)` pairs in template order.
        params: Vec<(String, String)>,
    },
    /// Path matched but method is not allowed.
    MethodNotAllowed { allowed: Vec<String> },
    /// No path matched.
    NotFound,
}

/// A parsed path template segment.
#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard(String),
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }
}

impl<T> Router<T> {
    /// Create a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (template, method) pairs registered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a route into the trie.
    ///
    /// `template` is a contract path like "/users/{id}/orders". Registering
    /// the same template and method twice replaces the earlier value.
    pub fn insert(&mut self, template: &str, method: &str, value: T) {
        let segments = parse_path_template(template);
        let param_names = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) | Segment::Wildcard(name) => Some(name.clone()),
                Segment::Static(_) => None,
            })
            .collect();

        let node = traverse_or_create(&mut self.root, &segments);
        let previous = node.methods.insert(
            method.to_uppercase(),
            Endpoint { value, param_names },
        );
        if previous.is_none() {
            self.len += 1;
        }
    }

    /// Look up an actual request path (not a template) and method.
    pub fn lookup(&self, path: &str, method: &str) -> RouteMatch<'_, T> {
        let normalized = normalize_path(path);
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

        let mut captured = Vec::new();
        let Some(node) = traverse_and_match(&self.root, &segments, &mut captured) else {
            return RouteMatch::NotFound;
        };

        if let Some(endpoint) = node.methods.get(&method.to_uppercase()) {
            let params = endpoint
                .param_names
                .iter()
                .cloned()
                .zip(captured.iter().map(|raw| percent_decode(raw)))
                .collect();
            RouteMatch::Found {
                value: &endpoint.value,
                params,
            }
        } else {
            let mut allowed: Vec<String> = node.methods.keys().cloned().collect();
            allowed.sort();
            RouteMatch::MethodNotAllowed { allowed }
        }
    }
}

fn traverse_or_create<'a, T>(root: &'a mut Node<T>, segments: &[Segment]) -> &'a mut Node<T> {
    let mut current = root;
    for segment in segments {
        current = match segment {
            Segment::Static(text) => current.static_children.entry(text.clone()).or_default(),
            Segment::Param(_) => current.param_child.get_or_insert_with(Box::default),
            Segment::Wildcard(_) => current.wildcard_child.get_or_insert_with(Box::default),
        };
    }
    current
}

/// Walk the trie matching request segments, capturing raw parameter text.
///
/// Only nodes that have at least one method count as a match, so a dead-end
/// static branch falls back to parameter and wildcard siblings.
fn traverse_and_match<'a, T>(
    node: &'a Node<T>,
    segments: &[&str],
    captured: &mut Vec<String>,
) -> Option<&'a Node<T>> {
    let Some((segment, remaining)) = segments.split_first() else {
        return (!node.methods.is_empty()).then_some(node);
    };

    if let Some(child) = node.static_children.get(*segment) {
        if let Some(found) = traverse_and_match(child, remaining, captured) {
            return Some(found);
        }
    }

    if let Some(param_child) = &node.param_child {
        captured.push((*segment).to_string());
        if let Some(found) = traverse_and_match(param_child, remaining, captured) {
            return Some(found);
        }
        captured.pop();
    }

    if let Some(wildcard_child) = &node.wildcard_child {
        if !wildcard_child.methods.is_empty() {
            captured.push(segments.join("/"));
            return Some(wildcard_child);
        }
    }

    None
}

fn parse_path_template(template: &str) -> Vec<Segment> {
    template
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(inner) => match inner.strip_suffix('+') {
                Some(base) => Segment::Wildcard(base.to_string()),
                None => Segment::Param(inner.to_string()),
            },
            None => Segment::Static(s.to_string()),
        })
        .collect()
}

/// Normalize a request path: strip trailing slashes, collapse double slashes.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut prev_slash = false;

    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                normalized.push('/');
            }
            prev_slash = true;
        } else {
            normalized.push(ch);
            prev_slash = false;
        }
    }

    // Keep root "/"
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized
    }
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim; invalid UTF-8
/// is replaced rather than rejected.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
