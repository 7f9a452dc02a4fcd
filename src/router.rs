use crate::PATH_SEPARATOR;
use crate::error::{EngineBuildError, RouteError};
use crate::types::Operation;
use http::Method;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Path variables captured while routing, keyed by name. Values are the raw
/// segments; the parameter codec decodes them after splitting.
pub type PathParams = HashMap<String, String>;

/// Operation resolved for a request, with the path variables it captured.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub operation: Arc<Operation>,
    pub path_params: PathParams,
}

/// A node in the path routing tree.
///
/// Static children are tried before variable ones, so `/pets/mine` wins over
/// `/pets/{id}` for the request `/pets/mine`.
#[derive(Debug, Default)]
struct PathNode {
    statics: HashMap<String, PathNode>,
    variables: Vec<(String, PathNode)>,
    operations: HashMap<Method, Arc<Operation>>,
}

impl PathNode {
    fn variable_child(&mut self, name: &str) -> &mut PathNode {
        let index = match self.variables.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.variables.push((name.to_string(), PathNode::default()));
                self.variables.len() - 1
            }
        };
        &mut self.variables[index].1
    }
}

enum Lookup<'r> {
    Found(&'r Arc<Operation>, PathParams),
    WrongMethod,
    Missing,
}

enum TemplateSegment<'t> {
    Static(&'t str),
    Variable(&'t str),
}

fn split_path_segments(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn parse_template_segment<'t>(
    template: &str,
    segment: &'t str,
) -> Result<TemplateSegment<'t>, EngineBuildError> {
    match segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(name) if !name.is_empty() && !name.contains(['{', '}']) => {
            Ok(TemplateSegment::Variable(name))
        }
        Some(_) => Err(EngineBuildError::invalid_path_template(&format!(
            "{} has an empty or nested variable",
            template
        ))),
        None if segment.contains(['{', '}']) => Err(EngineBuildError::invalid_path_template(
            &format!("{} mixes a variable with literal text in '{}'", template, segment),
        )),
        None => Ok(TemplateSegment::Static(segment)),
    }
}

/// Resolves a request method and path to the operation that declares it.
#[derive(Debug, Default)]
pub struct OperationRouter {
    root: PathNode,
    /// Path portions of every declared server url, longest first.
    base_paths: Vec<String>,
    len: usize,
}

impl OperationRouter {
    pub fn new<I>(operations: I) -> Result<Self, EngineBuildError>
    where
        I: IntoIterator<Item = Arc<Operation>>,
    {
        let mut router = OperationRouter::default();
        let mut base_paths = BTreeSet::new();
        for operation in operations {
            base_paths.extend(
                operation
                    .servers
                    .iter()
                    .filter_map(|server| server.base_path()),
            );
            router.insert(operation)?;
        }
        router.base_paths = base_paths.into_iter().collect();
        router
            .base_paths
            .sort_by_key(|base| std::cmp::Reverse(base.len()));
        Ok(router)
    }

    fn insert(&mut self, operation: Arc<Operation>) -> Result<(), EngineBuildError> {
        let method = Method::from_bytes(operation.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| {
                EngineBuildError::invalid_path_template(&format!(
                    "{} {}: {}",
                    operation.method, operation.path, e
                ))
            })?;

        let mut node = &mut self.root;
        for segment in split_path_segments(&operation.path) {
            node = match parse_template_segment(&operation.path, segment)? {
                TemplateSegment::Static(literal) => {
                    node.statics.entry(literal.to_string()).or_default()
                }
                TemplateSegment::Variable(name) => node.variable_child(name),
            };
        }

        if node.operations.contains_key(&method) {
            return Err(EngineBuildError::DuplicateOperation {
                method: method.to_string(),
                path: operation.path.clone(),
            });
        }
        node.operations.insert(method, operation);
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finds the operation for `method` and `path`.
    ///
    /// When the bare path matches nothing, each server base path that prefixes
    /// it is stripped and the remainder routed again.
    pub fn route(&self, method: &Method, path: &str) -> Result<RouteMatch, RouteError> {
        let mut wrong_method = false;
        let candidates = std::iter::once(path).chain(
            self.base_paths
                .iter()
                .filter_map(|base| strip_base_path(path, base)),
        );
        for candidate in candidates {
            let segments = split_path_segments(candidate);
            match Self::lookup(&self.root, &segments, method, PathParams::new()) {
                Lookup::Found(operation, path_params) => {
                    log::debug!("Routed {} {} to '{}'", method, path, operation.id);
                    return Ok(RouteMatch {
                        operation: operation.clone(),
                        path_params,
                    });
                }
                Lookup::WrongMethod => wrong_method = true,
                Lookup::Missing => {}
            }
        }

        log::debug!("No route for {} {}", method, path);
        if wrong_method {
            Err(RouteError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
            })
        } else {
            Err(RouteError::PathNotFound(path.to_string()))
        }
    }

    fn lookup<'r>(
        node: &'r PathNode,
        segments: &[&str],
        method: &Method,
        mut captured: PathParams,
    ) -> Lookup<'r> {
        let Some((current, rest)) = segments.split_first() else {
            return match node.operations.get(method) {
                Some(operation) => Lookup::Found(operation, captured),
                None if node.operations.is_empty() => Lookup::Missing,
                None => Lookup::WrongMethod,
            };
        };

        let mut outcome = Lookup::Missing;
        if let Some(child) = node.statics.get(*current) {
            match Self::lookup(child, rest, method, captured.clone()) {
                found @ Lookup::Found(..) => return found,
                other => outcome = other,
            }
        }
        for (name, child) in &node.variables {
            captured.insert(name.clone(), current.to_string());
            match Self::lookup(child, rest, method, captured.clone()) {
                found @ Lookup::Found(..) => return found,
                Lookup::WrongMethod => outcome = Lookup::WrongMethod,
                Lookup::Missing => {}
            }
            captured.remove(name);
        }
        outcome
    }
}

fn strip_base_path<'p>(path: &'p str, base: &str) -> Option<&'p str> {
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with(PATH_SEPARATOR) {
        Some(rest)
    } else {
        None
    }
}
