//! Namespace lookup by ASL path.
//!
//! Paths are resolved statically, from the declarations in the tree: each
//! namespace object's absolute path is its enclosing scope's path extended
//! by the NameString it declares. `If`, `Else` and `While` bodies belong to
//! the enclosing scope. There is no upward search for single-segment names.

use alloc::vec::Vec;

use crate::error::AmlError;
use crate::name::{NameSeg, NameString, aml_name_from_asl};
use crate::tree::{AmlTree, IterMode, NodeId, NodeKind};

/// Absolute namespace path as a list of segments; empty for `\`.
type Path = Vec<NameSeg>;

impl AmlTree {
    /// Finds the namespace object named by `asl_path`.
    ///
    /// `reference` is the root or a namespace object; relative paths (with
    /// or without `^` prefixes) resolve from its absolute path. `\` names
    /// the root. When several declarations share a path (for example two
    /// `Scope` blocks), the first in table order wins.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `reference` is neither the
    /// root nor a namespace object, [`AmlError::InvalidNameString`] for a
    /// malformed path, or [`AmlError::NotFound`].
    pub fn find(&self, reference: NodeId, asl_path: &str) -> Result<NodeId, AmlError> {
        let base = if reference == self.root() {
            Path::new()
        } else {
            self.object(reference)?
                .declared_name_index()
                .ok_or(AmlError::InvalidArgument)?;
            self.absolute_path(reference)?
        };

        let encoded = aml_name_from_asl(asl_path)?;
        let name = NameString::parse_exact(&encoded)?;
        let target = resolve(&base, name).ok_or(AmlError::NotFound)?;
        if target.is_empty() {
            return Ok(self.root());
        }

        for node in self.cursor(self.root(), IterMode::Linear) {
            let declares = self
                .node(node)?
                .as_object()
                .is_some_and(|object| object.declared_name_index().is_some());
            if declares && self.absolute_path(node).is_ok_and(|path| path == target) {
                return Ok(node);
            }
        }
        crate::aml_debug!("aml: {asl_path} not found");
        Err(AmlError::NotFound)
    }

    /// Absolute path of a namespace object.
    fn absolute_path(&self, node: NodeId) -> Result<Path, AmlError> {
        let object = self.object(node)?;
        let index = object.declared_name_index().ok_or(AmlError::InvalidArgument)?;
        let name_node = object.fixed_arg(index).ok_or(AmlError::NotFound)?;
        let name = NameString::parse_exact(self.data(name_node)?.bytes())?;
        let scope = match self.enclosing_scope(node) {
            Some(scope) => self.absolute_path(scope)?,
            None => Path::new(),
        };
        resolve(&scope, name).ok_or(AmlError::NotFound)
    }

    /// Nearest ancestor that opens a scope, `None` for the root scope.
    fn enclosing_scope(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.parent(node)?;
        loop {
            match &self.node(current).ok()?.kind {
                NodeKind::Object(object) if object.opens_scope() => return Some(current),
                NodeKind::Object(_) => current = self.parent(current)?,
                _ => return None,
            }
        }
    }
}

/// Applies `name` to the scope `base`; `None` if `^` climbs past the root.
fn resolve(base: &[NameSeg], name: NameString<'_>) -> Option<Path> {
    let mut path = Path::new();
    if !name.is_absolute() {
        let keep = base.len().checked_sub(name.parent_prefixes())?;
        path.extend_from_slice(&base[..keep]);
    }
    path.extend(name.segments());
    Some(path)
}
