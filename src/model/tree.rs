use glam::Vec3;
use log::trace;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::model::annotation::Annotation;
use crate::model::types::{BoundingBox, LoadedModel, ModelNode};
use crate::model::{PATH_SEPARATOR, ValidationError, child_path};

/// Handle into a [`ModelTree`]. Ids are never reused, so a handle to a disposed node stays invalid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    EntityAdded { child: NodeId },
    EntityRemoved { child: NodeId },
    PositionChanged { position: Vec3 },
    MetadataChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// The node that has been mutated, for structural changes that's the group.
    pub node: NodeId,
    pub change: ChangeKind,
}

#[derive(Debug)]
struct TreeSlot {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    node: ModelNode,
}

/// An arena of [`ModelNode`]s. Every mutation goes through the tree, which publishes exactly one
/// [`ChangeEvent`] per mutation on its shared channel. Observing the tree thus observes every
/// group in it, use [`ModelTree::is_within`] to narrow events down to a subtree.
#[derive(Debug)]
pub struct ModelTree {
    slots: Vec<Option<TreeSlot>>,
    root: NodeId,
    subscribers: Vec<UnboundedSender<ChangeEvent>>,
}

impl ModelTree {
    pub fn new(root: LoadedModel) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            root: NodeId(0),
            subscribers: Vec::new(),
        };
        tree.root = tree.insert(root);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Creates a detached subtree. Nothing is published until it is added to a group.
    pub fn insert(&mut self, model: LoadedModel) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Some(TreeSlot {
            parent: None,
            children: Vec::with_capacity(model.children.len()),
            node: model.node,
        }));

        for child in model.children {
            let child_id = self.insert(child);
            if let Some(slot) = self.slot_mut(child_id) {
                slot.parent = Some(id);
            }
            if let Some(slot) = self.slot_mut(id) {
                slot.children.push(child_id);
            }
        }

        id
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<ChangeEvent> {
        let (sender, receiver) = unbounded_channel();
        self.subscribers.push(sender);
        receiver
    }

    fn publish(&mut self, node: NodeId, change: ChangeKind) {
        trace!("{:?}: {:?}", node, change);
        let event = ChangeEvent { node, change };
        // dropped receivers unsubscribe implicitly
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn slot(&self, id: NodeId) -> Option<&TreeSlot> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut TreeSlot> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&ModelNode> {
        self.slot(id).map(|slot| &slot.node)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|slot| slot.children.as_slice()).unwrap_or_default()
    }

    fn is_group(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.content.is_group())
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Adds `child` to `group`, moving it away from a previous parent.
    /// Returns false without changing anything when `child` is already a child of `group`, when
    /// `group` is no group, when a child of `group` already has the identifier of `child` or when
    /// the move would create a cycle.
    pub fn add_model(&mut self, group: NodeId, child: NodeId) -> bool {
        if !self.is_group(group) || self.is_within(group, child) {
            return false;
        }
        let Some(identifier) = self.node(child).map(|node| node.identifier.as_str()) else {
            return false;
        };

        let previous_parent = self.parent(child);
        if previous_parent == Some(group) {
            return false;
        }
        if self.child_named(group, identifier).is_some() {
            trace!("{:?} already has a child called {}", group, identifier);
            return false;
        }

        if let Some(previous_parent) = previous_parent {
            if let Some(slot) = self.slot_mut(previous_parent) {
                slot.children.retain(|&id| id != child);
            }
            self.publish(previous_parent, ChangeKind::EntityRemoved { child });
        }

        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(group);
        }
        if let Some(slot) = self.slot_mut(group) {
            slot.children.push(child);
        }
        self.publish(group, ChangeKind::EntityAdded { child });
        true
    }

    /// Removes and disposes `child` with all of its descendants. Returns false if `child` is not a
    /// child of `group`.
    pub fn remove_model(&mut self, group: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(group) {
            return false;
        }

        if let Some(slot) = self.slot_mut(group) {
            slot.children.retain(|&id| id != child);
        }
        self.dispose(child);
        self.publish(group, ChangeKind::EntityRemoved { child });
        true
    }

    fn dispose(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.0).and_then(Option::take) {
            for child in slot.children {
                self.dispose(child);
            }
        }
    }

    /// Moves the child at index `from` to index `to`.
    pub fn reorder(&mut self, group: NodeId, from: usize, to: usize) -> bool {
        let Some(slot) = self.slot_mut(group) else {
            return false;
        };
        if from >= slot.children.len() || to >= slot.children.len() {
            return false;
        }
        if from == to {
            return true;
        }

        let moved = slot.children.remove(from);
        slot.children.insert(to, moved);
        self.publish(group, ChangeKind::MetadataChanged);
        true
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.node.position = position;
        self.publish(id, ChangeKind::PositionChanged { position });
        true
    }

    pub fn set_comment(&mut self, id: NodeId, comment: String) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.node.comment = comment;
        self.publish(id, ChangeKind::MetadataChanged);
        true
    }

    fn child_named(&self, group: NodeId, identifier: &str) -> Option<NodeId> {
        self.children(group)
            .iter()
            .copied()
            .find(|&child| self.node(child).is_some_and(|node| node.identifier == identifier))
    }

    /// Identifiers form the node paths, so they must be non-empty, free of the path separator and
    /// unique among their siblings.
    pub fn rename(&mut self, id: NodeId, identifier: String) -> Result<(), ValidationError> {
        if !self.contains(id) {
            return Err(ValidationError::UnknownNode);
        }
        if identifier.is_empty() {
            return Err(ValidationError::EmptyIdentifier);
        }
        if identifier.contains(PATH_SEPARATOR) {
            return Err(ValidationError::SeparatorInIdentifier(identifier));
        }
        if let Some(parent) = self.parent(id) {
            if self.child_named(parent, &identifier).is_some_and(|sibling| sibling != id) {
                return Err(ValidationError::DuplicateIdentifier(identifier));
            }
        }

        if let Some(slot) = self.slot_mut(id) {
            slot.node.identifier = identifier;
        }
        self.publish(id, ChangeKind::MetadataChanged);
        Ok(())
    }

    pub fn add_annotation(&mut self, id: NodeId, annotation: Annotation) -> Result<(), ValidationError> {
        let slot = self.slot_mut(id).ok_or(ValidationError::UnknownNode)?;
        slot.node.attach_annotation(annotation)?;
        self.publish(id, ChangeKind::MetadataChanged);
        Ok(())
    }

    pub fn remove_annotation(&mut self, id: NodeId, identifier: &str) -> Option<Annotation> {
        let slot = self.slot_mut(id)?;
        let idx = slot
            .node
            .annotations
            .iter()
            .position(|annotation| annotation.identifier() == identifier)?;
        let removed = slot.node.annotations.remove(idx);
        self.publish(id, ChangeKind::MetadataChanged);
        Some(removed)
    }

    pub fn rename_annotation(&mut self, id: NodeId, identifier: &str, new_identifier: String) -> Result<(), ValidationError> {
        let slot = self.slot_mut(id).ok_or(ValidationError::UnknownNode)?;
        if new_identifier.is_empty() {
            return Err(ValidationError::EmptyIdentifier);
        }
        if identifier != new_identifier && slot.node.annotation(&new_identifier).is_some() {
            return Err(ValidationError::DuplicateAnnotation(new_identifier));
        }

        let annotation = slot
            .node
            .annotations
            .iter_mut()
            .find(|annotation| annotation.identifier() == identifier)
            .ok_or_else(|| ValidationError::UnknownAnnotation(identifier.to_string()))?;
        annotation.set_identifier(new_identifier);
        self.publish(id, ChangeKind::MetadataChanged);
        Ok(())
    }

    /// The manifest path of `id`, `None` for detached or disposed nodes.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut identifiers = Vec::new();
        let mut current = id;
        while current != self.root {
            let slot = self.slot(current)?;
            identifiers.push(slot.node.identifier.as_str());
            current = slot.parent?;
        }

        Some(
            identifiers
                .iter()
                .rev()
                .fold(String::new(), |path, identifier| child_path(&path, identifier)),
        )
    }

    /// The key of `id` in a manifest. That's [`ModelTree::path_of`], except for a tree made from a
    /// single file: its root leaf is stored and loaded under its own identifier.
    pub fn manifest_path(&self, id: NodeId) -> Option<String> {
        let path = self.path_of(id)?;
        match self.node(id) {
            Some(node) if path.is_empty() && !node.content.is_group() => Some(node.identifier.clone()),
            _ => Some(path),
        }
    }

    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(self.root);
        }

        path.split(PATH_SEPARATOR)
            .try_fold(self.root, |current, identifier| self.child_named(current, identifier))
    }

    /// Pre-order walk of `id` and all of its descendants.
    pub fn depth_first(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            order.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        order
    }

    /// Sum of the positions of `id` and all of its ancestors.
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        let mut position = Vec3::ZERO;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|current| self.slot(current)) {
            position += node.node.position;
            current = node.parent;
        }
        position
    }

    /// World space bounds of `id` and all of its descendants, `None` if nothing has geometry.
    pub fn bounding_box(&self, id: NodeId) -> Option<BoundingBox> {
        let offset = self.world_position(id) - self.node(id)?.position;
        self.subtree_bounds(id).map(|bounds| bounds.translated(offset))
    }

    /// Bounds in the space of the parent of `id`.
    fn subtree_bounds(&self, id: NodeId) -> Option<BoundingBox> {
        let slot = self.slot(id)?;
        let own = slot.node.content.bounds();
        let combined = slot
            .children
            .iter()
            .filter_map(|&child| self.subtree_bounds(child))
            .fold(own, |acc, bounds| match acc {
                Some(acc) => Some(acc.union(&bounds)),
                None => Some(bounds),
            });
        combined.map(|bounds| bounds.translated(slot.node.position))
    }

    /// Annotations owned by `id` and its visual descendants; groups are traversed, auxiliary
    /// leaves like material libraries are not.
    pub fn collect_annotations(&self, id: NodeId) -> Vec<(NodeId, &Annotation)> {
        let mut collected = Vec::new();
        for node_id in self.depth_first(id) {
            let Some(node) = self.node(node_id) else {
                continue;
            };
            if node_id != id && !node.content.is_group() && !node.is_visual() {
                continue;
            }
            collected.extend(node.annotations.iter().map(|annotation| (node_id, annotation)));
        }
        collected
    }

    /// Copies `id` and its descendants out of the arena.
    pub fn snapshot(&self, id: NodeId) -> Option<LoadedModel> {
        let slot = self.slot(id)?;
        Some(LoadedModel {
            node: slot.node.clone(),
            children: slot
                .children
                .iter()
                .filter_map(|&child| self.snapshot(child))
                .collect(),
        })
    }
}
