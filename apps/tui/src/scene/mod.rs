// Retained SVG scene graph
// The drawing surface a flow map mutates in place

use std::fmt::Write as _;

/// Handle to an element of a [`Scene`]. Handles of removed elements stay
/// valid to hold but every operation on them is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    fn new(tag: &str, parent: Option<ElementId>) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }
}

/// An svg document held in memory: an arena of elements under one `<svg>`
/// root. Attribute order is insertion order.
#[derive(Debug, Clone)]
pub struct Scene {
    slots: Vec<Option<Element>>,
    root: ElementId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut root = Element::new("svg", None);
        root.attributes
            .push(("xmlns".to_string(), "http://www.w3.org/2000/svg".to_string()));
        Self {
            slots: vec![Some(root)],
            root: ElementId(0),
        }
    }

    pub const fn root(&self) -> ElementId {
        self.root
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live elements, the root included.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Appends a new `tag` element under `parent`. Returns `None` when the
    /// parent no longer exists.
    pub fn append(&mut self, parent: ElementId, tag: &str) -> Option<ElementId> {
        if !self.contains(parent) {
            return None;
        }
        let id = ElementId(self.slots.len());
        self.slots.push(Some(Element::new(tag, Some(parent))));
        self.get_mut(parent)?.children.push(id);
        Some(id)
    }

    /// Sets or replaces an attribute. Returns false when the element is gone.
    pub fn set_attr(&mut self, id: ElementId, name: &str, value: impl ToString) -> bool {
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        let value = value.to_string();
        if let Some(slot) = element.attributes.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value;
        } else {
            element.attributes.push((name.to_string(), value));
        }
        true
    }

    pub fn attr(&self, id: ElementId, name: &str) -> Option<&str> {
        self.get(id)?.attr(name)
    }

    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) -> bool {
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        element.text = Some(text.into());
        true
    }

    /// Removes an element and its whole subtree. The root cannot be removed.
    pub fn remove(&mut self, id: ElementId) -> bool {
        if id == self.root {
            return false;
        }
        let Some(parent) = self.get(id).map(|element| element.parent) else {
            return false;
        };
        if let Some(parent) = parent.and_then(|parent| self.get_mut(parent)) {
            parent.children.retain(|child| *child != id);
        }
        self.drop_subtree(id);
        true
    }

    /// Removes every child of `id`, keeping `id` itself.
    pub fn clear_children(&mut self, id: ElementId) {
        let children = match self.get_mut(id) {
            Some(element) => std::mem::take(&mut element.children),
            None => return,
        };
        for child in children {
            self.drop_subtree(child);
        }
    }

    fn drop_subtree(&mut self, id: ElementId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(element) = self.slots.get_mut(next.0).and_then(Option::take) {
                pending.extend(element.children);
            }
        }
    }

    /// Live elements whose `class` attribute contains `class`, in document order.
    pub fn find_by_class(&self, class: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        self.walk(self.root, &mut |id, element| {
            if element
                .attr("class")
                .is_some_and(|value| value.split_whitespace().any(|c| c == class))
            {
                found.push(id);
            }
        });
        found
    }

    fn walk<F>(&self, id: ElementId, visit: &mut F)
    where
        F: FnMut(ElementId, &Element),
    {
        let Some(element) = self.get(id) else {
            return;
        };
        visit(id, element);
        for child in &element.children {
            self.walk(*child, visit);
        }
    }

    /// Serializes the document.
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        self.write_element(self.root, &mut out);
        out
    }

    fn write_element(&self, id: ElementId, out: &mut String) {
        let Some(element) = self.get(id) else {
            return;
        };
        let _ = write!(out, "<{}", element.tag);
        for (name, value) in &element.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape_xml(value));
        }
        if element.children.is_empty() && element.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &element.text {
            out.push_str(&escape_xml(text));
        }
        for child in &element.children {
            self.write_element(*child, out);
        }
        let _ = write!(out, "</{}>", element.tag);
    }
}

pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_and_serializes_in_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.append(root, "g").unwrap_or(root);
        scene.set_attr(group, "class", "layer");
        let text = scene.append(group, "text").unwrap_or(group);
        scene.set_attr(text, "x", 10);
        scene.set_text(text, "A & B");

        assert_eq!(
            scene.to_svg(),
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><g class=\"layer\"><text x=\"10\">A &amp; B</text></g></svg>"
        );
    }

    #[test]
    fn set_attr_replaces_existing_value() {
        let mut scene = Scene::new();
        let root = scene.root();
        let circle = scene.append(root, "circle").unwrap_or(root);
        scene.set_attr(circle, "cx", 1);
        scene.set_attr(circle, "cx", 2);
        assert_eq!(scene.attr(circle, "cx"), Some("2"));
        assert_eq!(scene.get(circle).map(|e| e.attributes().count()), Some(1));
    }

    #[test]
    fn removing_a_subtree_invalidates_its_handles() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.append(root, "g").unwrap_or(root);
        let child = scene.append(group, "circle").unwrap_or(root);

        assert!(scene.remove(group));
        assert!(!scene.contains(child));
        assert!(!scene.set_attr(child, "cx", 5));
        assert!(scene.append(group, "rect").is_none());
        assert!(scene.is_empty());
        assert!(!scene.remove(root));
    }

    #[test]
    fn clear_children_keeps_the_parent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.append(root, "g").unwrap_or(root);
        scene.append(group, "path");
        scene.append(group, "path");

        scene.clear_children(group);

        assert!(scene.contains(group));
        assert_eq!(scene.get(group).map(|e| e.children().len()), Some(0));
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn finds_elements_by_class_token() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.append(root, "g").unwrap_or(root);
        scene.set_attr(a, "class", "flow-connection active");
        let b = scene.append(root, "g").unwrap_or(root);
        scene.set_attr(b, "class", "flow-connection-extra");

        assert_eq!(scene.find_by_class("flow-connection"), vec![a]);
    }
}
