use crate::document::{Document, ElementInfo};
use crate::dom::element::{ElementNode, normalize_whitespace};
use crate::dom::query::{self, AttrOp, Combinator, ComplexSelector, Compound, Filter, Predicate, Query, Step, XPath};
use crate::error::{HealError, Result};
use crate::locator::ElementHandle;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError, RwLock};

/// In-memory document: a captured element tree that answers locator queries
/// the same way a live page would
#[derive(Debug)]
pub struct DomSnapshot {
    root: RwLock<ElementNode>,
    key_presses: Mutex<Vec<(ElementHandle, String)>>,
}

impl DomSnapshot {
    /// Create a snapshot rooted at `root` (usually `body`)
    pub fn new(root: ElementNode) -> Self {
        Self { root: RwLock::new(root), key_presses: Mutex::new(Vec::new()) }
    }

    /// Load a snapshot from the JSON form of an [`ElementNode`] tree
    pub fn from_json(json: &str) -> Result<Self> {
        let root: ElementNode = serde_json::from_str(json)
            .map_err(|e| HealError::DomParseFailed(format!("Failed to parse DOM JSON: {}", e)))?;
        Ok(Self::new(root))
    }

    /// Serialise the current tree to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.read_root())
            .map_err(|e| HealError::DomParseFailed(format!("Failed to serialize DOM to JSON: {}", e)))
    }

    /// Copy of the current tree
    pub fn root(&self) -> ElementNode {
        self.read_root().clone()
    }

    /// Keys pressed so far, with the handle that had focus
    pub fn key_presses(&self) -> Vec<(ElementHandle, String)> {
        self.key_presses.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn read_root(&self) -> std::sync::RwLockReadGuard<'_, ElementNode> {
        self.root.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Evaluate an expression against the current tree
    pub fn select(&self, selector: &str) -> Result<Vec<ElementInfo>> {
        let parsed = query::parse(selector)?;
        let root = self.read_root();
        let arena = Arena::build(&root);
        Ok(arena.evaluate(&parsed.query, parsed.nth).into_iter().map(|i| arena.describe(i)).collect())
    }

    /// Child-position path of the element a handle points at
    fn resolve_path(&self, handle: &ElementHandle) -> Result<(Vec<usize>, bool)> {
        let parsed = query::parse(&handle.selector)?;
        let root = self.read_root();
        let arena = Arena::build(&root);
        let matches = arena.evaluate(&parsed.query, parsed.nth);
        let index = *matches.get(handle.nth).ok_or_else(|| {
            HealError::ElementNotFound(format!(
                "'{}' has {} matches, wanted index {}",
                handle.selector,
                matches.len(),
                handle.nth
            ))
        })?;
        Ok((arena.path(index), arena.nodes[index].visible))
    }

    fn with_node_mut<T>(&self, path: &[usize], f: impl FnOnce(&mut ElementNode) -> T) -> T {
        let mut root = self.root.write().unwrap_or_else(PoisonError::into_inner);
        let mut node = &mut *root;
        for &position in path {
            node = &mut node.children[position];
        }
        f(node)
    }

    fn interactable(&self, handle: &ElementHandle, action: &str) -> Result<Vec<usize>> {
        let (path, visible) = self.resolve_path(handle)?;
        if !visible {
            return Err(HealError::InteractionFailed {
                action: action.to_string(),
                reason: format!("'{}' is not visible", handle.selector),
            });
        }
        Ok(path)
    }
}

#[async_trait]
impl Document for DomSnapshot {
    async fn count(&self, selector: &str) -> Result<usize> {
        let parsed = query::parse(selector)?;
        let root = self.read_root();
        let arena = Arena::build(&root);
        Ok(arena.evaluate(&parsed.query, parsed.nth).len())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>> {
        self.select(selector)
    }

    async fn content(&self) -> Result<String> {
        Ok(format!("<html>{}</html>", self.read_root().to_html()))
    }

    async fn click(&self, handle: &ElementHandle) -> Result<()> {
        let path = self.interactable(handle, "click")?;
        self.with_node_mut(&path, |node| {
            if node.is_tag("input") {
                let input_type = node.get_attribute("type").map(str::to_ascii_lowercase);
                match input_type.as_deref() {
                    Some("checkbox") => {
                        if node.attributes.shift_remove("checked").is_none() {
                            node.add_attribute("checked", "");
                        }
                    }
                    Some("radio") => node.add_attribute("checked", ""),
                    _ => {}
                }
            }
        });
        Ok(())
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> Result<()> {
        let path = self.interactable(handle, "fill")?;
        self.with_node_mut(&path, |node| {
            if node.is_tag("input") || node.is_tag("textarea") || node.attributes.contains_key("contenteditable") {
                node.add_attribute("value", text);
                Ok(())
            } else {
                Err(HealError::InteractionFailed {
                    action: "fill".to_string(),
                    reason: format!("<{}> is not editable", node.tag_name),
                })
            }
        })
    }

    async fn press(&self, handle: &ElementHandle, key: &str) -> Result<()> {
        self.interactable(handle, "press")?;
        self.key_presses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle.clone(), key.to_string()));
        Ok(())
    }
}

/// Flattened, pre-order view of a tree; indices are document order
struct Arena<'a> {
    nodes: Vec<Flat<'a>>,
}

struct Flat<'a> {
    node: &'a ElementNode,
    parent: Option<usize>,
    /// Position among the parent's children
    position: usize,
    children: Vec<usize>,
    /// Visible itself and through every ancestor
    visible: bool,
}

impl<'a> Arena<'a> {
    fn build(root: &'a ElementNode) -> Self {
        let mut arena = Arena { nodes: Vec::new() };
        arena.push(root, None, 0, true);
        arena
    }

    fn push(&mut self, node: &'a ElementNode, parent: Option<usize>, position: usize, parent_visible: bool) -> usize {
        let index = self.nodes.len();
        let visible = parent_visible && node.is_visible;
        self.nodes.push(Flat { node, parent, position, children: Vec::new(), visible });
        for (i, child) in node.children.iter().enumerate() {
            let child_index = self.push(child, Some(index), i, visible);
            self.nodes[index].children.push(child_index);
        }
        index
    }

    fn path(&self, mut index: usize) -> Vec<usize> {
        let mut path = Vec::new();
        while let Some(parent) = self.nodes[index].parent {
            path.push(self.nodes[index].position);
            index = parent;
        }
        path.reverse();
        path
    }

    fn describe(&self, index: usize) -> ElementInfo {
        let flat = &self.nodes[index];
        ElementInfo {
            tag_name: flat.node.tag_name.clone(),
            attributes: flat.node.attributes.clone(),
            text: flat.node.full_text(),
            visible: flat.visible,
        }
    }

    fn siblings(&self, index: usize) -> Vec<usize> {
        match self.nodes[index].parent {
            Some(parent) => self.nodes[parent].children.clone(),
            None => vec![index],
        }
    }

    fn evaluate(&self, query: &Query, nth: Option<usize>) -> Vec<usize> {
        let matches: Vec<usize> = match query {
            Query::Css(list) => (0..self.nodes.len())
                .filter(|&i| list.iter().any(|complex| self.matches_complex(i, complex)))
                .collect(),
            Query::XPath(xpath) => self.evaluate_xpath(xpath),
            Query::Text { value, exact } => self.evaluate_text(value, *exact),
            Query::Role { role, name } => self.evaluate_role(role, name.as_deref()),
        };
        match nth {
            Some(n) => matches.get(n).map(|&i| vec![i]).unwrap_or_default(),
            None => matches,
        }
    }

    fn matches_complex(&self, index: usize, complex: &ComplexSelector) -> bool {
        self.matches_from(index, &complex.parts, complex.parts.len() - 1)
    }

    fn matches_from(&self, index: usize, parts: &[(Combinator, Compound)], k: usize) -> bool {
        if !self.matches_compound(index, &parts[k].1) {
            return false;
        }
        if k == 0 {
            return true;
        }
        match parts[k].0 {
            Combinator::Child => self.nodes[index].parent.is_some_and(|p| self.matches_from(p, parts, k - 1)),
            Combinator::Descendant => {
                let mut ancestor = self.nodes[index].parent;
                while let Some(a) = ancestor {
                    if self.matches_from(a, parts, k - 1) {
                        return true;
                    }
                    ancestor = self.nodes[a].parent;
                }
                false
            }
        }
    }

    fn matches_compound(&self, index: usize, compound: &Compound) -> bool {
        let node = self.nodes[index].node;
        if let Some(tag) = &compound.tag {
            if !node.is_tag(tag) {
                return false;
            }
        }
        compound.filters.iter().all(|filter| self.matches_filter(index, filter))
    }

    fn matches_filter(&self, index: usize, filter: &Filter) -> bool {
        let node = self.nodes[index].node;
        match filter {
            Filter::Id(id) => node.id() == Some(id.as_str()),
            Filter::Class(class) => node.has_class(class),
            Filter::Attr { name, op, value } => match (node.get_attribute(name), op) {
                (None, _) => false,
                (Some(_), AttrOp::Exists) => true,
                (Some(actual), AttrOp::Equals) => actual == value,
                (Some(_), _) if value.is_empty() => false,
                (Some(actual), AttrOp::Contains) => actual.contains(value.as_str()),
                (Some(actual), AttrOp::Prefix) => actual.starts_with(value.as_str()),
                (Some(actual), AttrOp::Suffix) => actual.ends_with(value.as_str()),
                (Some(actual), AttrOp::Word) => actual.split_whitespace().any(|w| w == value),
            },
            Filter::FirstOfType => self.type_position(index) == 0,
            Filter::LastOfType => self.type_position(index) + 1 == self.type_count(index),
            Filter::FirstChild => self.nodes[index].position == 0,
            Filter::LastChild => self.nodes[index].position + 1 == self.siblings(index).len(),
            Filter::NthChild(n) => self.nodes[index].position + 1 == *n,
            Filter::NthOfType(n) => self.type_position(index) + 1 == *n,
            Filter::Not(compounds) => !compounds.iter().any(|c| self.matches_compound(index, c)),
            Filter::Checked => node.is_checked(),
            Filter::Visible => self.nodes[index].visible,
            Filter::HasText(text) => node.full_text().to_lowercase().contains(&text.to_lowercase()),
        }
    }

    /// Position among siblings sharing the tag name
    fn type_position(&self, index: usize) -> usize {
        let tag = &self.nodes[index].node.tag_name;
        self.siblings(index)
            .into_iter()
            .take_while(|&s| s != index)
            .filter(|&s| &self.nodes[s].node.tag_name == tag)
            .count()
    }

    fn type_count(&self, index: usize) -> usize {
        let tag = &self.nodes[index].node.tag_name;
        self.siblings(index).into_iter().filter(|&s| &self.nodes[s].node.tag_name == tag).count()
    }

    fn evaluate_text(&self, value: &str, exact: bool) -> Vec<usize> {
        let wanted = normalize_whitespace(value);
        let wanted_lower = wanted.to_lowercase();
        let hit = |i: usize| {
            let text = self.nodes[i].node.full_text();
            if exact { text == wanted } else { text.to_lowercase().contains(&wanted_lower) }
        };
        // innermost elements only: a parent whose text comes entirely from a
        // matching child is not itself a match
        (0..self.nodes.len())
            .filter(|&i| hit(i) && !self.nodes[i].children.iter().any(|&c| hit(c)))
            .collect()
    }

    fn evaluate_role(&self, role: &str, name: Option<&str>) -> Vec<usize> {
        let name = name.map(|n| normalize_whitespace(n).to_lowercase());
        (0..self.nodes.len())
            .filter(|&i| {
                let flat = &self.nodes[i];
                flat.visible
                    && flat.node.role().as_deref() == Some(role)
                    && name
                        .as_ref()
                        .is_none_or(|n| flat.node.accessible_name().to_lowercase().contains(n.as_str()))
            })
            .collect()
    }

    fn evaluate_xpath(&self, xpath: &XPath) -> Vec<usize> {
        // `None` stands for the document node above the root element
        let mut context: Vec<Option<usize>> = vec![None];
        for step in &xpath.steps {
            let mut next: Vec<usize> = Vec::new();
            for ctx in &context {
                for group in self.sibling_groups(*ctx, step.descendant) {
                    next.extend(self.apply_step(group, step));
                }
            }
            next.sort_unstable();
            next.dedup();
            context = next.into_iter().map(Some).collect();
        }
        let result: Vec<usize> = context.into_iter().flatten().collect();
        match xpath.index {
            Some(n) => result.get(n - 1).map(|&i| vec![i]).unwrap_or_default(),
            None => result,
        }
    }

    /// Candidate child lists reachable from `context` by `/` or `//`
    fn sibling_groups(&self, context: Option<usize>, descendant: bool) -> Vec<Vec<usize>> {
        let Some(ctx) = context else {
            let mut groups = vec![vec![0]];
            if descendant {
                groups.extend((0..self.nodes.len()).map(|i| self.nodes[i].children.clone()));
            }
            return groups;
        };
        if !descendant {
            return vec![self.nodes[ctx].children.clone()];
        }
        let mut groups = Vec::new();
        let mut stack = vec![ctx];
        while let Some(i) = stack.pop() {
            groups.push(self.nodes[i].children.clone());
            stack.extend(self.nodes[i].children.iter().rev());
        }
        groups
    }

    fn apply_step(&self, group: Vec<usize>, step: &Step) -> Vec<usize> {
        let mut candidates: Vec<usize> = group
            .into_iter()
            .filter(|&i| step.name.as_deref().is_none_or(|name| self.nodes[i].node.is_tag(name)))
            .collect();
        for predicate in &step.predicates {
            candidates = match predicate {
                Predicate::Position(n) => candidates.get(n - 1).map(|&i| vec![i]).unwrap_or_default(),
                other => candidates.into_iter().filter(|&i| self.matches_predicate(i, other)).collect(),
            };
        }
        candidates
    }

    fn matches_predicate(&self, index: usize, predicate: &Predicate) -> bool {
        let node = self.nodes[index].node;
        match predicate {
            Predicate::Position(_) => true,
            Predicate::HasAttr(name) => node.attributes.contains_key(name),
            Predicate::AttrEquals(name, value) => node.get_attribute(name) == Some(value.as_str()),
            Predicate::AttrContains(name, value) => node.get_attribute(name).is_some_and(|a| a.contains(value.as_str())),
            Predicate::TextEquals(value) => node.text_content.as_deref().map(str::trim) == Some(value.trim()),
            Predicate::TextContains(value) => node.full_text().contains(value.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo_page() -> DomSnapshot {
        let item = |text: &str, completed: bool| {
            let mut li = ElementNode::new("li");
            if completed {
                li.add_attribute("class", "completed");
            }
            li.child(
                ElementNode::new("div")
                    .attr("class", "view")
                    .child(ElementNode::new("input").attr("class", "toggle").attr("type", "checkbox"))
                    .child(ElementNode::new("label").with_text(text))
                    .child(ElementNode::new("button").attr("class", "destroy").hidden()),
            )
        };
        DomSnapshot::new(
            ElementNode::new("body")
                .child(
                    ElementNode::new("header")
                        .attr("class", "header")
                        .child(ElementNode::new("h1").with_text("todos"))
                        .child(
                            ElementNode::new("input")
                                .attr("class", "new-todo")
                                .attr("placeholder", "What needs to be done?"),
                        ),
                )
                .child(
                    ElementNode::new("ul")
                        .attr("class", "todo-list")
                        .child(item("Buy milk", false))
                        .child(item("Walk dog", true))
                        .child(item("Write code", false)),
                )
                .child(
                    ElementNode::new("footer")
                        .attr("class", "footer")
                        .child(ElementNode::new("a").attr("href", "#/").attr("class", "selected").with_text("All"))
                        .child(ElementNode::new("a").attr("href", "#/active").with_text("Active"))
                        .child(ElementNode::new("button").attr("class", "clear-completed").with_text("Clear completed")),
                ),
        )
    }

    #[tokio::test]
    async fn test_css_counts() {
        let doc = todo_page();
        assert_eq!(doc.count(".toggle").await.unwrap(), 3);
        assert_eq!(doc.count("input.new-todo").await.unwrap(), 1);
        assert_eq!(doc.count("ul.todo-list > li").await.unwrap(), 3);
        assert_eq!(doc.count("ul > label").await.unwrap(), 0);
        assert_eq!(doc.count("ul label").await.unwrap(), 3);
        assert_eq!(doc.count("li.completed .toggle").await.unwrap(), 1);
        assert_eq!(doc.count("[placeholder=\"What needs to be done?\"]").await.unwrap(), 1);
        assert_eq!(doc.count("a[href^=\"#/\"]").await.unwrap(), 2);
        assert_eq!(doc.count("input:not([type])").await.unwrap(), 1);
        assert_eq!(doc.count(".todo-input-broken").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_structural_pseudo_classes() {
        let doc = todo_page();
        assert_eq!(doc.count("li:first-of-type").await.unwrap(), 1);
        assert_eq!(doc.count("li:nth-child(2) label").await.unwrap(), 1);
        assert_eq!(doc.count("footer a:last-of-type").await.unwrap(), 1);
        assert_eq!(doc.count(".toggle:first-of-type").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_visibility_and_text_filters() {
        let doc = todo_page();
        assert_eq!(doc.count(".destroy").await.unwrap(), 3);
        assert_eq!(doc.count(".destroy:visible").await.unwrap(), 0);
        assert_eq!(doc.count("button:visible").await.unwrap(), 1);
        assert_eq!(doc.count("button:has-text(\"clear\")").await.unwrap(), 1);
        assert_eq!(doc.count("text=\"Walk dog\"").await.unwrap(), 1);
        assert_eq!(doc.count("text=walk").await.unwrap(), 1);
        assert_eq!(doc.count("text=\"Walk\"").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_role_queries() {
        let doc = todo_page();
        assert_eq!(doc.count("role=textbox").await.unwrap(), 1);
        assert_eq!(doc.count("role=checkbox").await.unwrap(), 3);
        assert_eq!(doc.count("role=link[name=\"active\"]").await.unwrap(), 1);
        assert_eq!(doc.count("role=heading[name=\"todos\"]").await.unwrap(), 1);
        assert_eq!(doc.count("role=button[name=\"Clear\"]").await.unwrap(), 1);
        // hidden destroy buttons are excluded
        assert_eq!(doc.count("role=button").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_xpath_queries() {
        let doc = todo_page();
        assert_eq!(doc.count("/body/ul/li").await.unwrap(), 3);
        assert_eq!(doc.count("//li[2]//label").await.unwrap(), 1);
        assert_eq!(doc.count("//ul[@class='todo-list']/li[4]").await.unwrap(), 0);
        assert_eq!(doc.count("(//label)[1]").await.unwrap(), 1);
        assert_eq!(doc.count("//label[text()='Walk dog']").await.unwrap(), 1);
        assert_eq!(doc.count("//*[contains(@class,'new')]").await.unwrap(), 1);
        assert_eq!(doc.count("//div").await.unwrap(), 3);
        assert_eq!(doc.count("//*[@class='view']").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_nth_suffix_and_order() {
        let doc = todo_page();
        let second = doc.query_all("label >> nth=1").await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].text, "Walk dog");
        assert_eq!(doc.count("label >> nth=9").await.unwrap(), 0);

        let labels: Vec<_> = doc.query_all("label").await.unwrap().into_iter().map(|l| l.text).collect();
        assert_eq!(labels, vec!["Buy milk", "Walk dog", "Write code"]);
    }

    #[tokio::test]
    async fn test_invalid_selector_is_error() {
        let doc = todo_page();
        let err = doc.count("div[").await.unwrap_err();
        assert!(err.is_query_failure());
    }

    #[tokio::test]
    async fn test_interactions_mutate_tree() {
        let doc = todo_page();
        let toggle = ElementHandle::new(".toggle", 1);
        doc.click(&toggle).await.unwrap();
        assert_eq!(doc.count(".toggle:checked").await.unwrap(), 1);
        doc.click(&toggle).await.unwrap();
        assert_eq!(doc.count(".toggle:checked").await.unwrap(), 0);

        let input = ElementHandle::first(".new-todo");
        doc.fill(&input, "Ship it").await.unwrap();
        assert_eq!(doc.inspect(&input).await.unwrap().attribute("value"), Some("Ship it"));

        doc.press(&input, "Enter").await.unwrap();
        assert_eq!(doc.key_presses(), vec![(input.clone(), "Enter".to_string())]);

        let hidden = ElementHandle::first(".destroy");
        assert!(doc.click(&hidden).await.is_err());
        assert!(doc.fill(&ElementHandle::first("h1"), "x").await.is_err());
        assert!(doc.click(&ElementHandle::new(".toggle", 7)).await.is_err());
    }

    #[tokio::test]
    async fn test_content_and_json_round_trip() {
        let doc = todo_page();
        let html = doc.content().await.unwrap();
        assert!(html.starts_with("<html><body>"));
        assert!(html.contains("placeholder=\"What needs to be done?\""));

        let restored = DomSnapshot::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(restored.root(), doc.root());
        assert!(DomSnapshot::from_json("{not json").is_err());
    }
}
