use adaptive_locator::heal::{Candidate, Probe, Strategy, StrategyChain};
use adaptive_locator::{
    Document, DomSnapshot, ElementNode, HealError, Healer, HealerConfig, HealingEvent, HealingLedger, Result,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

fn todo_item(text: &str) -> ElementNode {
    ElementNode::new("li").child(
        ElementNode::new("div")
            .attr("class", "view")
            .child(ElementNode::new("input").attr("class", "toggle").attr("type", "checkbox"))
            .child(ElementNode::new("label").with_text(text))
            .child(ElementNode::new("button").attr("class", "destroy").hidden()),
    )
}

fn todo_list() -> ElementNode {
    ElementNode::new("ul")
        .attr("class", "todo-list")
        .child(todo_item("Buy milk"))
        .child(todo_item("Walk dog"))
        .child(todo_item("Write code"))
}

/// TodoMVC page: new-todo input, three items, footer filters
fn todo_page() -> DomSnapshot {
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
            .child(todo_list())
            .child(
                ElementNode::new("footer")
                    .attr("class", "footer")
                    .child(ElementNode::new("a").attr("href", "#/").with_text("All"))
                    .child(ElementNode::new("a").attr("href", "#/active").with_text("Active"))
                    .child(ElementNode::new("button").attr("class", "clear-completed").with_text("Clear completed")),
            ),
    )
}

fn healer(dir: &Path) -> Healer {
    Healer::new(HealerConfig::new().ledger_dir(dir)).unwrap()
}

#[tokio::test]
async fn test_unique_selector_fast_path_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let doc = todo_page();

    for selector in [".new-todo", "h1", "text=\"Walk dog\"", "role=link[name=\"Active\"]", "//footer/button"] {
        let result = healer.resolve(&doc, selector, None).await.unwrap();
        assert!(!result.healed, "{} should resolve directly", selector);
        assert_eq!(result.new_selector, None);
        assert_eq!(result.element.selector, selector);
    }
    assert!(!healer.ledger().path().exists());
}

#[tokio::test]
async fn test_scenario_placeholder_heals_todo_input() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let doc = todo_page();

    let result = healer.resolve(&doc, ".todo-input-broken", Some("Main todo input field")).await.unwrap();

    assert!(result.healed);
    assert_eq!(result.new_selector.as_deref(), Some("[placeholder=\"What needs to be done?\"]"));
    assert_eq!(result.strategy.as_deref(), Some("placeholder"));
    assert_eq!(doc.count(result.selector()).await.unwrap(), 1);

    let events = healer.ledger().read_all().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].original_selector, ".todo-input-broken");
    assert_eq!(events[0].new_selector, "[placeholder=\"What needs to be done?\"]");
    assert!(events[0].reason.contains("placeholder"));
}

#[tokio::test]
async fn test_scenario_missing_toggle_never_returns_ambiguous_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());

    // full page: whichever strategy wins, its answer is unique
    let doc = todo_page();
    let result = healer.resolve(&doc, ".toggle-old-class", Some("Toggle todo complete")).await.unwrap();
    assert!(result.healed);
    assert_eq!(doc.count(result.selector()).await.unwrap(), 1);

    // only the three toggles: the context strategy's `.toggle` is rejected and
    // the heuristic table narrows to the first toggle
    let doc = DomSnapshot::new(ElementNode::new("body").child(todo_list()));
    let result = healer.resolve(&doc, ".toggle-old-class", Some("Toggle todo complete")).await.unwrap();
    assert_eq!(result.strategy.as_deref(), Some("heuristic"));
    assert_eq!(result.new_selector.as_deref(), Some(".toggle >> nth=0"));
    assert_eq!(doc.count(result.selector()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_scenario_ambiguous_defaults_to_first_in_document_order() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let cell = |n: usize| {
        ElementNode::new("td").child(
            ElementNode::new("span")
                .attr("class", "cell")
                .with_text(format!("cell {}", n)),
        )
    };
    let doc = DomSnapshot::new(
        ElementNode::new("table").child(ElementNode::new("tr").with_children((1..=4).map(cell).collect())),
    );

    let result = healer.resolve(&doc, ".cell", None).await.unwrap();

    assert!(result.healed);
    assert_eq!(result.new_selector.as_deref(), Some(".cell >> nth=0"));
    assert_eq!(result.strategy.as_deref(), Some("refine:first-match"));
    assert!(result.reason.as_deref().unwrap().contains("defaulting to first in document order"));
    assert_eq!(doc.inspect(&result.element).await.unwrap().text, "cell 1");
    assert_eq!(healer.ledger().read_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ambiguous_selectors_always_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let doc = todo_page();

    for selector in ["label", ".toggle", "li", "//li", "a", "div.view", "button"] {
        let result = healer.resolve(&doc, selector, None).await.unwrap();
        assert!(result.healed, "{}", selector);
        assert_eq!(doc.count(result.selector()).await.unwrap(), 1, "{}", selector);
    }
    assert_eq!(healer.ledger().read_all().await.unwrap().len(), 7);
}

#[tokio::test]
async fn test_unresolvable_after_all_strategies() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let doc = DomSnapshot::new(ElementNode::new("body").child(ElementNode::new("p").with_text("Hello")));

    match healer.resolve(&doc, ".gone", None).await {
        Err(HealError::ElementUnresolvable { selector, attempted }) => {
            assert_eq!(selector, ".gone");
            assert_eq!(attempted, 8);
        }
        other => panic!("expected unresolvable, got {:?}", other),
    }
    assert!(!healer.ledger().path().exists());
}

#[tokio::test]
async fn test_query_error_takes_the_healing_path() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let doc = todo_page();

    let result = healer.resolve(&doc, "input.new-todo[", Some("todo input")).await.unwrap();
    assert!(result.healed);
    assert_eq!(result.strategy.as_deref(), Some("placeholder"));

    let events = healer.ledger().read_all().await.unwrap();
    assert_eq!(events[0].original_selector, "input.new-todo[");
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let doc = todo_page();

    let first = healer.resolve(&doc, "button.clear-completed-v2", None).await.unwrap();
    let second = healer.resolve(&doc, "button.clear-completed-v2", None).await.unwrap();
    assert_eq!(first.new_selector, second.new_selector);
    assert_eq!(first.strategy, second.strategy);
    assert_eq!(healer.ledger().read_all().await.unwrap().len(), 2);
}

struct Recording {
    name: &'static str,
    answer: Option<&'static str>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Strategy for Recording {
    fn name(&self) -> &str {
        self.name
    }

    async fn probe(&self, _probe: &Probe<'_>) -> Result<Option<Candidate>> {
        self.calls.lock().unwrap().push(self.name);
        Ok(self.answer.map(|selector| Candidate::new(selector, format!("proposed by {}", self.name))))
    }
}

#[tokio::test]
async fn test_strategies_after_the_winner_are_not_invoked() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let strategy = |name, answer| Box::new(Recording { name, answer, calls: calls.clone() }) as Box<dyn Strategy>;
    let chain = StrategyChain::new(vec![
        strategy("first", None),
        strategy("second", Some("h1")),
        strategy("third", Some("footer")),
    ]);
    let healer = Healer::from_parts(HealerConfig::new(), chain, HealingLedger::new(dir.path()));
    let doc = todo_page();

    let result = healer.resolve(&doc, "#title", None).await.unwrap();
    assert_eq!(result.new_selector.as_deref(), Some("h1"));
    assert_eq!(result.strategy.as_deref(), Some("second"));
    assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
}

#[tokio::test]
async fn test_ledger_failure_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("ledger");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let healer = healer(&blocker);
    let doc = todo_page();

    let result = healer.resolve(&doc, ".todo-input-broken", None).await.unwrap();
    assert!(result.healed);
    assert!(result.ledger_warning.is_some());
}

#[tokio::test]
async fn test_healed_handle_is_usable() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let doc = todo_page();

    let input = healer.resolve(&doc, "#new-todo-old", Some("Main todo input field")).await.unwrap();
    doc.fill(&input.element, "Ship it").await.unwrap();
    doc.press(&input.element, "Enter").await.unwrap();
    assert_eq!(doc.inspect(&input.element).await.unwrap().attribute("value"), Some("Ship it"));
    assert_eq!(doc.key_presses().len(), 1);

    let toggle = healer.resolve(&doc, ".toggle", None).await.unwrap();
    doc.click(&toggle.element).await.unwrap();
    assert_eq!(doc.count(".toggle:checked").await.unwrap(), 1);
}

#[tokio::test]
async fn test_stats_follow_the_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let healer = Healer::new(HealerConfig::new().ledger_dir(dir.path()).recent_window(2)).unwrap();
    let doc = todo_page();

    for selector in ["label", "li", ".toggle"] {
        healer.resolve(&doc, selector, None).await.unwrap();
    }

    let stats = healer.stats().await.unwrap();
    assert_eq!(stats.total_healings, 3);
    assert_eq!(stats.recent_healings.len(), 2);
    assert_eq!(stats.recent_healings[1].original_selector, ".toggle");
    assert_eq!(stats.success_rate_estimate, 75.0);
}

#[tokio::test]
async fn test_ledger_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = HealingLedger::new(dir.path());
    let written: Vec<_> = (0..25)
        .map(|n| {
            HealingEvent::new(format!("#old-{}", n), format!("#new-{}", n), "round trip").with_strategy("attribute")
        })
        .collect();

    for event in &written {
        ledger.append(event).await.unwrap();
    }
    assert_eq!(ledger.read_all().await.unwrap(), written);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scenario_concurrent_appends_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let workers = [HealingLedger::new(dir.path()), HealingLedger::new(dir.path())];

    let mut tasks = Vec::new();
    for (w, ledger) in workers.iter().enumerate() {
        for n in 0..50 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                let event = HealingEvent::new(format!("worker-{}-{}", w, n), "#new", "concurrent");
                ledger.append(&event).await
            }));
        }
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let events = workers[0].read_all().await.unwrap();
    assert_eq!(events.len(), 100);
    for w in 0..2 {
        for n in 0..50 {
            let id = format!("worker-{}-{}", w, n);
            assert!(events.iter().any(|e| e.original_selector == id), "{} missing", id);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolutions_share_one_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let doc = Arc::new(todo_page());
    let healers = [Arc::new(healer(dir.path())), Arc::new(healer(dir.path()))];

    let mut tasks = Vec::new();
    for i in 0..20 {
        let healer = healers[i % 2].clone();
        let doc = doc.clone();
        tasks.push(tokio::spawn(async move { healer.resolve(&*doc, "label", None).await }));
    }
    for task in tasks {
        assert!(task.await.unwrap().unwrap().healed);
    }

    assert_eq!(healers[0].stats().await.unwrap().total_healings, 20);
}

#[tokio::test]
async fn test_torn_ledger_tail_keeps_later_healings() {
    let dir = tempfile::tempdir().unwrap();
    let healer = healer(dir.path());
    let doc = todo_page();

    healer.resolve(&doc, "label", None).await.unwrap();
    std::fs::OpenOptions::new()
        .append(true)
        .open(healer.ledger().path())
        .and_then(|mut f| std::io::Write::write_all(&mut f, b"{\"timestamp\":\"2026-"))
        .unwrap();
    let result = healer.resolve(&doc, ".todo-input-broken", None).await.unwrap();
    assert_eq!(result.ledger_warning, None);

    let stats = healer.stats().await.unwrap();
    assert_eq!(stats.total_healings, 2);
    assert_eq!(stats.recent_healings[1].original_selector, ".todo-input-broken");
}
