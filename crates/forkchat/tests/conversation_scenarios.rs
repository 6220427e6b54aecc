//! End-to-end conversation scenarios through the public API.

use forkchat::prelude::*;

fn contents(tree: &ConversationTree) -> Vec<&str> {
    tree.active_path().map(|m| m.content.as_str()).collect()
}

// ── Tree ─────────────────────────────────────────────────────────────

#[test]
fn three_turns_form_the_active_path() {
    let mut tree = ConversationTree::new();
    let hi = tree.insert(Message::user("Hi"));
    let hello = tree.insert(Message::assistant("Hello"));
    let how = tree.insert(Message::user("How are you?"));

    assert_eq!(tree.roots(), &[hi]);
    let ids: Vec<MessageId> = tree.active_path().map(|m| m.id).collect();
    assert_eq!(ids, [hi, hello, how]);
    assert_eq!(contents(&tree), ["Hi", "Hello", "How are you?"]);
}

#[test]
fn edit_keeps_history_reachable() {
    let mut tree = ConversationTree::new();
    tree.insert(Message::user("Hi"));
    let hello = tree.insert(Message::assistant("Hello"));
    let how = tree.insert(Message::user("How are you?"));

    let hey = tree.edit(hello, "Hey there!");
    assert_eq!(contents(&tree), ["Hi", "Hey there!"]);
    assert!(tree.get_siblings(hey).contains(&hello));
    assert!(!tree.get(hello).unwrap().is_active);
    assert!(!tree.get(how).unwrap().is_active);
    assert_eq!(tree.get(hello).unwrap().content, "Hello");
    tree.validate().unwrap();
}

#[test]
fn deleting_active_turn_with_sibling_keeps_the_path_unbroken() {
    // P -> A -> G, with A' an inactive sibling of A.
    let mut tree = ConversationTree::new();
    let p = tree.insert(Message::user("P"));
    let a = tree.insert(Message::assistant("A"));
    let a_prime = tree.edit(a, "A'");
    assert!(tree.switch_to(a));
    let g = tree.insert(Message::user("G"));
    assert_eq!(contents(&tree), ["P", "A", "G"]);

    let outcome = tree.delete(a).unwrap();
    assert_eq!(outcome.replacement, Some(a_prime));
    assert_eq!(outcome.rescued, [g]);
    assert_eq!(tree.get(g).unwrap().parent_id, Some(a_prime));
    assert_eq!(contents(&tree), ["P", "A'", "G"]);
    assert_eq!(tree.get(p).unwrap().children_ids, [a_prime]);
    tree.validate().unwrap();
}

#[test]
fn deleting_active_turn_without_sibling_truncates_at_parent() {
    let mut tree = ConversationTree::new();
    let p = tree.insert(Message::user("P"));
    let a = tree.insert(Message::assistant("A"));
    let g = tree.insert(Message::user("G"));

    let outcome = tree.delete(a).unwrap();
    assert!(outcome.replacement.is_none());
    let path: Vec<MessageId> = tree.active_path().map(|m| m.id).collect();
    assert_eq!(path, [p]);
    // The active grandchild survives as an inactive root.
    assert!(tree.get(g).unwrap().is_root());
    assert!(!tree.get(g).unwrap().is_active);
    tree.validate().unwrap();
}

#[test]
fn regenerate_then_navigate_between_replies() {
    let mut tree = ConversationTree::new();
    tree.insert(Message::user("Hi"));
    let first = tree.insert(Message::assistant("Hello"));
    let second = tree.insert(Message::assistant("Hey"));
    let third = tree.insert(Message::assistant("Howdy"));

    assert_eq!(tree.sibling_position(third), Some((2, 3)));
    assert_eq!(tree.navigate_sibling(third, -2), Some(first));
    assert_eq!(contents(&tree), ["Hi", "Hello"]);
    assert_eq!(tree.navigate_sibling(first, 1), Some(second));
    assert_eq!(contents(&tree), ["Hi", "Hey"]);
    tree.validate().unwrap();
}

#[test]
fn unknown_ids_never_fail() {
    let mut tree = ConversationTree::new();
    tree.insert(Message::user("Hi"));
    let ghost = MessageId::new();

    assert_eq!(tree.edit(ghost, "x"), ghost);
    assert!(tree.delete(ghost).is_none());
    assert!(!tree.promote_to_root(ghost));
    assert!(tree.get_siblings(ghost).is_empty());
    assert!(tree.navigate_sibling(ghost, 1).is_none());
    assert!(!tree.switch_to(ghost));
    assert_eq!(tree.len(), 1);
    tree.validate().unwrap();
}

// ── Budget ───────────────────────────────────────────────────────────

#[test]
fn token_estimate_literals() {
    assert_eq!(estimate_tokens("abcd"), 1);
    assert_eq!(estimate_tokens(""), 0);
    assert_eq!(estimate_tokens(&"x".repeat(41)), 10);
}

#[test]
fn exhausted_window_keeps_at_most_the_last_message() {
    let mut tree = ConversationTree::new();
    tree.insert(Message::user("Hi"));
    tree.insert(Message::assistant("Hello"));
    let path: Vec<&Message> = tree.active_path().collect();

    let kept = truncate(&path, "", 100, 20);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].content, "Hello");

    let empty: Vec<&Message> = Vec::new();
    assert!(truncate(&empty, "", 100, 20).is_empty());
}

#[test]
fn large_window_keeps_the_whole_path() {
    let mut tree = ConversationTree::new();
    for i in 0..10 {
        tree.insert(Message::user(format!("question {i}")));
        tree.insert(Message::assistant(format!("answer {i}")));
    }
    let path: Vec<&Message> = tree.active_path().collect();
    let kept = truncate(&path, "You are helpful.", 1_000_000, 4096);
    assert_eq!(kept.len(), 20);
    assert!(kept.iter().zip(&path).all(|(a, b)| a.id == b.id));
}

// ── Session ──────────────────────────────────────────────────────────

#[test]
fn session_sends_trimmed_window_for_resolved_model() {
    let table = ContextSizeTable::default();
    let settings = ModelSettings::new("local-model").with_max_tokens(3900);
    let mut session = ChatSession::new(settings, &table);
    assert_eq!(session.context_size(), 4096);

    // available = 4096 - (3900 + 0 + 100) = 96: four 20-token messages fit.
    for i in 0..4 {
        session.send_user(format!("q{i}"));
        session.accept_reply(format!("a{i}"));
    }
    let window = session.request_window();
    assert_eq!(window.len(), 4);
    assert_eq!(window[0], ChatRecord::new(Role::User, "q2"));
    assert_eq!(window[3], ChatRecord::new(Role::Assistant, "a3"));
}

#[test]
fn demo_script_and_config_parse() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    let config = ForkchatConfig::load(demos.join("forkchat.json")).unwrap();
    let local = config.model("local").unwrap();
    assert_eq!(local.resolved_context_size(&config.context_sizes), 4096);
    assert_eq!(config.model("tiny").unwrap().context_size, Some(400));

    let script = std::fs::read_to_string(demos.join("regenerate.json")).unwrap();
    let steps: Vec<serde_json::Value> = serde_json::from_str(&script).unwrap();
    assert!(steps.iter().all(|s| s["op"].is_string()));
}
