//! Integration tests for domain matching

use proptest::prelude::*;
use sniq_core::matcher::{parse_entries, DomainList, DomainSet, DomainTrie};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn domain() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9]([a-z0-9-]{0,10}[a-z0-9])?", 1..5)
        .prop_map(|labels| labels.join("."))
}

// =========== Properties ===========

proptest! {
    #[test]
    fn prop_literal_matches_itself_only(d in domain()) {
        let trie: DomainTrie = [d.as_str()].into_iter().collect();

        prop_assert!(trie.matches(&d));
        let suffixed = format!("{d}x");
        let prefixed = format!("x{d}");
        let subdomain = format!("sub.{d}");
        prop_assert!(!trie.matches(&suffixed));
        prop_assert!(!trie.matches(&prefixed));
        prop_assert!(!trie.matches(&subdomain));
    }

    #[test]
    fn prop_wildcard_matches_subdomains(d in domain(), sub in domain()) {
        let trie: DomainTrie = [format!("*.{d}")].into_iter().collect();

        let full = format!("{sub}.{d}");
        prop_assert!(trie.matches(&full));
        prop_assert!(!trie.matches(&d));
    }

    #[test]
    fn prop_insert_idempotent(domains in prop::collection::vec(domain(), 1..20)) {
        let mut trie = DomainTrie::new();
        trie.extend(&domains);
        let len = trie.len();

        prop_assert_eq!(trie.extend(&domains), 0);
        prop_assert_eq!(trie.len(), len);
        for d in &domains {
            prop_assert!(trie.matches(d));
        }
    }

    #[test]
    fn prop_empty_never_matches(domains in prop::collection::vec(domain(), 0..10)) {
        let mut trie: DomainTrie = domains.iter().collect();
        trie.insert("*.example");
        prop_assert!(!trie.matches(""));
    }

    #[test]
    fn prop_case_insensitive(d in domain()) {
        let trie: DomainTrie = [d.to_ascii_uppercase()].into_iter().collect();
        prop_assert!(trie.matches(&d));
    }
}

// =========== Wildcards ===========

#[test]
fn test_wildcard_depth() {
    let trie: DomainTrie = ["*.example.com"].into_iter().collect();

    assert!(trie.matches("a.example.com"));
    assert!(trie.matches("b.a.example.com"));
    assert!(!trie.matches("example.com"));
    assert!(!trie.matches("badexample.com"));
}

#[test]
fn test_mixed_list() {
    let content = "\
# streaming
googlevideo.com
*.googlevideo.com

# trackers
*.doubleclick.net
";
    let trie: DomainTrie = parse_entries(content).collect();

    assert_eq!(trie.len(), 3);
    assert!(trie.matches("googlevideo.com"));
    assert!(trie.matches("r2---sn-fxc25nn-nwje.googlevideo.com"));
    assert!(trie.matches("ad.doubleclick.net"));
    assert!(!trie.matches("doubleclick.net"));
    assert!(!trie.matches("youtube.com"));
}

// =========== Reload ===========

#[test]
fn test_list_file_into_set() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "first.example").unwrap();
    file.flush().unwrap();

    let list = DomainList::new(file.path());
    let set = DomainSet::new(list.load().unwrap());
    assert!(set.matches("first.example"));

    std::fs::write(file.path(), "second.example\n").unwrap();
    let later = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
    file.as_file().set_modified(later).unwrap();

    let trie = list.check_reload().unwrap().expect("file changed");
    set.replace(trie);
    assert!(!set.matches("first.example"));
    assert!(set.matches("second.example"));
}

#[test]
fn test_concurrent_replace() {
    // Readers must always see one complete generation: either every
    // "a" domain or every "b" domain, never a mix
    let gen_a: Vec<String> = (0..200).map(|i| format!("a{i}.example")).collect();
    let gen_b: Vec<String> = (0..200).map(|i| format!("b{i}.example")).collect();

    let set = Arc::new(DomainSet::new(gen_a.iter().collect()));
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let set = Arc::clone(&set);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                loop {
                    let trie = set.load();
                    let a = trie.matches("a0.example");
                    let b = trie.matches("b0.example");
                    assert!(a != b, "mixed generation");
                    let expected = if a { "a199.example" } else { "b199.example" };
                    assert!(trie.matches(expected));
                    assert_eq!(trie.len(), 200);
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                }
            })
        })
        .collect();

    for i in 0..100 {
        let next = if i % 2 == 0 { &gen_b } else { &gen_a };
        set.replace(next.iter().collect());
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        reader.join().unwrap();
    }
}
