// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the key and key set data model.

use cascfg::prelude::*;

fn key(name: &str, value: &str) -> Key {
    Key::with_text(name, value).unwrap()
}

#[test]
fn test_name_roundtrip() {
    let first = "user/tests/cascfg/name/1";
    let k = Key::new(first).unwrap();
    assert_eq!(k.name(), first);

    let second = "user/tests/cascfg/name/2";
    k.set_name(second).unwrap();
    assert_eq!(k.name(), second);
}

#[test]
fn test_string_value() {
    let value = "Hello World";
    let k = key("user/tests/cascfg/string", value);
    assert_eq!(k.value(), value);
}

#[test]
fn test_boolean_value() {
    let k = Key::new("user/tests/cascfg/boolean").unwrap();

    k.set_boolean(true);
    assert!(k.boolean());
    assert_eq!(k.value(), "1");

    k.set_boolean(false);
    assert!(!k.boolean());
    assert_eq!(k.value(), "0");
}

#[test]
fn test_bytes_roundtrip() {
    let k = Key::new("user/tests/cascfg/bytes").unwrap();
    let payload: Vec<u8> = vec![0x00, 0xff, 0x00, 0x42, 0x00];

    k.set_bytes(&payload);
    assert_eq!(k.bytes(), payload);
}

#[test]
fn test_meta_roundtrip() {
    let k = key("user/tests/cascfg/meta", "Hello World");

    k.set_meta("m", "v").unwrap();
    assert_eq!(k.meta("m"), "v");

    k.remove_meta("m").unwrap();
    assert_eq!(k.meta("m"), "");
}

#[test]
fn test_namespace() {
    let k = Key::new("user/tests/cascfg/namespace").unwrap();
    assert_eq!(k.namespace(), Some(Namespace::User));
    assert_eq!(k.namespace().unwrap().tag(), "user");

    let k = Key::new("/cascfg/namespace").unwrap();
    assert_eq!(k.namespace(), Some(Namespace::Cascading));
    assert_eq!(k.namespace().unwrap().tag(), "");
}

#[test]
fn test_common_key_name() {
    let cases = [
        ("user/foo/bar", "user/foo/bar2", "user/foo"),
        ("proc/foo/bar", "user/foo/bar", "/foo/bar"),
        ("user/foo/bar", "user/bar/foo", "user"),
        ("proc/bar/foo", "user/foo/bar", ""),
    ];

    for (a, b, expected) in cases {
        let a = Key::new(a).unwrap();
        let b = Key::new(b).unwrap();
        assert_eq!(
            common_key_name(&a, &b),
            expected,
            "common name of {} and {}",
            a.name(),
            b.name()
        );
    }
}

#[test]
fn test_create_key_set() {
    let k = key("user/tests/cascfg/createkeyset", "Hello World");
    let ks = KeySet::from_keys([k]).unwrap();
    assert_eq!(ks.len(), 1);
}

#[test]
fn test_key_names() {
    let name1 = "user/tests/cascfg/names/1";
    let name2 = "user/tests/cascfg/names/2";
    let ks = KeySet::from_keys([key(name1, "a"), key(name2, "b")]).unwrap();

    assert_eq!(ks.key_names(), [name1, name2]);
}

#[test]
fn test_add_and_remove() {
    let mut ks = KeySet::new();

    let size = ks.append_key(key("user/tests/cascfg/addremove/1", "a")).unwrap();
    assert_eq!(size, 1);

    let size = ks.append_key(key("user/tests/cascfg/addremove/2", "b")).unwrap();
    assert_eq!(size, 2);

    assert!(ks.pop().is_some());
    assert_eq!(ks.len(), 1);
    assert!(ks.pop().is_some());
    assert_eq!(ks.len(), 0);
    assert!(ks.pop().is_none());
}

#[test]
fn test_remove() {
    let k1 = key("user/tests/cascfg/remove/1", "a");
    let k2 = key("user/tests/cascfg/remove/2", "b");
    let k3 = key("user/tests/cascfg/remove/3", "c");
    let mut ks = KeySet::from_keys([k1.clone(), k2, k3]).unwrap();

    assert_eq!(ks.len(), 3);

    let removed = ks.remove(&k1).unwrap();
    assert_eq!(removed.name(), "user/tests/cascfg/remove/1");
    assert_eq!(ks.len(), 2);

    let removed = ks.remove_by_name("user/tests/cascfg/remove/2").unwrap();
    assert_eq!(removed.value(), "b");
    assert_eq!(ks.len(), 1);

    // The removed key is still valid and owned by the caller.
    assert_eq!(removed.name(), "user/tests/cascfg/remove/2");
}

#[test]
fn test_clear() {
    let mut ks = KeySet::from_keys([
        key("user/tests/cascfg/clear/1", "a"),
        key("user/tests/cascfg/clear/2", "b"),
    ])
    .unwrap();

    ks.clear();
    assert_eq!(ks.len(), 0);
}

#[test]
fn test_lookup_by_name() {
    let name = "user/tests/cascfg/lookup";
    let ks = KeySet::from_keys([key(name, "Hello World")]).unwrap();

    let found = ks.lookup_by_name(name).unwrap();
    assert_eq!(found.name(), name);
    assert_eq!(found.value(), "Hello World");
}

#[test]
fn test_append_replaces_and_keeps_length() {
    let name = "user/tests/cascfg/replace";
    let mut ks = KeySet::new();

    ks.append_key(key(name, "first")).unwrap();
    ks.append_key(key(name, "second")).unwrap();

    assert_eq!(ks.len(), 1);
    assert_eq!(ks.lookup_by_name(name).unwrap().value(), "second");
}

#[test]
fn test_compare_is_total_order_over_set_contents() {
    let ks = KeySet::from_keys([
        key("spec/tests/order", "1"),
        key("proc/tests/order", "2"),
        key("dir/tests/order", "3"),
        key("user/tests/order", "4"),
        key("system/tests/order", "5"),
        key("/tests/order", "6"),
    ])
    .unwrap();

    let keys = ks.as_slice();
    for window in keys.windows(2) {
        assert_eq!(window[0].compare(&window[1]), std::cmp::Ordering::Less);
    }

    // compare == 0 exactly when names are equal.
    for a in keys {
        for b in keys {
            let same = a.name() == b.name();
            assert_eq!(a.compare(b) == std::cmp::Ordering::Equal, same);
        }
    }
}

#[test]
fn test_cut_partitions_subtree() {
    let mut ks = KeySet::from_keys([
        key("user/tests/cut", "root"),
        key("user/tests/cut/a", "1"),
        key("user/tests/cut/a/deep", "2"),
        key("user/tests/cut2", "other"),
        key("system/tests/cut/a", "3"),
    ])
    .unwrap();
    let original_len = ks.len();

    let cutpoint = Key::new("user/tests/cut").unwrap();
    let sub = ks.cut(&cutpoint);

    for k in &sub {
        assert!(k.is_below_or_same(&cutpoint));
    }
    for k in &ks {
        assert!(!k.is_below_or_same(&cutpoint));
    }
    assert_eq!(sub.len() + ks.len(), original_len);
}

#[test]
fn test_pop_yields_descending_order() {
    let mut ks = KeySet::from_keys([
        key("user/tests/pop/a", "1"),
        key("user/tests/pop/b", "2"),
        key("user/tests/pop/c", "3"),
    ])
    .unwrap();

    let mut popped = Vec::new();
    while let Some(k) = ks.pop() {
        popped.push(k.name());
    }

    assert_eq!(
        popped,
        [
            "user/tests/pop/c",
            "user/tests/pop/b",
            "user/tests/pop/a"
        ]
    );
    assert_eq!(ks.len(), 0);
}

#[test]
fn test_key_shared_across_key_sets() {
    let shared = key("user/tests/cascfg/shared", "before");
    let ks1 = KeySet::from_keys([shared.clone()]).unwrap();
    let mut ks2 = KeySet::new();
    ks2.append(&ks1).unwrap();

    // Mutation through one set is visible through the other.
    ks1.lookup_by_name("user/tests/cascfg/shared")
        .unwrap()
        .set_string("after");
    assert_eq!(
        ks2.lookup_by_name("user/tests/cascfg/shared").unwrap().value(),
        "after"
    );

    // Removing from one set does not invalidate the other holder.
    ks2.remove(&shared).unwrap();
    assert_eq!(shared.value(), "after");
    assert_eq!(ks1.len(), 1);
}

#[test]
fn test_duplicate_breaks_sharing() {
    let original = key("user/tests/cascfg/duplicate", "before");
    let copy = original.duplicate();

    original.set_string("after");
    assert_eq!(copy.value(), "before");
}
