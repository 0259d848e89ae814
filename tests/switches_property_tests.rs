use archrun::{SwitchError, SwitchValue, Switches, redact, serialize};
use proptest::prelude::*;

fn key() -> impl Strategy<Value = String> {
    // Keys starting with `p` would be masked by redaction like a password.
    "[a-oq-z][a-z0-9]{0,5}".prop_filter("reserved keys", |k| {
        !matches!(k.as_str(), "raw" | "wildcards" | "i" | "x" | "m" | "ai" | "ax" | "ssc")
    })
}

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_./*!]{1,12}"
}

proptest! {
    /// Named switches come out in key order, one token each
    #[test]
    fn prop_named_switches_sorted_by_key(
        entries in proptest::collection::btree_map(key(), prop_oneof![
            Just(SwitchValue::Flag(true)),
            text().prop_map(SwitchValue::Text),
        ], 0..8)
    ) {
        let mut switches = Switches::new();
        for (k, v) in &entries {
            switches.insert(k.clone(), v.clone());
        }

        let tokens = switches.to_args().unwrap();
        prop_assert_eq!(tokens.len(), entries.len());
        for (token, (k, v)) in tokens.iter().zip(&entries) {
            let expected = match v {
                SwitchValue::Flag(_) => format!("-{k}"),
                SwitchValue::Text(t) => format!("-{k}{t}"),
                SwitchValue::List(_) => unreachable!(),
            };
            prop_assert_eq!(token, &expected);
        }
    }

    /// Wildcards lead and raw tokens trail, both verbatim and in order
    #[test]
    fn prop_wildcards_first_raw_last(
        wildcards in proptest::collection::vec(text(), 1..4),
        raw in proptest::collection::vec(text(), 1..4),
        named in proptest::collection::btree_set(key(), 0..4),
    ) {
        let mut switches = Switches::new()
            .wildcards(wildcards.clone())
            .raw(raw.clone());
        for k in &named {
            switches.insert(k.clone(), true);
        }

        let tokens = switches.to_args().unwrap();
        prop_assert_eq!(&tokens[..wildcards.len()], &wildcards[..]);
        prop_assert_eq!(&tokens[tokens.len() - raw.len()..], &raw[..]);
        prop_assert_eq!(tokens.len(), wildcards.len() + named.len() + raw.len());
    }

    /// A false flag emits nothing, except the case-sensitivity switch
    #[test]
    fn prop_false_flags_are_silent(k in key()) {
        let switches = Switches::new().set(k, false);
        prop_assert!(switches.to_args().unwrap().is_empty());
    }

    /// Lists are only accepted for repeatable switches
    #[test]
    fn prop_lists_rejected_for_plain_switches(
        k in key(),
        items in proptest::collection::vec(text(), 1..3),
    ) {
        let switches = Switches::new().set(k, items);
        let is_unsupported_shape = matches!(
            switches.to_args(),
            Err(SwitchError::UnsupportedShape { .. })
        );
        prop_assert!(is_unsupported_shape);
    }

    /// Serialization is a pure function of the switches
    #[test]
    fn prop_serialize_is_deterministic(
        entries in proptest::collection::btree_map(key(), text(), 0..6)
    ) {
        let mut switches = Switches::new();
        for (k, v) in &entries {
            switches.insert(k.clone(), v.clone());
        }
        prop_assert_eq!(serialize(Some(&switches)).unwrap(), serialize(Some(&switches)).unwrap());
    }

    /// Redaction never leaks a password and leaves other tokens alone
    #[test]
    fn prop_redaction_hides_password(password in text(), others in proptest::collection::vec(key(), 0..4)) {
        let mut switches = Switches::new().password(password.clone());
        for k in &others {
            switches.insert(k.clone(), true);
        }
        let tokens = switches.to_args().unwrap();
        let masked = redact(&tokens);

        prop_assert_eq!(masked.len(), tokens.len());
        let unmasked = format!("-p{password}");
        prop_assert!(!masked.contains(&unmasked));
        prop_assert!(masked.contains(&"-p***".to_string()));
        for (m, t) in masked.iter().zip(&tokens) {
            if !t.starts_with("-p") {
                prop_assert_eq!(m, t);
            }
        }
    }
}

#[test]
fn test_case_sensitivity_switch_negates() {
    let switches = Switches::new().set("ssc", false);
    assert_eq!(switches.to_args().unwrap(), vec!["-ssc-"]);
}

#[test]
fn test_full_extraction_command_line() {
    let switches = Switches::new()
        .output_dir("out")
        .assume_yes(true)
        .include("!*.txt")
        .include("!*.md")
        .method("x=9")
        .wildcards(["docs/*"])
        .raw(["-bb1"]);

    assert_eq!(
        switches.to_args().unwrap(),
        vec!["docs/*", "-i!*.txt", "-i!*.md", "-mx=9", "-oout", "-y", "-bb1"]
    );
}
