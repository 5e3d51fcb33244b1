use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_yaml::Value;

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    other => panic!("unexpected key {other:?}"),
                };
                let full = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&full, v, out);
            }
        }
        _ => {
            out.insert(prefix.to_string());
        }
    }
}

fn keys(locale: &str) -> BTreeSet<String> {
    let path = manifest_dir().join("locales").join(format!("{locale}.yml"));
    let text = fs::read_to_string(&path).unwrap();
    let value: Value = serde_yaml::from_str(&text).unwrap();
    let mut out = BTreeSet::new();
    flatten("", &value, &mut out);
    out
}

fn rust_files(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn english_and_japanese_have_the_same_keys() {
    let en = keys("en");
    let ja = keys("ja");
    let only_en: Vec<_> = en.difference(&ja).collect();
    let only_ja: Vec<_> = ja.difference(&en).collect();
    assert!(only_en.is_empty(), "missing in ja.yml: {only_en:?}");
    assert!(only_ja.is_empty(), "missing in en.yml: {only_ja:?}");
}

#[test]
fn every_key_used_in_the_source_exists() {
    let en = keys("en");
    let re = Regex::new(r#"t!\(\s*"([a-z_.]+)""#).unwrap();
    let mut files = Vec::new();
    rust_files(&manifest_dir().join("src"), &mut files);

    let mut missing = BTreeSet::new();
    for file in files {
        let text = fs::read_to_string(&file).unwrap();
        for caps in re.captures_iter(&text) {
            if !en.contains(&caps[1]) {
                missing.insert(format!("{} ({})", &caps[1], file.display()));
            }
        }
    }
    assert!(missing.is_empty(), "undefined locale keys: {missing:?}");
}

#[test]
fn placeholders_match_between_locales() {
    let re = Regex::new(r"%\{(\w+)\}").unwrap();
    let load = |locale: &str| -> Value {
        let path = manifest_dir().join("locales").join(format!("{locale}.yml"));
        serde_yaml::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    };
    let (en, ja) = (load("en"), load("ja"));
    for key in keys("en") {
        let lookup = |root: &Value| -> String {
            key.split('.')
                .try_fold(root, |v, part| v.get(part))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let names = |s: &str| -> BTreeSet<String> {
            re.captures_iter(s).map(|c| c[1].to_string()).collect()
        };
        assert_eq!(names(&lookup(&en)), names(&lookup(&ja)), "placeholders differ for {key}");
    }
}
