use super::{apply_env_overrides, apply_file_settings, load_settings, OverlapPolicy, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_point_at_local_generator() {
    let settings = Settings::default();
    assert_eq!(
        settings.endpoint_url().expect("url").as_str(),
        "http://127.0.0.1:8000/generate-itinerary"
    );
    assert_eq!(settings.request_timeout(), None);
    assert_eq!(settings.overlap_policy, OverlapPolicy::Reject);
}

#[test]
fn endpoint_url_respects_path_prefix_and_full_path() {
    let mut settings = Settings {
        endpoint_base_url: "https://planner.example.com/api".into(),
        ..Settings::default()
    };
    assert_eq!(
        settings.endpoint_url().expect("url").as_str(),
        "https://planner.example.com/api/generate-itinerary"
    );

    settings.endpoint_base_url = "http://10.0.0.5:9000/generate-itinerary".into();
    assert_eq!(
        settings.endpoint_url().expect("url").as_str(),
        "http://10.0.0.5:9000/generate-itinerary"
    );
}

#[test]
fn endpoint_url_rejects_garbage_and_non_http_schemes() {
    let settings = Settings {
        endpoint_base_url: "not a url".into(),
        ..Settings::default()
    };
    assert!(settings.endpoint_url().is_err());

    let settings = Settings {
        endpoint_base_url: "mailto:planner@example.com".into(),
        ..Settings::default()
    };
    assert!(settings.endpoint_url().is_err());
}

#[test]
fn zero_timeout_means_unbounded() {
    let mut settings = Settings {
        request_timeout_secs: Some(0),
        ..Settings::default()
    };
    assert_eq!(settings.request_timeout(), None);
    settings.request_timeout_secs = Some(30);
    assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));
}

#[test]
fn file_settings_override_defaults() {
    let mut settings = Settings::default();
    apply_file_settings(
        &mut settings,
        r#"
endpoint_url = "http://planner.internal:8080"
request_timeout_secs = 45
overlap_policy = "supersede"
"#,
    )
    .expect("parse");

    assert_eq!(settings.endpoint_base_url, "http://planner.internal:8080");
    assert_eq!(settings.request_timeout_secs, Some(45));
    assert_eq!(settings.overlap_policy, OverlapPolicy::Supersede);
}

#[test]
fn malformed_file_settings_are_an_error() {
    let mut settings = Settings::default();
    assert!(apply_file_settings(&mut settings, "overlap_policy = \"sometimes\"").is_err());
    assert!(apply_file_settings(&mut settings, "request_timeout_secs = [").is_err());
}

#[test]
fn env_overrides_win_and_app_prefix_beats_legacy_name() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        env_from(&[
            ("ITINERARY_ENDPOINT", "http://legacy:8000"),
            ("APP__ENDPOINT_URL", "http://preferred:8000"),
            ("APP__REQUEST_TIMEOUT_SECS", "12"),
            ("APP__OVERLAP_POLICY", "Supersede"),
        ]),
    );

    assert_eq!(settings.endpoint_base_url, "http://preferred:8000");
    assert_eq!(settings.request_timeout_secs, Some(12));
    assert_eq!(settings.overlap_policy, OverlapPolicy::Supersede);
}

#[test]
fn unparsable_env_values_are_ignored() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        env_from(&[
            ("APP__REQUEST_TIMEOUT_SECS", "soon"),
            ("APP__OVERLAP_POLICY", "whenever"),
        ]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn explicit_settings_file_must_exist() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let missing = env::temp_dir().join(format!("planner_missing_{suffix}.toml"));
    assert!(load_settings(Some(&missing)).is_err());
}

#[test]
fn explicit_settings_file_is_loaded() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("planner_settings_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("planner.toml");
    fs::write(&path, "request_timeout_secs = 90\n").expect("write settings");

    let settings = load_settings(Some(&path)).expect("load settings");
    assert!(settings.request_timeout_secs.is_some());

    fs::remove_dir_all(temp_root).expect("cleanup");
}
