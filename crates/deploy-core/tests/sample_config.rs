//! The sample environment config and holding-page rules shipped at the
//! repository root must stay loadable.

use std::path::{Path, PathBuf};

use deploy_core::{select_services, EnvConfig, Environment, HoldingPage, RevisionPatch};

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[test]
fn sample_env_config_loads() {
    let path = EnvConfig::path_for(&repo_root(), Environment::Test);
    let config = EnvConfig::from_file(&path).unwrap();

    let selected = select_services(&config, Environment::Test, None);
    assert!(selected.iter().all(|s| s.as_str().starts_with("test-")));
    assert!(config
        .contains_essential(Environment::Test, selected.iter())
        .unwrap());

    for service in &selected {
        let name = service.config_name(Environment::Test);
        let patch = RevisionPatch::build(
            Environment::Test,
            name,
            config.service(name).unwrap(),
            &config,
            "latest",
        );
        assert!(patch.image.ends_with(":latest"));
        assert!(patch
            .environment
            .iter()
            .any(|(k, v)| k == "APP_NAME" && v == name));
    }
}

#[test]
fn sample_holding_page_loads() {
    let page = HoldingPage::load(&repo_root().join("holding_page")).unwrap();
    assert_eq!(page.conditions.len(), 1);
    assert_eq!(page.actions[0].kind, "fixed-response");
    assert_eq!(
        page.actions[0]
            .fixed_response_config
            .as_ref()
            .unwrap()
            .status_code,
        "503"
    );
}
