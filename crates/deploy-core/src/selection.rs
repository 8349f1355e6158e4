//! Choosing which services an action applies to.

use std::collections::BTreeSet;

use tracing::warn;

use crate::config::EnvConfig;
use crate::types::{Environment, ServiceName};

/// Select the cluster services to act on.
///
/// Every service in the config is selected unless `filter` (a
/// comma-separated list of config names) narrows it down. A filter with no
/// names in it, such as `""`, selects everything. Names in the filter that
/// the config does not know are dropped.
pub fn select_services(
    config: &EnvConfig,
    env: Environment,
    filter: Option<&str>,
) -> BTreeSet<ServiceName> {
    let wanted: Option<BTreeSet<&str>> = filter
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect::<BTreeSet<_>>()
        })
        .filter(|wanted| !wanted.is_empty());

    if let Some(wanted) = &wanted {
        for name in wanted.iter().filter(|name| !config.services.contains_key(**name)) {
            warn!(service = %name, %env, "service not in environment config, skipping");
        }
    }

    config
        .services
        .keys()
        .filter(|name| match &wanted {
            Some(wanted) => wanted.contains(name.as_str()),
            None => true,
        })
        .map(|name| env.service_name(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EnvConfig {
        EnvConfig::from_yaml_str(
            "services:\n  api:\n    image: a\n    count: 1\n  sequencer:\n    image: b\n    count: 1\n  garp:\n    image: c\n    count: 1\n",
        )
        .unwrap()
    }

    fn names(set: &BTreeSet<ServiceName>) -> Vec<&str> {
        set.iter().map(ServiceName::as_str).collect()
    }

    #[test]
    fn selects_all_without_filter() {
        let selected = select_services(&config(), Environment::Demo, None);
        assert_eq!(names(&selected), vec!["demo-api", "demo-garp", "demo-sequencer"]);
    }

    #[test]
    fn filter_is_trimmed_and_intersected() {
        let selected = select_services(&config(), Environment::Prod, Some(" api , sequencer,"));
        assert_eq!(names(&selected), vec!["prod-api", "prod-sequencer"]);
    }

    #[test]
    fn unknown_filter_names_are_dropped() {
        let selected = select_services(&config(), Environment::Test, Some("web,mocker"));
        assert!(selected.is_empty());
    }

    #[test]
    fn blank_filter_selects_everything() {
        for filter in ["", " ", ",", " , "] {
            let selected = select_services(&config(), Environment::Test, Some(filter));
            assert_eq!(
                names(&selected),
                vec!["test-api", "test-garp", "test-sequencer"],
                "filter {filter:?}"
            );
        }
    }
}
